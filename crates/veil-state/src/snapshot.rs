//! Structural-sharing snapshots: fold pending patches onto a base tree.
//!
//! The snapshot engine materializes an immutable [`Value`] from a façade (or
//! from a literal container holding façades). Containers on a mutated path
//! are cloned exactly once, via `Arc::make_mut`; everything off that path is
//! shared with the base by reference. When nothing effectively changed, the
//! base itself comes back, identical.
//!
//! Effective change is judged per slot by identity ([`Value::same`]): a patch
//! that writes what the base already holds writes nothing. This is why a
//! rewrite-to-the-same-leaf mutation snapshots to the original tree by
//! identity even without `reference_check`.

use crate::facade::Patches;
use crate::value::Map;
use crate::{Entry, Facade, Patch, Seg, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Materialize an immutable value from `root`, folding each façade's patches
/// onto its own source.
///
/// # Examples
///
/// ```
/// use veil_state::{snapshot, value, wrap, Entry, WrapOptions};
///
/// let v = value!({"foo": {"bar": 123}, "zzz": {"www": "abc"}});
/// let p = wrap(v.clone(), WrapOptions::default()).unwrap();
/// let foo = p.get("foo").unwrap().unwrap();
/// foo.as_facade().unwrap().set("qux", 456).unwrap();
///
/// let s = snapshot(&Entry::Facade(p));
/// assert_eq!(s["foo"]["qux"], 456);
/// // The untouched sibling subtree is shared with the source by identity.
/// assert!(s["zzz"].same(&v["zzz"]));
/// assert!(!s.same(&v));
/// ```
pub fn snapshot(root: &Entry) -> Value {
    let mut ancestors = Vec::new();
    fold(root, None, &mut ancestors)
}

/// Materialize an immutable value from `root`, folding the changes into
/// `base` instead of the root façade's own source (rebase).
///
/// Rebase applies wherever the walk from `base` mirrors the façade tree
/// through record containers. A sequence façade opts out: positional identity
/// cannot be reconciled with a foreign base, so the snapshotted sequence
/// replaces the base slot wholesale. Where the walk lands on a slot that is
/// not a recognized container, the subtree falls back to materializing from
/// its own source.
pub fn snapshot_onto(root: &Entry, base: &Value) -> Value {
    let mut ancestors = Vec::new();
    fold(root, Some(base), &mut ancestors)
}

fn fold(entry: &Entry, base: Option<&Value>, ancestors: &mut Vec<Facade>) -> Value {
    match entry {
        Entry::Value(v) => v.clone(),
        Entry::Facade(facade) => fold_facade(facade, base, ancestors),
        // Literal containers are attached verbatim: settled slots keep their
        // identity, façade slots fold onto their own sources.
        Entry::Array(items) => Value::Array(Arc::new(
            items.iter().map(|e| fold(e, None, ancestors)).collect(),
        )),
        Entry::Object(map) => Value::Object(Arc::new(
            map.iter()
                .map(|(k, e)| (k.clone(), fold(e, None, ancestors)))
                .collect(),
        )),
    }
}

fn fold_facade(facade: &Facade, base: Option<&Value>, ancestors: &mut Vec<Facade>) -> Value {
    // A façade already being folded further up the path is a cycle: its slot
    // takes the source verbatim and descent stops here.
    if ancestors.iter().any(|a| a.ptr_eq(facade)) {
        return facade.source();
    }
    ancestors.push(facade.clone());
    let (source, patches, children) = facade.parts();
    let result = if source.is_array() {
        let folded = fold_sequence(&source, patches, children, ancestors);
        match base {
            // Whole replacement applies only to real changes: an unchanged
            // sequence leaves even a distinct base slot alone.
            Some(b) if folded.same(&source) => b.clone(),
            _ => folded,
        }
    } else {
        fold_record(&source, patches, children, base, ancestors)
    };
    ancestors.pop();
    result
}

fn fold_record(
    source: &Value,
    patches: Option<Patches>,
    children: Vec<(Seg, Facade)>,
    base: Option<&Value>,
    ancestors: &mut Vec<Facade>,
) -> Value {
    // Rebase applies only when the base slot is record-kind; otherwise the
    // façade materializes from its own source.
    let mut out: Arc<Map> = match base {
        Some(Value::Object(map)) => map.clone(),
        _ => match source {
            Value::Object(map) => map.clone(),
            other => return other.clone(),
        },
    };

    let table = match patches {
        Some(Patches::Record(table)) => table,
        _ => Default::default(),
    };
    for (key, patch) in &table {
        match patch {
            Patch::Tombstone => {
                if out.contains_key(key.as_str()) {
                    Arc::make_mut(&mut out).shift_remove(key.as_str());
                }
            }
            Patch::Entry(entry) => {
                let folded = fold(entry, None, ancestors);
                let unchanged = out
                    .get(key.as_str())
                    .is_some_and(|existing| existing.same(&folded));
                if !unchanged {
                    Arc::make_mut(&mut out).insert(key.clone(), folded);
                }
            }
        }
    }
    for (seg, child) in children {
        let Seg::Key(key) = seg else { continue };
        // A patched slot subsumes whatever façade was read from it.
        if table.contains_key(key.as_str()) {
            continue;
        }
        let base_slot = out.get(key.as_str()).cloned();
        let folded = fold_facade(&child, base_slot.as_ref(), ancestors);
        let unchanged = base_slot.is_some_and(|existing| existing.same(&folded));
        if !unchanged {
            Arc::make_mut(&mut out).insert(key, folded);
        }
    }
    Value::Object(out)
}

fn fold_sequence(
    source: &Value,
    patches: Option<Patches>,
    children: Vec<(Seg, Facade)>,
    ancestors: &mut Vec<Facade>,
) -> Value {
    // Sequences always fold onto their own source; a distinct rebase target
    // receives the result as a whole replacement (handled by the caller
    // simply writing this return value into the parent slot).
    let source_items: Arc<Vec<Value>> = match source {
        Value::Array(items) => items.clone(),
        other => return other.clone(),
    };
    let slots = match patches {
        Some(Patches::Sequence { slots }) => Some(slots),
        _ => None,
    };
    let children: HashMap<usize, Facade> = children
        .into_iter()
        .filter_map(|(seg, f)| match seg {
            Seg::Index(i) => Some((i, f)),
            Seg::Key(_) => None,
        })
        .collect();

    let mut out = source_items.clone();
    let effective_len = slots.as_ref().map_or(source_items.len(), Vec::len);
    if effective_len != source_items.len() {
        // Deleted tails drop off; extension holes materialize as nulls.
        Arc::make_mut(&mut out).resize(effective_len, Value::Null);
    }

    for i in 0..effective_len {
        let slot = slots.as_ref().and_then(|s| s.get(i)).and_then(Option::as_ref);
        let folded = match slot {
            Some(Patch::Tombstone) => Some(Value::Null),
            Some(Patch::Entry(entry)) => Some(fold(entry, None, ancestors)),
            None => {
                if i < source_items.len() {
                    children
                        .get(&i)
                        .map(|child| fold_facade(child, Some(&source_items[i]), ancestors))
                } else {
                    None
                }
            }
        };
        if let Some(folded) = folded {
            let unchanged = out.get(i).is_some_and(|existing| existing.same(&folded));
            if !unchanged {
                Arc::make_mut(&mut out)[i] = folded;
            }
        }
    }
    Value::Array(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{value, wrap, WrapOptions};

    fn facade(v: Value) -> Facade {
        wrap(v, WrapOptions::default()).unwrap()
    }

    #[test]
    fn test_no_writes_snapshots_to_base_by_identity() {
        let v = value!({"foo": {"bar": 123}});
        let p = facade(v.clone());
        p.get("foo").unwrap(); // reads alone are not changes
        assert!(snapshot(&Entry::Facade(p)).same(&v));
    }

    #[test]
    fn test_snapshot_of_settled_value_is_itself() {
        let v = value!({"a": [1, 2]});
        assert!(snapshot(&Entry::Value(v.clone())).same(&v));
        let leaf = Value::from(7);
        assert!(snapshot(&Entry::Value(leaf.clone())).same(&leaf));
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let v = value!({"a": {"b": 1}});
        let p = facade(v);
        p.set("c", 2).unwrap();
        let once = snapshot(&Entry::Facade(p));
        let twice = snapshot(&Entry::Value(once.clone()));
        assert!(once.same(&twice));
    }

    #[test]
    fn test_shallow_edit_shares_untouched_siblings() {
        let v = value!({"foo": 123, "zzz": {"www": "abc"}});
        let p = facade(v.clone());
        p.get("zzz").unwrap();
        p.delete("foo").unwrap();
        p.set("bar", 456).unwrap();

        let s = snapshot(&Entry::Facade(p));
        assert_eq!(s, value!({"bar": 456, "zzz": {"www": "abc"}}));
        assert!(s["zzz"].same(&v["zzz"]));
        assert!(s.get_key("foo").is_none());
    }

    #[test]
    fn test_deep_edit_clones_only_the_mutated_path() {
        let v = value!({"foo": {"bar": 123}, "zzz": {"www": "abc"}});
        let p = facade(v.clone());
        let foo = p.get("foo").unwrap().unwrap();
        foo.as_facade().unwrap().delete("bar").unwrap();
        foo.as_facade().unwrap().set("qux", 456).unwrap();

        let s = snapshot(&Entry::Facade(p));
        assert_eq!(s, value!({"foo": {"qux": 456}, "zzz": {"www": "abc"}}));
        assert!(s["zzz"].same(&v["zzz"]));
        assert!(!s["foo"].same(&v["foo"]));
    }

    #[test]
    fn test_leaf_rewrite_to_same_value_is_identity() {
        let v = value!({"foo": {"bar": 123}});
        let p = facade(v.clone());
        let foo = p.get("foo").unwrap().unwrap();
        foo.as_facade().unwrap().set("bar", 123).unwrap();
        assert!(snapshot(&Entry::Facade(p)).same(&v));
    }

    #[test]
    fn test_patch_facade_writes_fold_of_its_source() {
        let v = value!({"slot": null});
        let p = facade(v);
        let other = facade(value!({"x": 1}));
        other.set("y", 2).unwrap();
        p.set("slot", other).unwrap();

        let s = snapshot(&Entry::Facade(p));
        assert_eq!(s, value!({"slot": {"x": 1, "y": 2}}));
    }

    #[test]
    fn test_tombstone_on_sequence_materializes_null() {
        let p = facade(value!([1, 2, 3]));
        p.delete(1).unwrap();
        let s = snapshot(&Entry::Facade(p));
        assert_eq!(s, value!([1, null, 3]));
    }

    #[test]
    fn test_sequence_growth_and_truncation() {
        let v = value!([1, 2, 3]);
        let p = facade(v.clone());
        p.set_len(2).unwrap();
        assert_eq!(snapshot(&Entry::Facade(p)), value!([1, 2]));

        let p = facade(v);
        p.set(4, "x").unwrap();
        assert_eq!(snapshot(&Entry::Facade(p)), value!([1, 2, 3, null, "x"]));
    }

    #[test]
    fn test_literal_intermediate_reproduced_verbatim() {
        let v = value!({"foo": {"bar": 123}});
        let p = facade(v.clone());
        let foo = p.get("foo").unwrap().unwrap();
        p.set("foo", Entry::object([("qux", foo)])).unwrap();

        let s = snapshot(&Entry::Facade(p));
        assert_eq!(s, value!({"foo": {"qux": {"bar": 123}}}));
        assert!(s["foo"]["qux"].same(&v["foo"]));
    }

    #[test]
    fn test_cycle_through_patch_takes_source_and_terminates() {
        let v = value!({"a": null});
        let p = facade(v.clone());
        p.set("a", p.clone()).unwrap();

        let s = snapshot(&Entry::Facade(p));
        assert!(s["a"].same(&v));
    }

    #[test]
    fn test_rebase_folds_record_changes_into_base() {
        let v = value!({"keep": 1, "edit": {"x": 1}});
        let p = facade(v);
        let edit = p.get("edit").unwrap().unwrap();
        edit.as_facade().unwrap().set("x", 2).unwrap();

        let base = value!({"keep": 99, "edit": {"x": 1}, "extra": true});
        let s = snapshot_onto(&Entry::Facade(p), &base);
        assert_eq!(
            s,
            value!({"keep": 99, "edit": {"x": 2}, "extra": true})
        );
        assert!(s["extra"].same(&base["extra"]));
    }

    #[test]
    fn test_rebase_identity_when_no_changes() {
        let v = value!({"a": 1});
        let p = facade(v);
        let base = value!({"a": 2, "b": 3});
        assert!(snapshot_onto(&Entry::Facade(p), &base).same(&base));
    }

    #[test]
    fn test_rebase_sequence_is_whole_replacement() {
        let v = value!({"foo": [{"bar": 123}]});
        let p = facade(v);
        let foo = p.get("foo").unwrap().unwrap();
        let item = foo.as_facade().unwrap().get(0).unwrap().unwrap();
        item.as_facade().unwrap().set("qux", "abc").unwrap();

        let base = value!({"foo": [{"www": 456}]});
        let s = snapshot_onto(&Entry::Facade(p), &base);
        assert_eq!(s, value!({"foo": [{"bar": 123, "qux": "abc"}]}));
    }

    #[test]
    fn test_rebase_unchanged_sequence_keeps_the_base_slot() {
        let v = value!({"items": [1]});
        let p = facade(v);
        p.get("items").unwrap(); // materialize, but change nothing

        let base = value!({"items": [1, 2]});
        assert!(snapshot_onto(&Entry::Facade(p), &base).same(&base));
    }

    #[test]
    fn test_rebase_aborts_on_non_recognized_base_slot() {
        let v = value!({"inner": {"x": 1}});
        let p = facade(v);
        let inner = p.get("inner").unwrap().unwrap();
        inner.as_facade().unwrap().set("x", 2).unwrap();

        // The base holds a leaf where the façade tree has a record: the
        // subtree materializes from its own source instead.
        let base = value!({"inner": 7});
        let s = snapshot_onto(&Entry::Facade(p), &base);
        assert_eq!(s, value!({"inner": {"x": 2}}));
    }
}
