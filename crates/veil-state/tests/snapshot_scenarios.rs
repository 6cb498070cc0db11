//! End-to-end snapshot scenarios: no-op identity, structural sharing,
//! sequence scrambles, rebase, literal intermediates, and cycles.

use veil_state::{
    snapshot, snapshot_onto, traverse, value, wrap, Entry, Order, Seg, Visit, WrapOptions,
};

fn entry(facade: &veil_state::Facade) -> Entry {
    Entry::Facade(facade.clone())
}

#[test]
fn noop_snapshot_returns_the_source_by_identity() {
    let v = value!({"foo": {"bar": 123}});
    for options in [WrapOptions::default(), WrapOptions::reference_checked()] {
        let p = wrap(v.clone(), options).unwrap();
        let foo = p.get("foo").unwrap().unwrap();
        foo.as_facade().unwrap().set("bar", 123).unwrap();
        assert!(snapshot(&entry(&p)).same(&v));
    }
}

#[test]
fn sequence_scramble_with_reference_check_restores_identity() {
    let v = value!([{"a": 1}, {"b": 2}, {"c": 3}]);
    let b = v.get_index(1).unwrap().clone();

    let p = wrap(v.clone(), WrapOptions::reference_checked()).unwrap();
    p.splice(1, 1, vec![]).unwrap();
    p.splice(1, 0, vec![Entry::Value(b)]).unwrap();

    assert!(!p.has_patches());
    assert_eq!(p.patch_count(), 0);
    assert!(snapshot(&entry(&p)).same(&v));
}

#[test]
fn shift_then_unshift_shifted_restores_identity() {
    let v = value!([{"head": true}, {"tail": true}]);
    let p = wrap(v.clone(), WrapOptions::reference_checked()).unwrap();
    let shifted = p.shift().unwrap().unwrap();
    p.unshift(vec![shifted]).unwrap();
    assert!(!p.has_patches());
    assert!(snapshot(&entry(&p)).same(&v));
}

#[test]
fn shallow_edit_shares_the_untouched_subtree() {
    let v = value!({"foo": 123, "zzz": {"www": "abc"}});
    let p = wrap(v.clone(), WrapOptions::default()).unwrap();
    p.get("zzz").unwrap();
    p.delete("foo").unwrap();
    p.set("bar", 456).unwrap();

    let s = snapshot(&entry(&p));
    assert_eq!(s, value!({"bar": 456, "zzz": {"www": "abc"}}));
    assert!(s["zzz"].same(&v["zzz"]));
}

#[test]
fn deep_edit_clones_only_the_mutated_path() {
    let v = value!({"foo": {"bar": 123}, "zzz": {"www": "abc"}});
    let p = wrap(v.clone(), WrapOptions::default()).unwrap();
    let foo = p.get("foo").unwrap().unwrap();
    foo.as_facade().unwrap().delete("bar").unwrap();
    foo.as_facade().unwrap().set("qux", 456).unwrap();

    let s = snapshot(&entry(&p));
    assert_eq!(s, value!({"foo": {"qux": 456}, "zzz": {"www": "abc"}}));
    assert!(s["zzz"].same(&v["zzz"]));
    assert!(!s["foo"].same(&v["foo"]));
}

#[test]
fn cyclic_graph_traverses_exactly_once() {
    let v = value!({"a": null});
    let p = wrap(v, WrapOptions::default()).unwrap();
    p.set("a", p.clone()).unwrap();

    let mut visits = 0;
    traverse(
        &entry(&p),
        &mut |facade, values, keys| {
            visits += 1;
            assert!(facade.ptr_eq(&p));
            assert_eq!(values.len(), 1);
            assert!(keys.is_empty());
            Visit::Continue
        },
        Order::ParentFirst,
    );
    assert_eq!(visits, 1);
}

#[test]
fn rebase_takes_sequences_whole_from_the_facade_view() {
    let v = value!({"foo": [{"bar": 123}]});
    let p = wrap(v, WrapOptions::default()).unwrap();
    let foo = p.get("foo").unwrap().unwrap();
    let item = foo.as_facade().unwrap().get(0).unwrap().unwrap();
    item.as_facade().unwrap().set("qux", "abc").unwrap();

    let base = value!({"foo": [{"www": 456}]});
    let s = snapshot_onto(&entry(&p), &base);
    // The sequence is not interleaved with the base's sequence.
    assert_eq!(s, value!({"foo": [{"bar": 123, "qux": "abc"}]}));
}

#[test]
fn literal_intermediate_keeps_nested_facade_sources_shared() {
    let v = value!({"foo": {"bar": 123}});
    let p = wrap(v.clone(), WrapOptions::default()).unwrap();
    let foo = p.get("foo").unwrap().unwrap();
    p.set("foo", Entry::object([("qux", foo)])).unwrap();

    let s = snapshot(&entry(&p));
    assert_eq!(s, value!({"foo": {"qux": {"bar": 123}}}));
    assert!(s["foo"]["qux"].same(&v["foo"]));
}

#[test]
fn facades_nested_in_literal_arrays_are_folded() {
    let v = value!({"items": null});
    let p = wrap(v, WrapOptions::default()).unwrap();
    let inner = wrap(value!({"x": 1}), WrapOptions::default()).unwrap();
    inner.set("y", 2).unwrap();
    p.set("items", Entry::array([Entry::from(0), Entry::Facade(inner)]))
        .unwrap();

    let s = snapshot(&entry(&p));
    assert_eq!(s, value!({"items": [0, {"x": 1, "y": 2}]}));
}

#[test]
fn snapshot_is_idempotent() {
    let v = value!({"a": {"b": [1, 2]}});
    let p = wrap(v, WrapOptions::default()).unwrap();
    let a = p.get("a").unwrap().unwrap();
    a.as_facade().unwrap().set("c", true).unwrap();

    let once = snapshot(&entry(&p));
    let twice = snapshot(&Entry::Value(once.clone()));
    assert!(once.same(&twice));
}

#[test]
fn enumeration_matches_the_snapshot() {
    let v = value!({"foo": 1, "bar": 2, "baz": {"x": 1}});
    let p = wrap(v, WrapOptions::default()).unwrap();
    p.delete("bar").unwrap();
    p.set("qux", 3).unwrap();
    p.get("baz").unwrap();

    let facade_keys: Vec<String> = p
        .keys()
        .unwrap()
        .into_iter()
        .map(|seg| match seg {
            Seg::Key(k) => k,
            Seg::Index(i) => i.to_string(),
        })
        .collect();
    let s = snapshot(&entry(&p));
    let snapshot_keys: Vec<String> = s.as_object().unwrap().keys().cloned().collect();
    assert_eq!(facade_keys, snapshot_keys);
    assert_eq!(facade_keys, ["foo", "baz", "qux"]);
}

#[test]
fn source_shape_is_preserved_across_all_operations() {
    let v = value!({"a": [1, {"deep": true}], "b": "keep"});
    let p = wrap(v.clone(), WrapOptions::default()).unwrap();

    p.set("b", "changed").unwrap();
    p.delete("b").unwrap();
    let a = p.get("a").unwrap().unwrap();
    a.as_facade().unwrap().push("more").unwrap();
    a.as_facade().unwrap().splice(0, 1, vec![]).unwrap();
    snapshot(&entry(&p));

    assert!(p.source().same(&v));
    assert_eq!(v, value!({"a": [1, {"deep": true}], "b": "keep"}));
}
