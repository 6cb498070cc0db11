//! Cycle-safe traversal of façade graphs.
//!
//! The traversal visits every façade reachable from a root entry, in either
//! parent-first or child-first order. From a façade, children are discovered
//! in own-key order: a recognized patch wins over the cached child façade for
//! the same slot. Literal containers assigned into patches are descended
//! through (they may hide façades in their slots) but never visited
//! themselves.
//!
//! Cycle safety is a no-revisit-along-a-path guarantee, not a global one: the
//! guard scans the current path for an identical container before descending,
//! so the same façade can still be visited once per distinct path.

use crate::{Entry, Facade, Seg};

/// Visit order for [`traverse`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Order {
    /// Visit a façade before any of its descendants.
    #[default]
    ParentFirst,
    /// Visit all descendants of a façade before the façade itself.
    ChildFirst,
}

/// Visitor verdict controlling descent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visit {
    /// Keep going.
    Continue,
    /// Skip the subtree below the visited façade. Only meaningful in
    /// parent-first order; in child-first order the subtree has already been
    /// visited by the time the verdict is returned.
    Skip,
}

/// Visit every façade reachable from `root`.
///
/// The visitor receives the façade, the containers on the path from the root
/// to it (inclusive), and the keys taken (one fewer).
///
/// # Examples
///
/// ```
/// use veil_state::{traverse, value, wrap, Entry, Order, Visit, WrapOptions};
///
/// let p = wrap(value!({"a": {"b": {}}}), WrapOptions::default()).unwrap();
/// p.get("a").unwrap().unwrap().as_facade().unwrap().get("b").unwrap();
///
/// let mut depths = Vec::new();
/// traverse(
///     &Entry::Facade(p),
///     &mut |_, values, keys| {
///         depths.push((values.len(), keys.len()));
///         Visit::Continue
///     },
///     Order::ParentFirst,
/// );
/// assert_eq!(depths, vec![(1, 0), (2, 1), (3, 2)]);
/// ```
pub fn traverse<V>(root: &Entry, visitor: &mut V, order: Order)
where
    V: FnMut(&Facade, &[Entry], &[Seg]) -> Visit,
{
    let mut path_values = Vec::new();
    let mut path_keys = Vec::new();
    walk(root, visitor, order, &mut path_values, &mut path_keys);
}

fn walk<V>(
    entry: &Entry,
    visitor: &mut V,
    order: Order,
    path_values: &mut Vec<Entry>,
    path_keys: &mut Vec<Seg>,
) where
    V: FnMut(&Facade, &[Entry], &[Seg]) -> Visit,
{
    // An ancestor identical to this container means a cycle: do not descend,
    // do not re-visit, continue with the next sibling.
    if path_values.iter().any(|ancestor| ancestor.same(entry)) {
        return;
    }
    match entry {
        // Settled data cannot hold façades; there is nothing to visit below.
        Entry::Value(_) => {}
        Entry::Facade(facade) => {
            path_values.push(entry.clone());
            match order {
                Order::ParentFirst => {
                    if visitor(facade, path_values, path_keys) == Visit::Continue {
                        descend(facade, visitor, order, path_values, path_keys);
                    }
                }
                Order::ChildFirst => {
                    descend(facade, visitor, order, path_values, path_keys);
                    let _ = visitor(facade, path_values, path_keys);
                }
            }
            path_values.pop();
        }
        Entry::Array(items) => {
            path_values.push(entry.clone());
            for (i, child) in items.iter().enumerate() {
                if child.is_recognized() {
                    path_keys.push(Seg::Index(i));
                    walk(child, visitor, order, path_values, path_keys);
                    path_keys.pop();
                }
            }
            path_values.pop();
        }
        Entry::Object(map) => {
            path_values.push(entry.clone());
            for (k, child) in map.iter() {
                if child.is_recognized() {
                    path_keys.push(Seg::Key(k.clone()));
                    walk(child, visitor, order, path_values, path_keys);
                    path_keys.pop();
                }
            }
            path_values.pop();
        }
    }
}

fn descend<V>(
    facade: &Facade,
    visitor: &mut V,
    order: Order,
    path_values: &mut Vec<Entry>,
    path_keys: &mut Vec<Seg>,
) where
    V: FnMut(&Facade, &[Entry], &[Seg]) -> Visit,
{
    for (key, child) in facade.edges() {
        path_keys.push(key);
        walk(&child, visitor, order, path_values, path_keys);
        path_keys.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{value, wrap, Path, WrapOptions};

    fn collect_paths(root: &Entry, order: Order) -> Vec<String> {
        let mut paths = Vec::new();
        traverse(
            root,
            &mut |_, _, keys| {
                paths.push(Path::from(keys).to_string());
                Visit::Continue
            },
            order,
        );
        paths
    }

    #[test]
    fn test_visits_materialized_children_parent_first() {
        let p = wrap(
            value!({"a": {"x": 1}, "b": {"y": 2}}),
            WrapOptions::default(),
        )
        .unwrap();
        p.get("a").unwrap();
        p.get("b").unwrap();

        let paths = collect_paths(&Entry::Facade(p), Order::ParentFirst);
        assert_eq!(paths, vec!["", "/a", "/b"]);
    }

    #[test]
    fn test_child_first_visits_leaves_before_root() {
        let p = wrap(value!({"a": {"x": 1}}), WrapOptions::default()).unwrap();
        p.get("a").unwrap();

        let paths = collect_paths(&Entry::Facade(p), Order::ChildFirst);
        assert_eq!(paths, vec!["/a", ""]);
    }

    #[test]
    fn test_skip_prunes_subtree() {
        let p = wrap(value!({"a": {"b": {"c": 1}}}), WrapOptions::default()).unwrap();
        let a = p.get("a").unwrap().unwrap();
        a.as_facade().unwrap().get("b").unwrap();

        let mut paths = Vec::new();
        traverse(
            &Entry::Facade(p),
            &mut |_, _, keys| {
                paths.push(keys.len());
                if keys.len() == 1 {
                    Visit::Skip
                } else {
                    Visit::Continue
                }
            },
            Order::ParentFirst,
        );
        // Root and "a" are visited; "a.b" is pruned.
        assert_eq!(paths, vec![0, 1]);
    }

    #[test]
    fn test_patches_win_over_children() {
        let p = wrap(value!({"a": {"x": 1}}), WrapOptions::default()).unwrap();
        p.get("a").unwrap(); // materialize the child facade
        let other = wrap(value!({"y": 2}), WrapOptions::default()).unwrap();
        p.set("a", other.clone()).unwrap();

        let mut visited = Vec::new();
        traverse(
            &Entry::Facade(p.clone()),
            &mut |f, _, _| {
                visited.push(f.clone());
                Visit::Continue
            },
            Order::ParentFirst,
        );
        assert_eq!(visited.len(), 2);
        assert!(visited[1].ptr_eq(&other));
    }

    #[test]
    fn test_primitive_patches_are_skipped() {
        let p = wrap(value!({"a": 1}), WrapOptions::default()).unwrap();
        p.set("a", 2).unwrap();
        p.set("b", "new").unwrap();

        let paths = collect_paths(&Entry::Facade(p), Order::ParentFirst);
        assert_eq!(paths, vec!["$"]);
    }

    #[test]
    fn test_descends_through_literal_intermediates() {
        let p = wrap(value!({"foo": {"bar": 1}}), WrapOptions::default()).unwrap();
        let foo = p.get("foo").unwrap().unwrap();
        p.set("foo", Entry::object([("qux", foo)])).unwrap();

        let paths = collect_paths(&Entry::Facade(p), Order::ParentFirst);
        // The literal object is part of the path but is not itself visited.
        assert_eq!(paths, vec!["", "/foo/qux"]);
    }

    #[test]
    fn test_self_cycle_visits_once() {
        let p = wrap(value!({"a": null}), WrapOptions::default()).unwrap();
        p.set("a", p.clone()).unwrap();

        let mut count = 0;
        traverse(
            &Entry::Facade(p.clone()),
            &mut |f, values, keys| {
                count += 1;
                assert!(f.ptr_eq(&p));
                assert_eq!(values.len(), 1);
                assert!(keys.is_empty());
                Visit::Continue
            },
            Order::ParentFirst,
        );
        assert_eq!(count, 1);
    }

    #[test]
    fn test_two_facades_cycling_terminate() {
        let a = wrap(value!({"next": null}), WrapOptions::default()).unwrap();
        let b = wrap(value!({"next": null}), WrapOptions::default()).unwrap();
        a.set("next", b.clone()).unwrap();
        b.set("next", a.clone()).unwrap();

        let paths = collect_paths(&Entry::Facade(a), Order::ParentFirst);
        assert_eq!(paths, vec!["", "/next"]);
    }

    #[test]
    fn test_same_facade_under_two_paths_is_visited_twice() {
        let root = wrap(value!({"left": null, "right": null}), WrapOptions::default()).unwrap();
        let shared = wrap(value!({"x": 1}), WrapOptions::default()).unwrap();
        root.set("left", shared.clone()).unwrap();
        root.set("right", shared).unwrap();

        let paths = collect_paths(&Entry::Facade(root), Order::ParentFirst);
        assert_eq!(paths, vec!["", "/left", "/right"]);
    }
}
