//! Slot addressing: façade keys and multi-step paths.
//!
//! A [`Seg`] names one slot of a container; façade reads, writes, and child
//! caches are all keyed by segments, and the traversal engine reports the
//! segments taken from the root as a slice. A [`Path`] is nothing more than
//! a run of segments: enough to hand to [`Facade::get_at`](crate::Facade::get_at)
//! or to render a traversal position for humans. Paths are not serialized and
//! carry no navigation logic of their own; the façade layer owns that.

use std::fmt;

/// One container slot: a key into a record or a position in a sequence.
///
/// The variant kind must match the container kind it is used against; a
/// mismatched segment reads as absent and fails to write (see
/// [`Facade::set`](crate::Facade::set)).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Seg {
    /// A key into a record container.
    Key(String),
    /// A position in a sequence container.
    Index(usize),
}

impl Seg {
    /// A key segment.
    #[inline]
    pub fn key(key: impl Into<String>) -> Self {
        Seg::Key(key.into())
    }

    /// An index segment.
    #[inline]
    pub fn index(index: usize) -> Self {
        Seg::Index(index)
    }
}

impl From<&str> for Seg {
    fn from(key: &str) -> Self {
        Seg::Key(key.to_owned())
    }
}

impl From<String> for Seg {
    fn from(key: String) -> Self {
        Seg::Key(key)
    }
}

impl From<usize> for Seg {
    fn from(index: usize) -> Self {
        Seg::Index(index)
    }
}

impl From<&Seg> for Seg {
    fn from(seg: &Seg) -> Self {
        seg.clone()
    }
}

/// A run of segments addressing a nested slot, outermost first.
///
/// Build one with the [`path!`] macro, or from the key slice a traversal
/// visitor receives. The empty path addresses the root itself.
///
/// # Examples
///
/// ```
/// use veil_state::{path, value, wrap, WrapOptions};
///
/// let facade = wrap(value!({"users": [{"name": "ada"}]}), WrapOptions::default()).unwrap();
/// let name = facade.get_at(&path!("users", 0, "name")).unwrap().unwrap();
/// assert_eq!(*name.as_value().unwrap(), "ada");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path(Vec<Seg>);

impl Path {
    /// The empty path, addressing the root itself.
    #[inline]
    pub fn root() -> Self {
        Path(Vec::new())
    }

    /// The segments of this path, outermost first.
    #[inline]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }
}

impl From<Vec<Seg>> for Path {
    fn from(segments: Vec<Seg>) -> Self {
        Path(segments)
    }
}

impl From<&[Seg]> for Path {
    fn from(segments: &[Seg]) -> Self {
        Path(segments.to_vec())
    }
}

impl fmt::Display for Path {
    /// Pointer-style rendering: one `/`-prefixed step per segment, so
    /// `path!("users", 0, "name")` renders as `/users/0/name` and the root
    /// path renders as the empty string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for seg in &self.0 {
            match seg {
                Seg::Key(key) => write!(f, "/{}", key)?,
                Seg::Index(index) => write!(f, "/{}", index)?,
            }
        }
        Ok(())
    }
}

/// Build a [`Path`] from literal segments.
///
/// String literals address record keys, integers address sequence positions.
///
/// # Examples
///
/// ```
/// use veil_state::path;
///
/// let p = path!("items", 0, "name");
/// assert_eq!(p.to_string(), "/items/0/name");
/// ```
#[macro_export]
macro_rules! path {
    ($($seg:expr),* $(,)?) => {
        $crate::Path::from(vec![$($crate::Seg::from($seg)),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{traverse, value, wrap, Entry, Order, Visit, WrapOptions};

    #[test]
    fn test_facade_keys_are_segments() {
        let p = wrap(value!({"users": [{"name": "ada"}]}), WrapOptions::default()).unwrap();
        assert_eq!(p.keys().unwrap(), vec![Seg::key("users")]);

        let users = p.get("users").unwrap().unwrap();
        assert_eq!(
            users.as_facade().unwrap().keys().unwrap(),
            vec![Seg::index(0)]
        );
    }

    #[test]
    fn test_path_macro_mixes_keys_and_indices() {
        let path = path!("users", 0, "name");
        assert_eq!(
            path.segments(),
            [Seg::key("users"), Seg::index(0), Seg::key("name")]
        );
        assert!(path!().segments().is_empty());
        assert_eq!(path!(), Path::root());
    }

    #[test]
    fn test_traversal_keys_render_as_pointers() {
        let p = wrap(value!({"a": {"b": [{"c": 1}]}}), WrapOptions::default()).unwrap();
        let a = p.get("a").unwrap().unwrap();
        let b = a.as_facade().unwrap().get("b").unwrap().unwrap();
        b.as_facade().unwrap().get(0).unwrap();

        let mut rendered = Vec::new();
        traverse(
            &Entry::Facade(p),
            &mut |_, _, keys| {
                rendered.push(Path::from(keys).to_string());
                Visit::Continue
            },
            Order::ParentFirst,
        );
        assert_eq!(rendered, ["", "/a", "/a/b", "/a/b/0"]);
    }

    #[test]
    fn test_get_at_distinguishes_key_and_index_segments() {
        let p = wrap(value!({"rows": [[1, 2]]}), WrapOptions::default()).unwrap();
        let cell = p.get_at(&path!("rows", 0, 1)).unwrap().unwrap();
        assert_eq!(*cell.as_value().unwrap(), 2);

        // A key segment against a sequence addresses nothing.
        assert!(p.get_at(&path!("rows", "first")).unwrap().is_none());
    }
}
