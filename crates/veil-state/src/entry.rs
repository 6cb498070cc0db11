//! The union of things a façade slot can hold, and the shape predicates.
//!
//! An [`Entry`] is what façade reads return and façade writes accept: settled
//! data, another façade, or a literal container a user constructed that may
//! hold façades in its slots. Literal containers are how a freshly built
//! object or array referencing existing façades travels through a patch; the
//! traversal and snapshot engines descend through them to find the façades
//! inside.

use crate::{Facade, Value};
use indexmap::IndexMap;
use std::rc::Rc;

/// A value as seen through the façade layer.
#[derive(Clone, Debug)]
pub enum Entry {
    /// Settled data: a leaf, or a container holding only settled data.
    Value(Value),
    /// A recording façade over a container.
    Facade(Facade),
    /// A literal sequence that may hold façades in its slots.
    Array(Rc<Vec<Entry>>),
    /// A literal record that may hold façades in its slots.
    Object(Rc<IndexMap<String, Entry>>),
}

impl Entry {
    /// Build a literal sequence entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use veil_state::Entry;
    ///
    /// let e = Entry::array([1, 2, 3]);
    /// assert!(e.is_recognized());
    /// ```
    pub fn array<T: Into<Entry>>(items: impl IntoIterator<Item = T>) -> Entry {
        Entry::Array(Rc::new(items.into_iter().map(Into::into).collect()))
    }

    /// Build a literal record entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use veil_state::Entry;
    ///
    /// let e = Entry::object([("a", 1), ("b", 2)]);
    /// assert!(e.is_recognized());
    /// ```
    pub fn object<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Entry
    where
        K: Into<String>,
        V: Into<Entry>,
    {
        Entry::Object(Rc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// Returns true if this entry is a façade.
    #[inline]
    pub fn is_facade(&self) -> bool {
        matches!(self, Entry::Facade(_))
    }

    /// Returns true if this entry is a recognized container: a façade, a
    /// literal container, or a settled container value.
    #[inline]
    pub fn is_recognized(&self) -> bool {
        match self {
            Entry::Facade(_) | Entry::Array(_) | Entry::Object(_) => true,
            Entry::Value(v) => v.is_container(),
        }
    }

    /// Get the façade if this entry is one.
    #[inline]
    pub fn as_facade(&self) -> Option<&Facade> {
        match self {
            Entry::Facade(f) => Some(f),
            _ => None,
        }
    }

    /// Get the settled value if this entry is one.
    #[inline]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Entry::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Identity comparison: handle identity for façades and literal
    /// containers, [`Value::same`] for settled data.
    pub fn same(&self, other: &Entry) -> bool {
        match (self, other) {
            (Entry::Value(a), Entry::Value(b)) => a.same(b),
            (Entry::Facade(a), Entry::Facade(b)) => a.ptr_eq(b),
            (Entry::Array(a), Entry::Array(b)) => Rc::ptr_eq(a, b),
            (Entry::Object(a), Entry::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Returns true if `entry` is a recognized container (traversable and
/// wrappable): a façade, a literal container, or a settled container value.
#[inline]
pub fn is_recognized(entry: &Entry) -> bool {
    entry.is_recognized()
}

/// Returns true if `entry` is a façade.
#[inline]
pub fn is_facade(entry: &Entry) -> bool {
    entry.is_facade()
}

/// The underlying source if `entry` is a façade, `entry` itself otherwise.
#[inline]
pub fn source_of(entry: &Entry) -> Entry {
    match entry {
        Entry::Facade(f) => Entry::Value(f.source()),
        other => other.clone(),
    }
}

impl From<Value> for Entry {
    fn from(v: Value) -> Self {
        Entry::Value(v)
    }
}

impl From<Facade> for Entry {
    fn from(f: Facade) -> Self {
        Entry::Facade(f)
    }
}

impl From<bool> for Entry {
    fn from(v: bool) -> Self {
        Entry::Value(Value::from(v))
    }
}

impl From<i32> for Entry {
    fn from(v: i32) -> Self {
        Entry::Value(Value::from(v))
    }
}

impl From<i64> for Entry {
    fn from(v: i64) -> Self {
        Entry::Value(Value::from(v))
    }
}

impl From<u64> for Entry {
    fn from(v: u64) -> Self {
        Entry::Value(Value::from(v))
    }
}

impl From<f64> for Entry {
    fn from(v: f64) -> Self {
        Entry::Value(Value::from(v))
    }
}

impl From<&str> for Entry {
    fn from(v: &str) -> Self {
        Entry::Value(Value::from(v))
    }
}

impl From<String> for Entry {
    fn from(v: String) -> Self {
        Entry::Value(Value::from(v))
    }
}
