//! Homogeneous value representation with structural sharing.
//!
//! `Value` is the settled-data half of the engine: a JSON-like tree whose
//! containers live behind `Arc`, so cloning is O(1) and snapshots share
//! structure by reference. Identity (`Value::same`) is pointer identity for
//! containers and value equality for leaves.

use crate::Seg;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;
use std::fmt;
use std::sync::Arc;

/// Insertion-ordered map used for record containers.
pub type Map = IndexMap<String, Value>;

/// A JSON-like value with cheaply clonable, structurally shared containers.
///
/// Record containers preserve key insertion order; sequence containers are
/// dense. Everything that is not an `Array` or an `Object` is an opaque leaf.
///
/// # Examples
///
/// ```
/// use veil_state::{value, Value};
///
/// let v = value!({"user": {"name": "Alice"}, "tags": ["a", "b"]});
/// assert!(v.is_object());
/// assert_eq!(v["user"]["name"], "Alice");
///
/// // Clones share structure, so identity is preserved.
/// let w = v.clone();
/// assert!(v.same(&w));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// The null value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer or floating-point number.
    Number(Number),
    /// A string.
    String(String),
    /// A dense, ordered sequence container.
    Array(Arc<Vec<Value>>),
    /// An insertion-ordered record container.
    Object(Arc<Map>),
}

impl Value {
    /// Create a sequence value from a vector.
    #[inline]
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(items))
    }

    /// Create a record value from a map.
    #[inline]
    pub fn object(map: Map) -> Self {
        Value::Object(Arc::new(map))
    }

    /// Create an empty record value.
    #[inline]
    pub fn empty_object() -> Self {
        Value::Object(Arc::new(Map::new()))
    }

    /// Returns true if this is `Null`.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this is a sequence container.
    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Returns true if this is a record container.
    #[inline]
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Returns true if this is a container (sequence or record).
    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    /// Get the boolean if this is a `Bool`.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value as an `i64` if it is an integer number.
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Get the value as an `f64` if it is a number.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Get the string slice if this is a `String`.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the sequence items if this is an `Array`.
    #[inline]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get the record map if this is an `Object`.
    #[inline]
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a record key.
    #[inline]
    pub fn get_key(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Look up a sequence index.
    #[inline]
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.as_array().and_then(|items| items.get(index))
    }

    /// Look up a path segment (key on records, index on sequences).
    #[inline]
    pub fn get(&self, seg: &Seg) -> Option<&Value> {
        match seg {
            Seg::Key(k) => self.get_key(k),
            Seg::Index(i) => self.get_index(*i),
        }
    }

    /// Identity comparison: pointer identity for containers, value equality
    /// for leaves.
    ///
    /// This is the engine's notion of "the same value": two structurally
    /// equal containers built separately are *not* the same, but a container
    /// and its clone are.
    ///
    /// # Examples
    ///
    /// ```
    /// use veil_state::value;
    ///
    /// let a = value!({"x": 1});
    /// let b = value!({"x": 1});
    /// assert_eq!(a, b);
    /// assert!(!a.same(&b));
    /// assert!(a.same(&a.clone()));
    /// ```
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (a, b) => a == b,
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Get the kind name of a value, for error messages.
#[inline]
pub fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => serializer.collect_seq(items.iter()),
            Value::Object(map) => serializer.collect_map(map.iter()),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(serde_json::Value::deserialize(deserializer)?.into())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(Arc::new(items.into_iter().map(Value::from).collect()))
            }
            serde_json::Value::Object(map) => Value::Object(Arc::new(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            )),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(Number::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(Number::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(Number::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Number(Number::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Number::from_f64(v).map_or(Value::Null, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::array(v)
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Value::object(v)
    }
}

static NULL: Value = Value::Null;

impl std::ops::Index<&str> for Value {
    type Output = Value;

    /// Look up a record key, yielding `Null` for absent slots or non-records.
    fn index(&self, key: &str) -> &Value {
        self.get_key(key).unwrap_or(&NULL)
    }
}

impl std::ops::Index<usize> for Value {
    type Output = Value;

    /// Look up a sequence index, yielding `Null` for absent slots.
    fn index(&self, index: usize) -> &Value {
        self.get_index(index).unwrap_or(&NULL)
    }
}

macro_rules! impl_value_partial_eq {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl PartialEq<$ty> for Value {
                fn eq(&self, other: &$ty) -> bool {
                    *self == Value::from(other.clone())
                }
            }

            impl PartialEq<$ty> for &Value {
                fn eq(&self, other: &$ty) -> bool {
                    **self == Value::from(other.clone())
                }
            }
        )+
    };
}

impl_value_partial_eq!(bool, i32, i64, u32, u64, f64, &str, String);

/// Construct a [`Value`] from a JSON-like literal.
///
/// Delegates to `serde_json::json!`, so the full literal syntax (including
/// interpolated expressions) is available.
///
/// # Examples
///
/// ```
/// use veil_state::value;
///
/// let count = 3;
/// let v = value!({"items": [1, 2, count], "done": false});
/// assert_eq!(v["items"][2], 3);
/// ```
#[macro_export]
macro_rules! value {
    ($($tt:tt)+) => {
        $crate::Value::from($crate::serde_json::json!($($tt)+))
    };
}
