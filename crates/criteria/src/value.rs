//! Owned value types carried by filters and cursor keys.
//!
//! The [`Value`] enum is a JSON-like vocabulary: primitives (null, booleans,
//! numbers, text, timestamps) plus lists and string-keyed maps. A value that
//! is *absent* is modelled as `Option::<Value>::None`; `Some(Value::Null)` is
//! an explicit null.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A filter or cursor value.
///
/// # Example
///
/// ```
/// use criteria::{Number, Value};
///
/// assert_eq!(Value::from(42), Value::Number(Number::I64(42)));
/// assert!(Value::from("draft").is_primitive());
/// assert!(!Value::from(vec![1, 2]).is_primitive());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Explicit null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(Number),
    /// Text value.
    Text(String),
    /// Timestamp value (milliseconds since Unix epoch).
    Timestamp(Timestamp),
    /// Ordered list of values.
    List(Vec<Value>),
    /// String-keyed map, used for path-addressed (nested document) values.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Builds a single-key map `{ path: value }`.
    pub fn path(path: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(path.into(), value.into());
        Value::Map(map)
    }

    /// Returns `true` for null, booleans, numbers, text and timestamps.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Value::List(_) | Value::Map(_))
    }

    /// Returns `true` for primitives other than null.
    pub fn is_non_null_primitive(&self) -> bool {
        self.is_primitive() && !self.is_null()
    }

    /// Returns `true` if this is a `Null` value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` unless a NaN or infinity appears anywhere in the value.
    pub fn is_finite(&self) -> bool {
        match self {
            Value::Number(n) => n.is_finite(),
            Value::List(items) => items.iter().all(Value::is_finite),
            Value::Map(map) => map.values().all(Value::is_finite),
            _ => true,
        }
    }

    /// Returns `true` if the value can be represented as plain JSON.
    ///
    /// Timestamps and non-finite floats have no JSON form.
    pub fn is_json(&self) -> bool {
        match self {
            Value::Null | Value::Bool(_) | Value::Text(_) => true,
            Value::Number(n) => n.is_finite(),
            Value::Timestamp(_) => false,
            Value::List(items) => items.iter().all(Value::is_json),
            Value::Map(map) => map.values().all(Value::is_json),
        }
    }

    /// Extracts the text value, if present.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Extracts the list items, if present.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Extracts the map entries, if present.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the name of this value's kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::Timestamp(t) => write!(f, "@{}", t.as_millis()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, item)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<Timestamp> for Value {
    fn from(t: Timestamp) -> Self {
        Value::Timestamp(t)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(items: [T; N]) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

macro_rules! value_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

value_from_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// Numeric value with precision-preserving variants.
///
/// Equality and ordering are numeric: `I64(5) == U64(5) == F64(5.0)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// 64-bit floating point.
    F64(f64),
}

impl Number {
    /// Converts the number to f64 for comparison.
    pub fn to_f64(self) -> f64 {
        match self {
            Number::I64(n) => n as f64,
            Number::U64(n) => n as f64,
            Number::F64(n) => n,
        }
    }

    /// Returns `false` for NaN and infinities.
    pub fn is_finite(self) -> bool {
        match self {
            Number::F64(n) => n.is_finite(),
            _ => true,
        }
    }

    /// Compares two numbers, handling mixed types.
    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::I64(a), Number::I64(b)) => Some(a.cmp(&b)),
            (Number::U64(a), Number::U64(b)) => Some(a.cmp(&b)),
            (Number::F64(a), Number::F64(b)) => a.partial_cmp(&b),
            (Number::I64(a), Number::U64(b)) => Some(compare_signed_unsigned(a, b)),
            (Number::U64(a), Number::I64(b)) => Some(compare_signed_unsigned(b, a).reverse()),
            _ => self.to_f64().partial_cmp(&other.to_f64()),
        }
    }
}

fn compare_signed_unsigned(a: i64, b: u64) -> Ordering {
    match u64::try_from(a) {
        Ok(a) => a.cmp(&b),
        Err(_) => Ordering::Less,
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.compare(*other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(*other)
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::I64(n) => write!(f, "{n}"),
            Number::U64(n) => write!(f, "{n}"),
            Number::F64(n) => write!(f, "{n}"),
        }
    }
}

macro_rules! number_from {
    ($variant:ident as $target:ty: $($ty:ty),*) => {
        $(
            impl From<$ty> for Number {
                fn from(n: $ty) -> Self {
                    Number::$variant(n as $target)
                }
            }
        )*
    };
}

number_from!(I64 as i64: i8, i16, i32, i64, isize);
number_from!(U64 as u64: u8, u16, u32, u64, usize);
number_from!(F64 as f64: f32, f64);

/// Timestamp value represented as milliseconds since Unix epoch.
///
/// In plain (JSON) form a timestamp is written as `{"$timestamp": millis}` so
/// that it survives a round trip without being confused with a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "TimestampRepr", into = "TimestampRepr")]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Creates a new timestamp from milliseconds since Unix epoch.
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    /// Creates a new timestamp from seconds since Unix epoch.
    pub fn from_secs(secs: i64) -> Self {
        Timestamp(secs * 1000)
    }

    /// Returns the timestamp as milliseconds since Unix epoch.
    pub fn as_millis(self) -> i64 {
        self.0
    }

    /// Returns the timestamp as seconds since Unix epoch.
    pub fn as_secs(self) -> i64 {
        self.0 / 1000
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimestampRepr {
    #[serde(rename = "$timestamp")]
    millis: i64,
}

impl From<TimestampRepr> for Timestamp {
    fn from(repr: TimestampRepr) -> Self {
        Timestamp(repr.millis)
    }
}

impl From<Timestamp> for TimestampRepr {
    fn from(ts: Timestamp) -> Self {
        TimestampRepr { millis: ts.0 }
    }
}
