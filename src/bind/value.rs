//! Parameter values as supplied by callers, and the primitive values handed
//! to the driver.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered map of parameter name to caller-supplied value.
///
/// Order is preserved: parameters are bound in insertion order.
pub type ParameterMap = IndexMap<String, ParamValue>;

/// Keys that make a map a compound `{length, type, value}` descriptor.
pub const COMPOUND_KEYS: [&str; 3] = ["length", "type", "value"];

/// A caller-supplied parameter value.
///
/// This is the dynamically-typed input format: a primitive, a raw array, or a
/// map. A map carrying all of `length`, `type` and `value` is a compound
/// descriptor; see [`ParamValue::as_compound`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDateTime),
    Array(Vec<ParamValue>),
    Map(IndexMap<String, ParamValue>),
    Null,
}

/// Borrowed view of a compound `{length, type, value}` descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompoundDescriptor<'a> {
    /// Requested buffer length (integer, numeric string, or null).
    pub length: &'a ParamValue,
    /// Requested type token (symbolic, numeric, `schema.type`, or null).
    pub type_token: &'a ParamValue,
    /// The value itself (scalar, array, or null).
    pub value: &'a ParamValue,
}

impl ParamValue {
    /// Build a compound descriptor value.
    pub fn compound(
        length: impl Into<ParamValue>,
        type_token: impl Into<ParamValue>,
        value: impl Into<ParamValue>,
    ) -> Self {
        let mut map = IndexMap::with_capacity(3);
        map.insert("length".to_string(), length.into());
        map.insert("type".to_string(), type_token.into());
        map.insert("value".to_string(), value.into());
        ParamValue::Map(map)
    }

    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    /// Check if the value is "empty" in the loose sense used for optional
    /// hints: null, empty string, or zero.
    pub fn is_blank(&self) -> bool {
        match self {
            ParamValue::Null => true,
            ParamValue::Str(s) => s.trim().is_empty(),
            ParamValue::Int(0) => true,
            ParamValue::Bool(false) => true,
            _ => false,
        }
    }

    /// Strict structural test for a compound descriptor.
    ///
    /// All three keys must be present, even when null. A map with only some
    /// of them is not a descriptor.
    pub fn as_compound(&self) -> Option<CompoundDescriptor<'_>> {
        let ParamValue::Map(map) = self else {
            return None;
        };
        Some(CompoundDescriptor {
            length: map.get(COMPOUND_KEYS[0])?,
            type_token: map.get(COMPOUND_KEYS[1])?,
            value: map.get(COMPOUND_KEYS[2])?,
        })
    }

    /// Check if the value is a compound descriptor.
    pub fn is_compound(&self) -> bool {
        self.as_compound().is_some()
    }

    /// Elements of an array-like value.
    ///
    /// Raw arrays yield their elements. Maps that are not compound descriptors
    /// are treated as arrays of their values. Everything else is not an array.
    pub fn array_elements(&self) -> Option<Vec<&ParamValue>> {
        match self {
            ParamValue::Array(items) => Some(items.iter().collect()),
            ParamValue::Map(map) if !self.is_compound() => Some(map.values().collect()),
            _ => None,
        }
    }

    /// Check if the value is array-like (see [`ParamValue::array_elements`]).
    pub fn is_array(&self) -> bool {
        match self {
            ParamValue::Array(_) => true,
            ParamValue::Map(_) => !self.is_compound(),
            _ => false,
        }
    }

    /// The value with any compound wrapping removed.
    pub fn unwrap_compound(&self) -> &ParamValue {
        match self.as_compound() {
            Some(descriptor) => descriptor.value.unwrap_compound(),
            None => self,
        }
    }

    /// Convert to the primitive handed to the driver.
    ///
    /// Nested arrays and maps have no primitive form; they are flattened to
    /// their text rendering.
    pub fn to_bind_value(&self) -> BindValue {
        match self {
            ParamValue::Null => BindValue::Null,
            ParamValue::Bool(b) => BindValue::Bool(*b),
            ParamValue::Int(i) => BindValue::Int(*i),
            ParamValue::Float(f) => BindValue::Float(*f),
            ParamValue::Str(s) => BindValue::Str(s.clone()),
            ParamValue::Date(dt) => BindValue::Date(*dt),
            ParamValue::Array(_) | ParamValue::Map(_) => BindValue::Str(self.to_string()),
        }
    }

    /// Text used when matching the value against type patterns.
    ///
    /// Floats always render with a decimal point or exponent so they are
    /// never mistaken for integers.
    pub fn sample_text(&self) -> String {
        match self {
            ParamValue::Null => String::new(),
            ParamValue::Bool(true) => "1".to_string(),
            ParamValue::Bool(false) => String::new(),
            ParamValue::Float(f) => format!("{:?}", f),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => write!(f, "NULL"),
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Str(s) => write!(f, "{}", s),
            ParamValue::Date(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            ParamValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ParamValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Int(i)
    }
}

impl From<i32> for ParamValue {
    fn from(i: i32) -> Self {
        ParamValue::Int(i as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(x: f64) -> Self {
        ParamValue::Float(x)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<NaiveDateTime> for ParamValue {
    fn from(dt: NaiveDateTime) -> Self {
        ParamValue::Date(dt)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(items: Vec<T>) -> Self {
        ParamValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(ParamValue::Null, Into::into)
    }
}

impl From<BindValue> for ParamValue {
    fn from(value: BindValue) -> Self {
        match value {
            BindValue::Null => ParamValue::Null,
            BindValue::Bool(b) => ParamValue::Bool(b),
            BindValue::Int(i) => ParamValue::Int(i),
            BindValue::Float(x) => ParamValue::Float(x),
            BindValue::Str(s) => ParamValue::Str(s),
            BindValue::Date(dt) => ParamValue::Date(dt),
        }
    }
}

/// A primitive value handed to (or read back from) the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    /// NULL value.
    Null,
    /// Boolean, bound as 1/0 by most drivers.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String value. OUT parameters always come back as strings.
    Str(String),
    /// Date/time value.
    Date(NaiveDateTime),
}

impl BindValue {
    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, BindValue::Null)
    }

    /// Try to get the value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BindValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Try to convert to i64.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            BindValue::Int(i) => Some(*i),
            BindValue::Bool(b) => Some(*b as i64),
            BindValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to f64.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            BindValue::Int(i) => Some(*i as f64),
            BindValue::Float(x) => Some(*x),
            BindValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to get the value as a NaiveDateTime.
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            BindValue::Date(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Byte length of the text form, as a driver would measure it.
    pub fn text_len(&self) -> usize {
        match self {
            BindValue::Null => 0,
            other => other.to_string().len(),
        }
    }
}

impl fmt::Display for BindValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindValue::Null => write!(f, "NULL"),
            BindValue::Bool(true) => write!(f, "1"),
            BindValue::Bool(false) => write!(f, "0"),
            BindValue::Int(i) => write!(f, "{}", i),
            BindValue::Float(x) => write!(f, "{}", x),
            BindValue::Str(s) => write!(f, "{}", s),
            BindValue::Date(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn from_json(v: serde_json::Value) -> ParamValue {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_deserialize_from_json() {
        assert_eq!(from_json(json!(null)), ParamValue::Null);
        assert_eq!(from_json(json!(3)), ParamValue::Int(3));
        assert_eq!(from_json(json!(2.5)), ParamValue::Float(2.5));
        assert_eq!(from_json(json!("x")), ParamValue::Str("x".into()));
        assert_eq!(
            from_json(json!([1, "a", null])),
            ParamValue::Array(vec![
                ParamValue::Int(1),
                ParamValue::Str("a".into()),
                ParamValue::Null
            ])
        );
    }

    #[test]
    fn test_compound_requires_all_three_keys() {
        let full = from_json(json!({"length": 8, "type": "int", "value": null}));
        assert!(full.is_compound());
        assert!(!full.is_array());

        let nulls = from_json(json!({"length": null, "type": null, "value": null}));
        assert!(nulls.is_compound());

        let partial = from_json(json!({"type": "int", "value": 5}));
        assert!(!partial.is_compound());
        assert!(partial.is_array());

        assert!(!ParamValue::Str("length".into()).is_compound());
    }

    #[test]
    fn test_compound_view() {
        let v = ParamValue::compound(250, "chr", "abc");
        let c = v.as_compound().unwrap();
        assert_eq!(c.length, &ParamValue::Int(250));
        assert_eq!(c.type_token, &ParamValue::Str("chr".into()));
        assert_eq!(c.value, &ParamValue::Str("abc".into()));
        assert_eq!(v.unwrap_compound(), &ParamValue::Str("abc".into()));
    }

    #[test]
    fn test_sample_text_keeps_float_shape() {
        assert_eq!(ParamValue::Float(2.0).sample_text(), "2.0");
        assert_eq!(ParamValue::Int(2).sample_text(), "2");
        assert_eq!(ParamValue::Null.sample_text(), "");
        assert_eq!(ParamValue::Bool(true).sample_text(), "1");
    }

    #[test]
    fn test_bind_value_conversions() {
        assert_eq!(BindValue::Str(" 42 ".into()).to_i64(), Some(42));
        assert_eq!(BindValue::Str("1.5".into()).to_f64(), Some(1.5));
        assert_eq!(BindValue::Int(7).to_f64(), Some(7.0));
        assert_eq!(BindValue::Null.text_len(), 0);
        assert_eq!(BindValue::Str("abcd".into()).text_len(), 4);
        assert_eq!(format!("{}", BindValue::Bool(true)), "1");
    }
}
