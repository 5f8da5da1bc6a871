//! Value shaping: turns caller values into what the bind primitives accept.

use super::type_resolver::TypePatterns;
use super::value::{BindValue, ParamValue};
use std::fmt;

/// A value ready for a bind primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapedValue {
    Scalar(BindValue),
    Array(Vec<BindValue>),
}

impl ShapedValue {
    /// Check if this is an array value.
    pub fn is_array(&self) -> bool {
        matches!(self, ShapedValue::Array(_))
    }

    /// Get the scalar value, if any.
    pub fn as_scalar(&self) -> Option<&BindValue> {
        match self {
            ShapedValue::Scalar(v) => Some(v),
            ShapedValue::Array(_) => None,
        }
    }

    /// Get the array elements, if any.
    pub fn as_array(&self) -> Option<&[BindValue]> {
        match self {
            ShapedValue::Array(values) => Some(values),
            ShapedValue::Scalar(_) => None,
        }
    }

    /// Elements as a slice; a scalar is a one-element slice.
    pub fn elements(&self) -> &[BindValue] {
        match self {
            ShapedValue::Scalar(v) => std::slice::from_ref(v),
            ShapedValue::Array(values) => values,
        }
    }
}

impl fmt::Display for ShapedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapedValue::Scalar(v) => write!(f, "{}", v),
            ShapedValue::Array(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Shapes caller values for binding.
#[derive(Debug, Clone)]
pub struct ValueShaper {
    patterns: TypePatterns,
}

impl ValueShaper {
    pub fn new(patterns: TypePatterns) -> Self {
        Self { patterns }
    }

    /// Shape a value, unwrapping any compound descriptor first.
    ///
    /// Scalars pass through unchanged. Arrays are converted element-wise
    /// with exponent repair applied.
    pub fn shape(&self, value: &ParamValue) -> ShapedValue {
        let inner = value.unwrap_compound();
        match inner.array_elements() {
            Some(elements) => ShapedValue::Array(self.shape_array(&elements)),
            None => ShapedValue::Scalar(inner.to_bind_value()),
        }
    }

    fn shape_array(&self, elements: &[&ParamValue]) -> Vec<BindValue> {
        let values: Vec<BindValue> = elements
            .iter()
            .map(|e| self.repair_exponent(e.to_bind_value()))
            .collect();
        if Self::contains_null(&values) {
            self.pass_null_array(values)
        } else {
            values
        }
    }

    /// Check if any element is NULL.
    pub fn contains_null(values: &[BindValue]) -> bool {
        values.iter().any(BindValue::is_null)
    }

    fn pass_null_array(&self, values: Vec<BindValue>) -> Vec<BindValue> {
        let nulls = values.iter().filter(|v| v.is_null()).count();
        tracing::warn!(
            elements = values.len(),
            nulls,
            "binding array containing NULL elements unchanged"
        );
        values
    }

    /// Restore a `+` exponent sign that arrived as a space.
    ///
    /// `1.5e 10` becomes `1.5e+10`. Values not in float notation are returned
    /// untouched.
    pub fn repair_exponent(&self, value: BindValue) -> BindValue {
        match value {
            BindValue::Str(s) if s.contains(' ') && self.patterns.is_float(&s) => {
                BindValue::Str(s.replace(' ', "+"))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TypePatternConfig;
    use pretty_assertions::assert_eq;

    fn shaper() -> ValueShaper {
        ValueShaper::new(TypePatterns::from_config(&TypePatternConfig::default()).unwrap())
    }

    #[test]
    fn test_scalar_passes_through() {
        let s = shaper();
        assert_eq!(
            s.shape(&ParamValue::from("http://x")),
            ShapedValue::Scalar(BindValue::Str("http://x".into()))
        );
        assert_eq!(s.shape(&ParamValue::Null), ShapedValue::Scalar(BindValue::Null));
        // Scalars are not exponent-repaired.
        assert_eq!(
            s.shape(&ParamValue::from("1.5e 3")),
            ShapedValue::Scalar(BindValue::Str("1.5e 3".into()))
        );
    }

    #[test]
    fn test_compound_is_unwrapped() {
        let s = shaper();
        let v = ParamValue::compound(10, "chr", vec!["a", "b"]);
        assert_eq!(
            s.shape(&v),
            ShapedValue::Array(vec![BindValue::Str("a".into()), BindValue::Str("b".into())])
        );
    }

    #[test]
    fn test_exponent_repair() {
        let s = shaper();
        let v = ParamValue::from(vec!["1.5e 10", "2.0", "a b"]);
        assert_eq!(
            s.shape(&v),
            ShapedValue::Array(vec![
                BindValue::Str("1.5e+10".into()),
                BindValue::Str("2.0".into()),
                BindValue::Str("a b".into()),
            ])
        );
    }

    #[test]
    fn test_null_array_is_unchanged() {
        let s = shaper();
        let v = ParamValue::Array(vec![ParamValue::Int(1), ParamValue::Null]);
        let shaped = s.shape(&v);
        assert_eq!(
            shaped,
            ShapedValue::Array(vec![BindValue::Int(1), BindValue::Null])
        );
        assert!(ValueShaper::contains_null(shaped.elements()));
    }

    #[test]
    fn test_empty_array() {
        let s = shaper();
        assert_eq!(s.shape(&ParamValue::Array(vec![])), ShapedValue::Array(vec![]));
    }
}
