//! Buffer length resolution for scalar and array binds.

use super::value::{BindValue, ParamValue};
use crate::config::NullArrayPolicy;
use crate::constants::DRIVER_DECIDES;
use crate::error::{Error, Result};
use std::fmt;

/// Resolved buffer lengths for one bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthSpec {
    /// Scalar buffer length; `-1` lets the driver decide.
    Scalar(i64),
    /// Array bind: number of slots and per-item length (`-1` = driver decides).
    Array {
        max_table_length: usize,
        max_item_length: i64,
    },
}

impl LengthSpec {
    /// Length to hand to a scalar bind, or `None` when the driver decides.
    pub fn scalar_hint(&self) -> Option<i64> {
        match self {
            LengthSpec::Scalar(len) if *len != DRIVER_DECIDES => Some(*len),
            _ => None,
        }
    }

    /// Check if this describes an array bind.
    pub fn is_array(&self) -> bool {
        matches!(self, LengthSpec::Array { .. })
    }
}

impl fmt::Display for LengthSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthSpec::Scalar(len) => write!(f, "{}", len),
            LengthSpec::Array {
                max_table_length,
                max_item_length,
            } => write!(f, "{}x{}", max_table_length, max_item_length),
        }
    }
}

/// Computes [`LengthSpec`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LengthResolver {
    null_policy: NullArrayPolicy,
}

impl LengthResolver {
    pub fn new(null_policy: NullArrayPolicy) -> Self {
        Self { null_policy }
    }

    pub fn null_policy(&self) -> NullArrayPolicy {
        self.null_policy
    }

    /// Resolve lengths for a value.
    ///
    /// `length` is the descriptor's length field (pass `Null` for plain
    /// parameters) and `value` the unwrapped value.
    ///
    /// * arrays: one slot per element with driver-decided item length; an
    ///   empty array always gets one slot of length 1. An explicit length on
    ///   a descriptor raises the slot count but never below the element count.
    /// * compound scalars: the explicit length, `-1` when absent or blank.
    /// * plain scalars: `-1`.
    pub fn resolve(&self, length: &ParamValue, value: &ParamValue, is_compound: bool) -> Result<LengthSpec> {
        if let Some(elements) = value.array_elements() {
            let values: Vec<BindValue> = elements.iter().map(|e| e.to_bind_value()).collect();
            let mut spec = self.array_length(&values);
            if is_compound && !elements.is_empty() && !length.is_blank() {
                let requested = parse_length(length)?;
                if let LengthSpec::Array {
                    max_table_length, ..
                } = &mut spec
                {
                    let requested = usize::try_from(requested).unwrap_or(0);
                    *max_table_length = (*max_table_length).max(requested);
                }
            }
            return Ok(spec);
        }
        if !is_compound {
            return Ok(LengthSpec::Scalar(DRIVER_DECIDES));
        }
        match length {
            ParamValue::Int(0) => Ok(LengthSpec::Scalar(0)),
            blank if blank.is_blank() => Ok(LengthSpec::Scalar(DRIVER_DECIDES)),
            other => Ok(LengthSpec::Scalar(parse_length(other)?)),
        }
    }

    /// Lengths for an array of already-converted values.
    pub fn array_length(&self, values: &[BindValue]) -> LengthSpec {
        if values.is_empty() {
            return LengthSpec::Array {
                max_table_length: 1,
                max_item_length: 1,
            };
        }
        let max_item_length = match self.null_policy {
            NullArrayPolicy::MeasureItems if values.iter().any(BindValue::is_null) => {
                let longest = values.iter().map(BindValue::text_len).max().unwrap_or(0);
                i64::try_from(longest.max(1)).unwrap_or(DRIVER_DECIDES)
            }
            _ => DRIVER_DECIDES,
        };
        LengthSpec::Array {
            max_table_length: values.len(),
            max_item_length,
        }
    }
}

/// Parse an explicit length: integers as-is, numeric strings truncated.
fn parse_length(length: &ParamValue) -> Result<i64> {
    let invalid = || Error::InvalidLength {
        length: length.to_string(),
    };
    match length {
        ParamValue::Int(n) => Ok(*n),
        ParamValue::Float(x) if x.is_finite() => Ok(x.trunc() as i64),
        ParamValue::Str(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                return Ok(n);
            }
            match s.parse::<f64>() {
                Ok(x) if x.is_finite() => Ok(x.trunc() as i64),
                _ => Err(invalid()),
            }
        }
        _ => Err(invalid()),
    }
}
