//! Parameter classification: decides how each named parameter is bound.

use super::value::ParamValue;
use crate::config::BindingsConfig;
use crate::error::{Error, Result};
use std::fmt;

/// How a parameter is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindMode {
    /// Plain scalar IN parameter; driver picks length and type.
    ScalarIn,
    /// Raw array IN parameter; type inferred from the elements.
    ArrayIn,
    /// IN parameter described by a `{length, type, value}` descriptor.
    CompoundIn,
    /// OUT variable or function return; always a descriptor.
    OutOrReturn,
    /// Descriptor whose type names a `schema.type` collection.
    CustomCollection,
}

impl BindMode {
    /// Check if the mode binds an OUT/return parameter.
    pub fn is_out(&self) -> bool {
        matches!(self, BindMode::OutOrReturn)
    }

    /// Check if the value arrives wrapped in a descriptor.
    pub fn is_compound(&self) -> bool {
        matches!(
            self,
            BindMode::CompoundIn | BindMode::OutOrReturn | BindMode::CustomCollection
        )
    }
}

impl fmt::Display for BindMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BindMode::ScalarIn => "scalar-in",
            BindMode::ArrayIn => "array-in",
            BindMode::CompoundIn => "compound-in",
            BindMode::OutOrReturn => "out-or-return",
            BindMode::CustomCollection => "custom-collection",
        };
        f.write_str(name)
    }
}

/// Classifies parameters by name convention and value shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterClassifier {
    out_suffixes: Vec<String>,
}

impl ParameterClassifier {
    /// Create a classifier from OUT and function-return suffixes.
    pub fn new<I, S>(out_suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            out_suffixes: out_suffixes
                .into_iter()
                .map(Into::<String>::into)
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Create a classifier from the bindings configuration.
    pub fn from_config(config: &BindingsConfig) -> Self {
        Self::new(config.out_suffixes())
    }

    /// Configured suffixes.
    pub fn out_suffixes(&self) -> &[String] {
        &self.out_suffixes
    }

    /// Check if the name marks an OUT variable or function return.
    ///
    /// Matching is an unanchored substring test: `a_outvariable` matches the
    /// suffix `_outvar` just as `result_outvar` does, while
    /// `outvariable_result` does not. Callers must keep IN parameter names
    /// clear of the configured suffixes.
    pub fn is_out_var(&self, name: &str) -> bool {
        self.out_suffixes.iter().any(|suffix| name.contains(suffix.as_str()))
    }

    /// Classify a parameter.
    ///
    /// Returns `OutOrReturn`, `CompoundIn`, `ArrayIn` or `ScalarIn`.
    /// `CustomCollection` is only known once the type token is resolved.
    pub fn classify(&self, name: &str, value: &ParamValue) -> Result<BindMode> {
        if self.is_out_var(name) {
            if !value.is_compound() {
                return Err(Error::MalformedOutParameter {
                    name: name.to_string(),
                });
            }
            return Ok(BindMode::OutOrReturn);
        }
        if value.is_compound() {
            return Ok(BindMode::CompoundIn);
        }
        if value.is_array() {
            return Ok(BindMode::ArrayIn);
        }
        Ok(BindMode::ScalarIn)
    }
}
