//! Validation and cleaning of caller payloads against a procedure model.

use crate::bind::{ParamValue, ParameterClassifier, ParameterMap};
use crate::error::{Error, Result};
use regex::Regex;

/// Keys passed through untouched whatever they hold.
const EXEMPT_KEYS: [&str; 3] = ["zipcode", "id", "phone"];

/// Money or plain numbers: `$1,234.50`, `0.00`, `42`.
const NUMBER_PATTERN: &str = r"^\$?((\d+,?\d+\.\d+)|(0\.00)|(\d+))$";

const DATE_PATTERN: &str = r"(\d{1,4}[/.-](\d{1,2}|\w{3})[/.-]\d{2,4})";

/// Checks payloads against a model and cleans their values.
#[derive(Debug, Clone)]
pub struct PayloadValidator {
    out: ParameterClassifier,
    number: Regex,
    date: Regex,
}

impl PayloadValidator {
    /// `out` recognizes OUT/return keys; those are never expected from callers.
    pub fn new(out: ParameterClassifier) -> Result<Self> {
        Ok(Self {
            out,
            number: Regex::new(NUMBER_PATTERN)?,
            date: Regex::new(DATE_PATTERN)?,
        })
    }

    /// Validate `payload` against `model` and return the cleaned IN values.
    ///
    /// Payload keys are matched case-insensitively. Fails with
    /// `PayloadMismatch` only when none of the model's IN keys are present;
    /// a partial payload is filled with nulls for the missing keys. Number
    /// strings lose currency and grouping characters, except for exempt
    /// keys, `*_id` keys, nulls and date-looking values.
    pub fn validate(&self, payload: &ParameterMap, model: &ParameterMap) -> Result<ParameterMap> {
        let payload: ParameterMap = payload
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();
        let expected: Vec<&String> = model.keys().filter(|k| !self.out.is_out_var(k)).collect();
        let missing: Vec<String> = expected
            .iter()
            .filter(|k| !payload.contains_key(k.as_str()))
            .map(|k| k.to_string())
            .collect();
        if !expected.is_empty() && missing.len() == expected.len() {
            tracing::warn!(?missing, "payload differs from model");
            return Err(Error::PayloadMismatch { missing });
        }

        let mut cleaned = ParameterMap::with_capacity(expected.len());
        for key in expected {
            let value = match payload.get(key.as_str()) {
                None => ParamValue::Null,
                Some(value) if self.is_exempt(key, value) => value.clone(),
                Some(value) => self.clean(value),
            };
            cleaned.insert(key.clone(), value);
        }
        Ok(cleaned)
    }

    fn is_exempt(&self, key: &str, value: &ParamValue) -> bool {
        if key.contains("_id") || EXEMPT_KEYS.contains(&key) || value.is_null() {
            return true;
        }
        matches!(value, ParamValue::Str(s) if self.date.is_match(s))
    }

    fn clean(&self, value: &ParamValue) -> ParamValue {
        match value {
            ParamValue::Str(s) if self.number.is_match(s) => {
                ParamValue::Str(s.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect())
            }
            other => other.clone(),
        }
    }
}

/// Validate and clean a payload in one call.
pub fn validate_payload(
    payload: &ParameterMap,
    model: &ParameterMap,
    out: &ParameterClassifier,
) -> Result<ParameterMap> {
    PayloadValidator::new(out.clone())?.validate(payload, model)
}
