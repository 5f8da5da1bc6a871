//! Wire type resolution: explicit type tokens and inference from samples.

use super::value::ParamValue;
use super::wire_type::{CustomType, WireType};
use crate::config::{AllowedBindTypes, BindingsConfig, TypePatternConfig};
use crate::constants::SQLT_PREFIX;
use crate::error::{Error, Result};
use regex::Regex;

/// A caller-supplied type token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeToken {
    /// Symbolic name: `chr`, `SQLT_INT`, `date`, `HR.NUM_LIST`.
    Symbolic(String),
    /// Numeric driver code, taken as already resolved.
    Code(u16),
}

impl TypeToken {
    /// Read the `type` field of a descriptor.
    ///
    /// Null, blank strings, `0` and `false` mean "no type given".
    pub fn from_value(value: &ParamValue) -> Result<Option<Self>> {
        if value.is_blank() {
            return Ok(None);
        }
        match value {
            ParamValue::Int(code) => u16::try_from(*code)
                .map(|c| Some(TypeToken::Code(c)))
                .map_err(|_| Error::InvalidBindType {
                    token: code.to_string(),
                }),
            ParamValue::Float(x) => numeric_code(*x, &x.to_string()).map(Some),
            ParamValue::Str(s) => {
                let s = s.trim();
                // Numeric tokens are codes, never `schema.type` names.
                match s.parse::<f64>() {
                    Ok(x) if x.is_finite() => numeric_code(x, s).map(Some),
                    _ => Ok(Some(TypeToken::Symbolic(s.to_string()))),
                }
            }
            other => Err(Error::InvalidBindType {
                token: other.to_string(),
            }),
        }
    }
}

/// A numeric token is a code only when it is a whole number in `u16` range.
fn numeric_code(x: f64, token: &str) -> Result<TypeToken> {
    if x.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(&x) {
        return Ok(TypeToken::Code(x as u16));
    }
    Err(Error::InvalidBindType {
        token: token.to_string(),
    })
}

/// Category a sample element falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleCategory {
    Float,
    Num,
    Int,
    Date,
    Varchar,
}

/// Compiled inference patterns.
#[derive(Debug, Clone)]
pub struct TypePatterns {
    float: Regex,
    num: Regex,
    int: Regex,
    date: Regex,
}

impl TypePatterns {
    /// Compile the four pattern sources.
    pub fn new(float: &str, num: &str, int: &str, date: &str) -> Result<Self> {
        Ok(Self {
            float: Regex::new(float)?,
            num: Regex::new(num)?,
            int: Regex::new(int)?,
            date: Regex::new(date)?,
        })
    }

    /// Compile from configuration.
    pub fn from_config(config: &TypePatternConfig) -> Result<Self> {
        Self::new(&config.float, &config.num, &config.int, &config.date)
    }

    /// Categorize one sample, trying float, num, int, date in that order.
    pub fn categorize(&self, text: &str) -> SampleCategory {
        let text = strip_quotes(text);
        if self.float.is_match(text) {
            SampleCategory::Float
        } else if self.num.is_match(text) {
            SampleCategory::Num
        } else if self.int.is_match(text) {
            SampleCategory::Int
        } else if self.date.is_match(text) {
            SampleCategory::Date
        } else {
            SampleCategory::Varchar
        }
    }

    /// Check if the text is in floating-point notation.
    pub fn is_float(&self, text: &str) -> bool {
        self.float.is_match(strip_quotes(text))
    }
}

fn strip_quotes(text: &str) -> &str {
    text.trim_matches(|c| c == '"' || c == '\'')
}

/// Per-category counts over a sample array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeTally {
    pub float: usize,
    pub num: usize,
    pub int: usize,
    pub date: usize,
    pub varchar: usize,
}

impl TypeTally {
    /// Count one categorized sample.
    pub fn record(&mut self, category: SampleCategory) {
        match category {
            SampleCategory::Float => self.float += 1,
            SampleCategory::Num => self.num += 1,
            SampleCategory::Int => self.int += 1,
            SampleCategory::Date => self.date += 1,
            SampleCategory::Varchar => self.varchar += 1,
        }
    }

    /// Number of numeric samples of any kind.
    pub fn numeric(&self) -> usize {
        self.float + self.num + self.int
    }

    /// Pick the wire type.
    ///
    /// Any varchar wins outright. Dates win only with no numeric content.
    /// Among numerics float beats number beats integer. Nothing at all
    /// falls back to varchar.
    pub fn decide(&self) -> WireType {
        if self.varchar > 0 {
            return WireType::Chr;
        }
        let numeric = self.numeric();
        if numeric == 0 && self.date > 0 {
            return WireType::Odt;
        }
        if numeric > 0 {
            return if self.float > 0 {
                WireType::Flt
            } else if self.num > 0 {
                WireType::Num
            } else {
                WireType::Int
            };
        }
        WireType::Chr
    }
}

/// Resolves explicit type tokens and infers types from sample values.
#[derive(Debug, Clone)]
pub struct TypeResolver {
    patterns: TypePatterns,
    allowed: AllowedBindTypes,
}

impl TypeResolver {
    /// Create a resolver.
    pub fn new(patterns: TypePatterns, allowed: AllowedBindTypes) -> Self {
        Self { patterns, allowed }
    }

    /// Create a resolver from the bindings configuration.
    pub fn from_config(config: &BindingsConfig) -> Result<Self> {
        Ok(Self::new(
            TypePatterns::from_config(&config.type_patterns)?,
            config.allowed_bind_types.clone(),
        ))
    }

    /// The compiled inference patterns.
    pub fn patterns(&self) -> &TypePatterns {
        &self.patterns
    }

    /// Normalize a symbolic token to its `SQLT_*` form.
    ///
    /// Upper-cases, maps anything starting with `DATE` to `SQLT_ODT`, and
    /// adds the prefix when missing.
    pub fn normalize_symbol(token: &str) -> String {
        let upper = token.trim().to_uppercase();
        let upper = if upper.starts_with("DATE") {
            "SQLT_ODT".to_string()
        } else {
            upper
        };
        if upper.contains(SQLT_PREFIX) {
            upper
        } else {
            format!("{}{}", SQLT_PREFIX, upper)
        }
    }

    /// Detect a `schema.type` collection reference.
    ///
    /// Allowed symbolic types never count, even if they contain a dot.
    pub fn custom_collection(&self, token: &TypeToken) -> Option<CustomType> {
        let TypeToken::Symbolic(raw) = token else {
            return None;
        };
        if self.allowed.allows(&Self::normalize_symbol(raw)) {
            return None;
        }
        CustomType::parse(raw)
    }

    /// Resolve an explicit token.
    ///
    /// OUT variables always bind as `SQLT_CHR`; the driver does not bind
    /// them reliably as anything else.
    pub fn resolve_explicit(&self, token: &TypeToken, is_outvar: bool) -> Result<WireType> {
        if is_outvar {
            return Ok(WireType::Chr);
        }
        let raw = match token {
            TypeToken::Code(code) => return Ok(WireType::from_code(*code)),
            TypeToken::Symbolic(raw) => raw,
        };
        let symbol = Self::normalize_symbol(raw);
        if self.allowed.allows(&symbol) {
            return WireType::from_name(&symbol).ok_or(Error::InvalidBindType { token: symbol });
        }
        if let Some(custom) = CustomType::parse(raw) {
            return Ok(WireType::Custom(custom));
        }
        Err(Error::InvalidBindType { token: symbol })
    }

    /// Tally the categories of the samples.
    pub fn tally<'a, I>(&self, samples: I) -> TypeTally
    where
        I: IntoIterator<Item = &'a ParamValue>,
    {
        let mut tally = TypeTally::default();
        for sample in samples {
            let text = sample.sample_text();
            let category = self.patterns.categorize(&text);
            tracing::trace!(sample = %text, ?category, "categorized sample");
            tally.record(category);
        }
        tally
    }

    /// Infer the wire type of an array from its elements.
    pub fn infer_type<'a, I>(&self, samples: I) -> WireType
    where
        I: IntoIterator<Item = &'a ParamValue>,
    {
        self.tally(samples).decide()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BindingsConfig;

    fn resolver() -> TypeResolver {
        TypeResolver::from_config(&BindingsConfig::default()).unwrap()
    }

    fn strs(items: &[&str]) -> Vec<ParamValue> {
        items.iter().map(|s| ParamValue::from(*s)).collect()
    }

    fn sym(s: &str) -> TypeToken {
        TypeToken::Symbolic(s.to_string())
    }

    #[test]
    fn test_categorize_defaults() {
        let r = resolver();
        let p = r.patterns();
        assert_eq!(p.categorize("2.5"), SampleCategory::Float);
        assert_eq!(p.categorize("1.5e10"), SampleCategory::Float);
        assert_eq!(p.categorize("1.5e 10"), SampleCategory::Float);
        assert_eq!(p.categorize("6E-3"), SampleCategory::Float);
        assert_eq!(p.categorize("1,234,567"), SampleCategory::Num);
        assert_eq!(p.categorize("$12.50"), SampleCategory::Num);
        assert_eq!(p.categorize("42"), SampleCategory::Int);
        assert_eq!(p.categorize("-7"), SampleCategory::Int);
        assert_eq!(p.categorize("'42'"), SampleCategory::Int);
        assert_eq!(p.categorize("2024-01-31"), SampleCategory::Date);
        assert_eq!(p.categorize("31-JAN-24"), SampleCategory::Date);
        assert_eq!(p.categorize("01/31/2024 10:15"), SampleCategory::Date);
        assert_eq!(p.categorize("abc"), SampleCategory::Varchar);
        assert_eq!(p.categorize(""), SampleCategory::Varchar);
    }

    #[test]
    fn test_varchar_dominates() {
        let r = resolver();
        assert_eq!(r.infer_type(&strs(&["abc", "123"])), WireType::Chr);
        assert_eq!(r.infer_type(&strs(&["2024-01-01", "x"])), WireType::Chr);
    }

    #[test]
    fn test_float_beats_integer() {
        let r = resolver();
        assert_eq!(r.infer_type(&strs(&["1", "2.5"])), WireType::Flt);
    }

    #[test]
    fn test_number_beats_integer() {
        let r = resolver();
        assert_eq!(r.infer_type(&strs(&["1", "1,000"])), WireType::Num);
        assert_eq!(r.infer_type(&strs(&["1,000", "2.5"])), WireType::Flt);
    }

    #[test]
    fn test_integers() {
        let r = resolver();
        let samples = vec![ParamValue::Int(1), ParamValue::Int(2), ParamValue::from("3")];
        assert_eq!(r.infer_type(&samples), WireType::Int);
    }

    #[test]
    fn test_native_floats_infer_float() {
        let r = resolver();
        let samples = vec![ParamValue::Float(2.0), ParamValue::Int(3)];
        assert_eq!(r.infer_type(&samples), WireType::Flt);
    }

    #[test]
    fn test_dates_only_without_numbers() {
        let r = resolver();
        assert_eq!(
            r.infer_type(&strs(&["2024-01-01", "2024-02-01"])),
            WireType::Odt
        );
        // Dates mixed with numbers: the numbers decide.
        assert_eq!(r.infer_type(&strs(&["2024-01-01", "5"])), WireType::Int);
    }

    #[test]
    fn test_empty_defaults_to_varchar() {
        let r = resolver();
        let empty: Vec<ParamValue> = vec![];
        assert_eq!(r.infer_type(&empty), WireType::Chr);
    }

    #[test]
    fn test_null_elements_count_as_varchar() {
        let r = resolver();
        let samples = vec![ParamValue::Int(1), ParamValue::Null];
        let tally = r.tally(&samples);
        assert_eq!(tally.int, 1);
        assert_eq!(tally.varchar, 1);
        assert_eq!(tally.decide(), WireType::Chr);
    }

    #[test]
    fn test_explicit_symbolic() {
        let r = resolver();
        assert_eq!(r.resolve_explicit(&sym("int"), false).unwrap(), WireType::Int);
        assert_eq!(r.resolve_explicit(&sym("chr"), false).unwrap(), WireType::Chr);
        assert_eq!(r.resolve_explicit(&sym("SQLT_FLT"), false).unwrap(), WireType::Flt);
        assert_eq!(r.resolve_explicit(&sym("num"), false).unwrap(), WireType::Num);
        assert_eq!(r.resolve_explicit(&sym("date"), false).unwrap(), WireType::Odt);
        assert_eq!(r.resolve_explicit(&sym("DateTime"), false).unwrap(), WireType::Odt);
    }

    #[test]
    fn test_explicit_numeric_code_is_verbatim() {
        let r = resolver();
        assert_eq!(r.resolve_explicit(&TypeToken::Code(96), false).unwrap(), WireType::Code(96));
        assert_eq!(r.resolve_explicit(&TypeToken::Code(3), false).unwrap(), WireType::Int);
    }

    #[test]
    fn test_out_vars_always_bind_as_string() {
        let r = resolver();
        for token in ["int", "chr", "date", "flt", "HR.NUM_LIST"] {
            assert_eq!(r.resolve_explicit(&sym(token), true).unwrap(), WireType::Chr);
        }
        assert_eq!(r.resolve_explicit(&TypeToken::Code(3), true).unwrap(), WireType::Chr);
    }

    #[test]
    fn test_custom_type_reference() {
        let r = resolver();
        let token = sym("MYSCHEMA.MY_TYPE");
        assert_eq!(
            r.resolve_explicit(&token, false).unwrap(),
            WireType::Custom(CustomType::new("MYSCHEMA", "MY_TYPE"))
        );
        assert_eq!(
            r.custom_collection(&token),
            Some(CustomType::new("MYSCHEMA", "MY_TYPE"))
        );
        assert_eq!(r.custom_collection(&sym("chr")), None);
        assert_eq!(r.custom_collection(&TypeToken::Code(1)), None);
    }

    #[test]
    fn test_invalid_type() {
        let r = resolver();
        match r.resolve_explicit(&sym("blob"), false) {
            Err(Error::InvalidBindType { token }) => assert_eq!(token, "SQLT_BLOB"),
            other => panic!("Expected InvalidBindType, got {:?}", other),
        }
        assert!(matches!(
            r.resolve_explicit(&sym(".LEADING_DOT"), false),
            Err(Error::InvalidBindType { .. })
        ));
    }

    #[test]
    fn test_token_from_value() {
        assert_eq!(TypeToken::from_value(&ParamValue::Null).unwrap(), None);
        assert_eq!(TypeToken::from_value(&ParamValue::from("")).unwrap(), None);
        assert_eq!(
            TypeToken::from_value(&ParamValue::from("chr")).unwrap(),
            Some(sym("chr"))
        );
        assert_eq!(
            TypeToken::from_value(&ParamValue::Int(1)).unwrap(),
            Some(TypeToken::Code(1))
        );
        assert_eq!(
            TypeToken::from_value(&ParamValue::from("156")).unwrap(),
            Some(TypeToken::Code(156))
        );
        assert!(TypeToken::from_value(&ParamValue::Int(-2)).is_err());
        assert!(TypeToken::from_value(&ParamValue::Float(1.5)).is_err());
        assert_eq!(
            TypeToken::from_value(&ParamValue::Float(3.0)).unwrap(),
            Some(TypeToken::Code(3))
        );
    }

    #[test]
    fn test_numeric_string_tokens_are_never_custom_types() {
        for token in ["1.5", "-1", "70000"] {
            match TypeToken::from_value(&ParamValue::from(token)) {
                Err(Error::InvalidBindType { token: t }) => assert_eq!(t, token),
                other => panic!("Expected InvalidBindType for {}, got {:?}", token, other),
            }
        }
        assert_eq!(
            TypeToken::from_value(&ParamValue::from(" 3.0 ")).unwrap(),
            Some(TypeToken::Code(3))
        );
    }
}
