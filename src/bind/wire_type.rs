//! Driver-level wire type with custom-collection references.
//!
//! A `WireType` is what the bind primitives are told about a buffer. Most
//! variants map one-to-one onto an `SQLT_*` code; `Custom` names a
//! database-defined collection type and always binds as a named type.

use crate::constants::{
    sqlt_code, sqlt_name, SQLT_CHR, SQLT_FLT, SQLT_INT, SQLT_NTY, SQLT_NUM, SQLT_ODT, SQLT_RSET,
};
use std::fmt;

/// A schema-qualified collection type, e.g. `MYSCHEMA.MY_TYPE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomType {
    /// Owning schema.
    pub schema: String,
    /// Type name within the schema.
    pub type_name: String,
}

impl CustomType {
    /// Create a custom type reference.
    pub fn new(schema: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            type_name: type_name.into(),
        }
    }

    /// Parse a `schema.type` token.
    ///
    /// The dot must not be the first character and both halves must be
    /// non-empty. Names are upper-cased, as the dictionary stores them.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        let (schema, type_name) = token.split_once('.')?;
        if schema.is_empty() || type_name.is_empty() {
            return None;
        }
        Some(Self::new(schema.to_uppercase(), type_name.to_uppercase()))
    }
}

impl fmt::Display for CustomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.type_name)
    }
}

/// Driver wire type for a bound buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WireType {
    /// SQLT_CHR - VARCHAR2. The only type OUT parameters bind reliably as.
    Chr,
    /// SQLT_NUM - generic NUMBER.
    Num,
    /// SQLT_INT - INTEGER.
    Int,
    /// SQLT_FLT - FLOAT.
    Flt,
    /// SQLT_ODT - DATE (OCIDate).
    Odt,
    /// SQLT_RSET - result set (OUT cursor).
    ResultSet,
    /// Any other numeric code, passed through verbatim.
    Code(u16),
    /// Schema-qualified collection type; bound as SQLT_NTY.
    Custom(CustomType),
}

impl WireType {
    /// Map a numeric code onto a variant.
    pub fn from_code(code: u16) -> Self {
        match code {
            SQLT_CHR => WireType::Chr,
            SQLT_NUM => WireType::Num,
            SQLT_INT => WireType::Int,
            SQLT_FLT => WireType::Flt,
            SQLT_ODT => WireType::Odt,
            SQLT_RSET => WireType::ResultSet,
            other => WireType::Code(other),
        }
    }

    /// Map an upper-case `SQLT_*` name onto a variant.
    pub fn from_name(name: &str) -> Option<Self> {
        sqlt_code(name).map(Self::from_code)
    }

    /// Get the numeric code handed to the driver.
    pub fn code(&self) -> u16 {
        match self {
            WireType::Chr => SQLT_CHR,
            WireType::Num => SQLT_NUM,
            WireType::Int => SQLT_INT,
            WireType::Flt => SQLT_FLT,
            WireType::Odt => SQLT_ODT,
            WireType::ResultSet => SQLT_RSET,
            WireType::Code(code) => *code,
            WireType::Custom(_) => SQLT_NTY,
        }
    }

    /// Check if this is a custom collection reference.
    pub fn is_custom(&self) -> bool {
        matches!(self, WireType::Custom(_))
    }

    /// Get the custom collection reference, if any.
    pub fn custom(&self) -> Option<&CustomType> {
        match self {
            WireType::Custom(custom) => Some(custom),
            _ => None,
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireType::Custom(custom) => write!(f, "SQLT_NTY({})", custom),
            other => match sqlt_name(other.code()) {
                Some(name) => write!(f, "{}", name),
                None => write!(f, "SQLT({})", other.code()),
            },
        }
    }
}
