//! Driver-level (`SQLT_*`) external type codes.
//!
//! These are the OCI external datatype numbers understood by the bind
//! primitives. Only a handful are ever produced by the binding layer, but the
//! full table is kept so numeric codes handed in by callers can be displayed
//! by name.

// Character types
pub const SQLT_CHR: u16 = 1;
pub const SQLT_STR: u16 = 5;
pub const SQLT_VCS: u16 = 9;
pub const SQLT_LVC: u16 = 94;
pub const SQLT_AFC: u16 = 96;
pub const SQLT_AVC: u16 = 97;
pub const SQLT_LNG: u16 = 8;

// Numeric types
pub const SQLT_NUM: u16 = 2;
pub const SQLT_INT: u16 = 3;
pub const SQLT_FLT: u16 = 4;
pub const SQLT_VNU: u16 = 6;
pub const SQLT_UIN: u16 = 68;
pub const SQLT_BFLOAT: u16 = 21;
pub const SQLT_BDOUBLE: u16 = 22;

// Date types
pub const SQLT_DAT: u16 = 12;
pub const SQLT_ODT: u16 = 156;

// Binary types
pub const SQLT_BIN: u16 = 23;
pub const SQLT_LBI: u16 = 24;
pub const SQLT_VBI: u16 = 15;

// Handles and objects
pub const SQLT_RDD: u16 = 104;
pub const SQLT_NTY: u16 = 108;
pub const SQLT_CLOB: u16 = 112;
pub const SQLT_BLOB: u16 = 113;
pub const SQLT_RSET: u16 = 116;
pub const SQLT_BOL: u16 = 252;

/// Prefix every symbolic type name carries.
pub const SQLT_PREFIX: &str = "SQLT_";

/// Placeholder prefix used when binding by name.
pub const PLACEHOLDER_PREFIX: char = ':';

/// Length value meaning "let the driver work it out".
pub const DRIVER_DECIDES: i64 = -1;

const SQLT_NAMES: &[(&str, u16)] = &[
    ("SQLT_CHR", SQLT_CHR),
    ("SQLT_NUM", SQLT_NUM),
    ("SQLT_INT", SQLT_INT),
    ("SQLT_FLT", SQLT_FLT),
    ("SQLT_STR", SQLT_STR),
    ("SQLT_VNU", SQLT_VNU),
    ("SQLT_LNG", SQLT_LNG),
    ("SQLT_VCS", SQLT_VCS),
    ("SQLT_DAT", SQLT_DAT),
    ("SQLT_VBI", SQLT_VBI),
    ("SQLT_BFLOAT", SQLT_BFLOAT),
    ("SQLT_BDOUBLE", SQLT_BDOUBLE),
    ("SQLT_BIN", SQLT_BIN),
    ("SQLT_LBI", SQLT_LBI),
    ("SQLT_UIN", SQLT_UIN),
    ("SQLT_LVC", SQLT_LVC),
    ("SQLT_AFC", SQLT_AFC),
    ("SQLT_AVC", SQLT_AVC),
    ("SQLT_RDD", SQLT_RDD),
    ("SQLT_NTY", SQLT_NTY),
    ("SQLT_CLOB", SQLT_CLOB),
    ("SQLT_BLOB", SQLT_BLOB),
    ("SQLT_RSET", SQLT_RSET),
    ("SQLT_ODT", SQLT_ODT),
    ("SQLT_BOL", SQLT_BOL),
];

/// Look up the numeric code of an upper-case `SQLT_*` name.
pub fn sqlt_code(name: &str) -> Option<u16> {
    SQLT_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, code)| *code)
}

/// Look up the symbolic name of a numeric code.
pub fn sqlt_name(code: u16) -> Option<&'static str> {
    SQLT_NAMES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(name, _)| *name)
}
