//! Error types for the binding layer.

use std::io;
use thiserror::Error;

use crate::driver::DriverError;

/// Result type alias for binding operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for parameter binding and procedure invocation.
#[derive(Error, Debug)]
pub enum Error {
    /// Parameter name marks it as OUT/return but the value is not a
    /// `{length, type, value}` descriptor.
    #[error("Parameter '{name}' is an OUT var or function return; a (length, type, value) descriptor is required")]
    MalformedOutParameter { name: String },

    /// Type token is neither an allowed bind type nor a `schema.type` reference.
    #[error("{token} is not a valid bind type")]
    InvalidBindType { token: String },

    /// Explicit length present but not numeric.
    #[error("Provided length must be a number, got '{length}'")]
    InvalidLength { length: String },

    /// Bind attempted before a statement was parsed.
    #[error("No statement found to bind on")]
    NoStatementHandle,

    /// The driver reported an error after a bind call.
    #[error("Bind of '{name}' failed: ORA-{code:05}: {message} (SQL was: {sql})")]
    BindFailed {
        name: String,
        code: i32,
        message: String,
        sql: String,
    },

    /// Caller payload shares no keys with the procedure model.
    #[error("Payload differs from model; missing: {missing:?}")]
    PayloadMismatch { missing: Vec<String> },

    /// Ad-hoc SQL is not bound by this layer.
    #[error("Pass-thru SQL is not supported; wrap the statement in a PL/SQL stored procedure")]
    PassThroughUnsupported,

    /// SQL text did not match any configured statement type.
    #[error("Unable to match SQL type for: {sql}")]
    UnmatchedSqlType { sql: String },

    /// Connect string rejected by the configured pattern.
    #[error("Invalid connect string: {message}")]
    InvalidConnectString { message: String },

    /// A collaborator (connect, parse, execute, cursor, fetch, commit, close) failed.
    #[error("{operation} failed: ORA-{code:05}: {message}")]
    Driver {
        operation: &'static str,
        code: i32,
        message: String,
    },

    /// Lookup of a parameter that was never bound.
    #[error("Unknown bound parameter: {name}")]
    UnknownParameter { name: String },

    /// Invalid configuration value.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A configured regular expression failed to compile.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Configuration file could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parameter description could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while reading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create a bind failure from the driver's pending error.
    pub fn bind_failed(name: impl Into<String>, err: &DriverError) -> Self {
        Self::BindFailed {
            name: name.into(),
            code: err.code,
            message: sanitize_message(&err.message),
            sql: sanitize_message(&err.sql_text),
        }
    }

    /// Create a collaborator failure.
    pub fn driver(operation: &'static str, err: &DriverError) -> Self {
        Self::Driver {
            operation,
            code: err.code,
            message: sanitize_message(&err.message),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Driver error code carried by this error, if any.
    pub fn driver_code(&self) -> Option<i32> {
        match self {
            Self::BindFailed { code, .. } | Self::Driver { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Strip control characters from driver-supplied text.
pub fn sanitize_message(message: &str) -> String {
    message.chars().filter(|c| !c.is_control()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_control_chars() {
        assert_eq!(
            sanitize_message("ORA-06550: line 1\n\tcolumn 7\u{0}"),
            "ORA-06550: line 1column 7"
        );
        assert_eq!(sanitize_message("clean"), "clean");
    }

    #[test]
    fn test_bind_failed_is_sanitized() {
        let err = DriverError::new(1008, "not all variables\r\nbound")
            .with_sql("BEGIN pkg.p(:a);\nEND;");
        let e = Error::bind_failed("a", &err);
        match &e {
            Error::BindFailed {
                name,
                code,
                message,
                sql,
            } => {
                assert_eq!(name, "a");
                assert_eq!(*code, 1008);
                assert_eq!(message, "not all variablesbound");
                assert_eq!(sql, "BEGIN pkg.p(:a);END;");
            }
            other => panic!("Expected BindFailed, got {:?}", other),
        }
        assert_eq!(e.driver_code(), Some(1008));
        assert!(e.to_string().contains("ORA-01008"));
    }
}
