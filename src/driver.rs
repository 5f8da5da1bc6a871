//! Driver seam: the bind primitives and session operations this crate calls.
//!
//! The binding layer never talks to a database directly. It drives an
//! implementation of [`BindDriver`] (bind primitives plus error inspection),
//! and the procedure pipeline drives a [`Session`] obtained from a
//! [`Connector`]. [`crate::memory::MemoryDriver`] is the in-process
//! implementation used for tests and dry runs.
//!
//! Bind primitives follow the driver convention of returning a success flag
//! and leaving the detail in a pending error queried with
//! [`BindDriver::last_error`].

use crate::bind::{BindValue, WireType};
use crate::config::{ConnectionConfig, FetchParams};
use crate::row::FetchResult;
use std::fmt;

/// Error reported by the driver: an `ORA-` code, its message, and the SQL
/// text of the statement it was raised on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DriverError {
    pub code: i32,
    pub message: String,
    pub sql_text: String,
}

impl DriverError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            sql_text: String::new(),
        }
    }

    /// Attach the offending SQL text.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql_text = sql.into();
        self
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ORA-{:05}: {}", self.code, self.message)
    }
}

impl std::error::Error for DriverError {}

/// Bind primitives.
pub trait BindDriver {
    /// Parsed statement handle.
    type Statement;
    /// Collection object for `schema.type` binds.
    type Collection;

    /// Bind one scalar by placeholder. `None` length or type lets the driver
    /// decide.
    fn bind_scalar(
        &mut self,
        stmt: &mut Self::Statement,
        placeholder: &str,
        value: &BindValue,
        length: Option<i64>,
        wire_type: Option<&WireType>,
    ) -> bool;

    /// Bind an array by placeholder. `max_item_length` of `-1` lets the
    /// driver decide.
    fn bind_array(
        &mut self,
        stmt: &mut Self::Statement,
        placeholder: &str,
        values: &[BindValue],
        max_table_length: usize,
        max_item_length: i64,
        wire_type: &WireType,
    ) -> bool;

    /// Create an empty collection of a database-defined type.
    fn new_collection(
        &mut self,
        type_name: &str,
        schema: Option<&str>,
    ) -> Result<Self::Collection, DriverError>;

    /// Append one element to a collection.
    fn append_to_collection(
        &mut self,
        collection: &mut Self::Collection,
        value: &BindValue,
    ) -> Result<(), DriverError>;

    /// Bind a collection as a named type.
    fn bind_named_collection(
        &mut self,
        stmt: &mut Self::Statement,
        placeholder: &str,
        collection: Self::Collection,
    ) -> bool;

    /// Pending error on the statement, if any.
    fn last_error(&self, stmt: &Self::Statement) -> Option<DriverError>;

    /// Read back the current value of a bound placeholder.
    ///
    /// After execution this is how OUT variables and function returns
    /// become visible.
    fn out_value(&self, stmt: &Self::Statement, placeholder: &str) -> Option<BindValue>;
}

/// A connected session.
pub trait Session: BindDriver {
    /// Cursor handle for OUT ref cursors.
    type Cursor;

    fn parse(&mut self, sql: &str) -> Result<Self::Statement, DriverError>;

    fn execute(&mut self, stmt: &mut Self::Statement) -> Result<(), DriverError>;

    fn new_cursor(&mut self) -> Result<Self::Cursor, DriverError>;

    /// Bind a cursor as an OUT result set.
    fn bind_cursor(
        &mut self,
        stmt: &mut Self::Statement,
        placeholder: &str,
        cursor: &mut Self::Cursor,
    ) -> Result<(), DriverError>;

    /// Execute a cursor after the owning statement has run.
    fn execute_cursor(&mut self, cursor: &mut Self::Cursor) -> Result<(), DriverError>;

    /// Collect every row of an executed cursor.
    fn fetch_all(
        &mut self,
        cursor: &mut Self::Cursor,
        params: &FetchParams,
    ) -> Result<FetchResult, DriverError>;

    fn free_cursor(&mut self, cursor: Self::Cursor) -> Result<(), DriverError>;

    fn free_statement(&mut self, stmt: Self::Statement) -> Result<(), DriverError>;

    fn commit(&mut self) -> Result<(), DriverError>;

    fn close(&mut self) -> Result<(), DriverError>;
}

/// Opens sessions.
pub trait Connector {
    type Session: Session;

    /// Connect using the credentials and flavor in `config` and the already
    /// validated `connect_string`.
    fn connect(
        &self,
        config: &ConnectionConfig,
        connect_string: &str,
    ) -> Result<Self::Session, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::new(6550, "PLS-00306: wrong number or types").with_sql("BEGIN x; END;");
        assert_eq!(err.to_string(), "ORA-06550: PLS-00306: wrong number or types");
        assert_eq!(err.sql_text, "BEGIN x; END;");
    }
}
