//! In-process driver that records calls instead of talking to a database.
//!
//! `MemoryDriver` implements [`BindDriver`] and [`Session`]. Every bind,
//! collection and cursor call is journaled as a [`BindCall`]; failures, OUT
//! values and cursor rows are injected up front with the builder methods.
//!
//! ```
//! use oracle_procbind::memory::MemoryDriver;
//! use oracle_procbind::{BindValue, DriverError};
//!
//! let driver = MemoryDriver::new()
//!     .with_out_value(":return_outvar", BindValue::Str("7".into()))
//!     .fail_bind(":bad", DriverError::new(1036, "illegal variable name/number"));
//! assert!(driver.bind_calls().is_empty());
//! ```

use crate::bind::{BindValue, WireType};
use crate::config::{ConnectionConfig, FetchParams};
use crate::driver::{BindDriver, Connector, DriverError, Session};
use crate::row::FetchResult;
use std::collections::HashMap;

/// A journaled driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum BindCall {
    Scalar {
        placeholder: String,
        value: BindValue,
        length: Option<i64>,
        wire_type: Option<WireType>,
    },
    Array {
        placeholder: String,
        values: Vec<BindValue>,
        max_table_length: usize,
        max_item_length: i64,
        wire_type: WireType,
    },
    Collection {
        placeholder: String,
        schema: Option<String>,
        type_name: String,
        elements: Vec<BindValue>,
    },
    Cursor {
        placeholder: String,
    },
}

impl BindCall {
    pub fn placeholder(&self) -> &str {
        match self {
            BindCall::Scalar { placeholder, .. }
            | BindCall::Array { placeholder, .. }
            | BindCall::Collection { placeholder, .. }
            | BindCall::Cursor { placeholder } => placeholder,
        }
    }
}

/// Parsed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryStatement {
    sql: String,
    error: Option<DriverError>,
    executed: bool,
}

impl MemoryStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }
}

/// Collection under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryCollection {
    schema: Option<String>,
    type_name: String,
    elements: Vec<BindValue>,
}

/// Cursor handle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryCursor {
    placeholder: Option<String>,
    executed: bool,
}

/// Recording driver.
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    bind_failures: HashMap<String, DriverError>,
    out_values: HashMap<String, BindValue>,
    cursor_rows: HashMap<String, FetchResult>,
    parse_error: Option<DriverError>,
    execute_error: Option<DriverError>,
    commit_error: Option<DriverError>,
    close_error: Option<DriverError>,
    calls: Vec<BindCall>,
    executed: Vec<String>,
    commits: usize,
    freed_statements: usize,
    closed: bool,
}

fn key(placeholder: &str) -> String {
    placeholder.trim_start_matches(':').to_uppercase()
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any bind on `placeholder` with `error`.
    pub fn fail_bind(mut self, placeholder: &str, error: DriverError) -> Self {
        self.bind_failures.insert(key(placeholder), error);
        self
    }

    /// Value an OUT placeholder holds after execution.
    pub fn with_out_value(mut self, placeholder: &str, value: BindValue) -> Self {
        self.out_values.insert(key(placeholder), value);
        self
    }

    /// Rows a cursor bound at `placeholder` returns.
    pub fn with_cursor_rows(mut self, placeholder: &str, rows: FetchResult) -> Self {
        self.cursor_rows.insert(key(placeholder), rows);
        self
    }

    pub fn fail_parse(mut self, error: DriverError) -> Self {
        self.parse_error = Some(error);
        self
    }

    pub fn fail_execute(mut self, error: DriverError) -> Self {
        self.execute_error = Some(error);
        self
    }

    pub fn fail_commit(mut self, error: DriverError) -> Self {
        self.commit_error = Some(error);
        self
    }

    pub fn fail_close(mut self, error: DriverError) -> Self {
        self.close_error = Some(error);
        self
    }

    /// Create a statement without going through [`Session::parse`].
    pub fn statement(&self, sql: &str) -> MemoryStatement {
        MemoryStatement {
            sql: sql.to_string(),
            error: None,
            executed: false,
        }
    }

    /// Every bind call issued so far, in order.
    pub fn bind_calls(&self) -> &[BindCall] {
        &self.calls
    }

    /// SQL text of every executed statement.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn freed_statements(&self) -> usize {
        self.freed_statements
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Record a call and apply any injected failure to the statement.
    fn record(&mut self, stmt: &mut MemoryStatement, call: BindCall) -> bool {
        let failure = self.bind_failures.get(&key(call.placeholder())).cloned();
        self.calls.push(call);
        match failure {
            Some(err) => {
                stmt.error = Some(err.with_sql(stmt.sql.clone()));
                false
            }
            None => true,
        }
    }
}

impl BindDriver for MemoryDriver {
    type Statement = MemoryStatement;
    type Collection = MemoryCollection;

    fn bind_scalar(
        &mut self,
        stmt: &mut MemoryStatement,
        placeholder: &str,
        value: &BindValue,
        length: Option<i64>,
        wire_type: Option<&WireType>,
    ) -> bool {
        self.record(
            stmt,
            BindCall::Scalar {
                placeholder: placeholder.to_string(),
                value: value.clone(),
                length,
                wire_type: wire_type.cloned(),
            },
        )
    }

    fn bind_array(
        &mut self,
        stmt: &mut MemoryStatement,
        placeholder: &str,
        values: &[BindValue],
        max_table_length: usize,
        max_item_length: i64,
        wire_type: &WireType,
    ) -> bool {
        self.record(
            stmt,
            BindCall::Array {
                placeholder: placeholder.to_string(),
                values: values.to_vec(),
                max_table_length,
                max_item_length,
                wire_type: wire_type.clone(),
            },
        )
    }

    fn new_collection(
        &mut self,
        type_name: &str,
        schema: Option<&str>,
    ) -> Result<MemoryCollection, DriverError> {
        Ok(MemoryCollection {
            schema: schema.map(str::to_string),
            type_name: type_name.to_string(),
            elements: Vec::new(),
        })
    }

    fn append_to_collection(
        &mut self,
        collection: &mut MemoryCollection,
        value: &BindValue,
    ) -> Result<(), DriverError> {
        collection.elements.push(value.clone());
        Ok(())
    }

    fn bind_named_collection(
        &mut self,
        stmt: &mut MemoryStatement,
        placeholder: &str,
        collection: MemoryCollection,
    ) -> bool {
        self.record(
            stmt,
            BindCall::Collection {
                placeholder: placeholder.to_string(),
                schema: collection.schema,
                type_name: collection.type_name,
                elements: collection.elements,
            },
        )
    }

    fn last_error(&self, stmt: &MemoryStatement) -> Option<DriverError> {
        stmt.error.clone()
    }

    fn out_value(&self, stmt: &MemoryStatement, placeholder: &str) -> Option<BindValue> {
        if !stmt.executed {
            return None;
        }
        self.out_values.get(&key(placeholder)).cloned()
    }
}

impl Session for MemoryDriver {
    type Cursor = MemoryCursor;

    fn parse(&mut self, sql: &str) -> Result<MemoryStatement, DriverError> {
        if let Some(err) = &self.parse_error {
            return Err(err.clone().with_sql(sql));
        }
        Ok(self.statement(sql))
    }

    fn execute(&mut self, stmt: &mut MemoryStatement) -> Result<(), DriverError> {
        if let Some(err) = &self.execute_error {
            return Err(err.clone().with_sql(stmt.sql.clone()));
        }
        stmt.executed = true;
        self.executed.push(stmt.sql.clone());
        Ok(())
    }

    fn new_cursor(&mut self) -> Result<MemoryCursor, DriverError> {
        Ok(MemoryCursor::default())
    }

    fn bind_cursor(
        &mut self,
        stmt: &mut MemoryStatement,
        placeholder: &str,
        cursor: &mut MemoryCursor,
    ) -> Result<(), DriverError> {
        let call = BindCall::Cursor {
            placeholder: placeholder.to_string(),
        };
        if !self.record(stmt, call) {
            return Err(stmt.error.clone().unwrap_or_default());
        }
        cursor.placeholder = Some(placeholder.to_string());
        Ok(())
    }

    fn execute_cursor(&mut self, cursor: &mut MemoryCursor) -> Result<(), DriverError> {
        if cursor.placeholder.is_none() {
            return Err(DriverError::new(1001, "invalid cursor"));
        }
        cursor.executed = true;
        Ok(())
    }

    fn fetch_all(
        &mut self,
        cursor: &mut MemoryCursor,
        params: &FetchParams,
    ) -> Result<FetchResult, DriverError> {
        if !cursor.executed {
            return Err(DriverError::new(24338, "statement handle not executed"));
        }
        let rows = cursor
            .placeholder
            .as_deref()
            .and_then(|p| self.cursor_rows.get(&key(p)))
            .map(|rows| rows.window(params))
            .unwrap_or_default();
        Ok(rows)
    }

    fn free_cursor(&mut self, _cursor: MemoryCursor) -> Result<(), DriverError> {
        Ok(())
    }

    fn free_statement(&mut self, _stmt: MemoryStatement) -> Result<(), DriverError> {
        self.freed_statements += 1;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        if let Some(err) = &self.commit_error {
            return Err(err.clone());
        }
        self.commits += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if let Some(err) = &self.close_error {
            return Err(err.clone());
        }
        self.closed = true;
        Ok(())
    }
}

/// Hands out clones of a prepared [`MemoryDriver`].
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    driver: MemoryDriver,
    refuse: Option<DriverError>,
}

impl MemoryConnector {
    pub fn new(driver: MemoryDriver) -> Self {
        Self {
            driver,
            refuse: None,
        }
    }

    /// Refuse every connection attempt.
    pub fn refusing(error: DriverError) -> Self {
        Self {
            driver: MemoryDriver::new(),
            refuse: Some(error),
        }
    }
}

impl Connector for MemoryConnector {
    type Session = MemoryDriver;

    fn connect(
        &self,
        config: &ConnectionConfig,
        connect_string: &str,
    ) -> Result<MemoryDriver, DriverError> {
        if let Some(err) = &self.refuse {
            return Err(err.clone());
        }
        tracing::debug!(user = %config.user, connect_string, flavor = ?config.flavor, "memory session opened");
        Ok(self.driver.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_injected_bind_failure_sets_pending_error() {
        let mut driver = MemoryDriver::new().fail_bind("x", DriverError::new(1008, "not all variables bound"));
        let mut stmt = driver.statement("BEGIN a.b.c(:x); END;");
        assert!(!driver.bind_scalar(&mut stmt, ":x", &BindValue::Int(1), None, None));
        let err = driver.last_error(&stmt).unwrap();
        assert_eq!(err.code, 1008);
        assert_eq!(err.sql_text, "BEGIN a.b.c(:x); END;");
    }

    #[test]
    fn test_out_values_visible_after_execute() {
        let mut driver = MemoryDriver::new().with_out_value("r_outvar", BindValue::Str("ok".into()));
        let mut stmt = driver.parse("BEGIN :r_outvar := a.b.c(); END;").unwrap();
        assert_eq!(driver.out_value(&stmt, ":r_outvar"), None);
        driver.execute(&mut stmt).unwrap();
        assert_eq!(
            driver.out_value(&stmt, ":R_OUTVAR"),
            Some(BindValue::Str("ok".into()))
        );
    }

    #[test]
    fn test_cursor_fetch() {
        let rows = FetchResult::from_values(["ID"], vec![vec![BindValue::Int(1)], vec![BindValue::Int(2)]]);
        let mut driver = MemoryDriver::new().with_cursor_rows(":return_outcur", rows);
        let mut stmt = driver.parse("BEGIN a.b.c(:return_outcur); END;").unwrap();
        let mut cursor = driver.new_cursor().unwrap();
        driver.bind_cursor(&mut stmt, ":return_outcur", &mut cursor).unwrap();
        assert!(driver.fetch_all(&mut cursor, &FetchParams::default()).is_err());
        driver.execute(&mut stmt).unwrap();
        driver.execute_cursor(&mut cursor).unwrap();
        let fetched = driver.fetch_all(&mut cursor, &FetchParams::default()).unwrap();
        assert_eq!(fetched.len(), 2);
    }

    #[test]
    fn test_connector_refusal() {
        let connector = MemoryConnector::refusing(DriverError::new(12541, "TNS:no listener"));
        let err = connector
            .connect(&ConnectionConfig::default(), "h/s")
            .unwrap_err();
        assert_eq!(err.code, 12541);
    }
}
