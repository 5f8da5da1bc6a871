//! Stored procedure descriptions and the call pipeline.
//!
//! A [`Procedure`] names the SQL block, its default bind variables and any OUT
//! cursors. A [`Dbal`] owns one session and runs a procedure through
//! parse, bind, cursor binding, execute, result, commit and cleanup.
//!
//! # Example
//!
//! ```
//! use oracle_procbind::memory::{MemoryConnector, MemoryDriver};
//! use oracle_procbind::{BindValue, ConnectionConfig, Dbal, DbalConfig, ParamValue, Procedure};
//!
//! # fn main() -> oracle_procbind::Result<()> {
//! let mut config = DbalConfig::default();
//! config.connection = ConnectionConfig::new("app", "secret", "dbhost:1521/ORCL");
//!
//! let procedure = Procedure::new("BEGIN :return_outvar := app.url_pkg.save(:url); END;")
//!     .with_bind_var("return_outvar", ParamValue::compound(40, "chr", ParamValue::Null));
//!
//! let driver = MemoryDriver::new().with_out_value(":return_outvar", BindValue::Str("ok".into()));
//! let mut dbal = Dbal::connect(&MemoryConnector::new(driver), config, procedure)?;
//!
//! let mut params = oracle_procbind::ParameterMap::new();
//! params.insert("url".into(), ParamValue::from("http://example.com"));
//! let output = dbal.run_sql(Some(&params), Some("return_outvar"))?;
//! assert_eq!(output.as_scalar(), Some(&BindValue::Str("ok".into())));
//! # Ok(())
//! # }
//! ```

use crate::bind::{placeholder, BindValue, Bindings, BoundParameters, ParameterMap, ParamValue, ShapedValue};
use crate::config::{DbalConfig, FetchParams};
use crate::driver::{Connector, Session};
use crate::error::{Error, Result};
use crate::payload::PayloadValidator;
use crate::row::FetchResult;
use crate::statement::{SqlKind, StatementClassifier};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A stored procedure call.
///
/// Fields left unset inherit from the [`DbalConfig`] sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Procedure {
    /// Anonymous block calling the procedure.
    pub sql: String,
    /// Default bind variables; call parameters are merged over them.
    pub bind_vars: ParameterMap,
    /// OUT cursor placeholders; `None` uses the configured ones.
    pub out_cursors: Option<Vec<String>>,
    /// Fetch parameters; `None` uses the configured ones.
    pub fetch_all: Option<FetchParams>,
}

impl Procedure {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Self::default()
        }
    }

    /// Add a default bind variable.
    pub fn with_bind_var(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.bind_vars.insert(name.into(), value.into());
        self
    }

    /// Add an OUT cursor placeholder.
    pub fn with_out_cursor(mut self, name: impl Into<String>) -> Self {
        self.out_cursors.get_or_insert_with(Vec::new).push(name.into());
        self
    }

    pub fn with_fetch(mut self, params: FetchParams) -> Self {
        self.fetch_all = Some(params);
        self
    }

    /// Parse a JSON procedure description.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// What a call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutput {
    /// No cursor and no result parameter requested.
    Empty,
    /// Value of the requested OUT/return parameter.
    Value(ShapedValue),
    /// Rows of the only OUT cursor.
    Rows(FetchResult),
    /// Rows of each OUT cursor, by name.
    Cursors(IndexMap<String, FetchResult>),
}

impl RunOutput {
    pub fn as_value(&self) -> Option<&ShapedValue> {
        match self {
            RunOutput::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&BindValue> {
        self.as_value().and_then(ShapedValue::as_scalar)
    }

    pub fn as_rows(&self) -> Option<&FetchResult> {
        match self {
            RunOutput::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn cursor(&self, name: &str) -> Option<&FetchResult> {
        match self {
            RunOutput::Cursors(cursors) => cursors.get(name),
            _ => None,
        }
    }
}

/// Runs procedures over one session.
///
/// The whole collaborator graph is built up front; each stage is a named
/// method and [`Dbal::run_sql`] chains them.
pub struct Dbal<S: Session> {
    session: S,
    config: DbalConfig,
    procedure: Procedure,
    statements: StatementClassifier,
    bindings: Bindings,
    statement: Option<S::Statement>,
    sql_kind: Option<SqlKind>,
    cursors: IndexMap<String, S::Cursor>,
}

impl<S: Session> Dbal<S> {
    /// Validate the connect string, open a session and build the pipeline.
    pub fn connect<C>(connector: &C, config: DbalConfig, procedure: Procedure) -> Result<Self>
    where
        C: Connector<Session = S>,
    {
        let connect_string = config.connection.validated_connect_string()?;
        let session = connector
            .connect(&config.connection, &connect_string)
            .map_err(|e| Error::driver("connect", &e))?;
        tracing::info!(
            user = %config.connection.user,
            flavor = ?config.connection.flavor,
            "connected"
        );
        Self::with_session(session, config, procedure)
    }

    /// Build the pipeline around an open session.
    pub fn with_session(session: S, config: DbalConfig, procedure: Procedure) -> Result<Self> {
        let statements = StatementClassifier::from_config(&config.statement)?;
        let bindings = Bindings::from_config(&config.bindings)?;
        Ok(Self {
            session,
            config,
            procedure,
            statements,
            bindings,
            statement: None,
            sql_kind: None,
            cursors: IndexMap::new(),
        })
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn config(&self) -> &DbalConfig {
        &self.config
    }

    pub fn procedure(&self) -> &Procedure {
        &self.procedure
    }

    /// Replace the procedure for the next call.
    pub fn set_procedure(&mut self, procedure: Procedure) {
        self.procedure = procedure;
    }

    /// Parsed statement, if any.
    pub fn statement(&self) -> Option<&S::Statement> {
        self.statement.as_ref()
    }

    pub fn sql_kind(&self) -> Option<SqlKind> {
        self.sql_kind
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn bound(&self) -> &BoundParameters {
        self.bindings.bound()
    }

    /// Current value of a bound parameter; OUT values after execution.
    pub fn value(&self, name: &str) -> Option<&ShapedValue> {
        self.bindings.value(name)
    }

    /// Validate a caller payload against the procedure's bind variables.
    pub fn validate_payload(&self, payload: &ParameterMap) -> Result<ParameterMap> {
        PayloadValidator::new(self.bindings.orchestrator().classifier().clone())?
            .validate(payload, &self.procedure.bind_vars)
    }

    /// Classify and parse the procedure SQL.
    pub fn parse(&mut self) -> Result<SqlKind> {
        let kind = self.statements.classify(&self.procedure.sql)?;
        if let Some(old) = self.statement.take() {
            self.session
                .free_statement(old)
                .map_err(|e| Error::driver("free statement", &e))?;
        }
        let stmt = self
            .session
            .parse(&self.procedure.sql)
            .map_err(|e| Error::driver("parse", &e))?;
        self.statement = Some(stmt);
        self.sql_kind = Some(kind);
        Ok(kind)
    }

    /// Bind the procedure's variables with `params` merged over them.
    pub fn bind_vars(&mut self, params: Option<&ParameterMap>) -> Result<IndexMap<String, bool>> {
        let kind = self.sql_kind.ok_or(Error::NoStatementHandle)?;
        self.bindings.clear();
        self.bindings.stage(&self.procedure.bind_vars);
        self.bindings
            .bind(kind, params, &mut self.session, self.statement.as_mut())
    }

    /// Create and bind every OUT cursor. Returns how many were bound.
    pub fn bind_cursors(&mut self) -> Result<usize> {
        let names: Vec<String> = match &self.procedure.out_cursors {
            Some(names) => names.clone(),
            None => self.config.cursor.out_cursors.clone(),
        };
        let stmt = self.statement.as_mut().ok_or(Error::NoStatementHandle)?;
        for name in names {
            let mut cursor = self
                .session
                .new_cursor()
                .map_err(|e| Error::driver("new cursor", &e))?;
            self.session
                .bind_cursor(stmt, &placeholder(&name), &mut cursor)
                .map_err(|e| Error::bind_failed(&name, &e))?;
            tracing::debug!(cursor = %name, "bound OUT cursor");
            self.cursors.insert(name, cursor);
        }
        Ok(self.cursors.len())
    }

    /// Execute the statement and its cursors, then read OUT values back.
    pub fn execute(&mut self) -> Result<()> {
        let stmt = self.statement.as_mut().ok_or(Error::NoStatementHandle)?;
        self.session
            .execute(stmt)
            .map_err(|e| Error::driver("execute", &e))?;
        for cursor in self.cursors.values_mut() {
            self.session
                .execute_cursor(cursor)
                .map_err(|e| Error::driver("execute cursor", &e))?;
        }
        let refreshed = self
            .bindings
            .bound_mut()
            .refresh_out_values(&self.session, stmt);
        tracing::info!(out_values = refreshed, cursors = self.cursors.len(), "executed");
        Ok(())
    }

    /// Collect the call's result.
    ///
    /// OUT cursors win: their rows are fetched. Otherwise `result_param`
    /// names the OUT/return parameter whose value is returned.
    pub fn result(&mut self, result_param: Option<&str>) -> Result<RunOutput> {
        if !self.cursors.is_empty() {
            let params = self.procedure.fetch_all.unwrap_or(self.config.result.fetch_all);
            let mut fetched = IndexMap::with_capacity(self.cursors.len());
            for (name, cursor) in self.cursors.iter_mut() {
                let rows = self
                    .session
                    .fetch_all(cursor, &params)
                    .map_err(|e| Error::driver("fetch", &e))?;
                tracing::debug!(cursor = %name, rows = rows.len(), "fetched");
                fetched.insert(name.clone(), rows);
            }
            if fetched.len() == 1 {
                if let Some((_, rows)) = fetched.pop() {
                    return Ok(RunOutput::Rows(rows));
                }
            }
            return Ok(RunOutput::Cursors(fetched));
        }
        match result_param {
            Some(name) => Ok(RunOutput::Value(self.bound().require(name)?.value.clone())),
            None => Ok(RunOutput::Empty),
        }
    }

    pub fn commit(&mut self) -> Result<()> {
        self.session
            .commit()
            .map_err(|e| Error::driver("commit", &e))?;
        tracing::info!("committed");
        Ok(())
    }

    /// Free cursors and the statement, then close the session.
    ///
    /// Every step is attempted; the first failure is returned.
    pub fn cleanup(&mut self) -> Result<()> {
        let mut first_error = None;
        for (_, cursor) in self.cursors.drain(..) {
            if let Err(e) = self.session.free_cursor(cursor) {
                first_error.get_or_insert(Error::driver("free cursor", &e));
            }
        }
        if let Some(stmt) = self.statement.take() {
            if let Err(e) = self.session.free_statement(stmt) {
                first_error.get_or_insert(Error::driver("free statement", &e));
            }
        }
        self.sql_kind = None;
        if let Err(e) = self.session.close() {
            first_error.get_or_insert(Error::driver("close", &e));
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Run the full pipeline.
    ///
    /// Commit happens only after every bind and the execute succeeded.
    /// Cleanup always runs; its failure is logged, never returned.
    #[tracing::instrument(skip_all, fields(sql = %self.procedure.sql.trim()))]
    pub fn run_sql(
        &mut self,
        params: Option<&ParameterMap>,
        result_param: Option<&str>,
    ) -> Result<RunOutput> {
        let outcome = self.run_steps(params, result_param);
        if let Err(err) = &outcome {
            tracing::error!(error = %err, "procedure call failed");
        }
        if let Err(err) = self.cleanup() {
            tracing::error!(error = %err, "cleanup failed");
        }
        outcome
    }

    fn run_steps(
        &mut self,
        params: Option<&ParameterMap>,
        result_param: Option<&str>,
    ) -> Result<RunOutput> {
        self.parse()?;
        self.bind_vars(params)?;
        self.bind_cursors()?;
        self.execute()?;
        let output = self.result(result_param)?;
        self.commit()?;
        Ok(output)
    }
}
