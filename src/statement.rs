//! SQL statement classification.

use crate::config::StatementConfig;
use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;

/// Kind of SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlKind {
    /// Anonymous block calling a stored procedure or function.
    PackageCall,
    /// Plain SELECT/INSERT/UPDATE/DELETE text.
    PassThrough,
}

impl SqlKind {
    /// Check if parameters may be bound for this kind.
    pub fn is_bindable(&self) -> bool {
        matches!(self, SqlKind::PackageCall)
    }
}

impl fmt::Display for SqlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlKind::PackageCall => f.write_str("package call"),
            SqlKind::PassThrough => f.write_str("pass-through"),
        }
    }
}

/// Classifies SQL text against configured patterns.
///
/// Patterns are tried in order; the first is the package-call form and
/// any later one is pass-through. Matching ignores case and lets `.`
/// cross newlines.
#[derive(Debug, Clone)]
pub struct StatementClassifier {
    patterns: Vec<Regex>,
}

impl StatementClassifier {
    pub fn new<S: AsRef<str>>(sources: &[S]) -> Result<Self> {
        if sources.is_empty() {
            return Err(Error::config("at least one SQL type pattern is required"));
        }
        let patterns = sources
            .iter()
            .map(|s| Regex::new(&format!("(?is){}", s.as_ref())))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn from_config(config: &StatementConfig) -> Result<Self> {
        Self::new(&config.sqltypes)
    }

    /// Classify SQL text.
    pub fn classify(&self, sql: &str) -> Result<SqlKind> {
        let sql = sql.trim();
        let index = self
            .patterns
            .iter()
            .position(|p| p.is_match(sql))
            .ok_or_else(|| Error::UnmatchedSqlType {
                sql: sql.to_string(),
            })?;
        let kind = if index == 0 {
            SqlKind::PackageCall
        } else {
            SqlKind::PassThrough
        };
        tracing::debug!(%kind, pattern = index, "classified statement");
        Ok(kind)
    }
}
