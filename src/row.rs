//! Rows fetched from OUT cursors.

use crate::bind::BindValue;
use crate::config::FetchParams;
use indexmap::IndexMap;
use std::sync::Arc;

/// A column in a fetched result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name as reported by the driver.
    pub name: String,
    /// Whether NULL values are allowed.
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nullable: true,
        }
    }
}

/// Shared column information for all rows of a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnInfo {
    pub columns: Vec<Column>,
}

impl ColumnInfo {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Build column info from bare names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(Column::new).collect())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Find column index by name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        let name_upper = name.to_uppercase();
        self.columns
            .iter()
            .position(|c| c.name.to_uppercase() == name_upper)
    }
}

/// One fetched row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<BindValue>,
    column_info: Arc<ColumnInfo>,
}

impl Row {
    pub fn new(values: Vec<BindValue>, column_info: Arc<ColumnInfo>) -> Self {
        Self {
            values,
            column_info,
        }
    }

    /// Get value by column index (0-based).
    pub fn get(&self, index: usize) -> Option<&BindValue> {
        self.values.get(index)
    }

    /// Get value by column name (case-insensitive).
    pub fn get_by_name(&self, name: &str) -> Option<&BindValue> {
        self.column_info
            .find_by_name(name)
            .and_then(|idx| self.values.get(idx))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[BindValue] {
        &self.values
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.column_info.column_names()
    }

    /// Column name to value, in column order.
    pub fn to_map(&self) -> IndexMap<String, BindValue> {
        self.column_info
            .columns
            .iter()
            .map(|c| c.name.clone())
            .zip(self.values.iter().cloned())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BindValue> {
        self.values.iter()
    }
}

impl IntoIterator for Row {
    type Item = BindValue;
    type IntoIter = std::vec::IntoIter<BindValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a BindValue;
    type IntoIter = std::slice::Iter<'a, BindValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Every row collected from one cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResult {
    /// Column metadata shared by the rows.
    pub columns: Arc<ColumnInfo>,
    /// Rows returned.
    pub rows: Vec<Row>,
}

impl FetchResult {
    pub fn new(columns: Arc<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Build a result from column names and raw row values.
    pub fn from_values<I, S>(names: I, rows: Vec<Vec<BindValue>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = Arc::new(ColumnInfo::from_names(names));
        let rows = rows
            .into_iter()
            .map(|values| Row::new(values, Arc::clone(&columns)))
            .collect();
        Self { columns, rows }
    }

    /// Apply skip/limit fetch parameters.
    pub fn window(&self, params: &FetchParams) -> Self {
        let rows = self.rows.iter().skip(params.skip);
        let rows: Vec<Row> = match params.limit() {
            Some(limit) => rows.take(limit).cloned().collect(),
            None => rows.cloned().collect(),
        };
        Self {
            columns: Arc::clone(&self.columns),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.column_names()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }
}

impl IntoIterator for FetchResult {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
