//! Column-oriented feature table
//!
//! Cells are either integers (derived calendar fields and flags) or text
//! (everything read from the input file). A cleaned table cannot hold a
//! missing cell: columns are `Vec<Value>`, not `Vec<Option<Value>>`.

use std::collections::BTreeSet;
use std::fmt;

use crate::errors::{PipelineError, Result};

/// A single cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i64),
    Text(String),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Textual form used for categorical features
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

/// Named column of cells
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn to_text(&self) -> Vec<String> {
        self.values.iter().map(Value::to_text).collect()
    }
}

/// Rectangular table with unique column names
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureTable {
    columns: Vec<Column>,
    n_rows: usize,
}

impl FeatureTable {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut table = Self {
            columns: Vec::with_capacity(columns.len()),
            n_rows: columns.first().map(|c| c.values.len()).unwrap_or(0),
        };
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Append a column; its length must match and its name must be new
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if self.columns.is_empty() {
            self.n_rows = column.values.len();
        } else if column.values.len() != self.n_rows {
            return Err(PipelineError::Parse(format!(
                "column `{}` has {} rows, expected {}",
                column.name,
                column.values.len(),
                self.n_rows
            )));
        }
        if self.contains(&column.name) {
            return Err(PipelineError::Parse(format!(
                "duplicate column `{}`",
                column.name
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column by name, or `MissingColumn`
    pub fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
    }

    /// Names that appear more than once in `names`
    pub fn duplicate_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();
        for name in names {
            if !seen.insert(name) {
                duplicates.insert(name.to_string());
            }
        }
        duplicates.into_iter().collect()
    }
}
