//! Warehouse connection abstraction.
//!
//! Every stage talks to the warehouse through the [`Warehouse`] trait: one
//! statement at a time, each awaited to completion before the next is sent.

mod postgres;
mod recording;

pub use postgres::PostgresWarehouse;
pub use recording::RecordingWarehouse;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a warehouse connection.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("Failed to connect to {endpoint}: {message}")]
    Connect { endpoint: String, message: String },

    #[error("Statement failed ({statement}): {message}")]
    Statement { statement: String, message: String },

    #[error("Could not decode result: {0}")]
    Decode(String),
}

impl WarehouseError {
    pub fn statement(sql: &str, message: impl Into<String>) -> Self {
        WarehouseError::Statement {
            statement: statement_head(sql),
            message: message.into(),
        }
    }
}

/// First few words of a statement, for logs and error messages.
pub fn statement_head(sql: &str) -> String {
    const MAX_CHARS: usize = 48;
    let collapsed = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_CHARS {
        collapsed
    } else {
        let head: String = collapsed.chars().take(MAX_CHARS).collect();
        format!("{}...", head)
    }
}

/// A single result row. Values are kept in their text form, as returned by
/// the simple query protocol; `None` is SQL NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Option<String>>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Option<String>>) -> Self {
        Self { columns, values }
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).and_then(|v| v.as_deref())
    }

    /// Name of column `idx` for error messages, falling back to its position.
    fn column_label(&self, idx: usize) -> String {
        match self.columns.get(idx) {
            Some(name) => name.clone(),
            None => format!("#{}", idx),
        }
    }

    /// Non-null text value at `idx`.
    pub fn text(&self, idx: usize) -> Result<&str, WarehouseError> {
        self.get(idx).ok_or_else(|| {
            WarehouseError::Decode(format!("column {} is null or missing", self.column_label(idx)))
        })
    }

    pub fn i64(&self, idx: usize) -> Result<i64, WarehouseError> {
        let raw = self.text(idx)?;
        raw.trim().parse().map_err(|_| {
            WarehouseError::Decode(format!(
                "column {}: {:?} is not an integer",
                self.column_label(idx),
                raw
            ))
        })
    }

    /// Cells rendered for display, with NULL spelled out.
    pub fn display_values(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|v| v.clone().unwrap_or_else(|| "NULL".to_string()))
            .collect()
    }
}

/// A single, serially used warehouse connection.
#[async_trait]
pub trait Warehouse: Send {
    /// Runs a statement and returns the number of affected rows, if the
    /// warehouse reports one.
    async fn execute(&mut self, sql: &str) -> Result<u64, WarehouseError>;

    /// Runs a query and returns all of its rows.
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, WarehouseError>;
}

/// `SELECT COUNT(*)` for a table.
pub fn count_sql(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {};", table)
}

/// Reads the single integer a `COUNT(*)`-like query returns.
pub async fn query_count(warehouse: &mut dyn Warehouse, sql: &str) -> Result<i64, WarehouseError> {
    let rows = warehouse.query(sql).await?;
    let row = rows
        .first()
        .ok_or_else(|| WarehouseError::Decode(format!("no rows returned by {}", statement_head(sql))))?;
    row.i64(0)
}

pub async fn count_rows(warehouse: &mut dyn Warehouse, table: &str) -> Result<i64, WarehouseError> {
    query_count(warehouse, &count_sql(table)).await
}
