//! In-memory warehouse that records statements instead of sending them.
//!
//! Used by `--dry-run` to print the statements a run would issue, and by
//! tests to script query results and failures.

use super::{Row, Warehouse, WarehouseError};
use crate::warehouse_persistence::WarehouseSchema;
use async_trait::async_trait;
use std::collections::VecDeque;

struct ScriptedResponse {
    pattern: String,
    /// Popped front to back; the last response keeps being returned.
    responses: VecDeque<Vec<Row>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RecordedKind {
    Execute,
    Query,
}

#[derive(Debug, Clone)]
struct RecordedStatement {
    kind: RecordedKind,
    sql: String,
}

#[derive(Default)]
pub struct RecordingWarehouse {
    recorded: Vec<RecordedStatement>,
    scripted: Vec<ScriptedResponse>,
    failures: Vec<(String, String)>,
}

impl RecordingWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// A warehouse that reports every table of `schema` as present with the
    /// declared columns, and every count as zero.
    pub fn with_schema(self, schema: &WarehouseSchema) -> Self {
        let table_rows = schema
            .table_names()
            .into_iter()
            .map(|name| single_column_row("table_name", name))
            .collect();
        let mut column_rows = Vec::new();
        for table in schema.tables {
            for column in table.columns {
                column_rows.push(Row::new(
                    vec!["table_name".to_string(), "column_name".to_string()],
                    vec![Some(table.name.to_string()), Some(column.name.to_string())],
                ));
            }
        }
        self.with_rows("information_schema.tables", table_rows)
            .with_rows("information_schema.columns", column_rows)
    }

    /// Answers queries containing `pattern` with `rows`.
    pub fn with_rows(self, pattern: &str, rows: Vec<Row>) -> Self {
        self.with_row_sequence(pattern, vec![rows])
    }

    /// Answers successive queries containing `pattern` with successive
    /// responses; the last response repeats.
    pub fn with_row_sequence(mut self, pattern: &str, responses: Vec<Vec<Row>>) -> Self {
        self.scripted.push(ScriptedResponse {
            pattern: pattern.to_string(),
            responses: responses.into(),
        });
        self
    }

    /// Answers `SELECT COUNT(*) FROM <table>;` with `count`.
    pub fn with_count(self, table: &str, count: i64) -> Self {
        self.with_count_sequence(table, &[count])
    }

    pub fn with_count_sequence(self, table: &str, counts: &[i64]) -> Self {
        let sql = super::count_sql(table);
        let responses = counts
            .iter()
            .map(|c| vec![single_column_row("count", &c.to_string())])
            .collect();
        self.with_row_sequence(&sql, responses)
    }

    /// Fails any statement containing `pattern` with `message`.
    pub fn failing_on(mut self, pattern: &str, message: &str) -> Self {
        self.failures
            .push((pattern.to_string(), message.to_string()));
        self
    }

    /// Every statement and query, in the order received.
    pub fn statements(&self) -> Vec<&str> {
        self.recorded.iter().map(|r| r.sql.as_str()).collect()
    }

    /// Only the statements sent through `execute`.
    pub fn executed_statements(&self) -> Vec<&str> {
        self.recorded
            .iter()
            .filter(|r| r.kind == RecordedKind::Execute)
            .map(|r| r.sql.as_str())
            .collect()
    }

    fn record(&mut self, kind: RecordedKind, sql: &str) -> Result<(), WarehouseError> {
        self.recorded.push(RecordedStatement {
            kind,
            sql: sql.to_string(),
        });
        match self.failures.iter().find(|(pattern, _)| sql.contains(pattern.as_str())) {
            Some((_, message)) => Err(WarehouseError::statement(sql, message.clone())),
            None => Ok(()),
        }
    }

    fn scripted_response(&mut self, sql: &str) -> Option<Vec<Row>> {
        let trimmed = sql.trim();
        let idx = self
            .scripted
            .iter()
            .position(|s| s.pattern == trimmed)
            .or_else(|| {
                self.scripted
                    .iter()
                    .position(|s| sql.contains(s.pattern.as_str()))
            })?;
        let scripted = &mut self.scripted[idx];
        if scripted.responses.len() > 1 {
            scripted.responses.pop_front()
        } else {
            scripted.responses.front().cloned()
        }
    }
}

fn single_column_row(column: &str, value: &str) -> Row {
    Row::new(vec![column.to_string()], vec![Some(value.to_string())])
}

#[async_trait]
impl Warehouse for RecordingWarehouse {
    async fn execute(&mut self, sql: &str) -> Result<u64, WarehouseError> {
        self.record(RecordedKind::Execute, sql)?;
        Ok(0)
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, WarehouseError> {
        self.record(RecordedKind::Query, sql)?;
        if let Some(rows) = self.scripted_response(sql) {
            return Ok(rows);
        }
        // Unscripted counts read as empty tables.
        if sql.trim_start().to_uppercase().starts_with("SELECT COUNT(*)") {
            return Ok(vec![single_column_row("count", "0")]);
        }
        Ok(Vec::new())
    }
}
