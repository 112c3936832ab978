use crate::schema::{SPARKIFY_SCHEMA, STAGING_SCHEMA};
use crate::warehouse::{Warehouse, WarehouseError};
use crate::warehouse_persistence::quoted_list;
use std::collections::HashSet;
use std::fmt;

/// One barrier in the pipeline. A stage starts only after the previous one
/// has completed every statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Drop,
    Create,
    Load,
    Transform,
    Validate,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Drop => "drop",
            Stage::Create => "create",
            Stage::Load => "load",
            Stage::Transform => "transform",
            Stage::Validate => "validate",
        }
    }

    /// Tables that must exist before the stage starts.
    pub fn required_tables(&self) -> Vec<&'static str> {
        match self {
            Stage::Drop | Stage::Create => Vec::new(),
            Stage::Load => STAGING_SCHEMA.table_names(),
            Stage::Transform | Stage::Validate => SPARKIFY_SCHEMA.table_names(),
        }
    }

    /// Whether every step must leave its target table with at least as many
    /// rows as before.
    pub fn tracks_row_counts(&self) -> bool {
        matches!(self, Stage::Load | Stage::Transform)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Returns the subset of `tables` missing from the public schema.
pub async fn missing_tables(
    warehouse: &mut dyn Warehouse,
    tables: &[&'static str],
) -> Result<Vec<String>, WarehouseError> {
    if tables.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = 'public' AND table_name IN ({});",
        quoted_list(tables)
    );
    let rows = warehouse.query(&sql).await?;
    let mut present = HashSet::new();
    for row in &rows {
        present.insert(row.text(0)?.to_string());
    }
    Ok(tables
        .iter()
        .filter(|t| !present.contains(**t))
        .map(|t| t.to_string())
        .collect())
}
