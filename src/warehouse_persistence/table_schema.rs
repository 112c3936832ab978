use crate::warehouse::{Warehouse, WarehouseError};
use std::collections::HashMap;
use std::fmt;

#[macro_export]
macro_rules! warehouse_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // Only mutated when optional field assignments are passed
            // (e.g. `is_primary_key = true`).
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                is_identity: false,
                is_dist_key: false,
                is_sort_key: false,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

/// SQL flavor the schema is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Redshift,
    Postgres,
}

impl Dialect {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "redshift" => Some(Dialect::Redshift),
            "postgres" | "postgresql" => Some(Dialect::Postgres),
            _ => None,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Redshift => write!(f, "redshift"),
            Dialect::Postgres => write!(f, "postgres"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    SmallInt,
    Integer,
    BigInt,
    Double,
    Timestamp,
    Varchar(u16),
}

impl SqlType {
    fn render(&self) -> String {
        match self {
            SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Double => "DOUBLE PRECISION".to_string(),
            SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::Varchar(len) => format!("VARCHAR({})", len),
        }
    }
}

/// Table-level distribution for Redshift. Ignored by other dialects.
#[derive(Debug, PartialEq, Eq)]
pub enum DistStyle {
    /// Let the warehouse decide (or follow a `DISTKEY` column).
    Auto,
    /// Replicate the table on every node.
    All,
}

pub struct Column<'a> {
    pub name: &'a str,
    pub sql_type: &'a SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    /// Synthetic auto-incrementing key.
    pub is_identity: bool,
    pub is_dist_key: bool,
    pub is_sort_key: bool,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<'static>],
    pub dist_style: DistStyle,
}

impl Table {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {};", self.name)
    }

    pub fn create_sql(&self, dialect: Dialect) -> String {
        let mut create_sql = format!("CREATE TABLE {} (", self.name);
        for (column_index, column) in self.columns.iter().enumerate() {
            if column_index > 0 {
                create_sql.push_str(", ");
            }
            create_sql.push_str(&format!("{} {}", column.name, column.sql_type.render()));
            if column.is_identity {
                create_sql.push_str(match dialect {
                    Dialect::Redshift => " IDENTITY(0,1)",
                    Dialect::Postgres => " GENERATED BY DEFAULT AS IDENTITY",
                });
            }
            if column.is_primary_key {
                create_sql.push_str(" PRIMARY KEY");
            }
            if column.non_null && !column.is_primary_key {
                create_sql.push_str(" NOT NULL");
            }
            if dialect == Dialect::Redshift {
                if column.is_dist_key {
                    create_sql.push_str(" DISTKEY");
                }
                if column.is_sort_key {
                    create_sql.push_str(" SORTKEY");
                }
            }
        }
        create_sql.push(')');

        if dialect == Dialect::Redshift && self.dist_style == DistStyle::All {
            create_sql.push_str(" DISTSTYLE ALL");
        }
        create_sql.push(';');
        create_sql
    }
}

/// An ordered set of tables, created front to back and dropped back to front.
pub struct WarehouseSchema {
    pub tables: &'static [&'static Table],
}

impl WarehouseSchema {
    pub fn table_names(&self) -> Vec<&'static str> {
        self.tables.iter().map(|t| t.name).collect()
    }

    pub fn drop_statements(&self) -> Vec<String> {
        self.tables.iter().rev().map(|t| t.drop_sql()).collect()
    }

    pub fn create_statements(&self, dialect: Dialect) -> Vec<String> {
        self.tables.iter().map(|t| t.create_sql(dialect)).collect()
    }

    /// Checks that every declared table exists with exactly the declared
    /// columns, in declared order.
    pub async fn validate(&self, warehouse: &mut dyn Warehouse) -> Result<(), SchemaError> {
        let sql = format!(
            "SELECT table_name, column_name FROM information_schema.columns \
             WHERE table_schema = 'public' AND table_name IN ({}) \
             ORDER BY table_name, ordinal_position;",
            quoted_list(&self.table_names())
        );
        let rows = warehouse.query(&sql).await?;

        let mut actual: HashMap<String, Vec<String>> = HashMap::new();
        for row in &rows {
            let table = row.text(0)?;
            let column = row.text(1)?;
            actual
                .entry(table.to_string())
                .or_default()
                .push(column.to_string());
        }

        for table in self.tables {
            let expected = table.column_names();
            let Some(actual_columns) = actual.get(table.name) else {
                return Err(SchemaError::MissingTable(table.name.to_string()));
            };
            if actual_columns.len() != expected.len() {
                return Err(SchemaError::Mismatch(format!(
                    "Table {} has {} columns, expected {}. Found column names: {}, expected: {}",
                    table.name,
                    actual_columns.len(),
                    expected.len(),
                    actual_columns.join(", "),
                    expected.join(", ")
                )));
            }
            for (actual_column, expected_column) in actual_columns.iter().zip(expected.iter()) {
                if actual_column != expected_column {
                    return Err(SchemaError::Mismatch(format!(
                        "Table {} Column name mismatch: expected {}, got {}",
                        table.name, expected_column, actual_column
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Table {0} does not exist")]
    MissingTable(String),

    #[error("{0}")]
    Mismatch(String),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
}

/// Renders `'a', 'b', 'c'` for use in an `IN (...)` clause.
pub fn quoted_list(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("'{}'", v.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ")
}
