//! Post-load quality checks.
//!
//! Everything here is observational: findings are reported as warnings and
//! never fail the run. A check whose query itself fails still propagates
//! the error like any other statement.

use crate::schema::{ARTISTS_TABLE, SONGPLAYS_TABLE, SONGS_TABLE, SPARKIFY_SCHEMA, USERS_TABLE};
use crate::transform::TimeParts;
use crate::warehouse::{count_rows, query_count, Row, Warehouse, WarehouseError};
use crate::warehouse_persistence::Dialect;
use chrono::NaiveDateTime;
use std::fmt;
use tracing::{info, warn};

/// Redshift system table collecting records rejected by `COPY`.
pub const LOAD_ERRORS_TABLE: &str = "stl_load_errors";

/// Number of `time` rows re-checked against the Rust decomposition.
const TIME_SAMPLE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCount {
    pub table: String,
    pub rows: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualityWarning {
    LoadErrors {
        count: i64,
    },
    DuplicateKeys {
        table: &'static str,
        key: &'static str,
        duplicated_keys: i64,
    },
    UnresolvedSongplays {
        unresolved: i64,
        total: i64,
    },
    TimeDecompositionMismatch {
        start_time: NaiveDateTime,
        stored: TimeParts,
        expected: TimeParts,
    },
}

impl fmt::Display for QualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityWarning::LoadErrors { count } => {
                write!(f, "{} rows in {}", count, LOAD_ERRORS_TABLE)
            }
            QualityWarning::DuplicateKeys {
                table,
                key,
                duplicated_keys,
            } => write!(
                f,
                "{} has {} duplicated {} values",
                table, duplicated_keys, key
            ),
            QualityWarning::UnresolvedSongplays { unresolved, total } => write!(
                f,
                "{} of {} songplays have no matching song",
                unresolved, total
            ),
            QualityWarning::TimeDecompositionMismatch {
                start_time,
                stored,
                expected,
            } => write!(
                f,
                "time row {} stored {:?}, expected {:?}",
                start_time, stored, expected
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QualityReport {
    pub counts: Vec<TableCount>,
    pub warnings: Vec<QualityWarning>,
}

impl QualityReport {
    pub fn count_of(&self, table: &str) -> Option<i64> {
        self.counts.iter().find(|c| c.table == table).map(|c| c.rows)
    }
}

/// Tables whose row counts are reported, in report order.
pub fn counted_tables(dialect: Dialect) -> Vec<&'static str> {
    let mut tables = SPARKIFY_SCHEMA.table_names();
    if dialect == Dialect::Redshift {
        tables.push(LOAD_ERRORS_TABLE);
    }
    tables
}

fn duplicate_keys_sql(table: &str, key: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM (SELECT {key} FROM {table} GROUP BY {key} HAVING COUNT(*) > 1) duplicated;",
        key = key,
        table = table
    )
}

fn unresolved_songplays_sql() -> String {
    format!(
        "SELECT COUNT(*) FROM {} WHERE song_id IS NULL;",
        SONGPLAYS_TABLE.name
    )
}

fn time_sample_sql() -> String {
    format!(
        "SELECT start_time, hour, day, week, month, year, weekday FROM time ORDER BY start_time LIMIT {};",
        TIME_SAMPLE_SIZE
    )
}

pub async fn run_quality_checks(
    warehouse: &mut dyn Warehouse,
    dialect: Dialect,
) -> Result<QualityReport, WarehouseError> {
    let mut report = QualityReport::default();

    for table in counted_tables(dialect) {
        let rows = count_rows(warehouse, table).await?;
        info!("{}: {} rows", table, rows);
        report.counts.push(TableCount {
            table: table.to_string(),
            rows,
        });
    }

    if let Some(count) = report.count_of(LOAD_ERRORS_TABLE) {
        if count > 0 {
            report.warnings.push(QualityWarning::LoadErrors { count });
        }
    }

    for (table, key) in [
        (USERS_TABLE.name, "user_id"),
        (SONGS_TABLE.name, "song_id"),
        (ARTISTS_TABLE.name, "artist_id"),
    ] {
        let duplicated_keys = query_count(warehouse, &duplicate_keys_sql(table, key)).await?;
        if duplicated_keys > 0 {
            report.warnings.push(QualityWarning::DuplicateKeys {
                table,
                key,
                duplicated_keys,
            });
        }
    }

    let unresolved = query_count(warehouse, &unresolved_songplays_sql()).await?;
    if unresolved > 0 {
        report.warnings.push(QualityWarning::UnresolvedSongplays {
            unresolved,
            total: report.count_of(SONGPLAYS_TABLE.name).unwrap_or(0),
        });
    }

    let sample = warehouse.query(&time_sample_sql()).await?;
    for row in &sample {
        let (start_time, stored) = parse_time_row(row)?;
        let expected = TimeParts::from_start_time(&start_time);
        if stored != expected {
            report.warnings.push(QualityWarning::TimeDecompositionMismatch {
                start_time,
                stored,
                expected,
            });
        }
    }

    for warning in &report.warnings {
        warn!("Quality check: {}", warning);
    }
    Ok(report)
}

fn parse_time_row(row: &Row) -> Result<(NaiveDateTime, TimeParts), WarehouseError> {
    let raw_start = row.text(0)?;
    let start_time = NaiveDateTime::parse_from_str(raw_start, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| WarehouseError::Decode(format!("start_time {:?}: {}", raw_start, e)))?;
    let field = |idx: usize| -> Result<u32, WarehouseError> {
        let value = row.i64(idx)?;
        u32::try_from(value)
            .map_err(|_| WarehouseError::Decode(format!("column {}: {} is out of range", idx, value)))
    };
    let year = row.i64(5)?;
    let parts = TimeParts {
        hour: field(1)?,
        day: field(2)?,
        week: field(3)?,
        month: field(4)?,
        year: i32::try_from(year)
            .map_err(|_| WarehouseError::Decode(format!("column 5: {} is out of range", year)))?,
        weekday: field(6)?,
    };
    Ok((start_time, parts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::RecordingWarehouse;

    fn time_row(values: [&str; 7]) -> Row {
        Row::new(
            ["start_time", "hour", "day", "week", "month", "year", "weekday"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            values.iter().map(|v| Some(v.to_string())).collect(),
        )
    }

    fn count_row(count: i64) -> Row {
        Row::new(vec!["count".to_string()], vec![Some(count.to_string())])
    }

    #[test]
    fn test_counted_tables_include_load_errors_on_redshift() {
        let redshift = counted_tables(Dialect::Redshift);
        assert_eq!(redshift.len(), 8);
        assert_eq!(redshift.last(), Some(&LOAD_ERRORS_TABLE));

        let postgres = counted_tables(Dialect::Postgres);
        assert_eq!(postgres.len(), 7);
        assert!(!postgres.contains(&LOAD_ERRORS_TABLE));
    }

    #[tokio::test]
    async fn test_clean_warehouse_has_no_warnings() {
        let mut warehouse = RecordingWarehouse::new()
            .with_count("songplays", 3)
            .with_count("users", 2)
            .with_rows(
                "FROM time ORDER BY start_time",
                vec![time_row(["2018-11-02 01:25:34", "1", "2", "44", "11", "2018", "5"])],
            );

        let report = run_quality_checks(&mut warehouse, Dialect::Redshift)
            .await
            .unwrap();

        assert_eq!(report.counts.len(), 8);
        assert_eq!(report.count_of("songplays"), Some(3));
        assert_eq!(report.count_of("users"), Some(2));
        assert_eq!(report.count_of(LOAD_ERRORS_TABLE), Some(0));
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[tokio::test]
    async fn test_findings_become_warnings() {
        let mut warehouse = RecordingWarehouse::new()
            .with_count(LOAD_ERRORS_TABLE, 4)
            .with_count("songplays", 10)
            .with_rows("GROUP BY user_id HAVING", vec![count_row(2)])
            .with_rows("WHERE song_id IS NULL", vec![count_row(7)])
            .with_rows(
                "FROM time ORDER BY start_time",
                vec![time_row(["2018-11-02 01:25:34", "21", "1", "44", "11", "2018", "4"])],
            );

        let report = run_quality_checks(&mut warehouse, Dialect::Redshift)
            .await
            .unwrap();

        assert_eq!(report.warnings.len(), 4);
        assert!(report.warnings.contains(&QualityWarning::LoadErrors { count: 4 }));
        assert!(report.warnings.contains(&QualityWarning::DuplicateKeys {
            table: "users",
            key: "user_id",
            duplicated_keys: 2,
        }));
        assert!(report
            .warnings
            .contains(&QualityWarning::UnresolvedSongplays {
                unresolved: 7,
                total: 10,
            }));
        assert!(matches!(
            report.warnings.last(),
            Some(QualityWarning::TimeDecompositionMismatch { stored, .. }) if stored.hour == 21
        ));
    }

    #[tokio::test]
    async fn test_failing_count_propagates() {
        let mut warehouse =
            RecordingWarehouse::new().failing_on(LOAD_ERRORS_TABLE, "permission denied");
        let err = run_quality_checks(&mut warehouse, Dialect::Redshift)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_parse_time_row_accepts_fractional_seconds() {
        let (start_time, parts) =
            parse_time_row(&time_row(["2018-11-02 01:25:34.000", "1", "2", "44", "11", "2018", "5"]))
                .unwrap();
        assert_eq!(start_time.to_string(), "2018-11-02 01:25:34");
        assert_eq!(parts.weekday, 5);
    }

    #[test]
    fn test_parse_time_row_rejects_out_of_range_fields() {
        let err =
            parse_time_row(&time_row(["2018-11-02 01:25:34", "-1", "2", "44", "11", "2018", "5"]))
                .unwrap_err();
        assert!(matches!(err, WarehouseError::Decode(_)));
        assert!(err.to_string().contains("-1"));

        let err = parse_time_row(&time_row([
            "2018-11-02 01:25:34",
            "1",
            "2",
            "44",
            "11",
            "4294967296",
            "5",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_warning_display() {
        let warning = QualityWarning::DuplicateKeys {
            table: "artists",
            key: "artist_id",
            duplicated_keys: 3,
        };
        assert_eq!(warning.to_string(), "artists has 3 duplicated artist_id values");
    }
}
