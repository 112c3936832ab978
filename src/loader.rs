//! Bulk loading of the raw JSON files into the staging tables.

use crate::config::AppConfig;
use crate::schema::{STAGING_EVENTS_TABLE, STAGING_SONGS_TABLE};
use std::fmt;

/// How the warehouse maps JSON keys onto table columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonFormat {
    /// Keys are matched to column names.
    Auto,
    /// Columns are filled in order from a JSON path manifest.
    Paths(String),
}

impl JsonFormat {
    fn as_sql_literal(&self) -> String {
        match self {
            JsonFormat::Auto => "'auto'".to_string(),
            JsonFormat::Paths(path) => quote_literal(path),
        }
    }
}

/// A single `COPY` statement importing every object under a storage prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyStatement {
    pub table: &'static str,
    pub source: String,
    pub iam_role_arn: String,
    pub json: JsonFormat,
    pub region: String,
}

impl CopyStatement {
    pub fn to_sql(&self) -> String {
        format!(
            "COPY {} FROM {} IAM_ROLE {} JSON {} REGION {};",
            self.table,
            quote_literal(&self.source),
            quote_literal(&self.iam_role_arn),
            self.json.as_sql_literal(),
            quote_literal(&self.region)
        )
    }
}

impl fmt::Display for CopyStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {}", self.table, self.source)
    }
}

/// The two bulk loads, events first.
pub fn copy_statements(config: &AppConfig) -> Vec<CopyStatement> {
    vec![
        CopyStatement {
            table: STAGING_EVENTS_TABLE.name,
            source: config.storage.log_data.clone(),
            iam_role_arn: config.iam_role_arn.clone(),
            json: JsonFormat::Paths(config.storage.log_jsonpath.clone()),
            region: config.storage.region.clone(),
        },
        CopyStatement {
            table: STAGING_SONGS_TABLE.name,
            source: config.storage.song_data.clone(),
            iam_role_arn: config.iam_role_arn.clone(),
            json: JsonFormat::Auto,
            region: config.storage.region.clone(),
        },
    ]
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClusterSettings, StorageSettings, TransformSettings};
    use crate::warehouse_persistence::Dialect;

    fn test_config() -> AppConfig {
        AppConfig {
            cluster: ClusterSettings {
                host: "localhost".to_string(),
                db_name: "dwh".to_string(),
                user: "dwhuser".to_string(),
                password: "secret".to_string(),
                port: 5439,
                dialect: Dialect::Redshift,
            },
            iam_role_arn: "arn:aws:iam::123456789012:role/dwhRole".to_string(),
            storage: StorageSettings {
                log_data: "s3://udacity-dend/log_data".to_string(),
                log_jsonpath: "s3://udacity-dend/log_json_path.json".to_string(),
                song_data: "s3://udacity-dend/song_data".to_string(),
                region: "us-west-2".to_string(),
            },
            transform: TransformSettings::default(),
        }
    }

    #[test]
    fn test_events_copy_uses_manifest() {
        let statements = copy_statements(&test_config());
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[0].to_sql(),
            "COPY staging_events FROM 's3://udacity-dend/log_data' \
             IAM_ROLE 'arn:aws:iam::123456789012:role/dwhRole' \
             JSON 's3://udacity-dend/log_json_path.json' REGION 'us-west-2';"
        );
    }

    #[test]
    fn test_songs_copy_uses_auto() {
        let statements = copy_statements(&test_config());
        assert_eq!(
            statements[1].to_sql(),
            "COPY staging_songs FROM 's3://udacity-dend/song_data' \
             IAM_ROLE 'arn:aws:iam::123456789012:role/dwhRole' \
             JSON 'auto' REGION 'us-west-2';"
        );
    }

    #[test]
    fn test_quotes_are_escaped() {
        let mut config = test_config();
        config.storage.song_data = "s3://bucket/it's".to_string();
        let sql = copy_statements(&config)[1].to_sql();
        assert!(sql.contains("FROM 's3://bucket/it''s'"));
    }

    #[test]
    fn test_display() {
        let statements = copy_statements(&test_config());
        assert_eq!(
            statements[1].to_string(),
            "staging_songs <- s3://udacity-dend/song_data"
        );
    }

    #[test]
    fn test_manifest_matches_staging_events_columns() {
        let manifest: serde_json::Value =
            serde_json::from_str(include_str!("../manifests/log_json_path.json")).unwrap();
        let paths = manifest["jsonpaths"].as_array().unwrap();
        assert_eq!(paths.len(), STAGING_EVENTS_TABLE.columns.len());

        // Manifest keys are camelCase, columns are snake_case.
        for (path, column) in paths.iter().zip(STAGING_EVENTS_TABLE.columns) {
            let key = path
                .as_str()
                .unwrap()
                .trim_start_matches("$['")
                .trim_end_matches("']");
            let snake: String = key
                .chars()
                .flat_map(|c| {
                    if c.is_ascii_uppercase() {
                        vec!['_', c.to_ascii_lowercase()]
                    } else {
                        vec![c]
                    }
                })
                .collect();
            assert_eq!(snake, column.name);
        }
    }
}
