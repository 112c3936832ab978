use super::constants::*;
use sparkify_dwh::config::{AppConfig, ClusterSettings, FileConfig};
use sparkify_dwh::schema::SPARKIFY_SCHEMA;
use sparkify_dwh::warehouse_persistence::Dialect;
use sparkify_dwh::RecordingWarehouse;
use std::str::FromStr;
use tokio_postgres::config::Host;

fn config_toml(dialect: Dialect, transform: &str) -> String {
    format!(
        r#"
[CLUSTER]
HOST = "dwhcluster.abc123.us-west-2.redshift.amazonaws.com"
DB_NAME = "dwh"
DB_USER = "dwhuser"
DB_PASSWORD = "Passw0rd"
DIALECT = "{dialect}"

[IAM_ROLE]
ARN = "{IAM_ROLE_ARN}"

[S3]
LOG_DATA = "{LOG_DATA}"
LOG_JSONPATH = "{LOG_JSONPATH}"
SONG_DATA = "{SONG_DATA}"

{transform}
"#
    )
}

/// A Redshift configuration with default transform policies.
pub fn test_config() -> AppConfig {
    test_config_with(Dialect::Redshift, "")
}

/// `transform` is spliced in verbatim, e.g. a `[TRANSFORM]` section.
pub fn test_config_with(dialect: Dialect, transform: &str) -> AppConfig {
    let file = FileConfig::parse(&config_toml(dialect, transform)).unwrap();
    AppConfig::resolve(file).unwrap()
}

/// A recording warehouse in which every table already exists.
pub fn scripted_warehouse() -> RecordingWarehouse {
    RecordingWarehouse::new().with_schema(&SPARKIFY_SCHEMA)
}

/// Configuration pointing at the PostgreSQL database named by
/// `SPARKIFY_TEST_DSN`, or `None` when the variable is unset.
pub fn live_config() -> Option<AppConfig> {
    let dsn = std::env::var(TEST_DSN_ENV).ok()?;
    let pg_config = tokio_postgres::Config::from_str(&dsn).unwrap();

    let host = match pg_config.get_hosts().first() {
        Some(Host::Tcp(host)) => host.clone(),
        _ => "localhost".to_string(),
    };
    let password = pg_config
        .get_password()
        .map(|p| String::from_utf8_lossy(p).into_owned())
        .unwrap_or_default();

    let mut config = test_config_with(Dialect::Postgres, "");
    config.cluster = ClusterSettings {
        host,
        db_name: pg_config.get_dbname().unwrap_or("postgres").to_string(),
        user: pg_config.get_user().unwrap_or("postgres").to_string(),
        password,
        port: pg_config.get_ports().first().copied().unwrap_or(5432),
        dialect: Dialect::Postgres,
    };
    Some(config)
}
