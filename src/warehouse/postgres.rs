use super::{Row, Warehouse, WarehouseError};
use crate::config::ClusterSettings;
use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};
use tracing::{debug, error};

/// Warehouse reached over the PostgreSQL wire protocol (Redshift speaks it
/// too). Statements go through the simple query protocol, so every
/// statement is committed on its own.
pub struct PostgresWarehouse {
    client: Client,
}

impl PostgresWarehouse {
    pub async fn connect(cluster: &ClusterSettings) -> Result<Self, WarehouseError> {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&cluster.host)
            .dbname(&cluster.db_name)
            .user(&cluster.user)
            .password(&cluster.password)
            .port(cluster.port);

        let (client, connection) =
            pg_config
                .connect(NoTls)
                .await
                .map_err(|e| WarehouseError::Connect {
                    endpoint: cluster.endpoint(),
                    message: describe_error(&e),
                })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("Warehouse connection error: {}", e);
            }
        });

        Ok(Self { client })
    }

    async fn simple_query(&self, sql: &str) -> Result<Vec<SimpleQueryMessage>, WarehouseError> {
        debug!("Executing: {}", sql);
        self.client
            .simple_query(sql)
            .await
            .map_err(|e| WarehouseError::statement(sql, describe_error(&e)))
    }
}

/// The server's own report when there is one (severity, message, SQLSTATE
/// and detail), otherwise the driver error with its causes.
fn describe_error(e: &tokio_postgres::Error) -> String {
    if let Some(db) = e.as_db_error() {
        let mut message = format!("{}: {} ({})", db.severity(), db.message(), db.code().code());
        if let Some(detail) = db.detail() {
            message.push_str(&format!(", {}", detail));
        }
        return message;
    }
    let mut message = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        message.push_str(&format!(": {}", cause));
        source = cause.source();
    }
    message
}

#[async_trait]
impl Warehouse for PostgresWarehouse {
    async fn execute(&mut self, sql: &str) -> Result<u64, WarehouseError> {
        let messages = self.simple_query(sql).await?;
        Ok(messages
            .iter()
            .map(|m| match m {
                SimpleQueryMessage::CommandComplete(n) => *n,
                _ => 0,
            })
            .sum())
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, WarehouseError> {
        let messages = self.simple_query(sql).await?;
        let rows = messages
            .iter()
            .filter_map(|m| match m {
                SimpleQueryMessage::Row(row) => {
                    let columns = row
                        .columns()
                        .iter()
                        .map(|c| c.name().to_string())
                        .collect();
                    let values = (0..row.len())
                        .map(|idx| row.get(idx).map(str::to_string))
                        .collect();
                    Some(Row::new(columns, values))
                }
                _ => None,
            })
            .collect();
        Ok(rows)
    }
}
