//! Loads Sparkify's song and listening-event JSON from S3 into a Redshift
//! star schema: staging tables filled by `COPY`, then fact and dimension
//! tables derived with `INSERT ... SELECT`.

pub mod cli_style;
pub mod config;
pub mod exploration;
pub mod loader;
pub mod logging;
pub mod pipeline;
pub mod quality;
pub mod runner;
pub mod schema;
pub mod transform;
pub mod warehouse;
pub mod warehouse_persistence;

pub use config::AppConfig;
pub use pipeline::{Pipeline, PipelineError, PipelineReport, Stage};
pub use warehouse::{PostgresWarehouse, RecordingWarehouse, Warehouse, WarehouseError};
