//! Shared plumbing for the `create-tables` and `etl` binaries.

use crate::cli_style::{print_key_value, print_section_footer, print_section_header, print_statements};
use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};
use crate::pipeline::{Pipeline, PipelineReport};
use crate::schema::SPARKIFY_SCHEMA;
use crate::warehouse::{PostgresWarehouse, RecordingWarehouse};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Print the statements the run would issue without connecting.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

pub fn version() -> &'static str {
    concat!(env!("CARGO_PKG_VERSION"), "-", env!("GIT_HASH"))
}

pub fn load_config(args: &RunArgs) -> Result<AppConfig> {
    let config = AppConfig::load(&args.config)
        .with_context(|| format!("Invalid configuration in {}", args.config.display()))?;
    print_section_header("Configuration");
    print_key_value("file", &args.config.display().to_string());
    print_key_value("endpoint", &config.cluster.endpoint());
    print_key_value("dialect", &config.cluster.dialect.to_string());
    print_key_value("users", &config.transform.users.to_string());
    print_key_value("songs", &config.transform.songs.to_string());
    print_key_value("artists", &config.transform.artists.to_string());
    print_section_footer();
    Ok(config)
}

/// Runs `pipeline` against the configured cluster, or against a recording
/// warehouse that answers as if every table existed when `dry_run` is set.
pub async fn run_pipeline(
    pipeline: &Pipeline,
    config: &AppConfig,
    dry_run: bool,
) -> Result<PipelineReport> {
    if dry_run {
        info!("Dry run, not connecting to {}", config.cluster.endpoint());
        let mut warehouse = RecordingWarehouse::new().with_schema(&SPARKIFY_SCHEMA);
        let report = pipeline.run(&mut warehouse, config).await?;
        print_statements("Statements", &warehouse.executed_statements());
        return Ok(report);
    }

    info!("Connecting to {}", config.cluster.endpoint());
    let mut warehouse = PostgresWarehouse::connect(&config.cluster)
        .await
        .context("Could not open a warehouse connection")?;
    let report = pipeline.run(&mut warehouse, config).await?;
    Ok(report)
}
