//! The ordered pipeline of warehouse stages.
//!
//! Stages run strictly one after another, and so do the statements inside a
//! stage. There is no retry and no rollback: the first failing statement
//! aborts the run and leaves the warehouse in whatever state it reached.

mod report;
mod stage;

pub use report::{PipelineReport, StageOutcome, StepOutcome};
pub use stage::{missing_tables, Stage};

use crate::config::AppConfig;
use crate::exploration::run_exploration;
use crate::loader::copy_statements;
use crate::quality::run_quality_checks;
use crate::schema::SPARKIFY_SCHEMA;
use crate::transform::insert_steps;
use crate::warehouse::{count_rows, statement_head, Warehouse, WarehouseError};
use crate::warehouse_persistence::{Dialect, SchemaError};
use std::time::Instant;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("Cannot run {stage} stage, missing tables: {}", .tables.join(", "))]
    MissingTables { stage: Stage, tables: Vec<String> },

    #[error("Step {step} shrank {table} from {before} to {after} rows")]
    RowCountDecreased {
        step: String,
        table: String,
        before: i64,
        after: i64,
    },

    #[error("Schema check failed after create: {0}")]
    Schema(#[from] SchemaError),

    #[error("The {stage} stage is not supported by the {dialect} dialect")]
    UnsupportedDialect { stage: Stage, dialect: Dialect },
}

/// A statement to run, with the table it grows (if any).
struct PlannedStep {
    name: String,
    table: Option<&'static str>,
    sql: String,
}

pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Drop and recreate every table.
    pub fn setup() -> Self {
        Self::new(vec![Stage::Drop, Stage::Create])
    }

    /// Load staging, derive the star schema, report on the result.
    pub fn etl() -> Self {
        Self::new(vec![Stage::Load, Stage::Transform, Stage::Validate])
    }

    pub fn full() -> Self {
        Self::new(vec![
            Stage::Drop,
            Stage::Create,
            Stage::Load,
            Stage::Transform,
            Stage::Validate,
        ])
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub async fn run(
        &self,
        warehouse: &mut dyn Warehouse,
        config: &AppConfig,
    ) -> Result<PipelineReport, PipelineError> {
        let mut report = PipelineReport::default();
        for stage in &self.stages {
            let started = Instant::now();
            info!("Starting {} stage", stage);
            let steps = run_stage(*stage, warehouse, config, &mut report).await?;
            let elapsed = started.elapsed();
            info!("Completed {} stage in {:.2?}", stage, elapsed);
            report.stages.push(StageOutcome {
                stage: *stage,
                steps,
                elapsed,
            });
        }
        Ok(report)
    }
}

async fn run_stage(
    stage: Stage,
    warehouse: &mut dyn Warehouse,
    config: &AppConfig,
    report: &mut PipelineReport,
) -> Result<Vec<StepOutcome>, PipelineError> {
    let dialect = config.cluster.dialect;
    if stage == Stage::Load && dialect != Dialect::Redshift {
        return Err(PipelineError::UnsupportedDialect { stage, dialect });
    }

    let missing = missing_tables(warehouse, &stage.required_tables()).await?;
    if !missing.is_empty() {
        return Err(PipelineError::MissingTables {
            stage,
            tables: missing,
        });
    }

    let planned: Vec<PlannedStep> = match stage {
        Stage::Drop => SPARKIFY_SCHEMA
            .drop_statements()
            .into_iter()
            .map(|sql| PlannedStep {
                name: statement_head(&sql),
                table: None,
                sql,
            })
            .collect(),
        Stage::Create => SPARKIFY_SCHEMA
            .create_statements(dialect)
            .into_iter()
            .map(|sql| PlannedStep {
                name: statement_head(&sql),
                table: None,
                sql,
            })
            .collect(),
        Stage::Load => copy_statements(config)
            .into_iter()
            .map(|copy| PlannedStep {
                name: copy.to_string(),
                table: Some(copy.table),
                sql: copy.to_sql(),
            })
            .collect(),
        Stage::Transform => {
            info!(
                "Transform policies: users={}, songs={}, artists={}",
                config.transform.users,
                config.transform.songs,
                config.transform.artists
            );
            insert_steps(&config.transform)
                .into_iter()
                .map(|step| PlannedStep {
                    name: step.name.to_string(),
                    table: Some(step.table),
                    sql: step.sql,
                })
                .collect()
        }
        Stage::Validate => Vec::new(),
    };

    let mut outcomes = Vec::with_capacity(planned.len());
    for step in planned {
        outcomes.push(run_step(stage, warehouse, step).await?);
    }

    match stage {
        Stage::Create => SPARKIFY_SCHEMA.validate(warehouse).await?,
        Stage::Validate => {
            report.quality = Some(run_quality_checks(warehouse, dialect).await?);
            report.exploration = run_exploration(warehouse).await?;
        }
        _ => {}
    }

    Ok(outcomes)
}

async fn run_step(
    stage: Stage,
    warehouse: &mut dyn Warehouse,
    step: PlannedStep,
) -> Result<StepOutcome, PipelineError> {
    let tracked_table = step.table.filter(|_| stage.tracks_row_counts());

    let rows_before = match tracked_table {
        Some(table) => Some(count_rows(warehouse, table).await?),
        None => None,
    };

    info!("Executing: {}", step.name);
    let started = Instant::now();
    warehouse.execute(&step.sql).await?;
    let elapsed = started.elapsed();

    let rows_after = match tracked_table {
        Some(table) => Some(count_rows(warehouse, table).await?),
        None => None,
    };

    if let (Some(table), Some(before), Some(after)) = (tracked_table, rows_before, rows_after) {
        if after < before {
            return Err(PipelineError::RowCountDecreased {
                step: step.name,
                table: table.to_string(),
                before,
                after,
            });
        }
        info!(
            "Completed {} in {:.2?}: {} -> {} rows",
            step.name, elapsed, before, after
        );
    } else {
        info!("Completed {} in {:.2?}", step.name, elapsed);
    }

    Ok(StepOutcome {
        name: step.name,
        table: step.table,
        rows_before,
        rows_after,
        elapsed,
    })
}
