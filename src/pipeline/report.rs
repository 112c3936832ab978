use super::Stage;
use crate::exploration::ExplorationResult;
use crate::quality::QualityReport;
use std::time::Duration;

/// A single statement run by a stage.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub name: String,
    pub table: Option<&'static str>,
    pub rows_before: Option<i64>,
    pub rows_after: Option<i64>,
    pub elapsed: Duration,
}

impl StepOutcome {
    pub fn rows_added(&self) -> Option<i64> {
        Some(self.rows_after? - self.rows_before?)
    }
}

#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub stage: Stage,
    pub steps: Vec<StepOutcome>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub stages: Vec<StageOutcome>,
    pub quality: Option<QualityReport>,
    pub exploration: Vec<ExplorationResult>,
}

impl PipelineReport {
    pub fn stage(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn total_elapsed(&self) -> Duration {
        self.stages.iter().map(|s| s.elapsed).sum()
    }
}
