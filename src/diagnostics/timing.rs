//! Per-stage wall-clock timings of a pipeline run.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Stages of one fit → round → accept run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineStage {
    Fit,
    Outliers,
    Rounding,
    Acceptance,
}

impl PipelineStage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Fit => "fit",
            Self::Outliers => "outliers",
            Self::Rounding => "rounding",
            Self::Acceptance => "acceptance",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub stage: PipelineStage,
    pub elapsed_ms: f64,
}

/// Stage timings in execution order plus the end-to-end total.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    /// Records `stage` as having run since `start` and returns its duration.
    pub fn record(&mut self, stage: PipelineStage, start: Instant) -> f64 {
        let elapsed_ms = elapsed_ms(start);
        self.stages.push(StageTiming { stage, elapsed_ms });
        elapsed_ms
    }

    /// Closes the breakdown with the total time since `start`.
    pub fn finish(&mut self, start: Instant) {
        self.total_ms = elapsed_ms(start);
    }

    /// Time spent in `stage`; zero when it did not run.
    pub fn ms(&self, stage: PipelineStage) -> f64 {
        self.stages
            .iter()
            .filter(|t| t.stage == stage)
            .map(|t| t.elapsed_ms)
            .sum()
    }

    pub fn ran(&self, stage: PipelineStage) -> bool {
        self.stages.iter().any(|t| t.stage == stage)
    }
}

/// Milliseconds elapsed since `start`.
#[inline]
pub fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
