use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// The three ordered stages every captured unit passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Prepare,
    Analyze,
    Score,
}

impl PipelineStage {
    pub const ORDER: [PipelineStage; 3] = [
        PipelineStage::Prepare,
        PipelineStage::Analyze,
        PipelineStage::Score,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::Prepare => "prepare",
            PipelineStage::Analyze => "analyze",
            PipelineStage::Score => "score",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Elapsed time per stage for one unit, in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageTimings {
    stage_durations: IndexMap<PipelineStage, Duration>,
}

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stage's duration, accumulating if it ran before.
    pub fn record(&mut self, stage: PipelineStage, duration: Duration) {
        *self.stage_durations.entry(stage).or_insert(Duration::ZERO) += duration;
    }

    pub fn get(&self, stage: PipelineStage) -> Duration {
        self.stage_durations
            .get(&stage)
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    pub fn total(&self) -> Duration {
        self.stage_durations.values().sum()
    }

    pub fn stages(&self) -> impl Iterator<Item = (PipelineStage, Duration)> + '_ {
        self.stage_durations.iter().map(|(stage, d)| (*stage, *d))
    }

    pub fn as_millis(&self) -> IndexMap<PipelineStage, f64> {
        self.stages()
            .map(|(stage, d)| (stage, d.as_secs_f64() * 1000.0))
            .collect()
    }
}
