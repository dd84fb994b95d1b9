use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::common::{DeviceId, DeviceMap, SeverityHistogram};
use crate::error::AggregationError;
use crate::pipeline::PipelineResult;

/// Minimum overall score for a cycle to pass.
pub const PASS_THRESHOLD: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Pass,
    Fail,
}

impl Decision {
    pub fn from_score(score: f64) -> Self {
        if score >= PASS_THRESHOLD {
            Decision::Pass
        } else {
            Decision::Fail
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Decision::Pass)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Pass => "PASS",
            Decision::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSummary {
    pub score: f64,
    pub defects: usize,
    pub severities: SeverityHistogram,
}

/// The cycle-level verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleOutcome {
    pub overall_score: f64,
    pub decision: Decision,
    pub device_summaries: DeviceMap<DeviceSummary>,
    pub severity_counts: SeverityHistogram,
    pub total_defects: usize,
    pub devices_used: usize,
}

/// Strictest device wins: the overall score is the minimum device score.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(
        &self,
        results: &DeviceMap<PipelineResult>,
    ) -> Result<CycleOutcome, AggregationError> {
        let overall_score = results
            .values()
            .map(|r| r.quality_score)
            .reduce(f64::min)
            .ok_or(AggregationError::Empty)?;

        let mut severity_counts = SeverityHistogram::default();
        let mut total_defects = 0;
        let device_summaries: DeviceMap<DeviceSummary> = results
            .iter()
            .map(|(id, result)| {
                let severities = result.histogram();
                severity_counts.merge(&severities);
                total_defects += result.defects();
                (
                    id.clone(),
                    DeviceSummary {
                        score: result.quality_score,
                        defects: result.defects(),
                        severities,
                    },
                )
            })
            .collect();

        let decision = Decision::from_score(overall_score);
        debug!(
            "Aggregated {} devices: {} (Score: {:.2})",
            results.len(),
            decision,
            overall_score
        );

        Ok(CycleOutcome {
            overall_score,
            decision,
            device_summaries,
            severity_counts,
            total_defects,
            devices_used: results.len(),
        })
    }
}

impl CycleOutcome {
    /// The device that set the overall score. Ties go to the first device.
    pub fn limiting_device(&self) -> Option<&DeviceId> {
        self.device_summaries
            .iter()
            .find(|(_, s)| s.score == self.overall_score)
            .map(|(id, _)| id)
    }
}
