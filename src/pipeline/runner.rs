use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::analyze::{Analyzer, SimulatedAnalyzer};
use super::prepare::{Preparer, SimulatedPreparer};
use super::scoring;
use super::stage::{PipelineStage, StageTimings};
use crate::common::{CapturedUnit, DeviceId, Detection, SeverityHistogram};
use crate::config::SimulationSettings;
use crate::error::PipelineError;
use crate::logging::{ComponentLogger, LoggerFactory};

/// Outcome of running one unit through prepare, analyze and score.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub device: DeviceId,
    pub sequence: u64,
    /// Detections that survived filtering, each with a severity.
    pub detections: Vec<Detection>,
    /// Detection count before confidence filtering.
    pub raw_detections: usize,
    pub quality_score: f64,
    pub timings: StageTimings,
    pub model_version: String,
}

impl PipelineResult {
    pub fn defects(&self) -> usize {
        self.detections.len()
    }

    pub fn processing_time(&self) -> Duration {
        self.timings.total()
    }

    pub fn histogram(&self) -> SeverityHistogram {
        self.detections.iter().collect()
    }
}

/// Stateless per-unit transform. Cheap to clone; clones share stages.
#[derive(Clone)]
pub struct PipelineRunner {
    preparer: Arc<dyn Preparer>,
    analyzer: Arc<dyn Analyzer>,
    log: Arc<ComponentLogger>,
}

impl PipelineRunner {
    pub fn new(
        preparer: Arc<dyn Preparer>,
        analyzer: Arc<dyn Analyzer>,
        log: Arc<ComponentLogger>,
    ) -> Self {
        Self {
            preparer,
            analyzer,
            log,
        }
    }

    pub fn simulated(settings: &SimulationSettings, loggers: &LoggerFactory) -> Self {
        Self::new(
            Arc::new(SimulatedPreparer::new(settings.prepare_latency_ms)),
            Arc::new(SimulatedAnalyzer::from_settings(settings)),
            loggers.logger("pipeline"),
        )
    }

    pub async fn run(&self, unit: CapturedUnit) -> Result<PipelineResult, PipelineError> {
        let device = unit.device().clone();
        let sequence = unit.sequence();
        let mut timings = StageTimings::new();

        let started = Instant::now();
        let prepared = self.preparer.prepare(unit).await?;
        timings.record(PipelineStage::Prepare, started.elapsed());

        let started = Instant::now();
        let raw = self.analyzer.analyze(&prepared).await?;
        timings.record(PipelineStage::Analyze, started.elapsed());
        if let Some(bad) = raw.iter().find(|d| !(0.0..=1.0).contains(&d.confidence)) {
            return Err(PipelineError::StageFailed {
                device,
                stage: PipelineStage::Analyze,
                reason: format!("detection {} has confidence {} outside [0, 1]", bad.id, bad.confidence),
            });
        }
        let raw_detections = raw.len();

        let started = Instant::now();
        let scored = scoring::score(raw);
        timings.record(PipelineStage::Score, started.elapsed());

        debug!(
            parent: self.log.span(),
            "{}: unit #{} scored {:.2} ({} of {} detections kept, {}ms)",
            device,
            sequence,
            scored.quality_score,
            scored.surviving.len(),
            raw_detections,
            timings.total().as_millis()
        );

        Ok(PipelineResult {
            device,
            sequence,
            detections: scored.surviving,
            raw_detections,
            quality_score: scored.quality_score,
            timings,
            model_version: self.analyzer.model_version().to_string(),
        })
    }
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("preparer", &self.preparer.name())
            .field("analyzer", &self.analyzer.model_version())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{BoundingBox, DefectCategory, Resolution, Severity};
    use crate::config::RangeSettings;
    use crate::pipeline::prepare::PreparedUnit;
    use async_trait::async_trait;
    use chrono::Utc;

    struct FixedAnalyzer(Vec<f64>);

    #[async_trait]
    impl Analyzer for FixedAnalyzer {
        async fn analyze(&self, _unit: &PreparedUnit) -> Result<Vec<Detection>, PipelineError> {
            tokio::time::sleep(Duration::from_millis(150)).await;
            Ok(self
                .0
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    Detection::new(
                        format!("det_0_{i}"),
                        BoundingBox::new(200, 200, 60, 60),
                        *c,
                        DefectCategory::Crack,
                    )
                })
                .collect())
        }

        fn model_version(&self) -> &str {
            "fixed"
        }
    }

    fn runner(confidences: Vec<f64>) -> PipelineRunner {
        PipelineRunner::new(
            Arc::new(SimulatedPreparer::new(RangeSettings::new(20.0, 20.0))),
            Arc::new(FixedAnalyzer(confidences)),
            LoggerFactory::new().logger("pipeline"),
        )
    }

    fn unit(payload: &str) -> CapturedUnit {
        CapturedUnit::new(
            DeviceId::new("CAM_01"),
            9,
            payload,
            Resolution::new(32, 32),
            Utc::now(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn runs_stages_in_order_and_scores() {
        let result = runner(vec![0.95, 0.72, 0.4])
            .run(unit("<mock_image_data_32x32>"))
            .await
            .unwrap();

        assert_eq!(result.device.as_str(), "CAM_01");
        assert_eq!(result.sequence, 9);
        assert_eq!(result.raw_detections, 3);
        assert_eq!(result.defects(), 2);
        assert!((result.quality_score - 0.3).abs() < 1e-9);
        assert_eq!(result.histogram().critical, 1);
        assert_eq!(result.histogram().minor, 1);
        assert!(result
            .detections
            .iter()
            .all(|d| d.severity.is_some() && d.confidence >= scoring::CONFIDENCE_THRESHOLD));
        assert_eq!(result.detections[0].severity, Some(Severity::Critical));
        assert_eq!(result.model_version, "fixed");

        let stages: Vec<_> = result.timings.stages().map(|(s, _)| s).collect();
        assert_eq!(stages, PipelineStage::ORDER.to_vec());
        assert!(result.timings.get(PipelineStage::Prepare) >= Duration::from_millis(20));
        assert!(result.timings.get(PipelineStage::Analyze) >= Duration::from_millis(150));
        assert!(result.timings.get(PipelineStage::Analyze) < Duration::from_millis(160));
        assert!(result.processing_time() >= Duration::from_millis(170));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_unit_propagates() {
        let err = runner(vec![]).run(unit("")).await.unwrap_err();
        assert!(matches!(err, PipelineError::MalformedUnit { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_confidence_fails_analyze_stage() {
        let err = runner(vec![0.8, f64::NAN])
            .run(unit("<mock_image_data_32x32>"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StageFailed {
                stage: PipelineStage::Analyze,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn simulated_runner_produces_bounded_score() {
        let mut simulation = SimulationSettings::instant();
        simulation.confidence = RangeSettings::new(0.5, 0.99);
        let runner = PipelineRunner::simulated(&simulation, &LoggerFactory::new());
        for _ in 0..20 {
            let result = runner.run(unit("<mock_image_data_32x32>")).await.unwrap();
            assert!((0.0..=1.0).contains(&result.quality_score));
            assert!(result.raw_detections <= 4);
            assert_eq!(result.model_version, "defect_detector_v2.1");
        }
    }
}
