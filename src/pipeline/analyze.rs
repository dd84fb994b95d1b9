use async_trait::async_trait;
use rand::distr::{weighted::WeightedIndex, Distribution};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::prepare::PreparedUnit;
use crate::common::{BoundingBox, DefectCategory, Detection};
use crate::config::{RangeSettings, SimulationSettings};
use crate::error::PipelineError;

/// Relative likelihood of producing 0, 1, 2, 3 or 4 detections.
pub const DETECTION_COUNT_WEIGHTS: [u32; 5] = [30, 35, 20, 10, 5];

pub const MODEL_VERSION: &str = "defect_detector_v2.1";

#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, unit: &PreparedUnit) -> Result<Vec<Detection>, PipelineError>;

    fn model_version(&self) -> &str {
        MODEL_VERSION
    }
}

/// Mock defect detector.
pub struct SimulatedAnalyzer {
    latency_ms: RangeSettings,
    confidence: RangeSettings,
    inference_count: AtomicU64,
}

impl SimulatedAnalyzer {
    pub fn new(latency_ms: RangeSettings, confidence: RangeSettings) -> Self {
        Self {
            latency_ms,
            confidence,
            inference_count: AtomicU64::new(0),
        }
    }

    pub fn from_settings(settings: &SimulationSettings) -> Self {
        Self::new(settings.inference_latency_ms, settings.confidence)
    }

    pub fn inference_count(&self) -> u64 {
        self.inference_count.load(Ordering::Relaxed)
    }

    /// Draws a detection count; fewer detections are more likely.
    pub fn sample_detection_count<R: Rng + ?Sized>(rng: &mut R) -> usize {
        match WeightedIndex::new(DETECTION_COUNT_WEIGHTS) {
            Ok(dist) => dist.sample(rng),
            Err(_) => 0,
        }
    }

    fn generate_detections<R: Rng + ?Sized>(&self, inference: u64, rng: &mut R) -> Vec<Detection> {
        let count = Self::sample_detection_count(rng);
        (0..count)
            .map(|i| {
                let region = BoundingBox::new(
                    rng.random_range(100..=1700),
                    rng.random_range(100..=900),
                    rng.random_range(50..=200),
                    rng.random_range(50..=200),
                );
                let category = DefectCategory::ALL[rng.random_range(0..DefectCategory::ALL.len())];
                Detection::new(
                    format!("det_{}_{}", inference, i),
                    region,
                    self.confidence.sample(rng),
                    category,
                )
            })
            .collect()
    }
}

impl Default for SimulatedAnalyzer {
    fn default() -> Self {
        Self::from_settings(&SimulationSettings::default())
    }
}

#[async_trait]
impl Analyzer for SimulatedAnalyzer {
    async fn analyze(&self, unit: &PreparedUnit) -> Result<Vec<Detection>, PipelineError> {
        let inference = self.inference_count.fetch_add(1, Ordering::Relaxed);
        let (latency, detections) = {
            let mut rng = rand::rng();
            (
                self.latency_ms.sample_millis(&mut rng),
                self.generate_detections(inference, &mut rng),
            )
        };

        tokio::time::sleep(latency).await;

        debug!(
            "Inference complete for {}: {} detections ({}ms)",
            unit.device,
            detections.len(),
            latency.as_millis()
        );
        Ok(detections)
    }
}
