use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::common::{CapturedUnit, DeviceId};
use crate::config::RangeSettings;
use crate::error::PipelineError;

pub const PREPARE_OPERATIONS: [&str; 3] = ["normalization", "noise_reduction", "contrast_enhancement"];

/// Output of the prepare stage. The captured unit is consumed here.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedUnit {
    pub device: DeviceId,
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub prepared_data: String,
    pub operations: Vec<&'static str>,
}

#[async_trait]
pub trait Preparer: Send + Sync {
    async fn prepare(&self, unit: CapturedUnit) -> Result<PreparedUnit, PipelineError>;

    fn name(&self) -> &'static str;
}

/// Placeholder normalization with simulated processing time.
pub struct SimulatedPreparer {
    latency_ms: RangeSettings,
}

impl SimulatedPreparer {
    pub fn new(latency_ms: RangeSettings) -> Self {
        Self { latency_ms }
    }

    fn validate(unit: &CapturedUnit) -> Result<(), PipelineError> {
        let malformed = |reason: &str| PipelineError::MalformedUnit {
            device: unit.device().clone(),
            sequence: unit.sequence(),
            reason: reason.to_string(),
        };

        if unit.payload().trim().is_empty() {
            return Err(malformed("empty payload"));
        }
        let resolution = unit.resolution();
        if resolution.width == 0 || resolution.height == 0 {
            return Err(malformed("zero-sized resolution"));
        }
        Ok(())
    }
}

impl Default for SimulatedPreparer {
    fn default() -> Self {
        Self::new(RangeSettings::new(20.0, 40.0))
    }
}

#[async_trait]
impl Preparer for SimulatedPreparer {
    async fn prepare(&self, unit: CapturedUnit) -> Result<PreparedUnit, PipelineError> {
        Self::validate(&unit)?;

        let latency = self.latency_ms.sample_millis(&mut rand::rng());
        tokio::time::sleep(latency).await;

        Ok(PreparedUnit {
            device: unit.device().clone(),
            sequence: unit.sequence(),
            captured_at: unit.captured_at(),
            prepared_data: format!("<normalized_enhanced_{}>", unit.resolution()),
            operations: PREPARE_OPERATIONS.to_vec(),
        })
    }

    fn name(&self) -> &'static str {
        "SimulatedPreparer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Resolution;

    fn unit(payload: &str, resolution: Resolution) -> CapturedUnit {
        CapturedUnit::new(DeviceId::new("CAM_01"), 4, payload, resolution, Utc::now())
    }

    fn instant() -> SimulatedPreparer {
        SimulatedPreparer::new(RangeSettings::new(0.0, 0.0))
    }

    #[tokio::test]
    async fn prepares_well_formed_unit() {
        let prepared = instant()
            .prepare(unit("<mock_image_data_64x48>", Resolution::new(64, 48)))
            .await
            .unwrap();
        assert_eq!(prepared.device.as_str(), "CAM_01");
        assert_eq!(prepared.sequence, 4);
        assert_eq!(prepared.prepared_data, "<normalized_enhanced_64x48>");
        assert_eq!(prepared.operations, PREPARE_OPERATIONS.to_vec());
    }

    #[tokio::test]
    async fn empty_payload_is_malformed() {
        let err = instant()
            .prepare(unit("  ", Resolution::new(64, 48)))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedUnit { sequence: 4, .. }));
    }

    #[tokio::test]
    async fn zero_resolution_is_malformed() {
        let err = instant()
            .prepare(unit("<mock>", Resolution::new(0, 48)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("zero-sized resolution"));
    }
}
