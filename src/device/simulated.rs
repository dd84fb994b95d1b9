use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use super::Device;
use crate::common::{CaptureMetadata, CaptureTrigger, CapturedUnit, DeviceId, Resolution};
use crate::config::{DeviceSettings, RangeSettings, SimulationSettings};
use crate::error::CaptureError;

/// Timing and reliability of a simulated camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureProfile {
    pub latency_ms: RangeSettings,
    pub failure_rate: f64,
}

impl Default for CaptureProfile {
    fn default() -> Self {
        let simulation = SimulationSettings::default();
        Self {
            latency_ms: simulation.capture_latency_ms,
            failure_rate: simulation.capture_failure_rate,
        }
    }
}

impl From<&SimulationSettings> for CaptureProfile {
    fn from(settings: &SimulationSettings) -> Self {
        Self {
            latency_ms: settings.capture_latency_ms,
            failure_rate: settings.capture_failure_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraInfo {
    pub camera_id: DeviceId,
    pub resolution: Resolution,
    pub frames_captured: u64,
}

/// Mock camera with variable latency and occasional sensor failures.
pub struct SimulatedCamera {
    id: DeviceId,
    resolution: Resolution,
    frame_count: u64,
    profile: CaptureProfile,
}

impl SimulatedCamera {
    pub fn new(id: impl Into<DeviceId>, resolution: Resolution) -> Self {
        Self {
            id: id.into(),
            resolution,
            frame_count: 0,
            profile: CaptureProfile::default(),
        }
    }

    pub fn from_settings(device: &DeviceSettings, simulation: &SimulationSettings) -> Self {
        Self::new(device.device_id(), device.resolution()).with_profile(simulation.into())
    }

    pub fn with_profile(mut self, profile: CaptureProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn info(&self) -> CameraInfo {
        CameraInfo {
            camera_id: self.id.clone(),
            resolution: self.resolution,
            frames_captured: self.frame_count,
        }
    }

    fn mock_metadata<R: Rng + ?Sized>(rng: &mut R) -> CaptureMetadata {
        CaptureMetadata {
            exposure_ms: rng.random_range(8.0..=12.0),
            gain: rng.random_range(1.0..=2.0),
            temperature_c: rng.random_range(35.0..=45.0),
        }
    }
}

#[async_trait]
impl Device for SimulatedCamera {
    fn id(&self) -> &DeviceId {
        &self.id
    }

    async fn acquire(&mut self, trigger: CaptureTrigger) -> Result<CapturedUnit, CaptureError> {
        // Draw everything up front; the thread rng must not live across the sleep.
        let (latency, failed, metadata) = {
            let mut rng = rand::rng();
            (
                self.profile.latency_ms.sample_millis(&mut rng),
                rng.random_bool(self.profile.failure_rate),
                Self::mock_metadata(&mut rng),
            )
        };

        tokio::time::sleep(latency).await;

        if failed {
            return Err(CaptureError::SensorTimeout(self.id.clone()));
        }

        self.frame_count += 1;
        debug!(
            "{}: Captured frame #{} for cycle {} ({}ms)",
            self.id,
            self.frame_count,
            trigger.cycle_id,
            latency.as_millis()
        );

        Ok(CapturedUnit::new(
            self.id.clone(),
            self.frame_count,
            format!("<mock_image_data_{}>", self.resolution),
            self.resolution,
            Utc::now(),
        )
        .with_metadata(metadata))
    }
}
