use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identity of one capture source. Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Per-device mapping produced by each fan-out stage.
pub type DeviceMap<T> = IndexMap<DeviceId, T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CaptureMetadata {
    pub exposure_ms: f64,
    pub gain: f64,
    pub temperature_c: f64,
}

/// Request sent to every device at the start of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTrigger {
    pub cycle_id: u64,
}

impl CaptureTrigger {
    pub fn new(cycle_id: u64) -> Self {
        Self { cycle_id }
    }
}

/// One unit of work acquired from a device.
#[derive(Debug, Clone)]
pub struct CapturedUnit {
    device: DeviceId,
    sequence: u64,
    payload: Arc<str>,
    resolution: Resolution,
    metadata: CaptureMetadata,
    captured_at: DateTime<Utc>,
}

impl CapturedUnit {
    pub fn new(
        device: DeviceId,
        sequence: u64,
        payload: impl Into<Arc<str>>,
        resolution: Resolution,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            device,
            sequence,
            payload: payload.into(),
            resolution,
            metadata: CaptureMetadata::default(),
            captured_at,
        }
    }

    pub fn with_metadata(mut self, metadata: CaptureMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn metadata(&self) -> &CaptureMetadata {
        &self.metadata
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloning_unit_shares_payload() {
        let u1 = CapturedUnit::new(
            DeviceId::new("CAM_01"),
            1,
            "<mock_image_data_16x16>",
            Resolution::new(16, 16),
            Utc::now(),
        );
        let u2 = u1.clone();
        assert!(Arc::ptr_eq(&u1.payload, &u2.payload));
        assert_eq!(u2.device().as_str(), "CAM_01");
    }

    #[test]
    fn device_ids_order_lexically() {
        let mut ids = vec![DeviceId::new("CAM_02"), DeviceId::new("CAM_01")];
        ids.sort();
        assert_eq!(ids[0].to_string(), "CAM_01");
    }

    #[test]
    fn device_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&DeviceId::new("CAM_07")).unwrap();
        assert_eq!(json, "\"CAM_07\"");
    }
}
