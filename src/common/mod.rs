pub mod detection;
pub mod unit;

pub use detection::{BoundingBox, DefectCategory, Detection, Severity, SeverityHistogram};
pub use unit::{CaptureMetadata, CaptureTrigger, CapturedUnit, DeviceId, DeviceMap, Resolution};
