use thiserror::Error;

use crate::common::DeviceId;
use crate::pipeline::PipelineStage;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),
    #[error("Cycle Error: {0}")]
    Cycle(#[from] CycleError),
    #[error("Failed to install logging: {0}")]
    Logging(String),
}

// Device capture error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("{0}: Capture failed - sensor timeout")]
    SensorTimeout(DeviceId),
    #[error("{device}: Acquire task aborted: {reason}")]
    Aborted { device: DeviceId, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("{device}: Malformed unit #{sequence}: {reason}")]
    MalformedUnit {
        device: DeviceId,
        sequence: u64,
        reason: String,
    },
    #[error("{device}: {stage} stage failed: {reason}")]
    StageFailed {
        device: DeviceId,
        stage: PipelineStage,
        reason: String,
    },
    #[error("{device}: Pipeline task aborted: {reason}")]
    Aborted { device: DeviceId, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("No device results to aggregate")]
    Empty,
}

// Fatal, per-cycle errors. The run loop reports them and moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CycleError {
    #[error("No units captured from any device")]
    NoCaptures,
    #[error("Aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
