use config::{Config, Environment, File};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::common::{DeviceId, Resolution};
use crate::device::RetryPolicy;
use crate::error::ConfigError;

pub const ENV_PREFIX: &str = "INSPECT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub devices: Vec<DeviceSettings>,
    pub capture: CaptureSettings,
    pub simulation: SimulationSettings,
    pub run: RunSettings,
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            devices: vec![
                DeviceSettings::new("CAM_01", Resolution::default()),
                DeviceSettings::new("CAM_02", Resolution::default()),
            ],
            capture: CaptureSettings::default(),
            simulation: SimulationSettings::default(),
            run: RunSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    pub id: String,
    pub width: u32,
    pub height: u32,
}

impl DeviceSettings {
    pub fn new(id: impl Into<String>, resolution: Resolution) -> Self {
        Self {
            id: id.into(),
            width: resolution.width,
            height: resolution.height,
        }
    }

    pub fn device_id(&self) -> DeviceId {
        DeviceId::new(self.id.clone())
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub device_timeout_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff_ms: 50,
            device_timeout_ms: 5_000,
        }
    }
}

impl CaptureSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.retry_backoff_ms))
    }

    pub fn device_timeout(&self) -> Duration {
        Duration::from_millis(self.device_timeout_ms)
    }
}

/// Latency and failure shape of the simulated devices and stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub capture_latency_ms: RangeSettings,
    pub capture_failure_rate: f64,
    pub prepare_latency_ms: RangeSettings,
    pub inference_latency_ms: RangeSettings,
    pub confidence: RangeSettings,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            capture_latency_ms: RangeSettings::new(50.0, 150.0),
            capture_failure_rate: 0.05,
            prepare_latency_ms: RangeSettings::new(20.0, 40.0),
            inference_latency_ms: RangeSettings::new(100.0, 200.0),
            confidence: RangeSettings::new(0.5, 0.99),
        }
    }
}

impl SimulationSettings {
    /// No latency and no injected failures. Used by tests and dry runs.
    pub fn instant() -> Self {
        Self {
            capture_latency_ms: RangeSettings::new(0.0, 0.0),
            capture_failure_rate: 0.0,
            prepare_latency_ms: RangeSettings::new(0.0, 0.0),
            inference_latency_ms: RangeSettings::new(0.0, 0.0),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeSettings {
    pub min: f64,
    pub max: f64,
}

impl RangeSettings {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn is_ordered(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.min >= self.max {
            self.min
        } else {
            rng.random_range(self.min..=self.max)
        }
    }

    /// Samples the range as a number of milliseconds.
    pub fn sample_millis<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs_f64(self.sample(rng).max(0.0) / 1000.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub cycles: u32,
    pub inter_cycle_delay_ms: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            cycles: 10,
            inter_cycle_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    pub fn level(&self) -> Result<tracing::Level, ConfigError> {
        self.level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("Unknown log level '{}'", self.level)))
    }
}

impl Settings {
    /// Layers defaults, an optional config file and `INSPECT_*` environment
    /// variables (`__` separates nested keys), in that order.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.devices.is_empty() {
            return Err(ConfigError::Invalid(
                "At least one device must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for device in &self.devices {
            if device.id.trim().is_empty() {
                return Err(ConfigError::Invalid("Device id must not be empty".to_string()));
            }
            if !seen.insert(device.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "Duplicate device id '{}'",
                    device.id
                )));
            }
        }

        if self.capture.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "Max capture attempts must be greater than 0".to_string(),
            ));
        }

        if self.capture.device_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Device timeout must be greater than 0".to_string(),
            ));
        }

        let sim = &self.simulation;
        for (name, range) in [
            ("capture_latency_ms", sim.capture_latency_ms),
            ("prepare_latency_ms", sim.prepare_latency_ms),
            ("inference_latency_ms", sim.inference_latency_ms),
            ("confidence", sim.confidence),
        ] {
            if !range.is_ordered() || range.min < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "Range '{}' must satisfy 0 <= min <= max",
                    name
                )));
            }
        }

        if sim.confidence.max > 1.0 {
            return Err(ConfigError::Invalid(
                "Confidence range must lie within [0, 1]".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&sim.capture_failure_rate) {
            return Err(ConfigError::Invalid(
                "Capture failure rate must be between 0.0 and 1.0".to_string(),
            ));
        }

        self.logging.level()?;

        Ok(())
    }
}
