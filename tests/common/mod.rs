#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use inspection_cycle::common::{
    BoundingBox, CaptureTrigger, CapturedUnit, DefectCategory, Detection, DeviceId, Resolution,
};
use inspection_cycle::config::RangeSettings;
use inspection_cycle::device::Device;
use inspection_cycle::error::{CaptureError, PipelineError};
use inspection_cycle::logging::LoggerFactory;
use inspection_cycle::pipeline::{
    Analyzer, PipelineRunner, PreparedUnit, Preparer, SimulatedPreparer,
};

/// Fails a fixed number of times, then captures on every later attempt.
pub struct ScriptedDevice {
    id: DeviceId,
    failures_left: u32,
    sequence: u64,
    attempts: Arc<AtomicU32>,
}

impl ScriptedDevice {
    pub fn reliable(id: &str) -> Self {
        Self::failing_first(id, 0)
    }

    pub fn failing_first(id: &str, failures: u32) -> Self {
        Self {
            id: DeviceId::new(id),
            failures_left: failures,
            sequence: 0,
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn attempts(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.attempts)
    }
}

#[async_trait]
impl Device for ScriptedDevice {
    fn id(&self) -> &DeviceId {
        &self.id
    }

    async fn acquire(&mut self, _trigger: CaptureTrigger) -> Result<CapturedUnit, CaptureError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(CaptureError::SensorTimeout(self.id.clone()));
        }
        self.sequence += 1;
        Ok(CapturedUnit::new(
            self.id.clone(),
            self.sequence,
            "<mock_image_data_640x480>",
            Resolution::new(640, 480),
            Utc::now(),
        ))
    }
}

/// Never answers within any reasonable timeout.
pub struct StalledDevice {
    id: DeviceId,
    delay: Duration,
}

impl StalledDevice {
    pub fn new(id: &str, delay: Duration) -> Self {
        Self {
            id: DeviceId::new(id),
            delay,
        }
    }
}

#[async_trait]
impl Device for StalledDevice {
    fn id(&self) -> &DeviceId {
        &self.id
    }

    async fn acquire(&mut self, _trigger: CaptureTrigger) -> Result<CapturedUnit, CaptureError> {
        tokio::time::sleep(self.delay).await;
        Ok(CapturedUnit::new(
            self.id.clone(),
            1,
            "<late>",
            Resolution::new(640, 480),
            Utc::now(),
        ))
    }
}

/// Returns the same confidences for a device on every call.
#[derive(Default)]
pub struct FixedAnalyzer {
    confidences: HashMap<DeviceId, Vec<f64>>,
}

impl FixedAnalyzer {
    pub fn with(mut self, device: &str, confidences: &[f64]) -> Self {
        self.confidences
            .insert(DeviceId::new(device), confidences.to_vec());
        self
    }
}

#[async_trait]
impl Analyzer for FixedAnalyzer {
    async fn analyze(&self, unit: &PreparedUnit) -> Result<Vec<Detection>, PipelineError> {
        let confidences = self.confidences.get(&unit.device).cloned().unwrap_or_default();
        Ok(confidences
            .into_iter()
            .enumerate()
            .map(|(i, confidence)| {
                Detection::new(
                    format!("det_{}_{}", unit.sequence, i),
                    BoundingBox::new(400, 300, 80, 60),
                    confidence,
                    DefectCategory::Scratch,
                )
            })
            .collect())
    }

    fn model_version(&self) -> &str {
        "fixed"
    }
}

/// Rejects every unit from one device and counts the rejections.
pub struct FailingPreparer {
    failing: DeviceId,
    inner: SimulatedPreparer,
    calls: Arc<AtomicU32>,
}

impl FailingPreparer {
    pub fn new(failing: &str) -> Self {
        Self {
            failing: DeviceId::new(failing),
            inner: SimulatedPreparer::new(RangeSettings::new(0.0, 0.0)),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Preparer for FailingPreparer {
    async fn prepare(&self, unit: CapturedUnit) -> Result<PreparedUnit, PipelineError> {
        if unit.device() == &self.failing {
            self.calls.fetch_add(1, Ordering::SeqCst);
            return Err(PipelineError::MalformedUnit {
                device: unit.device().clone(),
                sequence: unit.sequence(),
                reason: "corrupt payload".to_string(),
            });
        }
        self.inner.prepare(unit).await
    }

    fn name(&self) -> &'static str {
        "FailingPreparer"
    }
}

pub fn runner_with(
    loggers: &LoggerFactory,
    preparer: impl Preparer + 'static,
    analyzer: FixedAnalyzer,
) -> PipelineRunner {
    PipelineRunner::new(
        Arc::new(preparer),
        Arc::new(analyzer),
        loggers.logger("pipeline"),
    )
}

pub fn fixed_runner(loggers: &LoggerFactory, analyzer: FixedAnalyzer) -> PipelineRunner {
    runner_with(
        loggers,
        SimulatedPreparer::new(RangeSettings::new(0.0, 0.0)),
        analyzer,
    )
}
