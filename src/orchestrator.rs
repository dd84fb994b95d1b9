use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tower::timeout::error::Elapsed;
use tower::ServiceExt;
use tracing::{error, info, warn, Instrument};

use crate::aggregation::{build_report, Aggregator, CycleReport};
use crate::common::{CaptureTrigger, CapturedUnit, DeviceId, DeviceMap};
use crate::config::{CaptureSettings, SimulationSettings};
use crate::device::{capture_service, Device, DeviceHandle, RetryPolicy};
use crate::error::{ConfigError, CycleError, PipelineError};
use crate::logging::{ComponentLogger, LoggerFactory};
use crate::metrics::MetricsSink;
use crate::pipeline::{PipelineResult, PipelineRunner};

/// Drives inspection cycles across a fixed set of devices.
///
/// A cycle captures from every device concurrently, runs the pipeline for
/// every captured unit concurrently, then aggregates what survived. Device
/// and pipeline failures shrink the result set; only a cycle with no
/// captures at all is fatal.
pub struct CycleOrchestrator {
    devices: Vec<DeviceHandle>,
    retry_policy: RetryPolicy,
    device_timeout: Duration,
    runner: PipelineRunner,
    aggregator: Aggregator,
    metrics: Arc<MetricsSink>,
    log: Arc<ComponentLogger>,
}

impl CycleOrchestrator {
    pub fn builder(loggers: LoggerFactory) -> OrchestratorBuilder {
        OrchestratorBuilder::new(loggers)
    }

    pub fn device_ids(&self) -> impl Iterator<Item = &DeviceId> + '_ {
        self.devices.iter().map(DeviceHandle::id)
    }

    pub fn metrics(&self) -> &Arc<MetricsSink> {
        &self.metrics
    }

    pub async fn execute_cycle(&self, cycle_id: u64) -> Result<CycleReport, CycleError> {
        let result = self
            .run_cycle(cycle_id)
            .instrument(self.log.span().clone())
            .await;

        if let Err(e) = &result {
            self.metrics.record_cycle_failure();
            error!(parent: self.log.span(), "Cycle {}: Failed - {}", cycle_id, e);
        }
        result
    }

    async fn run_cycle(&self, cycle_id: u64) -> Result<CycleReport, CycleError> {
        let started = Instant::now();
        info!("Cycle {}: Starting", cycle_id);

        let units = self.capture_all(CaptureTrigger::new(cycle_id)).await;
        if units.is_empty() {
            return Err(CycleError::NoCaptures);
        }
        info!(
            "Cycle {}: Captured {}/{} units",
            cycle_id,
            units.len(),
            self.devices.len()
        );

        let results = self.process_all(units).await;
        let outcome = self.aggregator.aggregate(&results)?;
        let report = build_report(cycle_id, &results, &outcome, started.elapsed());
        self.metrics.record_cycle(&report);

        info!(
            "Cycle {}: Complete - {} (Score: {:.2})",
            cycle_id, report.decision, report.overall_score
        );
        Ok(report)
    }

    /// Triggers every device at once. Devices that time out or exhaust their
    /// retries are left out of the returned map.
    pub async fn capture_all(&self, trigger: CaptureTrigger) -> DeviceMap<CapturedUnit> {
        let mut pending: FuturesUnordered<_> = self
            .devices
            .iter()
            .map(|device| {
                let id = device.id().clone();
                let service = capture_service(device.clone(), self.retry_policy, self.device_timeout);
                async move { (id, service.oneshot(trigger).await) }
            })
            .collect();

        let mut units = DeviceMap::with_capacity(self.devices.len());
        while let Some((id, outcome)) = pending.next().await {
            match outcome {
                Ok(Some(unit)) => {
                    units.insert(id, unit);
                }
                Ok(None) => {
                    warn!(
                        "{}: No unit after {} attempts",
                        id, self.retry_policy.max_attempts
                    );
                    self.metrics.record_device_failure(&id);
                }
                Err(e) if e.is::<Elapsed>() => {
                    warn!(
                        "{}: Capture timed out after {}ms",
                        id,
                        self.device_timeout.as_millis()
                    );
                    self.metrics.record_device_failure(&id);
                }
                Err(e) => {
                    warn!("{}: Capture failed - {}", id, e);
                    self.metrics.record_device_failure(&id);
                }
            }
        }

        units.sort_keys();
        units
    }

    /// Runs the pipeline once per unit, each on its own task. A failed unit
    /// is logged and dropped; it is not retried.
    pub async fn process_all(&self, units: DeviceMap<CapturedUnit>) -> DeviceMap<PipelineResult> {
        let mut pending: FuturesUnordered<_> = units
            .into_iter()
            .map(|(id, unit)| {
                let runner = self.runner.clone();
                let task = tokio::spawn(async move { runner.run(unit).await });
                async move { (id, task.await) }
            })
            .collect();

        let mut results = DeviceMap::with_capacity(pending.len());
        while let Some((id, joined)) = pending.next().await {
            let outcome = joined.unwrap_or_else(|e| {
                Err(PipelineError::Aborted {
                    device: id.clone(),
                    reason: e.to_string(),
                })
            });
            match outcome {
                Ok(result) => {
                    results.insert(id, result);
                }
                Err(e) => error!("Pipeline failed: {}", e),
            }
        }

        results.sort_keys();
        results
    }
}

impl std::fmt::Debug for CycleOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleOrchestrator")
            .field("devices", &self.devices)
            .field("retry_policy", &self.retry_policy)
            .field("device_timeout", &self.device_timeout)
            .field("runner", &self.runner)
            .finish()
    }
}

pub struct OrchestratorBuilder {
    devices: Vec<DeviceHandle>,
    retry_policy: RetryPolicy,
    device_timeout: Duration,
    runner: Option<PipelineRunner>,
    metrics: Option<Arc<MetricsSink>>,
    loggers: LoggerFactory,
}

impl OrchestratorBuilder {
    pub fn new(loggers: LoggerFactory) -> Self {
        let capture = CaptureSettings::default();
        Self {
            devices: Vec::new(),
            retry_policy: capture.retry_policy(),
            device_timeout: capture.device_timeout(),
            runner: None,
            metrics: None,
            loggers,
        }
    }

    pub fn device<D>(self, device: D) -> Self
    where
        D: Device + 'static,
    {
        self.device_handle(DeviceHandle::new(device))
    }

    pub fn device_handle(mut self, handle: DeviceHandle) -> Self {
        self.devices.push(handle);
        self
    }

    pub fn capture_settings(mut self, settings: &CaptureSettings) -> Self {
        self.retry_policy = settings.retry_policy();
        self.device_timeout = settings.device_timeout();
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn device_timeout(mut self, timeout: Duration) -> Self {
        self.device_timeout = timeout;
        self
    }

    pub fn runner(mut self, runner: PipelineRunner) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn metrics(mut self, metrics: Arc<MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<CycleOrchestrator, ConfigError> {
        if self.devices.is_empty() {
            return Err(ConfigError::Invalid(
                "At least one device is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.devices.iter().find(|d| !seen.insert(d.id().clone())) {
            return Err(ConfigError::Invalid(format!("Duplicate device id '{}'", dup.id())));
        }
        if self.device_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "Device timeout must be greater than zero".to_string(),
            ));
        }

        let runner = match self.runner {
            Some(runner) => runner,
            None => PipelineRunner::simulated(&SimulationSettings::default(), &self.loggers),
        };

        Ok(CycleOrchestrator {
            devices: self.devices,
            retry_policy: self.retry_policy,
            device_timeout: self.device_timeout,
            runner,
            aggregator: Aggregator::new(),
            metrics: self.metrics.unwrap_or_default(),
            log: self.loggers.logger("orchestrator"),
        })
    }
}
