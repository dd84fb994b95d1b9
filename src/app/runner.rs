use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::console;
use crate::aggregation::render_text;
use crate::config::RunSettings;
use crate::logging::{ComponentLogger, LoggerFactory};
use crate::metrics::MetricsSummary;
use crate::orchestrator::CycleOrchestrator;

#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub cycles: u32,
    pub inter_cycle_delay: Duration,
    pub print_json: bool,
    pub print_report: bool,
}

impl From<&RunSettings> for RunOptions {
    fn from(settings: &RunSettings) -> Self {
        Self {
            cycles: settings.cycles,
            inter_cycle_delay: Duration::from_millis(settings.inter_cycle_delay_ms),
            print_json: false,
            print_report: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Cycles that ran to completion, successfully or not.
    pub cycles_run: u32,
    pub interrupted: bool,
    pub metrics: MetricsSummary,
}

/// Runs a fixed number of cycles and prints one line per cycle.
pub struct InspectionRunner {
    orchestrator: CycleOrchestrator,
    options: RunOptions,
    log: Arc<ComponentLogger>,
}

impl InspectionRunner {
    pub fn new(orchestrator: CycleOrchestrator, options: RunOptions, loggers: &LoggerFactory) -> Self {
        Self {
            orchestrator,
            options,
            log: loggers.logger("app"),
        }
    }

    pub fn orchestrator(&self) -> &CycleOrchestrator {
        &self.orchestrator
    }

    /// Runs until all cycles finish or Ctrl-C arrives.
    pub async fn run(&self) -> RunSummary {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Runs until all cycles finish or `shutdown` resolves. Shutdown drops the
    /// in-flight cycle.
    pub async fn run_until<F>(&self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        let total = self.options.cycles;
        info!(parent: self.log.span(), "Starting inspection - {} cycles", total);
        println!("{}", console::start_banner(total));

        let mut cycles_run = 0;
        let interrupted = tokio::select! {
            _ = shutdown => true,
            _ = self.run_cycles(&mut cycles_run) => false,
        };

        if interrupted {
            info!(parent: self.log.span(), "Shutting down inspection system...");
        }
        let metrics = self.orchestrator.metrics().summary();
        println!("{}", console::summary_block(&metrics));
        info!(
            parent: self.log.span(),
            "Inspection completed - {} successful cycles",
            metrics.successful_cycles
        );

        RunSummary {
            cycles_run,
            interrupted,
            metrics,
        }
    }

    async fn run_cycles(&self, cycles_run: &mut u32) {
        let total = self.options.cycles;
        for cycle in 1..=total {
            println!("[Cycle {cycle:02}/{total:02}] Starting inspection...");

            match self.orchestrator.execute_cycle(u64::from(cycle)).await {
                Ok(report) => {
                    println!("{}", console::cycle_line(cycle, total, &report));
                    if self.options.print_report {
                        println!("{}", render_text(&report));
                    }
                    if self.options.print_json {
                        match serde_json::to_string_pretty(&report) {
                            Ok(json) => println!("{json}"),
                            Err(e) => error!(parent: self.log.span(), "Failed to serialize report: {}", e),
                        }
                    }
                }
                Err(e) => {
                    error!(parent: self.log.span(), "Cycle {} failed: {}", cycle, e);
                    println!("{}", console::error_line(cycle, total, &e.to_string()));
                }
            }
            *cycles_run += 1;

            // Part movement between cycles.
            if cycle < total {
                tokio::time::sleep(self.options.inter_cycle_delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Resolution;
    use crate::config::{RangeSettings, SimulationSettings};
    use crate::device::{CaptureProfile, SimulatedCamera};
    use crate::pipeline::PipelineRunner;

    fn runner(cycles: u32, failure_rate: f64, delay: Duration) -> InspectionRunner {
        let loggers = LoggerFactory::new();
        let profile = CaptureProfile {
            latency_ms: RangeSettings::new(10.0, 10.0),
            failure_rate,
        };
        let orchestrator = CycleOrchestrator::builder(loggers.clone())
            .device(SimulatedCamera::new("CAM_01", Resolution::default()).with_profile(profile))
            .device(SimulatedCamera::new("CAM_02", Resolution::default()).with_profile(profile))
            .runner(PipelineRunner::simulated(&SimulationSettings::instant(), &loggers))
            .build()
            .unwrap();
        let options = RunOptions {
            cycles,
            inter_cycle_delay: delay,
            print_json: true,
            print_report: true,
        };
        InspectionRunner::new(orchestrator, options, &loggers)
    }

    #[tokio::test(start_paused = true)]
    async fn runs_every_cycle() {
        let summary = runner(3, 0.0, Duration::from_millis(500))
            .run_until(std::future::pending())
            .await;
        assert_eq!(summary.cycles_run, 3);
        assert!(!summary.interrupted);
        assert_eq!(summary.metrics.total_cycles, 3);
        assert_eq!(summary.metrics.pass_count + summary.metrics.fail_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_errors_do_not_stop_the_run() {
        let summary = runner(2, 1.0, Duration::from_millis(10))
            .run_until(std::future::pending())
            .await;
        assert_eq!(summary.cycles_run, 2);
        assert_eq!(summary.metrics.failed_cycles, 2);
        assert_eq!(summary.metrics.total_cycles, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_immediately() {
        let summary = runner(10, 0.0, Duration::from_secs(60))
            .run_until(tokio::time::sleep(Duration::from_secs(1)))
            .await;
        assert!(summary.interrupted);
        assert_eq!(summary.cycles_run, 1);
        assert_eq!(summary.metrics.total_cycles, 1);
    }
}
