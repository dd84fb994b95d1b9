use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::aggregation::{CycleReport, Decision};
use crate::common::DeviceId;

#[derive(Debug, Default)]
struct MetricsState {
    cycle_times_ms: Vec<f64>,
    decisions: Vec<Decision>,
    defect_counts: Vec<usize>,
    quality_scores: Vec<f64>,
    device_failures: BTreeMap<DeviceId, u64>,
    cycle_failures: u64,
}

/// Snapshot of the accumulated counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub total_cycles: usize,
    pub successful_cycles: usize,
    pub failed_cycles: u64,
    pub pass_count: usize,
    pub fail_count: usize,
    /// Percentage of successful cycles that passed.
    pub pass_rate: f64,
    pub avg_cycle_time_ms: f64,
    pub min_cycle_time_ms: f64,
    pub max_cycle_time_ms: f64,
    pub avg_quality_score: f64,
    pub total_defects: usize,
    pub avg_defects_per_cycle: f64,
    pub device_failures: BTreeMap<DeviceId, u64>,
}

/// Process-wide cycle and device counters. Every operation takes the lock
/// once; nothing holds it across a cycle.
#[derive(Debug, Default)]
pub struct MetricsSink {
    state: Mutex<MetricsState>,
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MetricsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_cycle(&self, report: &CycleReport) {
        let mut state = self.lock();
        state.cycle_times_ms.push(report.total_time_ms);
        state.decisions.push(report.decision);
        state.defect_counts.push(report.defects_found);
        state.quality_scores.push(report.overall_score);
    }

    pub fn record_device_failure(&self, device: &DeviceId) {
        *self.lock().device_failures.entry(device.clone()).or_insert(0) += 1;
    }

    pub fn record_cycle_failure(&self) {
        self.lock().cycle_failures += 1;
    }

    pub fn summary(&self) -> MetricsSummary {
        let state = self.lock();
        let total = state.decisions.len();
        let mut summary = MetricsSummary {
            failed_cycles: state.cycle_failures,
            device_failures: state.device_failures.clone(),
            ..MetricsSummary::default()
        };
        if total == 0 {
            return summary;
        }

        let pass_count = state.decisions.iter().filter(|d| d.is_pass()).count();
        let total_defects: usize = state.defect_counts.iter().sum();
        let cycles = total as f64;

        summary.total_cycles = total;
        summary.successful_cycles = total;
        summary.pass_count = pass_count;
        summary.fail_count = total - pass_count;
        summary.pass_rate = pass_count as f64 / cycles * 100.0;
        summary.avg_cycle_time_ms = state.cycle_times_ms.iter().sum::<f64>() / cycles;
        summary.min_cycle_time_ms = state.cycle_times_ms.iter().copied().fold(f64::INFINITY, f64::min);
        summary.max_cycle_time_ms = state.cycle_times_ms.iter().copied().fold(0.0, f64::max);
        summary.avg_quality_score = state.quality_scores.iter().sum::<f64>() / cycles;
        summary.total_defects = total_defects;
        summary.avg_defects_per_cycle = total_defects as f64 / cycles;
        summary
    }

    pub fn reset(&self) {
        *self.lock() = MetricsState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{DeviceMap, SeverityHistogram};
    use chrono::Utc;
    use uuid::Uuid;

    fn report(decision: Decision, score: f64, defects: usize, time_ms: f64) -> CycleReport {
        CycleReport {
            report_id: Uuid::new_v4(),
            cycle_id: 1,
            timestamp: Utc::now(),
            devices: DeviceMap::new(),
            overall_score: score,
            decision,
            defects_found: defects,
            severity_breakdown: SeverityHistogram::default(),
            total_time_ms: time_ms,
            devices_used: 2,
        }
    }

    #[test]
    fn empty_sink_summarizes_to_zero() {
        assert_eq!(MetricsSink::new().summary(), MetricsSummary::default());
    }

    #[test]
    fn summary_computes_rates_and_extremes() {
        let sink = MetricsSink::new();
        sink.record_cycle(&report(Decision::Pass, 1.0, 0, 300.0));
        sink.record_cycle(&report(Decision::Fail, 0.4, 3, 500.0));
        sink.record_cycle(&report(Decision::Pass, 0.9, 1, 400.0));
        sink.record_cycle_failure();
        sink.record_device_failure(&DeviceId::new("CAM_02"));
        sink.record_device_failure(&DeviceId::new("CAM_02"));

        let summary = sink.summary();
        assert_eq!(summary.total_cycles, 3);
        assert_eq!(summary.failed_cycles, 1);
        assert_eq!(summary.pass_count, 2);
        assert_eq!(summary.fail_count, 1);
        assert!((summary.pass_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.avg_cycle_time_ms, 400.0);
        assert_eq!(summary.min_cycle_time_ms, 300.0);
        assert_eq!(summary.max_cycle_time_ms, 500.0);
        assert!((summary.avg_quality_score - 0.766_666_666).abs() < 1e-6);
        assert_eq!(summary.total_defects, 4);
        assert_eq!(summary.device_failures[&DeviceId::new("CAM_02")], 2);
    }

    #[test]
    fn failures_are_visible_without_successful_cycles() {
        let sink = MetricsSink::new();
        sink.record_cycle_failure();
        let summary = sink.summary();
        assert_eq!(summary.total_cycles, 0);
        assert_eq!(summary.failed_cycles, 1);
        assert_eq!(summary.pass_rate, 0.0);
    }

    #[test]
    fn reset_clears_everything() {
        let sink = MetricsSink::new();
        sink.record_cycle(&report(Decision::Pass, 1.0, 0, 300.0));
        sink.record_device_failure(&DeviceId::new("CAM_01"));
        sink.record_cycle_failure();
        sink.reset();
        assert_eq!(sink.summary(), MetricsSummary::default());
    }

    #[test]
    fn concurrent_writes_never_lose_counts() {
        const THREADS: usize = 16;
        const EVENTS: usize = 500;

        let sink = MetricsSink::new();
        let device = DeviceId::new("CAM_01");
        std::thread::scope(|scope| {
            for _ in 0..THREADS {
                scope.spawn(|| {
                    for _ in 0..EVENTS {
                        sink.record_cycle_failure();
                        sink.record_device_failure(&device);
                        let _ = sink.summary();
                    }
                });
            }
        });

        let summary = sink.summary();
        assert_eq!(summary.failed_cycles, (THREADS * EVENTS) as u64);
        assert_eq!(summary.device_failures[&device], (THREADS * EVENTS) as u64);
    }
}
