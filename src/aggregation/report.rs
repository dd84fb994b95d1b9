use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt::Write;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::aggregator::{CycleOutcome, Decision};
use crate::common::{DefectCategory, DeviceMap, Severity, SeverityHistogram};
use crate::pipeline::PipelineResult;

const RULE: &str = "═══════════════════════════════════════════";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefectDetail {
    pub category: DefectCategory,
    pub severity: Option<Severity>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceReport {
    pub quality_score: f64,
    pub defects_found: usize,
    pub processing_time_ms: f64,
    pub defect_details: Vec<DefectDetail>,
}

/// Write-once record of one completed cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub report_id: Uuid,
    pub cycle_id: u64,
    pub timestamp: DateTime<Utc>,
    pub devices: DeviceMap<DeviceReport>,
    pub overall_score: f64,
    pub decision: Decision,
    pub defects_found: usize,
    pub severity_breakdown: SeverityHistogram,
    pub total_time_ms: f64,
    pub devices_used: usize,
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn build_report(
    cycle_id: u64,
    results: &DeviceMap<PipelineResult>,
    outcome: &CycleOutcome,
    elapsed: Duration,
) -> CycleReport {
    let devices = results
        .iter()
        .map(|(id, result)| {
            let detail = DeviceReport {
                quality_score: result.quality_score,
                defects_found: result.defects(),
                processing_time_ms: millis(result.processing_time()),
                defect_details: result
                    .detections
                    .iter()
                    .map(|d| DefectDetail {
                        category: d.category,
                        severity: d.severity,
                        confidence: d.confidence,
                    })
                    .collect(),
            };
            (id.clone(), detail)
        })
        .collect();

    let report = CycleReport {
        report_id: Uuid::new_v4(),
        cycle_id,
        timestamp: Utc::now(),
        devices,
        overall_score: outcome.overall_score,
        decision: outcome.decision,
        defects_found: outcome.total_defects,
        severity_breakdown: outcome.severity_counts,
        total_time_ms: round2(millis(elapsed)),
        devices_used: outcome.devices_used,
    };

    info!(
        "Report #{}: {} | Score: {:.2} | Defects: {} | Time: {:.0}ms",
        report.cycle_id,
        report.decision,
        report.overall_score,
        report.defects_found,
        report.total_time_ms
    );
    report
}

/// Human-readable block for one report.
pub fn render_text(report: &CycleReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "  INSPECTION REPORT - Cycle #{}", report.cycle_id);
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(
        out,
        "Timestamp:     {}",
        report.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    let _ = writeln!(out, "Decision:      {}", report.decision);
    let _ = writeln!(out, "Score:         {:.2}", report.overall_score);
    let _ = writeln!(out, "Total Time:    {:.0}ms", report.total_time_ms);
    let _ = writeln!(out);
    let _ = writeln!(out, "Defects Found: {}", report.defects_found);
    if report.defects_found > 0 {
        let breakdown = &report.severity_breakdown;
        let _ = writeln!(out, "  - Critical:  {}", breakdown.critical);
        let _ = writeln!(out, "  - Major:     {}", breakdown.major);
        let _ = writeln!(out, "  - Minor:     {}", breakdown.minor);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Device Results:");
    for (id, device) in &report.devices {
        let _ = writeln!(out, "  {id}:");
        let _ = writeln!(out, "    Score:   {:.2}", device.quality_score);
        let _ = writeln!(out, "    Defects: {}", device.defects_found);
        let _ = writeln!(out, "    Time:    {:.0}ms", device.processing_time_ms);
    }
    out.push_str(RULE);
    out
}
