use crate::aggregation::CycleReport;
use crate::metrics::MetricsSummary;

const GREEN: &str = "\x1b[92m";
const RED: &str = "\x1b[91m";
const RESET: &str = "\x1b[0m";

fn banner_rule() -> String {
    "=".repeat(60)
}

pub fn start_banner(cycles: u32) -> String {
    let rule = banner_rule();
    format!("\n{rule}\n  Multi-Sensor Inspection - Starting {cycles} Cycles\n{rule}\n")
}

pub fn cycle_line(cycle: u32, total: u32, report: &CycleReport) -> String {
    let (color, symbol) = if report.decision.is_pass() {
        (GREEN, "✓")
    } else {
        (RED, "✗")
    };
    format!(
        "{color}[Cycle {cycle:02}/{total:02}] {symbol} {}{RESET} - Score: {:.2} - Defects: {} - Time: {:.0}ms",
        report.decision, report.overall_score, report.defects_found, report.total_time_ms
    )
}

pub fn error_line(cycle: u32, total: u32, message: &str) -> String {
    format!("{RED}[Cycle {cycle:02}/{total:02}] ✗ ERROR{RESET} - {message}")
}

pub fn summary_block(summary: &MetricsSummary) -> String {
    let rule = banner_rule();
    let failures = if summary.device_failures.is_empty() {
        "none".to_string()
    } else {
        summary
            .device_failures
            .iter()
            .map(|(id, count)| format!("{id}={count}"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    [
        String::new(),
        rule.clone(),
        "  INSPECTION SUMMARY".to_string(),
        rule.clone(),
        format!("Total Cycles:        {}", summary.total_cycles),
        format!("Successful:          {}", summary.successful_cycles),
        format!("Failed:              {}", summary.failed_cycles),
        format!("Pass Rate:           {:.1}%", summary.pass_rate),
        format!("Average Cycle Time:  {:.0}ms", summary.avg_cycle_time_ms),
        format!(
            "Cycle Time Range:    {:.0}-{:.0}ms",
            summary.min_cycle_time_ms, summary.max_cycle_time_ms
        ),
        format!("Average Score:       {:.2}", summary.avg_quality_score),
        format!("Total Defects:       {}", summary.total_defects),
        format!("Device Failures:     {failures}"),
        rule,
        String::new(),
    ]
    .join("\n")
}
