pub mod aggregator;
pub mod report;

pub use aggregator::{Aggregator, CycleOutcome, Decision, DeviceSummary, PASS_THRESHOLD};
pub use report::{build_report, render_text, CycleReport, DefectDetail, DeviceReport};
