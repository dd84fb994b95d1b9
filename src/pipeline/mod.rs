pub mod analyze;
pub mod prepare;
pub mod runner;
pub mod scoring;
pub mod stage;

pub use analyze::{Analyzer, SimulatedAnalyzer, MODEL_VERSION};
pub use prepare::{PreparedUnit, Preparer, SimulatedPreparer};
pub use runner::{PipelineResult, PipelineRunner};
pub use scoring::{classify, quality_score, severity_weight, CONFIDENCE_THRESHOLD};
pub use stage::{PipelineStage, StageTimings};
