pub mod aggregation;
pub mod app;
pub mod cli;
pub mod common;
pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;

pub use aggregation::{Aggregator, CycleOutcome, CycleReport, Decision};
pub use common::{CaptureTrigger, CapturedUnit, Detection, DeviceId, DeviceMap};
pub use config::Settings;
pub use device::{Device, DeviceHandle, RetryPolicy, SimulatedCamera};
pub use error::{AggregationError, AppError, CaptureError, ConfigError, CycleError, PipelineError};
pub use logging::{init_logging, ComponentLogger, LoggerFactory};
pub use metrics::{MetricsSink, MetricsSummary};
pub use orchestrator::{CycleOrchestrator, OrchestratorBuilder};
pub use pipeline::{PipelineResult, PipelineRunner};
