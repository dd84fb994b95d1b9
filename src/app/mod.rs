pub mod console;
pub mod runner;

pub use runner::{InspectionRunner, RunOptions, RunSummary};
