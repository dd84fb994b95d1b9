use clap::Parser;
use std::path::PathBuf;

use crate::config::Settings;

#[derive(Debug, Parser)]
#[command(name = "inspection-cycle")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-sensor inspection cycle simulator", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "INSPECT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of inspection cycles to run
    #[arg(short = 'n', long)]
    pub cycles: Option<u32>,

    /// Log level: trace, debug, info, warn or error
    #[arg(long)]
    pub log_level: Option<String>,

    /// Print each cycle report as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the full text report after each cycle
    #[arg(long)]
    pub report: bool,
}

impl Cli {
    /// Applies command-line overrides on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(cycles) = self.cycles {
            settings.run.cycles = cycles;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level = level.clone();
        }
    }
}
