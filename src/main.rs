use clap::Parser;
use inspection_cycle::app::{InspectionRunner, RunOptions};
use inspection_cycle::cli::Cli;
use inspection_cycle::config::Settings;
use inspection_cycle::device::SimulatedCamera;
use inspection_cycle::error::AppError;
use inspection_cycle::logging::{init_logging, LoggerFactory};
use inspection_cycle::orchestrator::CycleOrchestrator;
use inspection_cycle::pipeline::PipelineRunner;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    cli.apply(&mut settings);
    settings.validate()?;

    init_logging(settings.logging.level()?)?;
    let loggers = LoggerFactory::new();

    let mut builder = CycleOrchestrator::builder(loggers.clone())
        .capture_settings(&settings.capture)
        .runner(PipelineRunner::simulated(&settings.simulation, &loggers));
    for device in &settings.devices {
        info!(
            "Device {} ready ({})",
            device.id,
            device.resolution()
        );
        builder = builder.device(SimulatedCamera::from_settings(device, &settings.simulation));
    }
    let orchestrator = builder.build()?;

    let options = RunOptions {
        print_json: cli.json,
        print_report: cli.report,
        ..RunOptions::from(&settings.run)
    };
    let summary = InspectionRunner::new(orchestrator, options, &loggers).run().await;
    if summary.interrupted {
        info!("Interrupted after {} cycles", summary.cycles_run);
    }
    Ok(())
}
