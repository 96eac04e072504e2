use clap::Parser;
use gpu_monitor::utils::logger::setup_logger;
use gpu_monitor::{Cli, MonitorConfig, monitor};
use log::{error, info};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logger();

    let config = match MonitorConfig::try_from(cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return exit_code(e.exit_code());
        }
    };
    info!(
        "Monitoring {:?} every {:?} on {:?} device {}",
        config.command, config.sample_interval, config.backend, config.device_index
    );

    let code = match monitor::run(&config).await {
        Ok(outcome) => outcome.exit_code(config.propagate_on_telemetry_failure),
        Err(e) => {
            error!("{}", e);
            e.exit_code()
        }
    };
    exit_code(code)
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
