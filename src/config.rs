use crate::collectors::CollectorType;
use crate::utils::errors::MonitorError;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Run a workload while sampling GPU telemetry, then write averaged
/// statistics and exit with the workload's status.
#[derive(Parser, Debug)]
#[command(name = "gpu-monitor", version, about)]
pub struct Cli {
    /// Delay between telemetry samples, in milliseconds
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub sample_interval_ms: u64,

    /// Summary file to write (overwritten if it exists)
    pub output_path: PathBuf,

    /// Workload to run, followed by its arguments
    #[arg(
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_parser = clap::value_parser!(OsString)
    )]
    pub command: Vec<OsString>,

    /// Ordinal index of the device to sample
    #[arg(short, long, default_value_t = 0, env = "GPU_MONITOR_DEVICE")]
    pub device: u32,

    /// Telemetry backend
    #[arg(short, long, value_enum, default_value_t = CollectorType::Nvml, env = "GPU_MONITOR_BACKEND")]
    pub backend: CollectorType,

    /// Exit with the workload's status instead of 4/5 when telemetry cannot be set up
    #[arg(long)]
    pub propagate_on_telemetry_failure: bool,
}

/// Validated settings for one monitor run.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub sample_interval: Duration,
    pub output_path: PathBuf,
    pub command: Vec<OsString>,
    pub device_index: u32,
    pub backend: CollectorType,
    pub propagate_on_telemetry_failure: bool,
}

impl MonitorConfig {
    pub fn new<I, A>(
        sample_interval: Duration,
        output_path: impl Into<PathBuf>,
        command: I,
    ) -> Result<Self, MonitorError>
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        let command: Vec<OsString> = command.into_iter().map(Into::into).collect();
        if sample_interval.is_zero() {
            return Err(MonitorError::Config("sample interval must be positive".to_string()));
        }
        if command.first().is_none_or(|program| program.is_empty()) {
            return Err(MonitorError::Config("no workload command given".to_string()));
        }
        Ok(Self {
            sample_interval,
            output_path: output_path.into(),
            command,
            device_index: 0,
            backend: CollectorType::default(),
            propagate_on_telemetry_failure: false,
        })
    }

    pub fn with_device(mut self, device_index: u32) -> Self {
        self.device_index = device_index;
        self
    }

    pub fn with_backend(mut self, backend: CollectorType) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_propagate_on_telemetry_failure(mut self, propagate: bool) -> Self {
        self.propagate_on_telemetry_failure = propagate;
        self
    }
}

impl TryFrom<Cli> for MonitorConfig {
    type Error = MonitorError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        Ok(MonitorConfig::new(
            Duration::from_millis(cli.sample_interval_ms),
            cli.output_path,
            cli.command,
        )?
        .with_device(cli.device)
        .with_backend(cli.backend)
        .with_propagate_on_telemetry_failure(cli.propagate_on_telemetry_failure))
    }
}
