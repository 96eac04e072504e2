//! Runs a workload as a child process while sampling one GPU's power,
//! clocks, utilization and temperature, then writes averaged statistics and
//! reports the workload's exit status.

pub mod utils {
    pub mod errors;
    pub mod logger;
}

// Telemetry backends
pub mod collectors;
pub mod config;
pub mod monitor;
pub mod report;
pub mod sampling;
pub mod summary;
pub mod supervisor;

pub use collectors::{CollectorType, Sample, TelemetryDevice, TelemetrySession};
pub use config::{Cli, MonitorConfig};
pub use monitor::{RunOutcome, run, run_with};
pub use sampling::{SampleSeries, sample_until_exit};
pub use summary::RunSummary;
pub use supervisor::{ChildOutcome, ChildProcess, ProcessHandle};
pub use utils::errors::MonitorError;
