use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Failed to spawn `{program}`: {source}")]
    SpawnFailed { program: String, source: io::Error },
    #[error("Telemetry unavailable: {0}")]
    TelemetryUnavailable(String),
    #[error("Telemetry device {index} not found: {reason}")]
    DeviceNotFound { index: u32, reason: String },
    #[error("Metric read failed: {0}")]
    MetricRead(String),
    #[error("Failed to wait on child process: {0}")]
    Wait(#[source] io::Error),
    #[error("Failed to write report to {}: {source}", .path.display())]
    ReportWriteFailed { path: PathBuf, source: io::Error },
    #[error("Trace error: {0}")]
    Trace(#[from] polars::prelude::PolarsError),
    #[error("Other error: {0}")]
    Other(String),
}

impl MonitorError {
    /// Process exit code reported by the monitor for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            MonitorError::Config(_) => 2,
            MonitorError::SpawnFailed { .. } => 3,
            MonitorError::TelemetryUnavailable(_) => 4,
            MonitorError::DeviceNotFound { .. } => 5,
            MonitorError::ReportWriteFailed { .. } => 6,
            MonitorError::MetricRead(_)
            | MonitorError::Wait(_)
            | MonitorError::Trace(_)
            | MonitorError::Other(_) => 1,
        }
    }
}
