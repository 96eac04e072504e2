use crate::collectors::{CollectorType, DummySession, NvmlSession, TelemetrySession};
use crate::config::MonitorConfig;
use crate::report::write_report;
use crate::sampling::{SampleSeries, sample_until_exit};
use crate::summary::RunSummary;
use crate::supervisor::{ChildOutcome, ChildProcess, ProcessHandle};
use crate::utils::errors::MonitorError;
use chrono::Local;
use log::{error, info, warn};
use std::time::{Duration, Instant};

/// Everything one monitor run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub child: ChildOutcome,
    /// Present when telemetry was sampled and aggregated
    pub summary: Option<RunSummary>,
    /// Why the run degraded to supervising without telemetry
    pub telemetry_error: Option<MonitorError>,
    pub report_error: Option<MonitorError>,
}

impl RunOutcome {
    /// Exit code for the monitor process.
    ///
    /// A report that could not be written takes precedence. A telemetry setup
    /// failure exits 4 or 5 unless `propagate_on_telemetry_failure` asks for
    /// the child's status instead.
    pub fn exit_code(&self, propagate_on_telemetry_failure: bool) -> i32 {
        if let Some(err) = &self.report_error {
            return err.exit_code();
        }
        match &self.telemetry_error {
            Some(err) if !propagate_on_telemetry_failure => err.exit_code(),
            _ => self.child.exit_code(),
        }
    }
}

/// Runs the configured workload with the backend selected in `config`.
pub async fn run(config: &MonitorConfig) -> Result<RunOutcome, MonitorError> {
    match config.backend {
        CollectorType::Nvml => run_with(config, NvmlSession::init).await,
        CollectorType::Dummy => run_with(config, DummySession::init).await,
    }
}

/// Spawns the workload, then opens the telemetry session produced by
/// `init_session` and samples it until the workload exits.
///
/// Only a failed spawn is returned as an error. Once the child exists every
/// path reaps it; telemetry and report failures are recorded in the outcome.
pub async fn run_with<S, F>(config: &MonitorConfig, init_session: F) -> Result<RunOutcome, MonitorError>
where
    S: TelemetrySession,
    F: FnOnce() -> Result<S, MonitorError>,
{
    let mut child = ProcessHandle::spawn(&config.command)?;
    let started = Instant::now();

    let session = match init_session() {
        Ok(session) => session,
        Err(e) => {
            warn!("{}; supervising without telemetry", e);
            return supervise_only(&mut child, e).await;
        }
    };

    let sampled = sample_session(&session, &mut child, config, started).await;
    if let Err(e) = session.shutdown() {
        error!("{}", e);
    }

    let (series, child_outcome, duration) = match sampled {
        Ok(sampled) => sampled,
        Err(e @ MonitorError::DeviceNotFound { .. }) => {
            warn!("{}; supervising without telemetry", e);
            return supervise_only(&mut child, e).await;
        }
        Err(e) => return Err(e),
    };

    let summary = RunSummary::from_series(series, duration, Local::now())?;
    info!(
        "{} samples over {:.3}s, average power {:.3} W, energy {:.3} J",
        summary.sample_count, summary.duration_s, summary.avg_power_w, summary.energy_j
    );

    let report_error = write_report(&config.output_path, &summary).err();
    if let Some(e) = &report_error {
        error!("{}", e);
    }

    Ok(RunOutcome {
        child: child_outcome,
        summary: Some(summary),
        telemetry_error: None,
        report_error,
    })
}

/// Binds the configured device and samples it. The device is released
/// before this returns, so the caller can shut the session down.
async fn sample_session<S, C>(
    session: &S,
    child: &mut C,
    config: &MonitorConfig,
    started: Instant,
) -> Result<(SampleSeries, ChildOutcome, Duration), MonitorError>
where
    S: TelemetrySession,
    C: ChildProcess,
{
    let device = session.open_device(config.device_index)?;
    let (series, outcome) = sample_until_exit(child, &device, config.sample_interval).await?;
    Ok((series, outcome, started.elapsed()))
}

async fn supervise_only<C: ChildProcess>(
    child: &mut C,
    telemetry_error: MonitorError,
) -> Result<RunOutcome, MonitorError> {
    let outcome = child.wait_blocking().await?;
    info!("Child finished without telemetry: {:?}", outcome);
    Ok(RunOutcome {
        child: outcome,
        summary: None,
        telemetry_error: Some(telemetry_error),
        report_error: None,
    })
}
