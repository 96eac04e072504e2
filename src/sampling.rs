use crate::collectors::{Sample, TelemetryDevice};
use crate::supervisor::{ChildOutcome, ChildProcess};
use crate::utils::errors::MonitorError;
use itertools::multiunzip;
use log::{debug, info, warn};
use polars::prelude::*;
use std::time::Duration;

/// Append-only telemetry samples in the order they were taken.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSeries {
    samples: Vec<Sample>,
}

impl SampleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Columnar view of the series:
    /// power_w | core_clock_mhz | mem_clock_mhz | utilization_pct | temperature_c
    pub fn to_frame(&self) -> Result<DataFrame, MonitorError> {
        let (power, core, mem, util, temp): (Vec<f64>, Vec<u32>, Vec<u32>, Vec<u32>, Vec<u32>) =
            multiunzip(self.samples.iter().map(|s| {
                (s.power_watts, s.core_clock_mhz, s.mem_clock_mhz, s.utilization_pct, s.temperature_c)
            }));

        let frame = df![
            "power_w" => power,
            "core_clock_mhz" => core,
            "mem_clock_mhz" => mem,
            "utilization_pct" => util,
            "temperature_c" => temp,
        ]?;
        Ok(frame)
    }
}

impl FromIterator<Sample> for SampleSeries {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Self { samples: iter.into_iter().collect() }
    }
}

/// Samples `device` every `interval` until `child` terminates.
///
/// Every iteration polls the child first and then takes exactly one sample,
/// whatever the poll said, so the series always ends with a reading taken
/// after the exit was observed. A failing poll stops sampling and falls back
/// to a blocking reap.
pub async fn sample_until_exit<C, D>(
    child: &mut C,
    device: &D,
    interval: Duration,
) -> Result<(SampleSeries, ChildOutcome), MonitorError>
where
    C: ChildProcess + ?Sized,
    D: TelemetryDevice + ?Sized,
{
    let mut series = SampleSeries::new();

    let outcome = loop {
        let polled = child.poll_nonblocking();

        let sample = device.read();
        debug!("Sample {}: {:?}", series.len() + 1, sample);
        series.push(sample);

        match polled {
            Ok(Some(outcome)) => break outcome,
            Ok(None) => tokio::time::sleep(interval).await,
            Err(e) => {
                warn!("Liveness check failed ({}), waiting for the child without sampling", e);
                break child.wait_blocking().await?;
            }
        }
    };

    info!("Child finished after {} samples: {:?}", series.len(), outcome);
    Ok((series, outcome))
}
