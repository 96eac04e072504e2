use crate::sampling::SampleSeries;
use crate::utils::errors::MonitorError;
use chrono::{DateTime, TimeZone};
use polars::prelude::*;
use std::fmt;
use std::time::Duration;

/// Local-time ISO-8601 with a numeric UTC offset, e.g. `2024-05-01T13:37:00+0200`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Aggregated statistics for one monitored run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub timestamp: String,
    pub avg_power_w: f64,
    pub avg_core_clock_mhz: f64,
    pub avg_mem_clock_mhz: f64,
    pub avg_utilization_pct: f64,
    pub avg_temperature_c: f64,
    pub sample_count: usize,
    pub duration_s: f64,
    /// Mean power times duration. Not a time integral over sample timestamps.
    pub energy_j: f64,
}

impl RunSummary {
    /// Reduces a sample series to unweighted means. An empty series yields
    /// zero averages.
    pub fn from_series<Tz>(
        series: SampleSeries,
        duration: Duration,
        at: DateTime<Tz>,
    ) -> Result<Self, MonitorError>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let frame = series.to_frame()?;
        let avg_power_w = frame.column("power_w")?.f64()?.mean().unwrap_or(0.0);
        let avg_core_clock_mhz = frame.column("core_clock_mhz")?.u32()?.mean().unwrap_or(0.0);
        let avg_mem_clock_mhz = frame.column("mem_clock_mhz")?.u32()?.mean().unwrap_or(0.0);
        let avg_utilization_pct = frame.column("utilization_pct")?.u32()?.mean().unwrap_or(0.0);
        let avg_temperature_c = frame.column("temperature_c")?.u32()?.mean().unwrap_or(0.0);

        let duration_s = duration.as_secs_f64();
        Ok(Self {
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            avg_power_w,
            avg_core_clock_mhz,
            avg_mem_clock_mhz,
            avg_utilization_pct,
            avg_temperature_c,
            sample_count: frame.height(),
            duration_s,
            energy_j: avg_power_w * duration_s,
        })
    }
}

/// Renders the report body: one `key=value` line per field.
impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "timestamp={}", self.timestamp)?;
        writeln!(f, "power_avg_w={:.3}", self.avg_power_w)?;
        writeln!(f, "gpu_core_clock_MHz={:.3}", self.avg_core_clock_mhz)?;
        writeln!(f, "gpu_mem_clock_MHz={:.3}", self.avg_mem_clock_mhz)?;
        writeln!(f, "gpu_utilization_pct={:.3}", self.avg_utilization_pct)?;
        writeln!(f, "gpu_temp_c={:.3}", self.avg_temperature_c)?;
        writeln!(f, "samples={}", self.sample_count)?;
        writeln!(f, "duration_s={:.3}", self.duration_s)?;
        writeln!(f, "energy_j={:.3}", self.energy_j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::Sample;
    use chrono::{FixedOffset, Local};

    fn sample(power_watts: f64, clock: u32, util: u32, temp: u32) -> Sample {
        Sample {
            power_watts,
            core_clock_mhz: clock,
            mem_clock_mhz: clock * 2,
            utilization_pct: util,
            temperature_c: temp,
        }
    }

    fn fixed_time() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-05-01T13:37:00+02:00").unwrap()
    }

    #[test]
    // Test averages are plain arithmetic means over the whole series
    fn test_means() {
        let series: SampleSeries = vec![sample(100.0, 1000, 10, 50), sample(200.0, 2000, 30, 70)]
            .into_iter()
            .collect();
        let summary = RunSummary::from_series(series, Duration::from_secs(2), fixed_time()).unwrap();
        assert_eq!(summary.sample_count, 2);
        assert!((summary.avg_power_w - 150.0).abs() < 1e-9);
        assert!((summary.avg_core_clock_mhz - 1500.0).abs() < 1e-9);
        assert!((summary.avg_mem_clock_mhz - 3000.0).abs() < 1e-9);
        assert!((summary.avg_utilization_pct - 20.0).abs() < 1e-9);
        assert!((summary.avg_temperature_c - 60.0).abs() < 1e-9);
    }

    #[test]
    // Test energy is mean power times duration, independent of sample spacing
    fn test_energy_is_mean_power_times_duration() {
        let series: SampleSeries = vec![
            sample(50.0, 1000, 0, 40),
            sample(250.0, 1000, 0, 40),
            sample(90.0, 1000, 0, 40),
        ]
        .into_iter()
        .collect();
        let summary =
            RunSummary::from_series(series, Duration::from_millis(1500), fixed_time()).unwrap();
        assert!((summary.duration_s - 1.5).abs() < 1e-9);
        assert!((summary.energy_j - summary.avg_power_w * summary.duration_s).abs() < 1e-9);
        assert!((summary.energy_j - 195.0).abs() < 1e-9);
    }

    #[test]
    // Test an empty series gives zero averages and zero samples
    fn test_empty_series() {
        let summary =
            RunSummary::from_series(SampleSeries::new(), Duration::from_secs(3), Local::now()).unwrap();
        assert_eq!(summary.sample_count, 0);
        assert_eq!(summary.avg_power_w, 0.0);
        assert_eq!(summary.avg_core_clock_mhz, 0.0);
        assert_eq!(summary.avg_mem_clock_mhz, 0.0);
        assert_eq!(summary.avg_utilization_pct, 0.0);
        assert_eq!(summary.avg_temperature_c, 0.0);
        assert_eq!(summary.energy_j, 0.0);
    }

    #[test]
    // Test the timestamp carries the local offset without a colon
    fn test_timestamp_format() {
        let summary =
            RunSummary::from_series(SampleSeries::new(), Duration::ZERO, fixed_time()).unwrap();
        assert_eq!(summary.timestamp, "2024-05-01T13:37:00+0200");
    }

    #[test]
    // Test the rendered report has the nine keys in order with 3 decimals
    fn test_display_format() {
        let series: SampleSeries = vec![sample(123.4567, 1410, 99, 71)].into_iter().collect();
        let summary =
            RunSummary::from_series(series, Duration::from_millis(500), fixed_time()).unwrap();
        let rendered = summary.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(
            lines,
            vec![
                "timestamp=2024-05-01T13:37:00+0200",
                "power_avg_w=123.457",
                "gpu_core_clock_MHz=1410.000",
                "gpu_mem_clock_MHz=2820.000",
                "gpu_utilization_pct=99.000",
                "gpu_temp_c=71.000",
                "samples=1",
                "duration_s=0.500",
                "energy_j=61.728",
            ]
        );
        assert!(rendered.ends_with('\n'));
    }
}
