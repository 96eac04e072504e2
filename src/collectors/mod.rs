pub mod dummy;
pub mod nvidia_gpu;

pub use dummy::{DummyGpu, DummySession};
pub use nvidia_gpu::{NvidiaGpu, NvmlSession};

use crate::utils::errors::MonitorError;
use clap::ValueEnum;
use log::debug;

/// Telemetry backends the monitor can sample from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CollectorType {
    /// NVIDIA devices through NVML
    #[default]
    Nvml,
    /// Fixed in-process readings, no hardware required
    Dummy,
}

/// One point-in-time telemetry reading for a single device.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    pub power_watts: f64,
    pub core_clock_mhz: u32,
    pub mem_clock_mhz: u32,
    pub utilization_pct: u32,
    pub temperature_c: u32,
}

/// A single device bound inside a telemetry session.
///
/// Each metric query can fail on its own (transient driver error, metric not
/// supported by this device). `read` absorbs those failures by substituting
/// zero for the affected field, so a sample is always produced.
pub trait TelemetryDevice {
    /// Board power draw in milliwatts
    fn power_usage_mw(&self) -> Result<u32, MonitorError>;

    fn core_clock_mhz(&self) -> Result<u32, MonitorError>;

    fn mem_clock_mhz(&self) -> Result<u32, MonitorError>;

    /// Percent of time the device was busy over the driver's sample period
    fn utilization_pct(&self) -> Result<u32, MonitorError>;

    fn temperature_c(&self) -> Result<u32, MonitorError>;

    fn read(&self) -> Sample {
        let power_watts = self
            .power_usage_mw()
            .map(|mw| f64::from(mw) / 1000.0)
            .unwrap_or_else(|e| absorb("power", e));
        Sample {
            power_watts,
            core_clock_mhz: self.core_clock_mhz().unwrap_or_else(|e| absorb("core clock", e)),
            mem_clock_mhz: self.mem_clock_mhz().unwrap_or_else(|e| absorb("memory clock", e)),
            utilization_pct: self.utilization_pct().unwrap_or_else(|e| absorb("utilization", e)),
            temperature_c: self.temperature_c().unwrap_or_else(|e| absorb("temperature", e)),
        }
    }
}

fn absorb<T: Default>(metric: &str, err: MonitorError) -> T {
    debug!("Substituting zero for {}: {}", metric, err);
    T::default()
}

/// An open session with a monitoring subsystem.
///
/// Sessions are created by the backend's `init` function and must be closed
/// through `shutdown` exactly once. Devices borrow the session, so they are
/// always released before it.
pub trait TelemetrySession {
    type Device<'a>: TelemetryDevice
    where
        Self: 'a;

    fn open_device(&self, index: u32) -> Result<Self::Device<'_>, MonitorError>;

    fn shutdown(self) -> Result<(), MonitorError>;
}
