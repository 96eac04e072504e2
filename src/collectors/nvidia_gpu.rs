use crate::collectors::{TelemetryDevice, TelemetrySession};
use crate::utils::errors::MonitorError;
use log::info;
use nvml_wrapper::enum_wrappers::device::{Clock, TemperatureSensor};
use nvml_wrapper::error::NvmlError;
use nvml_wrapper::{Device, Nvml};

/// NVML session. Dropping it without calling `shutdown` still releases the
/// library handle through `Nvml`'s destructor.
pub struct NvmlSession {
    nvml: Nvml,
}

impl NvmlSession {
    /// Loads the NVML library and initializes it.
    pub fn init() -> Result<Self, MonitorError> {
        let nvml = Nvml::init().map_err(|e| MonitorError::TelemetryUnavailable(e.to_string()))?;
        match nvml.sys_driver_version() {
            Ok(version) => info!("NVML initialized, driver version {}", version),
            Err(_) => info!("NVML initialized"),
        }
        Ok(Self { nvml })
    }
}

impl TelemetrySession for NvmlSession {
    type Device<'a>
        = NvidiaGpu<'a>
    where
        Self: 'a;

    fn open_device(&self, index: u32) -> Result<NvidiaGpu<'_>, MonitorError> {
        let device = self
            .nvml
            .device_by_index(index)
            .map_err(|e| MonitorError::DeviceNotFound { index, reason: e.to_string() })?;
        let name = device.name().unwrap_or_else(|_| "unknown".to_string());
        info!("Bound NVIDIA GPU {} ({})", index, name);
        Ok(NvidiaGpu { index, device })
    }

    fn shutdown(self) -> Result<(), MonitorError> {
        self.nvml
            .shutdown()
            .map_err(|e| MonitorError::Other(format!("NVML shutdown failed: {}", e)))?;
        info!("NVML session shut down");
        Ok(())
    }
}

/// One NVIDIA GPU bound by ordinal index.
pub struct NvidiaGpu<'nvml> {
    pub index: u32,
    device: Device<'nvml>,
}

fn metric_error(metric: &str, err: NvmlError) -> MonitorError {
    MonitorError::MetricRead(format!("{}: {}", metric, err))
}

impl TelemetryDevice for NvidiaGpu<'_> {
    fn power_usage_mw(&self) -> Result<u32, MonitorError> {
        self.device.power_usage().map_err(|e| metric_error("power usage", e))
    }

    fn core_clock_mhz(&self) -> Result<u32, MonitorError> {
        self.device
            .clock_info(Clock::Graphics)
            .map_err(|e| metric_error("graphics clock", e))
    }

    fn mem_clock_mhz(&self) -> Result<u32, MonitorError> {
        self.device
            .clock_info(Clock::Memory)
            .map_err(|e| metric_error("memory clock", e))
    }

    fn utilization_pct(&self) -> Result<u32, MonitorError> {
        self.device
            .utilization_rates()
            .map(|rates| rates.gpu)
            .map_err(|e| metric_error("utilization", e))
    }

    fn temperature_c(&self) -> Result<u32, MonitorError> {
        self.device
            .temperature(TemperatureSensor::Gpu)
            .map_err(|e| metric_error("temperature", e))
    }
}
