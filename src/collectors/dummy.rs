use crate::collectors::{Sample, TelemetryDevice, TelemetrySession};
use crate::utils::errors::MonitorError;
use log::info;

/// In-process telemetry session with fixed readings. Always available.
#[derive(Debug, Clone)]
pub struct DummySession {
    device_count: u32,
    reading: Sample,
}

impl DummySession {
    pub fn new(device_count: u32, reading: Sample) -> Self {
        Self { device_count, reading }
    }

    pub fn init() -> Result<Self, MonitorError> {
        info!("Dummy telemetry session initialized");
        Ok(Self::default())
    }
}

impl Default for DummySession {
    fn default() -> Self {
        Self::new(
            1,
            Sample {
                power_watts: 150.0,
                core_clock_mhz: 1500,
                mem_clock_mhz: 5000,
                utilization_pct: 50,
                temperature_c: 60,
            },
        )
    }
}

impl TelemetrySession for DummySession {
    type Device<'a>
        = DummyGpu
    where
        Self: 'a;

    fn open_device(&self, index: u32) -> Result<DummyGpu, MonitorError> {
        if index >= self.device_count {
            return Err(MonitorError::DeviceNotFound {
                index,
                reason: format!("dummy session exposes {} device(s)", self.device_count),
            });
        }
        info!("Bound dummy GPU {}", index);
        Ok(DummyGpu { reading: self.reading })
    }

    fn shutdown(self) -> Result<(), MonitorError> {
        info!("Dummy telemetry session shut down");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DummyGpu {
    reading: Sample,
}

impl TelemetryDevice for DummyGpu {
    fn power_usage_mw(&self) -> Result<u32, MonitorError> {
        Ok((self.reading.power_watts * 1000.0).round() as u32)
    }

    fn core_clock_mhz(&self) -> Result<u32, MonitorError> {
        Ok(self.reading.core_clock_mhz)
    }

    fn mem_clock_mhz(&self) -> Result<u32, MonitorError> {
        Ok(self.reading.mem_clock_mhz)
    }

    fn utilization_pct(&self) -> Result<u32, MonitorError> {
        Ok(self.reading.utilization_pct)
    }

    fn temperature_c(&self) -> Result<u32, MonitorError> {
        Ok(self.reading.temperature_c)
    }
}
