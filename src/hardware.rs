//! Sensor collection: trait seam and the Linux implementation.
//!
//! Every reader is best-effort. I/O and parse failures are absorbed at this
//! boundary and surface as an absent value, UNKNOWN, or an empty list; the
//! layers above only ever see typed readings.

pub mod array;
pub mod cpu;
pub mod disks;
pub mod exec;
pub mod ups;

use async_trait::async_trait;

use crate::message::{ArrayStatus, DeviceReading, UpsReading};

#[async_trait]
pub trait SystemSensors: Send + Sync {
    /// Current CPU temperature in °C, rounded to 0.1, if any sensor parses.
    async fn cpu_temperature(&self) -> Option<f64>;

    /// System uptime in whole seconds; 0 when /proc/uptime is unreadable.
    async fn uptime_seconds(&self) -> u64;

    /// Storage array state, resolved through the probe priority chain.
    async fn array_status(&self) -> ArrayStatus;

    /// All physical block devices with capacity and SMART data.
    async fn list_devices(&self) -> Vec<DeviceReading>;

    /// UPS state via NUT; the unavailable reading when upsc fails.
    async fn ups_status(&self, ups_name: &str) -> UpsReading;
}

/// Production sensors backed by sysfs, procfs, and the external query tools.
pub struct LinuxSensors;

impl LinuxSensors {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LinuxSensors {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SystemSensors for LinuxSensors {
    async fn cpu_temperature(&self) -> Option<f64> {
        cpu::read_cpu_temperature()
    }

    async fn uptime_seconds(&self) -> u64 {
        cpu::read_uptime()
    }

    async fn array_status(&self) -> ArrayStatus {
        array::read_array_status().await
    }

    async fn list_devices(&self) -> Vec<DeviceReading> {
        disks::list_devices().await
    }

    async fn ups_status(&self, ups_name: &str) -> UpsReading {
        ups::read_ups_status(ups_name).await
    }
}
