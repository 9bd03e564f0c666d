//! Status aggregation: device-list reduction and per-tick record assembly.

use std::sync::Arc;

use crate::config::types::AgentConfig;
use crate::hardware::SystemSensors;
use crate::message::{DeviceClass, DeviceReading, HealthStatus, StatusRecord, UpsReading};

/// Reduction of one device class: worst health wins, hottest temperature
/// wins, capacities sum exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSummary {
    pub max_temp: Option<f64>,
    pub total_capacity_gb: u64,
    pub worst_health: HealthStatus,
    pub count: usize,
}

impl ClassSummary {
    pub fn empty() -> Self {
        Self {
            max_temp: None,
            total_capacity_gb: 0,
            worst_health: HealthStatus::Unknown,
            count: 0,
        }
    }
}

/// Reduce the devices of one class. Pure; an empty selection yields the
/// explicit empty summary, never zeros masquerading as readings.
pub fn reduce(devices: &[DeviceReading], class: DeviceClass) -> ClassSummary {
    let mut summary = ClassSummary::empty();

    for device in devices.iter().filter(|d| d.class == class) {
        summary.count += 1;
        summary.total_capacity_gb += device.capacity_gb;
        summary.worst_health = summary.worst_health.worse(device.health);
        if let Some(temp) = device.temperature_c {
            summary.max_temp = Some(match summary.max_temp {
                Some(current) if current >= temp => current,
                _ => temp,
            });
        }
    }

    summary
}

/// Builds one fixed-shape status record per sampling tick.
pub struct StatusBuilder {
    config: Arc<AgentConfig>,
    sensors: Arc<dyn SystemSensors>,
}

impl StatusBuilder {
    pub fn new(config: Arc<AgentConfig>, sensors: Arc<dyn SystemSensors>) -> Self {
        Self { config, sensors }
    }

    pub async fn build(&self) -> StatusRecord {
        let cpu_temperature_c = self.sensors.cpu_temperature().await;
        let uptime_seconds = self.sensors.uptime_seconds().await;
        let array_status = self.sensors.array_status().await;

        let (disk, nvme) = if self.config.enable_disk_monitoring {
            let devices = self.sensors.list_devices().await;
            (
                reduce(&devices, DeviceClass::Conventional),
                reduce(&devices, DeviceClass::Nvme),
            )
        } else {
            (ClassSummary::empty(), ClassSummary::empty())
        };

        let ups = if self.config.enable_ups_monitoring {
            self.sensors.ups_status(&self.config.ups_name).await
        } else {
            UpsReading::unavailable()
        };

        StatusRecord {
            timestamp: chrono::Local::now().to_rfc3339(),
            uptime_seconds,
            cpu_temperature_c,
            array_status,
            disk_max_temp_c: disk.max_temp,
            disk_total_capacity_gb: disk.total_capacity_gb,
            disk_worst_health: disk.worst_health,
            disk_count: disk.count,
            nvme_max_temp_c: nvme.max_temp,
            nvme_total_capacity_gb: nvme.total_capacity_gb,
            nvme_worst_health: nvme.worst_health,
            nvme_count: nvme.count,
            ups_online: ups.online,
            ups_battery_pct: ups.battery_pct,
            ups_load_pct: ups.load_pct,
            ups_runtime_minutes: ups.runtime_minutes,
            ups_status: ups.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ArrayStatus;
    use crate::test_utils::StubSensors;

    fn device(
        name: &str,
        capacity_gb: u64,
        temp: Option<f64>,
        health: HealthStatus,
        class: DeviceClass,
    ) -> DeviceReading {
        DeviceReading {
            identifier: name.to_string(),
            capacity_gb,
            temperature_c: temp,
            health,
            class,
        }
    }

    #[test]
    fn reduce_empty_list_yields_explicit_absence() {
        let summary = reduce(&[], DeviceClass::Conventional);
        assert_eq!(summary.max_temp, None);
        assert_eq!(summary.total_capacity_gb, 0);
        assert_eq!(summary.worst_health, HealthStatus::Unknown);
        assert_eq!(summary.count, 0);
    }

    #[test]
    fn reduce_worst_health_wins() {
        let devices = vec![
            device("sda", 100, None, HealthStatus::Passed, DeviceClass::Conventional),
            device("sdb", 100, None, HealthStatus::Failed, DeviceClass::Conventional),
            device("sdc", 100, None, HealthStatus::Ok, DeviceClass::Conventional),
        ];
        let summary = reduce(&devices, DeviceClass::Conventional);
        assert_eq!(summary.worst_health, HealthStatus::Failed);
    }

    #[test]
    fn reduce_capacity_is_permutation_invariant() {
        let mut devices = vec![
            device("sda", 4000, None, HealthStatus::Passed, DeviceClass::Conventional),
            device("sdb", 2000, None, HealthStatus::Passed, DeviceClass::Conventional),
            device("sdc", 12000, None, HealthStatus::Passed, DeviceClass::Conventional),
        ];
        let forward = reduce(&devices, DeviceClass::Conventional);
        devices.reverse();
        let backward = reduce(&devices, DeviceClass::Conventional);
        assert_eq!(forward.total_capacity_gb, 18000);
        assert_eq!(forward, backward);
    }

    #[test]
    fn reduce_takes_max_of_present_temperatures() {
        let devices = vec![
            device("sda", 100, Some(31.0), HealthStatus::Passed, DeviceClass::Conventional),
            device("sdb", 100, None, HealthStatus::Passed, DeviceClass::Conventional),
            device("sdc", 100, Some(44.5), HealthStatus::Passed, DeviceClass::Conventional),
        ];
        let summary = reduce(&devices, DeviceClass::Conventional);
        assert_eq!(summary.max_temp, Some(44.5));
        assert_eq!(summary.count, 3);
    }

    #[test]
    fn reduce_filters_by_class() {
        let devices = vec![
            device("sda", 1000, Some(35.0), HealthStatus::Passed, DeviceClass::Conventional),
            device("nvme0n1", 500, Some(50.0), HealthStatus::Ok, DeviceClass::Nvme),
        ];
        let disks = reduce(&devices, DeviceClass::Conventional);
        let nvme = reduce(&devices, DeviceClass::Nvme);
        assert_eq!(disks.count, 1);
        assert_eq!(disks.total_capacity_gb, 1000);
        assert_eq!(nvme.count, 1);
        assert_eq!(nvme.max_temp, Some(50.0));
    }

    #[tokio::test]
    async fn build_assembles_full_record() {
        let sensors = Arc::new(StubSensors {
            devices: vec![device(
                "sda",
                1000,
                Some(35.0),
                HealthStatus::Passed,
                DeviceClass::Conventional,
            )],
            ..StubSensors::quiet()
        });
        let builder = StatusBuilder::new(Arc::new(AgentConfig::default()), sensors);

        let record = builder.build().await;
        assert_eq!(record.cpu_temperature_c, Some(42.3));
        assert_eq!(record.uptime_seconds, 86400);
        assert_eq!(record.array_status, ArrayStatus::Started);
        assert_eq!(record.disk_max_temp_c, Some(35.0));
        assert_eq!(record.disk_total_capacity_gb, 1000);
        assert_eq!(record.disk_worst_health, HealthStatus::Passed);
        assert_eq!(record.disk_count, 1);
        assert_eq!(record.nvme_count, 0);
        assert_eq!(record.nvme_worst_health, HealthStatus::Unknown);
        assert!(!record.ups_online);
        assert_eq!(record.ups_status, "UNAVAILABLE");
    }

    #[tokio::test]
    async fn disabled_disk_monitoring_yields_empty_classes() {
        let sensors = Arc::new(StubSensors {
            devices: vec![device(
                "sda",
                1000,
                Some(35.0),
                HealthStatus::Passed,
                DeviceClass::Conventional,
            )],
            ..StubSensors::quiet()
        });
        let config = AgentConfig {
            enable_disk_monitoring: false,
            ..AgentConfig::default()
        };
        let builder = StatusBuilder::new(Arc::new(config), sensors);

        let record = builder.build().await;
        assert_eq!(record.disk_count, 0);
        assert_eq!(record.disk_max_temp_c, None);
        assert_eq!(record.disk_worst_health, HealthStatus::Unknown);
    }
}
