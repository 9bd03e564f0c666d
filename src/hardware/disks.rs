//! Block device listing and SMART adapter.
//!
//! lsblk provides the device inventory and capacities; smartctl provides
//! health and temperature. All free-form output parsing stays in this file.

use std::time::Duration;

use tracing::{debug, warn};

use crate::hardware::exec::run_command;
use crate::message::{DeviceClass, DeviceReading, HealthStatus};

const LSBLK_TIMEOUT: Duration = Duration::from_secs(10);
const SMARTCTL_TIMEOUT: Duration = Duration::from_secs(10);

/// SMART attribute rows that carry a temperature, in match order.
const TEMP_ATTRIBUTES: &[&str] = &[
    "Temperature_Celsius",
    "Airflow_Temperature_Cel",
    "Temperature",
];

pub async fn list_devices() -> Vec<DeviceReading> {
    let Some(listing) = run_command(
        "lsblk",
        &["-d", "-n", "-o", "NAME,SIZE,TYPE"],
        LSBLK_TIMEOUT,
    )
    .await
    else {
        warn!("Could not get disk list from lsblk");
        return Vec::new();
    };

    let mut devices = Vec::new();
    for name in parse_lsblk_names(&listing) {
        if let Some(device) = read_device(&name).await {
            devices.push(device);
        }
    }
    devices
}

/// Extract physical disk names from `lsblk -d -n -o NAME,SIZE,TYPE` output,
/// skipping virtual devices.
pub fn parse_lsblk_names(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 || parts[2] != "disk" {
                return None;
            }
            let name = parts[0];
            if name.starts_with("loop") || name.starts_with("ram") || name.starts_with("dm-") {
                return None;
            }
            Some(name.to_string())
        })
        .collect()
}

async fn read_device(name: &str) -> Option<DeviceReading> {
    let device_path = format!("/dev/{name}");
    let class = if name.starts_with("nvme") {
        DeviceClass::Nvme
    } else {
        DeviceClass::Conventional
    };

    let capacity_gb = read_capacity_gb(name, &device_path).await;
    let (temperature_c, health) = read_smart_info(&device_path).await;

    Some(DeviceReading {
        identifier: name.to_string(),
        capacity_gb,
        temperature_c,
        health,
        class,
    })
}

/// Capacity in whole GB: lsblk byte size first, sysfs sector count as the
/// fallback, 0 with a warning if neither works.
async fn read_capacity_gb(name: &str, device_path: &str) -> u64 {
    if let Some(output) =
        run_command("lsblk", &["-d", "-n", "-b", "-o", "SIZE", device_path], LSBLK_TIMEOUT).await
    {
        if let Ok(bytes) = output.parse::<u64>() {
            return bytes / (1024 * 1024 * 1024);
        }
    }

    // /sys/block sizes are in 512-byte sectors
    if let Ok(raw) = std::fs::read_to_string(format!("/sys/block/{name}/size")) {
        if let Ok(sectors) = raw.trim().parse::<u64>() {
            return sectors * 512 / (1024 * 1024 * 1024);
        }
    }

    warn!("Could not determine capacity for {}", device_path);
    0
}

async fn read_smart_info(device_path: &str) -> (Option<f64>, HealthStatus) {
    match run_command("smartctl", &["-A", "-H", device_path], SMARTCTL_TIMEOUT).await {
        Some(output) => (extract_temperature(&output), extract_health(&output)),
        None => {
            debug!("No SMART data for {}", device_path);
            (None, HealthStatus::Unknown)
        }
    }
}

/// Health verdict from smartctl output. FAILING_NOW is checked before FAILED
/// so attribute-level failure flags are not mistaken for an overall verdict.
pub fn extract_health(output: &str) -> HealthStatus {
    if output.contains("PASSED") {
        HealthStatus::Passed
    } else if output.contains("FAILING_NOW") {
        HealthStatus::FailingNow
    } else if output.contains("FAILED") {
        HealthStatus::Failed
    } else {
        HealthStatus::Unknown
    }
}

/// Temperature from the SMART attribute table: the first line mentioning a
/// known temperature attribute contributes its last integer column (the raw
/// value). NVMe smartctl output uses a `Temperature:` line with the value in
/// degrees, which the same scan picks up.
pub fn extract_temperature(output: &str) -> Option<f64> {
    for attribute in TEMP_ATTRIBUTES {
        for line in output.lines() {
            if !line.contains(attribute) {
                continue;
            }
            if let Some(value) = last_integer(line) {
                return Some(value as f64);
            }
        }
    }
    None
}

/// Last whitespace-separated token that parses as a plain integer. SMART raw
/// value columns land there; threshold columns like "34 (Min/Max 20/45)"
/// keep the leading number as a separate token.
fn last_integer(line: &str) -> Option<i64> {
    line.split_whitespace()
        .rev()
        .find_map(|token| token.parse::<i64>().ok())
}
