//! CPU temperature and uptime readers.

use std::path::Path;

use tracing::{debug, warn};

/// Temperature sources in order of preference. First parseable value wins.
const TEMP_SENSOR_PATHS: &[&str] = &[
    "/sys/class/thermal/thermal_zone0/temp",
    "/sys/class/thermal/thermal_zone1/temp",
    "/sys/class/hwmon/hwmon0/temp1_input",
    "/sys/class/hwmon/hwmon1/temp1_input",
];

pub fn read_cpu_temperature() -> Option<f64> {
    for sensor_path in TEMP_SENSOR_PATHS {
        let path = Path::new(sensor_path);
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                if let Some(temp) = parse_temperature(raw.trim()) {
                    return Some(temp);
                }
                debug!("Unparseable temperature in {}: {:?}", sensor_path, raw.trim());
            }
            Err(e) => debug!("Failed to read temperature from {}: {}", sensor_path, e),
        }
    }

    warn!("No CPU temperature sensors found");
    None
}

/// Parse a raw sensor value. Values above 1000 are millidegrees (the hwmon
/// convention) and get divided down; the result is rounded to 0.1 °C.
pub fn parse_temperature(raw: &str) -> Option<f64> {
    let value: i64 = raw.parse().ok()?;
    let mut temp = value as f64;
    if temp > 1000.0 {
        temp /= 1000.0;
    }
    Some((temp * 10.0).round() / 10.0)
}

pub fn read_uptime() -> u64 {
    match std::fs::read_to_string("/proc/uptime") {
        Ok(content) => content
            .split_whitespace()
            .next()
            .and_then(|field| field.parse::<f64>().ok())
            .map(|seconds| seconds as u64)
            .unwrap_or_else(|| {
                warn!("Unparseable /proc/uptime content: {:?}", content.trim());
                0
            }),
        Err(e) => {
            warn!("Error reading uptime: {}", e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millidegrees_are_scaled_and_rounded() {
        assert_eq!(parse_temperature("1050"), Some(1.1));
        assert_eq!(parse_temperature("45000"), Some(45.0));
        assert_eq!(parse_temperature("52750"), Some(52.8));
    }

    #[test]
    fn plain_degrees_pass_through() {
        assert_eq!(parse_temperature("45"), Some(45.0));
        assert_eq!(parse_temperature("999"), Some(999.0));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_temperature(""), None);
        assert_eq!(parse_temperature("hot"), None);
        assert_eq!(parse_temperature("45.7"), None);
    }
}
