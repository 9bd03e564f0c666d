//! UPS monitoring through the NUT `upsc` client.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::hardware::exec::run_command;
use crate::message::UpsReading;

const UPSC_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn read_ups_status(ups_name: &str) -> UpsReading {
    match run_command("upsc", &[ups_name], UPSC_TIMEOUT).await {
        Some(output) => parse_upsc_output(&output),
        None => {
            debug!("upsc query for {} failed", ups_name);
            UpsReading::unavailable()
        }
    }
}

/// Parse `upsc` output (`key: value` lines) into a reading. A present but
/// numerically broken variable poisons the whole reading as PARSE_ERROR so
/// the display never shows a half-valid battery state.
pub fn parse_upsc_output(output: &str) -> UpsReading {
    let vars: HashMap<&str, &str> = output
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect();

    if vars.is_empty() {
        return UpsReading::unavailable();
    }

    let battery_pct = match vars.get("battery.charge") {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) => Some(value as i64),
            Err(_) => return parse_error(),
        },
        None => None,
    };

    let load_pct = match vars.get("ups.load") {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) => Some(value as i64),
            Err(_) => return parse_error(),
        },
        None => None,
    };

    // battery.runtime is reported in seconds
    let runtime_minutes = match vars.get("battery.runtime") {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) => Some((value / 60.0) as i64),
            Err(_) => return parse_error(),
        },
        None => None,
    };

    let status = vars
        .get("ups.status")
        .map(|s| s.to_string())
        .unwrap_or_else(|| "UNKNOWN".to_string());
    let online = status.contains("OL");

    UpsReading {
        online,
        battery_pct,
        load_pct,
        runtime_minutes,
        status,
    }
}

fn parse_error() -> UpsReading {
    debug!("Error parsing UPS data");
    UpsReading {
        status: "PARSE_ERROR".to_string(),
        ..UpsReading::unavailable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_reading_parses() {
        let output = "\
battery.charge: 100
battery.runtime: 1800
ups.load: 23
ups.status: OL
ups.mfr: CyberPower
";
        let reading = parse_upsc_output(output);
        assert!(reading.online);
        assert_eq!(reading.battery_pct, Some(100));
        assert_eq!(reading.load_pct, Some(23));
        assert_eq!(reading.runtime_minutes, Some(30));
        assert_eq!(reading.status, "OL");
    }

    #[test]
    fn on_battery_is_not_online() {
        let reading = parse_upsc_output("ups.status: OB DISCHRG\n");
        assert!(!reading.online);
        assert_eq!(reading.status, "OB DISCHRG");
    }

    #[test]
    fn charging_online_detected() {
        // OL CHRG still contains OL
        assert!(parse_upsc_output("ups.status: OL CHRG\n").online);
    }

    #[test]
    fn empty_output_is_unavailable() {
        let reading = parse_upsc_output("");
        assert!(!reading.online);
        assert_eq!(reading.status, "UNAVAILABLE");
        assert_eq!(reading.battery_pct, None);
    }

    #[test]
    fn broken_number_is_parse_error() {
        let reading = parse_upsc_output("battery.charge: full\nups.status: OL\n");
        assert_eq!(reading.status, "PARSE_ERROR");
        assert!(!reading.online);
        assert_eq!(reading.battery_pct, None);
    }

    #[test]
    fn missing_variables_stay_absent() {
        let reading = parse_upsc_output("ups.status: OL\n");
        assert!(reading.online);
        assert_eq!(reading.battery_pct, None);
        assert_eq!(reading.load_pct, None);
        assert_eq!(reading.runtime_minutes, None);
    }
}
