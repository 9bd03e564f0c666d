//! key=value config file parser with strict typed coercion.

use std::path::Path;

use tracing::{info, warn};

use super::types::{AgentConfig, ConfigError, ConfigIssue};

/// Load configuration from a key=value file. A missing file is not an error:
/// the defaults apply. Any unknown key or unparseable value inside an existing
/// file fails construction with the full issue list.
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    if !path.exists() {
        warn!("Config file {:?} not found, using defaults", path);
        return Ok(AgentConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    config.validate()?;
    info!("Loaded configuration from {:?}", path);
    Ok(config)
}

/// Parse file content into a config. Lines are `key=value`; blank lines and
/// `#` comments are skipped; whitespace around key and value is trimmed.
pub fn parse_config(content: &str) -> Result<AgentConfig, ConfigError> {
    let mut config = AgentConfig::default();
    let mut issues = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "serial_port" => config.serial_port = value.to_string(),
            "baud_rate" => set_int(&mut config.baud_rate, key, value, &mut issues),
            "update_interval" => set_int(&mut config.update_interval, key, value, &mut issues),
            "timeout" => set_int(&mut config.timeout, key, value, &mut issues),
            "log_level" => config.log_level = value.to_uppercase(),
            "retry_attempts" => set_int(&mut config.retry_attempts, key, value, &mut issues),
            "retry_delay" => set_int(&mut config.retry_delay, key, value, &mut issues),
            "ups_name" => config.ups_name = value.to_string(),
            "enable_disk_monitoring" => config.enable_disk_monitoring = parse_bool(value),
            "enable_ups_monitoring" => config.enable_ups_monitoring = parse_bool(value),
            _ => issues.push(ConfigIssue {
                key: key.to_string(),
                message: "unknown key".to_string(),
            }),
        }
    }

    if issues.is_empty() {
        Ok(config)
    } else {
        Err(ConfigError::Invalid(issues))
    }
}

fn set_int<T: std::str::FromStr>(
    slot: &mut T,
    key: &str,
    value: &str,
    issues: &mut Vec<ConfigIssue>,
) {
    match value.parse::<T>() {
        Ok(parsed) => *slot = parsed,
        Err(_) => issues.push(ConfigIssue {
            key: key.to_string(),
            message: format!("invalid integer {value:?}"),
        }),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_content_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.serial_port, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.update_interval, 30);
        assert!(config.enable_disk_monitoring);
    }

    #[test]
    fn known_keys_override_defaults() {
        let content = "\
# serial settings
serial_port = /dev/ttyACM0
baud_rate=115200

update_interval=10
log_level=debug
enable_ups_monitoring=no
";
        let config = parse_config(content).unwrap();
        assert_eq!(config.serial_port, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.update_interval, 10);
        assert_eq!(config.log_level, "DEBUG");
        assert!(!config.enable_ups_monitoring);
        assert!(config.enable_disk_monitoring);
    }

    #[test]
    fn bad_integer_is_an_issue_not_a_fallback() {
        match parse_config("baud_rate=fast\n").unwrap_err() {
            ConfigError::Invalid(issues) => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].key, "baud_rate");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_retry_attempts_rejected() {
        assert!(parse_config("retry_attempts=-1\n").is_err());
    }

    #[test]
    fn unknown_key_reported() {
        match parse_config("serial_speed=9600\n").unwrap_err() {
            ConfigError::Invalid(issues) => {
                assert_eq!(issues[0].key, "serial_speed");
                assert_eq!(issues[0].message, "unknown key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bool_accepts_common_truthy_spellings() {
        for value in ["true", "1", "yes", "on", "YES", "On"] {
            assert!(parse_bool(value), "{value} should be true");
        }
        for value in ["false", "0", "off", "maybe", ""] {
            assert!(!parse_bool(value), "{value} should be false");
        }
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/statlink.cfg")).unwrap();
        assert_eq!(config.baud_rate, 9600);
    }

    #[test]
    fn file_with_invalid_log_level_fails_validation() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "log_level=LOUD").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn file_roundtrip() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "serial_port=/dev/ttyS1").unwrap();
        writeln!(file, "timeout=2").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.serial_port, "/dev/ttyS1");
        assert_eq!(config.timeout, 2);
    }
}
