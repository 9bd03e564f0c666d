//! Configuration struct, defaults, and validation.

use serde::Serialize;
use thiserror::Error;

pub const VALID_LOG_LEVELS: &[&str] =
    &["TRACE", "DEBUG", "INFO", "WARN", "WARNING", "ERROR", "CRITICAL"];

/// One rejected key from the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub key: String,
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {}", format_issues(.0))]
    Invalid(Vec<ConfigIssue>),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

fn format_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Agent settings. All durations are whole seconds, matching the file format.
#[derive(Debug, Clone, Serialize)]
pub struct AgentConfig {
    pub serial_port: String,
    pub baud_rate: u32,
    pub update_interval: u64,
    pub timeout: u64,
    pub log_level: String,
    pub retry_attempts: u32,
    pub retry_delay: u64,
    pub ups_name: String,
    pub enable_disk_monitoring: bool,
    pub enable_ups_monitoring: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            serial_port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            update_interval: 30,
            timeout: 5,
            log_level: "INFO".to_string(),
            retry_attempts: 3,
            retry_delay: 5,
            ups_name: "ups".to_string(),
            enable_disk_monitoring: true,
            enable_ups_monitoring: true,
        }
    }
}

impl AgentConfig {
    /// Validate ranges and enums. Collects every problem instead of stopping
    /// at the first one, so a bad file is reported in a single pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut issues = Vec::new();

        if self.baud_rate == 0 {
            issues.push(ConfigIssue {
                key: "baud_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.update_interval == 0 {
            issues.push(ConfigIssue {
                key: "update_interval".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.timeout == 0 {
            issues.push(ConfigIssue {
                key: "timeout".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if !VALID_LOG_LEVELS.contains(&self.log_level.to_uppercase().as_str()) {
            issues.push(ConfigIssue {
                key: "log_level".to_string(),
                message: format!(
                    "must be one of {} (got {:?})",
                    VALID_LOG_LEVELS.join(", "),
                    self.log_level
                ),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(issues))
        }
    }

    /// Map the configured level to a tracing filter directive.
    /// CRITICAL has no tracing equivalent and maps to ERROR.
    pub fn tracing_filter(&self) -> &'static str {
        match self.log_level.to_lowercase().as_str() {
            "critical" => "error",
            "trace" => "trace",
            "debug" => "debug",
            "warn" | "warning" => "warn",
            "error" => "error",
            _ => "info",
        }
    }
}
