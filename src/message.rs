//! Wire data model: envelope framing and the status record schema.

use serde::{Deserialize, Serialize};

/// Disk health verdicts, worst to best. The wire strings match what
/// smartctl prints, so they pass through unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "FAILING_NOW")]
    FailingNow,
    #[serde(rename = "PRE-FAIL")]
    PreFail,
    #[serde(rename = "OLD_AGE")]
    OldAge,
    #[serde(rename = "PASSED")]
    Passed,
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl HealthStatus {
    /// Priority for worst-health reduction: lower is worse.
    pub fn priority(self) -> u8 {
        match self {
            HealthStatus::Failed => 0,
            HealthStatus::FailingNow => 1,
            HealthStatus::PreFail => 2,
            HealthStatus::OldAge => 3,
            HealthStatus::Passed => 4,
            HealthStatus::Ok => 5,
            HealthStatus::Unknown => 6,
        }
    }

    pub fn worse(self, other: HealthStatus) -> HealthStatus {
        if other.priority() < self.priority() {
            other
        } else {
            self
        }
    }
}

/// Storage array lifecycle state as exposed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayStatus {
    Started,
    Stopped,
    Transitioning,
    Unknown,
}

/// Device class partition used by the aggregation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Conventional,
    Nvme,
}

/// One sampled storage device. Built fresh each tick, never mutated.
#[derive(Debug, Clone)]
pub struct DeviceReading {
    pub identifier: String,
    pub capacity_gb: u64,
    pub temperature_c: Option<f64>,
    pub health: HealthStatus,
    pub class: DeviceClass,
}

/// UPS reading as reported by NUT, or the unavailable default.
#[derive(Debug, Clone)]
pub struct UpsReading {
    pub online: bool,
    pub battery_pct: Option<i64>,
    pub load_pct: Option<i64>,
    pub runtime_minutes: Option<i64>,
    pub status: String,
}

impl UpsReading {
    pub fn unavailable() -> Self {
        Self {
            online: false,
            battery_pct: None,
            load_pct: None,
            runtime_minutes: None,
            status: "UNAVAILABLE".to_string(),
        }
    }
}

/// The periodic status record. Field names are spelled out here; the wire
/// carries the short codes the microcontroller firmware parses. Optional
/// readings serialize as null so the wire shape stays fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    #[serde(rename = "ts")]
    pub timestamp: String,
    #[serde(rename = "up")]
    pub uptime_seconds: u64,
    #[serde(rename = "ct")]
    pub cpu_temperature_c: Option<f64>,
    #[serde(rename = "as")]
    pub array_status: ArrayStatus,
    #[serde(rename = "d_temp")]
    pub disk_max_temp_c: Option<f64>,
    #[serde(rename = "d_cap")]
    pub disk_total_capacity_gb: u64,
    #[serde(rename = "d_health")]
    pub disk_worst_health: HealthStatus,
    #[serde(rename = "d_count")]
    pub disk_count: usize,
    #[serde(rename = "n_temp")]
    pub nvme_max_temp_c: Option<f64>,
    #[serde(rename = "n_cap")]
    pub nvme_total_capacity_gb: u64,
    #[serde(rename = "n_health")]
    pub nvme_worst_health: HealthStatus,
    #[serde(rename = "n_count")]
    pub nvme_count: usize,
    pub ups_online: bool,
    #[serde(rename = "ups_batt")]
    pub ups_battery_pct: Option<i64>,
    #[serde(rename = "ups_load")]
    pub ups_load_pct: Option<i64>,
    #[serde(rename = "ups_runtime")]
    pub ups_runtime_minutes: Option<i64>,
    pub ups_status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    SystemStartup,
    StatusUpdate,
    ArrayStatusChange,
    SystemShutdown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Startup { version: String },
    Status(StatusRecord),
    ArrayChange {
        previous_status: ArrayStatus,
        current_status: ArrayStatus,
    },
    Shutdown { reason: String },
}

/// Every outbound transmission: one JSON object per line on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub timestamp: String,
    pub data: Payload,
}

impl Envelope {
    fn new(kind: MessageKind, data: Payload) -> Self {
        Self {
            kind,
            timestamp: chrono::Local::now().to_rfc3339(),
            data,
        }
    }

    pub fn startup() -> Self {
        Self::new(
            MessageKind::SystemStartup,
            Payload::Startup {
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        )
    }

    pub fn status(record: StatusRecord) -> Self {
        Self::new(MessageKind::StatusUpdate, Payload::Status(record))
    }

    pub fn array_change(previous: ArrayStatus, current: ArrayStatus) -> Self {
        Self::new(
            MessageKind::ArrayStatusChange,
            Payload::ArrayChange {
                previous_status: previous,
                current_status: current,
            },
        )
    }

    pub fn shutdown(reason: &str) -> Self {
        Self::new(
            MessageKind::SystemShutdown,
            Payload::Shutdown {
                reason: reason.to_string(),
            },
        )
    }
}

/// Wire schema reference, logged once at startup so the firmware side can be
/// debugged against what the agent actually sends.
pub const WIRE_SCHEMA: &[(&str, &str)] = &[
    ("ts", "timestamp (ISO-8601)"),
    ("up", "uptime (seconds)"),
    ("ct", "cpu temperature (°C, nullable)"),
    ("as", "array status (started/stopped/transitioning/unknown)"),
    ("d_temp", "max disk temperature (°C, nullable)"),
    ("d_cap", "total disk capacity (GB)"),
    ("d_health", "worst disk health (PASSED/FAILED/...)"),
    ("d_count", "disk count"),
    ("n_temp", "max nvme temperature (°C, nullable)"),
    ("n_cap", "total nvme capacity (GB)"),
    ("n_health", "worst nvme health (PASSED/FAILED/...)"),
    ("n_count", "nvme count"),
    ("ups_online", "ups online (boolean)"),
    ("ups_batt", "ups battery percentage (nullable)"),
    ("ups_load", "ups load percentage (nullable)"),
    ("ups_runtime", "ups runtime (minutes, nullable)"),
    ("ups_status", "ups status string"),
];
