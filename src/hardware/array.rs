//! Storage array status resolution.
//!
//! Four probes in fixed priority order, each with three possible outcomes:
//! a confident answer, inconclusive, or failed. The first confident answer
//! wins. Exhausting all probes without an answer means `stopped`, unless
//! every single probe failed, in which case we genuinely cannot tell.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use crate::hardware::exec::run_command;
use crate::message::ArrayStatus;

const VAR_INI_PATH: &str = "/var/local/emhttp/var.ini";
const MDCMD_TIMEOUT: Duration = Duration::from_secs(5);

enum Probe {
    Confident(ArrayStatus),
    Inconclusive,
    Failed,
}

pub async fn read_array_status() -> ArrayStatus {
    let probes = [
        probe_var_ini(),
        probe_mounts(),
        probe_mdcmd().await,
        probe_mdstat(),
    ];

    let mut any_completed = false;
    for probe in probes {
        match probe {
            Probe::Confident(status) => return status,
            Probe::Inconclusive => any_completed = true,
            Probe::Failed => {}
        }
    }

    if any_completed {
        ArrayStatus::Stopped
    } else {
        warn!("All array status probes failed");
        ArrayStatus::Unknown
    }
}

/// Primary source: the management daemon's state file.
fn probe_var_ini() -> Probe {
    let path = Path::new(VAR_INI_PATH);
    if !path.exists() {
        return Probe::Inconclusive;
    }
    match std::fs::read_to_string(path) {
        Ok(content) => match parse_md_state(&content) {
            Some(status) => Probe::Confident(status),
            None => Probe::Inconclusive,
        },
        Err(e) => {
            debug!("Failed to read {}: {}", VAR_INI_PATH, e);
            Probe::Failed
        }
    }
}

/// Extract and map the mdState= line from the state file content.
pub fn parse_md_state(content: &str) -> Option<ArrayStatus> {
    for line in content.lines() {
        if let Some(value) = line.strip_prefix("mdState=") {
            let state = value.trim().trim_matches('"');
            return Some(match state {
                "STARTED" => ArrayStatus::Started,
                "STOPPED" => ArrayStatus::Stopped,
                "STARTING" | "STOPPING" => ArrayStatus::Transitioning,
                other => {
                    debug!("Unrecognized mdState value: {:?}", other);
                    ArrayStatus::Unknown
                }
            });
        }
    }
    None
}

/// Secondary: the user share mount plus at least one mounted member disk
/// means the array is up. Absence proves nothing.
fn probe_mounts() -> Probe {
    if !is_mount_point(Path::new("/mnt/user")) {
        return Probe::Inconclusive;
    }
    match glob::glob("/mnt/disk*") {
        Ok(paths) => {
            for disk_path in paths.filter_map(Result::ok) {
                if is_mount_point(&disk_path) {
                    return Probe::Confident(ArrayStatus::Started);
                }
            }
            Probe::Inconclusive
        }
        Err(e) => {
            debug!("Mount glob failed: {}", e);
            Probe::Failed
        }
    }
}

/// A path is a mount point when it sits on a different device than its
/// parent directory.
#[cfg(unix)]
fn is_mount_point(path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    let Some(parent) = path.parent() else {
        return false;
    };
    match std::fs::metadata(parent) {
        Ok(parent_meta) => meta.dev() != parent_meta.dev(),
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_mount_point(_path: &Path) -> bool {
    false
}

/// Third: ask the array management command directly.
async fn probe_mdcmd() -> Probe {
    match run_command("mdcmd", &["status"], MDCMD_TIMEOUT).await {
        Some(output) => {
            let output = output.to_lowercase();
            if output.contains("started") {
                Probe::Confident(ArrayStatus::Started)
            } else if output.contains("stopped") {
                Probe::Confident(ArrayStatus::Stopped)
            } else {
                Probe::Inconclusive
            }
        }
        None => Probe::Failed,
    }
}

/// Last resort: an active md device in the kernel status file.
fn probe_mdstat() -> Probe {
    let path = Path::new("/proc/mdstat");
    if !path.exists() {
        return Probe::Inconclusive;
    }
    match std::fs::read_to_string(path) {
        Ok(mdstat) => {
            if mdstat.contains("md") && mdstat.contains("active") {
                Probe::Confident(ArrayStatus::Started)
            } else {
                Probe::Inconclusive
            }
        }
        Err(e) => {
            debug!("Failed to read /proc/mdstat: {}", e);
            Probe::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md_state_maps_management_states() {
        assert_eq!(
            parse_md_state("sbName=\"x\"\nmdState=\"STARTED\"\n"),
            Some(ArrayStatus::Started)
        );
        assert_eq!(
            parse_md_state("mdState=\"STOPPED\""),
            Some(ArrayStatus::Stopped)
        );
        assert_eq!(
            parse_md_state("mdState=\"STARTING\""),
            Some(ArrayStatus::Transitioning)
        );
        assert_eq!(
            parse_md_state("mdState=\"STOPPING\""),
            Some(ArrayStatus::Transitioning)
        );
    }

    #[test]
    fn md_state_handles_unquoted_and_unknown() {
        assert_eq!(parse_md_state("mdState=STARTED"), Some(ArrayStatus::Started));
        assert_eq!(
            parse_md_state("mdState=\"RESYNCING\""),
            Some(ArrayStatus::Unknown)
        );
    }

    #[test]
    fn missing_md_state_line_is_inconclusive() {
        assert_eq!(parse_md_state("sbName=\"x\"\ncsrf_token=\"y\"\n"), None);
        assert_eq!(parse_md_state(""), None);
    }
}
