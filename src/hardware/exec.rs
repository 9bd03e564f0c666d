//! Bounded external command adapter.
//!
//! Every query tool the agent shells out to (lsblk, smartctl, upsc, mdcmd)
//! goes through here, so no invocation can outlive its timeout and hold up
//! a sampling tick or the shutdown join.

use std::time::Duration;

use tracing::{debug, trace};

/// Run a command and return its trimmed stdout, or None on any failure:
/// missing binary, non-zero exit, or timeout. Failures are logged at debug
/// level only, since absent tools are normal on many hosts.
pub async fn run_command(program: &str, args: &[&str], timeout: Duration) -> Option<String> {
    trace!("Executing: {} {}", program, args.join(" "));

    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args);

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            debug!("Command {} failed to spawn: {}", program, e);
            return None;
        }
        Err(_) => {
            debug!("Command {} timed out after {:?}", program, timeout);
            return None;
        }
    };

    if !output.status.success() {
        debug!(
            "Command {} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return None;
    }

    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
