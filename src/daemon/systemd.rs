//! systemd service installation helpers.

use std::fs;
use std::process;

use anyhow::{Context, Result};

use crate::daemon::{SYSTEMD_SERVICE_PATH, SYSTEMD_SERVICE_TEMPLATE};

pub fn install_systemd_service() -> Result<()> {
    let exe_path = std::env::current_exe()?;
    let work_dir = exe_path
        .parent()
        .context("Cannot determine executable directory")?;

    let unit = SYSTEMD_SERVICE_TEMPLATE
        .replace("{{EXEC_PATH}}", &exe_path.to_string_lossy())
        .replace("{{WORK_DIR}}", &work_dir.to_string_lossy());

    fs::write(SYSTEMD_SERVICE_PATH, unit)
        .with_context(|| format!("Failed to write {}", SYSTEMD_SERVICE_PATH))?;

    run_systemctl(&["daemon-reload"])?;
    run_systemctl(&["enable", "statlink-agent"])?;

    println!("Systemd service installed: {}", SYSTEMD_SERVICE_PATH);
    println!("The agent will start automatically on boot.");
    println!("Start it now with: systemctl start statlink-agent");
    Ok(())
}

pub fn uninstall_systemd_service() -> Result<()> {
    // Stop and disable first so the unit file is not busy
    let _ = run_systemctl(&["stop", "statlink-agent"]);
    let _ = run_systemctl(&["disable", "statlink-agent"]);

    if std::path::Path::new(SYSTEMD_SERVICE_PATH).exists() {
        fs::remove_file(SYSTEMD_SERVICE_PATH)
            .with_context(|| format!("Failed to remove {}", SYSTEMD_SERVICE_PATH))?;
    }
    run_systemctl(&["daemon-reload"])?;

    println!("Systemd service uninstalled");
    Ok(())
}

pub fn is_systemd_service_active() -> bool {
    process::Command::new("systemctl")
        .args(["is-active", "--quiet", "statlink-agent"])
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn run_systemctl(args: &[&str]) -> Result<()> {
    let status = process::Command::new("systemctl")
        .args(args)
        .status()
        .with_context(|| format!("Failed to run systemctl {}", args.join(" ")))?;
    if !status.success() {
        anyhow::bail!("systemctl {} failed with {}", args.join(" "), status);
    }
    Ok(())
}
