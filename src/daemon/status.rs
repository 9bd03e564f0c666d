//! `--status` console output.

use std::path::Path;

use anyhow::Result;

use crate::config::file::load_config;
use crate::config::DEFAULT_CONFIG_PATH;
use crate::daemon::pid::{get_pid, is_running};
use crate::daemon::systemd::is_systemd_service_active;
use crate::daemon::LOG_DIR;

pub fn show_status(config_file: Option<&Path>) -> Result<()> {
    println!(
        "\x1b[32mstatlink-agent v{} ({})\x1b[0m",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH
    );

    if is_running() {
        let pid = get_pid()?.unwrap_or(0);
        println!("Status:  running (PID: {})", pid);
    } else {
        println!("Status:  stopped");
    }

    if is_systemd_service_active() {
        println!("Service: active (systemd)");
    }

    let config_path = config_file.unwrap_or(Path::new(DEFAULT_CONFIG_PATH));
    match load_config(config_path) {
        Ok(config) => {
            println!("Port:    {} @ {} baud", config.serial_port, config.baud_rate);
            println!("Update:  every {}s", config.update_interval);
            println!(
                "Monitors: disks={} ups={} (ups name: {})",
                config.enable_disk_monitoring, config.enable_ups_monitoring, config.ups_name
            );
        }
        Err(e) => println!("Config:  ERROR - {}", e),
    }

    println!("Logs:    {}/agent.log", LOG_DIR);
    Ok(())
}
