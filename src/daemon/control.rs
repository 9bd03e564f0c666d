use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::Result;

use crate::daemon::pid::*;
use crate::daemon::systemd::is_systemd_service_active;
use crate::daemon::LOG_DIR;

pub fn start_daemon(log_level: Option<String>, config_file: Option<PathBuf>) -> Result<()> {
    if is_running() {
        eprintln!("ERROR: Agent is already running (PID: {:?})", get_pid()?);
        process::exit(1);
    }

    let exe_path = std::env::current_exe()?;

    println!(
        "\x1b[32mStarting statlink-agent v{} ({})\x1b[0m",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH
    );

    // Prepare log file
    ensure_directories()?;
    let log_path = format!("{}/agent.log", LOG_DIR);
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Spawn new process in daemon mode using --daemon-child (internal flag)
    let mut cmd = process::Command::new(&exe_path);
    cmd.arg("--daemon-child");

    if let Some(level) = log_level {
        cmd.arg("--log-level").arg(level);
    }
    if let Some(path) = config_file {
        cmd.arg("--config-file").arg(path);
    }

    let child = cmd
        .current_dir(std::env::current_dir()?)
        .stdin(process::Stdio::null())
        .stdout(log_file.try_clone()?)
        .stderr(log_file)
        .spawn()?;

    let pid = child.id();
    save_pid(pid)?;

    println!("Agent started successfully (PID: {})", pid);
    println!("Logs: tail -f {}/agent.log", LOG_DIR);

    Ok(())
}

pub fn stop_daemon() -> Result<()> {
    // If systemd is actively managing the process, delegate to systemctl to
    // prevent auto-restart from Restart=on-failure.
    if is_systemd_service_active() {
        println!("Agent is managed by systemd. Using systemctl stop...");
        let status = process::Command::new("systemctl")
            .args(["stop", "statlink-agent"])
            .status();

        match status {
            Ok(s) if s.success() => {
                println!("Agent stopped via systemd");
                return Ok(());
            }
            Ok(_) => {
                eprintln!("WARNING: systemctl stop failed, falling back to manual stop");
            }
            Err(e) => {
                eprintln!("WARNING: Could not run systemctl: {}, falling back to manual stop", e);
            }
        }
    }

    if !is_running() {
        eprintln!("WARNING: Agent is not running");
        process::exit(1);
    }

    if let Some(pid) = get_pid()? {
        println!("Stopping statlink-agent (PID: {})...", pid);
        terminate(pid);
        remove_pid_file()?;
        println!("Agent stopped");
    }

    Ok(())
}

pub fn restart_daemon(log_level: Option<String>, config_file: Option<PathBuf>) -> Result<()> {
    println!(
        "\x1b[32mRestarting statlink-agent v{} ({})\x1b[0m",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH
    );

    if is_systemd_service_active() {
        println!("Agent is managed by systemd. Using systemctl restart...");
        let status = process::Command::new("systemctl")
            .args(["restart", "statlink-agent"])
            .status();

        match status {
            Ok(s) if s.success() => {
                println!("Agent restarted via systemd");
                return Ok(());
            }
            Ok(_) => {
                eprintln!("WARNING: systemctl restart failed, falling back to manual restart");
            }
            Err(e) => {
                eprintln!("WARNING: Could not run systemctl: {}, falling back to manual restart", e);
            }
        }
    }

    if is_running() {
        if let Some(pid) = get_pid()? {
            println!("Stopping statlink-agent (PID: {})...", pid);
            terminate(pid);
            remove_pid_file()?;
            println!("Agent stopped");
        }
        std::thread::sleep(std::time::Duration::from_secs(1));
    } else {
        println!("Agent not running, starting it...");
    }

    start_daemon(log_level, config_file)
}

/// SIGTERM, a grace window for the shutdown sequence (the agent needs time
/// to notify the remote device and close the port), then SIGKILL.
fn terminate(pid: u32) {
    unsafe { libc::kill(pid as i32, libc::SIGTERM) };

    for _ in 0..10 {
        if !is_running() {
            return;
        }
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    println!("WARNING: Force killing agent...");
    unsafe { libc::kill(pid as i32, libc::SIGKILL) };
}
