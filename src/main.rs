//! Statlink agent entry point: CLI dispatch, signal handlers, async runtime.

mod app;
mod config;
mod controller;
mod daemon;
mod hardware;
mod link;
mod message;
mod status;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, info};

use app::cli::{Args, HELP_TEXT};
use app::logging::init_tracing;
use config::file::load_config;
use config::DEFAULT_CONFIG_PATH;
use controller::Controller;
use daemon::control::{restart_daemon, start_daemon, stop_daemon};
use daemon::pid::{ensure_directories, get_pid, remove_pid_file, save_pid};
use daemon::status::show_status;
use daemon::LOG_DIR;
use hardware::LinuxSensors;
use link::manager::LinkManager;
use link::transport::TokioSerialTransport;
use status::StatusBuilder;

#[cfg(target_os = "linux")]
use daemon::systemd::{install_systemd_service, uninstall_systemd_service};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse arguments with custom error handling
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            if err.kind() == clap::error::ErrorKind::DisplayHelp {
                print!("{}", HELP_TEXT);
                std::process::exit(0);
            }
            // Custom version output with architecture (green)
            if err.kind() == clap::error::ErrorKind::DisplayVersion {
                println!(
                    "\x1b[32mstatlink-agent {} ({})\x1b[0m",
                    env!("CARGO_PKG_VERSION"),
                    std::env::consts::ARCH
                );
                std::process::exit(0);
            }

            eprintln!("{}", err);
            print!("{}", HELP_TEXT);
            eprintln!("\nFor more information, try '--help'.");
            std::process::exit(1);
        }
    };

    // Handle management commands first (before async setup)
    if args.start {
        return start_daemon(args.log_level, args.config_file); // Spawns new process and exits
    }

    if args.stop {
        return stop_daemon();
    }

    if args.restart {
        return restart_daemon(args.log_level, args.config_file);
    }

    if args.status {
        return show_status(args.config_file.as_deref());
    }

    #[cfg(target_os = "linux")]
    if args.install_service {
        return install_systemd_service();
    }

    #[cfg(target_os = "linux")]
    if args.uninstall_service {
        return uninstall_systemd_service();
    }

    if let Some(lines) = args.log_show {
        let log_path = format!("{}/agent.log", LOG_DIR);
        let mut cmd = std::process::Command::new("tail");

        match lines {
            Some(n) => {
                println!("Showing last {} log entries...", n);
                cmd.arg("-n").arg(n.to_string());
            }
            None => {
                println!("Showing live agent logs (Ctrl+C to exit)...");
                cmd.arg("-f");
            }
        }

        cmd.arg(&log_path);
        let status = cmd.status()?;
        std::process::exit(status.code().unwrap_or(1));
    }

    // Load configuration before logging is up: a broken config file must
    // fail construction, and the log level may come from it.
    let config_path = args
        .config_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = load_config(&config_path)?;

    // Log level priority: 1. --log-level flag, 2. LOG_LEVEL env, 3. config
    let filter = if let Some(level) = args.log_level.as_ref() {
        flag_filter(level)
    } else if let Ok(env_level) = std::env::var("LOG_LEVEL") {
        flag_filter(&env_level)
    } else {
        config.tracing_filter()
    };
    init_tracing(filter);

    info!(
        "Statlink Agent v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    );
    info!("Configuration: {:?}", config_path);
    log_wire_schema();

    // If we're a daemon child, save our PID
    if args.daemon_child {
        ensure_directories()?;
        save_pid(std::process::id())?;
    }

    // Show config if requested
    if args.config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let config = Arc::new(config);
    let sensors = Arc::new(LinuxSensors::new());

    // Test mode: sample one record and print it, no serial link involved
    if args.test {
        info!("Running in test mode");
        let builder = StatusBuilder::new(Arc::clone(&config), sensors);
        let record = builder.build().await;
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    if !args.daemon_child && !args.foreground {
        eprintln!("ERROR: No command specified. You must specify a command.");
        eprintln!();
        print!("{}", HELP_TEXT);
        eprintln!("Common commands:");
        eprintln!("  ./statlink-agent --start        Start the agent");
        eprintln!("  ./statlink-agent --foreground   Run in the foreground");
        eprintln!("  ./statlink-agent -i             Show status");
        eprintln!("  ./statlink-agent -l             View logs");
        std::process::exit(1);
    }

    let transport = TokioSerialTransport::new(&config);
    let link = LinkManager::new(Box::new(transport), &config);
    let controller = Arc::new(Controller::new(Arc::clone(&config), sensors, link));

    // Signal handling is a thin adapter: it clears the running flag and
    // nothing else; the controller sequences the actual shutdown.
    let signal_controller = Arc::clone(&controller);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Shutdown signal received");
        signal_controller.stop();
    });

    let result = controller.run().await;
    if let Err(e) = &result {
        error!("Agent error: {}", e);
    }

    // Clean up PID file after shutdown
    if let Ok(Some(pid)) = get_pid() {
        if pid == std::process::id() {
            let _ = remove_pid_file();
            info!("PID file cleaned up");
        }
    }

    info!("Agent shutdown complete");
    result
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
}

/// Map a user-supplied level to a tracing filter, falling back to info.
fn flag_filter(level: &str) -> &'static str {
    match level.to_lowercase().as_str() {
        "critical" => "error", // CRITICAL maps to ERROR level (most severe)
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => {
            eprintln!(
                "Invalid log level '{}'. Using INFO. Valid levels: TRACE, DEBUG, INFO, WARN, ERROR, CRITICAL",
                level
            );
            "info"
        }
    }
}

/// Log the wire schema once so the firmware side can be debugged against
/// what this build actually sends.
fn log_wire_schema() {
    debug!("=== Wire Message Schema ===");
    for (field, description) in message::WIRE_SCHEMA {
        debug!("  {}: {}", field, description);
    }
}
