//! Command-line argument definitions (clap) and help text.

use clap::Parser;

pub const HELP_TEXT: &str = "
Statlink Serial Status Bridge Agent
Usage: statlink-agent [OPTIONS]

Options:
  -h, --help                    Print help
  -V, --version                 Print version
Service:
  -I, --install-service         Install systemd service for auto-start on boot
  -U, --uninstall-service       Uninstall systemd service
Daemon Control:
  -s, --start                   Start the agent daemon in background
  -x, --stop                    Stop the agent daemon
  -r, --restart                 Restart the agent daemon
Status & Logs:
  -i, --status                  Show agent status
  -l, --log-show [<LOG_SHOW>]   Show agent logs (tail -f by default, or tail -n <lines> if provided)
      --log-level <LOG_LEVEL>   Set log level (TRACE, DEBUG, INFO, WARN, ERROR, CRITICAL)
Config & Debug:
  -c, --config                  Show current configuration
  -f, --config-file <PATH>      Use an alternate config file
      --test                    Test mode (sample one status record and print it)
";

#[derive(Parser, Debug)]
#[command(name = "statlink-agent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Statlink Serial Status Bridge Agent", long_about = None)]
pub struct Args {
    // === Service ===
    /// Install systemd service for auto-start on boot
    #[arg(short = 'I', long = "install-service", help_heading = "Service")]
    pub install_service: bool,

    /// Uninstall systemd service
    #[arg(short = 'U', long = "uninstall-service", help_heading = "Service")]
    pub uninstall_service: bool,

    // === Daemon Control ===
    /// Start the agent daemon in background
    #[arg(short = 's', long, help_heading = "Daemon Control")]
    pub start: bool,

    /// Stop the agent daemon
    #[arg(short = 'x', long, help_heading = "Daemon Control")]
    pub stop: bool,

    /// Restart the agent daemon
    #[arg(short = 'r', long, help_heading = "Daemon Control")]
    pub restart: bool,

    // === Status & Logs ===
    /// Show agent status
    #[arg(short = 'i', long = "status", help_heading = "Status & Logs")]
    pub status: bool,

    /// Show agent logs (tail -f by default, or tail -n <lines> if provided)
    #[arg(short = 'l', long = "log-show", help_heading = "Status & Logs")]
    pub log_show: Option<Option<usize>>,

    /// Set log level (TRACE, DEBUG, INFO, WARN, ERROR, CRITICAL)
    #[arg(long = "log-level", help_heading = "Status & Logs")]
    pub log_level: Option<String>,

    // === Config & Debug ===
    /// Show current configuration
    #[arg(short = 'c', long, help_heading = "Config & Debug")]
    pub config: bool,

    /// Use an alternate config file
    #[arg(short = 'f', long = "config-file", help_heading = "Config & Debug")]
    pub config_file: Option<std::path::PathBuf>,

    /// Test mode (sample one status record and print it)
    #[arg(long, help_heading = "Config & Debug")]
    pub test: bool,

    /// Run in the foreground without daemonizing
    #[arg(long, help_heading = "Config & Debug")]
    pub foreground: bool,

    /// Internal flag for daemon child process (do not use directly)
    #[arg(long, hide = true)]
    pub daemon_child: bool,
}
