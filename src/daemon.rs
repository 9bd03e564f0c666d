//! Daemon management constants and submodule re-exports.

pub mod control;
pub mod pid;
pub mod status;
pub mod systemd;

pub const PID_FILE: &str = "/run/statlink/statlink-agent.pid";
pub const LOG_DIR: &str = "/var/log/statlink";
pub const SYSTEMD_SERVICE_PATH: &str = "/etc/systemd/system/statlink-agent.service";

pub const SYSTEMD_SERVICE_TEMPLATE: &str = r#"[Unit]
Description=Statlink Serial Status Bridge Agent
After=network.target

[Service]
Type=forking
ExecStart={{EXEC_PATH}} --start
ExecStop={{EXEC_PATH}} --stop
ExecReload={{EXEC_PATH}} --restart
PIDFile=/run/statlink/statlink-agent.pid
Restart=on-failure
RestartSec=10
User=root
WorkingDirectory={{WORK_DIR}}
StandardOutput=journal
StandardError=journal

[Install]
WantedBy=multi-user.target
"#;
