//! Orchestrator: periodic publishing, array transition watching, link
//! supervision, and shutdown sequencing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::types::AgentConfig;
use crate::hardware::SystemSensors;
use crate::link::LinkManager;
use crate::message::{ArrayStatus, Envelope};
use crate::status::StatusBuilder;

const ARRAY_CHECK_INTERVAL: Duration = Duration::from_secs(10);
const MAIN_LOOP_INTERVAL: Duration = Duration::from_secs(1);
/// Bounded wait per task at shutdown. External command timeouts are kept
/// well under this so an in-flight sample can finish.
const TASK_JOIN_WAIT: Duration = Duration::from_secs(15);
/// Pause between the shutdown notice and closing the port, so the remote
/// device can process the final message.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

/// Tracks the last observed array status and yields a delta when it changes.
/// The first observation only establishes the baseline.
pub struct ArrayWatcher {
    last: Option<ArrayStatus>,
}

impl ArrayWatcher {
    pub fn new() -> Self {
        Self { last: None }
    }

    pub fn observe(&mut self, current: ArrayStatus) -> Option<(ArrayStatus, ArrayStatus)> {
        let delta = match self.last {
            Some(previous) if previous != current => Some((previous, current)),
            _ => None,
        };
        self.last = Some(current);
        delta
    }
}

impl Default for ArrayWatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// The only component with mutable lifecycle state. Owns the link and the
/// two periodic tasks; nothing else may reconnect or shut down.
pub struct Controller {
    config: Arc<AgentConfig>,
    sensors: Arc<dyn SystemSensors>,
    link: Arc<Mutex<LinkManager>>,
    running: Arc<AtomicBool>,
    shutdown_started: AtomicBool,
    state: std::sync::Mutex<ControllerState>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    pub fn new(
        config: Arc<AgentConfig>,
        sensors: Arc<dyn SystemSensors>,
        link: LinkManager,
    ) -> Self {
        Self {
            config,
            sensors,
            link: Arc::new(Mutex::new(link)),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_started: AtomicBool::new(false),
            state: std::sync::Mutex::new(ControllerState::Idle),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> ControllerState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, state: ControllerState) {
        debug!("Controller state -> {:?}", state);
        *self.state.lock().unwrap() = state;
    }

    /// Thin adapter for signal handlers: clears the running flag and nothing
    /// else. The supervisory loop notices within one tick and runs the
    /// shutdown sequence.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Main execution: connect, announce startup, spawn the periodic tasks,
    /// then supervise the link until shutdown.
    pub async fn run(&self) -> Result<()> {
        self.set_state(ControllerState::Starting);

        if !self.link.lock().await.connect().await {
            self.set_state(ControllerState::Stopped);
            anyhow::bail!("failed to connect to {}", self.config.serial_port);
        }

        self.running.store(true, Ordering::SeqCst);
        self.set_state(ControllerState::Running);

        // Startup notice goes out before the first status update. Best
        // effort: the agent still runs if the remote device missed it.
        if !self.link.lock().await.send(&Envelope::startup()).await {
            warn!("Failed to send startup notification");
        }

        self.spawn_status_publisher().await;
        self.spawn_array_watcher().await;

        info!("Agent is running");

        while self.running.load(Ordering::SeqCst) {
            tokio::time::sleep(MAIN_LOOP_INTERVAL).await;

            let mut link = self.link.lock().await;
            if link.is_healthy() || !self.running.load(Ordering::SeqCst) {
                continue;
            }

            warn!("Serial connection lost, attempting to reconnect...");
            if !link.connect().await {
                drop(link);
                error!("Failed to reconnect, will retry...");
                tokio::time::sleep(Duration::from_secs(self.config.retry_delay)).await;
            }
        }

        self.shutdown().await;
        Ok(())
    }

    async fn spawn_status_publisher(&self) {
        let builder = StatusBuilder::new(Arc::clone(&self.config), Arc::clone(&self.sensors));
        let link = Arc::clone(&self.link);
        let running = Arc::clone(&self.running);
        let interval = Duration::from_secs(self.config.update_interval);

        let handle = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                let record = builder.build().await;
                if !link.lock().await.send(&Envelope::status(record)).await {
                    warn!("Status update not delivered");
                }
                tokio::time::sleep(interval).await;
            }
            debug!("Status publish task exited");
        });

        self.tasks.lock().await.push(handle);
    }

    async fn spawn_array_watcher(&self) {
        let sensors = Arc::clone(&self.sensors);
        let link = Arc::clone(&self.link);
        let running = Arc::clone(&self.running);

        let handle = tokio::spawn(async move {
            let mut watcher = ArrayWatcher::new();
            while running.load(Ordering::SeqCst) {
                let current = sensors.array_status().await;
                if let Some((previous, current)) = watcher.observe(current) {
                    info!("Array status changed: {:?} -> {:?}", previous, current);
                    let envelope = Envelope::array_change(previous, current);
                    if !link.lock().await.send(&envelope).await {
                        warn!("Array status change not delivered");
                    }
                }
                tokio::time::sleep(ARRAY_CHECK_INTERVAL).await;
            }
            debug!("Array watch task exited");
        });

        self.tasks.lock().await.push(handle);
    }

    /// Graceful shutdown. Idempotent: concurrent or repeated calls run the
    /// sequence exactly once. The shutdown notice is attempted strictly
    /// before the link closes.
    pub async fn shutdown(&self) {
        if self.shutdown_started.swap(true, Ordering::SeqCst) {
            return;
        }

        self.set_state(ControllerState::ShuttingDown);
        info!("Shutting down agent...");

        if !self
            .link
            .lock()
            .await
            .send(&Envelope::shutdown("service_stop"))
            .await
        {
            warn!("Failed to send shutdown notification");
        }

        self.running.store(false, Ordering::SeqCst);

        let handles: Vec<JoinHandle<()>> = self.tasks.lock().await.drain(..).collect();
        for mut handle in handles {
            match tokio::time::timeout(TASK_JOIN_WAIT, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Task ended abnormally: {}", e),
                Err(_) => {
                    warn!("Task did not finish within {:?}, aborting", TASK_JOIN_WAIT);
                    handle.abort();
                }
            }
        }

        // Give the remote device time to process the shutdown notice.
        tokio::time::sleep(SHUTDOWN_GRACE).await;
        self.link.lock().await.close().await;

        self.set_state(ControllerState::Stopped);
        info!("Agent stopped");
    }
}
