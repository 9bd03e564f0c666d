//! Serial connection lifecycle: connect with retry, health query, framed
//! send, idempotent close.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::types::AgentConfig;
use crate::link::transport::{SerialConnection, SerialTransport};
use crate::message::Envelope;

/// Settle time after opening the port. Opening toggles DTR and resets most
/// microcontroller boards, so the firmware needs a moment before it listens.
pub const INIT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Degraded,
}

pub struct LinkManager {
    transport: Box<dyn SerialTransport>,
    connection: Option<Box<dyn SerialConnection>>,
    state: LinkState,
    retry_attempts: u32,
    retry_delay: Duration,
    init_delay: Duration,
}

impl LinkManager {
    pub fn new(transport: Box<dyn SerialTransport>, config: &AgentConfig) -> Self {
        Self {
            transport,
            connection: None,
            state: LinkState::Disconnected,
            retry_attempts: config.retry_attempts,
            retry_delay: Duration::from_secs(config.retry_delay),
            init_delay: INIT_DELAY,
        }
    }

    /// Attempt to connect up to `retry_attempts` times, sleeping `retry_delay`
    /// between attempts. Returns false only after every attempt failed.
    pub async fn connect(&mut self) -> bool {
        self.state = LinkState::Connecting;

        for attempt in 1..=self.retry_attempts {
            match self.transport.open().await {
                Ok(connection) => {
                    info!("Connected to {}", self.transport.describe());
                    self.connection = Some(connection);
                    // Let the remote device finish booting before first use.
                    tokio::time::sleep(self.init_delay).await;
                    self.state = LinkState::Connected;
                    return true;
                }
                Err(e) => {
                    error!(
                        "Serial connection attempt {}/{} failed: {}",
                        attempt, self.retry_attempts, e
                    );
                    if attempt < self.retry_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        self.state = LinkState::Disconnected;
        false
    }

    /// True iff the handle exists and reports open. Pure query.
    pub fn is_healthy(&self) -> bool {
        self.state == LinkState::Connected
            && self.connection.as_ref().is_some_and(|c| c.is_open())
    }

    /// Serialize the envelope to one newline-terminated JSON line and write
    /// it. Fails closed: an unhealthy link or any I/O error returns false and
    /// never propagates. I/O failure degrades the connection so the
    /// supervisory loop reconnects.
    pub async fn send(&mut self, envelope: &Envelope) -> bool {
        if !self.is_healthy() {
            warn!("Cannot send message: serial connection not available");
            return false;
        }

        let line = match serde_json::to_string(envelope) {
            Ok(json) => json + "\n",
            Err(e) => {
                error!("JSON encoding error: {}", e);
                return false;
            }
        };

        debug!("Sending {:?} ({} bytes)", envelope.kind, line.len());

        let Some(connection) = self.connection.as_mut() else {
            return false;
        };
        let result = async {
            connection.write_all(line.as_bytes()).await?;
            connection.flush().await
        }
        .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                error!("Serial error sending message: {}", e);
                self.state = LinkState::Degraded;
                self.connection = None;
                false
            }
        }
    }

    /// Idempotent close; only physically closes an open handle.
    pub async fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            if let Err(e) = connection.close().await {
                error!("Error closing serial connection: {}", e);
            } else {
                info!("Serial connection closed");
            }
        }
        self.state = LinkState::Disconnected;
    }

    #[cfg(test)]
    pub(crate) fn set_init_delay(&mut self, delay: Duration) {
        self.init_delay = delay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::StubTransport;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn fast_config() -> AgentConfig {
        AgentConfig {
            retry_attempts: 3,
            retry_delay: 0,
            ..AgentConfig::default()
        }
    }

    fn manager_with(transport: StubTransport, config: &AgentConfig) -> LinkManager {
        let mut manager = LinkManager::new(Box::new(transport), config);
        manager.set_init_delay(Duration::ZERO);
        manager
    }

    #[tokio::test]
    async fn connect_retries_until_success() {
        let transport = StubTransport::new(2);
        let attempts = Arc::clone(&transport.attempts);
        let mut manager = manager_with(transport, &fast_config());

        assert!(manager.connect().await);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(manager.is_healthy());
    }

    #[tokio::test]
    async fn connect_gives_up_after_all_attempts() {
        let transport = StubTransport::new(10);
        let attempts = Arc::clone(&transport.attempts);
        let mut manager = manager_with(transport, &fast_config());

        assert!(!manager.connect().await);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(!manager.is_healthy());
    }

    #[tokio::test]
    async fn send_without_connection_fails_closed() {
        let transport = StubTransport::new(0);
        let written = Arc::clone(&transport.written);
        let mut manager = manager_with(transport, &fast_config());

        assert!(!manager.send(&Envelope::startup()).await);
        assert!(written.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_writes_one_newline_terminated_json_line() {
        let transport = StubTransport::new(0);
        let written = Arc::clone(&transport.written);
        let mut manager = manager_with(transport, &fast_config());

        assert!(manager.connect().await);
        assert!(manager.send(&Envelope::startup()).await);

        let lines = written.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(lines[0].trim()).unwrap();
        assert_eq!(value["type"], "system_startup");
        assert_eq!(value["data"]["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let transport = StubTransport::new(0);
        let closed = Arc::clone(&transport.closed);
        let mut manager = manager_with(transport, &fast_config());

        assert!(manager.connect().await);
        manager.close().await;
        manager.close().await;
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(!manager.is_healthy());
    }
}
