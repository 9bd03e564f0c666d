//! Serial transport seam.
//!
//! The manager only ever sees these traits; production wires them to a
//! tokio-serial stream, tests wire them to in-memory stubs.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio_serial::SerialPortBuilderExt;

use crate::config::types::AgentConfig;

/// An open serial connection. Writes are bounded by the port timeout
/// configured at open time.
#[async_trait]
pub trait SerialConnection: Send {
    fn is_open(&self) -> bool;
    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
    async fn flush(&mut self) -> io::Result<()>;
    async fn close(&mut self) -> io::Result<()>;
}

/// Connection factory. One open attempt per call; retry policy lives in the
/// manager.
#[async_trait]
pub trait SerialTransport: Send + Sync {
    async fn open(&self) -> io::Result<Box<dyn SerialConnection>>;

    /// Human-readable endpoint for log messages.
    fn describe(&self) -> String;
}

/// Production transport over tokio-serial.
pub struct TokioSerialTransport {
    port: String,
    baud_rate: u32,
    timeout: Duration,
}

impl TokioSerialTransport {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            port: config.serial_port.clone(),
            baud_rate: config.baud_rate,
            timeout: Duration::from_secs(config.timeout),
        }
    }
}

#[async_trait]
impl SerialTransport for TokioSerialTransport {
    async fn open(&self) -> io::Result<Box<dyn SerialConnection>> {
        let stream = tokio_serial::new(&self.port, self.baud_rate)
            .timeout(self.timeout)
            .open_native_async()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(Box::new(SerialStreamConnection {
            stream: Some(stream),
        }))
    }

    fn describe(&self) -> String {
        format!("{} @ {} baud", self.port, self.baud_rate)
    }
}

struct SerialStreamConnection {
    stream: Option<tokio_serial::SerialStream>,
}

#[async_trait]
impl SerialConnection for SerialStreamConnection {
    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self.stream.as_mut() {
            Some(stream) => stream.write_all(buf).await,
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "port closed")),
        }
    }

    async fn flush(&mut self) -> io::Result<()> {
        match self.stream.as_mut() {
            Some(stream) => stream.flush().await,
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "port closed")),
        }
    }

    async fn close(&mut self) -> io::Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
        }
        Ok(())
    }
}
