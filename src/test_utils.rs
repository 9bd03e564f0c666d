//! Shared test doubles: recording serial transport and scripted sensors.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::link::transport::{SerialConnection, SerialTransport};
use crate::message::{ArrayStatus, DeviceReading, UpsReading};

/// Transport stub: fails the first `failures` opens, then hands out
/// connections that record every written line.
pub struct StubTransport {
    failures: AtomicUsize,
    pub attempts: Arc<AtomicUsize>,
    pub written: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<AtomicUsize>,
}

impl StubTransport {
    pub fn new(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            attempts: Arc::new(AtomicUsize::new(0)),
            written: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Message types of all recorded envelopes, in send order.
    pub fn sent_kinds(written: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        written
            .lock()
            .unwrap()
            .iter()
            .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
            .filter_map(|v| v["type"].as_str().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl SerialTransport for StubTransport {
    async fn open(&self) -> io::Result<Box<dyn SerialConnection>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such port"));
        }
        Ok(Box::new(StubConnection {
            written: Arc::clone(&self.written),
            closed: Arc::clone(&self.closed),
        }))
    }

    fn describe(&self) -> String {
        "stub".to_string()
    }
}

struct StubConnection {
    written: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl SerialConnection for StubConnection {
    fn is_open(&self) -> bool {
        true
    }

    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.written
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(buf).to_string());
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Sensors stub with a fixed device list and a constant array status.
pub struct StubSensors {
    pub cpu: Option<f64>,
    pub uptime: u64,
    pub array: ArrayStatus,
    pub devices: Vec<DeviceReading>,
}

impl StubSensors {
    pub fn quiet() -> Self {
        Self {
            cpu: Some(42.3),
            uptime: 86400,
            array: ArrayStatus::Started,
            devices: Vec::new(),
        }
    }
}

#[async_trait]
impl crate::hardware::SystemSensors for StubSensors {
    async fn cpu_temperature(&self) -> Option<f64> {
        self.cpu
    }

    async fn uptime_seconds(&self) -> u64 {
        self.uptime
    }

    async fn array_status(&self) -> ArrayStatus {
        self.array
    }

    async fn list_devices(&self) -> Vec<DeviceReading> {
        self.devices.clone()
    }

    async fn ups_status(&self, _ups_name: &str) -> UpsReading {
        UpsReading::unavailable()
    }
}
