// Test doubles for the resolver and driver seams.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::time::Instant;

use crate::driver::{DriverControl, DriverError};
use crate::model::BusAddress;
use crate::resolver::{BusResolver, ResolveError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Unbind(BusAddress),
    Bind(BusAddress),
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub call: DriverCall,
    pub at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    Unbind,
    Bind,
}

type ErrorFactory = Arc<dyn Fn() -> DriverError + Send + Sync>;

/// Records every control write with the (virtual) time it happened.
#[derive(Clone, Default)]
pub struct FakeDriver {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    fail: Option<(FailOn, ErrorFactory)>,
}

impl FakeDriver {
    pub fn failing(on: FailOn, err: impl Fn() -> DriverError + Send + Sync + 'static) -> Self {
        Self {
            calls: Arc::default(),
            fail: Some((on, Arc::new(err))),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, on: FailOn, call: DriverCall) -> Result<(), DriverError> {
        self.calls.lock().unwrap().push(RecordedCall {
            call,
            at: Instant::now(),
        });
        match &self.fail {
            Some((fail_on, err)) if *fail_on == on => Err(err()),
            _ => Ok(()),
        }
    }
}

impl DriverControl for FakeDriver {
    async fn unbind(&self, addr: &BusAddress) -> Result<(), DriverError> {
        self.record(FailOn::Unbind, DriverCall::Unbind(addr.clone()))
    }

    async fn bind(&self, addr: &BusAddress) -> Result<(), DriverError> {
        self.record(FailOn::Bind, DriverCall::Bind(addr.clone()))
    }
}

/// Answers from a fixed table; unknown paths are `NotFound`.
#[derive(Clone, Default)]
pub struct FakeResolver {
    table: Arc<Mutex<HashMap<PathBuf, BusAddress>>>,
    queries: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeResolver {
    pub fn with(entries: &[(&str, &str)]) -> Self {
        let resolver = Self::default();
        for (path, addr) in entries {
            resolver.set(path, addr);
        }
        resolver
    }

    pub fn set(&self, path: impl AsRef<Path>, addr: &str) {
        self.table.lock().unwrap().insert(
            path.as_ref().to_path_buf(),
            BusAddress::parse(addr).unwrap(),
        );
    }

    pub fn clear(&self) {
        self.table.lock().unwrap().clear();
    }

    pub fn queries(&self) -> Vec<PathBuf> {
        self.queries.lock().unwrap().clone()
    }
}

impl BusResolver for FakeResolver {
    async fn resolve(&self, device: &Path) -> Result<BusAddress, ResolveError> {
        self.queries.lock().unwrap().push(device.to_path_buf());
        self.table
            .lock()
            .unwrap()
            .get(device)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound {
                device: device.to_path_buf(),
            })
    }
}

// ── Log capture ──────────────────────────────────────────────────

/// Shared in-memory sink for a test subscriber.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

/// Install a thread-local subscriber at `level` until the guard drops.
pub fn log_capture(level: tracing::Level) -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(level)
        .finish();
    (buffer, tracing::subscriber::set_default(subscriber))
}

/// Run `f` with a thread-local subscriber and return what it logged.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let (buffer, guard) = log_capture(tracing::Level::TRACE);
    let out = f();
    drop(guard);
    (out, buffer.contents())
}
