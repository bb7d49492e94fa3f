// ── Bus identity resolution ──
//
// Maps a device node to the USB interface that owns it. The production
// resolver asks udev for the node's syspath, e.g.
//
//   /devices/pci0000:00/0000:00:14.0/usb3/3-2/3-2:1.0/video4linux/video0
//
// and picks the nearest ancestor segment shaped like a bus address.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::trace;

use crate::model::BusAddress;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("device {} does not exist", device.display())]
    NotFound { device: PathBuf },

    #[error("permission denied querying {}", device.display())]
    PermissionDenied { device: PathBuf },

    #[error("topology query for {} failed: {reason}", device.display())]
    QueryFailed { device: PathBuf, reason: String },

    #[error("no USB interface in syspath {syspath} of {}", device.display())]
    NoBusAddress { device: PathBuf, syspath: String },
}

impl ResolveError {
    pub fn device(&self) -> &Path {
        match self {
            Self::NotFound { device }
            | Self::PermissionDenied { device }
            | Self::QueryFailed { device, .. }
            | Self::NoBusAddress { device, .. } => device,
        }
    }
}

/// Resolves a device path to its current bus address.
///
/// Read-only with respect to the system and to core state.
pub trait BusResolver {
    fn resolve(
        &self,
        device: &Path,
    ) -> impl Future<Output = Result<BusAddress, ResolveError>> + Send;
}

/// Find the nearest ancestor segment of a syspath that is a bus address.
pub fn bus_address_from_syspath(syspath: &str) -> Option<BusAddress> {
    syspath
        .trim()
        .rsplit('/')
        .find_map(|segment| BusAddress::parse(segment).ok())
}

// ── udevadm ──────────────────────────────────────────────────────

/// How long one `udevadm` query may take before it is killed.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolver backed by `udevadm info -q path -n <device>`.
#[derive(Debug, Clone)]
pub struct UdevadmResolver {
    program: PathBuf,
    timeout: Duration,
}

impl UdevadmResolver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for UdevadmResolver {
    fn default() -> Self {
        Self::new("udevadm")
    }
}

impl BusResolver for UdevadmResolver {
    async fn resolve(&self, device: &Path) -> Result<BusAddress, ResolveError> {
        // Follows symlinks: a dangling link counts as missing.
        if let Err(e) = tokio::fs::metadata(device).await {
            return Err(match e.kind() {
                io::ErrorKind::PermissionDenied => ResolveError::PermissionDenied {
                    device: device.to_path_buf(),
                },
                _ => ResolveError::NotFound {
                    device: device.to_path_buf(),
                },
            });
        }

        // The child is killed when the timed-out future is dropped.
        let query = Command::new(&self.program)
            .args(["info", "-q", "path", "-n"])
            .arg(device)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, query)
            .await
            .map_err(|_| ResolveError::QueryFailed {
                device: device.to_path_buf(),
                reason: format!(
                    "{} did not answer within {}",
                    self.program.display(),
                    humantime::format_duration(self.timeout)
                ),
            })?
            .map_err(|e| ResolveError::QueryFailed {
                device: device.to_path_buf(),
                reason: format!("cannot run {}: {e}", self.program.display()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResolveError::QueryFailed {
                device: device.to_path_buf(),
                reason: format!("{} ({})", stderr.trim(), output.status),
            });
        }

        let syspath = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        trace!(device = %device.display(), %syspath, "udev syspath");

        bus_address_from_syspath(&syspath).ok_or_else(|| ResolveError::NoBusAddress {
            device: device.to_path_buf(),
            syspath,
        })
    }
}
