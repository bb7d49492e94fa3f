// ── Camera device domain types ──

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use super::bus_address::BusAddress;

/// Where a device's current bus address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AddressSource {
    /// Resolved from udev during this run.
    Live,
    /// Taken from the persisted mapping cache.
    Cache,
    /// Nothing known yet.
    Unknown,
}

/// One configured camera, tracked for the lifetime of the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraDevice {
    /// Configured device path; the stable key.
    pub path: PathBuf,
    /// Symlink target of `path`, or `path` itself.
    pub resolved_path: PathBuf,
    pub bus_address: Option<BusAddress>,
    pub address_source: AddressSource,
    pub last_known_healthy: Option<DateTime<Utc>>,
}

impl CameraDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            resolved_path: path.clone(),
            path,
            bus_address: None,
            address_source: AddressSource::Unknown,
            last_known_healthy: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a bus address and where it came from.
    pub fn set_bus_address(&mut self, addr: BusAddress, source: AddressSource) {
        self.bus_address = Some(addr);
        self.address_source = source;
    }
}
