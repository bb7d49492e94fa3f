// camwatch-core: USB camera health monitoring and driver rebind recovery.

pub mod cache;
pub mod config;
pub mod driver;
pub mod error;
pub mod model;
pub mod monitor;
pub mod probe;
pub mod recovery;
pub mod resolver;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{CacheError, MappingCache};
pub use config::{SettleDelays, WatchdogConfig};
pub use driver::{DriverControl, DriverError, SysfsDriver};
pub use error::CoreError;
pub use monitor::{DeviceReport, Monitor, TickReport};
pub use probe::{Probe, is_healthy, probe};
pub use recovery::{RecoveryOrchestrator, RecoveryReport, RecoverySession, RecoveryState};
pub use resolver::{BusResolver, ResolveError, UdevadmResolver};

// Re-export model types at the crate root for ergonomics.
pub use model::{AddressSource, BusAddress, CameraDevice, InvalidBusAddress};

// Shutdown signalling is part of the public `Monitor::run` signature.
pub use tokio_util::sync::CancellationToken;
