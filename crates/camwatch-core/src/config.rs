// ── Runtime watchdog configuration ──
//
// Timing and persistence knobs for the monitoring loop. The CLI builds a
// `WatchdogConfig` from the config file and hands it in -- core never reads
// config files.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CACHE_FILE: &str = "/tmp/camera_watchdog_cache.json";
pub const DEFAULT_DRIVERS_ROOT: &str = "/sys/bus/usb/drivers";
pub const DEFAULT_DRIVER: &str = "uvcvideo";

/// Settle delays applied around a single unbind/rebind sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelays {
    /// Wait after writing `unbind`, before writing `bind`.
    pub after_unbind: Duration,
    /// Wait after writing `bind`, before the device is probed again.
    pub after_rebind: Duration,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            after_unbind: Duration::from_secs(2),
            after_rebind: Duration::from_secs(3),
        }
    }
}

/// Configuration for one watchdog run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchdogConfig {
    /// Device paths to monitor, deduplicated, in configured order.
    pub devices: Vec<PathBuf>,
    /// Sleep between health-check ticks.
    pub poll_interval: Duration,
    /// Recovery settle delays.
    pub settle: SettleDelays,
    /// Location of the persisted device → bus-address table.
    pub cache_file: PathBuf,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            poll_interval: Duration::from_secs(5),
            settle: SettleDelays::default(),
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
        }
    }
}
