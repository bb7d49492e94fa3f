//! Configuration for the camwatch daemon.
//!
//! A TOML file (default `/etc/camwatch/config.toml`) layered over built-in
//! defaults and `CAMWATCH_*` environment variables, plus camera discovery
//! from the teleop pipeline INI. The result is translated into
//! `camwatch_core::WatchdogConfig` -- core never reads config files.

pub mod teleop;

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use camwatch_core::config::{DEFAULT_CACHE_FILE, DEFAULT_DRIVER, DEFAULT_DRIVERS_ROOT};
use camwatch_core::resolver::DEFAULT_QUERY_TIMEOUT;
use camwatch_core::{SettleDelays, SysfsDriver, UdevadmResolver, WatchdogConfig};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/camwatch/config.toml";
pub const DEFAULT_TELEOP_INI: &str = "/opt/frodobots/teleop.ini";
pub const DEFAULT_LOG_FILE: &str = "/var/log/camera_watchdog.log";
pub const ENV_PREFIX: &str = "CAMWATCH_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("cannot read teleop config {}: {source}", path.display())]
    TeleopUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no camera devices found in {}", path.display())]
    NoDevices { path: PathBuf },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Teleop INI whose `[plugin]` camera pipelines name the devices.
    pub teleop_ini: PathBuf,

    /// Explicit device paths. When non-empty the teleop INI is not read.
    pub devices: Vec<PathBuf>,

    /// Persisted device → bus-address table.
    pub cache_file: PathBuf,

    /// Parent of the USB driver directories.
    pub drivers_root: PathBuf,

    /// Driver the cameras are bound to.
    pub driver: String,

    /// `udevadm` executable used for bus address lookups.
    pub udevadm: PathBuf,

    /// Upper bound on one `udevadm` query before it is killed.
    pub udevadm_timeout_secs: u64,

    pub poll_interval_secs: u64,
    pub unbind_settle_secs: u64,
    pub rebind_settle_secs: u64,

    /// Log file; empty disables file logging.
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let settle = SettleDelays::default();
        Self {
            teleop_ini: DEFAULT_TELEOP_INI.into(),
            devices: Vec::new(),
            cache_file: DEFAULT_CACHE_FILE.into(),
            drivers_root: DEFAULT_DRIVERS_ROOT.into(),
            driver: DEFAULT_DRIVER.into(),
            udevadm: "udevadm".into(),
            udevadm_timeout_secs: DEFAULT_QUERY_TIMEOUT.as_secs(),
            poll_interval_secs: WatchdogConfig::default().poll_interval.as_secs(),
            unbind_settle_secs: settle.after_unbind.as_secs(),
            rebind_settle_secs: settle.after_rebind.as_secs(),
            log_file: DEFAULT_LOG_FILE.into(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Validation {
                field: "poll_interval_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.udevadm_timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "udevadm_timeout_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.driver.trim().is_empty() || self.driver.contains('/') {
            return Err(ConfigError::Validation {
                field: "driver".into(),
                reason: format!("'{}' is not a driver name", self.driver),
            });
        }
        Ok(())
    }

    /// The log file, or `None` when file logging is disabled.
    pub fn log_file(&self) -> Option<&Path> {
        (!self.log_file.as_os_str().is_empty()).then_some(self.log_file.as_path())
    }

    /// Camera device paths to monitor, deduplicated in configured order.
    pub fn camera_devices(&self) -> Result<Vec<PathBuf>, ConfigError> {
        if !self.devices.is_empty() {
            let unique: IndexSet<PathBuf> = self.devices.iter().cloned().collect();
            return Ok(unique.into_iter().collect());
        }

        let devices = teleop::read_camera_devices(&self.teleop_ini).map_err(|source| {
            ConfigError::TeleopUnreadable {
                path: self.teleop_ini.clone(),
                source,
            }
        })?;

        if devices.is_empty() {
            return Err(ConfigError::NoDevices {
                path: self.teleop_ini.clone(),
            });
        }

        debug!(
            teleop_ini = %self.teleop_ini.display(),
            count = devices.len(),
            "camera devices parsed"
        );
        Ok(devices)
    }

    /// Translate into the core's runtime configuration, discovering the
    /// camera devices on the way.
    pub fn to_watchdog_config(&self) -> Result<WatchdogConfig, ConfigError> {
        let devices = self.camera_devices()?;
        Ok(WatchdogConfig {
            devices,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            settle: SettleDelays {
                after_unbind: Duration::from_secs(self.unbind_settle_secs),
                after_rebind: Duration::from_secs(self.rebind_settle_secs),
            },
            cache_file: self.cache_file.clone(),
        })
    }

    pub fn resolver(&self) -> UdevadmResolver {
        UdevadmResolver::new(&self.udevadm)
            .with_timeout(Duration::from_secs(self.udevadm_timeout_secs))
    }

    pub fn driver_control(&self) -> SysfsDriver {
        SysfsDriver::new(&self.drivers_root, &self.driver)
    }

    /// Render as TOML, as it would appear in the config file.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Config loading ──────────────────────────────────────────────────

/// Defaults, then the TOML file at `path` (if present), then environment.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX))
}

/// Load and validate the configuration.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment(path).extract()?;
    config.validate()?;
    debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_match_watchdog_defaults() {
        let cfg = Config {
            devices: vec!["/dev/video0".into()],
            ..Config::default()
        };
        let wd = cfg.to_watchdog_config().unwrap();
        assert_eq!(wd.devices, vec![PathBuf::from("/dev/video0")]);
        assert_eq!(wd.poll_interval, Duration::from_secs(5));
        assert_eq!(wd.settle, SettleDelays::default());
        assert_eq!(wd.cache_file, PathBuf::from("/tmp/camera_watchdog_cache.json"));
        assert_eq!(cfg.resolver().timeout(), Duration::from_secs(5));
        assert_eq!(
            cfg.driver_control().driver_dir(),
            Path::new("/sys/bus/usb/drivers/uvcvideo")
        );
    }

    #[test]
    fn file_and_env_layers_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "camwatch.toml",
                r#"
                    devices = ["/dev/video0", "/dev/video2"]
                    poll_interval_secs = 10
                    driver = "uvcvideo"
                "#,
            )?;
            jail.set_env("CAMWATCH_POLL_INTERVAL_SECS", "7");
            jail.set_env("CAMWATCH_REBIND_SETTLE_SECS", "4");

            let cfg = load_config(Path::new("camwatch.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.poll_interval_secs, 7);
            assert_eq!(cfg.rebind_settle_secs, 4);
            assert_eq!(cfg.unbind_settle_secs, 2);
            assert_eq!(
                cfg.devices,
                vec![PathBuf::from("/dev/video0"), PathBuf::from("/dev/video2")]
            );
            Ok(())
        });
    }

    #[test]
    fn missing_file_uses_defaults() {
        Jail::expect_with(|_| {
            let cfg = load_config(Path::new("absent.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg, Config::default());
            Ok(())
        });
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("camwatch.toml", "poll_interval_secs = 0")?;
            let err = load_config(Path::new("camwatch.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "poll_interval_secs"));
            Ok(())
        });
    }

    #[test]
    fn udevadm_timeout_is_configurable_and_nonzero() {
        Jail::expect_with(|jail| {
            jail.create_file("camwatch.toml", "udevadm_timeout_secs = 2")?;
            let cfg = load_config(Path::new("camwatch.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.resolver().timeout(), Duration::from_secs(2));

            jail.create_file("camwatch.toml", "udevadm_timeout_secs = 0")?;
            let err = load_config(Path::new("camwatch.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "udevadm_timeout_secs"));
            Ok(())
        });
    }

    #[test]
    fn explicit_devices_skip_teleop_ini_and_dedupe() {
        let cfg = Config {
            teleop_ini: "/nonexistent/teleop.ini".into(),
            devices: vec!["/dev/video2".into(), "/dev/video0".into(), "/dev/video2".into()],
            ..Config::default()
        };
        assert_eq!(
            cfg.camera_devices().unwrap(),
            vec![PathBuf::from("/dev/video2"), PathBuf::from("/dev/video0")]
        );
    }

    #[test]
    fn teleop_ini_supplies_devices() {
        let dir = tempfile::tempdir().unwrap();
        let ini = dir.path().join("teleop.ini");
        std::fs::write(&ini, "[plugin]\ncamera0 = v4l2src device=/dev/video0 ! x\n").unwrap();

        let cfg = Config {
            teleop_ini: ini,
            ..Config::default()
        };
        assert_eq!(cfg.camera_devices().unwrap(), vec![PathBuf::from("/dev/video0")]);
    }

    #[test]
    fn unreadable_or_empty_teleop_ini_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Config {
            teleop_ini: dir.path().join("absent.ini"),
            ..Config::default()
        };
        assert!(matches!(
            missing.camera_devices(),
            Err(ConfigError::TeleopUnreadable { .. })
        ));

        let ini = dir.path().join("teleop.ini");
        std::fs::write(&ini, "[plugin]\naudio = alsasrc\n").unwrap();
        let empty = Config {
            teleop_ini: ini,
            ..Config::default()
        };
        assert!(matches!(empty.camera_devices(), Err(ConfigError::NoDevices { .. })));
    }

    #[test]
    fn empty_log_file_disables_file_logging() {
        let cfg = Config {
            log_file: PathBuf::new(),
            ..Config::default()
        };
        assert!(cfg.log_file().is_none());
        assert_eq!(
            Config::default().log_file(),
            Some(Path::new("/var/log/camera_watchdog.log"))
        );
    }

    #[test]
    fn renders_as_toml() {
        let text = Config::default().to_toml().unwrap();
        assert!(text.contains("driver = \"uvcvideo\""));
        assert!(text.contains("poll_interval_secs = 5"));
    }
}
