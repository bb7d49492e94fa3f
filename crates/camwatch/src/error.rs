//! CLI error types with miette diagnostics.
//!
//! Maps `ConfigError` and `CoreError` into user-facing errors with help
//! text naming the setting to fix.

use miette::Diagnostic;
use thiserror::Error;

use camwatch_config::ConfigError;
use camwatch_core::CoreError;

/// Process exit codes. Usage errors (2) are reported by clap itself.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 3;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid configuration value for {field}: {reason}")]
    #[diagnostic(
        code(camwatch::invalid_config),
        help("Fix `{field}` in the config file or its CAMWATCH_* environment variable.")
    )]
    InvalidConfig { field: String, reason: String },

    #[error("Could not load configuration: {reason}")]
    #[diagnostic(
        code(camwatch::config),
        help("Check the TOML syntax and value types in the config file ({path}).")
    )]
    ConfigLoad { path: String, reason: String },

    #[error("Cannot read teleop config {path}")]
    #[diagnostic(
        code(camwatch::teleop_unreadable),
        help(
            "Point `teleop_ini` (or --teleop-ini) at the robot's teleop.ini,\n\
             or list the cameras explicitly with `devices = [\"/dev/video0\"]`."
        )
    )]
    TeleopUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No camera devices to monitor: {reason}")]
    #[diagnostic(
        code(camwatch::no_devices),
        help(
            "Add `cameraN = v4l2src device=/dev/videoN ! ...` entries under [plugin]\n\
             in the teleop INI, or set `devices` in the config file."
        )
    )]
    NoDevices { reason: String },

    // ── Runtime ──────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(camwatch::core))]
    Core(CoreError),

    #[error(transparent)]
    #[diagnostic(code(camwatch::io))]
    Io(#[from] std::io::Error),

    #[error("Could not encode report: {0}")]
    #[diagnostic(code(camwatch::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidConfig { .. }
            | Self::ConfigLoad { .. }
            | Self::TeleopUnreadable { .. }
            | Self::NoDevices { .. } => exit_code::CONFIG,
            Self::Core(_) | Self::Io(_) | Self::Json(_) => exit_code::GENERAL,
        }
    }
}

// ── ConfigError / CoreError → CliError ───────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::InvalidConfig { field, reason },
            ConfigError::TeleopUnreadable { path, source } => CliError::TeleopUnreadable {
                path: path.display().to_string(),
                source,
            },
            ConfigError::NoDevices { path } => CliError::NoDevices {
                reason: format!("no camera pipelines in {}", path.display()),
            },
            ConfigError::Figment(err) => CliError::ConfigLoad {
                path: err
                    .metadata
                    .as_ref()
                    .and_then(|m| m.source.as_ref())
                    .map_or_else(|| "defaults".into(), ToString::to_string),
                reason: err.to_string(),
            },
            ConfigError::Serialization(err) => CliError::ConfigLoad {
                path: "(rendered)".into(),
                reason: err.to_string(),
            },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConfigurationUnavailable { reason } => CliError::NoDevices { reason },
            other => CliError::Core(other),
        }
    }
}
