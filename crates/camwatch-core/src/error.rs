// ── Core error types ──
//
// Every variant except `ConfigurationUnavailable` is recoverable: the
// component that hits it logs the event and carries on. The per-component
// error enums (`ResolveError`, `CacheError`, `DriverError`) convert into
// `CoreError` so callers that want a single type can use `?`.

use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CacheError;
use crate::driver::DriverError;
use crate::resolver::ResolveError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Fatal ────────────────────────────────────────────────────────
    #[error("No camera devices to monitor: {reason}")]
    ConfigurationUnavailable { reason: String },

    // ── Identity ─────────────────────────────────────────────────────
    #[error("Could not resolve bus address for {device}: {reason}")]
    ResolutionFailed { device: String, reason: String },

    // ── Cache ────────────────────────────────────────────────────────
    #[error("Mapping cache {} is unreadable: {reason}", path.display())]
    CacheUnreadable { path: PathBuf, reason: String },

    #[error("Could not write mapping cache {}: {reason}", path.display())]
    CacheWriteFailed { path: PathBuf, reason: String },

    // ── Driver control ───────────────────────────────────────────────
    #[error("Driver control write to {} failed: {reason}", path.display())]
    DriverControlFailed { path: PathBuf, reason: String },

    #[error("Permission denied writing {}; camwatch must run as root", path.display())]
    PermissionDenied { path: PathBuf },
}

impl From<ResolveError> for CoreError {
    fn from(err: ResolveError) -> Self {
        let device = err.device().display().to_string();
        CoreError::ResolutionFailed {
            device,
            reason: err.to_string(),
        }
    }
}

impl From<CacheError> for CoreError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Read { path, source } => CoreError::CacheUnreadable {
                path,
                reason: source.to_string(),
            },
            CacheError::Parse { path, source } => CoreError::CacheUnreadable {
                path,
                reason: source.to_string(),
            },
            CacheError::Write { path, source } => CoreError::CacheWriteFailed {
                path,
                reason: source.to_string(),
            },
            CacheError::Encode { path, source } => CoreError::CacheWriteFailed {
                path,
                reason: source.to_string(),
            },
        }
    }
}

impl From<DriverError> for CoreError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::PermissionDenied { path } => CoreError::PermissionDenied { path },
            DriverError::NotFound { path } => CoreError::DriverControlFailed {
                path,
                reason: "control file not found (is the driver loaded?)".into(),
            },
            DriverError::Io { path, source } => CoreError::DriverControlFailed {
                path,
                reason: source.to_string(),
            },
        }
    }
}

impl CoreError {
    /// True for the one condition that should stop the daemon.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigurationUnavailable { .. })
    }
}
