// ── Device health probing ──
//
// Existence checks only. The device is never opened: the watchdog cares
// about the node vanishing, not about stream quality.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Result of one health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Probe {
    pub healthy: bool,
    pub is_symlink: bool,
    /// Canonical target when `is_symlink`, else the probed path.
    pub resolved_path: PathBuf,
}

/// Probe a configured device path.
///
/// Healthy means the path exists and, for a symlink, the fully resolved
/// target exists too. A dangling symlink is unhealthy.
pub fn probe(path: &Path) -> Probe {
    let is_symlink = fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink());

    if !is_symlink {
        return Probe {
            healthy: fs::metadata(path).is_ok(),
            is_symlink,
            resolved_path: path.to_path_buf(),
        };
    }

    match fs::canonicalize(path) {
        Ok(target) => Probe {
            healthy: fs::metadata(&target).is_ok(),
            is_symlink,
            resolved_path: target,
        },
        Err(_) => Probe {
            healthy: false,
            is_symlink,
            resolved_path: fs::read_link(path).unwrap_or_else(|_| path.to_path_buf()),
        },
    }
}

pub fn is_healthy(path: &Path) -> bool {
    probe(path).healthy
}
