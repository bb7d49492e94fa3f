//! Camera discovery from the teleop pipeline INI.
//!
//! The `[plugin]` section holds one GStreamer-style pipeline per camera:
//!
//! ```ini
//! [plugin]
//! camera0 = v4l2src device=/dev/video0 ! videoconvert ! ...
//! camera1 = v4l2src device=/dev/front_cam ! ...
//! ```
//!
//! Every key starting with `camera` contributes the path after `device=`.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;

const PLUGIN_SECTION: &str = "plugin";
const CAMERA_KEY_PREFIX: &str = "camera";
const DEVICE_PROPERTY: &str = "device=";

/// Read and parse a teleop INI file.
pub fn read_camera_devices(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_camera_devices(&text))
}

/// Extract camera device paths, deduplicated in first-seen order.
pub fn parse_camera_devices(ini: &str) -> Vec<PathBuf> {
    let mut devices: IndexSet<PathBuf> = IndexSet::new();

    for (key, value) in plugin_entries(ini) {
        if !key.starts_with(CAMERA_KEY_PREFIX) {
            continue;
        }
        if let Some(device) = device_property(&value) {
            devices.insert(PathBuf::from(device));
        }
    }

    devices.into_iter().collect()
}

/// The value of the first `device=` property in a pipeline description.
fn device_property(pipeline: &str) -> Option<&str> {
    let start = pipeline.find(DEVICE_PROPERTY)? + DEVICE_PROPERTY.len();
    let rest = &pipeline[start..];
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '!')
        .unwrap_or(rest.len());
    let device = &rest[..end];
    (!device.is_empty()).then_some(device)
}

/// `(lowercased key, value)` pairs of the `[plugin]` section, with
/// indented continuation lines folded into the preceding value.
fn plugin_entries(ini: &str) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = Vec::new();
    let mut in_plugin = false;

    for raw in ini.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_plugin = name.trim() == PLUGIN_SECTION;
            continue;
        }
        if !in_plugin {
            continue;
        }

        let continuation = raw.starts_with(|c: char| c == ' ' || c == '\t');
        if continuation {
            if let Some((_, value)) = entries.last_mut() {
                value.push(' ');
                value.push_str(line);
                continue;
            }
        }

        if let Some((key, value)) = line.split_once(['=', ':']) {
            entries.push((key.trim().to_lowercase(), value.trim().to_owned()));
        }
    }

    entries
}
