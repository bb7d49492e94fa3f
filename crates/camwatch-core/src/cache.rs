// ── Persistent device → bus-address cache ──
//
// A best-effort durable shadow of each device's last resolved bus address.
// Read at startup and when live resolution fails; rewritten as a whole
// table (temp file + rename) after every change, so readers only ever see
// the previous or the new snapshot.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::BusAddress;

pub type Mapping = BTreeMap<PathBuf, BusAddress>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed cache {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot encode cache for {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ── File operations ──────────────────────────────────────────────

/// Read the cache file.
///
/// A missing file is a cold start and yields an empty mapping. Entries whose
/// value is not a bus address are skipped with a warning; anything that is
/// not a JSON object of strings is an error.
pub fn try_load(path: &Path) -> Result<Mapping, CacheError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Mapping::new()),
        Err(source) => {
            return Err(CacheError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let table: BTreeMap<PathBuf, String> =
        serde_json::from_str(&raw).map_err(|source| CacheError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut mapping = Mapping::new();
    for (device, value) in table {
        match BusAddress::try_from(value) {
            Ok(addr) => {
                mapping.insert(device, addr);
            }
            Err(e) => warn!(
                cache = %path.display(),
                device = %device.display(),
                error = %e,
                "dropping invalid cache entry"
            ),
        }
    }
    Ok(mapping)
}

/// Read the cache file, treating any failure as an empty cache.
pub fn load(path: &Path) -> Mapping {
    match try_load(path) {
        Ok(mapping) => {
            debug!(cache = %path.display(), entries = mapping.len(), "mapping cache loaded");
            mapping
        }
        Err(e) => {
            warn!(error = %e, "could not load mapping cache, rebuilding from empty");
            Mapping::new()
        }
    }
}

/// Atomically replace the cache file with `mapping`.
pub fn save(path: &Path, mapping: &Mapping) -> Result<(), CacheError> {
    let write_err = |source| CacheError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut json = serde_json::to_string_pretty(mapping).map_err(|source| CacheError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    json.push('\n');

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(write_err)?;

    // Exclusively created under a random name; removed on drop unless persisted.
    let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(json.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

// ── MappingCache ─────────────────────────────────────────────────

/// In-memory view of the cache file, written through on every change.
#[derive(Debug, Clone)]
pub struct MappingCache {
    path: PathBuf,
    entries: Mapping,
}

impl MappingCache {
    /// An empty cache that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mapping::new(),
        }
    }

    /// Load the cache at `path`; unreadable files start empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load(&path);
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &Mapping {
        &self.entries
    }

    pub fn get(&self, device: &Path) -> Option<&BusAddress> {
        self.entries.get(device)
    }

    /// Overwrite one entry in memory. Returns `true` if the value changed.
    pub fn insert(&mut self, device: &Path, addr: BusAddress) -> bool {
        if self.entries.get(device) == Some(&addr) {
            return false;
        }
        self.entries.insert(device.to_path_buf(), addr);
        true
    }

    /// Overwrite one entry and persist the table if it changed.
    ///
    /// On a write failure the in-memory entry is kept.
    pub fn record(&mut self, device: &Path, addr: BusAddress) -> Result<bool, CacheError> {
        if !self.insert(device, addr) {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn save(&self) -> Result<(), CacheError> {
        save(&self.path, &self.entries)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::capture_logs;

    fn addr(s: &str) -> BusAddress {
        BusAddress::parse(s).unwrap()
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mapping = try_load(&dir.path().join("absent.json")).unwrap();
        assert!(mapping.is_empty());
    }

    #[test]
    fn save_then_load_returns_same_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut mapping = Mapping::new();
        mapping.insert("/dev/video0".into(), addr("3-2:1.0"));
        mapping.insert("/dev/front_cam".into(), addr("1-1.4:1.0"));

        save(&path, &mapping).unwrap();
        assert_eq!(try_load(&path).unwrap(), mapping);
    }

    #[test]
    fn save_writes_a_plain_json_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut mapping = Mapping::new();
        mapping.insert("/dev/video0".into(), addr("3-2:1.0"));
        save(&path, &mapping).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({ "/dev/video0": "3-2:1.0" }));

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("cache.json")]);
    }

    #[test]
    fn save_does_not_write_through_a_planted_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let victim = dir.path().join("victim");
        fs::write(&victim, "untouched").unwrap();
        std::os::unix::fs::symlink(&victim, dir.path().join(".cache.json.tmp")).unwrap();

        let mut mapping = Mapping::new();
        mapping.insert("/dev/video0".into(), addr("3-2:1.0"));
        save(&path, &mapping).unwrap();

        assert_eq!(fs::read_to_string(&victim).unwrap(), "untouched");
        assert_eq!(try_load(&path).unwrap(), mapping);
        assert!(!fs::symlink_metadata(&path).unwrap().file_type().is_symlink());
    }

    #[test]
    fn concurrent_saves_leave_one_complete_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let mut mapping = Mapping::new();
                    mapping.insert("/dev/video0".into(), addr(&format!("3-{}:1.0", i + 1)));
                    for _ in 0..20 {
                        save(&path, &mapping).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let mapping = try_load(&path).unwrap();
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn malformed_file_is_an_error_and_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{\"/dev/video0\": \"3-2:1.0\"").unwrap();

        assert!(matches!(try_load(&path), Err(CacheError::Parse { .. })));

        let (mapping, logs) = capture_logs(|| load(&path));
        assert!(mapping.is_empty());
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("could not load mapping cache"), "{logs}");
    }

    #[test]
    fn invalid_entries_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(
            &path,
            r#"{"/dev/video0": "3-2:1.0", "/dev/video2": "not-an-address"}"#,
        )
        .unwrap();

        let mapping = try_load(&path).unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get(Path::new("/dev/video0")), Some(&addr("3-2:1.0")));
    }

    #[test]
    fn record_overwrites_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let device = Path::new("/dev/video0");

        let mut cache = MappingCache::new(&path);
        assert!(cache.record(device, addr("3-2:1.0")).unwrap());
        assert!(!cache.record(device, addr("3-2:1.0")).unwrap());
        assert!(cache.record(device, addr("3-1:1.0")).unwrap());

        let reopened = MappingCache::open(&path);
        assert_eq!(reopened.entries().len(), 1);
        assert_eq!(reopened.get(device), Some(&addr("3-1:1.0")));
    }

    #[test]
    fn record_keeps_entry_in_memory_when_save_fails() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("cache.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), b"x").unwrap();

        let mut cache = MappingCache::new(&path);
        let device = Path::new("/dev/video0");
        assert!(matches!(
            cache.record(device, addr("3-2:1.0")),
            Err(CacheError::Write { .. })
        ));
        assert_eq!(cache.get(device), Some(&addr("3-2:1.0")));
    }
}
