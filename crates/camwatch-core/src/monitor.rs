// ── Monitoring loop ──
//
// Owns the device table, the mapping cache, and the two OS seams. One
// task, sequential ticks: every device is probed in configured order and
// an unhealthy device is recovered to completion before the next device
// is looked at. Shutdown is observed at tick boundaries, between devices,
// and during the inter-tick sleep -- never inside a recovery session.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::MappingCache;
use crate::config::WatchdogConfig;
use crate::driver::DriverControl;
use crate::error::CoreError;
use crate::model::{AddressSource, BusAddress, CameraDevice};
use crate::probe::probe;
use crate::recovery::{RecoveryOrchestrator, RecoveryReport};
use crate::resolver::{BusResolver, ResolveError};

/// Per-device result of startup discovery.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub path: PathBuf,
    pub resolved_path: PathBuf,
    pub is_symlink: bool,
    pub healthy: bool,
    pub bus_address: Option<BusAddress>,
    pub source: AddressSource,
}

/// Counters for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub healthy: usize,
    pub missing: usize,
    pub recovered: usize,
    pub failed: usize,
    /// Missing devices with no bus address to recover with.
    pub unresolved: usize,
    /// Shutdown was requested before every device was probed.
    pub interrupted: bool,
}

/// The watchdog context: device table, cache, resolver and orchestrator.
pub struct Monitor<R, D> {
    config: WatchdogConfig,
    devices: Vec<CameraDevice>,
    cache: MappingCache,
    resolver: R,
    orchestrator: RecoveryOrchestrator<D>,
}

impl<R: BusResolver, D: DriverControl> Monitor<R, D> {
    /// Build a monitor, loading the mapping cache from `config.cache_file`.
    pub fn new(config: WatchdogConfig, resolver: R, driver: D) -> Result<Self, CoreError> {
        let cache = MappingCache::open(&config.cache_file);
        Self::with_cache(config, cache, resolver, driver)
    }

    /// Build a monitor around an already-loaded cache.
    pub fn with_cache(
        config: WatchdogConfig,
        cache: MappingCache,
        resolver: R,
        driver: D,
    ) -> Result<Self, CoreError> {
        let mut devices: Vec<CameraDevice> = Vec::with_capacity(config.devices.len());
        for path in &config.devices {
            if devices.iter().any(|d| d.path == *path) {
                continue;
            }
            devices.push(CameraDevice::new(path.clone()));
        }

        if devices.is_empty() {
            return Err(CoreError::ConfigurationUnavailable {
                reason: "no camera device paths configured".into(),
            });
        }

        let orchestrator = RecoveryOrchestrator::new(driver, config.settle);
        Ok(Self {
            config,
            devices,
            cache,
            resolver,
            orchestrator,
        })
    }

    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    pub fn devices(&self) -> &[CameraDevice] {
        &self.devices
    }

    pub fn cache(&self) -> &MappingCache {
        &self.cache
    }

    pub fn orchestrator(&self) -> &RecoveryOrchestrator<D> {
        &self.orchestrator
    }

    // ── Startup ──────────────────────────────────────────────────

    /// Resolve every device's initial bus address.
    ///
    /// Live resolution first, then the cache, then unknown (logged).
    pub async fn discover(&mut self) -> Vec<DeviceReport> {
        let mut reports = Vec::with_capacity(self.devices.len());

        for idx in 0..self.devices.len() {
            let probe = probe(&self.devices[idx].path);
            self.devices[idx].resolved_path.clone_from(&probe.resolved_path);
            if probe.healthy {
                self.devices[idx].last_known_healthy = Some(Utc::now());
            }

            let addr = self.bus_address_for(idx).await;
            let device = &self.devices[idx];
            match (&addr, device.address_source) {
                (Some(addr), AddressSource::Cache) => info!(
                    device = %device.path.display(),
                    bus_address = %addr,
                    "  {} → {addr} (from cache)",
                    device.path.display()
                ),
                (Some(addr), _) => info!(
                    device = %device.path.display(),
                    bus_address = %addr,
                    "  {} → {addr}",
                    device.path.display()
                ),
                (None, _) => warn!(
                    device = %device.path.display(),
                    "could not determine bus address and no cached value is available"
                ),
            }

            reports.push(DeviceReport {
                path: device.path.clone(),
                resolved_path: probe.resolved_path,
                is_symlink: probe.is_symlink,
                healthy: probe.healthy,
                bus_address: addr,
                source: device.address_source,
            });
        }

        self.warn_shared_addresses();
        reports
    }

    /// Two configured paths on one interface usually means a duplicated
    /// config entry or two names for one camera. Both are kept.
    fn warn_shared_addresses(&self) {
        let mut seen: HashMap<&BusAddress, &Path> = HashMap::new();
        for device in &self.devices {
            let Some(addr) = device.bus_address.as_ref() else {
                continue;
            };
            if let Some(first) = seen.insert(addr, &device.path) {
                warn!(
                    bus_address = %addr,
                    first = %first.display(),
                    second = %device.path.display(),
                    "two configured devices share one bus address"
                );
            }
        }
    }

    // ── Bus address lookup ───────────────────────────────────────

    /// Live resolution, falling back to the last known address and then
    /// the cache. A live hit overwrites the cache entry.
    async fn bus_address_for(&mut self, idx: usize) -> Option<BusAddress> {
        let path = self.devices[idx].path.clone();

        match self.resolver.resolve(&path).await {
            Ok(addr) => {
                self.remember(idx, addr.clone());
                return Some(addr);
            }
            Err(ResolveError::NotFound { .. }) => {
                debug!(device = %path.display(), "no live device, falling back to known bus address");
            }
            Err(e) => {
                warn!(error = %CoreError::from(e), "live resolution failed");
            }
        }

        if let Some(addr) = self.devices[idx].bus_address.clone() {
            return Some(addr);
        }

        let cached = self.cache.get(&path).cloned()?;
        self.devices[idx].set_bus_address(cached.clone(), AddressSource::Cache);
        Some(cached)
    }

    fn remember(&mut self, idx: usize, addr: BusAddress) {
        let device = &mut self.devices[idx];
        if device.bus_address.as_ref() != Some(&addr) {
            debug!(device = %device.path.display(), bus_address = %addr, "resolved");
        }
        device.set_bus_address(addr.clone(), AddressSource::Live);

        match self.cache.record(&device.path, addr) {
            Ok(true) => debug!(cache = %self.cache.path().display(), "mapping cache updated"),
            Ok(false) => {}
            Err(e) => warn!(
                error = %CoreError::from(e),
                "keeping in-memory mapping for the rest of this run"
            ),
        }
    }

    // ── Ticks ────────────────────────────────────────────────────

    /// Probe every device once, recovering the missing ones.
    pub async fn tick(&mut self, cancel: &CancellationToken) -> TickReport {
        let mut report = TickReport::default();

        for idx in 0..self.devices.len() {
            if cancel.is_cancelled() {
                report.interrupted = true;
                break;
            }

            let probe = probe(&self.devices[idx].path);
            self.devices[idx].resolved_path = probe.resolved_path;

            if probe.healthy {
                report.healthy += 1;
                self.devices[idx].last_known_healthy = Some(Utc::now());
                if self.devices[idx].bus_address.is_none() {
                    self.bus_address_for(idx).await;
                }
                continue;
            }

            report.missing += 1;
            let Some(addr) = self.bus_address_for(idx).await else {
                report.unresolved += 1;
                warn!(
                    device = %self.devices[idx].path.display(),
                    "camera missing and no bus address known; retrying next tick"
                );
                continue;
            };

            warn!(
                device = %self.devices[idx].path.display(),
                bus_address = %addr,
                "{} missing → rebinding {addr}",
                self.devices[idx].path.display()
            );

            let outcome = self.orchestrator.recover(&mut self.devices[idx], addr).await;
            tally(&mut report, &outcome);
        }

        if report.missing == 0 && !report.interrupted {
            info!(healthy = report.healthy, "tick complete: all cameras present");
        } else {
            info!(
                healthy = report.healthy,
                missing = report.missing,
                recovered = report.recovered,
                failed = report.failed,
                unresolved = report.unresolved,
                interrupted = report.interrupted,
                "tick complete"
            );
        }

        report
    }

    /// Discover, then tick every `poll_interval` until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            devices = self.devices.len(),
            interval = %humantime::format_duration(self.config.poll_interval),
            cache = %self.config.cache_file.display(),
            "camera watchdog started"
        );

        self.discover().await;

        let paths: Vec<String> = self
            .devices
            .iter()
            .map(|d| d.path.display().to_string())
            .collect();
        info!(cameras = ?paths, "monitoring cameras");

        while !cancel.is_cancelled() {
            self.tick(&cancel).await;

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!("camera watchdog stopped");
    }
}

fn tally(report: &mut TickReport, outcome: &RecoveryReport) {
    if outcome.succeeded() {
        report.recovered += 1;
    } else {
        report.failed += 1;
    }
}
