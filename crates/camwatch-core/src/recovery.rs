// ── Recovery orchestration ──
//
// One `RecoverySession` per attempt:
//
//   Idle → Unbinding → SettlingAfterUnbind → Rebinding → SettlingAfterRebind → Done
//
// with an edge to `Failed` from any state after `Idle`. The session holds
// the device mutably for its whole lifetime, so a second session for the
// same device cannot exist while one is running. Settle delays are never
// cut short: shutdown waits for the sequence to finish rather than leave
// an interface unbound.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use strum::{Display, IntoStaticStr};
use tracing::{debug, error, info, warn};

use crate::config::SettleDelays;
use crate::driver::{DriverControl, DriverError};
use crate::model::{BusAddress, CameraDevice};

/// Recovery session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum RecoveryState {
    Idle,
    Unbinding,
    SettlingAfterUnbind,
    Rebinding,
    SettlingAfterRebind,
    Done,
    Failed,
}

impl RecoveryState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// What happened during one recovery attempt.
#[derive(Debug)]
pub struct RecoveryReport {
    pub device: PathBuf,
    pub bus_address: BusAddress,
    /// Every state the session entered, starting with `Idle`.
    pub states: Vec<RecoveryState>,
    /// The driver failure that ended the session, if any.
    pub error: Option<DriverError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RecoveryReport {
    pub fn succeeded(&self) -> bool {
        self.states.last() == Some(&RecoveryState::Done)
    }
}

/// A single unbind/rebind attempt for one device.
pub struct RecoverySession<'a> {
    device: &'a mut CameraDevice,
    bus_address: BusAddress,
    state: RecoveryState,
    states: Vec<RecoveryState>,
    started_at: DateTime<Utc>,
}

impl<'a> RecoverySession<'a> {
    pub fn new(device: &'a mut CameraDevice, bus_address: BusAddress) -> Self {
        Self {
            device,
            bus_address,
            state: RecoveryState::Idle,
            states: vec![RecoveryState::Idle],
            started_at: Utc::now(),
        }
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    pub fn bus_address(&self) -> &BusAddress {
        &self.bus_address
    }

    fn enter(&mut self, next: RecoveryState) {
        debug!(
            device = %self.device.path.display(),
            bus_address = %self.bus_address,
            from = %self.state,
            to = %next,
            "recovery transition"
        );
        self.state = next;
        self.states.push(next);
    }

    fn fail(&mut self, step: &str, err: &DriverError) {
        if err.is_permission_denied() {
            error!(
                device = %self.device.path.display(),
                bus_address = %self.bus_address,
                error = %err,
                "{step} refused: permission denied (is camwatch running as root?)"
            );
        } else {
            warn!(
                device = %self.device.path.display(),
                bus_address = %self.bus_address,
                error = %err,
                "{step} failed"
            );
        }
        self.enter(RecoveryState::Failed);
    }

    /// Drive the session to `Done` or `Failed`.
    pub async fn run<D: DriverControl>(mut self, driver: &D, settle: SettleDelays) -> RecoveryReport {
        info!(
            device = %self.device.path.display(),
            bus_address = %self.bus_address,
            "rebinding camera"
        );

        let error = self.drive(driver, settle).await.err();
        if error.is_none() {
            info!(
                device = %self.device.path.display(),
                bus_address = %self.bus_address,
                "done rebinding"
            );
        }

        RecoveryReport {
            device: self.device.path.clone(),
            bus_address: self.bus_address,
            states: self.states,
            error,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }

    async fn drive<D: DriverControl>(
        &mut self,
        driver: &D,
        settle: SettleDelays,
    ) -> Result<(), DriverError> {
        self.enter(RecoveryState::Unbinding);
        if let Err(e) = driver.unbind(&self.bus_address).await {
            self.fail("unbind", &e);
            return Err(e);
        }

        self.enter(RecoveryState::SettlingAfterUnbind);
        tokio::time::sleep(settle.after_unbind).await;

        self.enter(RecoveryState::Rebinding);
        if let Err(e) = driver.bind(&self.bus_address).await {
            self.fail("bind", &e);
            return Err(e);
        }

        self.enter(RecoveryState::SettlingAfterRebind);
        tokio::time::sleep(settle.after_rebind).await;

        // Health is decided by the next probe, not assumed here.
        self.enter(RecoveryState::Done);
        Ok(())
    }
}

/// Runs recovery sessions against one driver control surface.
#[derive(Debug, Clone)]
pub struct RecoveryOrchestrator<D> {
    driver: D,
    settle: SettleDelays,
}

impl<D: DriverControl> RecoveryOrchestrator<D> {
    pub fn new(driver: D, settle: SettleDelays) -> Self {
        Self { driver, settle }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn settle(&self) -> SettleDelays {
        self.settle
    }

    /// Run one complete unbind/rebind attempt for `device`.
    pub async fn recover(&self, device: &mut CameraDevice, addr: BusAddress) -> RecoveryReport {
        RecoverySession::new(device, addr)
            .run(&self.driver, self.settle)
            .await
    }
}
