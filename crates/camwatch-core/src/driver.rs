// ── USB driver control surface ──
//
// Linux exposes `bind` and `unbind` files under each USB driver's sysfs
// directory. Writing an interface's bus address to `unbind` detaches it;
// writing it to `bind` attaches it again. The kernel rejects redundant
// operations with an I/O error, which callers treat like any other failure.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::config::{DEFAULT_DRIVER, DEFAULT_DRIVERS_ROOT};
use crate::model::BusAddress;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("permission denied writing {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("{} does not exist (driver not loaded?)", path.display())]
    NotFound { path: PathBuf },

    #[error("write to {} failed: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DriverError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

/// Detach/attach a USB interface from/to its driver.
pub trait DriverControl {
    fn unbind(&self, addr: &BusAddress) -> impl Future<Output = Result<(), DriverError>> + Send;

    fn bind(&self, addr: &BusAddress) -> impl Future<Output = Result<(), DriverError>> + Send;
}

/// Driver control through `<drivers_root>/<driver>/{bind,unbind}`.
#[derive(Debug, Clone)]
pub struct SysfsDriver {
    driver_dir: PathBuf,
}

impl SysfsDriver {
    pub fn new(drivers_root: impl AsRef<Path>, driver: &str) -> Self {
        Self {
            driver_dir: drivers_root.as_ref().join(driver),
        }
    }

    pub fn driver_dir(&self) -> &Path {
        &self.driver_dir
    }

    async fn write_control(&self, file: &str, addr: &BusAddress) -> Result<(), DriverError> {
        let path = self.driver_dir.join(file);

        // Control files already exist; never create one.
        let mut f = tokio::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .await
            .map_err(|e| DriverError::from_io(&path, e))?;

        f.write_all(addr.as_str().as_bytes())
            .await
            .map_err(|e| DriverError::from_io(&path, e))?;
        f.flush().await.map_err(|e| DriverError::from_io(&path, e))
    }
}

impl Default for SysfsDriver {
    fn default() -> Self {
        Self::new(DEFAULT_DRIVERS_ROOT, DEFAULT_DRIVER)
    }
}

impl DriverControl for SysfsDriver {
    async fn unbind(&self, addr: &BusAddress) -> Result<(), DriverError> {
        self.write_control("unbind", addr).await
    }

    async fn bind(&self, addr: &BusAddress) -> Result<(), DriverError> {
        self.write_control("bind", addr).await
    }
}
