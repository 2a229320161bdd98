//! Transport creation over Linux hidraw.
//!
//! Opens the APDU interface node of the first attached Ledger and takes a
//! non-blocking exclusive `flock` on it. Nano models also expose a FIDO
//! interface on a separate hidraw node, which is never opened here.
//!
//! The lock is how other well-behaved applications (Ledger Live, other
//! wallets) signal that they hold the device; failing to take it is reported
//! the same way a browser reports a device it cannot open. Once held, the
//! node stays open until [`TransportFactory::close`] and a second attempt
//! reports the device as already open.

use async_trait::async_trait;
use nix::fcntl::{Flock, FlockArg};
use std::{fs::File, path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

use super::{
    TransportError, TransportFactory, DEVICE_ALREADY_OPEN_MESSAGE, DEVICE_OPEN_FAILURE_MESSAGE,
};
use crate::{hid::HidBackend, tracing::prelude::*, types::HidDevice};

/// USB interface carrying the APDU channel.
const APDU_INTERFACE: u8 = 0;

/// hidraw-backed transport factory.
pub struct HidrawTransportFactory {
    hid: Arc<dyn HidBackend>,
    held: Mutex<Option<HeldDevice>>,
}

struct HeldDevice {
    path: PathBuf,
    _lock: Flock<File>,
}

impl HidrawTransportFactory {
    pub fn new(hid: Arc<dyn HidBackend>) -> Self {
        Self {
            hid,
            held: Mutex::new(None),
        }
    }
}

// Nodes with an unknown interface number are assumed to be the APDU one.
fn apdu_node(devices: &[HidDevice]) -> Option<PathBuf> {
    devices
        .iter()
        .filter(|d| d.is_ledger())
        .filter(|d| d.interface.unwrap_or(APDU_INTERFACE) == APDU_INTERFACE)
        .find_map(|d| d.path.clone())
}

#[async_trait]
impl TransportFactory for HidrawTransportFactory {
    async fn attempt_transport_creation(&self) -> Result<bool, TransportError> {
        let mut held = self.held.lock().await;
        if held.is_some() {
            return Err(TransportError::new(DEVICE_ALREADY_OPEN_MESSAGE));
        }

        let devices = self.hid.list_connected_devices().await.unwrap_or_default();
        let Some(path) = apdu_node(&devices) else {
            debug!("No Ledger hidraw node to open");
            return Ok(false);
        };

        let open_path = path.clone();
        let lock = tokio::task::spawn_blocking(move || open_exclusive(&open_path))
            .await
            .map_err(|e| TransportError::new(format!("transport task failed: {}", e)))??;

        info!(path = %path.display(), "Opened Ledger device");
        *held = Some(HeldDevice { path, _lock: lock });
        Ok(true)
    }

    async fn close(&self) {
        if let Some(held) = self.held.lock().await.take() {
            debug!(path = %held.path.display(), "Released Ledger device");
        }
    }
}

fn open_exclusive(path: &std::path::Path) -> Result<Flock<File>, TransportError> {
    let file = File::options()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| {
            warn!(path = %path.display(), error = %e, "Open failed");
            TransportError::new(format!("{}: {}", DEVICE_OPEN_FAILURE_MESSAGE, e))
        })?;

    Flock::lock(file, FlockArg::LockExclusiveNonblock).map_err(|(_, errno)| {
        warn!(path = %path.display(), error = %errno, "Device locked by another application");
        TransportError::new(format!(
            "{}: in use by another application ({})",
            DEVICE_OPEN_FAILURE_MESSAGE, errno
        ))
    })
}
