//! Shared application state.
//!
//! Holds the three values the instruction field reads and writes: the
//! configured transport type, the last observed HID connection status, and
//! the outcome of the last transport creation attempt. The state outlives
//! any single mount of the field; it is created once by the application and
//! handed to each field instance.
//!
//! Writes are serialized by the underlying watch channel, so overlapping
//! writers resolve as last-writer-wins. Subscribers are woken only when a
//! write actually changes a value.

use std::sync::Arc;
use tokio::sync::watch;

use crate::{
    tracing::prelude::*,
    types::{TransportState, TransportType, WebHidConnectedStatus},
};

/// Consistent view of all three values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateSnapshot {
    pub transport_type: TransportType,
    pub webhid_connected_status: WebHidConnectedStatus,
    pub transport_status: TransportState,
}

/// Cloneable handle to the shared state.
#[derive(Clone)]
pub struct AppState {
    tx: Arc<watch::Sender<StateSnapshot>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(TransportType::default())
    }
}

impl AppState {
    /// Create state for the given transport type, with connection status
    /// unknown and no transport verified.
    pub fn new(transport_type: TransportType) -> Self {
        Self::with_snapshot(StateSnapshot {
            transport_type,
            ..Default::default()
        })
    }

    pub fn with_snapshot(snapshot: StateSnapshot) -> Self {
        let (tx, _rx) = watch::channel(snapshot);
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        *self.tx.borrow()
    }

    /// Receive a notification each time any value changes.
    pub fn subscribe(&self) -> watch::Receiver<StateSnapshot> {
        self.tx.subscribe()
    }

    pub fn ledger_transport_type(&self) -> TransportType {
        self.tx.borrow().transport_type
    }

    pub fn set_ledger_transport_type(&self, value: TransportType) {
        self.tx.send_if_modified(|s| {
            let old = std::mem::replace(&mut s.transport_type, value);
            log_change("transport_type", old, value)
        });
    }

    pub fn webhid_connected_status(&self) -> WebHidConnectedStatus {
        self.tx.borrow().webhid_connected_status
    }

    pub fn set_webhid_connected_status(&self, value: WebHidConnectedStatus) {
        self.tx.send_if_modified(|s| {
            let old = std::mem::replace(&mut s.webhid_connected_status, value);
            log_change("webhid_connected_status", old, value)
        });
    }

    pub fn transport_status(&self) -> TransportState {
        self.tx.borrow().transport_status
    }

    pub fn set_transport_status(&self, value: TransportState) {
        self.set_transport_status_if(value, || true);
    }

    /// Write `value` only if `keep` still holds once the write lock is taken.
    ///
    /// Returns whether `keep` held. A write racing with another writer is
    /// decided under the same lock, so a concurrent
    /// [`AppState::set_transport_status`] is never overwritten by a write
    /// whose condition has already been revoked.
    pub fn set_transport_status_if(
        &self,
        value: TransportState,
        keep: impl FnOnce() -> bool,
    ) -> bool {
        let mut kept = false;
        self.tx.send_if_modified(|s| {
            if !keep() {
                return false;
            }
            kept = true;
            let old = std::mem::replace(&mut s.transport_status, value);
            log_change("transport_status", old, value)
        });
        kept
    }
}

fn log_change<T: PartialEq + std::fmt::Display>(field: &'static str, old: T, new: T) -> bool {
    if old == new {
        return false;
    }
    debug!(field, old = %old, new = %new, "State updated");
    true
}
