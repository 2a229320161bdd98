//! Transport creation and failure classification.
//!
//! A transport is the channel host software uses to exchange APDUs with the
//! Ledger. The instruction field never uses the transport itself; it only
//! needs to know whether one *could* be created, and if not, whether the
//! user can fix it by closing other applications.
//!
//! The platform layer reports failures as free-form messages. Classification
//! matches on two fixed substrings:
//!
//! - `"Failed to open the device"`: another application holds the device
//! - `"the device is already open"`: this host already holds it, which is
//!   as good as success
//!
//! Anything else is an unknown failure. The match is on message text, so a
//! platform that localizes or rewords these messages will fall through to
//! [`TransportFailureKind::Unknown`].

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::{hid::HidBackend, types::TransportState};

#[cfg(target_os = "linux")]
pub mod hidraw;

/// Message fragment reported when the device cannot be opened.
pub const DEVICE_OPEN_FAILURE_MESSAGE: &str = "Failed to open the device";

/// Message fragment reported when the device is already held by this host.
pub const DEVICE_ALREADY_OPEN_MESSAGE: &str = "the device is already open";

/// Failure reported by a transport creation attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> TransportFailureKind {
        classify_failure(&self.message)
    }
}

/// Typed view of a transport failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailureKind {
    DeviceOpenFailure,
    AlreadyOpen,
    Unknown,
}

impl TransportFailureKind {
    /// The transport state this failure should be recorded as.
    pub fn transport_state(&self) -> TransportState {
        match self {
            TransportFailureKind::DeviceOpenFailure => TransportState::DeviceOpenFailure,
            TransportFailureKind::AlreadyOpen => TransportState::Verified,
            TransportFailureKind::Unknown => TransportState::UnknownFailure,
        }
    }
}

/// Classify a failure message.
pub fn classify_failure(message: &str) -> TransportFailureKind {
    if message.contains(DEVICE_OPEN_FAILURE_MESSAGE) {
        TransportFailureKind::DeviceOpenFailure
    } else if message.contains(DEVICE_ALREADY_OPEN_MESSAGE) {
        TransportFailureKind::AlreadyOpen
    } else {
        TransportFailureKind::Unknown
    }
}

/// Map a whole attempt result onto a transport state.
///
/// `Ok(false)` means the platform completed without error but produced no
/// transport.
pub fn transport_state_for(result: &Result<bool, TransportError>) -> TransportState {
    match result {
        Ok(true) => TransportState::Verified,
        Ok(false) => TransportState::UnknownFailure,
        Err(e) => e.kind().transport_state(),
    }
}

/// Creates transports to the Ledger device.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Try once to create a transport.
    async fn attempt_transport_creation(&self) -> Result<bool, TransportError>;

    /// Release whatever a successful attempt is holding.
    async fn close(&self) {}
}

/// Factory for hosts without a HID transport.
pub struct UnavailableTransportFactory;

#[async_trait]
impl TransportFactory for UnavailableTransportFactory {
    async fn attempt_transport_creation(&self) -> Result<bool, TransportError> {
        Err(TransportError::new(
            "HID transport is not supported on this platform",
        ))
    }
}

/// The best transport factory available for the current OS.
pub fn default_factory(hid: Arc<dyn HidBackend>) -> Arc<dyn TransportFactory> {
    #[cfg(target_os = "linux")]
    {
        Arc::new(hidraw::HidrawTransportFactory::new(hid))
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = hid;
        Arc::new(UnavailableTransportFactory)
    }
}
