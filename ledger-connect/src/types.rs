//! Shared enums and device types.
//!
//! These are the values held in [`crate::state::AppState`] and read by the
//! renderer. They parse from and print as the same strings used in the
//! configuration file and on the command line.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumString};

/// USB vendor id assigned to Ledger SAS.
pub const LEDGER_USB_VENDOR_ID: u16 = 0x2c97;

/// How the host talks to the Ledger device.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum TransportType {
    /// Bridged through the Ledger Live desktop application
    #[strum(to_string = "ledgerLive", serialize = "live")]
    #[serde(rename = "ledgerLive", alias = "live")]
    Live,
    /// Direct HID access
    #[default]
    #[strum(serialize = "webhid")]
    #[serde(rename = "webhid")]
    WebHid,
    /// Legacy U2F bridge
    #[strum(serialize = "u2f")]
    #[serde(rename = "u2f")]
    U2f,
}

/// Last observed presence of a Ledger on the HID bus.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum WebHidConnectedStatus {
    Connected,
    NotConnected,
    #[default]
    Unknown,
}

/// Outcome of the most recent transport creation attempt.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum TransportState {
    #[default]
    None,
    Verified,
    DeviceOpenFailure,
    UnknownFailure,
}

/// Where the UI is running.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentType {
    #[default]
    Popup,
    Notification,
    Fullscreen,
    Background,
}

impl EnvironmentType {
    pub fn is_fullscreen(&self) -> bool {
        matches!(self, EnvironmentType::Fullscreen)
    }
}

/// Browser family hosting the UI.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    #[default]
    Chrome,
    Firefox,
    Brave,
    Edge,
    Opera,
}

impl PlatformKind {
    pub fn is_firefox(&self) -> bool {
        matches!(self, PlatformKind::Firefox)
    }
}

/// A HID device as reported by enumeration or a device request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidDevice {
    pub vendor_id: u16,
    pub product_id: u16,
    pub product: Option<String>,
    /// Device node, when the backend knows it (e.g. `/dev/hidraw3`)
    pub path: Option<PathBuf>,
    /// USB interface number, when the backend knows it
    pub interface: Option<u8>,
}

impl HidDevice {
    pub fn is_ledger(&self) -> bool {
        self.vendor_id == LEDGER_USB_VENDOR_ID
    }
}

/// Filter passed to a device request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidDeviceFilter {
    pub vendor_id: u16,
}

impl HidDeviceFilter {
    /// Filter matching any Ledger device.
    pub const fn ledger() -> Self {
        Self {
            vendor_id: LEDGER_USB_VENDOR_ID,
        }
    }

    pub fn matches(&self, device: &HidDevice) -> bool {
        device.vendor_id == self.vendor_id
    }
}

/// Whether any of `devices` is a Ledger.
pub fn any_ledger(devices: &[HidDevice]) -> bool {
    devices.iter().any(HidDevice::is_ledger)
}
