//! HID device discovery.
//!
//! This module answers two questions for the instruction field: which HID
//! devices are attached right now, and which devices the user grants access
//! to when asked. In a browser these map onto `navigator.hid.getDevices()`
//! and `navigator.hid.requestDevice()`; on a native host they are answered
//! from the operating system's device tree.
//!
//! Enumeration is allowed to be unavailable (no udev, unsupported OS). In
//! that case [`HidBackend::list_connected_devices`] returns `None` and
//! callers treat it as "no devices".

use async_trait::async_trait;

use crate::{
    error::{Error, Result},
    types::{HidDevice, HidDeviceFilter},
};

#[cfg(target_os = "linux")]
pub mod linux;

/// Access to the host's HID devices.
#[async_trait]
pub trait HidBackend: Send + Sync {
    /// List attached devices the host already has access to.
    ///
    /// Returns `None` when enumeration is not available at all.
    async fn list_connected_devices(&self) -> Option<Vec<HidDevice>>;

    /// Ask for access to devices matching `filter`.
    async fn request_device(&self, filter: &HidDeviceFilter) -> Result<Vec<HidDevice>>;
}

/// Backend for hosts without HID enumeration.
pub struct UnsupportedHidBackend;

#[async_trait]
impl HidBackend for UnsupportedHidBackend {
    async fn list_connected_devices(&self) -> Option<Vec<HidDevice>> {
        None
    }

    async fn request_device(&self, _filter: &HidDeviceFilter) -> Result<Vec<HidDevice>> {
        Err(Error::Hid(
            "HID device access is not supported on this platform".to_string(),
        ))
    }
}

/// The best backend available for the current OS.
pub fn default_backend() -> Box<dyn HidBackend> {
    #[cfg(target_os = "linux")]
    {
        Box::new(linux::UdevHidBackend::new())
    }
    #[cfg(not(target_os = "linux"))]
    {
        Box::new(UnsupportedHidBackend)
    }
}

/// Parse a sysfs-style USB id such as `"2c97"`.
pub fn parse_usb_id(raw: &str) -> Option<u16> {
    u16::from_str_radix(raw.trim(), 16).ok()
}

/// Parse a sysfs `bInterfaceNumber`, which is also hex (`"00"`, `"01"`).
pub fn parse_interface_number(raw: &str) -> Option<u8> {
    u8::from_str_radix(raw.trim(), 16).ok()
}
