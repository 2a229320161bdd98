//! Linux HID discovery via udev.
//!
//! Walks the `hidraw` subsystem and reads vendor and product ids from each
//! node's parent `usb_device`, and the interface number from its parent
//! `usb_interface`. Devices on other buses (Bluetooth, I2C) have no such
//! parent and are skipped.
//!
//! There is no permission prompt on Linux, so a device request returns the
//! attached devices that match the filter. Whether the process may actually
//! open them is only learned when a transport is created.

use async_trait::async_trait;
use udev::Enumerator;

use super::{parse_interface_number, parse_usb_id, HidBackend};
use crate::{
    error::{Error, Result},
    tracing::prelude::*,
    types::{HidDevice, HidDeviceFilter},
};

/// udev-backed HID discovery.
pub struct UdevHidBackend;

impl UdevHidBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UdevHidBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HidBackend for UdevHidBackend {
    async fn list_connected_devices(&self) -> Option<Vec<HidDevice>> {
        // udev handles are !Send and the scan blocks on sysfs
        match tokio::task::spawn_blocking(scan_hidraw).await {
            Ok(Ok(devices)) => {
                trace!(count = devices.len(), "Enumerated hidraw devices");
                Some(devices)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "HID enumeration unavailable");
                None
            }
            Err(join_error) => {
                error!(error = %join_error, "HID enumeration task panicked");
                None
            }
        }
    }

    async fn request_device(&self, filter: &HidDeviceFilter) -> Result<Vec<HidDevice>> {
        let devices = tokio::task::spawn_blocking(scan_hidraw)
            .await
            .map_err(|e| Error::Hid(format!("enumeration task failed: {}", e)))??;

        let granted: Vec<HidDevice> = devices.into_iter().filter(|d| filter.matches(d)).collect();
        debug!(
            vid = %format!("{:04x}", filter.vendor_id),
            count = granted.len(),
            "Device request answered"
        );
        Ok(granted)
    }
}

fn scan_hidraw() -> Result<Vec<HidDevice>> {
    let mut enumerator = Enumerator::new()?;
    enumerator.match_subsystem("hidraw")?;

    let mut devices = Vec::new();
    for device in enumerator.scan_devices()? {
        let Some(usb) = device.parent_with_subsystem_devtype("usb", "usb_device")? else {
            continue;
        };

        let attr = |name: &str| {
            usb.attribute_value(name)
                .and_then(|v| v.to_str())
                .map(str::to_owned)
        };

        let (Some(vendor_id), Some(product_id)) = (
            attr("idVendor").as_deref().and_then(parse_usb_id),
            attr("idProduct").as_deref().and_then(parse_usb_id),
        ) else {
            continue;
        };

        let interface = device
            .parent_with_subsystem_devtype("usb", "usb_interface")?
            .and_then(|intf| {
                intf.attribute_value("bInterfaceNumber")
                    .and_then(|v| v.to_str())
                    .and_then(parse_interface_number)
            });

        devices.push(HidDevice {
            vendor_id,
            product_id,
            product: attr("product"),
            path: device.devnode().map(|p| p.to_path_buf()),
            interface,
        });
    }

    Ok(devices)
}
