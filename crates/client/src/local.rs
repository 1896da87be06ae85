//! Local USB device enumeration

use anyhow::{Context, Result};
use rusb::UsbContext;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// USB hub device class
const USB_CLASS_HUB: u8 = 0x09;

/// Host controller that carries devices imported over USB/IP
pub const VHCI_DRIVER_NAME: &str = "vhci_hcd";

/// Sysfs directory holding one link per USB device, named by bus id
pub const USB_DEVICES_DIR: &str = "/sys/bus/usb/devices";

/// A USB device attached to this machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDevice {
    /// Kernel bus id, e.g. "1-1.2"
    pub busid: String,
    pub vendor_id: u16,
    pub product_id: u16,
}

/// Build a kernel-style bus id from a bus number and port chain
pub fn format_busid(bus_number: u8, ports: &[u8]) -> String {
    let chain: Vec<String> = ports.iter().map(|p| p.to_string()).collect();
    format!("{}-{}", bus_number, chain.join("."))
}

/// Resolve the sysfs device path behind `busid`
///
/// Returns None when the link can't be resolved, e.g. without sysfs.
pub fn resolve_devpath(usb_devices_dir: &Path, busid: &str) -> Option<PathBuf> {
    fs::canonicalize(usb_devices_dir.join(busid)).ok()
}

/// Whether a device path sits below the USB/IP virtual host controller
pub fn is_attached_to_vhci(devpath: &Path) -> bool {
    devpath
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with(VHCI_DRIVER_NAME))
}

/// Order devices by bus number, then port chain
fn sort_by_topology(mut keyed: Vec<(u8, Vec<u8>, LocalDevice)>) -> Vec<LocalDevice> {
    keyed.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
    keyed.into_iter().map(|(_, _, device)| device).collect()
}

/// List local USB devices, sorted by bus number and port chain
///
/// Hubs are excluded, as are devices already imported from a USB/IP peer
/// (attached to `vhci_hcd`). Devices whose descriptor or port chain can't be
/// read are skipped with a warning instead of failing the whole listing.
pub fn list_local_devices() -> Result<Vec<LocalDevice>> {
    let context = rusb::Context::new().context("Failed to initialise libusb")?;
    let devices = context
        .devices()
        .context("Failed to enumerate local USB devices")?;
    let usb_devices_dir = Path::new(USB_DEVICES_DIR);

    let mut keyed = Vec::new();
    for device in devices.iter() {
        let descriptor = match device.device_descriptor() {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(
                    "Skipping device {:03}/{:03}: {}",
                    device.bus_number(),
                    device.address(),
                    e
                );
                continue;
            }
        };

        if descriptor.class_code() == USB_CLASS_HUB {
            continue;
        }

        let ports = match device.port_numbers() {
            Ok(ports) => ports,
            Err(e) => {
                warn!(
                    "Skipping device {:03}/{:03}: no port chain: {}",
                    device.bus_number(),
                    device.address(),
                    e
                );
                continue;
            }
        };

        let busid = format_busid(device.bus_number(), &ports);
        if let Some(devpath) = resolve_devpath(usb_devices_dir, &busid)
            && is_attached_to_vhci(&devpath)
        {
            debug!(
                "Skip the device {} already attached to {}",
                devpath.display(),
                VHCI_DRIVER_NAME
            );
            continue;
        }

        debug!(
            "Local device {} {:04x}:{:04x}",
            busid,
            descriptor.vendor_id(),
            descriptor.product_id()
        );
        keyed.push((
            device.bus_number(),
            ports,
            LocalDevice {
                busid,
                vendor_id: descriptor.vendor_id(),
                product_id: descriptor.product_id(),
            },
        ));
    }

    Ok(sort_by_topology(keyed))
}
