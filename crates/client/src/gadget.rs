//! USB gadgets exported through usbip-vudc
//!
//! A gadget bound to the `usbip-vudc` platform driver exposes its USB device
//! descriptor in a `dev_desc` sysfs attribute. The descriptor is USB-native,
//! so its multi-byte fields are little-endian.

use crate::local::LocalDevice;
use anyhow::{Context, Result, bail};
use byteorder::{ByteOrder, LittleEndian};
use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Platform driver that exports gadgets over USB/IP
pub const VUDC_DRIVER_NAME: &str = "usbip-vudc";

/// Sysfs directory of platform devices
pub const PLATFORM_DEVICES_DIR: &str = "/sys/bus/platform/devices";

const VUDC_DEVICE_DESCR_FILE: &str = "dev_desc";

/// Size of a standard USB device descriptor
const DEVICE_DESCRIPTOR_SIZE: usize = 18;
const ID_VENDOR_OFFSET: usize = 8;
const ID_PRODUCT_OFFSET: usize = 10;

/// Vendor and product ids from a raw USB device descriptor
pub fn parse_device_descriptor(desc: &[u8]) -> Result<(u16, u16)> {
    if desc.len() < DEVICE_DESCRIPTOR_SIZE {
        bail!(
            "device descriptor too short: {} bytes, expected {}",
            desc.len(),
            DEVICE_DESCRIPTOR_SIZE
        );
    }
    let vendor_id = LittleEndian::read_u16(&desc[ID_VENDOR_OFFSET..]);
    let product_id = LittleEndian::read_u16(&desc[ID_PRODUCT_OFFSET..]);
    Ok((vendor_id, product_id))
}

fn bound_to_vudc(device_dir: &Path) -> bool {
    fs::read_link(device_dir.join("driver"))
        .ok()
        .and_then(|target| target.file_name().map(|n| n == OsStr::new(VUDC_DRIVER_NAME)))
        .unwrap_or(false)
}

/// List gadgets bound to usbip-vudc under `platform_dir`, sorted by name
///
/// A vudc device whose descriptor can't be read fails the whole listing.
pub fn list_gadget_devices_in(platform_dir: &Path) -> Result<Vec<LocalDevice>> {
    let entries = fs::read_dir(platform_dir)
        .with_context(|| format!("Failed to read {}", platform_dir.display()))?;

    let mut gadgets = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read {}", platform_dir.display()))?;
        let device_dir = entry.path();
        if !bound_to_vudc(&device_dir) {
            continue;
        }

        let busid = entry.file_name().to_string_lossy().into_owned();
        let desc_path = device_dir.join(VUDC_DEVICE_DESCR_FILE);
        let desc = fs::read(&desc_path)
            .with_context(|| format!("problem getting device attributes: {}", desc_path.display()))?;
        let (vendor_id, product_id) = parse_device_descriptor(&desc)
            .with_context(|| format!("invalid descriptor for {}", busid))?;

        debug!("Gadget {} {:04x}:{:04x}", busid, vendor_id, product_id);
        gadgets.push(LocalDevice {
            busid,
            vendor_id,
            product_id,
        });
    }

    gadgets.sort_by(|a, b| a.busid.cmp(&b.busid));
    Ok(gadgets)
}

/// List gadgets bound to usbip-vudc on this machine
pub fn list_gadget_devices() -> Result<Vec<LocalDevice>> {
    list_gadget_devices_in(Path::new(PLATFORM_DEVICES_DIR))
}
