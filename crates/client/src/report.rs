//! Listing output
//!
//! Renders decoded records for humans or, with `parsable`, as one
//! `key=value#` line per device.

use crate::local::LocalDevice;
use crate::names::Catalog;
use protocol::DeviceRecord;
use std::io::{self, Write};

/// Write the devices exported by one remote host
///
/// An empty list writes nothing; the session already logged that the peer
/// exports no devices.
pub fn write_remote_listing<W: Write>(
    out: &mut W,
    host: &str,
    devices: &[DeviceRecord],
    catalog: &Catalog,
    parsable: bool,
) -> io::Result<()> {
    if devices.is_empty() {
        return Ok(());
    }

    if parsable {
        for device in devices {
            writeln!(
                out,
                "host={}#busid={}#usbid={:04x}:{:04x}#",
                host, device.busid, device.vendor_id, device.product_id
            )?;
        }
        return Ok(());
    }

    writeln!(out, "Exportable USB devices")?;
    writeln!(out, "======================")?;
    writeln!(out, " - {}", host)?;

    for device in devices {
        writeln!(
            out,
            "{:>11}: {}",
            device.busid.to_string_lossy(),
            catalog.product_name(device.vendor_id, device.product_id)
        )?;
        writeln!(out, "{:>11}: {}", "", device.path)?;
        writeln!(
            out,
            "{:>11}: {}",
            "",
            catalog.class_name(
                device.device_class,
                device.device_subclass,
                device.device_protocol
            )
        )?;

        for (index, interface) in device.interfaces.iter().enumerate() {
            writeln!(
                out,
                "{:>11}: {:2} - {}",
                "",
                index,
                catalog.class_name(
                    interface.interface_class,
                    interface.interface_subclass,
                    interface.interface_protocol
                )
            )?;
        }

        writeln!(out)?;
    }

    Ok(())
}

/// Write the local USB devices
pub fn write_local_listing<W: Write>(
    out: &mut W,
    devices: &[LocalDevice],
    catalog: &Catalog,
    parsable: bool,
) -> io::Result<()> {
    for device in devices {
        if parsable {
            write!(
                out,
                "busid={}#usbid={:04x}:{:04x}#",
                device.busid, device.vendor_id, device.product_id
            )?;
        } else {
            writeln!(
                out,
                " - busid {} ({:04x}:{:04x})",
                device.busid, device.vendor_id, device.product_id
            )?;
            writeln!(
                out,
                "   {}",
                catalog.product_name(device.vendor_id, device.product_id)
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}
