//! usbip-list client library
//!
//! Lists the USB devices a USB/IP peer exports, and the USB devices attached
//! locally. The remote path is: [`transport::connect`] a TCP stream, run one
//! [`session::list_remote_devices`] exchange over it, then render the records
//! with [`report`] and names from [`names::Catalog`]. Local devices come
//! from [`local`], and usbip-vudc gadgets from [`gadget`].

pub mod config;
pub mod error;
pub mod gadget;
pub mod local;
pub mod names;
pub mod report;
pub mod session;
pub mod transport;

pub use error::SessionError;
pub use session::{SessionLimits, Transport, list_remote_devices};

use anyhow::{Context, Result};
use protocol::DeviceRecord;
use tracing::debug;

/// Connect to `host` and list the devices it exports
///
/// The connection is closed when this returns, so any bytes the peer sent
/// past the declared reply are discarded with it.
pub fn list_exported_devices(
    host: &str,
    port: u16,
    settings: &transport::TransportSettings,
    limits: &SessionLimits,
) -> Result<Vec<DeviceRecord>> {
    let mut stream = transport::connect(host, port, settings)?;
    debug!("connected to {}:{}", host, port);

    let devices = list_remote_devices(&mut stream, host, limits)
        .with_context(|| format!("failed to get device list from {}", host))?;
    Ok(devices)
}
