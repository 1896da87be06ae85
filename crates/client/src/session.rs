//! Remote device-list session
//!
//! Drives one `OP_REQ_DEVLIST` exchange over an already connected stream
//! and materializes the reply as a list of [`DeviceRecord`]s.
//!
//! # Exchange
//!
//! ```text
//! client                                   peer
//!   | -- OP_REQ_DEVLIST (8 bytes) ---------> |
//!   | <- op_common (8 bytes) --------------- |  status != 0: nothing follows
//!   | <- device count (4 bytes) ------------ |
//!   | <- device record (312 bytes) --------- |  x device count
//!   | <- interface record (4 bytes) -------- |    x num_interfaces of that device
//! ```
//!
//! Both counts come from the peer. They are checked against [`SessionLimits`]
//! before they size any read or allocation.

use crate::error::{Result, SessionError};
use protocol::{
    DEVICE_RECORD_SIZE, DeviceRecord, INTERFACE_RECORD_SIZE, OP_COMMON_SIZE, OP_REP_DEVLIST,
    REPLY_HEADER_SIZE, decode_device, decode_header, decode_interface, decode_op_common,
    encode_request, validate_version,
};
use std::io::{self, Read, Write};
use tracing::{debug, info, warn};

/// Default ceiling on the number of devices a peer may declare
pub const DEFAULT_MAX_DEVICES: u32 = 1024;

/// Default ceiling on the number of interfaces a device may declare
/// (`USB_MAXINTERFACES` in the kernel)
pub const DEFAULT_MAX_INTERFACES: u8 = 32;

/// Blocking duplex byte stream the session talks over
///
/// Connection setup, teardown and deadlines are the transport's business.
pub trait Transport {
    /// Write all of `bytes`
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Fill `buf` completely; a stream that ends first yields `UnexpectedEof`
    fn receive_exact(&mut self, buf: &mut [u8]) -> io::Result<()>;
}

impl<S: Read + Write + ?Sized> Transport for S {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)?;
        self.flush()
    }

    fn receive_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.read_exact(buf)
    }
}

/// Local sanity ceilings for peer-declared counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_devices: u32,
    pub max_interfaces: u8,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_devices: DEFAULT_MAX_DEVICES,
            max_interfaces: DEFAULT_MAX_INTERFACES,
        }
    }
}

fn receive<T: Transport + ?Sized>(
    stream: &mut T,
    buf: &mut [u8],
    frame: &'static str,
) -> Result<()> {
    let expected = buf.len();
    stream.receive_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => SessionError::Truncated { frame, expected },
        _ => SessionError::Transport(e),
    })
}

/// List the devices exported by the peer on the other end of `stream`
///
/// Sends one request and consumes exactly the reply it declares. Bytes the
/// peer sends beyond that are left unread in the stream.
///
/// A peer exporting nothing yields an empty list. Any failure aborts the
/// whole exchange; nothing is retried here.
///
/// # Arguments
/// * `stream` - Connected stream to the peer
/// * `peer_label` - Name of the peer, used for logging only
/// * `limits` - Ceilings applied to the peer-declared counts
pub fn list_remote_devices<T: Transport + ?Sized>(
    stream: &mut T,
    peer_label: &str,
    limits: &SessionLimits,
) -> Result<Vec<DeviceRecord>> {
    stream
        .send(&encode_request())
        .map_err(SessionError::Transport)?;
    debug!("Sent OP_REQ_DEVLIST to {}", peer_label);

    // A failed reply stops after op_common, so the count is only read once
    // the status says it is there.
    let mut header_buf = [0u8; REPLY_HEADER_SIZE];
    receive(stream, &mut header_buf[..OP_COMMON_SIZE], "reply header")?;
    let common = decode_op_common(&header_buf[..OP_COMMON_SIZE])?;
    validate_version(common.version)?;
    if common.code != OP_REP_DEVLIST {
        return Err(SessionError::ProtocolViolation(format!(
            "unexpected reply code {:#06x} from {}",
            common.code, peer_label
        )));
    }
    if common.status != 0 {
        return Err(SessionError::rejected(common.status));
    }

    receive(stream, &mut header_buf[OP_COMMON_SIZE..], "reply header")?;
    let header = decode_header(&header_buf)?;
    debug!("exportable devices on {}: {}", peer_label, header.device_count);

    if header.device_count == 0 {
        info!("no exportable devices found on {}", peer_label);
        return Ok(Vec::new());
    }

    if header.device_count > limits.max_devices {
        warn!(
            "{} declared {} devices, limit is {}",
            peer_label, header.device_count, limits.max_devices
        );
        return Err(SessionError::ProtocolViolation(format!(
            "device count {} exceeds limit {}",
            header.device_count, limits.max_devices
        )));
    }

    let mut devices = Vec::with_capacity(header.device_count as usize);
    let mut device_buf = [0u8; DEVICE_RECORD_SIZE];
    let mut interface_buf = [0u8; INTERFACE_RECORD_SIZE];

    for index in 0..header.device_count {
        receive(stream, &mut device_buf, "device record")?;
        let mut device = decode_device(&device_buf)?;

        if device.num_interfaces > limits.max_interfaces {
            warn!(
                "{} device[{}] declared {} interfaces, limit is {}",
                peer_label, index, device.num_interfaces, limits.max_interfaces
            );
            return Err(SessionError::ProtocolViolation(format!(
                "device[{}] interface count {} exceeds limit {}",
                index, device.num_interfaces, limits.max_interfaces
            )));
        }

        device.interfaces.reserve_exact(device.num_interfaces as usize);
        for _ in 0..device.num_interfaces {
            receive(stream, &mut interface_buf, "interface record")?;
            device.interfaces.push(decode_interface(&interface_buf)?);
        }

        debug!(
            "device[{}] {} {:04x}:{:04x} with {} interfaces",
            index,
            device.busid,
            device.vendor_id,
            device.product_id,
            device.interfaces.len()
        );
        devices.push(device);
    }

    Ok(devices)
}
