//! USB/IP device-list frame encoding and decoding
//!
//! Every frame involved in a device-list exchange has a fixed size, so each
//! one gets its own decode function taking exactly that many bytes. The
//! variable part of the reply (how many devices, how many interfaces per
//! device) is driven by the caller, which is expected to bound the
//! peer-declared counts before using them.
//!
//! # Frame Layout
//!
//! All integers are big-endian (network byte order), no padding between fields:
//! ```text
//! Request       [version: u16][code: u16 = 0x8005][status: u32 = 0]
//! Reply header  [version: u16][code: u16 = 0x0005][status: u32][device count: u32]
//! Device        [path: 256][busid: 32][busnum: u32][devnum: u32][speed: u32]
//!               [idVendor: u16][idProduct: u16][bcdDevice: u16]
//!               [class: u8][subclass: u8][protocol: u8]
//!               [configuration value: u8][num configurations: u8][num interfaces: u8]
//! Interface     [class: u8][subclass: u8][protocol: u8][padding: u8]
//! ```

use crate::error::{DecodeError, Result};
use crate::types::{
    BUSID_FIELD_LEN, DeviceRecord, FixedText, InterfaceRecord, OpCommon, PATH_FIELD_LEN,
    ReplyHeader,
};
use crate::version::{OP_REP_DEVLIST, OP_REQ_DEVLIST, USBIP_VERSION, validate_version};
use byteorder::{BigEndian, ByteOrder};

/// Size of the version/code/status prefix shared by all management frames
pub const OP_COMMON_SIZE: usize = 8;

/// Size of the device-list request
pub const REQUEST_SIZE: usize = OP_COMMON_SIZE;

/// Size of the device-list reply header (op_common + device count)
pub const REPLY_HEADER_SIZE: usize = OP_COMMON_SIZE + 4;

/// Size of one device record
pub const DEVICE_RECORD_SIZE: usize = PATH_FIELD_LEN + BUSID_FIELD_LEN + 3 * 4 + 3 * 2 + 6;

/// Size of one interface record
pub const INTERFACE_RECORD_SIZE: usize = 4;

/// Sequential big-endian field reader over a frame that has already been
/// length-checked
struct FieldReader<'a> {
    buf: &'a [u8],
}

impl<'a> FieldReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() < n {
            return Err(DecodeError::Truncated {
                expected: n,
                actual: self.buf.len(),
            });
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

/// Sequential big-endian field writer into a fixed-size frame
struct FieldWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> FieldWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn bytes(&mut self, data: &[u8]) {
        self.buf[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
    }

    fn u8(&mut self, value: u8) {
        self.bytes(&[value]);
    }

    fn u16(&mut self, value: u16) {
        BigEndian::write_u16(&mut self.buf[self.pos..self.pos + 2], value);
        self.pos += 2;
    }

    fn u32(&mut self, value: u32) {
        BigEndian::write_u32(&mut self.buf[self.pos..self.pos + 4], value);
        self.pos += 4;
    }

    fn i32(&mut self, value: i32) {
        BigEndian::write_i32(&mut self.buf[self.pos..self.pos + 4], value);
        self.pos += 4;
    }
}

fn check_len(bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() < expected {
        return Err(DecodeError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }
    if bytes.len() > expected {
        return Err(DecodeError::TrailingBytes {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Encode the `OP_REQ_DEVLIST` request
///
/// # Example
/// ```
/// use protocol::{REQUEST_SIZE, encode_request};
///
/// let frame = encode_request();
/// assert_eq!(frame.len(), REQUEST_SIZE);
/// assert_eq!(&frame[..4], &[0x01, 0x11, 0x80, 0x05]);
/// ```
pub fn encode_request() -> [u8; REQUEST_SIZE] {
    let mut frame = [0u8; REQUEST_SIZE];
    let mut w = FieldWriter::new(&mut frame);
    w.u16(USBIP_VERSION);
    w.u16(OP_REQ_DEVLIST);
    w.i32(0);
    frame
}

/// Decode the 8-byte version/code/status prefix
///
/// No field is validated here; this is what a caller reads first to decide
/// whether the peer is going to send anything else.
pub fn decode_op_common(bytes: &[u8]) -> Result<OpCommon> {
    check_len(bytes, OP_COMMON_SIZE)?;
    let mut r = FieldReader::new(bytes);
    Ok(OpCommon {
        version: r.u16()?,
        code: r.u16()?,
        status: r.i32()?,
    })
}

/// Decode a device-list reply header
///
/// Rejects a foreign protocol version or an operation code other than
/// `OP_REP_DEVLIST`. The status is returned as-is; judging it is up to the
/// caller.
///
/// # Example
/// ```
/// use protocol::decode_header;
///
/// let bytes = [0x01, 0x11, 0x00, 0x05, 0, 0, 0, 0, 0, 0, 0, 3];
/// let header = decode_header(&bytes).unwrap();
/// assert_eq!(header.device_count, 3);
/// ```
pub fn decode_header(bytes: &[u8]) -> Result<ReplyHeader> {
    check_len(bytes, REPLY_HEADER_SIZE)?;
    let mut r = FieldReader::new(bytes);
    let version = r.u16()?;
    let code = r.u16()?;
    let status = r.i32()?;
    let device_count = r.u32()?;

    validate_version(version)?;
    if code != OP_REP_DEVLIST {
        return Err(DecodeError::UnexpectedCode {
            expected: OP_REP_DEVLIST,
            actual: code,
        });
    }

    Ok(ReplyHeader {
        version,
        code,
        status,
        device_count,
    })
}

/// Encode a device-list reply header (peer side)
pub fn encode_header(header: &ReplyHeader) -> [u8; REPLY_HEADER_SIZE] {
    let mut frame = [0u8; REPLY_HEADER_SIZE];
    let mut w = FieldWriter::new(&mut frame);
    w.u16(header.version);
    w.u16(header.code);
    w.i32(header.status);
    w.u32(header.device_count);
    frame
}

/// Decode one device record
///
/// The returned record has an empty interface list; the interface frames
/// that follow it on the wire are decoded separately.
pub fn decode_device(bytes: &[u8]) -> Result<DeviceRecord> {
    check_len(bytes, DEVICE_RECORD_SIZE)?;
    let mut r = FieldReader::new(bytes);
    Ok(DeviceRecord {
        path: FixedText::new(r.array::<PATH_FIELD_LEN>()?),
        busid: FixedText::new(r.array::<BUSID_FIELD_LEN>()?),
        busnum: r.u32()?,
        devnum: r.u32()?,
        speed: r.u32()?,
        vendor_id: r.u16()?,
        product_id: r.u16()?,
        bcd_device: r.u16()?,
        device_class: r.u8()?,
        device_subclass: r.u8()?,
        device_protocol: r.u8()?,
        configuration_value: r.u8()?,
        num_configurations: r.u8()?,
        num_interfaces: r.u8()?,
        interfaces: Vec::new(),
    })
}

/// Encode one device record (peer side). The interface list is not part of
/// the device frame and is ignored.
pub fn encode_device(device: &DeviceRecord) -> [u8; DEVICE_RECORD_SIZE] {
    let mut frame = [0u8; DEVICE_RECORD_SIZE];
    let mut w = FieldWriter::new(&mut frame);
    w.bytes(device.path.raw());
    w.bytes(device.busid.raw());
    w.u32(device.busnum);
    w.u32(device.devnum);
    w.u32(device.speed);
    w.u16(device.vendor_id);
    w.u16(device.product_id);
    w.u16(device.bcd_device);
    w.u8(device.device_class);
    w.u8(device.device_subclass);
    w.u8(device.device_protocol);
    w.u8(device.configuration_value);
    w.u8(device.num_configurations);
    w.u8(device.num_interfaces);
    frame
}

/// Decode one interface record
pub fn decode_interface(bytes: &[u8]) -> Result<InterfaceRecord> {
    check_len(bytes, INTERFACE_RECORD_SIZE)?;
    let mut r = FieldReader::new(bytes);
    Ok(InterfaceRecord {
        interface_class: r.u8()?,
        interface_subclass: r.u8()?,
        interface_protocol: r.u8()?,
    })
}

/// Encode one interface record (peer side)
pub fn encode_interface(interface: &InterfaceRecord) -> [u8; INTERFACE_RECORD_SIZE] {
    let mut frame = [0u8; INTERFACE_RECORD_SIZE];
    let mut w = FieldWriter::new(&mut frame);
    w.u8(interface.interface_class);
    w.u8(interface.interface_subclass);
    w.u8(interface.interface_protocol);
    w.u8(0); // padding
    frame
}
