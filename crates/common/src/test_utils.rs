//! Test utilities for usbip-list
//!
//! Provides mock records, a reply builder, and a scripted in-memory stream
//! for exercising the discovery session without a network.
//!
//! # Example
//!
//! ```
//! use common::test_utils::{MockStream, ReplyBuilder, create_mock_device_record};
//!
//! let reply = ReplyBuilder::new(1)
//!     .device(&create_mock_device_record(1, 0x1234, 0x5678))
//!     .build();
//! let stream = MockStream::new(reply);
//! assert_eq!(stream.bytes_consumed(), 0);
//! ```

use protocol::{
    DeviceRecord, FixedText, InterfaceRecord, OP_COMMON_SIZE, OP_REP_DEVLIST, ReplyHeader,
    USBIP_VERSION, encode_device, encode_header, encode_interface,
};
use std::io::{self, Cursor, Read, Write};

/// Create a mock DeviceRecord with no interfaces
///
/// # Arguments
/// * `index` - Port number, used for the busid ("1-<index>") and devnum
/// * `vendor_id` - USB Vendor ID
/// * `product_id` - USB Product ID
///
/// # Example
/// ```
/// use common::test_utils::create_mock_device_record;
///
/// let device = create_mock_device_record(2, 0x1234, 0x5678);
/// assert_eq!(device.busid.to_string_lossy(), "1-2");
/// assert_eq!(device.num_interfaces, 0);
/// ```
pub fn create_mock_device_record(index: u32, vendor_id: u16, product_id: u16) -> DeviceRecord {
    DeviceRecord {
        path: FixedText::from_str_padded(&format!(
            "/sys/devices/pci0000:00/0000:00:14.0/usb1/1-{}",
            index
        )),
        busid: FixedText::from_str_padded(&format!("1-{}", index)),
        busnum: 1,
        devnum: index + 1,
        speed: 3,
        vendor_id,
        product_id,
        bcd_device: 0x0100,
        device_class: 0x00,
        device_subclass: 0x00,
        device_protocol: 0x00,
        configuration_value: 1,
        num_configurations: 1,
        num_interfaces: 0,
        interfaces: Vec::new(),
    }
}

/// Create a mock DeviceRecord carrying the given interfaces
///
/// `num_interfaces` is set to match, so the record is consistent.
pub fn create_mock_device_with_interfaces(
    index: u32,
    vendor_id: u16,
    product_id: u16,
    interfaces: &[(u8, u8, u8)],
) -> DeviceRecord {
    let mut device = create_mock_device_record(index, vendor_id, product_id);
    device.interfaces = interfaces
        .iter()
        .map(|&(class, subclass, protocol)| InterfaceRecord {
            interface_class: class,
            interface_subclass: subclass,
            interface_protocol: protocol,
        })
        .collect();
    device.num_interfaces = device.interfaces.len() as u8;
    device
}

/// Create a mock mass storage device (one bulk-only interface)
pub fn create_mock_mass_storage_device(index: u32) -> DeviceRecord {
    create_mock_device_with_interfaces(index, 0x0781, 0x5581, &[(0x08, 0x06, 0x50)])
}

/// Create a mock HID receiver (keyboard + mouse interfaces)
pub fn create_mock_hid_device(index: u32) -> DeviceRecord {
    create_mock_device_with_interfaces(
        index,
        0x046d,
        0xc52b,
        &[(0x03, 0x01, 0x01), (0x03, 0x01, 0x02), (0x03, 0x00, 0x00)],
    )
}

/// Assembles the byte stream a peer would send in reply to `OP_REQ_DEVLIST`
#[derive(Debug, Clone)]
pub struct ReplyBuilder {
    bytes: Vec<u8>,
}

impl ReplyBuilder {
    /// Successful reply header declaring `device_count` devices
    pub fn new(device_count: u32) -> Self {
        Self::with_header(ReplyHeader {
            version: USBIP_VERSION,
            code: OP_REP_DEVLIST,
            status: 0,
            device_count,
        })
    }

    /// Arbitrary reply header
    pub fn with_header(header: ReplyHeader) -> Self {
        Self {
            bytes: encode_header(&header).to_vec(),
        }
    }

    /// Failed reply: only the op_common prefix, no device count
    pub fn rejected(status: i32) -> Self {
        let header = encode_header(&ReplyHeader {
            version: USBIP_VERSION,
            code: OP_REP_DEVLIST,
            status,
            device_count: 0,
        });
        Self {
            bytes: header[..OP_COMMON_SIZE].to_vec(),
        }
    }

    /// Append a device frame followed by one frame per entry in its
    /// interface list
    pub fn device(mut self, device: &DeviceRecord) -> Self {
        self.bytes.extend_from_slice(&encode_device(device));
        for interface in &device.interfaces {
            self.bytes.extend_from_slice(&encode_interface(interface));
        }
        self
    }

    /// Append raw bytes
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// Scripted in-memory duplex stream
///
/// Reads are served from a fixed input buffer; writes are captured. Once the
/// input is exhausted, reads return EOF, or the configured error.
#[derive(Debug)]
pub struct MockStream {
    input: Cursor<Vec<u8>>,
    written: Vec<u8>,
    fail_writes: bool,
    error_at_end: Option<io::ErrorKind>,
}

impl MockStream {
    pub fn new(input: Vec<u8>) -> Self {
        Self {
            input: Cursor::new(input),
            written: Vec::new(),
            fail_writes: false,
            error_at_end: None,
        }
    }

    /// Every write fails with `BrokenPipe`
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Reads past the end of the input fail with `kind` instead of EOF
    pub fn error_at_end(mut self, kind: io::ErrorKind) -> Self {
        self.error_at_end = Some(kind);
        self
    }

    /// Everything written to the stream so far
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Number of input bytes handed out to readers
    pub fn bytes_consumed(&self) -> usize {
        self.input.position() as usize
    }

    /// Number of input bytes nobody has read yet
    pub fn bytes_remaining(&self) -> usize {
        self.input.get_ref().len() - self.bytes_consumed()
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.input.read(buf)?;
        if n == 0 && !buf.is_empty() {
            if let Some(kind) = self.error_at_end {
                return Err(io::Error::new(kind, "mock stream closed"));
            }
        }
        Ok(n)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"));
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{DEVICE_RECORD_SIZE, INTERFACE_RECORD_SIZE, REPLY_HEADER_SIZE};

    #[test]
    fn test_mock_device_record() {
        let device = create_mock_device_record(3, 0x1234, 0x5678);
        assert_eq!(device.busid.to_string_lossy(), "1-3");
        assert_eq!(device.devnum, 4);
        assert_eq!(device.vendor_id, 0x1234);
        assert!(device.interfaces.is_empty());
    }

    #[test]
    fn test_interfaces_match_declared_count() {
        let device = create_mock_hid_device(1);
        assert_eq!(device.num_interfaces, 3);
        assert_eq!(device.interfaces.len(), 3);
    }

    #[test]
    fn test_reply_builder_lengths() {
        let reply = ReplyBuilder::new(2)
            .device(&create_mock_mass_storage_device(1))
            .device(&create_mock_device_record(2, 1, 2));
        assert_eq!(
            reply.len(),
            REPLY_HEADER_SIZE + 2 * DEVICE_RECORD_SIZE + INTERFACE_RECORD_SIZE
        );
    }

    #[test]
    fn test_rejected_reply_has_no_count() {
        let reply = ReplyBuilder::rejected(1).build();
        assert_eq!(reply.len(), OP_COMMON_SIZE);
        assert_eq!(&reply[4..8], &[0, 0, 0, 1]);
    }

    #[test]
    fn test_mock_stream_eof() {
        let mut stream = MockStream::new(vec![1, 2]);
        let mut buf = [0u8; 4];
        let err = stream.read_exact(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_mock_stream_error_at_end() {
        let mut stream = MockStream::new(vec![1]).error_at_end(io::ErrorKind::ConnectionReset);
        let mut buf = [0u8; 1];
        stream.read_exact(&mut buf).unwrap();
        let err = stream.read_exact(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }

    #[test]
    fn test_mock_stream_records_writes() {
        let mut stream = MockStream::new(Vec::new());
        stream.write_all(&[1, 2, 3]).unwrap();
        assert_eq!(stream.written(), &[1, 2, 3]);

        let mut failing = MockStream::new(Vec::new()).failing_writes();
        assert!(failing.write_all(&[1]).is_err());
    }
}
