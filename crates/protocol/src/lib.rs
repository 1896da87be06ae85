//! USB/IP device-list wire codec
//!
//! This crate encodes the `OP_REQ_DEVLIST` request and decodes the fixed-size
//! frames of its reply (header, device records, interface records) between
//! network byte order and host-side records. It performs no I/O; driving the
//! exchange over a stream is the job of the client's discovery session.
//!
//! # Example
//!
//! ```
//! use protocol::{DeviceRecord, FixedText, decode_device, encode_device};
//!
//! let device = DeviceRecord {
//!     busid: FixedText::from_str_padded("1-1"),
//!     vendor_id: 0x1d6b,
//!     product_id: 0x0104,
//!     num_interfaces: 2,
//!     ..Default::default()
//! };
//!
//! let frame = encode_device(&device);
//! let decoded = decode_device(&frame).unwrap();
//! assert_eq!(decoded.busid.to_string_lossy(), "1-1");
//! assert_eq!(decoded.num_interfaces, 2);
//! ```

pub mod codec;
pub mod error;
pub mod types;
pub mod version;

pub use codec::{
    DEVICE_RECORD_SIZE, INTERFACE_RECORD_SIZE, OP_COMMON_SIZE, REPLY_HEADER_SIZE, REQUEST_SIZE,
    decode_device, decode_header, decode_interface, decode_op_common, encode_device,
    encode_header, encode_interface, encode_request,
};
pub use error::{DecodeError, Result};
pub use types::{
    BUSID_FIELD_LEN, DeviceRecord, DeviceSpeed, FixedText, InterfaceRecord, OpCommon,
    PATH_FIELD_LEN, ReplyHeader,
};
pub use version::{
    OP_REP_DEVLIST, OP_REQ_DEVLIST, OpStatus, USBIP_VERSION, op_status_string, validate_version,
};
