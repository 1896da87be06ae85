//! USB/IP record types
//!
//! Host-side representations of the fixed-size frames exchanged during a
//! device-list request. All values are already in host byte order; the wire
//! conversion lives in [`crate::codec`].

use std::borrow::Cow;
use std::fmt;

/// Width of the sysfs path field in a device record
pub const PATH_FIELD_LEN: usize = 256;

/// Width of the bus id field in a device record
pub const BUSID_FIELD_LEN: usize = 32;

/// Fixed-width text field copied verbatim from the wire
///
/// The peer is not required to NUL-terminate these fields, so the content is
/// kept as raw bytes and only bounded to the field width. Conversion to a
/// string happens at display time.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedText<const N: usize>([u8; N]);

impl<const N: usize> FixedText<N> {
    /// Wrap raw field bytes
    pub const fn new(raw: [u8; N]) -> Self {
        Self(raw)
    }

    /// Build a field from a string, truncated to `N` bytes and zero padded
    pub fn from_str_padded(s: &str) -> Self {
        let mut raw = [0u8; N];
        let len = s.len().min(N);
        raw[..len].copy_from_slice(&s.as_bytes()[..len]);
        Self(raw)
    }

    /// Bytes up to the first NUL, or the whole field if there is none
    pub fn as_bytes(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(N);
        &self.0[..end]
    }

    /// The full field including any padding
    pub fn raw(&self) -> &[u8; N] {
        &self.0
    }

    /// Lossy UTF-8 view for display
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }
}

impl<const N: usize> Default for FixedText<N> {
    fn default() -> Self {
        Self([0u8; N])
    }
}

impl<const N: usize> fmt::Debug for FixedText<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

impl<const N: usize> fmt::Display for FixedText<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.to_string_lossy())
    }
}

/// USB device speed as reported by the kernel (`enum usb_device_speed`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSpeed {
    /// Low speed - 1.5 Mbps (USB 1.0)
    Low,
    /// Full speed - 12 Mbps (USB 1.1)
    Full,
    /// High speed - 480 Mbps (USB 2.0)
    High,
    /// Wireless USB
    Wireless,
    /// SuperSpeed - 5 Gbps (USB 3.0)
    Super,
    /// SuperSpeed+ - 10 Gbps (USB 3.1)
    SuperPlus,
    /// Anything the kernel reports that we don't recognise, including 0
    Unknown(u32),
}

impl From<u32> for DeviceSpeed {
    fn from(value: u32) -> Self {
        match value {
            1 => Self::Low,
            2 => Self::Full,
            3 => Self::High,
            4 => Self::Wireless,
            5 => Self::Super,
            6 => Self::SuperPlus,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for DeviceSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("1.5 Mbps"),
            Self::Full => f.write_str("12 Mbps"),
            Self::High => f.write_str("480 Mbps"),
            Self::Wireless => f.write_str("wireless"),
            Self::Super => f.write_str("5 Gbps"),
            Self::SuperPlus => f.write_str("10 Gbps"),
            Self::Unknown(raw) => write!(f, "unknown speed ({})", raw),
        }
    }
}

/// First 8 bytes of every USB/IP management frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpCommon {
    /// Protocol version (0x0111)
    pub version: u16,
    /// Operation code
    pub code: u16,
    /// Status (0 = success)
    pub status: i32,
}

/// Header of an `OP_REP_DEVLIST` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyHeader {
    pub version: u16,
    pub code: u16,
    /// Status (0 = success, anything else = failure)
    pub status: i32,
    /// Number of device records that follow. Peer-controlled.
    pub device_count: u32,
}

impl ReplyHeader {
    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// One interface of an exported device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterfaceRecord {
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub interface_protocol: u8,
}

/// One exported USB device
///
/// `interfaces` is filled by the discovery session from the interface frames
/// that follow the device frame; it is not part of the device frame itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceRecord {
    /// sysfs path of the device on the peer
    pub path: FixedText<PATH_FIELD_LEN>,
    /// Bus id, e.g. "1-1"
    pub busid: FixedText<BUSID_FIELD_LEN>,
    pub busnum: u32,
    pub devnum: u32,
    /// Raw speed value, see [`DeviceRecord::speed`]
    pub speed: u32,
    pub vendor_id: u16,
    pub product_id: u16,
    pub bcd_device: u16,
    pub device_class: u8,
    pub device_subclass: u8,
    pub device_protocol: u8,
    pub configuration_value: u8,
    pub num_configurations: u8,
    /// Declared number of interface frames following this device. Peer-controlled.
    pub num_interfaces: u8,
    pub interfaces: Vec<InterfaceRecord>,
}

impl DeviceRecord {
    pub fn speed(&self) -> DeviceSpeed {
        DeviceSpeed::from(self.speed)
    }
}
