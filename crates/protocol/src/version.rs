//! USB/IP protocol version and operation codes

use crate::error::{DecodeError, Result};

/// USB/IP protocol version spoken by this client
pub const USBIP_VERSION: u16 = 0x0111; // Version 1.1.1

/// Request the list of exportable devices
pub const OP_REQ_DEVLIST: u16 = 0x8005;

/// Reply carrying the list of exportable devices
pub const OP_REP_DEVLIST: u16 = 0x0005;

/// Operation status codes (`ST_*` in usbip_network.h)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpStatus {
    Ok,
    NotAvailable,
    DeviceBusy,
    DeviceError,
    NoDevice,
    Error,
    Unknown(i32),
}

impl From<i32> for OpStatus {
    fn from(value: i32) -> Self {
        match value {
            0 => Self::Ok,
            1 => Self::NotAvailable,
            2 => Self::DeviceBusy,
            3 => Self::DeviceError,
            4 => Self::NoDevice,
            5 => Self::Error,
            other => Self::Unknown(other),
        }
    }
}

impl OpStatus {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Ok => "Request Completed Successfully",
            Self::NotAvailable => "Request Failed - Device Not Available",
            Self::DeviceBusy => "Request Failed - Device Busy (Exported)",
            Self::DeviceError => "Request Failed - Device in Error State",
            Self::NoDevice => "Request Failed - Device Not Found",
            Self::Error => "Request Failed - Unexpected Server Error",
            Self::Unknown(_) => "Request Failed - Unknown Status",
        }
    }
}

/// Human-readable description of an operation status
pub fn op_status_string(status: i32) -> &'static str {
    OpStatus::from(status).description()
}

/// Validate the version field of a received frame
///
/// USB/IP has no compatibility range: peers must agree on the exact version.
pub fn validate_version(version: u16) -> Result<()> {
    if version != USBIP_VERSION {
        return Err(DecodeError::VersionMismatch {
            expected: USBIP_VERSION,
            actual: version,
        });
    }
    Ok(())
}
