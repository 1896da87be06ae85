//! Common utilities for usbip-list
//!
//! This crate provides the functionality shared between the wire codec and
//! the client: error handling, logging setup, and test fixtures for building
//! device-list replies and scripted streams.

pub mod error;
pub mod logging;
pub mod test_utils;

pub use error::{Error, Result};
pub use logging::setup_logging;
