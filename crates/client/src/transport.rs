//! TCP transport to a USB/IP peer

use anyhow::{Context, Result, anyhow};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info};

/// Well-known USB/IP port
pub const USBIP_PORT: u16 = 3240;

/// Connection and I/O deadlines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSettings {
    /// Deadline for establishing the TCP connection, per resolved address
    pub connect_timeout: Duration,
    /// Read and write deadline on the established stream
    pub io_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(10),
        }
    }
}

/// Resolve `host` and connect to the first address that answers
///
/// Accepts host names, IPv4 addresses and IPv6 addresses with or without
/// brackets. The returned stream has read/write timeouts applied, so a
/// stalled peer surfaces as an I/O error instead of blocking forever.
pub fn connect(host: &str, port: u16, settings: &TransportSettings) -> Result<TcpStream> {
    let bare_host = host.trim_start_matches('[').trim_end_matches(']');
    let addrs: Vec<SocketAddr> = (bare_host, port)
        .to_socket_addrs()
        .with_context(|| format!("could not resolve {}:{}", host, port))?
        .collect();

    if addrs.is_empty() {
        return Err(anyhow!("{}:{} resolved to no addresses", host, port));
    }

    let mut last_error = None;
    for addr in &addrs {
        debug!("Trying {}", addr);
        match TcpStream::connect_timeout(addr, settings.connect_timeout) {
            Ok(stream) => {
                stream
                    .set_read_timeout(Some(settings.io_timeout))
                    .context("Failed to set read timeout")?;
                stream
                    .set_write_timeout(Some(settings.io_timeout))
                    .context("Failed to set write timeout")?;
                stream.set_nodelay(true).context("Failed to set TCP_NODELAY")?;
                info!("connected to {}:{} ({})", host, port, addr);
                return Ok(stream);
            }
            Err(e) => {
                debug!("Connection to {} failed: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    let err = last_error.map(anyhow::Error::from).unwrap_or_else(|| anyhow!("no address tried"));
    Err(err.context(format!("could not connect to {}:{}", host, port)))
}
