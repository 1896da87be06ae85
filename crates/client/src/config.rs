//! Client configuration management

use crate::session::{DEFAULT_MAX_DEVICES, DEFAULT_MAX_INTERFACES, SessionLimits};
use crate::transport::{TransportSettings, USBIP_PORT};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the USB id database
pub const DEFAULT_USB_IDS_PATH: &str = "/usr/share/hwdata/usb.ids";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub client: ClientSettings,
    #[serde(default)]
    pub discovery: DiscoverySettings,
    #[serde(default)]
    pub names: NamesSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub log_level: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Remote listing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    /// TCP port of the USB/IP peer
    pub port: u16,
    pub connect_timeout_ms: u64,
    /// Read/write deadline for the exchange
    pub io_timeout_ms: u64,
    /// Ceiling on the device count a peer may declare
    pub max_devices: u32,
    /// Ceiling on the interface count a device may declare
    pub max_interfaces: u8,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            port: USBIP_PORT,
            connect_timeout_ms: 5_000,
            io_timeout_ms: 10_000,
            max_devices: DEFAULT_MAX_DEVICES,
            max_interfaces: DEFAULT_MAX_INTERFACES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamesSettings {
    /// Path to usb.ids; `~` is expanded. An empty path disables name lookup.
    pub usb_ids_path: Option<String>,
}

impl Default for NamesSettings {
    fn default() -> Self {
        Self {
            usb_ids_path: Some(DEFAULT_USB_IDS_PATH.to_string()),
        }
    }
}

impl ClientConfig {
    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            max_devices: self.discovery.max_devices,
            max_interfaces: self.discovery.max_interfaces,
        }
    }

    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            connect_timeout: Duration::from_millis(self.discovery.connect_timeout_ms),
            io_timeout: Duration::from_millis(self.discovery.io_timeout_ms),
        }
    }

    /// usb.ids location with `~` expanded, or None when lookup is disabled
    pub fn usb_ids_path(&self) -> Option<PathBuf> {
        self.names
            .usb_ids_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
    }
}

impl ClientConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/usbip-list/client.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: ClientConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        tracing::debug!(
            "Config: port={}, max_devices={}, max_interfaces={}",
            config.discovery.port,
            config.discovery.max_devices,
            config.discovery.max_interfaces
        );
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                // Print to stderr since logging might not be initialized yet
                eprintln!("Config: {}", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("usbip-list").join("client.toml")
        } else {
            PathBuf::from(".config/usbip-list/client.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.client.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.client.log_level,
                valid_levels.join(", ")
            ));
        }

        let discovery = &self.discovery;
        if discovery.port == 0 {
            return Err(anyhow!("discovery.port must not be 0"));
        }
        if discovery.connect_timeout_ms == 0 || discovery.io_timeout_ms == 0 {
            // A zero Duration is rejected by the socket timeout setters
            return Err(anyhow!("discovery timeouts must be greater than 0"));
        }
        if discovery.max_devices == 0 {
            return Err(anyhow!("discovery.max_devices must be at least 1"));
        }
        if discovery.max_interfaces == 0 {
            return Err(anyhow!("discovery.max_interfaces must be at least 1"));
        }

        Ok(())
    }
}
