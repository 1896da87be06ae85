//! USB identifier catalog
//!
//! Resolves vendor/product ids and class/subclass/protocol triples to
//! display names using the `usb.ids` database. The catalog is only consulted
//! when rendering; decoded records stay numeric.
//!
//! # File Format
//!
//! ```text
//! 046d  Logitech, Inc.
//! \tc52b  Unifying Receiver
//! C 03  Human Interface Device
//! \t01  Boot Interface Subclass
//! \t\t02  Mouse
//! ```
//!
//! Other top-level sections (languages, HID usages, ...) are skipped.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// In-memory copy of the parts of `usb.ids` the listing needs
#[derive(Debug, Default)]
pub struct Catalog {
    vendors: HashMap<u16, String>,
    products: HashMap<(u16, u16), String>,
    classes: HashMap<u8, String>,
    subclasses: HashMap<(u8, u8), String>,
    protocols: HashMap<(u8, u8, u8), String>,
}

enum Section {
    None,
    Vendor(u16),
    Class(u8, Option<u8>),
}

fn split_entry(body: &str) -> Option<(&str, &str)> {
    let (key, name) = body.split_once(char::is_whitespace)?;
    Some((key, name.trim()))
}

fn parse_u16(key: &str) -> Option<u16> {
    if key.len() != 4 {
        return None;
    }
    u16::from_str_radix(key, 16).ok()
}

fn parse_u8(key: &str) -> Option<u8> {
    if key.len() != 2 {
        return None;
    }
    u8::from_str_radix(key, 16).ok()
}

impl Catalog {
    /// Catalog with no names; every lookup falls back to "unknown ..."
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load and parse a `usb.ids` file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path)
            .with_context(|| format!("Failed to read USB ids file: {}", path.display()))?;
        let catalog = Self::parse(&String::from_utf8_lossy(&raw));
        debug!(
            "Loaded {} vendors, {} products, {} classes from {}",
            catalog.vendors.len(),
            catalog.products.len(),
            catalog.classes.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Load the catalog, or fall back to an empty one with a warning
    ///
    /// Names are cosmetic, so a missing database must not fail a listing.
    pub fn load_or_empty(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::empty();
        };
        match Self::load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("{:#}", e);
                Self::empty()
            }
        }
    }

    /// Parse `usb.ids` content
    pub fn parse(content: &str) -> Self {
        let mut catalog = Self::default();
        let mut section = Section::None;

        for line in content.lines() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let depth = line.bytes().take_while(|&b| b == b'\t').count();
            let body = &line[depth..];

            match depth {
                0 => {
                    section = Section::None;
                    if let Some(rest) = body.strip_prefix("C ") {
                        if let Some((key, name)) = split_entry(rest) {
                            if let Some(class) = parse_u8(key) {
                                catalog.classes.insert(class, name.to_string());
                                section = Section::Class(class, None);
                            }
                        }
                    } else if let Some((key, name)) = split_entry(body) {
                        if let Some(vendor) = parse_u16(key) {
                            catalog.vendors.insert(vendor, name.to_string());
                            section = Section::Vendor(vendor);
                        }
                    }
                }
                1 => {
                    let Some((key, name)) = split_entry(body) else {
                        continue;
                    };
                    match &mut section {
                        Section::Vendor(vendor) => {
                            if let Some(product) = parse_u16(key) {
                                catalog.products.insert((*vendor, product), name.to_string());
                            }
                        }
                        Section::Class(class, subclass) => {
                            *subclass = parse_u8(key);
                            if let Some(sub) = *subclass {
                                catalog.subclasses.insert((*class, sub), name.to_string());
                            }
                        }
                        Section::None => {}
                    }
                }
                2 => {
                    // Vendor sections nest interface names here; only classes matter
                    if let Section::Class(class, Some(subclass)) = section {
                        if let Some((key, name)) = split_entry(body) {
                            if let Some(protocol) = parse_u8(key) {
                                catalog
                                    .protocols
                                    .insert((class, subclass, protocol), name.to_string());
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        catalog
    }

    pub fn vendor(&self, vendor_id: u16) -> Option<&str> {
        self.vendors.get(&vendor_id).map(String::as_str)
    }

    pub fn product(&self, vendor_id: u16, product_id: u16) -> Option<&str> {
        self.products.get(&(vendor_id, product_id)).map(String::as_str)
    }

    pub fn class(&self, class: u8) -> Option<&str> {
        self.classes.get(&class).map(String::as_str)
    }

    pub fn subclass(&self, class: u8, subclass: u8) -> Option<&str> {
        self.subclasses.get(&(class, subclass)).map(String::as_str)
    }

    pub fn protocol(&self, class: u8, subclass: u8, protocol: u8) -> Option<&str> {
        self.protocols
            .get(&(class, subclass, protocol))
            .map(String::as_str)
    }

    /// `"<vendor> : <product> (vvvv:pppp)"`
    pub fn product_name(&self, vendor_id: u16, product_id: u16) -> String {
        format!(
            "{} : {} ({:04x}:{:04x})",
            self.vendor(vendor_id).unwrap_or("unknown vendor"),
            self.product(vendor_id, product_id)
                .unwrap_or("unknown product"),
            vendor_id,
            product_id
        )
    }

    /// `"<class> / <subclass> / <protocol> (cc/ss/pp)"`
    pub fn class_name(&self, class: u8, subclass: u8, protocol: u8) -> String {
        if class == 0 && subclass == 0 && protocol == 0 {
            return format!(
                "(Defined at Interface level) ({:02x}/{:02x}/{:02x})",
                class, subclass, protocol
            );
        }
        format!(
            "{} / {} / {} ({:02x}/{:02x}/{:02x})",
            self.class(class).unwrap_or("unknown class"),
            self.subclass(class, subclass).unwrap_or("unknown subclass"),
            self.protocol(class, subclass, protocol)
                .unwrap_or("unknown protocol"),
            class,
            subclass,
            protocol
        )
    }
}
