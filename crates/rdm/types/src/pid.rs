//! Parameter identifiers and the catalog that names them

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sub-device number addressing the root of a responder
pub const ROOT_DEVICE: u16 = 0;

/// Sub-device number addressing every sub-device at once
pub const ALL_SUB_DEVICES: u16 = 0xffff;

/// A 16-bit RDM parameter identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParameterId(pub u16);

impl ParameterId {
    pub const QUEUED_MESSAGE: Self = Self(0x0020);
    pub const STATUS_MESSAGES: Self = Self(0x0030);
    pub const SUPPORTED_PARAMETERS: Self = Self(0x0050);
    pub const DEVICE_INFO: Self = Self(0x0060);
    pub const DEVICE_LABEL: Self = Self(0x0082);
    pub const FACTORY_DEFAULTS: Self = Self(0x0090);
    pub const SOFTWARE_VERSION_LABEL: Self = Self(0x00c0);
    pub const DMX_PERSONALITY: Self = Self(0x00e0);
    pub const DMX_START_ADDRESS: Self = Self(0x00f0);
    pub const IDENTIFY_DEVICE: Self = Self(0x1000);
    pub const RESET_DEVICE: Self = Self(0x1001);
}

impl std::fmt::Display for ParameterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Status-type field carried in a GET QUEUED_MESSAGE request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum StatusType {
    None = 0x00,
    GetLastMessage = 0x01,
    Advisory = 0x02,
    Warning = 0x03,
    Error = 0x04,
    AdvisoryCleared = 0x12,
    WarningCleared = 0x13,
    ErrorCleared = 0x14,
}

impl StatusType {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A named parameter known to the catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub id: ParameterId,
}

/// Name → identifier lookup for RDM parameters
///
/// The catalog is pre-loaded with the standard parameters the runner itself
/// needs. Manufacturer-specific parameters can be added with [`ParameterCatalog::insert`].
#[derive(Clone, Debug)]
pub struct ParameterCatalog {
    by_name: HashMap<String, ParameterId>,
    by_id: HashMap<ParameterId, String>,
}

impl ParameterCatalog {
    /// Catalog with no parameters at all
    pub fn empty() -> Self {
        Self {
            by_name: HashMap::new(),
            by_id: HashMap::new(),
        }
    }

    /// Catalog containing only the standard parameters
    pub fn standard() -> Self {
        let mut catalog = Self::empty();
        for (name, id) in [
            ("QUEUED_MESSAGE", ParameterId::QUEUED_MESSAGE),
            ("STATUS_MESSAGES", ParameterId::STATUS_MESSAGES),
            ("SUPPORTED_PARAMETERS", ParameterId::SUPPORTED_PARAMETERS),
            ("DEVICE_INFO", ParameterId::DEVICE_INFO),
            ("DEVICE_LABEL", ParameterId::DEVICE_LABEL),
            ("FACTORY_DEFAULTS", ParameterId::FACTORY_DEFAULTS),
            ("SOFTWARE_VERSION_LABEL", ParameterId::SOFTWARE_VERSION_LABEL),
            ("DMX_PERSONALITY", ParameterId::DMX_PERSONALITY),
            ("DMX_START_ADDRESS", ParameterId::DMX_START_ADDRESS),
            ("IDENTIFY_DEVICE", ParameterId::IDENTIFY_DEVICE),
            ("RESET_DEVICE", ParameterId::RESET_DEVICE),
        ] {
            catalog.insert(name, id);
        }
        catalog
    }

    /// Add or replace a parameter
    pub fn insert(&mut self, name: impl Into<String>, id: ParameterId) {
        let name = name.into();
        if let Some(previous) = self.by_id.insert(id, name.clone()) {
            if previous != name {
                self.by_name.remove(&previous);
            }
        }
        if let Some(old_id) = self.by_name.insert(name, id) {
            if old_id != id {
                self.by_id.remove(&old_id);
            }
        }
    }

    /// Look up a parameter by its upper-case name
    pub fn get_by_name(&self, name: &str) -> Option<ParameterDescriptor> {
        self.by_name.get(name).map(|id| ParameterDescriptor {
            name: name.to_string(),
            id: *id,
        })
    }

    /// Look up the name of a parameter identifier
    pub fn name_of(&self, id: ParameterId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl Default for ParameterCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
