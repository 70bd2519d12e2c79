//! Responder addressing

use crate::UidParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A responder's unique identifier: 16-bit manufacturer id plus 32-bit device id.
///
/// Rendered and parsed as `mmmm:dddddddd` (hex).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid {
    pub manufacturer_id: u16,
    pub device_id: u32,
}

impl Uid {
    pub const fn new(manufacturer_id: u16, device_id: u32) -> Self {
        Self {
            manufacturer_id,
            device_id,
        }
    }

    /// The all-devices broadcast address
    pub const fn broadcast() -> Self {
        Self::new(0xffff, 0xffff_ffff)
    }

    /// Broadcast to every device of one manufacturer
    pub const fn vendorcast(manufacturer_id: u16) -> Self {
        Self::new(manufacturer_id, 0xffff_ffff)
    }

    pub fn is_broadcast(&self) -> bool {
        self.device_id == 0xffff_ffff
    }
}

impl Default for Uid {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:08x}", self.manufacturer_id, self.device_id)
    }
}

impl FromStr for Uid {
    type Err = UidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (manufacturer, device) = s
            .split_once(':')
            .ok_or_else(|| UidParseError::Malformed(s.to_string()))?;
        if manufacturer.is_empty() || manufacturer.len() > 4 || device.is_empty() || device.len() > 8
        {
            return Err(UidParseError::Malformed(s.to_string()));
        }
        let manufacturer_id = u16::from_str_radix(manufacturer, 16)
            .map_err(|_| UidParseError::InvalidHex(s.to_string()))?;
        let device_id =
            u32::from_str_radix(device, 16).map_err(|_| UidParseError::InvalidHex(s.to_string()))?;
        Ok(Self::new(manufacturer_id, device_id))
    }
}

impl TryFrom<String> for Uid {
    type Error = UidParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> Self {
        uid.to_string()
    }
}
