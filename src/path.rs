//! Device and parameter instance path identifiers.

use crate::core_status::CoreStatus;
use crate::error::{CoreError, GatewayError};
use std::fmt;

/// `(slot, collection)`. The headstation is the distinguished value
/// `(0, 0)` (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId {
    pub slot: u32,
    pub collection: u32,
}

impl DeviceId {
    pub const HEADSTATION: Self = Self {
        slot: 0,
        collection: 0,
    };

    pub fn new(slot: u32, collection: u32) -> Self {
        Self { slot, collection }
    }

    pub fn parse(s: &str) -> Result<Self, GatewayError> {
        let mut parts = s.splitn(2, '-');
        let slot = parts.next().unwrap_or_default();
        let collection = parts.next().ok_or_else(unknown_path)?;
        let slot: u32 = slot.parse().map_err(|_| unknown_path())?;
        let collection: u32 = collection.parse().map_err(|_| unknown_path())?;
        Ok(Self { slot, collection })
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.slot, self.collection)
    }
}

/// A parameter or method's canonical instance path: a device plus a
/// device-relative path (`spec.md` §3/GLOSSARY). Serializes as
/// `"{slot}-{collection}-{path}"`, with any `/` in `path` rewritten to `-`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInstancePath {
    pub device: DeviceId,
    pub path: String,
}

impl ParameterInstancePath {
    pub fn new(device: DeviceId, path: impl Into<String>) -> Self {
        Self {
            device,
            path: path.into(),
        }
    }

    /// Parse a canonical id like `"0-0-a"` or `"1-1-myfeature-mymethod"`.
    pub fn parse(s: &str) -> Result<Self, GatewayError> {
        let mut parts = s.splitn(3, '-');
        let slot = parts.next().unwrap_or_default();
        let collection = parts.next().ok_or_else(unknown_path)?;
        let path = parts.next().ok_or_else(unknown_path)?;
        let slot: u32 = slot.parse().map_err(|_| unknown_path())?;
        let collection: u32 = collection.parse().map_err(|_| unknown_path())?;
        if path.is_empty() {
            return Err(unknown_path());
        }
        Ok(Self {
            device: DeviceId::new(slot, collection),
            path: path.to_string(),
        })
    }

    pub fn to_id_string(&self) -> String {
        format!("{}-{}", self.device, self.path.replace('/', "-"))
    }
}

impl fmt::Display for ParameterInstancePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_id_string())
    }
}

fn unknown_path() -> GatewayError {
    GatewayError::Core(CoreError::new(CoreStatus::UnknownParameter, 0))
}
