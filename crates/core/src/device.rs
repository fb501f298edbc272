use std::fmt;

use serde::{Deserialize, Serialize};

/// Lookup key for a device: a bay (or door name) at a location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceKey {
    pub location: String,
    pub bay_id: String,
}

impl DeviceKey {
    pub fn new(location: impl Into<String>, bay_id: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            bay_id: bay_id.into(),
        }
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.location, self.bay_id)
    }
}

/// Vendor-side identity of a physical device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Identifier understood by the vendor API.
    pub device_id: String,
    /// Name shown to staff.
    pub display_name: String,
}

impl DeviceIdentity {
    pub fn new(device_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            display_name: display_name.into(),
        }
    }
}
