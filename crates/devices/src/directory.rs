use std::collections::HashMap;

use opsdesk_core::{DeviceIdentity, DeviceKey};
use serde::Deserialize;

/// One row of a device mapping table, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceMapping {
    pub location: String,
    pub bay_id: String,
    pub device_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl DeviceMapping {
    fn into_entry(self) -> (DeviceKey, DeviceIdentity) {
        let display_name = self
            .display_name
            .unwrap_or_else(|| format!("{} {}", self.location, self.bay_id));
        (
            DeviceKey::new(self.location, self.bay_id),
            DeviceIdentity::new(self.device_id, display_name),
        )
    }
}

/// Static `(location, bay) -> device` reference data.
///
/// Bay PCs / launch monitors and door controllers are kept in separate
/// tables since a bay usually has both. Built once and read concurrently
/// without locking.
#[derive(Debug, Clone, Default)]
pub struct DeviceDirectory {
    bays: HashMap<DeviceKey, DeviceIdentity>,
    doors: HashMap<DeviceKey, DeviceIdentity>,
}

impl DeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from configuration rows.
    pub fn from_mappings(
        bays: impl IntoIterator<Item = DeviceMapping>,
        doors: impl IntoIterator<Item = DeviceMapping>,
    ) -> Self {
        Self {
            bays: bays.into_iter().map(DeviceMapping::into_entry).collect(),
            doors: doors.into_iter().map(DeviceMapping::into_entry).collect(),
        }
    }

    #[must_use]
    pub fn with_bay(
        mut self,
        location: impl Into<String>,
        bay_id: impl Into<String>,
        identity: DeviceIdentity,
    ) -> Self {
        self.bays.insert(DeviceKey::new(location, bay_id), identity);
        self
    }

    #[must_use]
    pub fn with_door(
        mut self,
        location: impl Into<String>,
        bay_id: impl Into<String>,
        identity: DeviceIdentity,
    ) -> Self {
        self.doors.insert(DeviceKey::new(location, bay_id), identity);
        self
    }

    pub fn bay_device(&self, location: &str, bay_id: &str) -> Option<&DeviceIdentity> {
        self.bays.get(&DeviceKey::new(location, bay_id))
    }

    pub fn door(&self, location: &str, bay_id: &str) -> Option<&DeviceIdentity> {
        self.doors.get(&DeviceKey::new(location, bay_id))
    }

    pub fn bay_count(&self) -> usize {
        self.bays.len()
    }

    pub fn door_count(&self) -> usize {
        self.doors.len()
    }
}
