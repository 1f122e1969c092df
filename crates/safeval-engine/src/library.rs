//! Seams to the external component library and project store
//!
//! The engine never owns persistence; it resolves references through these
//! traits. [`ProjectStore`] is a simple in-memory implementation used by the
//! command-line front end and tests.

use crate::model::{DeviceSpec, SafetyFunctionSpec};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Source of device reliability data
pub trait ComponentLibrary {
    fn device(&self, id: &str) -> Option<&DeviceSpec>;
}

/// Source of safety function descriptions
pub trait FunctionRepository {
    fn function(&self, id: &str) -> Option<&SafetyFunctionSpec>;

    /// Ids of every stored function, in storage order
    fn function_ids(&self) -> Vec<String>;
}

/// In-memory project: devices and safety functions keyed by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectStore {
    #[serde(default)]
    pub devices: IndexMap<String, DeviceSpec>,
    #[serde(default)]
    pub functions: IndexMap<String, SafetyFunctionSpec>,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a device
    pub fn add_device(&mut self, device: DeviceSpec) {
        self.devices.insert(device.id.clone(), device);
    }

    /// Add or replace a safety function
    pub fn add_function(&mut self, function: SafetyFunctionSpec) {
        self.functions.insert(function.id.clone(), function);
    }

    pub fn with_device(mut self, device: DeviceSpec) -> Self {
        self.add_device(device);
        self
    }

    pub fn with_function(mut self, function: SafetyFunctionSpec) -> Self {
        self.add_function(function);
        self
    }
}

impl ComponentLibrary for ProjectStore {
    fn device(&self, id: &str) -> Option<&DeviceSpec> {
        self.devices.get(id)
    }
}

impl FunctionRepository for ProjectStore {
    fn function(&self, id: &str) -> Option<&SafetyFunctionSpec> {
        self.functions.get(id)
    }

    fn function_ids(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_lookup() {
        let store = ProjectStore::new()
            .with_device(DeviceSpec::new("k1").with_pfhd(1e-8))
            .with_function(SafetyFunctionSpec::new("sf-1", "Stop"));

        assert!(store.device("k1").is_some());
        assert!(store.device("k2").is_none());
        assert_eq!(store.function_ids(), vec!["sf-1".to_string()]);
    }

    #[test]
    fn test_replace_device() {
        let mut store = ProjectStore::new();
        store.add_device(DeviceSpec::new("k1").with_pfhd(1e-8));
        store.add_device(DeviceSpec::new("k1").with_pfhd(2e-8));
        assert_eq!(store.devices.len(), 1);
        assert_eq!(store.device("k1").map(|d| d.pfhd), Some(2e-8));
    }
}
