//! Host group for generated inventories.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::host::HostVars;

/// A group of hosts in the inventory, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostGroup {
    /// Hosts and their connection variables
    #[serde(default)]
    pub hosts: IndexMap<String, HostVars>,
}

impl HostGroup {
    /// Add a host, replacing the variables of an existing entry
    pub fn add_host(&mut self, host: impl Into<String>, vars: HostVars) {
        self.hosts.insert(host.into(), vars);
    }

    /// Get a host's variables
    pub fn get_host(&self, host: &str) -> Option<&HostVars> {
        self.hosts.get(host)
    }

    /// Host names in insertion order
    pub fn host_names(&self) -> impl Iterator<Item = &str> {
        self.hosts.keys().map(String::as_str)
    }

    /// Number of hosts
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Returns true if the group has no hosts
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
