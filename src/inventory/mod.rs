//! Inventory generation for certsync.
//!
//! Converts a [`ServerGroup`] into the host inventory document consumed by
//! the external runner. The document has a single group:
//!
//! ```yaml
//! ssl_servers:
//!   hosts:
//!     10.0.0.1: {ansible_user: deploy}
//!     10.0.0.2: {ansible_user: deploy}
//! ```
//!
//! Connection variables are only emitted when they differ from the SSH
//! defaults so the runner can fall back to the ambient SSH configuration.

pub mod group;
pub mod host;

pub use group::HostGroup;
pub use host::HostVars;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::ServerGroup;
use crate::error::Result;

/// Name of the inventory group every generated host is placed in.
pub const INVENTORY_GROUP: &str = "ssl_servers";

/// Structured inventory document handed to the runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    groups: IndexMap<String, HostGroup>,
}

impl Inventory {
    /// Create an empty inventory
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a host to a group, creating the group if needed
    pub fn add_host(&mut self, group: &str, host: impl Into<String>, vars: HostVars) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .add_host(host, vars);
    }

    /// Get a group by name
    pub fn get_group(&self, name: &str) -> Option<&HostGroup> {
        self.groups.get(name)
    }

    /// Group names in insertion order
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// All host names across groups, in insertion order
    pub fn host_names(&self) -> impl Iterator<Item = &str> {
        self.groups.values().flat_map(HostGroup::host_names)
    }

    /// Total number of host entries
    pub fn host_count(&self) -> usize {
        self.groups.values().map(HostGroup::len).sum()
    }

    /// Serialize as JSON, which the runner's YAML inventory plugin also reads
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Build the inventory for one server group.
///
/// Pure and deterministic: hosts keep the order of `group.hosts`, and every
/// host carries the same connection variables.
pub fn build_inventory(group: &ServerGroup) -> Inventory {
    let vars = HostVars::from_group(group);
    let mut inventory = Inventory::new();
    inventory.groups.entry(INVENTORY_GROUP.to_string()).or_default();
    for host in &group.hosts {
        inventory.add_host(INVENTORY_GROUP, host.as_str(), vars.clone());
    }
    inventory
}
