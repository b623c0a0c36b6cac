//! Per-host connection variables for generated inventories.

use serde::{Deserialize, Serialize};

use crate::config::{ServerGroup, DEFAULT_SSH_PORT};

/// Connection overrides attached to one inventory host.
///
/// Every field is optional; an absent field lets the runner fall back to the
/// ambient SSH agent and `~/.ssh/config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostVars {
    /// SSH port, only when it differs from 22
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_port: Option<u16>,

    /// SSH user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_user: Option<String>,

    /// SSH private key file path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_ssh_private_key_file: Option<String>,

    /// SSH password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_ssh_pass: Option<String>,
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl HostVars {
    /// Derive host variables from a server group's SSH settings.
    pub fn from_group(group: &ServerGroup) -> Self {
        Self {
            ansible_port: (group.ssh_port != DEFAULT_SSH_PORT).then_some(group.ssh_port),
            ansible_user: non_empty(&group.ssh_user),
            ansible_ssh_private_key_file: non_empty(&group.ssh_key_path),
            ansible_ssh_pass: non_empty(&group.ssh_pass),
        }
    }

    /// Returns true if no override is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
