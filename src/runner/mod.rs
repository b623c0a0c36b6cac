//! Contract for the external playbook runner.
//!
//! certsync does not execute playbooks itself. A [`PlaybookRunner`] receives
//! a playbook path, an inventory and a flat variable map, and reports back a
//! status string plus whatever it captured (return code, stdout, event
//! stream). Only the status decides success; the rest feeds diagnostics.

pub mod ansible;

pub use ansible::AnsibleRunner;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::inventory::Inventory;

/// Status reported by the runner for a successful run.
pub const STATUS_SUCCESSFUL: &str = "successful";

/// Status used when the runner left no status behind.
pub const STATUS_FAILED: &str = "failed";

/// Event type emitted by the runner when a task fails on a host.
pub const EVENT_RUNNER_ON_FAILED: &str = "runner_on_failed";

/// Inputs for a single runner invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    /// Playbook file to execute
    pub playbook: PathBuf,
    /// Hosts to run against
    pub inventory: Inventory,
    /// Extra variables
    pub extra_vars: IndexMap<String, serde_json::Value>,
    /// SSH private key override for the whole run
    pub ssh_key: Option<PathBuf>,
}

/// Outcome of a runner invocation.
///
/// Events are kept as raw JSON since their shape is owned by the runner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Final status, compared against [`STATUS_SUCCESSFUL`]
    pub status: String,
    /// Process return code, if known
    #[serde(default)]
    pub rc: Option<i32>,
    /// Captured standard output
    #[serde(default)]
    pub stdout: Option<String>,
    /// Runner event stream, in emission order
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

impl RunResult {
    /// A successful result with return code 0 and nothing captured.
    pub fn successful() -> Self {
        Self {
            status: STATUS_SUCCESSFUL.to_string(),
            rc: Some(0),
            ..Self::default()
        }
    }

    /// A failed result with the given return code.
    pub fn failed(rc: i32) -> Self {
        Self {
            status: STATUS_FAILED.to_string(),
            rc: Some(rc),
            ..Self::default()
        }
    }

    /// Returns true if the runner reported success.
    pub fn is_successful(&self) -> bool {
        self.status == STATUS_SUCCESSFUL
    }

    /// Best-effort diagnostics for logging a failure.
    pub fn diagnostics(&self) -> RunDiagnostics {
        RunDiagnostics::extract(self)
    }
}

/// Diagnostic details pulled out of a [`RunResult`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunDiagnostics {
    /// Non-empty captured stdout
    pub stdout: Option<String>,
    /// `event_data` of every failed-task event
    pub failed_tasks: Vec<serde_json::Value>,
}

impl RunDiagnostics {
    /// Extract diagnostics, ignoring anything that is not shaped as expected.
    ///
    /// Never fails: a malformed result simply yields fewer diagnostics.
    pub fn extract(result: &RunResult) -> Self {
        let stdout = result
            .stdout
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);

        let failed_tasks = result
            .events
            .iter()
            .filter_map(serde_json::Value::as_object)
            .filter(|event| {
                event.get("event").and_then(serde_json::Value::as_str)
                    == Some(EVENT_RUNNER_ON_FAILED)
            })
            .map(|event| {
                event
                    .get("event_data")
                    .cloned()
                    .unwrap_or_else(|| serde_json::Value::Object(Default::default()))
            })
            .collect();

        Self {
            stdout,
            failed_tasks,
        }
    }

    /// Returns true if nothing useful was found.
    pub fn is_empty(&self) -> bool {
        self.stdout.is_none() && self.failed_tasks.is_empty()
    }
}

/// An external engine that executes a playbook against an inventory.
///
/// The call is awaited to completion; no timeout is applied on top of
/// whatever the runner itself enforces.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaybookRunner: Send + Sync {
    /// Execute one playbook run.
    async fn run(&self, request: RunRequest) -> Result<RunResult>;
}
