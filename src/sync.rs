//! Certificate sync orchestration.
//!
//! A sync takes one resolved rule and runs its playbook against each of the
//! rule's server groups, one after the other:
//!
//! 1. Resolve `playbooks_dir / rule.playbook_file`; a bad name or missing
//!    file fails the sync before any group runs.
//! 2. For each group in rule order: build its inventory, extract the rule's
//!    `var_*` variables, invoke the runner and check its status.
//! 3. The first failing group stops the sync; later groups are not touched
//!    and earlier ones are not rolled back.
//!
//! Groups are never processed in parallel within one sync.

use indexmap::IndexMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{AppConfig, PlaybookMapping, ServerGroup};
use crate::error::{Error, Result};
use crate::inventory::build_inventory;
use crate::runner::{AnsibleRunner, PlaybookRunner, RunRequest};

/// Runs playbooks for resolved rules.
pub struct CertificateSyncer {
    playbooks_dir: PathBuf,
    runner: Arc<dyn PlaybookRunner>,
}

impl std::fmt::Debug for CertificateSyncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateSyncer")
            .field("playbooks_dir", &self.playbooks_dir)
            .finish_non_exhaustive()
    }
}

impl CertificateSyncer {
    /// Create a syncer with an explicit runner.
    pub fn new(playbooks_dir: impl Into<PathBuf>, runner: Arc<dyn PlaybookRunner>) -> Self {
        Self {
            playbooks_dir: playbooks_dir.into(),
            runner,
        }
    }

    /// Create a syncer driving `ansible-runner` as configured.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.playbooks_dir(),
            Arc::new(AnsibleRunner::from_config(&config.runner)),
        )
    }

    /// Directory playbook names are resolved against.
    pub fn playbooks_dir(&self) -> &Path {
        &self.playbooks_dir
    }

    /// Resolve a playbook name to an existing file in the playbooks directory.
    ///
    /// The name must be a single plain path component.
    pub fn resolve_playbook(&self, file_name: &str) -> Result<PathBuf> {
        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(Error::InvalidPlaybookName(file_name.to_string())),
        }

        let path = self.playbooks_dir.join(file_name);
        if !path.is_file() {
            return Err(Error::PlaybookNotFound(path));
        }
        Ok(path)
    }

    /// Sync a certificate to every group of a rule, stopping at the first failure.
    ///
    /// Returns true only if every group succeeded.
    pub async fn sync_certificate(
        &self,
        key: &str,
        rule: &PlaybookMapping,
        groups: &IndexMap<String, Arc<ServerGroup>>,
    ) -> bool {
        info!(key = %key, groups = groups.len(), "Starting certificate sync");

        let playbook = match self.resolve_playbook(&rule.playbook_file) {
            Ok(path) => path,
            Err(e) => {
                error!(key = %key, error = %e, "Certificate sync aborted");
                return false;
            }
        };

        if groups.is_empty() {
            warn!(key = %key, "No server groups to sync");
        }

        for (index, (name, group)) in groups.iter().enumerate() {
            if !self.sync_group(rule, name, group, &playbook).await {
                let skipped: Vec<&str> = groups.keys().skip(index + 1).map(String::as_str).collect();
                if !skipped.is_empty() {
                    warn!(key = %key, skipped = ?skipped, "Skipping remaining server groups");
                }
                return false;
            }
        }

        info!(key = %key, "Certificate sync completed");
        true
    }

    async fn sync_group(
        &self,
        rule: &PlaybookMapping,
        name: &str,
        group: &ServerGroup,
        playbook: &Path,
    ) -> bool {
        let request = RunRequest {
            playbook: playbook.to_path_buf(),
            inventory: build_inventory(group),
            extra_vars: rule.ansible_vars(),
            ssh_key: group.ssh_key().map(Path::to_path_buf),
        };

        let result = match self.runner.run(request).await {
            Ok(result) => result,
            Err(e) => {
                error!(group = %name, error = %e, "Server group sync raised an error");
                return false;
            }
        };

        if result.is_successful() {
            info!(group = %name, "Server group synced");
            return true;
        }

        let rc = result
            .rc
            .map_or_else(|| "unknown".to_string(), |rc| rc.to_string());
        error!(group = %name, status = %result.status, rc = %rc, "Server group sync failed");

        let diagnostics = result.diagnostics();
        if let Some(stdout) = &diagnostics.stdout {
            error!(group = %name, "Runner output: {}", stdout);
        }
        for event_data in &diagnostics.failed_tasks {
            error!(group = %name, "Task failed: {}", event_data);
        }
        false
    }

    /// Run a sync on a background task and log its verdict.
    ///
    /// The returned handle may be dropped; the sync keeps running. A panic
    /// inside the sync is reported as a failed sync.
    pub fn spawn_sync(
        self: &Arc<Self>,
        key: String,
        rule: Arc<PlaybookMapping>,
        groups: IndexMap<String, Arc<ServerGroup>>,
    ) -> JoinHandle<bool> {
        let syncer = Arc::clone(self);
        let task_key = key.clone();
        let sync = tokio::spawn(async move { syncer.sync_certificate(&task_key, &rule, &groups).await });

        tokio::spawn(async move {
            let ok = match sync.await {
                Ok(ok) => ok,
                Err(e) => {
                    error!(key = %key, error = %e, "Certificate sync task aborted");
                    false
                }
            };
            if ok {
                info!(key = %key, "SSL certificate sync succeeded");
            } else {
                error!(key = %key, "SSL certificate sync failed");
            }
            ok
        })
    }
}
