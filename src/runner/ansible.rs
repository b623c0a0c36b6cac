//! Runner backed by the `ansible-runner` command line tool.
//!
//! Each invocation gets a throwaway private data directory:
//!
//! ```text
//! <tmp>/
//! ├── inventory/hosts.json   generated inventory
//! ├── env/extravars          extra variables (JSON)
//! ├── env/ssh_key            key contents, when the group sets a key path
//! └── artifacts/<ident>/     written by ansible-runner
//!     ├── status
//!     ├── rc
//!     ├── stdout
//!     └── job_events/*.json
//! ```
//!
//! The playbook's directory is passed as the project directory so relative
//! includes inside the playbook keep working.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::{PlaybookRunner, RunRequest, RunResult, STATUS_FAILED};
use crate::config::RunnerConfig;
use crate::error::{Error, Result};

/// Invokes `ansible-runner run` once per request.
#[derive(Debug, Clone)]
pub struct AnsibleRunner {
    command: String,
    verbosity: u8,
}

impl AnsibleRunner {
    /// Create a runner using the given executable.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            verbosity: 0,
        }
    }

    /// Create a runner from the `runner` configuration section.
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::new(&config.command).with_verbosity(config.verbosity)
    }

    /// Set the number of `-v` flags passed to the runner.
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Write inventory, variables and key into the private data directory.
    async fn prepare(&self, private_dir: &Path, request: &RunRequest) -> Result<()> {
        let inventory_dir = private_dir.join("inventory");
        let env_dir = private_dir.join("env");
        for dir in [&inventory_dir, &env_dir] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| Error::runner_artifacts(dir, e.to_string()))?;
        }

        let hosts = inventory_dir.join("hosts.json");
        fs::write(&hosts, request.inventory.to_json()?)
            .await
            .map_err(|e| Error::runner_artifacts(&hosts, e.to_string()))?;

        let extravars = env_dir.join("extravars");
        fs::write(&extravars, serde_json::to_string(&request.extra_vars)?)
            .await
            .map_err(|e| Error::runner_artifacts(&extravars, e.to_string()))?;

        if let Some(key) = &request.ssh_key {
            match fs::read(key).await {
                Ok(contents) => {
                    let target = env_dir.join("ssh_key");
                    fs::write(&target, contents)
                        .await
                        .map_err(|e| Error::runner_artifacts(&target, e.to_string()))?;
                }
                Err(e) => {
                    warn!(key = %key.display(), error = %e, "Cannot read SSH key, relying on inventory key path");
                }
            }
        }

        Ok(())
    }

    fn build_command(&self, private_dir: &Path, ident: &str, playbook: &Path) -> Result<Command> {
        let file_name = playbook
            .file_name()
            .ok_or_else(|| Error::InvalidPlaybookName(playbook.display().to_string()))?;
        let project_dir = playbook
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut cmd = Command::new(&self.command);
        cmd.arg("run")
            .arg(private_dir)
            .arg("--ident")
            .arg(ident)
            .arg("--project-dir")
            .arg(project_dir)
            .arg("-p")
            .arg(file_name);
        for _ in 0..self.verbosity {
            cmd.arg("-v");
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        Ok(cmd)
    }

    /// Prepare the private data dir, invoke the runner and collect its artifacts.
    async fn execute(&self, private_dir: &Path, request: &RunRequest) -> Result<RunResult> {
        let ident = Uuid::new_v4().to_string();

        self.prepare(private_dir, request).await?;

        debug!(
            command = %self.command,
            playbook = %request.playbook.display(),
            hosts = request.inventory.host_count(),
            ident = %ident,
            "Invoking runner"
        );

        let output = self
            .build_command(private_dir, &ident, &request.playbook)?
            .output()
            .await
            .map_err(|e| Error::RunnerSpawn {
                command: self.command.clone(),
                message: e.to_string(),
            })?;

        trace!(
            exit_code = ?output.status.code(),
            stderr = %String::from_utf8_lossy(&output.stderr),
            "Runner exited"
        );

        let artifacts = private_dir.join("artifacts").join(&ident);
        let mut result = read_artifacts(&artifacts).await;
        if result.rc.is_none() {
            result.rc = output.status.code();
        }
        if result.stdout.is_none() && !output.stdout.is_empty() {
            result.stdout = Some(String::from_utf8_lossy(&output.stdout).to_string());
        }
        Ok(result)
    }
}

#[async_trait]
impl PlaybookRunner for AnsibleRunner {
    async fn run(&self, request: RunRequest) -> Result<RunResult> {
        let private_dir = tempfile::Builder::new().prefix("certsync-").tempdir()?;
        let result = self.execute(private_dir.path(), &request).await;

        // Removing the artifacts tree is blocking IO.
        let path = private_dir.path().to_path_buf();
        match tokio::task::spawn_blocking(move || private_dir.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(dir = %path.display(), error = %e, "Failed to remove runner directory"),
            Err(e) => warn!(dir = %path.display(), error = %e, "Runner directory cleanup task failed"),
        }

        result
    }
}

/// Read a run's artifacts directory.
///
/// Missing or unreadable pieces are left empty; a missing status file is
/// reported as [`STATUS_FAILED`].
pub(crate) async fn read_artifacts(dir: &Path) -> RunResult {
    let status = fs::read_to_string(dir.join("status"))
        .await
        .map(|s| s.trim().to_string())
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| STATUS_FAILED.to_string());

    let rc = fs::read_to_string(dir.join("rc"))
        .await
        .ok()
        .and_then(|s| s.trim().parse::<i32>().ok());

    let stdout = fs::read_to_string(dir.join("stdout")).await.ok();

    RunResult {
        status,
        rc,
        stdout,
        events: read_events(&dir.join("job_events")).await,
    }
}

async fn read_events(dir: &Path) -> Vec<serde_json::Value> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "No job events");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }

    let mut events = Vec::with_capacity(paths.len());
    for path in paths {
        let parsed = fs::read_to_string(&path)
            .await
            .ok()
            .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok());
        match parsed {
            Some(event) => events.push(event),
            None => debug!(path = %path.display(), "Skipping unreadable job event"),
        }
    }

    events.sort_by_key(|event| {
        event
            .get("counter")
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(i64::MAX)
    });
    events
}
