//! Shared test utilities and fixtures for the certsync test suite.
//!
//! This module provides:
//! - A recording [`PlaybookRunner`] with scripted results
//! - A temporary project directory with a config file and playbooks
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Notify;

use certsync::config::AppConfig;
use certsync::error::{Error, Result};
use certsync::runner::{PlaybookRunner, RunRequest, RunResult};

// ============================================================================
// Recording Runner
// ============================================================================

/// Runner that records every request and replays scripted results.
///
/// Once the script is exhausted every further run succeeds.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<RunRequest>>,
    script: Mutex<VecDeque<Result<RunResult>>>,
    notify: Notify,
}

impl RecordingRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_results(results: Vec<Result<RunResult>>) -> Arc<Self> {
        let runner = Self::default();
        *runner.script.lock().unwrap() = results.into_iter().collect();
        Arc::new(runner)
    }

    pub fn calls(&self) -> Vec<RunRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Host names of each call's inventory, one vector per call.
    pub fn hosts_per_call(&self) -> Vec<Vec<String>> {
        self.calls()
            .iter()
            .map(|req| req.inventory.host_names().map(str::to_string).collect())
            .collect()
    }

    /// Wait until at least `n` runs have been recorded.
    pub async fn wait_for_calls(&self, n: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.call_count() < n {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                panic!("expected {} runner calls, got {}", n, self.call_count());
            }
            let _ = tokio::time::timeout(remaining, self.notify.notified()).await;
        }
    }
}

#[async_trait]
impl PlaybookRunner for RecordingRunner {
    async fn run(&self, request: RunRequest) -> Result<RunResult> {
        self.calls.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        self.notify.notify_one();
        next.unwrap_or_else(|| Ok(RunResult::successful()))
    }
}

pub fn spawn_error() -> Error {
    Error::RunnerSpawn {
        command: "ansible-runner".to_string(),
        message: "No such file or directory".to_string(),
    }
}

// ============================================================================
// Project Fixture
// ============================================================================

pub const SAMPLE_CONFIG: &str = r#"
server:
  host: 127.0.0.1
  port: 8080
  log_level: INFO
webhook:
  path: ssl/update
server_groups:
  - name: web
    hosts: [10.0.0.1, 10.0.0.2]
    ssh_user: deploy
  - name: api
    hosts: [10.0.1.1]
    ssh_key_path: /etc/certsync/keys/api
    ssh_port: 2222
  - name: edge
    hosts: [edge1]
    ssh_pass: hunter2
playbook_mappings:
  - key: mykey
    server_groups: [web]
    playbook_file: sync.yml
    var_domain: example.com
    var_restart: true
  - key: multi
    server_groups: [web, api, edge]
    playbook_file: sync.yml
    var_count: 3
    note: not a variable
  - key: ghosts
    server_groups: [nowhere, nothing]
    playbook_file: sync.yml
  - key: no-playbook
    server_groups: [web, api]
    playbook_file: missing.yml
"#;

/// A temporary directory holding `config.yml` and `playbooks/sync.yml`.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self::with_config(SAMPLE_CONFIG)
    }

    pub fn with_config(config: &str) -> Self {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("playbooks")).unwrap();
        fs::write(
            dir.path().join("playbooks/sync.yml"),
            "- hosts: ssl_servers\n  tasks: []\n",
        )
        .unwrap();
        fs::write(dir.path().join("config.yml"), config).unwrap();
        Self { dir }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.yml")
    }

    pub fn playbook_path(&self) -> PathBuf {
        self.dir.path().join("playbooks/sync.yml")
    }

    pub fn load(&self) -> AppConfig {
        AppConfig::load(self.config_path()).expect("load config")
    }
}
