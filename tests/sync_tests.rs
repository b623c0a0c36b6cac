//! Integration tests for the sync orchestrator
//!
//! These tests drive [`CertificateSyncer`] with a recording runner against a
//! project loaded from disk, covering:
//! - One runner call per group, in declared order
//! - Fail-fast on the first failing group
//! - Playbook validation before any group runs
//! - Variables, inventory and key override passed to the runner

mod common;

use std::path::Path;
use std::sync::Arc;

use certsync::runner::RunResult;
use certsync::sync::CertificateSyncer;
use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;

fn syncer(project: &Project, runner: Arc<RecordingRunner>) -> CertificateSyncer {
    CertificateSyncer::new(project.load().playbooks_dir(), runner)
}

#[tokio::test]
async fn test_all_groups_succeed_in_declared_order() {
    let project = Project::new();
    let config = project.load();
    let runner = RecordingRunner::new();
    let syncer = syncer(&project, runner.clone());

    let rule = config.find_rule("multi").unwrap();
    let groups = config.resolve_server_groups(rule);
    assert!(syncer.sync_certificate("multi", rule, &groups).await);

    assert_eq!(runner.call_count(), 3);
    assert_eq!(
        runner.hosts_per_call(),
        vec![
            vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()],
            vec!["10.0.1.1".to_string()],
            vec!["edge1".to_string()],
        ]
    );
    for call in runner.calls() {
        assert_eq!(call.playbook, project.playbook_path());
    }
}

#[tokio::test]
async fn test_failing_group_stops_the_rest() {
    let project = Project::new();
    let config = project.load();
    let runner = RecordingRunner::with_results(vec![
        Ok(RunResult::successful()),
        Ok(RunResult {
            status: "failed".to_string(),
            rc: Some(2),
            stdout: Some("fatal: [10.0.1.1]: UNREACHABLE!".to_string()),
            events: vec![json!({"event": "runner_on_failed", "event_data": {"host": "10.0.1.1"}})],
        }),
    ]);
    let syncer = syncer(&project, runner.clone());

    let rule = config.find_rule("multi").unwrap();
    let groups = config.resolve_server_groups(rule);
    assert!(!syncer.sync_certificate("multi", rule, &groups).await);

    // edge is never attempted
    assert_eq!(runner.call_count(), 2);
    assert_eq!(runner.hosts_per_call()[1], vec!["10.0.1.1".to_string()]);
}

#[tokio::test]
async fn test_first_group_failure_runs_only_once() {
    let project = Project::new();
    let config = project.load();
    let runner = RecordingRunner::with_results(vec![Ok(RunResult::failed(1))]);
    let syncer = syncer(&project, runner.clone());

    let rule = config.find_rule("multi").unwrap();
    let groups = config.resolve_server_groups(rule);
    assert!(!syncer.sync_certificate("multi", rule, &groups).await);
    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn test_runner_error_is_group_failure() {
    let project = Project::new();
    let config = project.load();
    let runner = RecordingRunner::with_results(vec![Err(spawn_error())]);
    let syncer = syncer(&project, runner.clone());

    let rule = config.find_rule("multi").unwrap();
    let groups = config.resolve_server_groups(rule);
    assert!(!syncer.sync_certificate("multi", rule, &groups).await);
    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn test_missing_playbook_is_fatal_before_any_group() {
    let project = Project::new();
    let config = project.load();
    let runner = RecordingRunner::new();
    let syncer = syncer(&project, runner.clone());

    let rule = config.find_rule("no-playbook").unwrap();
    let groups = config.resolve_server_groups(rule);
    assert_eq!(groups.len(), 2);
    assert!(!syncer.sync_certificate("no-playbook", rule, &groups).await);
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_request_contents() {
    let project = Project::new();
    let config = project.load();
    let runner = RecordingRunner::new();
    let syncer = syncer(&project, runner.clone());

    let rule = config.find_rule("multi").unwrap();
    let groups = config.resolve_server_groups(rule);
    assert!(syncer.sync_certificate("multi", rule, &groups).await);

    let calls = runner.calls();
    for call in &calls {
        assert_eq!(serde_json::to_value(&call.extra_vars).unwrap(), json!({"count": 3}));
    }
    assert_eq!(calls[0].ssh_key, None);
    assert_eq!(calls[1].ssh_key.as_deref(), Some(Path::new("/etc/certsync/keys/api")));
    assert_eq!(calls[2].ssh_key, None);
}

#[tokio::test]
async fn test_spawned_sync_runs_in_background() {
    let project = Project::new();
    let config = project.load();
    let runner = RecordingRunner::new();
    let syncer = Arc::new(syncer(&project, runner.clone()));

    let rule = config.find_rule("mykey").unwrap();
    let groups = config.resolve_server_groups(rule);
    let handle = syncer.spawn_sync("mykey".to_string(), Arc::clone(rule), groups);

    assert!(handle.await.unwrap());
    assert_eq!(runner.call_count(), 1);
}
