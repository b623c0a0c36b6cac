//! Configuration module for certsync
//!
//! Loads the declarative YAML file once at startup and exposes it as a frozen
//! [`AppConfig`]. The file has these top-level sections:
//! - `server`: bind address, log level, default playbook
//! - `webhook`: webhook path (overrides `server.webhook_path`)
//! - `runner`: external runner command, playbooks directory, verbosity
//! - `server_groups`: named clusters of hosts with SSH overrides
//! - `playbook_mappings`: rules mapping a certificate key to a playbook
//!
//! Rule resolution (finding the rule for a key and expanding its server
//! groups) also lives here since it only reads the loaded configuration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, ErrorContext, Result};

/// Prefix marking a rule field as a runner variable.
pub const VAR_PREFIX: &str = "var_";

/// SSH port that never needs to appear in a generated inventory.
pub const DEFAULT_SSH_PORT: u16 = 22;

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

/// A named cluster of target hosts sharing SSH connection settings.
///
/// Empty credential fields mean "use the ambient SSH configuration". The
/// fields are independent of each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerGroup {
    /// Group name, referenced by [`PlaybookMapping::server_groups`]
    pub name: String,

    /// Host names or IP addresses, in declaration order
    pub hosts: Vec<String>,

    /// SSH user override
    #[serde(default)]
    pub ssh_user: String,

    /// SSH private key path override
    #[serde(default)]
    pub ssh_key_path: String,

    /// SSH password override (discouraged, use keys)
    #[serde(default)]
    pub ssh_pass: String,

    /// SSH port
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
}

impl ServerGroup {
    /// Create a group with the given hosts and no SSH overrides.
    pub fn new(name: impl Into<String>, hosts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            hosts: hosts.into_iter().map(Into::into).collect(),
            ssh_user: String::new(),
            ssh_key_path: String::new(),
            ssh_pass: String::new(),
            ssh_port: DEFAULT_SSH_PORT,
        }
    }

    /// Returns the key path override, if one is configured.
    pub fn ssh_key(&self) -> Option<&Path> {
        if self.ssh_key_path.is_empty() {
            None
        } else {
            Some(Path::new(&self.ssh_key_path))
        }
    }
}

/// A rule mapping a certificate key to a playbook and its target groups.
///
/// Any field not listed here is kept in [`extra`](Self::extra); fields whose
/// name starts with [`VAR_PREFIX`] are handed to the runner as variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybookMapping {
    /// Certificate identifier (domain, service name, ...)
    pub key: String,

    /// Names of the server groups to sync, in order
    pub server_groups: Vec<String>,

    /// Playbook file name inside the playbooks directory
    pub playbook_file: String,

    /// Remaining fields of the rule
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl PlaybookMapping {
    /// Create a rule without extra fields.
    pub fn new(
        key: impl Into<String>,
        server_groups: impl IntoIterator<Item = impl Into<String>>,
        playbook_file: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            server_groups: server_groups.into_iter().map(Into::into).collect(),
            playbook_file: playbook_file.into(),
            extra: IndexMap::new(),
        }
    }

    /// Add an extra field (builder style).
    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(name.into(), value);
        self
    }

    /// Extract the runner variables: every `var_*` field with the prefix stripped.
    pub fn ansible_vars(&self) -> IndexMap<String, serde_json::Value> {
        self.extra
            .iter()
            .filter_map(|(name, value)| {
                name.strip_prefix(VAR_PREFIX)
                    .map(|var| (var.to_string(), value.clone()))
            })
            .collect()
    }
}

/// Process-wide HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Log level (TRACE, DEBUG, INFO, WARNING, ERROR, ...)
    pub log_level: String,

    /// Webhook path, without the leading slash
    pub webhook_path: String,

    /// Default playbook file name
    pub playbook_file: String,
}

impl ServerConfig {
    /// Address to bind the listener to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Route the webhook is served on, always starting with a single `/`.
    pub fn webhook_route(&self) -> String {
        format!("/{}", self.webhook_path.trim_start_matches('/'))
    }

    /// Translate the configured log level into a tracing filter directive.
    pub fn log_filter(&self) -> &'static str {
        match self.log_level.trim().to_ascii_uppercase().as_str() {
            "TRACE" => "trace",
            "DEBUG" => "debug",
            "WARN" | "WARNING" => "warn",
            "ERROR" | "CRITICAL" => "error",
            _ => "info",
        }
    }
}

/// External runner settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Runner executable
    pub command: String,

    /// Directory holding the playbook files
    pub playbooks_dir: PathBuf,

    /// Runner verbosity (number of `-v` flags)
    pub verbosity: u8,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command: "ansible-runner".to_string(),
            playbooks_dir: PathBuf::from("playbooks"),
            verbosity: 1,
        }
    }
}

/// `server` section as written in the file.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ServerSection {
    host: String,
    port: u16,
    log_level: String,
    webhook_path: Option<String>,
    playbook_file: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "INFO".to_string(),
            webhook_path: None,
            playbook_file: "ssl_sync.yml".to_string(),
        }
    }
}

/// `webhook` section as written in the file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebhookSection {
    path: Option<String>,
}

/// Whole configuration file as written.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerSection,
    webhook: WebhookSection,
    runner: RunnerConfig,
    server_groups: Vec<ServerGroup>,
    playbook_mappings: Vec<PlaybookMapping>,
}

/// Parse the file contents, resolving `<<` merge keys before deserializing.
fn parse_config_file(content: &str) -> serde_yaml::Result<ConfigFile> {
    let mut value: serde_yaml::Value = serde_yaml::from_str(content)?;
    if value.is_null() {
        return Ok(ConfigFile::default());
    }
    value.apply_merge()?;
    serde_yaml::from_value(value)
}

/// The loaded application configuration.
///
/// Built once before the listener starts and never mutated afterwards.
/// Groups and rules are reference counted so a background sync can hold on
/// to them after the request that triggered it has finished.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server settings
    pub server: ServerConfig,

    /// Runner settings
    pub runner: RunnerConfig,

    /// Server groups by name, in declaration order
    pub server_groups: IndexMap<String, Arc<ServerGroup>>,

    /// Rules, in declaration order
    pub playbook_mappings: Vec<Arc<PlaybookMapping>>,

    warnings: Vec<String>,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// A relative `runner.playbooks_dir` is resolved against the directory
    /// containing the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file = parse_config_file(&content).map_err(|e| Error::config_load(path, e.to_string()))?;

        let mut config = Self::from_file(file)?;
        if config.runner.playbooks_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.runner.playbooks_dir = parent.join(&config.runner.playbooks_dir);
            }
        }

        debug!(
            path = %path.display(),
            groups = config.server_groups.len(),
            rules = config.playbook_mappings.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse configuration from a YAML string. Paths are kept as written.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Self::from_file(parse_config_file(content)?)
    }

    fn from_file(file: ConfigFile) -> Result<Self> {
        let ConfigFile {
            server,
            webhook,
            runner,
            server_groups,
            playbook_mappings,
        } = file;

        let webhook_path = webhook
            .path
            .filter(|p| !p.is_empty())
            .or(server.webhook_path)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                Error::Config("webhook path must be set in 'webhook.path' or 'server.webhook_path'".into())
            })?;

        let server = ServerConfig {
            host: server.host,
            port: server.port,
            log_level: server.log_level,
            webhook_path,
            playbook_file: server.playbook_file,
        };

        let mut warnings = Vec::new();
        let mut groups = IndexMap::new();
        for group in server_groups {
            if group.hosts.is_empty() {
                warnings.push(format!("server group '{}' has no hosts", group.name));
            }
            if groups.contains_key(&group.name) {
                warnings.push(format!(
                    "server group '{}' is defined more than once, the last definition wins",
                    group.name
                ));
            }
            groups.insert(group.name.clone(), Arc::new(group));
        }

        let mut seen = HashSet::new();
        for rule in &playbook_mappings {
            if !seen.insert(rule.key.as_str()) {
                warnings.push(format!(
                    "playbook mapping key '{}' is defined more than once, only the first one is used",
                    rule.key
                ));
            }
            for name in rule.server_groups.iter().filter(|n| !groups.contains_key(*n)) {
                warnings.push(format!(
                    "playbook mapping '{}' references unknown server group '{}'",
                    rule.key, name
                ));
            }
        }

        Ok(Self {
            server,
            runner,
            server_groups: groups,
            playbook_mappings: playbook_mappings.into_iter().map(Arc::new).collect(),
            warnings,
        })
    }

    /// Find the first rule whose key equals `key` exactly.
    pub fn find_rule(&self, key: &str) -> Option<&Arc<PlaybookMapping>> {
        self.playbook_mappings.iter().find(|rule| rule.key == key)
    }

    /// Look up the rule's server groups, silently skipping unknown names.
    ///
    /// The result keeps the order of the rule's `server_groups` list and may
    /// be empty, which callers must treat as "no usable targets".
    pub fn resolve_server_groups(&self, rule: &PlaybookMapping) -> IndexMap<String, Arc<ServerGroup>> {
        rule.server_groups
            .iter()
            .filter_map(|name| {
                self.server_groups
                    .get(name)
                    .map(|group| (name.clone(), Arc::clone(group)))
            })
            .collect()
    }

    /// Server groups for a key, empty when no rule matches.
    pub fn servers_for_key(&self, key: &str) -> IndexMap<String, Arc<ServerGroup>> {
        self.find_rule(key)
            .map(|rule| self.resolve_server_groups(rule))
            .unwrap_or_default()
    }

    /// Directory holding the playbook files.
    pub fn playbooks_dir(&self) -> &Path {
        &self.runner.playbooks_dir
    }

    /// Suspicious but accepted settings found while loading.
    ///
    /// Duplicate rule keys and unknown group references are reported here
    /// rather than rejected.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}
