//! # certsync - SSL certificate sync webhook
//!
//! certsync receives "certificate changed" notifications over HTTP and pushes
//! the certificate to the right servers by running an Ansible playbook
//! through an external runner.
//!
//! ## Core Concepts
//!
//! - **Key**: opaque certificate identifier sent by the caller
//! - **Rule**: a [`PlaybookMapping`](config::PlaybookMapping) from a key to a
//!   playbook, its server groups and `var_*` variables
//! - **Server group**: named hosts sharing SSH connection settings
//! - **Inventory**: host document generated per group for the runner
//! - **Runner**: the external playbook engine behind [`runner::PlaybookRunner`]
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            Webhook endpoint (axum)             │
//! │   validate key → 400 / 404 / 503, reply 202    │
//! └───────────────────────────────────────────────┘
//!                        │ spawn
//!                        ▼
//! ┌───────────────────────────────────────────────┐
//! │          CertificateSyncer (sync)              │
//! │   playbook check, groups in order, fail-fast   │
//! └───────────────────────────────────────────────┘
//!          │ per group                 │
//!          ▼                           ▼
//! ┌──────────────────┐      ┌────────────────────────┐
//! │    Inventory     │      │     PlaybookRunner     │
//! │ (build_inventory)│      │ (ansible-runner CLI)   │
//! └──────────────────┘      └────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use certsync::prelude::*;
//!
//! let config = AppConfig::load("config.yml")?;
//! let syncer = CertificateSyncer::from_config(&config);
//! let rule = config.find_rule("example.com").unwrap();
//! let groups = config.resolve_server_groups(rule);
//! let ok = syncer.sync_certificate("example.com", rule, &groups).await;
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::api::{AppState, WebhookServer};
    pub use crate::config::{AppConfig, PlaybookMapping, ServerConfig, ServerGroup};
    pub use crate::error::{Error, Result};
    pub use crate::inventory::{build_inventory, Inventory};
    pub use crate::runner::{AnsibleRunner, PlaybookRunner, RunRequest, RunResult};
    pub use crate::sync::CertificateSyncer;
}

pub mod api;
pub mod config;
pub mod error;
pub mod inventory;
pub mod runner;
pub mod sync;

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
