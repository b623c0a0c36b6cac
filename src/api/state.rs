//! Application state management.

use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::sync::CertificateSyncer;

/// Shared application state.
///
/// The configuration is frozen once loaded. The syncer is installed once
/// during startup; until then the webhook answers 503.
#[derive(Debug)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<AppConfig>,
    syncer: OnceCell<Arc<CertificateSyncer>>,
}

impl AppState {
    /// Create state without a syncer.
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            syncer: OnceCell::new(),
        }
    }

    /// Create fully initialized state.
    pub fn with_syncer(config: Arc<AppConfig>, syncer: Arc<CertificateSyncer>) -> Self {
        let state = Self::new(config);
        state.install_syncer(syncer);
        state
    }

    /// Install the syncer. Returns false if one was already installed.
    pub fn install_syncer(&self, syncer: Arc<CertificateSyncer>) -> bool {
        self.syncer.set(syncer).is_ok()
    }

    /// The syncer, once installed.
    pub fn syncer(&self) -> Option<&Arc<CertificateSyncer>> {
        self.syncer.get()
    }
}
