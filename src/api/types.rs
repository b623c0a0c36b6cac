//! API request and response types.

use serde::{Deserialize, Serialize};

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "ssl-certificate-webhook";

/// Webhook request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Certificate identifier, trimmed before lookup
    pub name: String,
}

/// Response when a sync has been scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAccepted {
    /// Always "accepted"
    pub status: String,
    /// Trimmed key
    pub key: String,
    /// Server groups that will be synced, in order
    pub server_groups: Vec<String>,
    /// Playbook of the matched rule
    pub playbook_file: String,
    /// Human-readable message
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "ok"
    pub status: String,
    /// Service name
    pub service: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            service: SERVICE_NAME.to_string(),
        }
    }
}
