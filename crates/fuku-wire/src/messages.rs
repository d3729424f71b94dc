//! The two messages exchanged on the log socket, newline-delimited JSON in
//! both directions.

use serde::{Deserialize, Serialize};

/// The client's required first message. An empty or absent `services`
/// means "subscribe to every service".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "subscribe")]
pub struct SubscribeRequest {
    #[serde(default)]
    pub services: Vec<String>,
}

impl SubscribeRequest {
    pub fn all() -> Self {
        Self { services: Vec::new() }
    }

    /// Whether this subscription wants lines from `service`.
    pub fn wants(&self, service: &str) -> bool {
        self.services.is_empty() || self.services.iter().any(|s| s == service)
    }
}

/// One log line, pushed from server to client for as long as the
/// subscription lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "log")]
pub struct LogFrame {
    pub service: String,
    pub message: String,
}

impl LogFrame {
    pub fn new(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self { service: service.into(), message: message.into() }
    }
}
