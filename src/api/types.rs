//! API request and response types

use crate::state_machine::Location;
use serde::{Deserialize, Serialize};

/// Message forwarded by the messaging gateway
#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    /// Sender id, e.g. `593999000111@c.us`
    pub from: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub location: Option<Location>,
}

/// Replies to send back to the sender, in order
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub replies: Vec<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
