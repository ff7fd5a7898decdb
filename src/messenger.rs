//! Outbound messages to the messaging gateway

use crate::runtime::Messenger;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessengerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gateway returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    to: &'a str,
    body: &'a str,
}

/// Posts `{ "to", "body" }` to the gateway's send endpoint
pub struct HttpMessenger {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpMessenger {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Result<Self, MessengerError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            url: url.into(),
            token,
        })
    }
}

#[async_trait]
impl Messenger for HttpMessenger {
    async fn send(&self, to: &str, text: &str) -> Result<(), MessengerError> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&OutboundMessage { to, body: text });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MessengerError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Used when no gateway is configured: messages only reach the log
pub struct LogMessenger;

#[async_trait]
impl Messenger for LogMessenger {
    async fn send(&self, to: &str, text: &str) -> Result<(), MessengerError> {
        tracing::warn!(to = %to, text = %text, "No outbound gateway configured, message logged only");
        Ok(())
    }
}
