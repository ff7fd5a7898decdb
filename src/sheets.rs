//! Minimal Google Sheets values API client
//!
//! Only the two calls the bot needs: reading a range and appending a row.

mod auth;

pub use auth::{ServiceAccountKey, DEFAULT_TOKEN_URI};

use auth::ServiceAccountAuth;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sheets API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid Sheets URL: {0}")]
    InvalidUrl(String),
    #[error("Service account credentials: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// How requests are authorized
#[derive(Debug, Clone)]
pub enum SheetsAuth {
    /// Service-account key; access tokens are obtained and refreshed as needed
    ServiceAccount(ServiceAccountKey),
    /// Fixed OAuth access token; stops working when it expires
    Bearer(String),
    /// API key; read-only access to public sheets
    ApiKey(String),
}

/// `SheetsAuth` resolved against the client's HTTP connection pool
#[derive(Clone)]
enum Credentials {
    ServiceAccount(Arc<ServiceAccountAuth>),
    Bearer(String),
    ApiKey(String),
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct AppendBody<'a> {
    values: [&'a [String]; 1],
}

#[derive(Clone)]
pub struct SheetsClient {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    credentials: Credentials,
}

impl SheetsClient {
    pub fn new(
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        auth: SheetsAuth,
    ) -> Result<Self, SheetsError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let credentials = match auth {
            SheetsAuth::ServiceAccount(key) => {
                Credentials::ServiceAccount(Arc::new(ServiceAccountAuth::new(key, client.clone())?))
            }
            SheetsAuth::Bearer(token) => Credentials::Bearer(token),
            SheetsAuth::ApiKey(key) => Credentials::ApiKey(key),
        };
        Ok(Self {
            client,
            base_url: base_url.into(),
            spreadsheet_id: spreadsheet_id.into(),
            credentials,
        })
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}{suffix}`, with path segments escaped
    fn values_url(&self, range: &str, suffix: &str) -> Result<Url, SheetsError> {
        let mut url = Url::parse(self.base_url.trim_end_matches('/'))
            .map_err(|e| SheetsError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| SheetsError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values"])
            .push(&format!("{range}{suffix}"));
        if let Credentials::ApiKey(key) = &self.credentials {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(url)
    }

    async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, SheetsError> {
        Ok(match &self.credentials {
            Credentials::ServiceAccount(account) => request.bearer_auth(account.access_token().await?),
            Credentials::Bearer(token) => request.bearer_auth(token),
            Credentials::ApiKey(_) => request,
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SheetsError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Read a range as rows of display strings
    pub async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let url = self.values_url(range, "")?;
        let response = self.authorize(self.client.get(url)).await?.send().await?;
        let body: ValueRange = Self::check(response).await?.json().await?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    /// Append one row after the table found at `range`
    pub async fn append_row(&self, range: &str, row: &[String]) -> Result<(), SheetsError> {
        let mut url = self.values_url(range, ":append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");
        let response = self
            .authorize(self.client.post(url))
            .await?
            .json(&AppendBody { values: [row] })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
