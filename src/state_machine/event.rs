//! Events that can occur in a conversation

use super::state::Catalog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// A message from the customer
    Inbound {
        body: String,
        location: Option<Location>,
        /// When the message was received; drives the operating-hours gate
        received_at: DateTime<Utc>,
    },

    /// Catalog snapshot fetched after the customer gave their name
    CatalogLoaded { catalog: Catalog },
}

impl Event {
    pub fn text(body: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Event::Inbound {
            body: body.into(),
            location: None,
            received_at,
        }
    }
}

/// Shared location payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Map search link for the coordinates
    pub fn map_link(&self) -> String {
        format!(
            "https://www.google.com/maps/search/?api=1&query={},{}",
            self.latitude, self.longitude
        )
    }
}
