//! Effects produced by state transitions

use crate::ledger::LedgerRecord;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a message back to the customer
    Reply { text: String },

    /// Load the catalog snapshot; the runtime answers with `Event::CatalogLoaded`
    FetchCatalog,

    /// Send the consolidated order summary to the operator
    NotifyOperator { to: String, text: String },

    /// Persist one ledger row per order line, sequentially
    RecordOrder { records: Vec<LedgerRecord> },
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply { text: text.into() }
    }

    pub fn notify_operator(to: impl Into<String>, text: impl Into<String>) -> Self {
        Effect::NotifyOperator {
            to: to.into(),
            text: text.into(),
        }
    }

    /// Text of a reply effect
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            Effect::Reply { text } => Some(text),
            _ => None,
        }
    }
}
