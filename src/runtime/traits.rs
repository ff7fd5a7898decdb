//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the runtime with mock implementations.

use crate::ledger::{LedgerError, LedgerRecord};
use crate::messenger::MessengerError;
use crate::state_machine::{Catalog, ConversationState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Source of the menu snapshot
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch the catalog; failures yield an empty catalog
    async fn fetch(&self) -> Catalog;
}

/// Durable append-only sink for order lines
#[async_trait]
pub trait OrderLedger: Send + Sync {
    async fn append(&self, record: &LedgerRecord) -> Result<(), LedgerError>;
}

/// Outbound messages that are not replies (operator notifications)
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, to: &str, text: &str) -> Result<(), MessengerError>;
}

/// Per-user conversation state, owned by the runtime
pub trait ConversationStore: Send + Sync {
    /// Current state for the user, created idle on first contact
    fn get_or_create(&mut self, user_id: &str, now: DateTime<Utc>) -> ConversationState;

    /// Replace the stored state
    fn save(&mut self, state: ConversationState, now: DateTime<Utc>);

    /// Drop conversations that have been idle too long; returns how many
    fn evict_idle(&mut self, now: DateTime<Utc>) -> usize;

    fn len(&self) -> usize;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: CatalogProvider + ?Sized> CatalogProvider for Arc<T> {
    async fn fetch(&self) -> Catalog {
        (**self).fetch().await
    }
}

#[async_trait]
impl<T: OrderLedger + ?Sized> OrderLedger for Arc<T> {
    async fn append(&self, record: &LedgerRecord) -> Result<(), LedgerError> {
        (**self).append(record).await
    }
}

#[async_trait]
impl<T: Messenger + ?Sized> Messenger for Arc<T> {
    async fn send(&self, to: &str, text: &str) -> Result<(), MessengerError> {
        (**self).send(to, text).await
    }
}
