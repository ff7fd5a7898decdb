//! Order ledger: durable append-only record of finalized orders

use crate::db::{Database, DbError};
use crate::runtime::OrderLedger;
use crate::sheets::{SheetsClient, SheetsError};
use crate::state_machine::replies::amount;
use crate::state_machine::ConversationState;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Sheets(#[from] SheetsError),
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// One row per order line of a completed order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRecord {
    pub customer_name: String,
    pub user_id: String,
    pub category: String,
    /// `"{quantity}x {name}"`
    pub label: String,
    /// Session total (not the line total), two decimals
    pub total: String,
    pub description: String,
    pub address: String,
}

impl LedgerRecord {
    /// Records for every line in the cart, sharing the session total and address
    pub fn for_order(state: &ConversationState) -> Vec<LedgerRecord> {
        let total = amount(state.total);
        let address = state.address.clone().unwrap_or_default();
        state
            .orders
            .iter()
            .map(|line| LedgerRecord {
                customer_name: state.customer_name().to_string(),
                user_id: state.user_id.clone(),
                category: line.category.clone(),
                label: line.label(),
                total: total.clone(),
                description: line.description.clone(),
                address: address.clone(),
            })
            .collect()
    }

    /// Column order of the `pedidos` sheet
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.customer_name.clone(),
            self.user_id.clone(),
            self.category.clone(),
            self.label.clone(),
            self.total.clone(),
            self.description.clone(),
            self.address.clone(),
        ]
    }
}

/// A record that could not be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerFailure {
    pub label: String,
    pub error: String,
}

/// Outcome of writing one order's records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerReport {
    pub written: usize,
    pub failures: Vec<LedgerFailure>,
}

impl LedgerReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Write records one after another, collecting failures instead of stopping
pub async fn record_all<L: OrderLedger + ?Sized>(
    ledger: &L,
    records: &[LedgerRecord],
) -> LedgerReport {
    let mut report = LedgerReport::default();
    for record in records {
        match ledger.append(record).await {
            Ok(()) => {
                tracing::info!(
                    user_id = %record.user_id,
                    label = %record.label,
                    total = %record.total,
                    "Order line recorded"
                );
                report.written += 1;
            }
            Err(e) => {
                tracing::error!(
                    user_id = %record.user_id,
                    label = %record.label,
                    error = %e,
                    "Failed to record order line"
                );
                report.failures.push(LedgerFailure {
                    label: record.label.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    report
}

// ============================================================================
// Adapters
// ============================================================================

/// Ledger backed by the local SQLite database
#[derive(Clone)]
pub struct SqliteLedger {
    db: Database,
}

impl SqliteLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[cfg(test)]
    pub fn inner(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl OrderLedger for SqliteLedger {
    async fn append(&self, record: &LedgerRecord) -> Result<(), LedgerError> {
        // rusqlite blocks, keep it off the async workers
        let db = self.db.clone();
        let owned = record.clone();
        let id = tokio::task::spawn_blocking(move || db.insert_order(&owned))
            .await
            .map_err(|e| LedgerError::Unavailable(format!("SQLite writer task failed: {e}")))??;
        tracing::debug!(order_id = %id, label = %record.label, "Order line stored");
        Ok(())
    }
}

/// Ledger that appends rows to a spreadsheet range
pub struct SheetsLedger {
    client: SheetsClient,
    range: String,
}

impl SheetsLedger {
    pub fn new(client: SheetsClient, range: impl Into<String>) -> Self {
        Self {
            client,
            range: range.into(),
        }
    }
}

#[async_trait]
impl OrderLedger for SheetsLedger {
    async fn append(&self, record: &LedgerRecord) -> Result<(), LedgerError> {
        self.client.append_row(&self.range, &record.to_row()).await?;
        Ok(())
    }
}
