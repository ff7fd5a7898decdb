//! Database schema and types

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY,
    customer_name TEXT NOT NULL,
    user_id TEXT NOT NULL,
    category TEXT NOT NULL,
    label TEXT NOT NULL,
    total TEXT NOT NULL,
    description TEXT NOT NULL,
    address TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id, created_at);
";

/// A ledger row as read back
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOrder {
    pub id: String,
    pub customer_name: String,
    pub user_id: String,
    pub category: String,
    pub label: String,
    pub total: String,
    pub description: String,
    pub address: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
