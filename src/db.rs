//! Database module for the order ledger
//!
//! Completed order lines are appended to a local SQLite file.

mod schema;

pub use schema::*;

use crate::ledger::LedgerRecord;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Database lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Order Operations ====================

    /// Append one order line; returns the new row id
    pub fn insert_order(&self, record: &LedgerRecord) -> DbResult<String> {
        let conn = self.conn()?;
        let id = uuid::Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO orders (id, customer_name, user_id, category, label, total, description, address, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                record.customer_name,
                record.user_id,
                record.category,
                record.label,
                record.total,
                record.description,
                record.address,
                Utc::now().to_rfc3339()
            ],
        )?;

        Ok(id)
    }

    #[cfg(test)]
    pub fn lock_for_test(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    /// Orders for a user, oldest first
    #[cfg(test)]
    pub fn orders_for_user(&self, user_id: &str) -> DbResult<Vec<StoredOrder>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, customer_name, user_id, category, label, total, description, address, created_at
             FROM orders WHERE user_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(StoredOrder {
                id: row.get(0)?,
                customer_name: row.get(1)?,
                user_id: row.get(2)?,
                category: row.get(3)?,
                label: row.get(4)?,
                total: row.get(5)?,
                description: row.get(6)?,
                address: row.get(7)?,
                created_at: parse_datetime(&row.get::<_, String>(8)?),
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    #[cfg(test)]
    pub fn order_count(&self) -> DbResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[cfg(test)]
fn parse_datetime(s: &str) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
