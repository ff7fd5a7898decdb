//! Catalog provider
//!
//! Rows come from a tabular source with columns (category, name, price,
//! description) and a header row. Fetching never fails from the caller's
//! point of view: errors and timeouts are logged and yield an empty catalog.

use crate::runtime::CatalogProvider;
use crate::sheets::{SheetsClient, SheetsError};
use crate::state_machine::{Catalog, MenuItem};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Sheets(#[from] SheetsError),
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid catalog file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Catalog fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Raw table rows, header included
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn rows(&self) -> Result<Vec<Vec<String>>, CatalogError>;

    /// Name used in logs
    fn describe(&self) -> String;
}

/// Group rows by category, skipping the header row.
///
/// Rows without a category or name, or with an unparseable price, are skipped.
pub fn parse_rows(rows: &[Vec<String>]) -> Catalog {
    let mut catalog = Catalog::new();
    for (index, row) in rows.iter().enumerate().skip(1) {
        let cell = |i: usize| row.get(i).map_or("", |s| s.trim());
        let (category, name) = (cell(0), cell(1));
        if category.is_empty() || name.is_empty() {
            tracing::warn!(row = index + 1, "Skipping catalog row without category or name");
            continue;
        }
        let Some(price) = parse_price(cell(2)) else {
            tracing::warn!(row = index + 1, price = %cell(2), "Skipping catalog row with invalid price");
            continue;
        };
        catalog.push(category, MenuItem::new(name, price, cell(3)));
    }
    catalog
}

/// Accepts `8.50`, `$8.50` and `8,50`
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let cleaned = raw.trim().trim_start_matches('$').trim().replace(',', ".");
    Decimal::from_str(&cleaned)
        .ok()
        .filter(|price| !price.is_sign_negative())
}

/// Fail-soft catalog over any row source, with a fetch timeout
pub struct TabularCatalog<R: RowSource> {
    source: R,
    timeout: Duration,
}

impl<R: RowSource> TabularCatalog<R> {
    pub fn new(source: R, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    async fn try_fetch(&self) -> Result<Catalog, CatalogError> {
        let rows = tokio::time::timeout(self.timeout, self.source.rows())
            .await
            .map_err(|_| CatalogError::Timeout(self.timeout))??;
        Ok(parse_rows(&rows))
    }
}

#[async_trait]
impl<R: RowSource> CatalogProvider for TabularCatalog<R> {
    async fn fetch(&self) -> Catalog {
        let start = std::time::Instant::now();
        match self.try_fetch().await {
            Ok(catalog) => {
                tracing::info!(
                    source = %self.source.describe(),
                    categories = catalog.len(),
                    duration_ms = %start.elapsed().as_millis(),
                    "Catalog fetched"
                );
                catalog
            }
            Err(e) => {
                tracing::error!(
                    source = %self.source.describe(),
                    error = %e,
                    duration_ms = %start.elapsed().as_millis(),
                    "Catalog fetch failed, continuing with empty catalog"
                );
                Catalog::new()
            }
        }
    }
}

// ============================================================================
// Row sources
// ============================================================================

/// Rows read from a spreadsheet range
pub struct SheetsRows {
    client: SheetsClient,
    range: String,
}

impl SheetsRows {
    pub fn new(client: SheetsClient, range: impl Into<String>) -> Self {
        Self {
            client,
            range: range.into(),
        }
    }
}

#[async_trait]
impl RowSource for SheetsRows {
    async fn rows(&self) -> Result<Vec<Vec<String>>, CatalogError> {
        Ok(self.client.get_values(&self.range).await?)
    }

    fn describe(&self) -> String {
        format!("sheets:{}", self.range)
    }
}

/// Rows read from a local JSON file (`[["Categoría", "Nombre", ...], ...]`)
pub struct FileRows {
    path: PathBuf,
}

impl FileRows {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RowSource for FileRows {
    async fn rows(&self) -> Result<Vec<Vec<String>>, CatalogError> {
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
