//! Pedido Bot - conversational ordering assistant
//!
//! Drives a step-by-step ordering dialogue over a messaging gateway webhook,
//! with the menu read from a spreadsheet and completed orders appended to a
//! ledger.

mod api;
mod catalog;
mod config;
mod db;
mod hours;
mod ledger;
mod messenger;
mod runtime;
mod sheets;
mod state_machine;

use api::{create_router, AppState};
use catalog::{FileRows, SheetsRows, TabularCatalog};
use config::{Config, LedgerBackend};
use db::Database;
use ledger::{SheetsLedger, SqliteLedger};
use messenger::{HttpMessenger, LogMessenger};
use runtime::{
    BotRuntime, CatalogProvider, InMemoryStore, Messenger, OrderLedger, ProductionRuntime,
    RuntimeHandle,
};
use sheets::SheetsClient;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pedido_bot=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }

    let config = Config::from_env()?;

    let sheets_client = match &config.sheets {
        Some(sheets) => Some(SheetsClient::new(
            &sheets.base_url,
            &sheets.spreadsheet_id,
            sheets.auth.clone(),
        )?),
        None => None,
    };

    // Catalog source: a local file wins over the spreadsheet
    let catalog: Arc<dyn CatalogProvider> = match (&config.catalog_file, &sheets_client, &config.sheets) {
        (Some(path), _, _) => {
            tracing::info!(path = %path.display(), "Catalog from file");
            Arc::new(TabularCatalog::new(FileRows::new(path), config.catalog_timeout))
        }
        (None, Some(client), Some(sheets)) => {
            tracing::info!(range = %sheets.menu_range, "Catalog from spreadsheet");
            Arc::new(TabularCatalog::new(
                SheetsRows::new(client.clone(), &sheets.menu_range),
                config.catalog_timeout,
            ))
        }
        _ => return Err("No catalog source configured".into()),
    };

    let ledger: Arc<dyn OrderLedger> = match (config.ledger_backend, &sheets_client, &config.sheets) {
        (LedgerBackend::Sheets, Some(client), Some(sheets)) => {
            tracing::info!(range = %sheets.orders_range, "Ledger on spreadsheet");
            Arc::new(SheetsLedger::new(client.clone(), &sheets.orders_range))
        }
        _ => {
            if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            tracing::info!(path = %config.db_path.display(), "Opening ledger database");
            Arc::new(SqliteLedger::new(Database::open(&config.db_path)?))
        }
    };

    let messenger: Arc<dyn Messenger> = match &config.outbound {
        Some(outbound) => Arc::new(HttpMessenger::new(&outbound.url, outbound.token.clone())?),
        None => {
            tracing::warn!("OUTBOUND_URL not set; operator notifications will only be logged");
            Arc::new(LogMessenger)
        }
    };

    let runtime: ProductionRuntime = BotRuntime::new(
        config.bot.clone(),
        InMemoryStore::new(config.idle_ttl),
        catalog,
        ledger,
        messenger,
    );
    let state = AppState::new(RuntimeHandle::spawn(runtime));

    let app = create_router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        business = %config.bot.business_name,
        utc_offset = %config.bot.hours.offset(),
        "Pedido bot listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
