//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::executor::BotRuntime;
use super::store::InMemoryStore;
use super::traits::*;
use super::InboundMessage;
use crate::hours::Clock;
use crate::ledger::{LedgerError, LedgerRecord};
use crate::messenger::MessengerError;
use crate::state_machine::{BotContext, Catalog, ConversationState, Location, MenuItem};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

// ============================================================================
// Mock Catalog
// ============================================================================

/// Catalog provider that serves a fixed snapshot and counts fetches
pub struct MockCatalog {
    catalog: Mutex<Catalog>,
    fetches: Mutex<usize>,
}

impl MockCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Mutex::new(catalog),
            fetches: Mutex::new(0),
        }
    }

    /// Swap the snapshot served by later fetches
    pub fn replace(&self, catalog: Catalog) {
        *self.catalog.lock().unwrap() = catalog;
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl CatalogProvider for MockCatalog {
    async fn fetch(&self) -> Catalog {
        *self.fetches.lock().unwrap() += 1;
        self.catalog.lock().unwrap().clone()
    }
}

// ============================================================================
// Mock Ledger
// ============================================================================

/// Ledger that keeps records in memory and can be told to reject some labels
/// or to stall until released
#[derive(Default)]
pub struct MockLedger {
    records: Mutex<Vec<LedgerRecord>>,
    failing_labels: Mutex<HashSet<String>>,
    gate: Arc<RwLock<()>>,
    held: Mutex<Option<OwnedRwLockWriteGuard<()>>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends of records with this label will fail
    pub fn fail_on(&self, label: impl Into<String>) {
        self.failing_labels.lock().unwrap().insert(label.into());
    }

    /// Appends wait until [`MockLedger::release`]
    pub fn hold(&self) {
        *self.held.lock().unwrap() = self.gate.clone().try_write_owned().ok();
    }

    pub fn release(&self) {
        self.held.lock().unwrap().take();
    }

    pub fn recorded(&self) -> Vec<LedgerRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderLedger for MockLedger {
    async fn append(&self, record: &LedgerRecord) -> Result<(), LedgerError> {
        let _open = self.gate.read().await;
        if self.failing_labels.lock().unwrap().contains(&record.label) {
            return Err(LedgerError::Unavailable(format!(
                "mock rejected {}",
                record.label
            )));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

// ============================================================================
// Mock Messenger
// ============================================================================

/// Messenger that records every send
#[derive(Default)]
pub struct MockMessenger {
    sent: Mutex<Vec<(String, String)>>,
    fail: Mutex<bool>,
}

impl MockMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later send fails (after being recorded)
    pub fn fail_all(&self) {
        *self.fail.lock().unwrap() = true;
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send(&self, to: &str, text: &str) -> Result<(), MessengerError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), text.to_string()));
        if *self.fail.lock().unwrap() {
            return Err(MessengerError::Status {
                status: 503,
                body: "gateway down".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Fixed Clock
// ============================================================================

/// Clock that only moves when told to
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ============================================================================
// Test Runtime Harness
// ============================================================================

/// Wednesday 15:00 in the default UTC-5 schedule
pub fn open_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 12, 20, 0, 0).unwrap()
}

/// Wednesday 08:00 in the default UTC-5 schedule
pub fn closed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 12, 13, 0, 0).unwrap()
}

pub fn sample_catalog() -> Catalog {
    let dec = |s: &str| -> Decimal { s.parse().unwrap() };
    let mut catalog = Catalog::new();
    catalog.push("Pizzas", MenuItem::new("Margarita", dec("8.50"), "Tomate y queso"));
    catalog.push("Pizzas", MenuItem::new("Hawaiana", dec("9.00"), "Piña"));
    catalog.push("Bebidas", MenuItem::new("Cola", dec("1.50"), "350ml"));
    catalog.push("Promociones", MenuItem::new("2x1 Pizzas", dec("12.00"), "Martes"));
    catalog
}

pub type MockRuntime =
    BotRuntime<InMemoryStore, Arc<MockCatalog>, Arc<MockLedger>, Arc<MockMessenger>>;

/// Runtime wired to mocks, driven directly without a task
pub struct TestRuntime {
    pub runtime: MockRuntime,
    pub catalog: Arc<MockCatalog>,
    pub ledger: Arc<MockLedger>,
    pub messenger: Arc<MockMessenger>,
    pub clock: Arc<FixedClock>,
}

impl TestRuntime {
    pub fn new() -> Self {
        Self::with_context(BotContext::default(), sample_catalog())
    }

    pub fn with_context(context: BotContext, catalog: Catalog) -> Self {
        let catalog = Arc::new(MockCatalog::new(catalog));
        let ledger = Arc::new(MockLedger::new());
        let messenger = Arc::new(MockMessenger::new());
        let clock = Arc::new(FixedClock::new(open_time()));
        let runtime = BotRuntime::new(
            context,
            InMemoryStore::new(None),
            catalog.clone(),
            ledger.clone(),
            messenger.clone(),
        )
        .with_clock(clock.clone());
        Self {
            runtime,
            catalog,
            ledger,
            messenger,
            clock,
        }
    }

    /// Send a text message and collect the replies, then let background
    /// side effects finish
    pub async fn say(&mut self, from: &str, body: &str) -> Vec<String> {
        let replies = self
            .runtime
            .handle_message(InboundMessage::text(from, body))
            .await;
        self.runtime.settle().await;
        replies
    }

    pub async fn share_location(&mut self, from: &str, location: Location) -> Vec<String> {
        let replies = self
            .runtime
            .handle_message(InboundMessage {
                from: from.to_string(),
                body: String::new(),
                location: Some(location),
            })
            .await;
        self.runtime.settle().await;
        replies
    }

    /// Play a script, returning the replies to the last message
    pub async fn script(&mut self, from: &str, bodies: &[&str]) -> Vec<String> {
        let mut last = Vec::new();
        for body in bodies {
            last = self.say(from, body).await;
        }
        last
    }

    pub fn state(&self, user_id: &str) -> Option<ConversationState> {
        self.runtime.store().get(user_id).cloned()
    }
}

impl Default for TestRuntime {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeHandle;
    use crate::state_machine::replies;
    use crate::state_machine::Step;
    use std::time::Duration;

    const USER: &str = "593999000111@c.us";

    /// Greeting through a line of 2x Margarita, ending at the post-add menu
    const ADD_MARGARITAS: &[&str] = &["hola, quiero hacer un pedido", "Ana", "1", "1", "2"];

    #[tokio::test]
    async fn test_pickup_order_end_to_end() {
        let mut rt = TestRuntime::new();

        let greeting = rt.say(USER, "Hola, quiero hacer un PEDIDO").await;
        assert_eq!(greeting, vec![replies::greeting(&BotContext::default())]);

        let menu = rt.say(USER, "Ana").await;
        assert_eq!(menu.len(), 2);
        assert_eq!(menu[0], replies::fetching_menu("Ana"));
        assert!(menu[1].contains("1. Pizzas"));
        assert_eq!(rt.catalog.fetch_count(), 1);

        rt.script(USER, &["1", "1", "2"]).await;
        let summary = rt.say(USER, "3").await;
        assert!(summary[0].contains("Total a pagar: $17.00"));

        let done = rt.say(USER, "2").await;
        assert_eq!(
            done,
            vec![replies::pickup_confirmation(&BotContext::default(), "Ana")]
        );

        let recorded = rt.ledger.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].label, "2x Margarita");
        assert_eq!(recorded[0].total, "17.00");
        assert_eq!(recorded[0].address, BotContext::PICKUP_ADDRESS);
        assert!(rt.messenger.sent().is_empty());

        let state = rt.state(USER).unwrap();
        assert_eq!(state.step, Step::Idle);
        assert!(state.orders.is_empty());
        assert_eq!(state.name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn test_delivery_with_location_notifies_operator() {
        let mut rt = TestRuntime::new();
        rt.script(USER, ADD_MARGARITAS).await;
        rt.script(USER, &["3", "1"]).await;

        let location = Location {
            latitude: -0.1807,
            longitude: -78.4678,
        };
        let done = rt.share_location(USER, location).await;
        assert_eq!(
            done,
            vec![replies::delivery_confirmation(&BotContext::default(), "Ana", None)]
        );

        let sent = rt.messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, BotContext::default().operator_id);
        assert!(sent[0].1.contains(&location.map_link()));

        let recorded = rt.ledger.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].address, location.map_link());
    }

    #[tokio::test]
    async fn test_ledger_failure_keeps_other_lines_and_resets() {
        let mut rt = TestRuntime::new();
        rt.ledger.fail_on("2x Margarita");

        rt.script(USER, ADD_MARGARITAS).await;
        // Add one Cola from the second category
        rt.script(USER, &["1", "2", "1", "1"]).await;
        let ask = rt.script(USER, &["3", "1"]).await;
        assert_eq!(ask, vec![replies::ASK_ADDRESS.to_string()]);
        let done = rt.say(USER, "Av. Amazonas 100").await;
        assert_eq!(done.len(), 1);
        assert!(done[0].contains("Av. Amazonas 100"));

        let recorded = rt.ledger.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].label, "1x Cola");
        assert_eq!(recorded[0].total, "18.50");
        assert_eq!(rt.state(USER).unwrap().step, Step::Idle);
    }

    #[tokio::test]
    async fn test_messenger_failure_does_not_block_customer() {
        let mut rt = TestRuntime::new();
        rt.messenger.fail_all();

        rt.script(USER, ADD_MARGARITAS).await;
        let done = rt.script(USER, &["3", "1", "Av. Siempre Viva 742"]).await;
        assert_eq!(done.len(), 1);
        assert_eq!(rt.messenger.sent().len(), 1);
        assert_eq!(rt.ledger.recorded().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_catalog_reaches_categories() {
        let mut rt = TestRuntime::with_context(BotContext::default(), Catalog::new());

        let replies_to_name = rt.script(USER, &["pedido", "Ana"]).await;
        assert_eq!(replies_to_name.last().map(String::as_str), Some(replies::NO_CATEGORIES));
        assert_eq!(rt.state(USER).unwrap().step, Step::AwaitingCategory);

        let retry = rt.say(USER, "1").await;
        assert_eq!(retry, vec![replies::INVALID_CATEGORY.to_string()]);
    }

    #[tokio::test]
    async fn test_catalog_snapshot_is_per_conversation() {
        let mut rt = TestRuntime::new();
        rt.script(USER, &["pedido", "Ana"]).await;

        rt.catalog.replace(Catalog::new());
        let items = rt.say(USER, "1").await;
        assert!(items[0].contains("Margarita"));
        assert_eq!(rt.catalog.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_closed_hours_reply_without_progress() {
        let mut rt = TestRuntime::new();
        rt.clock.set(closed_time());

        let reply = rt.say(USER, "pedido").await;
        assert_eq!(reply, vec![BotContext::default().hours_message]);
        assert_eq!(rt.state(USER).unwrap().step, Step::Idle);

        // Chatter without the keyword stays silent even when closed
        assert!(rt.say(USER, "hola").await.is_empty());

        rt.clock.set(open_time());
        let reply = rt.say(USER, "pedido").await;
        assert_eq!(reply, vec![replies::greeting(&BotContext::default())]);
    }

    #[tokio::test]
    async fn test_conversations_are_isolated() {
        let mut rt = TestRuntime::new();
        let other = "593988777666@c.us";

        rt.script(USER, &["pedido", "Ana"]).await;
        rt.say(other, "pedido").await;

        assert_eq!(rt.state(USER).unwrap().step, Step::AwaitingCategory);
        assert_eq!(rt.state(other).unwrap().step, Step::AwaitingName);

        let menu = rt.say(other, "Luis").await;
        assert_eq!(menu[0], replies::fetching_menu("Luis"));
        assert_eq!(rt.state(USER).unwrap().name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn test_handle_dispatches_to_spawned_runtime() {
        let rt = TestRuntime::new();
        let ledger = rt.ledger.clone();
        let handle = RuntimeHandle::spawn(rt.runtime);

        let greeting = handle
            .dispatch(InboundMessage::text(USER, "pedido"))
            .await
            .unwrap();
        assert_eq!(greeting, vec![replies::greeting(&BotContext::default())]);

        for body in ["Ana", "1", "1", "1", "3"] {
            handle.dispatch(InboundMessage::text(USER, body)).await.unwrap();
        }
        handle.dispatch(InboundMessage::text(USER, "2")).await.unwrap();
        eventually(|| ledger.recorded().len() == 1).await;
    }

    #[tokio::test]
    async fn test_cart_overflow_reprompts_and_runtime_keeps_serving() {
        let mut catalog = Catalog::new();
        catalog.push("Pizzas", MenuItem::new("Banquete", Decimal::MAX, "Para todos"));
        let mut rt = TestRuntime::with_context(BotContext::default(), catalog);

        let reply = rt.script(USER, &["pedido", "Ana", "1", "1", "2"]).await;
        assert_eq!(reply, vec![replies::INVALID_QUANTITY.to_string()]);
        assert_eq!(rt.state(USER).unwrap().step, Step::AwaitingQuantity);
        assert!(rt.state(USER).unwrap().orders.is_empty());

        let added = rt.say(USER, "1").await;
        assert!(added[0].starts_with("Has añadido 1x Banquete"));

        // Adding on top of the maximum total is refused the same way
        let reply = rt.script(USER, &["1", "1", "1", "1"]).await;
        assert_eq!(reply, vec![replies::INVALID_QUANTITY.to_string()]);
        assert_eq!(rt.state(USER).unwrap().orders.len(), 1);

        let other = rt.say("593988777666@c.us", "pedido").await;
        assert_eq!(other, vec![replies::greeting(&BotContext::default())]);
    }

    /// Poll until `check` holds, failing after a second
    async fn eventually(check: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_confirmation_does_not_wait_for_ledger() {
        let mut rt = TestRuntime::new();
        rt.script(USER, ADD_MARGARITAS).await;
        rt.say(USER, "3").await;

        rt.ledger.hold();
        let done = rt
            .runtime
            .handle_message(InboundMessage::text(USER, "2"))
            .await;
        assert_eq!(
            done,
            vec![replies::pickup_confirmation(&BotContext::default(), "Ana")]
        );
        assert!(rt.ledger.recorded().is_empty());
        assert_eq!(rt.state(USER).unwrap().step, Step::Idle);

        rt.ledger.release();
        rt.runtime.settle().await;
        assert_eq!(rt.ledger.recorded().len(), 1);
    }

    #[tokio::test]
    async fn test_stalled_ledger_does_not_block_other_users() {
        let rt = TestRuntime::new();
        let ledger = rt.ledger.clone();
        let messenger = rt.messenger.clone();
        let handle = RuntimeHandle::spawn(rt.runtime);
        let other = "593988777666@c.us";

        ledger.hold();
        for body in ["pedido", "Ana", "1", "1", "2", "3", "1"] {
            handle.dispatch(InboundMessage::text(USER, body)).await.unwrap();
        }
        let done = tokio::time::timeout(
            Duration::from_secs(1),
            handle.dispatch(InboundMessage::text(USER, "Av. Amazonas 100")),
        )
        .await
        .expect("confirmation held back by the ledger")
        .unwrap();
        assert!(done[0].contains("Av. Amazonas 100"));

        let greeting = tokio::time::timeout(
            Duration::from_secs(1),
            handle.dispatch(InboundMessage::text(other, "pedido")),
        )
        .await
        .expect("other user held back by the ledger")
        .unwrap();
        assert_eq!(greeting, vec![replies::greeting(&BotContext::default())]);

        // The operator hears about the delivery while the ledger is stalled
        eventually(|| messenger.sent().len() == 1).await;
        assert!(ledger.recorded().is_empty());

        ledger.release();
        eventually(|| ledger.recorded().len() == 1).await;
    }
}
