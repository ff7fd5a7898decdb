//! Bot runtime executor

use super::traits::{CatalogProvider, ConversationStore, Messenger, OrderLedger};
use super::{InboundMessage, InboundRequest};

use crate::hours::{Clock, SystemClock};
use crate::ledger::record_all;
use crate::state_machine::{transition, BotContext, Effect, Event};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// How often idle conversations are swept from the store
const EVICTION_INTERVAL: Duration = Duration::from_secs(300);

/// Owns every conversation and performs the I/O the state machine asks for.
///
/// Messages are handled one at a time, so a user's state is never read and
/// written concurrently. Operator notifications and ledger writes run on
/// background tasks so a slow sink never holds back anyone's replies.
pub struct BotRuntime<S, C, L, M>
where
    S: ConversationStore,
    C: CatalogProvider,
    L: OrderLedger + 'static,
    M: Messenger + 'static,
{
    context: BotContext,
    store: S,
    catalog: C,
    ledger: Arc<L>,
    messenger: Arc<M>,
    clock: Arc<dyn Clock>,
    /// Side effects of finalized orders still in flight
    pending: JoinSet<()>,
}

impl<S, C, L, M> BotRuntime<S, C, L, M>
where
    S: ConversationStore,
    C: CatalogProvider,
    L: OrderLedger + 'static,
    M: Messenger + 'static,
{
    pub fn new(context: BotContext, store: S, catalog: C, ledger: L, messenger: M) -> Self {
        Self {
            context,
            store,
            catalog,
            ledger: Arc::new(ledger),
            messenger: Arc::new(messenger),
            clock: Arc::new(SystemClock),
            pending: JoinSet::new(),
        }
    }

    /// Replace the wall clock (tests pin the time of day)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Wait for every background side effect to finish
    #[cfg(test)]
    pub async fn settle(&mut self) {
        while self.pending.join_next().await.is_some() {}
    }

    pub async fn run(mut self, mut request_rx: mpsc::Receiver<InboundRequest>) {
        tracing::info!(business = %self.context.business_name, "Starting bot runtime");

        let mut sweep = tokio::time::interval(EVICTION_INTERVAL);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // Process requests in a loop until every handle is dropped
        loop {
            tokio::select! {
                request = request_rx.recv() => {
                    let Some(request) = request else { break };
                    let replies = self.handle_message(request.message).await;
                    if request.reply_tx.send(replies).is_err() {
                        tracing::debug!("Caller went away before the reply was ready");
                    }
                }
                Some(joined) = self.pending.join_next(), if !self.pending.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Order side effects task failed");
                    }
                }
                _ = sweep.tick() => {
                    let evicted = self.store.evict_idle(self.clock.now());
                    if evicted > 0 {
                        tracing::info!(evicted, remaining = self.store.len(), "Evicted idle conversations");
                    }
                }
            }
        }

        if !self.pending.is_empty() {
            tracing::info!(in_flight = self.pending.len(), "Waiting for order side effects");
            while let Some(joined) = self.pending.join_next().await {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Order side effects task failed");
                }
            }
        }

        tracing::info!("Bot runtime stopped");
    }

    /// Run one inbound message through the state machine and return the
    /// replies for the sender, in order.
    ///
    /// Catalog fetches are awaited because they feed the next transition;
    /// notifications and ledger writes are handed to a background task.
    pub async fn handle_message(&mut self, message: InboundMessage) -> Vec<String> {
        let now = self.clock.now();
        let mut state = self.store.get_or_create(&message.from, now);
        let mut replies = Vec::new();
        let mut deferred = Vec::new();

        // Effects may feed events back (catalog fetch), so loop instead of recursing
        let mut events_to_process = vec![Event::Inbound {
            body: message.body,
            location: message.location,
            received_at: now,
        }];

        while let Some(event) = events_to_process.pop() {
            let result = match transition(&state, &self.context, event) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(user_id = %message.from, error = %e, "Transition rejected, state unchanged");
                    break;
                }
            };

            if result.new_state.step != state.step {
                tracing::debug!(
                    user_id = %message.from,
                    from = ?state.step,
                    to = ?result.new_state.step,
                    "Step changed"
                );
            }
            state = result.new_state;

            for effect in result.effects {
                match effect {
                    Effect::Reply { text } => replies.push(text),
                    Effect::FetchCatalog => {
                        let catalog = self.catalog.fetch().await;
                        tracing::info!(user_id = %message.from, categories = catalog.len(), "Catalog loaded");
                        events_to_process.push(Event::CatalogLoaded { catalog });
                    }
                    other => deferred.push(other),
                }
            }
        }

        self.store.save(state, now);

        if !deferred.is_empty() {
            self.pending.spawn(execute_deferred(
                self.ledger.clone(),
                self.messenger.clone(),
                message.from,
                deferred,
            ));
        }
        replies
    }
}

/// Notifications and ledger writes of one message, in emission order
async fn execute_deferred<L, M>(
    ledger: Arc<L>,
    messenger: Arc<M>,
    user_id: String,
    effects: Vec<Effect>,
) where
    L: OrderLedger,
    M: Messenger,
{
    for effect in effects {
        match effect {
            Effect::NotifyOperator { to, text } => {
                if let Err(e) = messenger.send(&to, &text).await {
                    tracing::error!(user_id = %user_id, operator = %to, error = %e, "Failed to notify operator");
                }
            }

            Effect::RecordOrder { records } => {
                let report = record_all(ledger.as_ref(), &records).await;
                if report.is_complete() {
                    tracing::info!(user_id = %user_id, lines = report.written, "Order recorded");
                } else {
                    let failed: Vec<String> = report
                        .failures
                        .iter()
                        .map(|f| format!("{}: {}", f.label, f.error))
                        .collect();
                    tracing::error!(
                        user_id = %user_id,
                        written = report.written,
                        failed = ?failed,
                        "Order only partially recorded"
                    );
                }
            }

            Effect::Reply { .. } | Effect::FetchCatalog => {}
        }
    }
}
