//! Runtime for executing conversations
//!
//! A single task owns all conversation state; the HTTP layer talks to it
//! through a [`RuntimeHandle`].

mod executor;
mod store;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::BotRuntime;
pub use store::InMemoryStore;
pub use traits::*;

use crate::state_machine::Location;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Type alias for production runtime with adapters chosen at startup
pub type ProductionRuntime = BotRuntime<
    InMemoryStore,
    Arc<dyn CatalogProvider>,
    Arc<dyn OrderLedger>,
    Arc<dyn Messenger>,
>;

/// A message as received from the messaging gateway
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub from: String,
    pub body: String,
    pub location: Option<Location>,
}

#[cfg(test)]
impl InboundMessage {
    pub fn text(from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            body: body.into(),
            location: None,
        }
    }
}

/// Inbound message paired with the channel its replies go back on
#[derive(Debug)]
pub struct InboundRequest {
    pub message: InboundMessage,
    pub reply_tx: oneshot::Sender<Vec<String>>,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Bot runtime is not running")]
    Stopped,
}

/// Cloneable handle to the runtime task
#[derive(Clone)]
pub struct RuntimeHandle {
    request_tx: mpsc::Sender<InboundRequest>,
}

impl RuntimeHandle {
    /// Start the runtime on its own task
    pub fn spawn<S, C, L, M>(runtime: BotRuntime<S, C, L, M>) -> Self
    where
        S: ConversationStore + 'static,
        C: CatalogProvider + 'static,
        L: OrderLedger + 'static,
        M: Messenger + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel(256);
        tokio::spawn(runtime.run(request_rx));
        Self { request_tx }
    }

    /// Hand a message to the runtime and wait for its replies
    pub async fn dispatch(&self, message: InboundMessage) -> Result<Vec<String>, RuntimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request_tx
            .send(InboundRequest { message, reply_tx })
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        reply_rx.await.map_err(|_| RuntimeError::Stopped)
    }
}
