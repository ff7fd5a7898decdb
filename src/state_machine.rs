//! Per-user conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! `transition(state, context, event)` returns the next state and the
//! effects the runtime must perform.

mod effect;
pub mod event;
pub mod replies;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::{Event, Location};
pub use state::{
    BotContext, Catalog, Category, ConversationState, MenuItem, OrderLine, ResetPolicy, Step,
};
pub use transition::{transition, TransitionError, TransitionResult};
