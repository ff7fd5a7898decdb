//! Pure state transition function
//!
//! Given the same state, context and event it always produces the same new
//! state and effects; all I/O happens in the runtime.

use super::event::Location;
use super::replies;
use super::state::{BotContext, ConversationState, OrderLine, Step};
use super::{Effect, Event};
use crate::ledger::LedgerRecord;
use thiserror::Error;

/// Typed as a word instead of a menu number, accepted where cancelling is offered
pub const CANCEL_WORD: &str = "cancelar";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConversationState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    /// Same state, one reply. Used for re-prompts and the closed-hours notice.
    fn stay(state: &ConversationState, text: impl Into<String>) -> Self {
        Self::new(state.clone()).with_effect(Effect::reply(text))
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Catalog arrived while conversation is at step {0:?}")]
    UnexpectedCatalog(Step),
}

/// Pure transition function
pub fn transition(
    state: &ConversationState,
    context: &BotContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        Event::Inbound {
            body,
            location,
            received_at,
        } => {
            // Outside a conversation, only the trigger keyword gets an answer
            if state.step == Step::Idle && !mentions_keyword(&body, &context.trigger_keyword) {
                return Ok(TransitionResult::new(state.clone()));
            }
            if !context.hours.is_open(received_at) {
                return Ok(TransitionResult::stay(state, &context.hours_message));
            }
            Ok(handle_message(state, context, &body, location))
        }

        Event::CatalogLoaded { catalog } => match state.step {
            Step::AwaitingName if state.name.is_some() => {
                let mut next = state.clone();
                next.step = Step::AwaitingCategory;
                let text = replies::category_menu(&catalog);
                next.menu = catalog;
                Ok(TransitionResult::new(next).with_effect(Effect::reply(text)))
            }
            step => Err(TransitionError::UnexpectedCatalog(step)),
        },
    }
}

fn mentions_keyword(body: &str, keyword: &str) -> bool {
    body.to_lowercase().contains(&keyword.to_lowercase())
}

fn is_cancel_word(input: &str) -> bool {
    input.eq_ignore_ascii_case(CANCEL_WORD)
}

/// 1-based menu choice → 0-based index
fn parse_choice(input: &str) -> Option<usize> {
    input.parse::<usize>().ok()?.checked_sub(1)
}

fn handle_message(
    state: &ConversationState,
    ctx: &BotContext,
    body: &str,
    location: Option<Location>,
) -> TransitionResult {
    let input = body.trim();
    match state.step {
        Step::Idle => {
            let mut next = state.clone();
            next.step = Step::AwaitingName;
            TransitionResult::new(next).with_effect(Effect::reply(replies::greeting(ctx)))
        }
        Step::AwaitingName => capture_name(state, input),
        Step::AwaitingCategory => choose_category(state, input),
        Step::AwaitingItem => choose_item(state, input),
        Step::AwaitingQuantity => choose_quantity(state, input),
        Step::PostAdd => post_add(state, ctx, input),
        Step::Checkout if state.orders.is_empty() => confirm_cancel(state, ctx, input),
        Step::Checkout => choose_delivery(state, ctx, input),
        Step::AwaitingAddress => capture_address(state, ctx, input, location),
    }
}

// ============================================================================
// Step handlers
// ============================================================================

/// Step 1: the name is kept; the catalog arrives as a follow-up event
fn capture_name(state: &ConversationState, input: &str) -> TransitionResult {
    if input.is_empty() {
        return TransitionResult::stay(state, replies::ASK_NAME_AGAIN);
    }
    let mut next = state.clone();
    next.name = Some(input.to_string());
    TransitionResult::new(next).with_effects([
        Effect::reply(replies::fetching_menu(input)),
        Effect::FetchCatalog,
    ])
}

fn show_categories(state: &ConversationState) -> TransitionResult {
    let mut next = state.clone();
    next.step = Step::AwaitingCategory;
    let text = replies::category_menu(&next.menu);
    TransitionResult::new(next).with_effect(Effect::reply(text))
}

/// Step 2
fn choose_category(state: &ConversationState, input: &str) -> TransitionResult {
    let Some(category) = parse_choice(input).and_then(|i| state.menu.category_at(i)) else {
        return TransitionResult::stay(state, replies::INVALID_CATEGORY);
    };
    let text = replies::item_menu(&category.name, &category.items);
    let mut next = state.clone();
    next.selected_category = Some(category.name.clone());
    next.step = Step::AwaitingItem;
    TransitionResult::new(next).with_effect(Effect::reply(text))
}

/// Step 3
fn choose_item(state: &ConversationState, input: &str) -> TransitionResult {
    if input == "0" {
        return show_categories(state);
    }
    let category = state.selected_category.as_deref().unwrap_or_default();
    let item = state
        .menu
        .items(category)
        .zip(parse_choice(input))
        .and_then(|(items, i)| items.get(i));
    let Some(item) = item else {
        return TransitionResult::stay(state, replies::INVALID_ITEM);
    };
    let text = replies::item_detail(category, item);
    let mut next = state.clone();
    next.selected_item = Some(item.clone());
    next.step = Step::AwaitingQuantity;
    TransitionResult::new(next).with_effect(Effect::reply(text))
}

/// Step 4
fn choose_quantity(state: &ConversationState, input: &str) -> TransitionResult {
    let quantity = input.parse::<u32>().ok().filter(|q| *q > 0);
    let (Some(quantity), Some(item)) = (quantity, state.selected_item.as_ref()) else {
        return TransitionResult::stay(state, replies::INVALID_QUANTITY);
    };
    let category = state.selected_category.clone().unwrap_or_default();
    let mut next = state.clone();
    if next.add_line(OrderLine::new(category, item, quantity)).is_err() {
        return TransitionResult::stay(state, replies::INVALID_QUANTITY);
    }
    let text = replies::item_added(quantity, item);
    next.step = Step::PostAdd;
    TransitionResult::new(next).with_effect(Effect::reply(text))
}

/// Step 5
fn post_add(state: &ConversationState, ctx: &BotContext, input: &str) -> TransitionResult {
    if input == "4" || is_cancel_word(input) {
        return cancel(state, ctx);
    }
    match input {
        "1" => show_categories(state),
        "2" => show_promotions(state, ctx),
        "3" => checkout(state),
        _ => TransitionResult::stay(state, replies::INVALID_OPTION),
    }
}

fn show_promotions(state: &ConversationState, ctx: &BotContext) -> TransitionResult {
    let items = state
        .menu
        .items(&ctx.promotions_category)
        .filter(|items| !items.is_empty());
    let Some(items) = items else {
        return TransitionResult::stay(state, replies::NO_PROMOTIONS);
    };
    let text = replies::promotions_menu(items);
    let mut next = state.clone();
    next.selected_category = Some(ctx.promotions_category.clone());
    next.step = Step::AwaitingItem;
    TransitionResult::new(next).with_effect(Effect::reply(text))
}

fn checkout(state: &ConversationState) -> TransitionResult {
    let mut next = state.clone();
    next.step = Step::Checkout;
    let text = if state.orders.is_empty() {
        replies::EMPTY_CART.to_string()
    } else {
        replies::order_summary(state)
    };
    TransitionResult::new(next).with_effect(Effect::reply(text))
}

/// Step 6 with an empty cart
fn confirm_cancel(state: &ConversationState, ctx: &BotContext, input: &str) -> TransitionResult {
    match input {
        "1" => cancel(state, ctx),
        "2" => show_categories(state),
        _ if is_cancel_word(input) => cancel(state, ctx),
        _ => TransitionResult::stay(state, replies::INVALID_OPTION),
    }
}

/// Step 6 with items in the cart
fn choose_delivery(state: &ConversationState, ctx: &BotContext, input: &str) -> TransitionResult {
    if input == "3" || is_cancel_word(input) {
        return cancel(state, ctx);
    }
    match input {
        "1" => {
            let mut next = state.clone();
            next.step = Step::AwaitingAddress;
            TransitionResult::new(next).with_effect(Effect::reply(replies::ASK_ADDRESS))
        }
        "2" => {
            let mut completed = state.clone();
            completed.address = Some(BotContext::PICKUP_ADDRESS.to_string());
            let reply = replies::pickup_confirmation(ctx, completed.customer_name());
            finish(completed, ctx, vec![Effect::reply(reply)])
        }
        _ => TransitionResult::stay(state, replies::INVALID_OPTION),
    }
}

/// Step 7
fn capture_address(
    state: &ConversationState,
    ctx: &BotContext,
    input: &str,
    location: Option<Location>,
) -> TransitionResult {
    let mut completed = state.clone();
    let reply = if let Some(location) = location {
        completed.address = Some(location.map_link());
        replies::delivery_confirmation(ctx, completed.customer_name(), None)
    } else if input.is_empty() {
        return TransitionResult::stay(state, replies::ASK_ADDRESS);
    } else {
        completed.address = Some(input.to_string());
        replies::delivery_confirmation(ctx, completed.customer_name(), Some(input))
    };
    let notify = Effect::notify_operator(&ctx.operator_id, replies::operator_summary(&completed));
    finish(completed, ctx, vec![Effect::reply(reply), notify])
}

/// Record the order and reset. `completed` carries the final address.
fn finish(completed: ConversationState, ctx: &BotContext, effects: Vec<Effect>) -> TransitionResult {
    let records = LedgerRecord::for_order(&completed);
    let mut next = completed;
    next.reset(ctx.reset_policy);
    TransitionResult::new(next)
        .with_effects(effects)
        .with_effect(Effect::RecordOrder { records })
}

fn cancel(state: &ConversationState, ctx: &BotContext) -> TransitionResult {
    let mut next = state.clone();
    next.reset(ctx.reset_policy);
    TransitionResult::new(next).with_effect(Effect::reply(replies::cancelled(ctx)))
}
