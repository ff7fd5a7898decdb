//! Conversation state types

use crate::hours::OperatingHours;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Catalog
// ============================================================================

/// A product as listed in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub price: Decimal,
    pub description: String,
}

impl MenuItem {
    pub fn new(name: impl Into<String>, price: Decimal, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price,
            description: description.into(),
        }
    }
}

/// A named group of menu items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub items: Vec<MenuItem>,
}

/// Category listing in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    categories: Vec<Category>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item, creating its category on first sight
    pub fn push(&mut self, category: &str, item: MenuItem) {
        if let Some(existing) = self.categories.iter_mut().find(|c| c.name == category) {
            existing.items.push(item);
        } else {
            self.categories.push(Category {
                name: category.to_string(),
                items: vec![item],
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Category at a 0-based position
    pub fn category_at(&self, index: usize) -> Option<&Category> {
        self.categories.get(index)
    }

    /// Items of a category, by name
    pub fn items(&self, category: &str) -> Option<&[MenuItem]> {
        self.categories
            .iter()
            .find(|c| c.name == category)
            .map(|c| c.items.as_slice())
    }
}

impl FromIterator<(String, MenuItem)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (String, MenuItem)>>(iter: I) -> Self {
        let mut catalog = Catalog::new();
        for (category, item) in iter {
            catalog.push(&category, item);
        }
        catalog
    }
}

// ============================================================================
// Cart
// ============================================================================

/// A confirmed cart entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub category: String,
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(category: impl Into<String>, item: &MenuItem, quantity: u32) -> Self {
        Self {
            category: category.into(),
            name: item.name.clone(),
            price: item.price,
            description: item.description.clone(),
            quantity,
        }
    }

    /// Price times quantity; `None` when it does not fit in a `Decimal`
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }

    /// `"{quantity}x {name}"`, as written to the ledger
    pub fn label(&self) -> String {
        format!("{}x {}", self.quantity, self.name)
    }
}

// ============================================================================
// Conversation State
// ============================================================================

/// Dialogue stage. Serialized as its numeric tag, 0..=7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Step {
    /// Waiting for the trigger keyword
    #[default]
    Idle,
    AwaitingName,
    AwaitingCategory,
    AwaitingItem,
    AwaitingQuantity,
    /// Item added; browse more, promotions, checkout or cancel
    PostAdd,
    /// Delivery method, or cancel confirmation when the cart is empty
    Checkout,
    AwaitingAddress,
}

impl Step {
    pub const ALL: [Step; 8] = [
        Step::Idle,
        Step::AwaitingName,
        Step::AwaitingCategory,
        Step::AwaitingItem,
        Step::AwaitingQuantity,
        Step::PostAdd,
        Step::Checkout,
        Step::AwaitingAddress,
    ];

    pub fn tag(self) -> u8 {
        match self {
            Step::Idle => 0,
            Step::AwaitingName => 1,
            Step::AwaitingCategory => 2,
            Step::AwaitingItem => 3,
            Step::AwaitingQuantity => 4,
            Step::PostAdd => 5,
            Step::Checkout => 6,
            Step::AwaitingAddress => 7,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(usize::from(tag)).copied()
    }
}

#[derive(Debug, Error)]
#[error("unknown step tag {0}")]
pub struct UnknownStep(u8);

impl From<Step> for u8 {
    fn from(step: Step) -> u8 {
        step.tag()
    }
}

impl TryFrom<u8> for Step {
    type Error = UnknownStep;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Step::from_tag(tag).ok_or(UnknownStep(tag))
    }
}

/// The cart total would not fit in a `Decimal`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cart total overflow")]
pub struct CartOverflow;

/// What survives a reset besides the cart fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetPolicy {
    /// Keep the customer name and the menu snapshot for the next order
    #[default]
    KeepProfile,
    /// Forget everything except the user id
    ClearProfile,
}

/// Everything the bot remembers about one user between messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub user_id: String,
    pub step: Step,
    pub name: Option<String>,
    pub menu: Catalog,
    pub selected_category: Option<String>,
    pub selected_item: Option<MenuItem>,
    pub orders: Vec<OrderLine>,
    pub total: Decimal,
    pub address: Option<String>,
}

impl ConversationState {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            step: Step::Idle,
            name: None,
            menu: Catalog::new(),
            selected_category: None,
            selected_item: None,
            orders: Vec::new(),
            total: Decimal::ZERO,
            address: None,
        }
    }

    /// The only cart mutation; keeps `total` in lock-step with `orders`.
    /// On overflow the cart is left untouched.
    pub fn add_line(&mut self, line: OrderLine) -> Result<(), CartOverflow> {
        let total = line
            .line_total()
            .and_then(|line_total| self.total.checked_add(line_total))
            .ok_or(CartOverflow)?;
        self.total = total;
        self.orders.push(line);
        Ok(())
    }

    pub fn customer_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Back to idle after a completed or cancelled order
    pub fn reset(&mut self, policy: ResetPolicy) {
        self.step = Step::Idle;
        self.orders.clear();
        self.total = Decimal::ZERO;
        self.selected_category = None;
        self.selected_item = None;
        self.address = None;
        if policy == ResetPolicy::ClearProfile {
            self.name = None;
            self.menu = Catalog::new();
        }
    }
}

// ============================================================================
// Bot Context
// ============================================================================

/// Business parameters shared by every conversation (immutable configuration)
#[derive(Debug, Clone)]
pub struct BotContext {
    /// Lower-cased activation word matched as a substring at step 0
    pub trigger_keyword: String,
    pub business_name: String,
    /// Shown to the customer when choosing pickup; also the ledger address
    pub pickup_location: String,
    /// Recipient of delivery order summaries
    pub operator_id: String,
    pub promotions_category: String,
    pub delivery_eta: String,
    pub hours_message: String,
    pub hours: OperatingHours,
    pub reset_policy: ResetPolicy,
}

impl BotContext {
    pub const PICKUP_ADDRESS: &'static str = "Retiro en la pizzería";
}

impl Default for BotContext {
    fn default() -> Self {
        Self {
            trigger_keyword: "pedido".to_string(),
            business_name: "D'One Pizzería".to_string(),
            pickup_location:
                "Centro Comercial Don Daniel: https://maps.app.goo.gl/WRMp4JR2qef7pAp77".to_string(),
            operator_id: "593995972366@c.us".to_string(),
            promotions_category: "Promociones".to_string(),
            delivery_eta: "30 minutos".to_string(),
            hours_message: "Nuestro horario de atención es de lunes a sábado de 11 AM a 10 PM, y domingo de 1 PM a 10 PM.".to_string(),
            hours: OperatingHours::default(),
            reset_policy: ResetPolicy::default(),
        }
    }
}
