//! Customer-facing and operator-facing message text

use super::state::{BotContext, Catalog, ConversationState, MenuItem};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt::Write;

pub const INVALID_CATEGORY: &str = "Por favor, selecciona una categoría válida.";
pub const INVALID_ITEM: &str = "Por favor, selecciona un producto válido.";
pub const INVALID_QUANTITY: &str = "Por favor, ingresa una cantidad válida.";
pub const INVALID_OPTION: &str = "Por favor, selecciona una opción válida.";
pub const NO_CATEGORIES: &str = "Lo siento, no hay categorías disponibles en este momento.";
pub const NO_PROMOTIONS: &str = "Lo siento, no hay promociones disponibles en este momento.";
pub const ASK_NAME_AGAIN: &str = "Por favor, escribe tu nombre para continuar.";
pub const ASK_ADDRESS: &str =
    "Por favor, proporciona la dirección de entrega o envía tu ubicación.";
pub const EMPTY_CART: &str = "No tienes ningún producto en tu pedido. ¿Deseas cancelar el pedido?\n1. Sí\n2. No, seguir agregando productos";

const BACK_TO_MENU: &str = "\n0. Volver al menú principal";

/// `8.50`; half-cents round away from zero
pub fn amount(value: Decimal) -> String {
    format!(
        "{:.2}",
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// `$8.50`
pub fn money(value: Decimal) -> String {
    format!("${}", amount(value))
}

pub fn greeting(ctx: &BotContext) -> String {
    format!("Hola. Bienvenido a {}. ¿Cuál es tu nombre?", ctx.business_name)
}

pub fn fetching_menu(name: &str) -> String {
    format!("¡Hola {name}! Déjame consultarle el menú...")
}

/// Numbered category list, or the no-categories notice for an empty catalog
pub fn category_menu(catalog: &Catalog) -> String {
    if catalog.is_empty() {
        return NO_CATEGORIES.to_string();
    }
    let mut text = String::from("Elige una categoría del menú:\n");
    for (index, category) in catalog.categories().iter().enumerate() {
        let _ = writeln!(text, "{}. {}", index + 1, category.name);
    }
    text
}

fn numbered_items(mut text: String, items: &[MenuItem]) -> String {
    for (index, item) in items.iter().enumerate() {
        let _ = writeln!(text, "{}. {} - {}", index + 1, item.name, money(item.price));
    }
    text.push_str(BACK_TO_MENU);
    text
}

pub fn item_menu(category: &str, items: &[MenuItem]) -> String {
    numbered_items(
        format!("Has seleccionado {category}. Aquí están los productos disponibles:\n"),
        items,
    )
}

pub fn promotions_menu(items: &[MenuItem]) -> String {
    numbered_items(String::from("Aquí están nuestras promociones:\n"), items)
}

pub fn item_detail(category: &str, item: &MenuItem) -> String {
    format!(
        "Has seleccionado {category}: {}.\nDescripción: {}\nPrecio: {}\n\n¿Cuántos deseas ordenar?",
        item.name,
        item.description,
        money(item.price)
    )
}

pub fn item_added(quantity: u32, item: &MenuItem) -> String {
    format!(
        "Has añadido {quantity}x {} a tu pedido. ¿Deseas agregar algo más, ver promociones o finalizar el pedido?\n1. Agregar más productos\n2. Ver promociones\n3. Finalizar pedido\n4. Cancelar pedido",
        item.name
    )
}

pub fn cancelled(ctx: &BotContext) -> String {
    format!(
        "Tu pedido ha sido cancelado. Gracias por visitar {}.",
        ctx.business_name
    )
}

/// Cart summary followed by the delivery options
pub fn order_summary(state: &ConversationState) -> String {
    let mut text = String::from("Resumen de tu pedido:\n");
    for (index, line) in state.orders.iter().enumerate() {
        let _ = writeln!(
            text,
            "{}. {}x {} - {} cada uno",
            index + 1,
            line.quantity,
            line.name,
            money(line.price)
        );
    }
    let _ = write!(
        text,
        "\nTotal a pagar: {}\n\n¿Cómo deseas recibir tu pedido?\n1. A domicilio\n2. Recoger en la pizzería\n3. Cancelar pedido",
        money(state.total)
    );
    text
}

pub fn pickup_confirmation(ctx: &BotContext, name: &str) -> String {
    format!(
        "Gracias {name}. Tu pedido será listo para recoger en nuestra ubicación: {}",
        ctx.pickup_location
    )
}

/// Closing message for a delivery order. Shared locations are not echoed back.
pub fn delivery_confirmation(ctx: &BotContext, name: &str, address: Option<&str>) -> String {
    match address {
        Some(address) => format!(
            "Gracias {name}. Tu pedido será entregado en la dirección {address}. Estará listo en aproximadamente {}. ¡Que tengas un buen día!",
            ctx.delivery_eta
        ),
        None => format!(
            "Gracias {name}. Tu pedido será entregado en la dirección proporcionada. Estará listo en aproximadamente {}. ¡Que tengas un buen día!",
            ctx.delivery_eta
        ),
    }
}

/// Summary sent to the operator for a delivery order
pub fn operator_summary(state: &ConversationState) -> String {
    let mut text = format!(
        "Nombre: {}\nTeléfono: {}\nProductos:\n",
        state.customer_name(),
        state.user_id
    );
    for line in &state.orders {
        let _ = writeln!(
            text,
            "{}x {} - {} cada uno",
            line.quantity,
            line.name,
            money(line.price)
        );
    }
    let _ = write!(
        text,
        "\nTotal a pagar: {}\nDirección: {}",
        money(state.total),
        state.address.as_deref().unwrap_or_default()
    );
    text
}
