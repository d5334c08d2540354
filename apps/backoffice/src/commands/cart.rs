//! # Cart Commands
//!
//! Point-of-sale cart manipulation. Products are looked up in the read
//! model; a product id it does not know leaves the cart unchanged.

use serde::Serialize;
use tracing::debug;

use comptoir_core::validation::require_confirmation;
use comptoir_core::{Cart, CartLine, CartPhase, CartTotals, TaxRate};

use crate::error::ApiResult;
use crate::state::AppState;

/// Cart response including lines and totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub totals: CartTotals,
    pub phase: CartPhase,
    /// Tax rate the totals were computed at, in basis points.
    pub tax_rate_bps: u32,
}

impl CartView {
    fn new(cart: &Cart, rate: TaxRate) -> Self {
        CartView {
            lines: cart.lines().to_vec(),
            totals: cart.totals(rate),
            phase: cart.phase(),
            tax_rate_bps: rate.bps(),
        }
    }
}

/// Current tax rate: the owner's settings, or the default before sign-in.
pub(crate) fn current_rate(state: &AppState) -> TaxRate {
    state
        .session
        .read_model()
        .map(|model| model.settings())
        .unwrap_or_default()
        .tax_rate()
}

pub fn get_cart(state: &AppState) -> CartView {
    let rate = current_rate(state);
    state.cart.with_cart(|cart| CartView::new(cart, rate))
}

/// Adds one unit of a product, up to its known stock.
pub fn add_to_cart(state: &AppState, product_id: &str) -> ApiResult<CartView> {
    debug!(product_id, "add_to_cart command");
    let model = state.session.read_model()?;
    let rate = model.settings().tax_rate();

    Ok(state.cart.with_cart_mut(|cart| {
        if let Some(product) = model.product(product_id) {
            cart.add(&product);
        }
        CartView::new(cart, rate)
    }))
}

/// Sets a line's quantity: `<= 0` removes it, above stock clamps.
pub fn update_cart_item(state: &AppState, product_id: &str, quantity: i64) -> ApiResult<CartView> {
    debug!(product_id, quantity, "update_cart_item command");
    let model = state.session.read_model()?;
    let rate = model.settings().tax_rate();
    let products = model.products();

    Ok(state.cart.with_cart_mut(|cart| {
        cart.set_quantity(&products, product_id, quantity);
        CartView::new(cart, rate)
    }))
}

pub fn remove_from_cart(state: &AppState, product_id: &str) -> CartView {
    debug!(product_id, "remove_from_cart command");
    let rate = current_rate(state);
    state.cart.with_cart_mut(|cart| {
        cart.remove(product_id);
        CartView::new(cart, rate)
    })
}

/// Empties the cart. Requires `confirmed`.
pub fn clear_cart(state: &AppState, confirmed: bool) -> ApiResult<CartView> {
    require_confirmation(confirmed, "Clear cart")?;
    let rate = current_rate(state);
    Ok(state.cart.with_cart_mut(|cart| {
        cart.clear();
        CartView::new(cart, rate)
    }))
}
