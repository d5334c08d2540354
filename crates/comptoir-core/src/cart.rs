//! # Cart
//!
//! The sale builder: products picked at the point of sale, each with a
//! quantity bounded by the stock known when the user acts.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Phases                                          │
//! │                                                                         │
//! │            add()                    begin_issue()                       │
//! │   Empty ──────────► Building ──────────────────────► Issuing            │
//! │     ▲                 │  ▲                             │     │          │
//! │     │   clear() /     │  │ add / set_quantity          │     │          │
//! │     │   last line     │  └─────────────┘               │     │          │
//! │     │   removed       │                  failure ◄─────┘     │          │
//! │     └─────────────────┘                  (back to Building)  │          │
//! │     ▲                                                        │          │
//! │     └──────────────────── success (cart cleared) ◄───────────┘          │
//! │                                                                         │
//! │  While Issuing, add/set_quantity/clear are ignored.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by `product_id`, in insertion order
//! - Every line has `1 <= quantity <= stock` as known at the last edit
//! - Totals are recomputed on every query, never cached

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, TaxRate};
use crate::types::{DocumentItem, Product};

/// A product in the cart with its quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub reference: String,
    pub name: String,
    /// Sale price when the line was created.
    pub unit_price: Money,
    pub quantity: i64,
    /// Stock known for the product at the last edit of this line.
    pub stock: i64,
}

impl CartLine {
    fn from_product(product: &Product) -> Self {
        CartLine {
            product_id: product.id.clone(),
            reference: product.reference.clone(),
            name: product.name.clone(),
            unit_price: product.sale_price,
            quantity: 1,
            stock: product.stock,
        }
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }

    /// Freezes the line into a document item.
    pub fn to_item(&self) -> DocumentItem {
        DocumentItem {
            product_id: self.product_id.clone(),
            reference: self.reference.clone(),
            name: self.name.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

/// Where the cart is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CartPhase {
    Empty,
    Building,
    Issuing,
}

/// Running totals of the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub line_count: usize,
    pub unit_count: i64,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

/// The cart itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    lines: Vec<CartLine>,
    #[serde(skip)]
    issuing: bool,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn phase(&self) -> CartPhase {
        if self.issuing {
            CartPhase::Issuing
        } else if self.lines.is_empty() {
            CartPhase::Empty
        } else {
            CartPhase::Building
        }
    }

    /// Quantity of a product in the cart (0 when absent).
    pub fn quantity_of(&self, product_id: &str) -> i64 {
        self.lines
            .iter()
            .find(|line| line.product_id == product_id)
            .map_or(0, |line| line.quantity)
    }

    /// Adds one unit of a product.
    ///
    /// ## Behavior
    /// - Already in cart, below stock: quantity + 1
    /// - Already in cart, at stock: silent no-op
    /// - Not in cart, stock > 0: new line with quantity 1
    /// - Not in cart, no stock: silent no-op
    pub fn add(&mut self, product: &Product) {
        if self.issuing {
            return;
        }

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product.id)
        {
            line.stock = product.stock;
            if line.quantity < product.stock {
                line.quantity += 1;
            }
            return;
        }

        if product.stock > 0 {
            self.lines.push(CartLine::from_product(product));
        }
    }

    /// Sets the quantity of a line, bounded by the product's known stock.
    ///
    /// ## Behavior
    /// - Product unknown in `products`: no-op
    /// - `value <= 0`: removes the line
    /// - `value > stock`: clamps to stock (removes the line if stock <= 0)
    /// - otherwise: sets exactly
    /// - Product not in cart: no-op
    pub fn set_quantity(&mut self, products: &[Product], product_id: &str, value: i64) {
        if self.issuing {
            return;
        }

        let Some(product) = products.iter().find(|p| p.id == product_id) else {
            return;
        };

        let quantity = value.min(product.stock);
        if quantity <= 0 {
            self.remove(product_id);
            return;
        }

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
        {
            line.quantity = quantity;
            line.stock = product.stock;
        }
    }

    /// Removes a line; unknown ids are ignored.
    pub fn remove(&mut self, product_id: &str) {
        if self.issuing {
            return;
        }
        self.lines.retain(|line| line.product_id != product_id);
    }

    /// Empties the cart. Callers confirm with the user first.
    pub fn clear(&mut self) {
        if self.issuing {
            return;
        }
        self.lines.clear();
    }

    /// Subtotal, tax and total at the given rate.
    ///
    /// `total == subtotal + tax` exactly; `tax` is the subtotal times the
    /// rate rounded to the centime.
    pub fn totals(&self, rate: TaxRate) -> CartTotals {
        let subtotal: Money = self.lines.iter().map(CartLine::line_total).sum();
        let tax = subtotal.calculate_tax(rate);
        CartTotals {
            line_count: self.lines.len(),
            unit_count: self.lines.iter().map(|line| line.quantity).sum(),
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }

    /// Document items for the current lines, in cart order.
    pub fn to_items(&self) -> Vec<DocumentItem> {
        self.lines.iter().map(CartLine::to_item).collect()
    }

    // =========================================================================
    // Issuing
    // =========================================================================

    /// Enters the Issuing phase and returns the lines to issue.
    ///
    /// ## Errors
    /// - `ValidationError::EmptyCart` when there is nothing to issue
    /// - `CoreError::IssueInProgress` when an issuance is already running
    pub fn begin_issue(&mut self) -> CoreResult<Vec<CartLine>> {
        if self.issuing {
            return Err(CoreError::IssueInProgress);
        }
        if self.lines.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }
        self.issuing = true;
        Ok(self.lines.clone())
    }

    /// Leaves the Issuing phase; the cart is emptied only on success.
    pub fn finish_issue(&mut self, success: bool) {
        self.issuing = false;
        if success {
            self.lines.clear();
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            reference: format!("REF-{}", id),
            name: format!("Produit {}", id),
            description: String::new(),
            purchase_price: Money::from_centimes(price / 2),
            sale_price: Money::from_centimes(price),
            stock,
        }
    }

    #[test]
    fn test_add_increments_up_to_stock() {
        let a = product("a", 1_000, 2);
        let mut cart = Cart::new();

        cart.add(&a);
        cart.add(&a);
        cart.add(&a);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.quantity_of("a"), 2);
    }

    #[test]
    fn test_add_out_of_stock_product_is_ignored() {
        let mut cart = Cart::new();
        cart.add(&product("a", 1_000, 0));
        assert!(cart.is_empty());
        assert_eq!(cart.phase(), CartPhase::Empty);
    }

    #[test]
    fn test_set_quantity_rules() {
        let products = vec![product("a", 1_000, 5), product("b", 500, 1)];
        let mut cart = Cart::new();
        cart.add(&products[0]);
        cart.add(&products[1]);

        cart.set_quantity(&products, "a", 3);
        assert_eq!(cart.quantity_of("a"), 3);

        cart.set_quantity(&products, "a", 50);
        assert_eq!(cart.quantity_of("a"), 5);

        cart.set_quantity(&products, "b", 0);
        assert_eq!(cart.quantity_of("b"), 0);
        assert_eq!(cart.lines().len(), 1);

        cart.set_quantity(&products, "a", -4);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_unknown_ids_are_noops() {
        let products = vec![product("a", 1_000, 5)];
        let mut cart = Cart::new();
        cart.add(&products[0]);

        cart.set_quantity(&products, "ghost", 2);
        cart.set_quantity(&[], "a", 0);
        cart.remove("ghost");

        assert_eq!(cart.quantity_of("a"), 1);
    }

    #[test]
    fn test_set_quantity_does_not_insert() {
        let products = vec![product("a", 1_000, 5)];
        let mut cart = Cart::new();
        cart.set_quantity(&products, "a", 2);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_totals() {
        let products = vec![product("a", 1_099, 10), product("b", 250, 10)];
        let mut cart = Cart::new();
        cart.add(&products[0]);
        cart.add(&products[1]);
        cart.set_quantity(&products, "b", 4);

        let totals = cart.totals(TaxRate::from_bps(2000));
        assert_eq!(totals.line_count, 2);
        assert_eq!(totals.unit_count, 5);
        assert_eq!(totals.subtotal.centimes(), 2_099);
        // 20,99 × 20% = 4,198 → 4,20
        assert_eq!(totals.tax.centimes(), 420);
        assert_eq!(totals.total, totals.subtotal + totals.tax);
    }

    #[test]
    fn test_empty_totals_are_zero() {
        let totals = Cart::new().totals(TaxRate::from_bps(2000));
        assert!(totals.subtotal.is_zero());
        assert!(totals.total.is_zero());
    }

    #[test]
    fn test_issue_phases() {
        let a = product("a", 1_000, 5);
        let mut cart = Cart::new();

        assert!(matches!(
            cart.begin_issue(),
            Err(CoreError::Validation(ValidationError::EmptyCart))
        ));

        cart.add(&a);
        assert_eq!(cart.phase(), CartPhase::Building);

        let lines = cart.begin_issue().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(cart.phase(), CartPhase::Issuing);
        assert!(matches!(cart.begin_issue(), Err(CoreError::IssueInProgress)));

        // edits are ignored while issuing
        cart.add(&a);
        cart.clear();
        assert_eq!(cart.quantity_of("a"), 1);

        cart.finish_issue(false);
        assert_eq!(cart.phase(), CartPhase::Building);

        cart.begin_issue().unwrap();
        cart.finish_issue(true);
        assert_eq!(cart.phase(), CartPhase::Empty);
    }

    #[test]
    fn test_to_items_freezes_lines() {
        let mut a = product("a", 1_000, 5);
        let mut cart = Cart::new();
        cart.add(&a);

        a.sale_price = Money::from_centimes(9_999);
        cart.add(&a);

        let items = cart.to_items();
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].unit_price.centimes(), 1_000);
    }
}
