//! # Product Commands
//!
//! The stock screen (list, save, delete, clear) and the point-of-sale
//! search.

use serde::Serialize;
use tracing::debug;

use comptoir_core::format::format_currency;
use comptoir_core::validation::require_confirmation;
use comptoir_core::{Money, Product};
use comptoir_sync::ClearStockOutcome;

use crate::error::ApiResult;
use crate::state::AppState;

/// A stock screen row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRow {
    #[serde(flatten)]
    pub product: Product,
    pub margin_percent: f64,
    pub stock_value: Money,
    pub sale_price_display: String,
    pub low_stock: bool,
}

/// Every product, sorted by name.
pub fn list_products(state: &AppState) -> ApiResult<Vec<ProductRow>> {
    let model = state.session.read_model()?;
    let threshold = state.config.reports.low_stock_threshold;

    Ok(model
        .products()
        .iter()
        .map(|product| ProductRow {
            margin_percent: product.margin_percent(),
            stock_value: product.stock_value(),
            sale_price_display: format_currency(product.sale_price),
            low_stock: product.stock <= threshold,
            product: product.clone(),
        })
        .collect())
}

/// Products in stock matching `term` on name or reference.
pub fn search_products(state: &AppState, term: &str) -> ApiResult<Vec<Product>> {
    debug!(term, "search_products command");
    Ok(state.session.read_model()?.search_products(term))
}

/// Creates or updates a product.
pub async fn save_product(state: &AppState, product: Product) -> ApiResult<Product> {
    let session = state.session.session();
    Ok(state.catalog.save_product(session.as_ref(), product).await?)
}

pub async fn delete_product(state: &AppState, id: &str, confirmed: bool) -> ApiResult<()> {
    require_confirmation(confirmed, "Delete product")?;
    let session = state.session.session();
    Ok(state.catalog.delete_product(session.as_ref(), id).await?)
}

/// Deletes the selected products together.
pub async fn delete_products(state: &AppState, ids: &[String], confirmed: bool) -> ApiResult<u64> {
    require_confirmation(confirmed, "Delete selected products")?;
    let session = state.session.session();
    Ok(state.catalog.delete_products(session.as_ref(), ids).await?)
}

/// Deletes every product.
pub async fn clear_stock(state: &AppState, confirmed: bool) -> ApiResult<ClearStockOutcome> {
    require_confirmation(confirmed, "Clear stock")?;
    let session = state.session.session();
    Ok(state.catalog.clear_stock(session.as_ref()).await?)
}
