//! # Report Commands
//!
//! Both reports are derived from the read model on every call; nothing is
//! cached between calls.

use comptoir_core::metrics::{DashboardSummary, RevenueReport};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn dashboard(state: &AppState) -> ApiResult<DashboardSummary> {
    let model = state.session.read_model()?;
    Ok(model.dashboard(state.config.metrics_options()))
}

/// Revenue report over `year`, or over every document when `None`.
pub fn revenue_report(state: &AppState, year: Option<i32>) -> ApiResult<RevenueReport> {
    let model = state.session.read_model()?;
    Ok(model.revenue_report(year, state.config.metrics_options()))
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Utc};

    use super::*;
    use crate::commands::cart::add_to_cart;
    use crate::commands::customers::default_customer;
    use crate::commands::documents::issue_document;
    use crate::commands::products::save_product;
    use crate::commands::test_support::{signed_in_state, wait_until};
    use comptoir_core::{DocumentType, Money, Product};

    #[tokio::test]
    async fn test_reports_follow_issued_documents() {
        let state = signed_in_state().await;
        let product = save_product(
            &state,
            Product {
                id: String::new(),
                reference: String::new(),
                name: "Interrupteur".to_string(),
                description: String::new(),
                purchase_price: Money::from_centimes(600),
                sale_price: Money::from_centimes(1_000),
                stock: 10,
            },
        )
        .await
        .unwrap();
        let id = product.id.clone();
        wait_until(&state, |model| model.product(&id).is_some()).await;
        let walk_in = default_customer(&state).unwrap().unwrap();

        add_to_cart(&state, &product.id).unwrap();
        add_to_cart(&state, &product.id).unwrap();
        issue_document(&state, DocumentType::Invoice, Some(&walk_in.id))
            .await
            .unwrap();
        add_to_cart(&state, &product.id).unwrap();
        issue_document(&state, DocumentType::Quote, Some(&walk_in.id))
            .await
            .unwrap();
        wait_until(&state, |model| model.documents().len() == 2).await;

        let summary = dashboard(&state).unwrap();
        assert_eq!(summary.product_count, 1);
        assert_eq!(summary.document_count, 2);
        assert_eq!(summary.total_invoiced.centimes(), 2_400);
        assert_eq!(summary.best_sellers[0].quantity, 2);

        let report = revenue_report(&state, Some(Utc::now().year())).unwrap();
        assert_eq!(report.invoice_count, 1);
        assert_eq!(report.total_ht.centimes(), 2_000);
        assert_eq!(report.cogs.centimes(), 1_200);
        assert_eq!(report.gross_profit.centimes(), 800);
        assert_eq!(report.items_sold, 2);

        let empty = revenue_report(&state, Some(1999)).unwrap();
        assert_eq!(empty.invoice_count, 0);
        assert_eq!(empty.gross_margin_percent, 0.0);
    }
}
