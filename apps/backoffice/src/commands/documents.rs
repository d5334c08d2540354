//! # Document Commands
//!
//! ## Issue From the Counter
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  issue_document(type, customer_id)                                      │
//! │       │                                                                 │
//! │       ├── cart.begin_issue()      Empty? → EmptyCart                    │
//! │       │                           already issuing? → IssueInProgress    │
//! │       │                                                                 │
//! │       ├── Workflow::issue(session, lines, customer, type, rate)         │
//! │       │                                                                 │
//! │       └── cart.finish_issue(ok)   ok → cart emptied                     │
//! │                                   failed → cart kept for a retry        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::info;

use comptoir_core::format::{amount_in_words, format_currency, format_date};
use comptoir_core::validation::require_confirmation;
use comptoir_core::{CompanyInfo, CustomerSnapshot, DocumentType, SalesDocument};

use crate::commands::cart::current_rate;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Issues a document from the cart to the given customer.
pub async fn issue_document(
    state: &AppState,
    doc_type: DocumentType,
    customer_id: Option<&str>,
) -> ApiResult<SalesDocument> {
    let (lines, guard) = state.cart.begin_issue()?;

    let model = state.session.read_model().ok();
    let customer = customer_id.and_then(|id| model.as_ref().and_then(|m| m.customer(id)));
    let session = state.session.session();

    let result = state
        .workflow
        .issue(session.as_ref(), &lines, customer.as_ref(), doc_type, current_rate(state))
        .await;

    guard.finish(result.is_ok());

    let document = result?;
    info!(reference = %document.reference, "Document created");
    Ok(document)
}

/// Documents of one type, or all of them, newest first.
pub fn list_documents(state: &AppState, doc_type: Option<DocumentType>) -> ApiResult<Vec<SalesDocument>> {
    Ok(state.session.read_model()?.documents_of_type(doc_type))
}

fn find_document(state: &AppState, id: &str) -> ApiResult<SalesDocument> {
    state
        .session
        .read_model()?
        .document(id)
        .ok_or_else(|| ApiError::not_found("Document", id))
}

/// Turns a Draft quote into a Paid invoice. Requires `confirmed`.
pub async fn convert_quote(state: &AppState, quote_id: &str, confirmed: bool) -> ApiResult<SalesDocument> {
    require_confirmation(confirmed, "Convert quote")?;
    let quote = find_document(state, quote_id)?;
    let session = state.session.session();
    Ok(state.workflow.convert_quote(session.as_ref(), &quote).await?)
}

/// Marks a document Cancelled. Stock is not restored.
pub async fn cancel_document(state: &AppState, id: &str) -> ApiResult<()> {
    let document = find_document(state, id)?;
    let session = state.session.session();
    Ok(state.workflow.cancel_document(session.as_ref(), &document).await?)
}

/// Deletes a document. Stock is not restored. Requires `confirmed`.
pub async fn delete_document(state: &AppState, id: &str, confirmed: bool) -> ApiResult<()> {
    require_confirmation(confirmed, "Delete document")?;
    let session = state.session.session();
    Ok(state.workflow.delete_document(session.as_ref(), id).await?)
}

// =============================================================================
// Details
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLineView {
    pub reference: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: String,
    pub line_total: String,
}

/// Everything a printed document shows, already formatted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetails {
    pub title: String,
    pub reference: String,
    pub date: String,
    pub status: String,
    pub quote_ref: Option<String>,
    pub company: CompanyInfo,
    pub customer: CustomerSnapshot,
    pub lines: Vec<DocumentLineView>,
    pub total_ht: String,
    pub total_tva: String,
    pub total_ttc: String,
    /// TTC in French words, e.g. "cent vingt dirhams et zéro centime".
    pub total_in_words: String,
}

pub fn document_details(state: &AppState, id: &str) -> ApiResult<DocumentDetails> {
    let model = state.session.read_model()?;
    let document = model
        .document(id)
        .ok_or_else(|| ApiError::not_found("Document", id))?;

    Ok(DocumentDetails {
        title: document.doc_type.label().to_string(),
        reference: document.reference.clone(),
        date: format_date(&document.date),
        status: document.status.label().to_string(),
        quote_ref: document.quote_ref.clone(),
        company: model.settings().company_info,
        customer: document.customer.clone(),
        lines: document
            .items
            .iter()
            .map(|item| DocumentLineView {
                reference: item.reference.clone(),
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price: format_currency(item.unit_price),
                line_total: format_currency(item.line_total()),
            })
            .collect(),
        total_ht: format_currency(document.total_ht),
        total_tva: format_currency(document.total_tva),
        total_ttc: format_currency(document.total_ttc),
        total_in_words: amount_in_words(document.total_ttc),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart::{add_to_cart, get_cart};
    use crate::commands::customers::default_customer;
    use crate::commands::products::save_product;
    use crate::commands::test_support::{signed_in_state, wait_until};
    use crate::error::ErrorCode;
    use comptoir_core::{CartPhase, DocumentStatus, Money, Product};
    use std::future::{poll_fn, Future};
    use std::task::Poll;

    async fn stocked(state: &AppState, name: &str, price: i64, stock: i64) -> Product {
        let product = Product {
            id: String::new(),
            reference: String::new(),
            name: name.to_string(),
            description: String::new(),
            purchase_price: Money::from_centimes(price / 2),
            sale_price: Money::from_centimes(price),
            stock,
        };
        let saved = save_product(state, product).await.unwrap();
        let id = saved.id.clone();
        wait_until(state, |model| model.product(&id).is_some()).await;
        saved
    }

    fn stock_in_model(state: &AppState, id: &str) -> i64 {
        state
            .session
            .read_model()
            .unwrap()
            .product(id)
            .map(|p| p.stock)
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_counter_sale_end_to_end() {
        let state = signed_in_state().await;
        let a = stocked(&state, "Disjoncteur", 10_000, 5).await;
        let walk_in = default_customer(&state).unwrap().unwrap();

        for _ in 0..3 {
            add_to_cart(&state, &a.id).unwrap();
        }
        let invoice = issue_document(&state, DocumentType::Invoice, Some(&walk_in.id))
            .await
            .unwrap();

        assert_eq!(invoice.status, DocumentStatus::Paid);
        assert_eq!(invoice.total_ht.centimes(), 30_000);
        assert_eq!(get_cart(&state).phase, CartPhase::Empty);

        let id = a.id.clone();
        wait_until(&state, |model| {
            model.product(&id).map(|p| p.stock) == Some(2) && model.documents().len() == 1
        })
        .await;

        let details = document_details(&state, &invoice.id).unwrap();
        assert_eq!(details.title, "Facture");
        assert_eq!(details.total_ttc, "360,00 MAD");
        assert_eq!(details.total_in_words, "trois cent soixante dirhams et zéro centime");
        assert_eq!(details.lines[0].line_total, "300,00 MAD");
    }

    #[tokio::test]
    async fn test_failed_issue_keeps_the_cart() {
        let state = signed_in_state().await;
        let a = stocked(&state, "Prise", 1_500, 2).await;
        add_to_cart(&state, &a.id).unwrap();

        let err = issue_document(&state, DocumentType::Invoice, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "No customer selected");

        let view = get_cart(&state);
        assert_eq!(view.phase, CartPhase::Building);
        assert_eq!(view.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_issue_releases_the_cart() {
        let state = signed_in_state().await;
        let a = stocked(&state, "Interrupteur", 2_000, 3).await;
        let walk_in = default_customer(&state).unwrap().unwrap();
        add_to_cart(&state, &a.id).unwrap();

        // Poll once so the cart enters Issuing, then drop the command mid-await.
        let mut issuing = Box::pin(issue_document(&state, DocumentType::Invoice, Some(&walk_in.id)));
        let first = poll_fn(|cx| Poll::Ready(issuing.as_mut().poll(cx))).await;
        assert!(first.is_pending());
        assert_eq!(get_cart(&state).phase, CartPhase::Issuing);
        drop(issuing);

        let view = get_cart(&state);
        assert_eq!(view.phase, CartPhase::Building);
        assert_eq!(view.lines.len(), 1);

        let invoice = issue_document(&state, DocumentType::Invoice, Some(&walk_in.id))
            .await
            .unwrap();
        assert_eq!(invoice.total_ht.centimes(), 2_000);
        assert_eq!(get_cart(&state).phase, CartPhase::Empty);
    }

    #[tokio::test]
    async fn test_empty_cart_is_refused_first() {
        let state = signed_in_state().await;
        let err = issue_document(&state, DocumentType::Quote, None).await.unwrap_err();
        assert_eq!(err.message, "Cart is empty");
    }

    #[tokio::test]
    async fn test_quote_conversion_flow() {
        let state = signed_in_state().await;
        let b = stocked(&state, "Tableau électrique", 80_000, 1).await;
        let walk_in = default_customer(&state).unwrap().unwrap();

        add_to_cart(&state, &b.id).unwrap();
        let quote = issue_document(&state, DocumentType::Quote, Some(&walk_in.id))
            .await
            .unwrap();
        assert_eq!(quote.status, DocumentStatus::Draft);

        let quote_id = quote.id.clone();
        wait_until(&state, |model| model.document(&quote_id).is_some()).await;
        assert_eq!(stock_in_model(&state, &b.id), 1);

        let err = convert_quote(&state, &quote.id, false).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfirmationRequired);

        let invoice = convert_quote(&state, &quote.id, true).await.unwrap();
        assert_eq!(invoice.quote_ref.as_deref(), Some(quote.reference.as_str()));

        let id = b.id.clone();
        wait_until(&state, |model| {
            model.product(&id).map(|p| p.stock) == Some(0)
                && model.document(&quote_id).map(|d| d.status) == Some(DocumentStatus::Converted)
        })
        .await;

        let invoices = list_documents(&state, Some(DocumentType::Invoice)).unwrap();
        assert_eq!(invoices.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_keeps_stock_and_blocks_second_cancel() {
        let state = signed_in_state().await;
        let a = stocked(&state, "Gaine", 300, 10).await;
        let walk_in = default_customer(&state).unwrap().unwrap();

        add_to_cart(&state, &a.id).unwrap();
        let note = issue_document(&state, DocumentType::DeliveryNote, Some(&walk_in.id))
            .await
            .unwrap();
        let note_id = note.id.clone();
        wait_until(&state, |model| model.document(&note_id).is_some()).await;

        cancel_document(&state, &note.id).await.unwrap();
        wait_until(&state, |model| {
            model.document(&note_id).map(|d| d.status) == Some(DocumentStatus::Cancelled)
        })
        .await;
        assert_eq!(stock_in_model(&state, &a.id), 9);

        let err = cancel_document(&state, &note.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }
}
