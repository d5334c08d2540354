//! # Customer Commands

use comptoir_core::validation::require_confirmation;
use comptoir_core::Customer;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Every customer, sorted by name.
pub fn list_customers(state: &AppState) -> ApiResult<Vec<Customer>> {
    Ok(state.session.read_model()?.customers().to_vec())
}

/// The customer preselected for a new sale (the walk-in customer).
pub fn default_customer(state: &AppState) -> ApiResult<Option<Customer>> {
    Ok(state.session.read_model()?.default_customer())
}

pub async fn save_customer(state: &AppState, customer: Customer) -> ApiResult<Customer> {
    let session = state.session.session();
    Ok(state.catalog.save_customer(session.as_ref(), customer).await?)
}

/// Deletes a customer; the walk-in customer cannot be deleted.
pub async fn delete_customer(state: &AppState, id: &str, confirmed: bool) -> ApiResult<()> {
    require_confirmation(confirmed, "Delete customer")?;
    let customer = state
        .session
        .read_model()?
        .customer(id)
        .ok_or_else(|| ApiError::not_found("Customer", id))?;

    let session = state.session.session();
    Ok(state.catalog.delete_customer(session.as_ref(), &customer).await?)
}
