//! # Settings Commands

use comptoir_core::Settings;

use crate::error::ApiResult;
use crate::state::AppState;

/// The owner's settings (defaults until seeded).
pub fn get_settings(state: &AppState) -> ApiResult<Settings> {
    Ok(state.session.read_model()?.settings())
}

pub async fn save_settings(state: &AppState, settings: Settings) -> ApiResult<Settings> {
    let session = state.session.session();
    Ok(state.catalog.save_settings(session.as_ref(), settings).await?)
}
