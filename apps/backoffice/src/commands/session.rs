//! # Session Commands
//!
//! ```text
//! sign_in(user_id, email)
//!      │
//!      ├── SessionGate::sign_in ──► Session { approved, role }
//!      │
//!      ├── pending? ──► keep the session, no data (NOT_APPROVED on reads)
//!      │                watch the profile; wait_for_approval() signs in
//!      │                again once an admin approves
//!      │
//!      └── approved ──► seed_first_run (failure logged) ──► Subscription::attach
//!                                                                │
//!                                                                ▼
//!                                           wait for the first snapshot (bounded)
//! ```

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use comptoir_core::{Role, ValidationError};
use comptoir_sync::{Session, Subscription};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// How long sign-in waits for the first snapshot before returning anyway.
const INITIAL_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub user_id: String,
    pub email: String,
    pub approved: bool,
    pub role: Role,
    /// False when the first snapshot did not arrive in time.
    pub loaded: bool,
}

impl SessionView {
    fn new(session: &Session, loaded: bool) -> Self {
        SessionView {
            user_id: session.user_id.clone(),
            email: session.email.clone(),
            approved: session.approved,
            role: session.role,
            loaded,
        }
    }
}

/// Signs a user in and, when approved, starts their subscription.
pub async fn sign_in(state: &AppState, user_id: &str, email: &str) -> ApiResult<SessionView> {
    let session = state.gate.sign_in(user_id, email).await?;

    if !session.approved {
        info!(user_id, "Signed in, awaiting approval");
        let approval = state
            .gate
            .watch_approval(user_id, state.config.approval_poll_interval());
        state.session.begin_pending(session.clone(), approval).await;
        return Ok(SessionView::new(&session, false));
    }

    // Without seeding the read model still loads; settings fall back to defaults.
    if let Err(e) = state.gate.seed_first_run(Some(&session)).await {
        warn!(user_id, error = %e, "First-run seeding failed, continuing");
    }

    let subscription = Subscription::attach(state.store.clone(), Some(&session))?;
    let mut read_model = subscription.read_model();
    state.session.begin(session.clone(), subscription).await;

    let loaded = match tokio::time::timeout(INITIAL_LOAD_TIMEOUT, read_model.wait_loaded()).await {
        Ok(result) => result.is_ok(),
        Err(_) => {
            warn!(user_id, "First snapshot not received in time, continuing");
            false
        }
    };

    info!(user_id, role = ?session.role, loaded, "Signed in");
    Ok(SessionView::new(&session, loaded))
}

/// Waits until the pending account is approved, then signs it in again
/// with its data. Returns the current view at once for an approved session.
pub async fn wait_for_approval(state: &AppState) -> ApiResult<SessionView> {
    let session = state
        .session
        .session()
        .ok_or_else(|| ApiError::from(ValidationError::NotAuthenticated))?;
    let Some(mut approval) = state.session.approval() else {
        return current_session(state).ok_or_else(|| ValidationError::NotAuthenticated.into());
    };

    approval.wait_approved().await?;

    // Signed out (or switched user) while waiting.
    if state.session.session().map(|s| s.user_id) != Some(session.user_id.clone()) {
        return Err(ValidationError::NotAuthenticated.into());
    }
    sign_in(state, &session.user_id, &session.email).await
}

/// Signs out, stops the subscription and empties the cart.
pub async fn sign_out(state: &AppState) {
    state.session.end().await;
    state.cart.with_cart_mut(|cart| {
        cart.finish_issue(false);
        cart.clear();
    });
    info!("Signed out");
}

pub fn current_session(state: &AppState) -> Option<SessionView> {
    state.session.session().map(|session| {
        let loaded = state
            .session
            .read_model()
            .map(|model| model.is_loaded())
            .unwrap_or(false);
        SessionView::new(&session, loaded)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart::{add_to_cart, get_cart};
    use crate::commands::products::save_product;
    use crate::commands::test_support::{signed_in_state, wait_until, WAIT};
    use crate::config::AppConfig;
    use crate::error::ErrorCode;
    use comptoir_core::{Money, Product};
    use comptoir_db::{Database, DbConfig};
    use comptoir_sync::RemoteStore;

    #[tokio::test]
    async fn test_first_owner_is_seeded_and_subscribed() {
        let state = signed_in_state().await;

        let view = current_session(&state).unwrap();
        assert!(view.approved);
        assert_eq!(view.role, Role::Admin);

        let model = state.session.read_model().unwrap();
        assert!(model.is_loaded());
        assert!(model.snapshot().settings.is_some());
    }

    #[tokio::test]
    async fn test_pending_user_gets_no_data() {
        let state = signed_in_state().await;
        sign_out(&state).await;

        let view = sign_in(&state, "owner-2", "vendeur@atlas.ma").await.unwrap();
        assert!(!view.approved);

        let err = state.session.read_model().unwrap_err();
        assert_eq!(err.code, ErrorCode::NotApproved);
    }

    #[tokio::test]
    async fn test_approval_signs_pending_user_in() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut config = AppConfig::default();
        config.owner.approval_poll_ms = 20;
        let state = AppState::new(config, db);

        sign_in(&state, "owner-1", "gerant@atlas.ma").await.unwrap();
        sign_out(&state).await;
        let pending = sign_in(&state, "owner-2", "vendeur@atlas.ma").await.unwrap();
        assert!(!pending.approved);
        assert!(!state.session.approval().unwrap().is_approved());

        let mut profile = state.store.profile("owner-2").await.unwrap().unwrap();
        profile.approved = true;
        state.store.upsert_profile(&profile).await.unwrap();

        let view = tokio::time::timeout(WAIT, wait_for_approval(&state))
            .await
            .unwrap()
            .unwrap();
        assert!(view.approved);
        assert!(view.loaded);
        assert!(state.session.approval().is_none());
        assert!(state.session.read_model().unwrap().is_loaded());
    }

    #[tokio::test]
    async fn test_failed_seeding_does_not_block_sign_in() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_customers BEFORE INSERT ON customers \
             BEGIN SELECT RAISE(ABORT, 'customers are read-only'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();
        let state = AppState::new(AppConfig::default(), db);

        let view = sign_in(&state, "owner-1", "gerant@atlas.ma").await.unwrap();
        assert!(view.approved);
        assert!(view.loaded);

        let model = state.session.read_model().unwrap();
        assert!(model.snapshot().settings.is_none());
        assert!(model.customers().is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_drops_read_model() {
        let state = signed_in_state().await;
        sign_out(&state).await;

        assert!(current_session(&state).is_none());
        let err = state.session.read_model().unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);
    }

    #[tokio::test]
    async fn test_sign_out_empties_the_cart() {
        let state = signed_in_state().await;
        let cable = Product {
            id: String::new(),
            reference: String::new(),
            name: "Câble".to_string(),
            description: String::new(),
            purchase_price: Money::from_centimes(500),
            sale_price: Money::from_centimes(1_000),
            stock: 4,
        };
        let product = save_product(&state, cable).await.unwrap();
        let id = product.id.clone();
        wait_until(&state, |model| model.product(&id).is_some()).await;
        add_to_cart(&state, &product.id).unwrap();
        assert_eq!(get_cart(&state).lines.len(), 1);

        sign_out(&state).await;
        assert!(get_cart(&state).lines.is_empty());
    }
}
