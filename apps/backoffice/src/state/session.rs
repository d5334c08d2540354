//! # Session State
//!
//! The signed-in session and, for an approved one, its live subscription.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  signed out ──sign_in──► pending (no read model, ApprovalWatch)         │
//! │       ▲                     │ approved by an admin                      │
//! │       │                     ▼                                           │
//! │       │           └────► approved ── Subscription + ReadModel           │
//! │       │                                    │                            │
//! │       └──────────────── sign_out ◄─────────┘  (unsubscribe, awaited)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{PoisonError, RwLock};

use tokio::sync::Mutex;

use comptoir_core::ValidationError;
use comptoir_sync::{ApprovalWatch, ReadModel, Session, Subscription, SyncError};

use crate::error::{ApiError, ApiResult};

#[derive(Clone)]
struct Active {
    session: Session,
    read_model: Option<ReadModel>,
    approval: Option<ApprovalWatch>,
}

#[derive(Default)]
pub struct SessionState {
    current: RwLock<Option<Active>>,
    subscription: Mutex<Option<Subscription>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The signed-in session, if any.
    pub fn session(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|active| active.session.clone())
    }

    /// The read model of the approved session.
    pub fn read_model(&self) -> ApiResult<ReadModel> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        let active = current
            .as_ref()
            .ok_or_else(|| ApiError::from(ValidationError::NotAuthenticated))?;
        active
            .read_model
            .clone()
            .ok_or_else(|| SyncError::NotApproved(active.session.email.clone()).into())
    }

    /// The approval watch of a pending session.
    pub fn approval(&self) -> Option<ApprovalWatch> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|active| active.approval.clone())
    }

    /// Replaces the current session with an approved one, tearing down any
    /// previous subscription.
    pub async fn begin(&self, session: Session, subscription: Subscription) {
        let active = Active {
            session,
            read_model: Some(subscription.read_model()),
            approval: None,
        };
        self.replace(active, Some(subscription)).await;
    }

    /// Replaces the current session with one awaiting approval.
    pub async fn begin_pending(&self, session: Session, approval: ApprovalWatch) {
        let active = Active {
            session,
            read_model: None,
            approval: Some(approval),
        };
        self.replace(active, None).await;
    }

    async fn replace(&self, active: Active, subscription: Option<Subscription>) {
        let mut slot = self.subscription.lock().await;
        if let Some(previous) = slot.take() {
            previous.unsubscribe().await;
        }

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(active);
        *slot = subscription;
    }

    /// Signs out and waits for the subscription to stop.
    pub async fn end(&self) {
        let mut slot = self.subscription.lock().await;
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = slot.take() {
            subscription.unsubscribe().await;
        }
    }
}
