//! # Session Gate
//!
//! The explicit session object every workflow call receives, and the
//! sign-in sequence that produces it.
//!
//! ## Sign-In Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sign_in(user_id, email)                                                │
//! │       │                                                                 │
//! │       ├── 1. read profile                                               │
//! │       ├── 2. legacy owner? (already has products)                       │
//! │       │                                                                 │
//! │       ├── no profile ──► first profile ever?                            │
//! │       │                    yes → approved admin                         │
//! │       │                    no  → pending user                           │
//! │       │                                                                 │
//! │       └── profile ─────► record last login                              │
//! │                          legacy but still pending → approve as admin    │
//! │                                                                         │
//! │  Session.approved = profile approved OR legacy owner                    │
//! │  Subscriptions and writes require an approved session.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A pending user can hold an [`ApprovalWatch`]: a background task polls
//! the profile and flips the watch once an admin approves the account.
//! Signing in again then yields an approved session.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use comptoir_core::{Customer, Profile, Role, Settings, ValidationError};
use comptoir_db::{WriteBatch, WriteOp};

use crate::error::{SyncError, SyncResult};
use crate::store::RemoteStore;

/// An authenticated user. All persistence is scoped under `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub approved: bool,
    pub role: Role,
}

impl Session {
    /// Partition key for every collection.
    pub fn owner(&self) -> &str {
        &self.user_id
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Unwraps the caller's session for a write or subscription.
pub fn require_session(session: Option<&Session>) -> SyncResult<&Session> {
    let session = session.ok_or(ValidationError::NotAuthenticated)?;
    if !session.approved {
        return Err(SyncError::NotApproved(session.email.clone()));
    }
    Ok(session)
}

// =============================================================================
// Approval Watch
// =============================================================================

/// Shortest period accepted by [`SessionGate::watch_approval`].
const MIN_APPROVAL_POLL: Duration = Duration::from_millis(10);

/// Flips to approved once, when the account's profile is approved.
///
/// The polling task stops after the approval, or once every clone of the
/// watch is dropped.
#[derive(Debug, Clone)]
pub struct ApprovalWatch {
    rx: watch::Receiver<bool>,
}

impl ApprovalWatch {
    pub fn is_approved(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the account is approved.
    pub async fn wait_approved(&mut self) -> SyncResult<()> {
        self.rx
            .wait_for(|approved| *approved)
            .await
            .map(|_| ())
            .map_err(|_| SyncError::SubscriptionClosed)
    }
}

async fn poll_approval(
    store: Arc<dyn RemoteStore>,
    user_id: String,
    period: Duration,
    tx: watch::Sender<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tx.closed() => {
                debug!(user_id = %user_id, "Approval watch dropped");
                return;
            }
            _ = ticker.tick() => {}
        }

        match store.profile(&user_id).await {
            Ok(Some(profile)) if profile.approved => {
                info!(user_id = %user_id, "Account approved");
                let _ = tx.send(true);
                return;
            }
            Ok(_) => {}
            Err(e) => debug!(user_id = %user_id, error = %e, "Approval check failed"),
        }
    }
}

// =============================================================================
// Session Gate
// =============================================================================

pub struct SessionGate {
    store: Arc<dyn RemoteStore>,
}

impl SessionGate {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        SessionGate { store }
    }

    /// Runs the sign-in sequence and returns the resulting session.
    pub async fn sign_in(&self, user_id: &str, email: &str) -> SyncResult<Session> {
        let now = Utc::now();
        let profile = self.store.profile(user_id).await?;
        let legacy_owner = !self.store.products(user_id).await?.is_empty();

        let profile = match profile {
            None => {
                let first_user = self.store.profile_count().await? == 0;
                let profile = Profile {
                    user_id: user_id.to_string(),
                    email: email.to_string(),
                    approved: first_user,
                    role: if first_user { Role::Admin } else { Role::User },
                    created_at: now,
                    last_login: now,
                };
                self.store.upsert_profile(&profile).await?;
                info!(user_id, first_user, legacy_owner, "Created profile");
                profile
            }
            Some(mut profile) => {
                profile.last_login = now;
                if legacy_owner && !profile.approved {
                    profile.approved = true;
                    profile.role = Role::Admin;
                    self.store.upsert_profile(&profile).await?;
                    info!(user_id, "Approved legacy owner");
                } else if let Err(e) = self.store.record_login(user_id, now).await {
                    // A missed login timestamp doesn't block the session.
                    warn!(user_id, error = %e, "Failed to record last login");
                }
                profile
            }
        };

        let session = Session {
            user_id: profile.user_id,
            email: profile.email,
            approved: profile.approved || legacy_owner,
            role: profile.role,
        };

        if !session.approved {
            info!(user_id, "Session pending approval");
        }
        Ok(session)
    }

    /// Watches a pending account until an admin approves it, checking the
    /// profile every `period`.
    pub fn watch_approval(&self, user_id: &str, period: Duration) -> ApprovalWatch {
        let (tx, rx) = watch::channel(false);
        let period = period.max(MIN_APPROVAL_POLL);
        tokio::spawn(poll_approval(self.store.clone(), user_id.to_string(), period, tx));
        ApprovalWatch { rx }
    }

    /// Writes default settings and the walk-in customer, in one batch, when
    /// the owner has no settings yet. Returns `true` when it seeded.
    pub async fn seed_first_run(&self, session: Option<&Session>) -> SyncResult<bool> {
        let session = require_session(session)?;

        if self.store.settings(session.owner()).await?.is_some() {
            return Ok(false);
        }

        let mut batch = WriteBatch::new();
        batch.push(WriteOp::UpsertSettings(Settings::default()));
        batch.push(WriteOp::UpsertCustomer(Customer::walk_in(Uuid::new_v4().to_string())));
        self.store.commit(session.owner(), &batch).await?;

        info!(owner = %session.owner(), "Seeded first-run settings and walk-in customer");
        Ok(true)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{flaky_store, product};
    use comptoir_core::CoreError;

    #[tokio::test]
    async fn test_first_user_is_approved_admin_then_next_is_pending() {
        let store = flaky_store().await;
        let gate = SessionGate::new(store.clone());

        let first = gate.sign_in("u1", "a@atlas.ma").await.unwrap();
        assert!(first.approved);
        assert!(first.is_admin());

        let second = gate.sign_in("u2", "b@atlas.ma").await.unwrap();
        assert!(!second.approved);
        assert_eq!(second.role, Role::User);
        assert!(matches!(
            require_session(Some(&second)),
            Err(SyncError::NotApproved(_))
        ));
    }

    #[tokio::test]
    async fn test_legacy_owner_is_approved() {
        let store = flaky_store().await;
        let gate = SessionGate::new(store.clone());
        gate.sign_in("u1", "a@atlas.ma").await.unwrap();

        // u2 already owns products from before profiles existed.
        let legacy = [product("p1", 1_000, 3)];
        let batch: WriteBatch = legacy.iter().cloned().map(WriteOp::UpsertProduct).collect();
        store.inner().commit("u2", &batch).await.unwrap();

        let session = gate.sign_in("u2", "b@atlas.ma").await.unwrap();
        assert!(session.approved);

        // Second sign-in fixes the stored profile.
        gate.sign_in("u2", "b@atlas.ma").await.unwrap();
        let stored = store.inner().database().profiles().get("u2").await.unwrap().unwrap();
        assert!(stored.approved);
        assert_eq!(stored.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_approval_watch_sees_admin_approval() {
        let store = flaky_store().await;
        let gate = SessionGate::new(store.clone());
        gate.sign_in("u1", "a@atlas.ma").await.unwrap();
        let pending = gate.sign_in("u2", "b@atlas.ma").await.unwrap();
        assert!(!pending.approved);

        let mut approval = gate.watch_approval("u2", Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!approval.is_approved());

        let mut profile = store.profile("u2").await.unwrap().unwrap();
        profile.approved = true;
        store.upsert_profile(&profile).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), approval.wait_approved())
            .await
            .unwrap()
            .unwrap();
        assert!(approval.is_approved());
        assert!(gate.sign_in("u2", "b@atlas.ma").await.unwrap().approved);
    }

    #[tokio::test]
    async fn test_seed_first_run_once() {
        let store = flaky_store().await;
        let gate = SessionGate::new(store.clone());
        let session = gate.sign_in("u1", "a@atlas.ma").await.unwrap();

        assert!(gate.seed_first_run(Some(&session)).await.unwrap());
        assert!(!gate.seed_first_run(Some(&session)).await.unwrap());

        let customers = store.inner().database().customers().list("u1").await.unwrap();
        assert_eq!(customers.len(), 1);
        assert!(customers[0].is_walk_in());
        assert!(store.inner().database().settings().get("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_session_is_not_authenticated() {
        let store = flaky_store().await;
        let gate = SessionGate::new(store);

        let err = gate.seed_first_run(None).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Core(CoreError::Validation(ValidationError::NotAuthenticated))
        ));
    }

    #[tokio::test]
    async fn test_sign_in_fails_when_offline() {
        let store = flaky_store().await;
        store.set_offline(true);
        let gate = SessionGate::new(store);

        let err = gate.sign_in("u1", "a@atlas.ma").await.unwrap_err();
        assert!(err.is_remote_unavailable());
    }
}
