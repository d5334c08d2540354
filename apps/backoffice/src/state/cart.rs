//! # Cart State
//!
//! The sale being built at the counter.
//!
//! ## Thread Safety
//! The cart is wrapped in `Arc<Mutex<T>>`: several commands touch it and
//! only one may change it at a time. The lock is never held across an
//! `.await`; issuing a document moves the cart into its Issuing phase
//! instead, so edits arriving meanwhile are ignored. The phase is held by
//! an [`IssueGuard`]: if the issuing command is dropped before it
//! completes, the guard returns the cart to Building.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Counter Action           Command                 Cart Change           │
//! │  ──────────────           ───────                 ───────────           │
//! │                                                                         │
//! │  Click Product ─────────► add_to_cart() ────────► +1 (up to stock)      │
//! │  Change Quantity ───────► update_cart_item() ───► clamp / remove        │
//! │  Click Remove ──────────► remove_from_cart() ───► line removed          │
//! │  Click Clear ───────────► clear_cart(confirmed) ► emptied               │
//! │  Issue ─────────────────► issue_document() ─────► Issuing → emptied     │
//! │                                                    (kept on failure)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use comptoir_core::{Cart, CartLine, CoreResult};

#[derive(Debug, Default)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes a function with read access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let totals = cart_state.with_cart(|cart| cart.totals(rate));
    /// ```
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        // A panic while holding the lock leaves a valid cart behind.
        let cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        f(&cart)
    }

    /// Executes a function with write access to the cart.
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cart)
    }

    /// Enters the Issuing phase and returns the lines with the guard that
    /// leaves it.
    pub fn begin_issue(&self) -> CoreResult<(Vec<CartLine>, IssueGuard)> {
        let lines = self.with_cart_mut(|cart| cart.begin_issue())?;
        let guard = IssueGuard {
            cart: Arc::clone(&self.cart),
            finished: false,
        };
        Ok((lines, guard))
    }
}

/// Holds the cart in its Issuing phase.
///
/// [`IssueGuard::finish`] leaves the phase with the outcome; dropping the
/// guard unfinished counts as a failure and keeps the lines.
#[derive(Debug)]
pub struct IssueGuard {
    cart: Arc<Mutex<Cart>>,
    finished: bool,
}

impl IssueGuard {
    pub fn finish(mut self, success: bool) {
        self.release(success);
    }

    fn release(&mut self, success: bool) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.cart
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .finish_issue(success);
    }
}

impl Drop for IssueGuard {
    fn drop(&mut self) {
        self.release(false);
    }
}
