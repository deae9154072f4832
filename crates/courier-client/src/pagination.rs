//! Pagination gate.
//!
//! Tracks whether requesting an older page can still yield anything. The flag
//! is recomputed only when a full reset or an older page arrives; live
//! messages never touch it.

use std::num::NonZeroUsize;

use crate::store::{Observable, SubscriptionId};

/// Observable "no more older pages" flag.
#[derive(Debug)]
pub struct PaginationGate {
    blocked: Observable<bool>,
    page_size: NonZeroUsize,
}

impl PaginationGate {
    /// Blocked gate. Nothing older can be requested before the first reset.
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self { blocked: Observable::new(true), page_size }
    }

    /// True if older-page requests should not be sent.
    pub fn is_blocked(&self) -> bool {
        *self.blocked.get()
    }

    /// Page size the server uses for resets and older pages.
    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    /// Observe every recomputation, including ones that keep the same value.
    pub fn subscribe(&mut self, observer: impl FnMut(&bool) + Send + 'static) -> SubscriptionId {
        self.blocked.subscribe(observer)
    }

    /// Remove an observer.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.blocked.unsubscribe(id)
    }

    /// Drop every observer.
    pub fn clear_observers(&mut self) {
        self.blocked.clear_observers();
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.blocked.observer_count()
    }

    /// A full reset of `len` messages arrived.
    ///
    /// A short or empty first page means the room has no more history.
    pub(crate) fn on_full_reset(&mut self, len: usize) {
        let blocked = len == 0 || len % self.page_size.get() != 0;
        tracing::debug!(len, blocked, "pagination recomputed after reset");
        self.blocked.set(blocked);
    }

    /// An older page of `len` messages arrived.
    pub(crate) fn on_backward_page(&mut self, len: usize) {
        let blocked = len == 0;
        tracing::debug!(len, blocked, "pagination recomputed after older page");
        self.blocked.set(blocked);
    }
}
