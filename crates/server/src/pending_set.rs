// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide set of in-flight job fingerprints.
//!
//! The atomic test-and-insert of [`PendingSet::add`] is what decides whether
//! a request becomes the builder or a coalescing waiter.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct PendingSet {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `id`, returning `true` iff it was absent. A `false` return
    /// means an identical job is already in flight.
    pub fn add(&self, id: &str) -> bool {
        self.inner.lock().insert(id.to_string())
    }

    /// Remove `id` from the set.
    pub fn delete(&self, id: &str) {
        self.inner.lock().remove(id);
    }

    /// Guard that removes `id` when dropped, covering every exit path of the
    /// admitted builder.
    pub fn defer_delete<'a>(&'a self, id: &'a str) -> PendingGuard<'a> {
        PendingGuard { set: self, id }
    }
}

pub struct PendingGuard<'a> {
    set: &'a PendingSet,
    id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.set.delete(self.id);
    }
}

#[cfg(test)]
#[path = "pending_set_tests.rs"]
mod tests;
