// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lazily-populated per-project mutual exclusion.
//!
//! Every operation that mutates a project's subtree (`ready/`, `pending/`,
//! the `latest` and group symlinks) runs under the project's lock so two
//! workers finishing at the same time cannot corrupt the links. Jobs of
//! different projects proceed in parallel.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

#[derive(Clone, Default)]
pub struct ProjectLocks {
    inner: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `project`, creating it on first use. The guard
    /// may be held across await points.
    pub async fn lock(&self, project: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock();
            Arc::clone(map.entry(project.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
#[path = "project_locks_tests.rs"]
mod tests;
