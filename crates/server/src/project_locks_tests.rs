// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test]
async fn same_project_serializes() {
    let locks = ProjectLocks::new();
    let in_section = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let locks = locks.clone();
        let in_section = Arc::clone(&in_section);
        let max_seen = Arc::clone(&max_seen);
        handles.push(tokio::spawn(async move {
            let _guard = locks.lock("yarn").await;
            let now = in_section.fetch_add(1, Ordering::SeqCst) + 1;
            max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            in_section.fetch_sub(1, Ordering::SeqCst);
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn different_projects_proceed_in_parallel() {
    let locks = ProjectLocks::new();

    let guard_a = locks.lock("a").await;
    // must not deadlock while "a" is held
    let guard_b = tokio::time::timeout(Duration::from_secs(1), locks.lock("b"))
        .await
        .expect("lock for another project should be free");

    drop(guard_a);
    drop(guard_b);
}

#[tokio::test]
async fn reacquiring_after_release_works() {
    let locks = ProjectLocks::new();
    drop(locks.lock("p").await);
    drop(locks.lock("p").await);
}
