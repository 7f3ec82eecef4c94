// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::runtime::FakeRuntime;
use crate::test_support::TestEnv;
use kiln_core::Params;
use std::time::Duration;

fn token() -> CancellationToken {
    CancellationToken::new()
}

#[tokio::test]
async fn delivers_results_through_the_future() {
    let env = TestEnv::new();
    env.add_project("simple");
    let pool = WorkerPool::new(env.engine(FakeRuntime::new()), 2, 4, token());

    let future = pool.send_work(env.job("simple", Params::new(), "")).unwrap();
    let info = future.wait().await.unwrap();
    assert_eq!(info.exit_code, 0);
}

#[tokio::test]
async fn errors_travel_through_the_future_too() {
    let env = TestEnv::new();
    env.add_project("broken");
    let pool = WorkerPool::new(
        env.engine(FakeRuntime::new().with_build_error("no such base image")),
        1,
        2,
        token(),
    );

    let future = pool.send_work(env.job("broken", Params::new(), "")).unwrap();
    let err = future.wait().await.unwrap_err();
    assert!(err.to_string().contains("no such base image"));
}

#[tokio::test]
async fn rejects_work_when_the_backlog_is_full() {
    let env = TestEnv::new();
    for name in ["a", "b", "c"] {
        env.add_project(name);
    }
    let runtime = FakeRuntime::new().with_run_delay(Duration::from_secs(30));
    let pool = WorkerPool::new(env.engine(runtime), 1, 1, token());

    // the worker picks this one up
    let _busy = pool.send_work(env.job("a", Params::new(), "")).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // this one fills the backlog
    let _queued = pool.send_work(env.job("b", Params::new(), "")).unwrap();

    // nothing can take this one
    let err = pool.send_work(env.job("c", Params::new(), "")).unwrap_err();
    assert_eq!(err.to_string(), "queue is full");
}

#[tokio::test]
async fn stop_drains_queued_work() {
    let env = TestEnv::new();
    env.add_project("simple");
    let runtime = FakeRuntime::new();
    let pool = WorkerPool::new(env.engine(runtime.clone()), 1, 4, token());

    let future = pool.send_work(env.job("simple", Params::new(), "")).unwrap();
    pool.stop().await;

    // the item queued before stop still produced its result
    let info = future.wait().await.unwrap();
    assert_eq!(info.exit_code, 0);
    assert_eq!(runtime.runs().len(), 1);
}

#[tokio::test]
async fn distinct_jobs_run_in_parallel() {
    let env = TestEnv::new();
    env.add_project("x");
    env.add_project("y");
    let runtime = FakeRuntime::new().with_run_delay(Duration::from_millis(200));
    let pool = WorkerPool::new(env.engine(runtime), 2, 4, token());

    let started = std::time::Instant::now();
    let f1 = pool.send_work(env.job("x", Params::new(), "")).unwrap();
    let f2 = pool.send_work(env.job("y", Params::new(), "")).unwrap();
    let (r1, r2) = tokio::join!(f1.wait(), f2.wait());

    r1.unwrap();
    r2.unwrap();
    // two sequential 200ms builds would take 400ms+
    assert!(started.elapsed() < Duration::from_millis(390));
}
