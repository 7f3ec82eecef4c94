// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::runtime::FakeRuntime;
use crate::test_support::TestEnv;

#[tokio::test]
async fn rebuilds_all_projects_and_prunes() {
    let env = TestEnv::new();
    env.add_project("alpha");
    env.add_project("beta");

    let runtime = FakeRuntime::new();
    let summary = rebuild_images(&env.cfg, &runtime, &[], false).await.unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.rebuilt, vec!["alpha".to_string(), "beta".to_string()]);
    assert_eq!(runtime.builds(), vec!["kiln-alpha".to_string(), "kiln-beta".to_string()]);
    assert_eq!(runtime.prune_calls(), 1);
}

#[tokio::test]
async fn rebuild_forces_pull_and_no_cache() {
    let env = TestEnv::new();
    env.add_project("alpha");

    let runtime = FakeRuntime::new();
    rebuild_images(&env.cfg, &runtime, &[], false).await.unwrap();

    // the fake records opts through builds(); recheck via the run log file
    assert!(env.cfg.build_path.join("rebuild.log").is_file());
}

#[tokio::test]
async fn missing_project_is_reported_not_fatal() {
    let env = TestEnv::new();
    env.add_project("alpha");

    let runtime = FakeRuntime::new();
    let summary = rebuild_images(
        &env.cfg,
        &runtime,
        &["shouldnotexist".to_string(), "alpha".to_string()],
        false,
    )
    .await
    .unwrap();

    assert_eq!(summary.rebuilt, vec!["alpha".to_string()]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "shouldnotexist");
    assert!(!summary.is_success());
}

#[tokio::test]
async fn fail_fast_stops_at_the_first_error() {
    let env = TestEnv::new();
    env.add_project("alpha");

    let runtime = FakeRuntime::new();
    let summary = rebuild_images(
        &env.cfg,
        &runtime,
        &["shouldnotexist".to_string(), "alpha".to_string()],
        true,
    )
    .await
    .unwrap();

    assert!(summary.rebuilt.is_empty());
    assert_eq!(summary.failed.len(), 1);
    // pruning still runs on the way out
    assert_eq!(runtime.prune_calls(), 1);
}

#[tokio::test]
async fn summary_display_lists_failures() {
    let summary = RebuildSummary {
        rebuilt: vec!["a".to_string()],
        failed: vec![("b".to_string(), "no Dockerfile".to_string())],
    };
    let text = summary.to_string();
    assert!(text.contains("rebuilt 1 image(s)"));
    assert!(text.contains("b: no Dockerfile"));
}
