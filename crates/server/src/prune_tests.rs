// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::fs::PlainFs;
use crate::test_support::TestEnv;

#[test]
fn removes_every_pending_child() {
    let env = TestEnv::new();
    env.add_project("p");

    let pending = env.cfg.build_path.join("p/pending");
    std::fs::create_dir_all(pending.join("foo/data")).unwrap();
    std::fs::create_dir_all(pending.join("bar")).unwrap();
    std::fs::write(pending.join("foo/data/out.log"), "partial").unwrap();

    prune_zombie_builds(&env.cfg, &PlainFs).unwrap();

    assert!(pending.is_dir());
    assert_eq!(std::fs::read_dir(&pending).unwrap().count(), 0);
}

#[test]
fn leaves_ready_builds_alone() {
    let env = TestEnv::new();
    env.add_project("p");

    let ready = env.cfg.build_path.join("p/ready/abc");
    std::fs::create_dir_all(&ready).unwrap();
    std::fs::create_dir_all(env.cfg.build_path.join("p/pending/zombie")).unwrap();

    prune_zombie_builds(&env.cfg, &PlainFs).unwrap();

    assert!(ready.is_dir());
    assert!(!env.cfg.build_path.join("p/pending/zombie").exists());
}

#[test]
fn tolerates_projects_without_a_build_tree() {
    let env = TestEnv::new();
    env.add_project("never-built");

    prune_zombie_builds(&env.cfg, &PlainFs).unwrap();
}
