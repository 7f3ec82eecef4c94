// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Cursor;
use tempfile::tempdir;

fn config_json(projects: &Path, builds: &Path) -> String {
    format!(
        r#"{{"projects_path": "{}", "build_path": "{}"}}"#,
        projects.display(),
        builds.display()
    )
}

#[test]
fn fills_defaults() {
    let projects = tempdir().unwrap();
    let builds = tempdir().unwrap();

    let cfg = Config::load(
        "0.0.0.0:8462",
        Cursor::new(config_json(projects.path(), builds.path())),
    )
    .unwrap();

    assert_eq!(cfg.addr, "0.0.0.0:8462");
    assert!(cfg.concurrency > 0);
    assert_eq!(cfg.backlog, cfg.concurrency * 2);
    assert!(!cfg.uid.is_empty());
    assert!(cfg.mounts.is_empty());
}

#[test]
fn respects_explicit_concurrency_and_backlog() {
    let projects = tempdir().unwrap();
    let builds = tempdir().unwrap();

    let json = format!(
        r#"{{"projects_path": "{}", "build_path": "{}", "job_concurrency": 3, "job_backlog": 9}}"#,
        projects.path().display(),
        builds.path().display()
    );

    let cfg = Config::load("127.0.0.1:0", Cursor::new(json)).unwrap();
    assert_eq!(cfg.concurrency, 3);
    assert_eq!(cfg.backlog, 9);
}

#[test]
fn parses_mounts() {
    let projects = tempdir().unwrap();
    let builds = tempdir().unwrap();

    let json = format!(
        r#"{{"projects_path": "{}", "build_path": "{}", "mounts": {{"/var/cache": "/cache"}}}}"#,
        projects.path().display(),
        builds.path().display()
    );

    let cfg = Config::load("127.0.0.1:0", Cursor::new(json)).unwrap();
    assert_eq!(cfg.mounts.get("/var/cache").map(String::as_str), Some("/cache"));
}

#[test]
fn rejects_empty_addr() {
    let projects = tempdir().unwrap();
    let builds = tempdir().unwrap();

    let err = Config::load("", Cursor::new(config_json(projects.path(), builds.path())));
    assert!(matches!(err, Err(ConfigError::EmptyAddr)));
}

#[test]
fn rejects_missing_projects_path() {
    let builds = tempdir().unwrap();

    let json = format!(
        r#"{{"projects_path": "/does/not/exist", "build_path": "{}"}}"#,
        builds.path().display()
    );

    let err = Config::load("127.0.0.1:0", Cursor::new(json));
    assert!(matches!(err, Err(ConfigError::NotADirectory(_))));
}

#[test]
fn rejects_malformed_json() {
    let err = Config::load("127.0.0.1:0", Cursor::new("{not json"));
    assert!(matches!(err, Err(ConfigError::Parse(_))));
}
