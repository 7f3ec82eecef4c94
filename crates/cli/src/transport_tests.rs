// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn request() -> CopyRequest {
    CopyRequest {
        user: "deploy".to_string(),
        host: "build.example.org".to_string(),
        project: "yarn".to_string(),
        src: "/var/lib/kiln/yarn/ready/abc123/data/artifacts/*".to_string(),
        dst: "/tmp/out".to_string(),
        clear_dst: false,
    }
}

#[test]
fn scp_builds_a_remote_path() {
    let args = scp_args(&request());
    assert_eq!(
        args,
        [
            "scp",
            "-r",
            "deploy@build.example.org:/var/lib/kiln/yarn/ready/abc123/data/artifacts/*",
            "/tmp/out",
        ]
    );
}

#[test]
fn rsync_addresses_the_kiln_module() {
    let args = rsync_args(&request()).unwrap();
    assert_eq!(
        args,
        [
            "rsync",
            "-rtlp",
            "deploy@build.example.org::kiln/yarn/ready/abc123/data/artifacts/*",
            "/tmp/out",
        ]
    );
}

#[test]
fn rsync_clear_adds_delete() {
    let mut req = request();
    req.clear_dst = true;
    let args = rsync_args(&req).unwrap();
    assert_eq!(args[2], "--delete");
}

#[test]
fn rsync_requires_the_project_in_the_path() {
    let mut req = request();
    req.src = "/somewhere/else/*".to_string();
    assert!(rsync_args(&req).is_err());
}

#[test]
fn remove_dir_contents_empties_but_keeps_the_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("stale.txt"), "old").unwrap();
    std::fs::create_dir(dir.path().join("subdir")).unwrap();
    std::fs::write(dir.path().join("subdir/nested"), "old").unwrap();

    remove_dir_contents(dir.path().to_str().unwrap()).unwrap();

    assert!(dir.path().is_dir());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn run_reports_command_failure() {
    let err = run(vec!["sh".to_string(), "-c".to_string(), "echo oops >&2; exit 2".to_string()])
        .unwrap_err();
    assert!(err.to_string().contains("oops"));
}

#[test]
fn run_returns_combined_output() {
    let out = run(vec!["sh".to_string(), "-c".to_string(), "echo hi; echo there >&2".to_string()])
        .unwrap();
    assert!(out.contains("hi"));
    assert!(out.contains("there"));
}
