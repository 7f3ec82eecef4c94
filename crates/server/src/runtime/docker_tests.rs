// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn sh(script: &str) -> tokio::process::Child {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", script]);
    cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
    cmd.spawn().unwrap()
}

#[tokio::test]
async fn stream_child_appends_both_streams_to_log() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("out.log");
    std::fs::write(&log, "existing\n").unwrap();

    let cli = DockerCli::default();
    let cancel = CancellationToken::new();
    let child = sh("echo out; echo err >&2");

    let (status, stderr) = cli.stream_child(&cancel, child, None, &log).await.unwrap();

    assert!(status.success());
    assert_eq!(stderr, "err\n");
    let contents = std::fs::read_to_string(&log).unwrap();
    assert!(contents.starts_with("existing\n"));
    assert!(contents.contains("out\n"));
    assert!(contents.contains("err\n"));
}

#[tokio::test]
async fn stream_child_feeds_stdin() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("out.log");

    let cli = DockerCli::default();
    let cancel = CancellationToken::new();
    let child = sh("cat");

    let (status, _) = cli
        .stream_child(&cancel, child, Some(b"context bytes".to_vec()), &log)
        .await
        .unwrap();

    assert!(status.success());
    assert_eq!(std::fs::read_to_string(&log).unwrap(), "context bytes");
}

#[tokio::test]
async fn stream_child_reports_cancellation() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("out.log");

    let cli = DockerCli::default();
    let cancel = CancellationToken::new();
    let child = sh("sleep 30");

    let cancel2 = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        cancel2.cancel();
    });

    let started = std::time::Instant::now();
    let err = cli.stream_child(&cancel, child, None, &log).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Cancelled));
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
}

#[test]
fn error_detail_keeps_stderr_tail() {
    let stderr = "one\ntwo\nthree\nfour\nfive\nsix\nseven\n";
    let status = std::process::Command::new("sh").args(["-c", "exit 1"]).status().unwrap();
    let detail = error_detail(stderr, status);
    assert_eq!(detail, "three\nfour\nfive\nsix\nseven");
}

#[test]
fn error_detail_falls_back_to_status() {
    let status = std::process::Command::new("sh").args(["-c", "exit 3"]).status().unwrap();
    let detail = error_detail("  \n", status);
    assert!(detail.contains('3'), "unexpected detail: {detail}");
}

#[test]
fn random_hex_is_sixteen_hex_chars() {
    let hex = random_hex();
    assert_eq!(hex.len(), 16);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(random_hex(), random_hex());
}
