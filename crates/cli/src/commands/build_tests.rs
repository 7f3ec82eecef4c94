// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::Parser;

#[derive(Parser)]
struct Harness {
    #[command(flatten)]
    args: BuildArgs,
}

fn parse(argv: &[&str]) -> BuildArgs {
    let mut full = vec!["kiln"];
    full.extend_from_slice(argv);
    Harness::try_parse_from(full).unwrap().args
}

#[test]
fn defaults_match_the_server() {
    let args = parse(&["--project", "yarn"]);
    assert_eq!(args.host, "0.0.0.0");
    assert_eq!(args.port, 8462);
    assert_eq!(args.transport, "scp");
    assert_eq!(args.target, ".");
    assert_eq!(args.timeout, "60m");
    assert!(!args.no_wait);
    assert!(!args.rebuild);
}

#[test]
fn project_is_required() {
    let mut full = vec!["kiln"];
    full.push("--host");
    full.push("example.org");
    assert!(Harness::try_parse_from(full).is_err());
}

#[test]
fn trailing_params_come_after_the_separator() {
    let args = parse(&[
        "--project",
        "yarn",
        "--group",
        "master",
        "--",
        "--lockfile=abc",
        "--_opaque=true",
    ]);
    assert_eq!(args.params, ["--lockfile=abc", "--_opaque=true"]);

    let params = parse_dynamic(&args.params).unwrap();
    assert_eq!(params.get("lockfile").map(String::as_str), Some("abc"));
    assert_eq!(params.get("_opaque").map(String::as_str), Some("true"));
}

#[test]
fn explicit_transport_user_wins() {
    assert_eq!(transport_user("deploy"), "deploy");
}

#[test]
fn fallback_transport_user_is_not_empty() {
    assert!(!transport_user("").is_empty());
}

#[test]
fn unknown_transport_is_rejected_at_run_time() {
    let mut args = parse(&["--project", "yarn"]);
    args.transport = "carrier-pigeon".to_string();
    let err = run(args).unwrap_err();
    assert!(err.to_string().contains("carrier-pigeon"));
}
