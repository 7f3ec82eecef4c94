// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

#[test]
fn new_record_is_pending() {
    let info = BuildInfo::new(Utc::now());
    assert_eq!(info.exit_code, EXIT_CODE_PENDING);
    assert!(!info.successful());
    assert!(info.err_build.is_none());
}

#[test]
fn successful_requires_zero_exit_and_no_error() {
    let ok = BuildInfo::builder().exit_code(0).build();
    assert!(ok.successful());

    let failed = BuildInfo::builder().exit_code(77).build();
    assert!(!failed.successful());

    let errored = BuildInfo::builder().exit_code(0).err_build("boom").build();
    assert!(!errored.successful());
}

#[test]
fn stripped_empties_log_fields_only() {
    let info = BuildInfo::builder()
        .exit_code(1)
        .container_stdouterr("line 1\nline 2\n")
        .container_stderr("oops\n")
        .err_build("could not run container")
        .build();

    let stripped = info.stripped();
    assert_eq!(stripped.container_stdouterr, "");
    assert_eq!(stripped.container_stderr, "");
    assert_eq!(stripped.exit_code, 1);
    assert_eq!(stripped.err_build.as_deref(), Some("could not run container"));
}

#[test]
fn serializes_with_stable_keys() {
    let started = Utc.with_ymd_and_hms(2018, 6, 5, 14, 33, 2).unwrap();
    let mut info = BuildInfo::new(started);
    info.exit_code = 0;
    info.path = "/var/lib/kiln/simple/ready/abc/data/artifacts".to_string();
    info.duration = Duration::from_secs(3);

    let value: serde_json::Value = serde_json::from_str(&serde_json::to_string(&info).unwrap()).unwrap();
    assert_eq!(value["exit_code"], 0);
    assert_eq!(value["started_at"], "Tue, 05 Jun 2018 14:33:02");
    assert_eq!(value["transport_method"], "rsync");
    assert_eq!(value["duration"], 3.0);
    assert_eq!(value["cached"], false);
    // absent error is omitted entirely
    assert!(value.get("err_build").is_none());
}

#[test]
fn deserializes_sparse_records() {
    // A record persisted before the container ran.
    let json = r#"{"exit_code":-999,"started_at":"Tue, 05 Jun 2018 14:33:02"}"#;
    let info: BuildInfo = serde_json::from_str(json).unwrap();
    assert_eq!(info.exit_code, EXIT_CODE_PENDING);
    assert!(info.params.is_empty());
    assert_eq!(info.transport_method, TransportMethod::Rsync);
}
