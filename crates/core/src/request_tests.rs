// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn deserializes_with_defaults() {
    let jr: JobRequest = serde_json::from_str(r#"{"project":"simple"}"#).unwrap();
    assert_eq!(jr.project, "simple");
    assert!(jr.params.is_empty());
    assert_eq!(jr.group, "");
    assert!(!jr.rebuild);
}

#[test]
fn round_trips_all_fields() {
    let mut params = Params::new();
    params.insert("lockfile".to_string(), "abc".to_string());
    params.insert("_opaque".to_string(), "x".to_string());

    let jr = JobRequest {
        project: "yarn".to_string(),
        params,
        group: "master".to_string(),
        rebuild: true,
    };

    let json = serde_json::to_string(&jr).unwrap();
    let back: JobRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(back, jr);
}

#[test]
fn rejects_missing_project() {
    assert!(serde_json::from_str::<JobRequest>(r#"{"group":"g"}"#).is_err());
}
