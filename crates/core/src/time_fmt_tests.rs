// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

#[test]
fn formats_in_reference_layout() {
    let ts = Utc.with_ymd_and_hms(2018, 6, 5, 14, 33, 2).unwrap();
    assert_eq!(format_date(ts), "Tue, 05 Jun 2018 14:33:02");
}

#[test]
fn parses_what_it_formats() {
    let ts = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
    assert_eq!(parse_date(&format_date(ts)).unwrap(), ts);
}

#[test]
fn rejects_garbage_dates() {
    assert!(parse_date("not a date").is_err());
}

#[test]
fn duration_serializes_as_fractional_seconds() {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "duration_secs")]
        duration: Duration,
    }

    let json = serde_json::to_string(&Wrapper { duration: Duration::from_millis(1500) }).unwrap();
    assert_eq!(json, r#"{"duration":1.5}"#);

    let back: Wrapper = serde_json::from_str(&json).unwrap();
    assert_eq!(back.duration, Duration::from_millis(1500));
}

#[test]
fn duration_rejects_negative_values() {
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(with = "duration_secs")]
        #[allow(dead_code)]
        duration: Duration,
    }

    assert!(serde_json::from_str::<Wrapper>(r#"{"duration":-1.0}"#).is_err());
}
