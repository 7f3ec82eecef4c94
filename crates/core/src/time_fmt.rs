// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire formats for timestamps and durations.
//!
//! `started_at` travels as `"Mon, 02 Jan 2006 15:04:05"`-style text in both
//! `build_info.json` and HTTP responses; `duration` travels as fractional
//! seconds.

use chrono::{DateTime, NaiveDateTime, Utc};

/// strftime layout used for `started_at` fields.
pub const DATE_FMT: &str = "%a, %d %b %Y %H:%M:%S";

/// Format a timestamp with [`DATE_FMT`].
pub fn format_date(ts: DateTime<Utc>) -> String {
    ts.format(DATE_FMT).to_string()
}

/// Parse a [`DATE_FMT`] timestamp.
pub fn parse_date(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(NaiveDateTime::parse_from_str(s, DATE_FMT)?.and_utc())
}

/// Serde adapter for `DateTime<Utc>` fields using [`DATE_FMT`].
pub mod date_format {
    use super::*;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_date(*ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_date(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `std::time::Duration` fields as fractional seconds.
pub mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("duration must be a non-negative number"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
