// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persisted record of a build attempt.

use crate::params::Params;
use crate::time_fmt;
use crate::transport::TransportMethod;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sentinel exit code for a build whose container has not run (yet).
///
/// It is the value persisted by the initial `build_info.json` write, and the
/// value a reader observes for a build that failed before the container
/// started.
pub const EXIT_CODE_PENDING: i32 = -999;

/// Record of a build attempt, serialized to `build_info.json` inside the
/// build directory and returned to clients as the response body.
///
/// The log fields (`container_stdouterr`, `container_stderr`) are part of
/// the HTTP egress but are emptied before the record is persisted to disk;
/// the log bytes live next to it in `out.log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Job parameters, opaque ones included.
    #[serde(default)]
    pub params: Params,

    /// Group the job was submitted under; empty if ungrouped.
    #[serde(default)]
    pub group: String,

    /// Where the build artifacts are located on the server.
    #[serde(default)]
    pub path: String,

    /// True if the result was served from the result cache.
    #[serde(default)]
    pub cached: bool,

    /// True if the result was served from a concurrent in-flight build.
    #[serde(default)]
    pub coalesced: bool,

    /// True if the build directory was cloned from a previous build of the
    /// same group.
    #[serde(default)]
    pub incremental: bool,

    /// Exit code of the container command; [`EXIT_CODE_PENDING`] until the
    /// container has exited.
    pub exit_code: i32,

    /// Engine-level error message, if the build failed before or after the
    /// container ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err_build: Option<String>,

    /// Combined container stdout and stderr.
    #[serde(default)]
    pub container_stdouterr: String,

    /// Container stderr alone.
    #[serde(default)]
    pub container_stderr: String,

    /// How clients should fetch the artifacts.
    #[serde(default)]
    pub transport_method: TransportMethod,

    #[serde(with = "time_fmt::date_format")]
    pub started_at: DateTime<Utc>,

    /// How long the build took, filled when the container exits.
    #[serde(with = "time_fmt::duration_secs", default)]
    pub duration: Duration,

    /// Server-relative URL of the job page.
    #[serde(default)]
    pub url: String,
}

impl BuildInfo {
    /// A fresh record for a build that has not run yet.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            params: Params::new(),
            group: String::new(),
            path: String::new(),
            cached: false,
            coalesced: false,
            incremental: false,
            exit_code: EXIT_CODE_PENDING,
            err_build: None,
            container_stdouterr: String::new(),
            container_stderr: String::new(),
            transport_method: TransportMethod::default(),
            started_at,
            duration: Duration::ZERO,
            url: String::new(),
        }
    }

    /// Whether the container ran and exited successfully.
    pub fn successful(&self) -> bool {
        self.exit_code == 0 && self.err_build.is_none()
    }

    /// Copy with the log fields emptied, the form persisted to
    /// `build_info.json`.
    pub fn stripped(&self) -> Self {
        Self {
            container_stdouterr: String::new(),
            container_stderr: String::new(),
            ..self.clone()
        }
    }
}

crate::builder! {
    pub struct BuildInfoBuilder => BuildInfo {
        into {
            group: String = "",
            path: String = "",
            url: String = "",
            container_stdouterr: String = "",
            container_stderr: String = "",
        }
        set {
            params: Params = Params::new(),
            cached: bool = false,
            coalesced: bool = false,
            incremental: bool = false,
            exit_code: i32 = 0,
            transport_method: TransportMethod = TransportMethod::Rsync,
            duration: Duration = Duration::ZERO,
        }
        option {
            err_build: String = None,
        }
        computed {
            started_at: DateTime<Utc> = Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "build_info_tests.rs"]
mod tests;
