// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job request submitted by clients.

use crate::params::Params;
use serde::{Deserialize, Serialize};

/// The data a job was requested with, as POSTed to `/jobs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Project to build. Required.
    pub project: String,

    /// Build parameters. Keys starting with `_` are opaque: they reach the
    /// container but do not affect the job identity.
    #[serde(default)]
    pub params: Params,

    /// Group label selecting which previous build to clone as a starting
    /// point. Empty means ungrouped.
    #[serde(default)]
    pub group: String,

    /// Force a no-cache rebuild of the project image.
    #[serde(default)]
    pub rebuild: bool,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
