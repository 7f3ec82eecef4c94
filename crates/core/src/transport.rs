// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact transport selection.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The tool the client uses to download build artifacts from the server.
/// The binary must be installed on the client system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMethod {
    /// rsync(1), over SSH or the rsync protocol. Recommended for production;
    /// only transfers what changed.
    #[default]
    Rsync,
    /// scp(1).
    Scp,
}

crate::simple_display! {
    TransportMethod {
        Rsync => "rsync",
        Scp => "scp",
    }
}

impl FromStr for TransportMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rsync" => Ok(TransportMethod::Rsync),
            "scp" => Ok(TransportMethod::Scp),
            other => Err(format!("invalid transport '{other}' (expected rsync or scp)")),
        }
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
