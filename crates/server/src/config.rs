// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration, loaded from a JSON file plus process flags.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("addr must be provided")]
    EmptyAddr,

    #[error("cannot parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("path {0} is not a directory")]
    NotADirectory(PathBuf),
}

/// Everything the server needs in order to function.
///
/// `projects_path` and `build_path` must exist before startup; the daemon
/// never creates them.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Listen address, from the `--addr` flag.
    #[serde(skip)]
    pub addr: String,

    /// Root of the project directories (each one a container build context).
    pub projects_path: PathBuf,

    /// Root of the per-project `pending/`, `ready/` and symlink trees.
    pub build_path: PathBuf,

    /// Extra host→container bind mounts applied to every build container.
    #[serde(default)]
    pub mounts: BTreeMap<String, String>,

    /// UID the build containers run as. Defaults to the daemon's own uid.
    #[serde(default)]
    pub uid: String,

    /// Number of workers. Defaults to the host CPU count.
    #[serde(default, rename = "job_concurrency")]
    pub concurrency: usize,

    /// Work queue depth before submissions are rejected.
    /// Defaults to `2 × concurrency`.
    #[serde(default, rename = "job_backlog")]
    pub backlog: usize,
}

impl Config {
    /// Parse a configuration from `reader`, filling defaults and validating
    /// the paths.
    pub fn load(addr: &str, mut reader: impl Read) -> Result<Self, ConfigError> {
        if addr.is_empty() {
            return Err(ConfigError::EmptyAddr);
        }

        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        let mut cfg: Config = serde_json::from_str(&raw)?;
        cfg.addr = addr.to_string();

        if cfg.uid.is_empty() {
            cfg.uid = nix::unistd::Uid::current().to_string();
        }

        path_is_dir(&cfg.projects_path)?;
        path_is_dir(&cfg.build_path)?;

        if cfg.concurrency == 0 {
            // builds are CPU bound, so the number of cores is a fine default
            cfg.concurrency = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        }

        if cfg.backlog == 0 {
            // allow a request spike double the worker capacity
            cfg.backlog = cfg.concurrency * 2;
        }

        Ok(cfg)
    }
}

fn path_is_dir(p: &Path) -> Result<(), ConfigError> {
    let meta = std::fs::metadata(p)
        .map_err(|_| ConfigError::NotADirectory(p.to_path_buf()))?;
    if !meta.is_dir() {
        return Err(ConfigError::NotADirectory(p.to_path_buf()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
