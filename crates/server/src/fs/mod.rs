// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem adapters.
//!
//! Build directories are created, cloned and removed through the
//! [`FileSystem`] trait so the rest of the daemon never cares whether a
//! "clone" is a btrfs snapshot or a plain recursive copy.

mod btrfs;
mod plain;

pub use btrfs::Btrfs;
pub use plain::PlainFs;

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{cmd}` failed: {output}")]
    Command { cmd: String, output: String },
}

impl FsError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        FsError::Io { path: path.display().to_string(), source }
    }
}

/// The three directory operations the engine is built on.
pub trait FileSystem: Send + Sync {
    /// Create a new empty directory at `path`. Fails if it already exists.
    fn create(&self, path: &Path) -> Result<(), FsError>;

    /// Materialize `dst` as a copy of `src` and all its contents.
    fn snapshot(&self, src: &Path, dst: &Path) -> Result<(), FsError>;

    /// Remove `path` and everything under it. Removing a path that does not
    /// exist is not an error.
    fn remove(&self, path: &Path) -> Result<(), FsError>;
}

/// Adapter names accepted by the `--filesystem` flag.
pub const ADAPTER_NAMES: &[&str] = &["plain", "btrfs"];

/// Look up a filesystem adapter by name.
pub fn lookup(name: &str) -> Option<Arc<dyn FileSystem>> {
    match name {
        "plain" => Some(Arc::new(PlainFs)),
        "btrfs" => Some(Arc::new(Btrfs::default())),
        _ => None,
    }
}

/// Verify `path` is a directory, creating it if it does not exist.
pub fn ensure_dir_exists(path: &Path) -> Result<(), FsError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(FsError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "not a directory"),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            std::fs::create_dir(path).map_err(|e| FsError::io(path, e))
        }
        Err(e) => Err(FsError::io(path, e)),
    }
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;
