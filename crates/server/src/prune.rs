// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup cleanup of abandoned pending builds.

use crate::config::Config;
use crate::fs::{FileSystem, FsError};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PruneError {
    #[error("cannot scan projects: {0}")]
    Scan(#[from] std::io::Error),

    #[error("error pruning zombie build '{build}' of project '{project}': {source}")]
    Remove {
        project: String,
        build: String,
        #[source]
        source: FsError,
    },
}

/// Delete every directory under each project's `pending/`.
///
/// A build that survived a restart inside `pending/` can only be the remains
/// of a crash: a completed one would have been promoted to `ready/`.
pub fn prune_zombie_builds(cfg: &Config, fs: &dyn FileSystem) -> Result<(), PruneError> {
    let projects = std::fs::read_dir(&cfg.projects_path)?;

    for project in projects.flatten() {
        let name = project.file_name().to_string_lossy().into_owned();
        let pending = cfg.build_path.join(&name).join("pending");

        let entries = match std::fs::read_dir(&pending) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(PruneError::Scan(e)),
        };

        for entry in entries.flatten() {
            let build = entry.file_name().to_string_lossy().into_owned();
            fs.remove(&entry.path()).map_err(|source| PruneError::Remove {
                project: name.clone(),
                build: build.clone(),
                source,
            })?;
            info!(project = %name, build = %build, "pruned zombie build");
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "prune_tests.rs"]
mod tests;
