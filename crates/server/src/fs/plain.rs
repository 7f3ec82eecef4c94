// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Portable adapter built on plain directory operations.

use super::{FileSystem, FsError};
use std::path::Path;
use walkdir::WalkDir;

/// Works on any filesystem; cloning is a full recursive copy, so incremental
/// builds cost proportionally to the size of the previous build.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFs;

impl FileSystem for PlainFs {
    fn create(&self, path: &Path) -> Result<(), FsError> {
        std::fs::create_dir(path).map_err(|e| FsError::io(path, e))
    }

    fn snapshot(&self, src: &Path, dst: &Path) -> Result<(), FsError> {
        std::fs::create_dir(dst).map_err(|e| FsError::io(dst, e))?;

        for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
            let entry = entry.map_err(|e| {
                FsError::io(src, e.into_io_error().unwrap_or_else(|| std::io::Error::other("walk failed")))
            })?;
            let rel = entry
                .path()
                .strip_prefix(src)
                .map_err(|_| FsError::io(entry.path(), std::io::Error::other("path outside clone source")))?;
            let target = dst.join(rel);

            let file_type = entry.file_type();
            if file_type.is_dir() {
                std::fs::create_dir(&target).map_err(|e| FsError::io(&target, e))?;
            } else if file_type.is_symlink() {
                let link = std::fs::read_link(entry.path()).map_err(|e| FsError::io(entry.path(), e))?;
                std::os::unix::fs::symlink(&link, &target).map_err(|e| FsError::io(&target, e))?;
            } else {
                std::fs::copy(entry.path(), &target).map_err(|e| FsError::io(&target, e))?;
            }
        }

        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        match std::fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FsError::io(path, e)),
        }
    }
}
