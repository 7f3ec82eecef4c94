// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Copy-on-write adapter backed by btrfs subvolumes.

use super::{FileSystem, FsError};
use std::path::Path;
use std::process::Command;

/// Clones are btrfs snapshots: constant time, storage shared with the
/// source. The recommended adapter for production servers.
///
/// `build_path` must live on a btrfs filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct Btrfs;

impl Btrfs {
    fn run(&self, args: &[&str]) -> Result<(), FsError> {
        let cmd = format!("btrfs {}", args.join(" "));
        let output = Command::new("btrfs")
            .args(args)
            .output()
            .map_err(|e| FsError::Command { cmd: cmd.clone(), output: e.to_string() })?;

        if output.status.success() {
            return Ok(());
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !combined.is_empty() {
                combined.push_str("; ");
            }
            combined.push_str(stderr.trim());
        }
        Err(FsError::Command { cmd, output: combined })
    }
}

impl FileSystem for Btrfs {
    fn create(&self, path: &Path) -> Result<(), FsError> {
        let path = path.display().to_string();
        self.run(&["subvolume", "create", &path])
    }

    fn snapshot(&self, src: &Path, dst: &Path) -> Result<(), FsError> {
        let src = src.display().to_string();
        let dst = dst.display().to_string();
        self.run(&["subvolume", "snapshot", &src, &dst])
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        match std::fs::symlink_metadata(path) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(FsError::io(path, e)),
        }
        let path = path.display().to_string();
        self.run(&["subvolume", "delete", &path])
    }
}
