// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic tar of a project directory, used both as the container
//! build context and as input to the job fingerprint.

use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Archive every regular file under `root`, paths relative to `root`,
/// walked in lexical order so identical trees produce identical bytes.
pub fn tar_directory(root: &Path) -> io::Result<Vec<u8>> {
    // A missing project directory must surface as NotFound to the caller.
    std::fs::metadata(root)?;

    let mut builder = tar::Builder::new(Vec::new());

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry.map_err(|e| e.into_io_error().unwrap_or_else(|| io::Error::other("walk failed")))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| io::Error::other("path outside archive root"))?;
        builder.append_path_with_name(entry.path(), rel)?;
    }

    builder.into_inner()
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
