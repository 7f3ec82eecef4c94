// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fetching build artifacts off the server.
//!
//! The server never ships artifact bytes itself; clients pull them with
//! stock tools. scp works everywhere SSH does; rsync (over the rsync
//! protocol, module `kiln`) only transfers what changed and is the
//! recommended choice for production.

use anyhow::{bail, Context, Result};
use kiln_core::TransportMethod;
use std::process::Command;

/// What to copy and where to put it.
pub struct CopyRequest {
    pub user: String,
    pub host: String,
    pub project: String,
    /// Remote source path, as reported in the build info.
    pub src: String,
    /// Local destination directory.
    pub dst: String,
    /// Empty the destination before copying.
    pub clear_dst: bool,
}

/// Download artifacts with the selected tool. Returns the tool's combined
/// output.
pub fn copy(method: TransportMethod, request: &CopyRequest) -> Result<String> {
    match method {
        TransportMethod::Scp => scp_copy(request),
        TransportMethod::Rsync => rsync_copy(request),
    }
}

fn scp_copy(request: &CopyRequest) -> Result<String> {
    if request.clear_dst {
        remove_dir_contents(&request.dst)
            .with_context(|| format!("cannot clear target '{}'", request.dst))?;
    }
    run(scp_args(request))
}

fn scp_args(request: &CopyRequest) -> Vec<String> {
    vec![
        "scp".to_string(),
        "-r".to_string(),
        format!("{}@{}:{}", request.user, request.host, request.src),
        request.dst.clone(),
    ]
}

fn rsync_copy(request: &CopyRequest) -> Result<String> {
    run(rsync_args(request)?)
}

fn rsync_args(request: &CopyRequest) -> Result<Vec<String>> {
    // The rsync daemon exports the build path as the `kiln` module, so the
    // remote path starts at the project component of the reported path.
    let Some(idx) = request.src.find(&request.project) else {
        bail!("expected '{}' to contain '{}'", request.src, request.project);
    };
    let module_src = &request.src[idx..];

    let mut args = vec!["rsync".to_string(), "-rtlp".to_string()];
    if request.clear_dst {
        args.push("--delete".to_string());
    }
    args.push(format!("{}@{}::kiln/{}", request.user, request.host, module_src));
    args.push(request.dst.clone());
    Ok(args)
}

fn run(args: Vec<String>) -> Result<String> {
    let output = Command::new(&args[0])
        .args(&args[1..])
        .output()
        .with_context(|| format!("cannot execute {}", args[0]))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        bail!("{} failed: {}", args[0], combined.trim());
    }
    Ok(combined)
}

fn remove_dir_contents(dir: &str) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
