// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container runtime over the docker command-line interface.

use super::{ContainerRuntime, ImageBuildOpts, RunOutcome, RunSpec, RuntimeError};
use crate::CONTAINER_DATA_DIR;
use async_trait::async_trait;
use rand::Rng;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Exit codes `docker run` reserves for itself; anything else is the exit
/// status of the containerized command.
const DOCKER_CLI_EXIT_CODES: [i32; 3] = [125, 126, 127];

#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self { binary: "docker".to_string() }
    }
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    /// Run a short docker command and return its stdout.
    async fn run_docker(&self, args: &[&str]) -> Result<String, RuntimeError> {
        let output = Command::new(&self.binary).args(args).output().await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RuntimeError::Io(std::io::Error::other(format!(
                "docker {} failed: {}",
                args.first().unwrap_or(&""),
                stderr.trim()
            ))))
        }
    }

    /// Rename any container holding `name` by appending a random suffix.
    /// Tolerates leftovers from a previous crashed run.
    async fn rename_if_exists(&self, name: &str) -> Result<(), RuntimeError> {
        let filter = format!("name=^/{name}$");
        let ids = self.run_docker(&["ps", "-aq", "--filter", &filter]).await?;
        for id in ids.lines().filter(|l| !l.is_empty()) {
            let renamed = format!("{}-renamed-{}", name, random_hex());
            tracing::warn!(container = name, renamed = %renamed, "renaming leftover container");
            self.run_docker(&["rename", id, &renamed]).await?;
        }
        Ok(())
    }

    /// Stream the child's output into the build log, wait for it and return
    /// its status along with the captured stderr.
    async fn stream_child(
        &self,
        cancel: &CancellationToken,
        mut child: tokio::process::Child,
        stdin_data: Option<Vec<u8>>,
        log_path: &Path,
    ) -> Result<(std::process::ExitStatus, String), RuntimeError> {
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let io = async {
            if let (Some(mut sink), Some(data)) = (stdin, stdin_data) {
                sink.write_all(&data).await?;
                sink.shutdown().await?;
            }
            let (out, err) = tokio::join!(
                drain(stdout, log_path, false),
                drain(stderr, log_path, true),
            );
            out?;
            err
        };

        let captured = tokio::select! {
            _ = cancel.cancelled() => None,
            res = io => Some(res),
        };
        let Some(captured) = captured else {
            return self.reap(child).await;
        };
        let captured = captured?;

        let status = tokio::select! {
            _ = cancel.cancelled() => None,
            status = child.wait() => Some(status),
        };
        let Some(status) = status else {
            return self.reap(child).await;
        };

        Ok((status?, captured))
    }

    async fn reap<T>(&self, mut child: tokio::process::Child) -> Result<T, RuntimeError> {
        let _ = child.start_kill();
        let _ = child.wait().await;
        Err(RuntimeError::Cancelled)
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn build_image(
        &self,
        cancel: &CancellationToken,
        opts: ImageBuildOpts,
        context: &[u8],
        log_path: &Path,
    ) -> Result<(), RuntimeError> {
        let uid_arg = format!("uid={}", opts.uid);
        let mut cmd = Command::new(&self.binary);
        cmd.args(["build", "-t", &opts.image, "--network", "host", "--force-rm"])
            .args(["--build-arg", &uid_arg]);
        if opts.pull {
            cmd.arg("--pull");
        }
        if opts.no_cache {
            cmd.arg("--no-cache");
        }
        cmd.arg("-");
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::info!(image = %opts.image, pull = opts.pull, no_cache = opts.no_cache, "building image");
        let child = cmd.spawn()?;
        let (status, stderr) =
            self.stream_child(cancel, child, Some(context.to_vec()), log_path).await?;

        if !status.success() {
            return Err(RuntimeError::ImageBuild {
                image: opts.image,
                detail: error_detail(&stderr, status),
            });
        }
        Ok(())
    }

    async fn run_container(
        &self,
        cancel: &CancellationToken,
        spec: RunSpec,
        log_path: &Path,
    ) -> Result<RunOutcome, RuntimeError> {
        self.rename_if_exists(&spec.container).await?;

        let data_mount = format!("{}:{}", spec.data_dir.display(), CONTAINER_DATA_DIR);
        let mut cmd = Command::new(&self.binary);
        cmd.args(["run", "--name", &spec.container, "--network", "host"])
            .args(["--user", &spec.uid])
            .args(["-v", &data_mount]);
        for (host, target) in &spec.mounts {
            cmd.args(["-v", &format!("{host}:{target}")]);
        }
        cmd.arg(&spec.image);
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::info!(container = %spec.container, image = %spec.image, "running container");
        let child = cmd.spawn()?;
        let streamed = self.stream_child(cancel, child, None, log_path).await;

        // The container is kept after exit only long enough to read its
        // state; remove it regardless of the outcome.
        let remove = self.run_docker(&["rm", "-f", &spec.container]).await;
        if let Err(e) = remove {
            tracing::warn!(container = %spec.container, error = %e, "cannot remove container");
        }

        let (status, stderr) = streamed?;
        match status.code() {
            Some(code) if DOCKER_CLI_EXIT_CODES.contains(&code) => Err(RuntimeError::ContainerRun {
                container: spec.container,
                detail: error_detail(&stderr, status),
            }),
            Some(code) => Ok(RunOutcome { exit_code: code, stderr }),
            None => Err(RuntimeError::ContainerRun {
                container: spec.container,
                detail: "terminated by signal".to_string(),
            }),
        }
    }

    async fn prune(&self) -> Result<String, RuntimeError> {
        let containers = self.run_docker(&["container", "prune", "-f"]).await?;
        let images = self.run_docker(&["image", "prune", "-f"]).await?;
        Ok(format!("{containers}\n{images}"))
    }
}

/// Append everything from `reader` to the build log; optionally return the
/// bytes as a string.
async fn drain(
    reader: Option<impl AsyncRead + Unpin>,
    log_path: &Path,
    capture: bool,
) -> std::io::Result<String> {
    let Some(mut reader) = reader else {
        return Ok(String::new());
    };

    let mut log = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .await?;

    let mut captured = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        tokio::io::AsyncWriteExt::write_all(&mut log, &buf[..n]).await?;
        if capture {
            captured.extend_from_slice(&buf[..n]);
        }
    }
    tokio::io::AsyncWriteExt::flush(&mut log).await?;
    Ok(String::from_utf8_lossy(&captured).into_owned())
}

fn error_detail(stderr: &str, status: std::process::ExitStatus) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        status.to_string()
    } else {
        // keep the tail; docker error output can be long
        let lines: Vec<&str> = trimmed.lines().collect();
        let start = lines.len().saturating_sub(5);
        lines[start..].join("\n")
    }
}

fn random_hex() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    bytes.iter().fold(String::with_capacity(16), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
