// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container runtime adapter.
//!
//! The engine drives image builds and container runs through
//! [`ContainerRuntime`]; [`DockerCli`] implements it over the docker
//! command-line interface, and tests use the scriptable fake.

mod docker;
#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use docker::DockerCli;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRuntime;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("could not build image '{image}': {detail}")]
    ImageBuild { image: String, detail: String },

    #[error("could not run container '{container}': {detail}")]
    ContainerRun { container: String, detail: String },

    #[error("container operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Options for building a project image.
#[derive(Debug, Clone)]
pub struct ImageBuildOpts {
    pub image: String,
    /// Forwarded as the `uid` build argument.
    pub uid: String,
    /// Pull the parent image even if present locally.
    pub pull: bool,
    pub no_cache: bool,
}

/// Everything needed to create and run a build container.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub container: String,
    pub image: String,
    /// UID the container process runs as.
    pub uid: String,
    /// Host path bind-mounted at `/data` inside the container.
    pub data_dir: PathBuf,
    /// Additional host→container bind mounts.
    pub mounts: Vec<(String, String)>,
}

/// What a finished container run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Exit code of the container command.
    pub exit_code: i32,
    /// The container's stderr alone; stdout and stderr combined go to the
    /// build log.
    pub stderr: String,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Build an image from the tar build context, appending the build output
    /// to `log_path`.
    async fn build_image(
        &self,
        cancel: &CancellationToken,
        opts: ImageBuildOpts,
        context: &[u8],
        log_path: &Path,
    ) -> Result<(), RuntimeError>;

    /// Create and run a container to completion, appending its output to
    /// `log_path`. Pre-existing containers with the same name are renamed
    /// out of the way; the container is removed afterwards.
    async fn run_container(
        &self,
        cancel: &CancellationToken,
        spec: RunSpec,
        log_path: &Path,
    ) -> Result<RunOutcome, RuntimeError>;

    /// Remove dangling containers and images left behind by old builds.
    async fn prune(&self) -> Result<String, RuntimeError>;
}
