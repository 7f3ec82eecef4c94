// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable container runtime for tests.

use super::{ContainerRuntime, ImageBuildOpts, RunOutcome, RunSpec, RuntimeError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type RunHook = Arc<dyn Fn(&RunSpec) + Send + Sync>;

/// In-memory [`ContainerRuntime`] with configurable outcomes.
///
/// The `on_run` hook stands in for the container process: it receives the
/// [`RunSpec`] and can write artifacts or cache files under `data_dir`.
#[derive(Clone, Default)]
pub struct FakeRuntime {
    inner: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    exit_code: i32,
    stderr: String,
    log_lines: Vec<String>,
    build_error: Option<String>,
    run_error: Option<String>,
    run_delay: Duration,
    on_run: Option<RunHook>,
    builds: Vec<ImageBuildOpts>,
    runs: Vec<RunSpec>,
    prune_calls: usize,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exit_code(self, code: i32) -> Self {
        self.inner.lock().exit_code = code;
        self
    }

    pub fn with_stderr(self, stderr: impl Into<String>) -> Self {
        self.inner.lock().stderr = stderr.into();
        self
    }

    pub fn with_log_line(self, line: impl Into<String>) -> Self {
        self.inner.lock().log_lines.push(line.into());
        self
    }

    pub fn with_build_error(self, detail: impl Into<String>) -> Self {
        self.inner.lock().build_error = Some(detail.into());
        self
    }

    pub fn with_run_error(self, detail: impl Into<String>) -> Self {
        self.inner.lock().run_error = Some(detail.into());
        self
    }

    pub fn with_run_delay(self, delay: Duration) -> Self {
        self.inner.lock().run_delay = delay;
        self
    }

    pub fn on_run(self, hook: impl Fn(&RunSpec) + Send + Sync + 'static) -> Self {
        self.inner.lock().on_run = Some(Arc::new(hook));
        self
    }

    /// Images built so far.
    pub fn builds(&self) -> Vec<String> {
        self.inner.lock().builds.iter().map(|b| b.image.clone()).collect()
    }

    /// Containers run so far.
    pub fn runs(&self) -> Vec<RunSpec> {
        self.inner.lock().runs.clone()
    }

    pub fn prune_calls(&self) -> usize {
        self.inner.lock().prune_calls
    }
}

fn append(log_path: &Path, text: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(log_path)?;
    file.write_all(text.as_bytes())
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn build_image(
        &self,
        _cancel: &CancellationToken,
        opts: ImageBuildOpts,
        _context: &[u8],
        log_path: &Path,
    ) -> Result<(), RuntimeError> {
        let error = {
            let mut state = self.inner.lock();
            state.builds.push(opts.clone());
            state.build_error.clone()
        };

        if let Some(detail) = error {
            return Err(RuntimeError::ImageBuild { image: opts.image, detail });
        }

        append(log_path, &format!("fake: built {}\n", opts.image))?;
        Ok(())
    }

    async fn run_container(
        &self,
        cancel: &CancellationToken,
        spec: RunSpec,
        log_path: &Path,
    ) -> Result<RunOutcome, RuntimeError> {
        let (delay, error, exit_code, stderr, log_lines, hook) = {
            let mut state = self.inner.lock();
            state.runs.push(spec.clone());
            (
                state.run_delay,
                state.run_error.clone(),
                state.exit_code,
                state.stderr.clone(),
                state.log_lines.clone(),
                state.on_run.clone(),
            )
        };

        if !delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(RuntimeError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if let Some(detail) = error {
            return Err(RuntimeError::ContainerRun { container: spec.container, detail });
        }

        for line in &log_lines {
            append(log_path, &format!("{line}\n"))?;
        }
        if !stderr.is_empty() {
            append(log_path, &stderr)?;
        }

        if let Some(hook) = hook {
            hook(&spec);
        }

        Ok(RunOutcome { exit_code, stderr })
    }

    async fn prune(&self) -> Result<String, RuntimeError> {
        self.inner.lock().prune_calls += 1;
        Ok("fake: pruned".to_string())
    }
}
