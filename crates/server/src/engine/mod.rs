// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job engine.
//!
//! [`Engine::work`] drives a job through the protocol state machine:
//! cache probe → coalesce or admit → bootstrap → image build → container
//! run → promote → link. Every step is crash-safe with respect to the
//! on-disk invariants: `ready/` only ever holds complete builds, `pending/`
//! is garbage after a restart, and `latest` only points at successful
//! builds.

use crate::config::Config;
use crate::fs::{ensure_dir_exists, FileSystem, FsError};
use crate::job::{self, Job};
use crate::metrics::Recorder;
use crate::pending_set::PendingSet;
use crate::project_locks::ProjectLocks;
use crate::runtime::{ContainerRuntime, ImageBuildOpts, RunSpec, RuntimeError};
use crate::{ARTIFACTS_DIR, DATA_DIR, PARAMS_DIR};
use kiln_core::{BuildInfo, Clock, SystemClock, TransportMethod};
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum WorkError {
    #[error("Unknown project '{0}'")]
    UnknownProject(String),

    #[error("cancelled while waiting for pending build")]
    Cancelled,

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{context}: {source}")]
    Fs {
        context: &'static str,
        #[source]
        source: FsError,
    },

    #[error(transparent)]
    Runtime(RuntimeError),

    #[error("could not serialize build info: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("could not move pending path: {source}")]
    Promote {
        #[source]
        source: io::Error,
    },

    #[error("could not move pending path: {source}; {previous}")]
    PromoteMerged {
        source: io::Error,
        previous: Box<WorkError>,
    },

    #[error("worker exited before producing a result")]
    LostWorker,
}

impl From<RuntimeError> for WorkError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::Cancelled => WorkError::Cancelled,
            other => WorkError::Runtime(other),
        }
    }
}

fn io_err(context: &'static str) -> impl FnOnce(io::Error) -> WorkError {
    move |source| WorkError::Io { context, source }
}

fn fs_err(context: &'static str) -> impl FnOnce(FsError) -> WorkError {
    move |source| WorkError::Fs { context, source }
}

/// The orchestrator. One engine is constructed at startup and shared by all
/// workers; it owns the pending-set and the project lock map.
pub struct Engine<C: Clock = SystemClock> {
    cfg: Arc<Config>,
    fs: Arc<dyn FileSystem>,
    runtime: Arc<dyn ContainerRuntime>,
    recorder: Arc<Recorder>,
    pending: PendingSet,
    locks: ProjectLocks,
    clock: C,
    coalesce_interval: Duration,
}

impl<C: Clock> Engine<C> {
    pub fn new(
        cfg: Arc<Config>,
        fs: Arc<dyn FileSystem>,
        runtime: Arc<dyn ContainerRuntime>,
        recorder: Arc<Recorder>,
        clock: C,
    ) -> Self {
        Self {
            cfg,
            fs,
            runtime,
            recorder,
            pending: PendingSet::new(),
            locks: ProjectLocks::new(),
            clock,
            coalesce_interval: Duration::from_secs(2),
        }
    }

    /// Override how often coalescing waiters poll for the ready directory.
    pub fn with_coalesce_interval(mut self, interval: Duration) -> Self {
        self.coalesce_interval = interval;
        self
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.cfg
    }

    /// Perform the work denoted by `job` and return its [`BuildInfo`].
    pub async fn work(&self, cancel: &CancellationToken, job: &Job) -> Result<BuildInfo, WorkError> {
        let start = self.clock.now();

        // Cache probe. A failed previous build is removed so it can be
        // retried; a successful one is the result.
        match std::fs::metadata(&job.ready_build_path) {
            Ok(_) => {
                let mut existing = job::read_build_info(&job.ready_build_path, true)
                    .map_err(io_err("could not read build info of ready build"))?;
                if existing.exit_code == 0 {
                    existing.cached = true;
                    existing.url = job.url();
                    self.recorder.record_cache_hit(&job.project);
                    debug!(job = %job, "cache hit");
                    return Ok(existing);
                }
                self.fs
                    .remove(&job.ready_build_path)
                    .map_err(fs_err("could not remove existing failed build"))?;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err("could not check for ready path")(e)),
        }

        // Coalesce or admit. Exactly one request per fingerprint builds;
        // later arrivals wait on its result.
        if !self.pending.add(&job.id) {
            return self.coalesce(cancel, job).await;
        }
        let _admitted = self.pending.defer_delete(&job.id);

        match std::fs::metadata(&job.project_path) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(WorkError::UnknownProject(job.project.clone()));
            }
            Err(e) => return Err(io_err("could not check for project")(e)),
        }

        self.bootstrap_project(job).await?;
        self.recorder.record_build_started(&job.project);
        info!(job = %job, "building");

        let mut info = BuildInfo::new(self.clock.timestamp());
        info.params = job.params.clone();
        info.group = job.group.clone();
        info.path = job.ready_data_path.join(ARTIFACTS_DIR).display().to_string();
        info.transport_method = TransportMethod::Rsync;
        info.url = job.url();

        let build_err = self.build(cancel, job, &mut info, start).await.err();
        self.finalize(job, info, build_err, start).await
    }

    /// Steps between admission and promotion. Any error falls through to the
    /// finalizer so the pending directory is still promoted and the error
    /// persisted.
    async fn build(
        &self,
        cancel: &CancellationToken,
        job: &Job,
        info: &mut BuildInfo,
        start: Instant,
    ) -> Result<(), WorkError> {
        info.incremental = job
            .bootstrap_build_dir(self.fs.as_ref())
            .map_err(fs_err("could not bootstrap build dir"))?;

        persist_info(&job.build_info_path, info)?;
        self.write_params(job)?;

        std::fs::File::create(&job.build_log_path)
            .map_err(io_err("could not create build log file"))?;

        self.runtime
            .build_image(
                cancel,
                ImageBuildOpts {
                    image: job.image.clone(),
                    uid: self.cfg.uid.clone(),
                    pull: job.rebuild,
                    no_cache: job.rebuild,
                },
                &job.image_tar,
                &job.build_log_path,
            )
            .await?;

        let outcome = self.runtime.run_container(cancel, self.run_spec(job), &job.build_log_path).await?;
        info.exit_code = outcome.exit_code;
        info.container_stderr = outcome.stderr;
        info.duration = self.clock.now().duration_since(start);

        // Log fields stay out of the persisted file; the log itself lives
        // next to it in out.log.
        persist_info(&job.build_info_path, info)?;

        info.container_stdouterr = job::read_job_logs(&job.pending_build_path)
            .map_err(io_err("could not read the job logs"))?;

        Ok(())
    }

    /// Promotion, `latest` link and error persistence, applied from the
    /// aggregated outcome of the build steps.
    async fn finalize(
        &self,
        job: &Job,
        mut info: BuildInfo,
        build_err: Option<WorkError>,
        start: Instant,
    ) -> Result<BuildInfo, WorkError> {
        let mut err = build_err;

        if let Err(rename_err) = std::fs::rename(&job.pending_build_path, &job.ready_build_path) {
            err = Some(match err.take() {
                Some(previous) => WorkError::PromoteMerged {
                    source: rename_err,
                    previous: Box::new(previous),
                },
                None => WorkError::Promote { source: rename_err },
            });
        }

        // `latest` must only ever point at a successful build, so the link
        // is skipped both on engine errors and on non-zero exits.
        if err.is_none() && info.exit_code == 0 {
            if let Err(e) = self.update_latest(job).await {
                err = Some(e);
            }
        }

        let duration = self.clock.now().duration_since(start);
        match err {
            None => {
                self.recorder.record_build_finished(
                    &job.project,
                    info.exit_code == 0,
                    info.incremental,
                    duration,
                );
                info!(job = %job, exit_code = info.exit_code, ?duration, "finished");
                Ok(info)
            }
            Some(e) => {
                self.recorder.record_build_finished(&job.project, false, info.incremental, duration);
                info.err_build = Some(e.to_string());
                info.duration = duration;

                // Best effort: leave the error next to whatever of the build
                // survived, so it is visible to later readers.
                let dir = if job.ready_build_path.exists() {
                    &job.ready_build_path
                } else {
                    &job.pending_build_path
                };
                if let Err(persist_err) = persist_info(&dir.join(crate::BUILD_INFO_NAME), &info) {
                    warn!(job = %job, error = %persist_err, "could not persist build error");
                }

                Err(e)
            }
        }
    }

    /// Wait for the in-flight identical build to appear under `ready/`.
    async fn coalesce(&self, cancel: &CancellationToken, job: &Job) -> Result<BuildInfo, WorkError> {
        self.recorder.record_build_coalesced(&job.project);
        debug!(job = %job, "waiting for in-flight build");

        let mut ticker = tokio::time::interval(self.coalesce_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // the first tick is immediate

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(WorkError::Cancelled),
                _ = ticker.tick() => {}
            }

            match std::fs::metadata(&job.ready_build_path) {
                Ok(_) => {
                    let ready = job::read_build_info(&job.ready_build_path, false)
                        .map_err(io_err("could not read build info of finished build"))?;

                    let mut info = BuildInfo::new(self.clock.timestamp());
                    info.params = job.params.clone();
                    info.group = job.group.clone();
                    info.path = job.ready_data_path.join(ARTIFACTS_DIR).display().to_string();
                    info.transport_method = TransportMethod::Rsync;
                    info.url = job.url();
                    info.exit_code = ready.exit_code;
                    info.coalesced = true;
                    return Ok(info);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(io_err("could not wait for ready build")(e)),
            }
        }
    }

    /// Ensure the project's build tree exists. Idempotent.
    async fn bootstrap_project(&self, job: &Job) -> Result<(), WorkError> {
        let _guard = self.locks.lock(&job.project).await;

        ensure_dir_exists(&job.root_build_path).map_err(fs_err("could not bootstrap project"))?;
        ensure_dir_exists(&job.root_build_path.join("pending"))
            .map_err(fs_err("could not bootstrap project"))?;
        ensure_dir_exists(&job.root_build_path.join("ready"))
            .map_err(fs_err("could not bootstrap project"))?;
        if !job.group.is_empty() {
            ensure_dir_exists(&job.root_build_path.join("groups"))
                .map_err(fs_err("could not bootstrap project"))?;
        }
        Ok(())
    }

    /// Point the `latest` (or group) symlink at the freshly promoted build.
    ///
    /// Runs under the project lock: two jobs of the same project finishing
    /// together must not interleave the remove and the create.
    async fn update_latest(&self, job: &Job) -> Result<(), WorkError> {
        let _guard = self.locks.lock(&job.project).await;

        match std::fs::symlink_metadata(&job.latest_build_path) {
            Ok(_) => std::fs::remove_file(&job.latest_build_path)
                .map_err(io_err("could not remove latest build link"))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err("could not stat the latest build link")(e)),
        }

        std::os::unix::fs::symlink(&job.ready_build_path, &job.latest_build_path)
            .map_err(io_err("could not create latest build link"))
    }

    fn write_params(&self, job: &Job) -> Result<(), WorkError> {
        let params_dir = job.pending_build_path.join(DATA_DIR).join(PARAMS_DIR);
        for (key, value) in &job.params {
            let path = params_dir.join(key);
            std::fs::write(&path, value).map_err(io_err("could not write param file"))?;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644))
                .map_err(io_err("could not set param file mode"))?;
        }
        Ok(())
    }

    fn run_spec(&self, job: &Job) -> RunSpec {
        RunSpec {
            container: job.container.clone(),
            image: job.image.clone(),
            uid: self.cfg.uid.clone(),
            data_dir: job.pending_build_path.join(DATA_DIR),
            mounts: self.cfg.mounts.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

fn persist_info(path: &Path, info: &BuildInfo) -> Result<(), WorkError> {
    let bytes = serde_json::to_vec(&info.stripped())?;
    std::fs::write(path, bytes).map_err(io_err("could not write build info to file"))
}

#[cfg(test)]
#[path = "work_tests.rs"]
mod tests;
