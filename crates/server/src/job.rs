// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identity and on-disk layout.
//!
//! A job is the unit of work: something that needs to be executed in order
//! to produce the desired artifacts. Two jobs with the same fingerprint are
//! interchangeable by definition.

use crate::archive;
use crate::config::Config;
use crate::fs::{ensure_dir_exists, FileSystem, FsError};
use crate::{ARTIFACTS_DIR, BUILD_INFO_NAME, BUILD_LOG_NAME, CACHE_DIR, DATA_DIR, IMG_CNT_PREFIX, PARAMS_DIR};
use kiln_core::{is_opaque, BuildInfo, JobRequest, Params};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("no project given")]
    EmptyProject,

    #[error("Unknown project '{0}'")]
    UnknownProject(String),

    #[error("could not archive project: {0}")]
    Archive(#[source] io::Error),
}

/// A fully-resolved job: user inputs plus every derived path and name the
/// engine needs. Created per request and discarded with the response.
#[derive(Debug, Clone)]
pub struct Job {
    /// Hex SHA-256 fingerprint over project, group, non-opaque parameters
    /// and the project archive.
    pub id: String,

    // user-provided
    pub project: String,
    pub params: Params,
    pub group: String,
    pub rebuild: bool,

    pub project_path: PathBuf,
    pub root_build_path: PathBuf,
    pub pending_build_path: PathBuf,
    pub ready_build_path: PathBuf,
    pub ready_data_path: PathBuf,

    /// `latest` for ungrouped jobs, `groups/<group>` otherwise.
    pub latest_build_path: PathBuf,

    // NOTE: these point into the pending directory; after promotion the
    // same file names live under ready_build_path.
    pub build_log_path: PathBuf,
    pub build_info_path: PathBuf,

    pub image: String,
    pub container: String,

    /// Deterministic tar of the project directory; doubles as the container
    /// build context.
    pub image_tar: Vec<u8>,
}

impl Job {
    /// Resolve a [`JobRequest`] against the configuration.
    pub fn from_request(request: &JobRequest, cfg: &Config) -> Result<Self, JobError> {
        let mut job = Self::new(&request.project, request.params.clone(), &request.group, cfg)?;
        job.rebuild = request.rebuild;
        Ok(job)
    }

    /// Create a job for `project`, archiving the project directory and
    /// computing the fingerprint.
    pub fn new(project: &str, params: Params, group: &str, cfg: &Config) -> Result<Self, JobError> {
        if project.is_empty() {
            return Err(JobError::EmptyProject);
        }

        let project_path = cfg.projects_path.join(project);
        let root_build_path = cfg.build_path.join(project);

        let latest_build_path = if group.is_empty() {
            root_build_path.join("latest")
        } else {
            root_build_path.join("groups").join(group)
        };

        let image_tar = archive::tar_directory(&project_path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                JobError::UnknownProject(project.to_string())
            } else {
                JobError::Archive(e)
            }
        })?;

        let mut hasher = Sha256::new();
        hasher.update(project.as_bytes());
        hasher.update(group.as_bytes());
        for (k, v) in &params {
            // params opaque to the build do not take part in the identity
            if is_opaque(k) {
                continue;
            }
            hasher.update(k.as_bytes());
            hasher.update(v.as_bytes());
        }
        hasher.update(&image_tar);
        let id = format!("{:x}", hasher.finalize());

        let pending_build_path = root_build_path.join("pending").join(&id);
        let ready_build_path = root_build_path.join("ready").join(&id);
        let ready_data_path = ready_build_path.join(DATA_DIR);
        let build_log_path = pending_build_path.join(BUILD_LOG_NAME);
        let build_info_path = pending_build_path.join(BUILD_INFO_NAME);

        Ok(Self {
            image: format!("{IMG_CNT_PREFIX}{project}"),
            container: format!("{IMG_CNT_PREFIX}{id}"),
            id,
            project: project.to_string(),
            params,
            group: group.to_string(),
            rebuild: false,
            project_path,
            root_build_path,
            pending_build_path,
            ready_build_path,
            ready_data_path,
            latest_build_path,
            build_log_path,
            build_info_path,
            image_tar,
        })
    }

    /// Server-relative URL of the job page.
    pub fn url(&self) -> String {
        format!("job/{}/{}", self.project, self.id)
    }

    /// Where the previous build's directory should be cloned from, or `None`
    /// for a from-scratch build.
    ///
    /// Cloning happens when the job carries a group and the group's latest
    /// symlink resolves to an existing directory.
    pub fn clone_src(&self) -> Option<PathBuf> {
        if self.group.is_empty() {
            return None;
        }
        match std::fs::canonicalize(&self.latest_build_path) {
            Ok(resolved) => Some(resolved),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(job = %self, "no latest build to clone from");
                None
            }
            Err(e) => {
                tracing::warn!(job = %self, error = %e, "could not resolve latest build link");
                None
            }
        }
    }

    /// Create the pending build directory, cloning a previous build when the
    /// group has one. Returns whether the build is incremental.
    pub fn bootstrap_build_dir(&self, fs: &dyn FileSystem) -> Result<bool, FsError> {
        let clone_src = self.clone_src();

        match &clone_src {
            None => fs.create(&self.pending_build_path)?,
            Some(src) => {
                fs.snapshot(src, &self.pending_build_path)?;
                // params are never reused across jobs
                let params_dir = self.pending_build_path.join(DATA_DIR).join(PARAMS_DIR);
                match std::fs::remove_dir_all(&params_dir) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(FsError::io(&params_dir, e)),
                }
            }
        }

        let data = self.pending_build_path.join(DATA_DIR);
        ensure_dir_exists(&data)?;
        ensure_dir_exists(&data.join(CACHE_DIR))?;
        ensure_dir_exists(&data.join(ARTIFACTS_DIR))?;
        ensure_dir_exists(&data.join(PARAMS_DIR))?;

        Ok(clone_src.is_some())
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = &self.id[..self.id.len().min(7)];
        write!(f, "{{project={} group={} id={}}}", self.project, self.group, short)
    }
}

/// Read the `build_info.json` of a build directory, optionally attaching the
/// build log to `container_stdouterr`.
pub fn read_build_info(job_path: &Path, with_log: bool) -> io::Result<BuildInfo> {
    let bytes = std::fs::read(job_path.join(BUILD_INFO_NAME))?;
    let mut info: BuildInfo = serde_json::from_slice(&bytes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    if with_log {
        info.container_stdouterr = read_job_logs(job_path)?;
    }

    Ok(info)
}

/// Read the combined container log of a build directory.
pub fn read_job_logs(job_path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(job_path.join(BUILD_LOG_NAME))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Which tree a job currently lives in, derived from the filesystem.
pub fn job_state(build_path: &Path, project: &str, id: &str) -> Option<&'static str> {
    if build_path.join(project).join("pending").join(id).exists() {
        return Some("pending");
    }
    if build_path.join(project).join("ready").join(id).exists() {
        return Some("ready");
    }
    None
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
