// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixtures shared by unit and integration tests.

use crate::config::Config;
use crate::engine::Engine;
use crate::fs::PlainFs;
use crate::job::Job;
use crate::metrics::Recorder;
use crate::runtime::FakeRuntime;
use kiln_core::{FakeClock, Params};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// A projects root and build root on disk, plus a config pointing at them.
pub struct TestEnv {
    pub cfg: Arc<Config>,
    projects: TempDir,
    _builds: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let projects = TempDir::new().expect("projects tempdir");
        let builds = TempDir::new().expect("builds tempdir");
        let cfg = Arc::new(Config {
            addr: "127.0.0.1:0".to_string(),
            projects_path: projects.path().to_path_buf(),
            build_path: builds.path().to_path_buf(),
            mounts: Default::default(),
            uid: "1000".to_string(),
            concurrency: 2,
            backlog: 4,
        });
        Self { cfg, projects, _builds: builds }
    }

    /// Create a project directory with a placeholder Dockerfile.
    pub fn add_project(&self, name: &str) -> PathBuf {
        let dir = self.projects.path().join(name);
        std::fs::create_dir_all(&dir).expect("project dir");
        std::fs::write(dir.join("Dockerfile"), format!("FROM scratch\n# {name}\n"))
            .expect("Dockerfile");
        dir
    }

    /// Resolve a job against this environment's config.
    pub fn job(&self, project: &str, params: Params, group: &str) -> Job {
        Job::new(project, params, group, &self.cfg).expect("job")
    }

    /// An engine over the plain adapter and the given fake runtime, with a
    /// fast coalescing poll.
    pub fn engine(&self, runtime: FakeRuntime) -> Arc<Engine<FakeClock>> {
        self.engine_with_clock(runtime, FakeClock::new())
    }

    pub fn engine_with_clock(&self, runtime: FakeRuntime, clock: FakeClock) -> Arc<Engine<FakeClock>> {
        let recorder = Arc::new(Recorder::new().expect("recorder"));
        Arc::new(
            Engine::new(Arc::clone(&self.cfg), Arc::new(PlainFs), Arc::new(runtime), recorder, clock)
                .with_coalesce_interval(Duration::from_millis(20)),
        )
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
