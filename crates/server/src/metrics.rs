// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prometheus collectors exported on `/metrics`.

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::path::Path;
use std::time::Duration;

const NAMESPACE: &str = "kiln";

/// Holds the collectors the daemon uses to export build data.
pub struct Recorder {
    registry: Registry,

    builds_hosted: GaugeVec,
    builds_started: CounterVec,
    builds_finished: CounterVec,
    builds_coalesced: CounterVec,
    builds_incremental: CounterVec,
    builds_succeeded: HistogramVec,
    builds_failed: HistogramVec,
    cache_utilization: CounterVec,
}

impl Recorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let labels = &["project"];

        let builds_hosted = GaugeVec::new(
            Opts::new("builds_hosted", "Finished builds currently hosted by the server")
                .namespace(NAMESPACE),
            labels,
        )?;
        let builds_started = CounterVec::new(
            Opts::new("builds_started", "Builds started by the server").namespace(NAMESPACE),
            labels,
        )?;
        let builds_finished = CounterVec::new(
            Opts::new("builds_finished", "Builds finished").namespace(NAMESPACE),
            labels,
        )?;
        let builds_coalesced = CounterVec::new(
            Opts::new("builds_coalesced", "Builds that coalesced with an in-flight build")
                .namespace(NAMESPACE),
            labels,
        )?;
        let builds_incremental = CounterVec::new(
            Opts::new(
                "builds_processed_incrementally",
                "Builds that started from a cloned previous build",
            )
            .namespace(NAMESPACE),
            labels,
        )?;

        // buckets start at 2 minutes, in 2-minute steps
        let buckets = prometheus::linear_buckets(120.0, 120.0, 3)?;
        let builds_succeeded = HistogramVec::new(
            HistogramOpts::new("builds_succeeded_seconds", "Duration of successful builds")
                .namespace(NAMESPACE)
                .buckets(buckets.clone()),
            labels,
        )?;
        let builds_failed = HistogramVec::new(
            HistogramOpts::new("builds_failed_seconds", "Duration of failed builds")
                .namespace(NAMESPACE)
                .buckets(buckets),
            labels,
        )?;
        let cache_utilization = CounterVec::new(
            Opts::new("cache_utilization", "Build result cache hits").namespace(NAMESPACE),
            labels,
        )?;

        registry.register(Box::new(builds_hosted.clone()))?;
        registry.register(Box::new(builds_started.clone()))?;
        registry.register(Box::new(builds_finished.clone()))?;
        registry.register(Box::new(builds_coalesced.clone()))?;
        registry.register(Box::new(builds_incremental.clone()))?;
        registry.register(Box::new(builds_succeeded.clone()))?;
        registry.register(Box::new(builds_failed.clone()))?;
        registry.register(Box::new(cache_utilization.clone()))?;

        Ok(Self {
            registry,
            builds_hosted,
            builds_started,
            builds_finished,
            builds_coalesced,
            builds_incremental,
            builds_succeeded,
            builds_failed,
            cache_utilization,
        })
    }

    /// Record a build started, independently of its outcome.
    pub fn record_build_started(&self, project: &str) {
        self.builds_started.with_label_values(&[project]).inc();
    }

    /// Record a request served by joining an in-flight build.
    pub fn record_build_coalesced(&self, project: &str) {
        self.builds_coalesced.with_label_values(&[project]).inc();
    }

    /// Record a request served from the result cache.
    pub fn record_cache_hit(&self, project: &str) {
        self.cache_utilization.with_label_values(&[project]).inc();
    }

    /// Record a finished build, its outcome and duration.
    pub fn record_build_finished(
        &self,
        project: &str,
        success: bool,
        incremental: bool,
        duration: Duration,
    ) {
        self.builds_finished.with_label_values(&[project]).inc();
        if success {
            if incremental {
                self.builds_incremental.with_label_values(&[project]).inc();
            }
            self.builds_succeeded.with_label_values(&[project]).observe(duration.as_secs_f64());
        } else {
            self.builds_failed.with_label_values(&[project]).observe(duration.as_secs_f64());
        }
    }

    /// Refresh the hosted-builds gauge by counting `ready/` entries.
    pub fn record_hosted_builds(&self, build_path: &Path, projects_path: &Path) {
        let Ok(projects) = std::fs::read_dir(projects_path) else {
            tracing::warn!(path = %projects_path.display(), "cannot read projects directory");
            return;
        };

        for project in projects.flatten() {
            let name = project.file_name().to_string_lossy().into_owned();
            let ready = build_path.join(&name).join("ready");
            let count = match std::fs::read_dir(&ready) {
                Ok(entries) => entries.count(),
                Err(_) => continue,
            };
            self.builds_hosted.with_label_values(&[&name]).set(count as f64);
        }
    }

    /// Text exposition of every collector.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
