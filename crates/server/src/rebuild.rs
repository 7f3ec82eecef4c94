// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator-invoked image rebuild across projects.

use crate::archive;
use crate::config::Config;
use crate::runtime::{ContainerRuntime, ImageBuildOpts};
use crate::IMG_CNT_PREFIX;
use std::fmt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RebuildError {
    #[error("cannot scan projects: {0}")]
    Scan(#[from] std::io::Error),
}

/// Per-project outcome of a rebuild pass.
#[derive(Debug, Default)]
pub struct RebuildSummary {
    pub rebuilt: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl RebuildSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for RebuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rebuilt {} image(s)", self.rebuilt.len())?;
        if !self.failed.is_empty() {
            write!(f, ", {} failed:", self.failed.len())?;
            for (project, reason) in &self.failed {
                write!(f, " [{project}: {reason}]")?;
            }
        }
        Ok(())
    }
}

/// Force-rebuild the images of `projects` (all projects when empty), then
/// prune whatever dangling resources the runtime accumulated.
///
/// With `fail_fast`, iteration stops at the first failure; the summary
/// records whatever happened up to that point.
pub async fn rebuild_images(
    cfg: &Config,
    runtime: &dyn ContainerRuntime,
    projects: &[String],
    fail_fast: bool,
) -> Result<RebuildSummary, RebuildError> {
    let projects: Vec<String> = if projects.is_empty() {
        list_projects(cfg)?
    } else {
        projects.to_vec()
    };

    let log_path = cfg.build_path.join("rebuild.log");
    let cancel = CancellationToken::new();
    let mut summary = RebuildSummary::default();

    for project in projects {
        let image = format!("{IMG_CNT_PREFIX}{project}");
        info!(%project, %image, "rebuilding image");

        let outcome = match archive::tar_directory(&cfg.projects_path.join(&project)) {
            Ok(context) => {
                runtime
                    .build_image(
                        &cancel,
                        ImageBuildOpts {
                            image,
                            uid: cfg.uid.clone(),
                            pull: true,
                            no_cache: true,
                        },
                        &context,
                        &log_path,
                    )
                    .await
                    .map_err(|e| e.to_string())
            }
            Err(e) => Err(format!("could not archive project: {e}")),
        };

        match outcome {
            Ok(()) => summary.rebuilt.push(project),
            Err(reason) => {
                error!(%project, %reason, "image rebuild failed");
                summary.failed.push((project, reason));
                if fail_fast {
                    break;
                }
            }
        }
    }

    match runtime.prune().await {
        Ok(output) => info!(%output, "pruned dangling runtime resources"),
        Err(e) => warn!(error = %e, "could not prune runtime resources"),
    }

    Ok(summary)
}

fn list_projects(cfg: &Config) -> Result<Vec<String>, RebuildError> {
    let mut projects: Vec<String> = std::fs::read_dir(&cfg.projects_path)?
        .flatten()
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    projects.sort();
    Ok(projects)
}

#[cfg(test)]
#[path = "rebuild_tests.rs"]
mod tests;
