// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The HTTP surface: job submission, job pages, live logs and metrics.

mod tail;

pub use tail::Tailer;

use crate::config::Config;
use crate::engine::WorkError;
use crate::job::{self, Job, JobError};
use crate::metrics::Recorder;
use crate::pool::WorkerPool;
use crate::{BUILD_LOG_NAME, IMG_CNT_PREFIX};
use axum::extract::{Path as AxumPath, RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use futures_util::stream;
use kiln_core::{time_fmt, BuildInfo, JobRequest};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Shared context for all request handlers.
pub struct AppState {
    pub cfg: Arc<Config>,
    pub pool: Arc<WorkerPool>,
    pub recorder: Arc<Recorder>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/jobs", post(create_job))
        .route("/index/", get(index))
        .route("/job/{project}/{id}", get(show_job))
        .route("/log/{project}/{id}", get(stream_log))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn create_job(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    body: String,
) -> Response {
    let request: JobRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, format!("cannot parse request body: {e}"))
                .into_response();
        }
    };

    let job = match Job::from_request(&request, &state.cfg) {
        Ok(job) => job,
        Err(e @ JobError::UnknownProject(_)) => {
            return (StatusCode::NOT_FOUND, e.to_string()).into_response();
        }
        Err(e) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("cannot create job: {e}"))
                .into_response();
        }
    };

    let is_async = query.as_deref().is_some_and(has_async_flag);
    info!(job = %job, is_async, "scheduling");

    let future = match state.pool.send_work(job) {
        Ok(future) => future,
        Err(e) => return (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    };

    if is_async {
        // fire and forget; the worker builds in the background
        drop(future);
        return StatusCode::CREATED.into_response();
    }

    match future.wait().await {
        Ok(info) => (StatusCode::CREATED, Json(info)).into_response(),
        Err(e @ WorkError::UnknownProject(_)) => {
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

fn has_async_flag(query: &str) -> bool {
    query.split('&').any(|pair| pair == "async" || pair.starts_with("async="))
}

/// One row of the job index.
#[derive(Debug, Serialize)]
pub struct JobSummary {
    pub id: String,
    pub project: String,
    pub started_at: String,
    pub state: &'static str,
    #[serde(skip)]
    sort_key: DateTime<Utc>,
}

async fn index(State(state): State<Arc<AppState>>) -> Response {
    match list_jobs(&state.cfg) {
        Ok(jobs) => Json(jobs).into_response(),
        Err(e) => {
            warn!(error = %e, "cannot list jobs");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Collect every pending and ready job, newest first.
fn list_jobs(cfg: &Config) -> std::io::Result<Vec<JobSummary>> {
    let mut jobs = Vec::new();

    for project in std::fs::read_dir(&cfg.build_path)?.flatten() {
        let name = project.file_name().to_string_lossy().into_owned();
        for state in ["pending", "ready"] {
            let dir = cfg.build_path.join(&name).join(state);
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(_) => continue,
            };

            for entry in entries.flatten() {
                let id = entry.file_name().to_string_lossy().into_owned();
                // a build being written or promoted concurrently may be
                // unreadable for a moment; skip it instead of failing the
                // whole index
                match job::read_build_info(&entry.path(), false) {
                    Ok(info) => jobs.push(JobSummary {
                        id,
                        project: name.clone(),
                        started_at: time_fmt::format_date(info.started_at),
                        state,
                        sort_key: info.started_at,
                    }),
                    Err(e) => warn!(project = %name, id = %id, error = %e, "skipping unreadable build"),
                }
            }
        }
    }

    jobs.sort_by(|a, b| b.sort_key.cmp(&a.sort_key));
    Ok(jobs)
}

#[derive(Debug, Serialize)]
struct JobDetail {
    id: String,
    project: String,
    state: &'static str,
    build_info: BuildInfo,
    log: String,
}

async fn show_job(
    State(state): State<Arc<AppState>>,
    AxumPath((project, id)): AxumPath<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let Some(job_state) = job::job_state(&state.cfg.build_path, &project, &id) else {
        return (StatusCode::NOT_FOUND, format!("job with id={id} not found")).into_response();
    };

    let dir = state.cfg.build_path.join(&project).join(job_state).join(&id);
    let info = match job::read_build_info(&dir, false) {
        Ok(info) => info,
        Err(e) => {
            warn!(project = %project, id = %id, error = %e, "cannot read build info");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let log = job::read_job_logs(&dir).unwrap_or_default();

    if wants_json(&headers) {
        let detail = JobDetail { id, project, state: job_state, build_info: info, log };
        return Json(detail).into_response();
    }

    Html(render_job_page(&project, &id, job_state, &info, &log)).into_response()
}

fn wants_json(headers: &HeaderMap) -> bool {
    [header::ACCEPT, header::CONTENT_TYPE].iter().any(|name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"))
    })
}

fn render_job_page(project: &str, id: &str, state: &str, info: &BuildInfo, log: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{prefix}{project} — {id}</title></head>\n<body>\n\
         <h1>{project} <small>{id}</small></h1>\n\
         <p>state: {state} | exit code: {exit} | started: {started}</p>\n\
         <pre>{log}</pre>\n</body>\n</html>\n",
        prefix = IMG_CNT_PREFIX,
        project = escape_html(project),
        id = escape_html(id),
        state = state,
        exit = info.exit_code,
        started = time_fmt::format_date(info.started_at),
        log = escape_html(log),
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Poll cadence of the SSE log stream.
const TAIL_INTERVAL: Duration = Duration::from_millis(500);

async fn stream_log(
    State(state): State<Arc<AppState>>,
    AxumPath((project, id)): AxumPath<(String, String)>,
) -> Response {
    match job::job_state(&state.cfg.build_path, &project, &id) {
        Some("pending") => {}
        // a finished (or unknown) build has nothing live to stream
        _ => return StatusCode::NO_CONTENT.into_response(),
    }

    let root = state.cfg.build_path.join(&project);
    let tailer = Tailer::new(
        root.join("pending").join(&id).join(BUILD_LOG_NAME),
        root.join("ready").join(&id).join(BUILD_LOG_NAME),
        root.join("ready").join(&id),
    );

    let stream = stream::unfold(tailer, |mut tailer| async move {
        loop {
            if let Some(line) = tailer.pop_line() {
                return Some((Ok::<Event, Infallible>(Event::default().data(line)), tailer));
            }
            if tailer.is_finished() {
                return None;
            }
            if !tailer.poll() {
                tokio::time::sleep(TAIL_INTERVAL).await;
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    state.recorder.record_hosted_builds(&state.cfg.build_path, &state.cfg.projects_path);
    match state.recorder.encode() {
        Ok(text) => text.into_response(),
        Err(e) => {
            warn!(error = %e, "cannot encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
