// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin HTTP client for the kiln server.

use anyhow::{bail, Context, Result};
use kiln_core::JobRequest;
use std::time::Duration;

/// Submit a job request and return the raw response body.
///
/// With `no_wait` the server is asked to schedule the job and return
/// immediately (`?async`), so the body is empty.
pub fn submit_job(
    base_url: &str,
    request: &JobRequest,
    no_wait: bool,
    timeout: Duration,
) -> Result<String> {
    let url = if no_wait {
        format!("{base_url}/jobs?async")
    } else {
        format!("{base_url}/jobs")
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .context("cannot build HTTP client")?;

    let response = client.post(&url).json(request).send().map_err(|e| {
        if e.is_timeout() {
            anyhow::anyhow!("the build did not finish after {timeout:?}: {e}")
        } else {
            anyhow::anyhow!("cannot reach {url}: {e}")
        }
    })?;

    let status = response.status();
    let body = response.text().context("cannot read response body")?;

    if status != reqwest::StatusCode::CREATED {
        bail!("error creating job: {body}, http code: {status}");
    }

    Ok(body)
}
