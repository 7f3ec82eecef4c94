// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kiln build` - schedule a job and fetch its artifacts.

use crate::client::submit_job;
use crate::params::{parse_duration, parse_dynamic};
use crate::transport::{self, CopyRequest};
use anyhow::{bail, Context, Result};
use clap::Args;
use kiln_core::{BuildInfo, JobRequest, TransportMethod};

#[derive(Args)]
pub struct BuildArgs {
    /// Host to connect to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to connect to
    #[arg(long, short = 'p', default_value_t = 8462)]
    pub port: u16,

    /// The job's project
    #[arg(long)]
    pub project: String,

    /// Group project builds (enables incremental building)
    #[arg(long, short = 'g', default_value = "")]
    pub group: String,

    /// Rebuild the project image from scratch
    #[arg(long)]
    pub rebuild: bool,

    /// Time to wait for the build to finish, e.g. 90s, 60m, 1h30m
    #[arg(long, default_value = "60m")]
    pub timeout: String,

    /// Schedule the job but don't wait for it or fetch the artifacts
    #[arg(long)]
    pub no_wait: bool,

    /// Method for fetching the artifacts: scp or rsync
    #[arg(long, default_value = "scp")]
    pub transport: String,

    /// User to fetch the artifacts with (defaults to the current user)
    #[arg(long, default_value = "")]
    pub transport_user: String,

    /// Local directory where the artifacts will be saved
    #[arg(long, short = 't', default_value = ".")]
    pub target: String,

    /// Remove the contents of the target directory before fetching
    #[arg(long)]
    pub clear_target: bool,

    /// Output the build result as JSON on stdout (implies quiet)
    #[arg(long)]
    pub json_result: bool,

    #[arg(long, short)]
    pub verbose: bool,

    /// Dynamic job parameters as --key=value; @file values are expanded
    #[arg(last = true)]
    pub params: Vec<String>,
}

pub fn run(args: BuildArgs) -> Result<()> {
    if args.host.is_empty() {
        bail!("host cannot be empty");
    }
    if args.target.is_empty() {
        bail!("target cannot be empty");
    }

    let method: TransportMethod =
        args.transport.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let timeout = parse_duration(&args.timeout)?;
    let verbose = args.verbose && !args.json_result;

    let request = JobRequest {
        project: args.project.clone(),
        params: parse_dynamic(&args.params)?,
        group: args.group.clone(),
        rebuild: args.rebuild,
    };

    let base_url = format!("http://{}:{}", args.host, args.port);
    if verbose {
        println!("Scheduling {:?} at {base_url}...", request);
    }

    let body = submit_job(&base_url, &request, args.no_wait, timeout)?;

    if args.no_wait {
        if verbose {
            println!("Build scheduled successfully");
        }
        return Ok(());
    }

    let info: BuildInfo =
        serde_json::from_str(&body).context("cannot parse build result")?;

    if args.json_result {
        println!("{body}");
    } else {
        println!("Logs can be found at {base_url}/{}", info.url);
    }

    if verbose {
        println!(
            "\nResult:\nStarted at: {} ExitCode: {} Cached: {} Coalesced: {} Incremental: {}\n\nLogs:\n{}",
            kiln_core::time_fmt::format_date(info.started_at),
            info.exit_code,
            info.cached,
            info.coalesced,
            info.incremental,
            info.container_stdouterr,
        );
    }

    if info.exit_code != 0 {
        if info.container_stderr.is_empty() {
            eprintln!("There are no container error logs.");
        } else {
            eprintln!("Container error logs:\n{}", info.container_stderr);
        }
        bail!("build failed with exit code {}", info.exit_code);
    }

    if verbose {
        println!("Copying artifacts to {}...", args.target);
    }

    let output = transport::copy(
        method,
        &CopyRequest {
            user: transport_user(&args.transport_user),
            host: args.host.clone(),
            project: args.project.clone(),
            src: format!("{}/*", info.path),
            dst: args.target.clone(),
            clear_dst: args.clear_target,
        },
    )?;
    print!("{output}");

    if verbose {
        println!("Artifacts copied to {}", args.target);
    }

    Ok(())
}

/// The explicit `--transport-user`, or the invoking user.
fn transport_user(explicit: &str) -> String {
    if !explicit.is_empty() {
        return explicit.to_string();
    }
    nix::unistd::User::from_uid(nix::unistd::Uid::current())
        .ok()
        .flatten()
        .map(|user| user.name)
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "root".to_string())
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
