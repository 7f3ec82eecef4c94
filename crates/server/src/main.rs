// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kilnd: the kiln build service daemon.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use kiln_core::SystemClock;
use kiln_server::config::Config;
use kiln_server::engine::Engine;
use kiln_server::http::{router, AppState};
use kiln_server::metrics::Recorder;
use kiln_server::pool::WorkerPool;
use kiln_server::prune::prune_zombie_builds;
use kiln_server::rebuild::rebuild_images;
use kiln_server::fs;
use kiln_server::runtime::DockerCli;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kilnd", about = "A build orchestration service", disable_version_flag = true)]
struct Cli {
    /// Host and port to listen on
    #[arg(long, short = 'a', default_value = "0.0.0.0:8462")]
    addr: String,

    /// Configuration file
    #[arg(long, short = 'c', default_value = "config.json")]
    config: PathBuf,

    /// Filesystem adapter: plain or btrfs
    #[arg(long, default_value = "plain")]
    filesystem: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the container images of projects
    Rebuild {
        /// Exit immediately on the first error
        #[arg(long)]
        fail_fast: bool,

        /// Project to rebuild; may be repeated. All projects when omitted.
        #[arg(long, short)]
        project: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let file = std::fs::File::open(&cli.config)
        .with_context(|| format!("cannot open configuration {}", cli.config.display()))?;
    let cfg = Arc::new(Config::load(&cli.addr, file)?);

    let adapter = fs::lookup(&cli.filesystem).ok_or_else(|| {
        anyhow!("unknown filesystem '{}' (expected one of {:?})", cli.filesystem, fs::ADAPTER_NAMES)
    })?;

    match cli.command {
        Some(Command::Rebuild { fail_fast, project }) => {
            let runtime = DockerCli::default();
            let summary = rebuild_images(&cfg, &runtime, &project, fail_fast).await?;
            println!("Finished. {summary}");
            if !summary.is_success() {
                return Err(anyhow!("failed to rebuild some images: {summary}"));
            }
            Ok(())
        }
        None => serve(cfg, adapter).await,
    }
}

async fn serve(cfg: Arc<Config>, adapter: Arc<dyn fs::FileSystem>) -> anyhow::Result<()> {
    prune_zombie_builds(&cfg, adapter.as_ref())?;

    let recorder = Arc::new(Recorder::new()?);
    let engine = Arc::new(Engine::new(
        Arc::clone(&cfg),
        adapter,
        Arc::new(DockerCli::default()),
        Arc::clone(&recorder),
        SystemClock,
    ));

    let cancel = CancellationToken::new();
    let pool = Arc::new(WorkerPool::new(engine, cfg.concurrency, cfg.backlog, cancel.clone()));

    let state = Arc::new(AppState { cfg: Arc::clone(&cfg), pool: Arc::clone(&pool), recorder });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.addr)
        .await
        .with_context(|| format!("cannot listen on {}", cfg.addr))?;
    info!(addr = %cfg.addr, "listening");

    let shutdown_cancel = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_cancel.cancel();
        })
        .await?;

    // in-flight builds observed the cancellation; drain whatever is left
    match Arc::try_unwrap(pool) {
        Ok(pool) => pool.stop().await,
        Err(_) => warn!("handlers still hold the pool; skipping drain"),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
