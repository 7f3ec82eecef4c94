// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kiln: schedule build jobs at a kiln server and fetch their artifacts.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod params;
mod transport;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kiln", about = "Schedule build jobs at the kiln service", disable_version_flag = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Schedule jobs and retrieve artifacts
    ///
    /// Dynamic job parameters follow `--` as `--key=value`. A value prefixed
    /// with `@` is replaced with the contents of the named file before
    /// submission. Keys prefixed with `_` are opaque: they are passed to the
    /// build but do not affect the result cache.
    Build(commands::build::BuildArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Build(args) => commands::build::run(args),
    };

    if let Err(e) = result {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
