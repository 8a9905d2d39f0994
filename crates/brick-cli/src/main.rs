//! # brick-cli
//!
//! Command line front end for brick, a package build tool for C and C++.
//!
//! This is the main entry point. It parses arguments, sets up logging and
//! dispatches to the command handlers. Errors are printed with a suggestion
//! where one applies, and the process exits non-zero.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::colors::ColorSupport;
use output::errors::ErrorFormatter;

/// Resolve C/C++ package dependencies and plan their builds
#[derive(Debug, Parser)]
#[command(name = "brick", version, about = "C/C++ package resolver and build planner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Registry base URL
    #[arg(long, global = true, value_name = "URL")]
    pub registry: Option<String>,

    /// Directory installed packages live in
    #[arg(long, global = true, value_name = "DIR")]
    pub module_cache: Option<Utf8PathBuf>,

    /// Resolve from local packages only
    #[arg(long, global = true)]
    pub offline: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve dependencies and print the dependency tree
    Tree {
        /// Path to brick.toml (searched upwards from the working directory by default)
        #[arg(long, value_name = "PATH")]
        manifest_path: Option<Utf8PathBuf>,
    },
    /// Resolve dependencies and print the build plan
    Plan {
        #[arg(long, value_name = "PATH")]
        manifest_path: Option<Utf8PathBuf>,
        /// Emit the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    debug!("Starting brick v{}", env!("CARGO_PKG_VERSION"));

    let colors = color_support(cli.no_color);
    match run_cli(cli, colors) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("{}", ErrorFormatter::with_colors(colors).format_error(&err));
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli, colors: ColorSupport) -> anyhow::Result<()> {
    let ctx = CommandContext::new(cli.registry, cli.module_cache, cli.offline, colors)?;
    commands::dispatch_command(cli.command, &ctx)
}

fn color_support(no_color: bool) -> ColorSupport {
    if no_color {
        ColorSupport::disabled()
    } else {
        ColorSupport::detect()
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "brick={0},brick_core={0},brick_config={0},brick_registry={0},brick_resolver={0}",
            level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
