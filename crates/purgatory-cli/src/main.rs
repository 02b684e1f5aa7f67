mod cmd_clusters;
mod cmd_leaves;
mod cmd_purge;
mod config;
mod snapshot;

use anyhow::Context;
use clap::{Parser, Subcommand};
use purgatory_core::{PackageGraph, PurgeSimulator};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "purgatory",
    version,
    about = "Find installed packages that can be purged without breaking anything"
)]
struct Cli {
    /// Verbose output / debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// JSON config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// JSON package snapshot (`-` for stdin)
    #[arg(short, long, global = true, value_name = "FILE")]
    snapshot: Option<PathBuf>,
    /// Ignore recommends relationships between packages; typically allows
    /// purging more packages, use with care
    #[arg(short, long, global = true)]
    ignore_recommends: bool,
    /// Never remove this package as a side effect (repeatable)
    #[arg(long = "keep", global = true, value_name = "PACKAGE")]
    keep: Vec<String>,
    /// Let the cascade remove manually installed packages too
    #[arg(long, global = true)]
    include_manual: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List leaf packages; nothing else installed depends on them
    Leaves {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Purge packages and everything obsoleted by that
    Purge {
        /// Packages to purge
        #[arg(required = true, value_name = "PACKAGE")]
        packages: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Compare with a removal list computed elsewhere (one package per line)
        #[arg(long, value_name = "FILE")]
        expect: Option<PathBuf>,
    },
    /// Show dependency clusters and how they depend on each other
    Clusters {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Only show clusters with circular dependencies
        #[arg(long)]
        cycles_only: bool,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = config::load_config(cli.config.as_deref())?;
    config.apply_flags(&cli.keep, cli.ignore_recommends, cli.include_manual);

    let snapshot_path = cli
        .snapshot
        .or_else(|| config.snapshot.clone())
        .context("no package snapshot given; pass --snapshot or set `snapshot` in the config")?;
    let snapshot = snapshot::JsonSnapshot::new(snapshot_path);
    debug!(path = %snapshot.path().display(), "loading package snapshot");
    let graph = PackageGraph::from_provider(&snapshot)?;

    let sim = PurgeSimulator::with_options(&graph, config.purge_options());

    match cli.cmd {
        Command::Leaves { json } => cmd_leaves::execute(&sim, json),
        Command::Purge {
            packages,
            json,
            expect,
        } => cmd_purge::execute(&sim, &packages, json, expect.as_deref()),
        Command::Clusters { json, cycles_only } => cmd_clusters::execute(&sim, json, cycles_only),
    }
}
