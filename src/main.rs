//! nixtract — extracts the complete directed graph of a flake's build
//! derivations to JSONL on stdout or to a file.

use std::fs::File;
use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use clap::Parser;

use nixtract::config::Config;
use nixtract::model::AttributePath;
use nixtract::progress::CrawlProgress;
use nixtract::{CrawlConfig, StatusObserver};

/// Extract the complete directed graph of a flake's build derivations.
#[derive(Parser)]
#[command(name = "nixtract")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Flake reference to crawl, e.g. `nixpkgs` or `github:NixOS/nixpkgs`.
    #[arg(default_value = "nixpkgs")]
    flake_ref: String,

    /// Attribute path to start from, bypassing the Finder entirely.
    #[arg(long)]
    attribute_root: Option<String>,

    /// System to evaluate for, e.g. `x86_64-linux`. Defaults to the host.
    #[arg(long)]
    system: Option<String>,

    /// Only traverse runtime dependencies, skipping build-time-only edges.
    #[arg(long)]
    runtime_only: bool,

    /// Pass `--offline` through to the evaluator subprocesses.
    #[arg(long)]
    offline: bool,

    /// Number of worker threads. Defaults to the host's available parallelism.
    #[arg(long)]
    workers: Option<usize>,

    /// Output file. Defaults to stdout.
    #[arg(long, short)]
    output: Option<String>,

    /// Pretty-print each JSON record (still one record per logical entry).
    #[arg(long)]
    pretty: bool,

    /// Use the fixed-list (buildInputs/propagatedBuildInputs/nativeBuildInputs)
    /// edge enumeration instead of scanning every attribute.
    #[arg(long)]
    legacy_input_enumeration: bool,

    /// Comma-separated attribute paths to never submit to the pool.
    #[arg(long, value_delimiter = ',')]
    skip_attr: Vec<String>,

    /// Enable verbose (DEBUG) logging.
    #[arg(short, long, global = true)]
    verbose: bool,
}

impl Cli {
    /// Layer `NIXTRACT_*` environment variables under whatever the user
    /// actually typed — clap already applied its own defaults, so a field
    /// only gets the environment's value when it's still at clap's default.
    fn into_config(self) -> Config {
        let mut config = Config::default().apply_env();

        if self.flake_ref != "nixpkgs" {
            config.flake_ref = self.flake_ref;
        }
        if self.attribute_root.is_some() {
            config.attribute_root = self.attribute_root;
        }
        if self.system.is_some() {
            config.system = self.system;
        }
        config.runtime_only |= self.runtime_only;
        config.offline |= self.offline;
        if self.workers.is_some() {
            config.n_workers = self.workers;
        }
        if self.output.is_some() {
            config.output = self.output;
        }
        config.pretty |= self.pretty;
        config.legacy_input_enumeration |= self.legacy_input_enumeration;
        if !self.skip_attr.is_empty() {
            config.skip_attrs = self.skip_attr;
        }
        config.verbose |= self.verbose;
        config
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        tracing::error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.into_config();
    config.validate().context("invalid configuration")?;

    let crawl_config = CrawlConfig {
        flake_ref: config.flake_ref.clone(),
        system: config.resolved_system(),
        attribute_root: config.attribute_root.clone().map(AttributePath::from),
        runtime_only: config.runtime_only,
        offline: config.offline,
        n_workers: config.n_workers,
        legacy_input_enumeration: config.legacy_input_enumeration,
        skip_attrs: config.skip_attrs_set(),
        nix_program: "nix".to_string(),
        pretty: config.pretty,
    };

    let observer: Option<StatusObserver> = if io::stderr().is_terminal() {
        Some(CrawlProgress::new().into_observer())
    } else {
        None
    };

    let counts = match &config.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create output file '{path}'"))?;
            nixtract::run(crawl_config, file, observer)?
        }
        None => nixtract::run(crawl_config, io::stdout(), observer)?,
    };

    tracing::info!(
        queued = counts.queued,
        described = counts.described,
        failed = counts.failed,
        "crawl finished"
    );

    Ok(())
}
