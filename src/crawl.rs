//! Wires C2–C8 together. `Crawl::run` is the one entry point both
//! `main.rs` and the integration tests call.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use tracing::{error, info};

use crate::describe_pipeline::PipelineContext;
use crate::discovery::{run_discovery, seed_from_root};
use crate::driver::{DriverConfig, EvaluatorDriver};
use crate::error::Error;
use crate::eval_programs::EvalPrograms;
use crate::model::AttributePath;
use crate::pool::WorkPool;
use crate::sink::OutputSink;
use crate::status::{StatusChannel, StatusCounts, StatusEvent};
use crate::visited::VisitedSet;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub flake_ref: String,
    pub system: String,
    pub attribute_root: Option<AttributePath>,
    pub runtime_only: bool,
    pub offline: bool,
    pub n_workers: Option<usize>,
    pub legacy_input_enumeration: bool,
    pub skip_attrs: HashSet<String>,
    /// The package-manager binary to invoke. Defaults to `"nix"`;
    /// overridable so tests can point it at a hermetic stand-in.
    pub nix_program: String,
    pub pretty: bool,
}

impl CrawlConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.flake_ref.trim().is_empty() {
            return Err(Error::Config("flake_ref must not be empty".to_string()));
        }
        if self.system.trim().is_empty() {
            return Err(Error::Config("system must not be empty".to_string()));
        }
        if let Some(0) = self.n_workers {
            return Err(Error::Config("n_workers must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// An optional callback invoked for every status event, in addition to the
/// running tallies `run` always returns. The CLI boundary uses this to
/// drive a progress spinner (`progress.rs`); it's dropped silently when
/// absent, matching §4.8's "best-effort, no back-pressure" rule.
pub type StatusObserver = Box<dyn FnMut(&StatusEvent) + Send>;

pub fn run<W>(
    config: CrawlConfig,
    writer: W,
    mut observer: Option<StatusObserver>,
) -> Result<StatusCounts, Error>
where
    W: Write + Send + 'static,
{
    config.validate()?;

    let programs = EvalPrograms::materialize()?;
    let driver = EvaluatorDriver::new(
        programs,
        DriverConfig {
            nix_program: config.nix_program.clone(),
            flake_ref: config.flake_ref.clone(),
            system: config.system.clone(),
            offline: config.offline,
            legacy_input_enumeration: config.legacy_input_enumeration,
        },
    );

    let (sink, output_sink) = OutputSink::spawn(writer, config.pretty, 256);
    let (status, status_rx) = StatusChannel::new(4096);

    let counts_handle = std::thread::Builder::new()
        .name("nixtract-status".into())
        .spawn(move || {
            let mut counts = StatusCounts::default();
            for event in status_rx {
                counts.apply(&event);
                if let Some(cb) = observer.as_mut() {
                    cb(&event);
                }
            }
            counts
        })
        .expect("failed to spawn status aggregation thread");

    let ctx = Arc::new(PipelineContext {
        driver,
        visited: VisitedSet::new(),
        sink,
        status,
        runtime_only: config.runtime_only,
        skip_attrs: config.skip_attrs.clone(),
    });

    let pool = WorkPool::new(config.n_workers)?;
    info!(
        workers = pool.current_num_threads(),
        flake_ref = %config.flake_ref,
        system = %config.system,
        "starting crawl"
    );

    let finder_result: Arc<std::sync::Mutex<Option<Result<(), Error>>>> =
        Arc::new(std::sync::Mutex::new(None));
    let attribute_root = config.attribute_root.clone();

    {
        let ctx = Arc::clone(&ctx);
        let finder_result = Arc::clone(&finder_result);

        pool.run_until_drained(move |scope| match attribute_root {
            Some(root) => {
                seed_from_root(scope, Arc::clone(&ctx), root);
            }
            None => {
                run_discovery(scope, Arc::clone(&ctx), move |result| {
                    *finder_result.lock().unwrap() = Some(result);
                });
            }
        });
    }

    drop(ctx);

    if let Some(Err(e)) = finder_result.lock().unwrap().take() {
        error!(error = %e, "finder failed");
        // Draining already happened (the scope only returns after every
        // spawned task completes); flush what we have before surfacing
        // the fatal error.
        output_sink.join()?;
        counts_handle.join().expect("status thread panicked");
        return Err(e);
    }

    output_sink.join()?;
    let counts = counts_handle.join().expect("status thread panicked");
    Ok(counts)
}
