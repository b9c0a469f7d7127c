//! Evaluator Driver (C2): spawns the package-manager binary with the
//! environment variables the evaluator programs (C1) expect, captures its
//! stdout/stderr per the §4.1 contract, and maps subprocess failures onto
//! the error taxonomy.

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread::JoinHandle;

use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::eval_programs::EvalPrograms;
use crate::model::{AttributePath, DerivationRecord, FinderTrace, FoundDrv};

const TRACE_PREFIX: &str = "trace: ";

/// Static configuration shared by every subprocess the driver spawns.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// The package-manager binary to invoke. Overridable so tests can
    /// point it at a hermetic stand-in.
    pub nix_program: String,
    pub flake_ref: String,
    pub system: String,
    /// Forwarded as `--option substitute false --option tarball-ttl 0`
    /// equivalents are left to the caller's environment; at the driver
    /// layer `offline` only controls whether `--offline` is passed.
    pub offline: bool,
    pub legacy_input_enumeration: bool,
}

pub struct EvaluatorDriver {
    programs: EvalPrograms,
    config: DriverConfig,
}

impl EvaluatorDriver {
    pub fn new(programs: EvalPrograms, config: DriverConfig) -> Self {
        Self { programs, config }
    }

    fn base_command(&self, file: &std::path::Path) -> Command {
        let mut cmd = Command::new(&self.config.nix_program);
        cmd.arg("eval")
            .arg("--json")
            .arg("--impure")
            .arg("--file")
            .arg(file)
            .arg("--include")
            .arg(format!(
                "nixtract-lib={}",
                self.programs.lib_path().display()
            ))
            .arg("--extra-experimental-features")
            .arg("flakes nix-command");
        if self.config.offline {
            cmd.arg("--offline");
        }
        cmd.env("TARGET_FLAKE_REF", &self.config.flake_ref);
        cmd.env("TARGET_SYSTEM", &self.config.system);
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Spawn the Finder and stream its discoveries on a dedicated reader
    /// thread. The returned `JoinHandle` resolves once the subprocess has
    /// exited; a non-zero exit (e.g. an invalid flake ref) is a fatal
    /// startup failure per §6/§7 and is surfaced through it. Individual
    /// malformed trace lines are logged and skipped — they never fail the
    /// handle.
    pub fn run_finder(&self) -> (Receiver<FoundDrv>, JoinHandle<Result<(), Error>>) {
        let mut cmd = self.base_command(self.programs.finder_path());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());

        let (tx, rx) = mpsc::channel();
        debug!(?cmd, "spawning finder");

        let handle = std::thread::Builder::new()
            .name("nixtract-finder".into())
            .spawn(move || -> Result<(), Error> {
                let mut child = cmd.spawn().map_err(|source| Error::Spawn {
                    program: "nix".to_string(),
                    source,
                })?;

                let stderr = child.stderr.take().expect("stderr was piped");
                let reader = BufReader::new(stderr);
                let mut stderr_tail = String::new();

                for line in reader.lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(_) => break,
                    };
                    if let Some(payload) = line.strip_prefix(TRACE_PREFIX) {
                        match serde_json::from_str::<FinderTrace>(payload) {
                            Ok(trace_line) => {
                                for found in trace_line.found_drvs {
                                    trace!(attribute_path = %found.attribute_path, "finder discovered");
                                    if tx.send(found).is_err() {
                                        // Receiver gone: the discovery
                                        // pipeline has already stopped
                                        // listening (fatal error
                                        // elsewhere). Keep draining the
                                        // child's stderr so it doesn't
                                        // block on a full pipe, but
                                        // there's no more work to do.
                                    }
                                }
                            }
                            Err(e) => {
                                warn!(line = %payload, error = %e, "skipping malformed finder trace line");
                            }
                        }
                    } else {
                        push_tail(&mut stderr_tail, &line);
                    }
                }

                let status = child.wait().map_err(|source| Error::Spawn {
                    program: "nix".to_string(),
                    source,
                })?;

                if status.success() {
                    Ok(())
                } else {
                    Err(Error::Eval {
                        program: "finder".to_string(),
                        attribute_path: None,
                        code: status.code(),
                        stderr_tail,
                    })
                }
            })
            .expect("failed to spawn finder reader thread");

        (rx, handle)
    }

    /// Describe one attribute path. Synchronous from the calling worker's
    /// point of view — a describer call is a blocking subprocess wait.
    pub fn describe(
        &self,
        attribute_path: &AttributePath,
        runtime_only: bool,
    ) -> Result<RawDescription, Error> {
        let mut cmd = self.base_command(self.programs.describer_path());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.env("TARGET_ATTRIBUTE_PATH", attribute_path.as_str());
        cmd.env("RUNTIME_ONLY", if runtime_only { "1" } else { "0" });
        cmd.env(
            "LEGACY_INPUT_ENUMERATION",
            if self.config.legacy_input_enumeration {
                "1"
            } else {
                "0"
            },
        );

        debug!(?cmd, %attribute_path, "spawning describer");
        let child = cmd.spawn().map_err(|source| Error::Spawn {
            program: "nix".to_string(),
            source,
        })?;

        // `wait_with_output` drains stdout and stderr concurrently (stderr
        // on a helper thread) before waiting on the child, unlike reading
        // each pipe to completion in sequence — the describer can write
        // more than a pipe buffer's worth of warnings to stderr before
        // closing stdout, which would otherwise deadlock the child against
        // this worker.
        let output = child.wait_with_output().map_err(|source| Error::Spawn {
            program: "nix".to_string(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(Error::Eval {
                program: "describer".to_string(),
                attribute_path: Some(attribute_path.0.clone()),
                code: output.status.code(),
                stderr_tail: tail(&stderr, 20),
            });
        }

        serde_json::from_str(&stdout).map_err(|e| Error::Parse {
            what: "describer stdout",
            detail: e.to_string(),
            input: truncate(&stdout, 2000),
        })
    }
}

fn push_tail(tail: &mut String, line: &str) {
    tail.push_str(line);
    tail.push('\n');
    // Keep only the last handful of lines so a runaway describer can't
    // pin an unbounded amount of stderr text in memory.
    let max_lines = 50;
    if tail.lines().count() > max_lines {
        let trimmed: String = tail
            .lines()
            .skip(tail.lines().count() - max_lines)
            .collect::<Vec<_>>()
            .join("\n");
        *tail = trimmed;
    }
}

fn tail(s: &str, max_lines: usize) -> String {
    s.lines()
        .rev()
        .take(max_lines)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        s.to_string()
    } else {
        format!("{}…", &s[..max_bytes])
    }
}

/// The intermediate shape the Describer emits on stdout (camelCase, per
/// §6). `describe_pipeline` turns this into the final `DerivationRecord`,
/// computing `parsed_name` Rust-side.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDescription {
    pub name: Option<String>,
    pub attribute_path: AttributePath,
    pub derivation_path: Option<crate::model::DerivationPath>,
    pub output_path: Option<crate::model::OutputPath>,
    pub outputs: Vec<RawOutput>,
    pub meta: RawMeta,
    pub src: Option<crate::model::SrcRef>,
    pub build_inputs: Vec<RawEdge>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawOutput {
    pub name: String,
    pub output_path: Option<crate::model::OutputPath>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMeta {
    pub pname: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub broken: Option<bool>,
    #[serde(default)]
    pub licenses: Vec<RawLicense>,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLicense {
    pub spdx_id: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEdge {
    pub build_input_type: String,
    pub attribute_path: Option<AttributePath>,
    pub output_path: Option<crate::model::OutputPath>,
}
