//! Ambient configuration (§11 of SPEC_FULL.md): one `Config` struct,
//! populated by merging defaults, `NIXTRACT_*` environment variables, and
//! CLI flags (lowest to highest precedence), then validated once.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::common::Memoized;
use crate::error::Error;

const DEFAULT_FLAKE_REF: &str = "nixpkgs";

static HOST_SYSTEM: Memoized<String> = Memoized::new();

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub flake_ref: String,
    pub attribute_root: Option<String>,
    pub system: Option<String>,
    pub runtime_only: bool,
    pub offline: bool,
    pub n_workers: Option<usize>,
    pub output: Option<String>,
    pub pretty: bool,
    pub legacy_input_enumeration: bool,
    pub skip_attrs: Vec<String>,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flake_ref: DEFAULT_FLAKE_REF.to_string(),
            attribute_root: None,
            system: None,
            runtime_only: false,
            offline: false,
            n_workers: None,
            output: None,
            pretty: false,
            legacy_input_enumeration: false,
            skip_attrs: Vec::new(),
            verbose: false,
        }
    }
}

impl Config {
    /// Apply `NIXTRACT_*` environment overrides on top of `self`. Called
    /// before CLI flags are layered in, so flags always win.
    pub fn apply_env(mut self) -> Self {
        if let Ok(v) = std::env::var("NIXTRACT_FLAKE_REF") {
            self.flake_ref = v;
        }
        if let Ok(v) = std::env::var("NIXTRACT_ATTRIBUTE_ROOT") {
            self.attribute_root = Some(v);
        }
        if let Ok(v) = std::env::var("NIXTRACT_SYSTEM") {
            self.system = Some(v);
        }
        if let Ok(v) = std::env::var("NIXTRACT_RUNTIME_ONLY") {
            self.runtime_only = parse_bool_env(&v, self.runtime_only);
        }
        if let Ok(v) = std::env::var("NIXTRACT_OFFLINE") {
            self.offline = parse_bool_env(&v, self.offline);
        }
        if let Ok(v) = std::env::var("NIXTRACT_WORKERS") {
            if let Ok(n) = v.parse() {
                self.n_workers = Some(n);
            }
        }
        if let Ok(v) = std::env::var("NIXTRACT_OUTPUT") {
            self.output = Some(v);
        }
        if let Ok(v) = std::env::var("NIXTRACT_PRETTY") {
            self.pretty = parse_bool_env(&v, self.pretty);
        }
        if let Ok(v) = std::env::var("NIXTRACT_SKIP_ATTRS") {
            self.skip_attrs = split_csv(&v);
        }
        self
    }

    pub fn skip_attrs_set(&self) -> HashSet<String> {
        self.skip_attrs.iter().cloned().collect()
    }

    /// The system to evaluate against, defaulting to the host's own if the
    /// caller never named one — the teacher's own `nix.rs` falls back the
    /// same way when asking the daemon for its store's system.
    pub fn resolved_system(&self) -> String {
        self.system.clone().unwrap_or_else(current_system)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.flake_ref.trim().is_empty() {
            return Err(Error::Config("flake_ref must not be empty".to_string()));
        }
        if let Some(0) = self.n_workers {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        if let Some(root) = &self.attribute_root {
            if root.trim().is_empty() {
                return Err(Error::Config(
                    "attribute_root, if given, must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn parse_bool_env(v: &str, previous: bool) -> bool {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => previous,
    }
}

fn split_csv(v: &str) -> Vec<String> {
    v.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Best-effort host system triple (`x86_64-linux`, `aarch64-darwin`, ...),
/// used only as a last-resort default when neither `--system` nor
/// `NIXTRACT_SYSTEM` is given. `std::env::consts` never changes within a
/// process, so the computed triple is memoized after the first call.
fn current_system() -> String {
    if let Some(cached) = HOST_SYSTEM.get() {
        return cached;
    }
    let arch = std::env::consts::ARCH;
    let os = match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    };
    let system = format!("{arch}-{os}");
    HOST_SYSTEM.set(system.clone());
    system
}
