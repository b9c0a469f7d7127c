//! C1 support: the two evaluator programs are data, not code, from the
//! driver's point of view. They're embedded in the binary so the tool is
//! self-contained, then materialised to a scratch directory once per run
//! (the teacher's `get_nix_dir`/`find_nix_dir` do the equivalent lookup for
//! its installed-vs-development `eval.nix`; here we skip the lookup
//! entirely and just write our own copy every time).

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::Error;

const LIB_NIX: &str = include_str!("resources/lib.nix");
const FINDER_NIX: &str = include_str!("resources/finder.nix");
const DESCRIBER_NIX: &str = include_str!("resources/describer.nix");

/// Owns the scratch directory the two programs (and the shared library
/// they both `import <nixtract-lib>`) are written into. Scoped to the run:
/// dropping this deletes the directory.
pub struct EvalPrograms {
    _dir: TempDir,
    lib_path: PathBuf,
    finder_path: PathBuf,
    describer_path: PathBuf,
}

impl EvalPrograms {
    pub fn materialize() -> Result<Self, Error> {
        let dir = tempfile::Builder::new()
            .prefix("nixtract-")
            .tempdir()
            .map_err(|source| Error::Spawn {
                program: "mkdtemp".to_string(),
                source,
            })?;

        let lib_path = dir.path().join("lib.nix");
        let finder_path = dir.path().join("finder.nix");
        let describer_path = dir.path().join("describer.nix");

        write(&lib_path, LIB_NIX)?;
        write(&finder_path, FINDER_NIX)?;
        write(&describer_path, DESCRIBER_NIX)?;

        Ok(Self {
            _dir: dir,
            lib_path,
            finder_path,
            describer_path,
        })
    }

    pub fn lib_path(&self) -> &Path {
        &self.lib_path
    }

    pub fn finder_path(&self) -> &Path {
        &self.finder_path
    }

    pub fn describer_path(&self) -> &Path {
        &self.describer_path
    }
}

fn write(path: &Path, contents: &str) -> Result<(), Error> {
    std::fs::write(path, contents).map_err(|source| Error::Io {
        path: Some(path.to_path_buf()),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materializes_all_three_files() {
        let programs = EvalPrograms::materialize().unwrap();
        assert!(programs.lib_path().is_file());
        assert!(programs.finder_path().is_file());
        assert!(programs.describer_path().is_file());
        assert_eq!(
            std::fs::read_to_string(programs.lib_path()).unwrap(),
            LIB_NIX
        );
    }
}
