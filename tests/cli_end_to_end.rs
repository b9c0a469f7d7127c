//! Drives the actual `nixtract` binary, with a hermetic `nix` stand-in
//! placed first on `PATH` so the crawl can run without a real Nix install.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;

fn nixtract_bin() -> String {
    std::env::var("CARGO_BIN_EXE_nixtract").expect("cargo sets CARGO_BIN_EXE_nixtract for tests")
}

/// A scratch `PATH` entry containing only a `nix` symlink to the fixture
/// script, so the binary's hardcoded `nix_program = "nix"` resolves to it.
fn fake_path_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/fake-nix.sh");
    let link = dir.path().join("nix");
    std::os::unix::fs::symlink(&fixture, &link).unwrap();
    let mut perms = std::fs::metadata(&link).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&link, perms).unwrap();
    dir
}

#[test]
fn help_runs_without_touching_nix_at_all() {
    let output = Command::new(nixtract_bin())
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("nixtract"));
}

#[test]
fn crawls_a_trivial_flake_through_the_binary() {
    let fake_path = fake_path_dir();
    let path_env = format!(
        "{}:{}",
        fake_path.path().display(),
        std::env::var("PATH").unwrap_or_default()
    );

    let output = Command::new(nixtract_bin())
        .args(["trivial-flake", "--system", "x86_64-linux"])
        .env("PATH", path_env)
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("\"attribute_path\":\"hello\""));
}
