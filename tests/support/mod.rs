use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// A `Write` sink the test can keep a handle to after `nixtract::run` has
/// consumed the original, so the written JSONL can be inspected afterward.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_string(self) -> String {
        let bytes = Arc::try_unwrap(self.0)
            .expect("no other SharedBuffer clones outstanding")
            .into_inner()
            .unwrap();
        String::from_utf8(bytes).expect("sink wrote valid utf8")
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().unwrap().flush()
    }
}

pub fn fake_nix_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/fake-nix.sh")
}

pub fn base_config(flake_ref: &str) -> nixtract::CrawlConfig {
    nixtract::CrawlConfig {
        flake_ref: flake_ref.to_string(),
        system: "x86_64-linux".to_string(),
        attribute_root: None,
        runtime_only: false,
        offline: false,
        n_workers: Some(2),
        legacy_input_enumeration: false,
        skip_attrs: Default::default(),
        nix_program: fake_nix_path().to_string_lossy().into_owned(),
        pretty: false,
    }
}
