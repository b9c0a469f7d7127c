//! End-to-end: a single package with no build inputs, driven against the
//! hermetic `fake-nix` stand-in instead of a real Nix installation.

mod support;

use support::{base_config, SharedBuffer};

#[test]
fn single_package_produces_one_record() {
    let buf = SharedBuffer::new();
    let counts = nixtract::run(base_config("trivial-flake"), buf.clone(), None).unwrap();

    assert_eq!(counts.described, 1);
    assert_eq!(counts.failed, 0);

    let out = buf.into_string();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 1);

    let record: nixtract::DerivationRecord = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(record.attribute_path.as_str(), "hello");
    assert_eq!(record.parsed_name.name, "hello");
    assert_eq!(record.parsed_name.version.as_deref(), Some("2.12.1"));
    assert!(record.build_inputs.is_empty());
}

#[test]
fn explicit_attribute_root_bypasses_the_finder() {
    let mut config = base_config("trivial-flake");
    config.attribute_root = Some(nixtract::model::AttributePath::from("hello"));

    let buf = SharedBuffer::new();
    let counts = nixtract::run(config, buf.clone(), None).unwrap();

    assert_eq!(counts.described, 1);
    assert!(buf.into_string().contains("\"attribute_path\":\"hello\""));
}
