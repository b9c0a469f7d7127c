//! End-to-end graph shapes: a two-package chain and a diamond where two
//! parents share one dependency — the dependency must be described exactly
//! once even though both parents discover it.

mod support;

use std::collections::HashMap;

use support::{base_config, SharedBuffer};

fn records(out: &str) -> HashMap<String, nixtract::DerivationRecord> {
    out.lines()
        .map(|line| {
            let record: nixtract::DerivationRecord = serde_json::from_str(line).unwrap();
            (record.attribute_path.as_str().to_string(), record)
        })
        .collect()
}

#[test]
fn two_package_chain_links_by_attribute_path() {
    let buf = SharedBuffer::new();
    let counts = nixtract::run(base_config("chain-flake"), buf.clone(), None).unwrap();
    assert_eq!(counts.described, 2);
    assert_eq!(counts.failed, 0);

    let records = records(&buf.into_string());
    assert_eq!(records.len(), 2);

    let a = &records["a"];
    assert_eq!(a.build_inputs.len(), 1);
    let edge = &a.build_inputs[0];
    assert!(records.contains_key(edge.attribute_path.as_str()));
    assert_eq!(records[edge.attribute_path.as_str()].parsed_name.name, "b");
}

#[test]
fn diamond_shared_dependency_is_described_exactly_once() {
    let buf = SharedBuffer::new();
    let counts = nixtract::run(base_config("diamond-flake"), buf.clone(), None).unwrap();
    // a, b, c, d: four distinct nodes even though d is reachable via both
    // b and c.
    assert_eq!(counts.described, 4);
    assert_eq!(counts.failed, 0);

    let records = records(&buf.into_string());
    assert_eq!(records.len(), 4);
    assert!(records.contains_key("a"));

    let d_path = &records["a"].build_inputs[0].attribute_path;
    assert!(records.contains_key(d_path.as_str()));

    // Every edge closes over an emitted record (the closure invariant),
    // with no attribute_path value appearing on more than one line.
    let mut seen = std::collections::HashSet::new();
    for record in records.values() {
        assert!(seen.insert(record.attribute_path.as_str().to_string()));
        for edge in &record.build_inputs {
            assert!(records.contains_key(edge.attribute_path.as_str()));
        }
    }
}
