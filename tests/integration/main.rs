//! Integration tests for Taxograph
//!
//! These tests verify that the store, the processor and the CLI work together.

use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;

use taxograph_core::{Concept, ROOT_ID};
use taxograph_processor::{reindex_all, ProcessorConfig, TaxonomyChangeProcessor};
use taxograph_store::{load_snapshot, save_snapshot, ChangeSet, MemoryStore, StagingArea};
use tempfile::TempDir;

fn seed_store() -> MemoryStore<Concept> {
    let draft = MemoryStore::from_entities([
        Concept::new("138875005").with_label("SNOMED CT Concept"),
        Concept::new("404684003").with_parents(["138875005"]).with_label("Clinical finding"),
        Concept::new("64572001").with_parents(["404684003"]).with_label("Disease"),
        Concept::new("22298006").with_parents(["64572001"]).with_label("Myocardial infarction"),
    ]);
    MemoryStore::from_entities(reindex_all(&draft, &ProcessorConfig::default()).unwrap())
}

fn taxograph(store: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_taxograph"))
        .arg("--store")
        .arg(store)
        .args(args)
        .output()
        .expect("Failed to execute taxograph")
}

/// Snapshot, apply a change set, reload, and compare with a full rebuild
#[test]
fn test_snapshot_apply_reindex_pipeline() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("taxonomy.bin");
    save_snapshot(&seed_store(), &path).unwrap();

    let (_, store) = load_snapshot::<Concept>(&path).unwrap();
    let change_set = ChangeSet {
        new: vec![Concept::new("57054005").with_parents(["22298006"]).with_label("Acute MI")],
        changed: vec![store.get_one("22298006").unwrap().with_parents(["64572001", "404684003"])],
        removed: vec![],
    };
    let mut staging = StagingArea::from_change_set(&store, change_set).unwrap();
    TaxonomyChangeProcessor::default().process(&store, &mut staging).unwrap();
    staging.commit(&store);
    save_snapshot(&store, &path).unwrap();

    let (header, reloaded) = load_snapshot::<Concept>(&path).unwrap();
    assert_eq!(header.entity_count, 5);
    let acute = reloaded.get_one("57054005").unwrap();
    assert_eq!(
        acute.ancestors,
        ["138875005", "404684003", "64572001", ROOT_ID].iter().map(|s| s.to_string()).collect::<BTreeSet<_>>()
    );
    assert_eq!(reloaded.entities(), reindex_all(&reloaded, &ProcessorConfig::default()).unwrap());
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = Command::new(env!("CARGO_BIN_EXE_taxograph"))
        .arg("--help")
        .output()
        .expect("Failed to execute taxograph");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Transitive closure maintenance for is-a hierarchies"));
}

#[test]
fn test_cli_apply_and_show() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("taxonomy.json");
    save_snapshot(&seed_store(), &store).unwrap();

    let changes = dir.path().join("changes.json");
    std::fs::write(&changes, r#"{"removed": ["64572001"]}"#).unwrap();

    let output = taxograph(&store, &["apply", "--changes", changes.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = taxograph(&store, &["show", "22298006"]);
    assert!(output.status.success());
    let shown: Concept = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown.parents, BTreeSet::from([ROOT_ID.to_string()]));
    assert!(shown.ancestors.is_empty());

    let output = taxograph(&store, &["check"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn test_cli_check_reports_dangling_parent() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("taxonomy.json");
    save_snapshot(
        &MemoryStore::from_entities([Concept::new("A").with_parents(["missing"])]),
        &store,
    )
    .unwrap();

    let output = taxograph(&store, &["check"]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("missing destination node 'missing'"));
}
