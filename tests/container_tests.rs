//! End-to-end container tests against the sample fixture.

use std::path::Path;
use std::sync::Arc;

use cgf::container::store::{StoreError, StoreOptions};
use cgf::container::validate::validate_all;
use cgf::{Call, GenomeBuilder, GenomeContainer, SentinelKind, ValidationConfig, Violation, ZygosityClass};

const SAMPLE: &str = "tests/data/sample.cgf";

fn load_sample() -> GenomeContainer {
    GenomeContainer::load_from_file(Path::new(SAMPLE), &StoreOptions::default()).unwrap()
}

#[test]
fn test_sample_is_valid() {
    let container = load_sample();
    assert_eq!(container.validate(), Vec::<Violation>::new());
    assert_eq!(container.metadata().notes, "three-path sample");
    assert_eq!(container.total_steps(), 105);
}

#[test]
fn test_sample_calls() {
    let container = load_sample();

    assert_eq!(container.resolve_call(0, 0), Ok(Call::Position(0)));
    assert_eq!(container.resolve_call(0, 8), Ok(Call::Position(4)));
    assert_eq!(
        container.resolve_call(0, 9),
        Ok(Call::NoCall(SentinelKind::Wildcard))
    );
    assert_eq!(container.resolve_call(0, 12), Ok(Call::NoCall(SentinelKind::Gap)));
    assert_eq!(container.resolve_call(1, 0x16), Ok(Call::Position(3)));

    let Ok(Call::Annotation(record)) = container.resolve_call(0, 0xf) else {
        panic!("expected annotation at 0:f");
    };
    assert_eq!(record.kind, "message");

    assert_eq!(container.anchor_of(0, 9), Ok(Some(8)));
    assert_eq!(container.has_call_variant(0, 9, 5), Ok(true));
    assert!(container.has_tile_variant(1, 4));
}

#[test]
fn test_shared_library_across_genomes() {
    let first = load_sample();
    let library = Arc::clone(first.library());

    let text = std::fs::read_to_string(SAMPLE).unwrap();
    let second =
        GenomeContainer::from_cgf_str_with_library(&text, Arc::clone(&library), &StoreOptions::default())
            .unwrap();
    assert!(Arc::ptr_eq(first.library(), second.library()));

    let results = validate_all(&[first, second], &ValidationConfig::default());
    assert!(results.iter().all(Vec::is_empty));
}

#[test]
fn test_build_save_load() {
    let library = Arc::clone(load_sample().library());
    let mut builder = GenomeBuilder::new(library, vec![35, 32, 38, 10]).unwrap();
    builder
        .add_call(3, 2, ZygosityClass::HET, &[vec![2, 5], vec![3]], &[vec![1, 1], vec![2]])
        .unwrap();
    builder
        .add_call(3, 5, ZygosityClass::HOM, &[vec![7], vec![7]], &[vec![1], vec![1]])
        .unwrap();
    let built = builder.finish();
    assert_eq!(built.cumulative_steps_per_path(), &[35, 67, 105, 115]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("built.cgf");
    built.save(&path).unwrap();

    let loaded = GenomeContainer::load_from_file(&path, &StoreOptions::default()).unwrap();
    assert!(loaded.validate().is_empty());
    assert_eq!(loaded.call_string(3), Some("--E*-#----"));
    assert_eq!(loaded.total_steps(), 115);
    assert!(matches!(loaded.resolve_call(3, 5), Ok(Call::Annotation(_))));
}

#[test]
fn test_corrupted_checksum_reported() {
    let text = std::fs::read_to_string(SAMPLE)
        .unwrap()
        .replace("17104697fd9da3c4b48de53b95e4f87a", "27104697fd9da3c4b48de53b95e4f87a");
    let container = GenomeContainer::from_cgf_str(&text, &StoreOptions::default()).unwrap();
    assert!(matches!(
        container.validate().as_slice(),
        [Violation::TileMapChecksumMismatch { .. }]
    ));
}

#[test]
fn test_missing_file() {
    let err = GenomeContainer::load_from_file(Path::new("tests/data/nope.cgf"), &StoreOptions::default())
        .unwrap_err();
    assert!(matches!(err, StoreError::Io(_)));
}
