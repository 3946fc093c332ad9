mod common;

use std::fs;

use common::write_triplet;
use rdfizer_pipeline::{
    discover_tsv_triplets, match_input_triplet, match_triplets, resolve_input_snapshot,
};

#[test]
fn missing_header_sibling_names_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("sample.records.tsv"), "r\n").expect("records");
    fs::write(dir.path().join("sample.file_metadata.tsv"), "m\n").expect("metadata");

    let err = discover_tsv_triplets(dir.path()).unwrap_err();
    assert_eq!(err.info().code, "missing_triplet_sibling");
    assert!(err.info().message.contains("sample.header_lines.tsv"), "{err}");
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn missing_metadata_sibling_names_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("sample.records.tsv"), "r\n").expect("records");
    fs::write(dir.path().join("sample.header_lines.tsv"), "h\n").expect("headers");

    let err = discover_tsv_triplets(dir.path()).unwrap_err();
    assert!(err.info().message.contains("sample.file_metadata.tsv"), "{err}");
}

#[test]
fn empty_directory_lists_present_tsv_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("b.tsv"), "").expect("b");
    fs::write(dir.path().join("a.tsv"), "").expect("a");
    fs::write(dir.path().join("notes.txt"), "").expect("txt");

    let err = discover_tsv_triplets(dir.path()).unwrap_err();
    assert_eq!(err.info().code, "no_records_tsv");
    assert!(err.info().message.ends_with("Found: a.tsv, b.tsv"), "{err}");

    let empty = tempfile::tempdir().expect("tempdir");
    let err = discover_tsv_triplets(empty.path()).unwrap_err();
    assert!(err.info().message.ends_with("Found: (none)"), "{err}");
}

#[test]
fn snapshot_prefixes_match_in_order_and_stale_triplets_are_ignored() {
    let root = tempfile::tempdir().expect("tempdir");
    let inputs = root.path().join("in");
    fs::create_dir_all(&inputs).expect("inputs");
    fs::write(inputs.join("b.vcf"), "").expect("b");
    fs::write(inputs.join("a.vcf"), "").expect("a");

    let tsv = root.path().join("tsv");
    for prefix in ["stale", "b", "a"] {
        write_triplet(&tsv, prefix);
    }

    let snapshot = resolve_input_snapshot(&inputs).expect("snapshot");
    let discovered = discover_tsv_triplets(&tsv).expect("discover");
    let prefixes: Vec<_> = discovered.iter().map(|t| t.prefix.as_str()).collect();
    assert_eq!(prefixes, vec!["a", "b", "stale"]);

    let matched = match_triplets(discovered, &snapshot.expected_prefixes()).expect("match");
    let matched_prefixes: Vec<_> = matched.matched.iter().map(|t| t.prefix.as_str()).collect();
    assert_eq!(matched_prefixes, vec!["a", "b"]);
    assert!(matched.pending.is_empty());
    assert_eq!(matched.ignored.len(), 1);
    assert_eq!(matched.ignored[0].prefix, "stale");
}

#[test]
fn sibling_inputs_of_the_run_are_pending_not_ignored() {
    let root = tempfile::tempdir().expect("tempdir");
    let inputs = root.path().join("in");
    fs::create_dir_all(&inputs).expect("inputs");
    fs::write(inputs.join("a.vcf"), "").expect("a");
    fs::write(inputs.join("b.vcf"), "").expect("b");

    let tsv = root.path().join("tsv");
    for prefix in ["a", "b", "stale"] {
        write_triplet(&tsv, prefix);
    }

    let snapshot = resolve_input_snapshot(&inputs).expect("snapshot");
    let discovered = discover_tsv_triplets(&tsv).expect("discover");
    let matched =
        match_input_triplet(discovered, "b", &snapshot.expected_prefixes()).expect("match");

    assert_eq!(matched.matched.len(), 1);
    assert_eq!(matched.matched[0].prefix, "b");
    let pending: Vec<_> = matched.pending.iter().map(|t| t.prefix.as_str()).collect();
    assert_eq!(pending, vec!["a"]);
    let ignored: Vec<_> = matched.ignored.iter().map(|t| t.prefix.as_str()).collect();
    assert_eq!(ignored, vec!["stale"]);
}

#[test]
fn input_triplet_not_yet_converted_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_triplet(dir.path(), "a");
    let discovered = discover_tsv_triplets(dir.path()).expect("discover");

    let run = vec!["a".to_string(), "b".to_string()];
    let err = match_input_triplet(discovered, "b", &run).unwrap_err();
    assert_eq!(err.info().code, "expected_triplet_missing");
}

#[test]
fn expected_prefix_without_triplet_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_triplet(dir.path(), "other");
    let discovered = discover_tsv_triplets(dir.path()).expect("discover");

    let err = match_triplets(discovered, &["sample".to_string()]).unwrap_err();
    assert_eq!(err.info().code, "expected_triplet_missing");
    assert!(err.info().message.contains("'sample'"));
}

#[test]
fn colliding_prefixes_each_get_a_match() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_triplet(dir.path(), "s");
    let discovered = discover_tsv_triplets(dir.path()).expect("discover");

    let expected = vec!["s".to_string(), "s".to_string()];
    let matched = match_triplets(discovered, &expected).expect("match");
    assert_eq!(matched.matched.len(), 2);
    assert!(matched.ignored.is_empty());
}
