use std::fs;
use std::path::Path;

use corelens::{canonicalize_or_current, infer_project_name, log_filter, sha256_bytes, sha256_file};
use tempfile::tempdir;
use tracing_subscriber::filter::LevelFilter;

#[test]
fn canonicalize_or_current_resolves_existing_path() {
    let tmp = tempdir().expect("tempdir");
    let nested = tmp.path().join("nested");
    fs::create_dir_all(&nested).expect("create nested");

    let result =
        canonicalize_or_current(nested.to_str().expect("utf8 path")).expect("canonicalize");
    assert_eq!(result, nested.canonicalize().expect("canonicalize nested"));
}

#[test]
fn canonicalize_or_current_keeps_missing_paths_absolute() {
    let result = canonicalize_or_current("does-not-exist-yet").expect("resolve");
    assert!(result.is_absolute());
    assert!(result.ends_with("does-not-exist-yet"));
}

#[test]
fn infer_project_name_uses_last_path_component() {
    assert_eq!(infer_project_name(Path::new("/work/ledger-analysis")), "ledger-analysis");
    assert_eq!(infer_project_name(Path::new("/")), "unnamed-project");
}

#[test]
fn sha256_helpers_agree() {
    assert_eq!(
        sha256_bytes(b"abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );

    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("snapshot.json");
    fs::write(&path, b"abc").expect("write");
    assert_eq!(sha256_file(&path).expect("hash file"), sha256_bytes(b"abc"));
    assert!(sha256_file(&tmp.path().join("missing")).is_err());
}

#[test]
fn log_filter_prefers_rust_log_over_verbosity() {
    assert_eq!(log_filter(false, None).max_level_hint(), Some(LevelFilter::WARN));
    assert_eq!(log_filter(true, None).max_level_hint(), Some(LevelFilter::DEBUG));
    assert_eq!(log_filter(true, Some("error")).max_level_hint(), Some(LevelFilter::ERROR));
    assert_eq!(log_filter(false, Some("trace")).max_level_hint(), Some(LevelFilter::TRACE));
    assert_eq!(log_filter(true, Some("  ")).max_level_hint(), Some(LevelFilter::DEBUG));
}
