// Integration test utilities
//
// Helpers for staging fixture CSVs in a scratch directory so commands that
// write beside their input never touch the checked-in fixtures.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Path of a checked-in fixture
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Copy fixture `name` into `dir`, returning the copy's path
pub fn stage(dir: &TempDir, name: &str) -> PathBuf {
    let target = dir.path().join(name);
    fs::copy(fixture(name), &target).unwrap();
    target
}

/// Write `content` to `dir/name`, returning the path
pub fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let target = dir.path().join(name);
    fs::write(&target, content).unwrap();
    target
}

/// `asbb-analyze` binary under test
pub fn analyze_cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("asbb-analyze")
}
