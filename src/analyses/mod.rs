//! Report catalogue
//!
//! One module per subcommand. Each exposes a pure `analyze` step over loaded
//! records and a `run` entry point that loads inputs, writes the report files
//! and returns the text destined for stdout.

pub mod amx;
pub mod complexity;
pub mod composition;
pub mod dag_stats;
pub mod io_overhead;
pub mod parallel;
pub mod platform;
pub mod platform_findings;
pub mod power;
pub mod power_findings;
pub mod publication;
pub mod speedup;

use std::path::{Path, PathBuf};

/// File stem of `path` as an owned string
pub(crate) fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File name of `path` as an owned string
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `name` in the same directory as `input`
pub(crate) fn sibling(input: &Path, name: &str) -> PathBuf {
    match input.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Directory reports default to when none is given
pub(crate) fn default_dir(input: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(dir) => dir.to_path_buf(),
        None => sibling(input, ""),
    }
}

/// `part / total` as a percentage, 0 when `total` is 0
pub(crate) fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Configurations in a fixed preferred order, then the rest in input order
pub(crate) fn ordered_configs<'a>(
    preferred: &[&str],
    present: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let present: Vec<&str> = present.into_iter().collect();
    let mut out: Vec<String> = preferred
        .iter()
        .filter(|p| present.contains(p))
        .map(|p| p.to_string())
        .collect();
    for config in present {
        if !out.iter().any(|c| c == config) {
            out.push(config.to_string());
        }
    }
    out
}
