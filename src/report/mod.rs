//! Reporter: text tables, Markdown documents, CSV, JSON and SVG charts
//!
//! All renderers are pure functions from data to `String`; the `write_*`
//! helpers persist them and create any missing parent directories.

pub mod chart;
pub mod csv_output;
pub mod json_output;
pub mod markdown;
pub mod text;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Create the parent directory of `path` if it does not exist
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    Ok(())
}

/// Write a rendered report to `path`, creating directories as needed
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    info!(path = %path.display(), bytes = content.len(), "wrote report");
    Ok(())
}

/// Format a speedup as e.g. `4.25×`
pub fn times(value: f64, precision: usize) -> String {
    format!("{value:.precision$}×")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_output_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("report.txt");
        write_output(&path, "hello\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn test_times_format() {
        assert_eq!(times(4.0, 2), "4.00×");
        assert_eq!(times(12.345, 1), "12.3×");
    }
}
