//! CSV output
//!
//! Rows are serde structs; their field order is the column order. Floats are
//! written in shortest round-trip form.

use anyhow::{anyhow, Context, Result};
use csv::{StringRecord, WriterBuilder};
use serde::Serialize;
use std::path::Path;

/// Serialize `rows` to CSV text with a header row
///
/// An empty slice produces an empty string: the header comes from the first
/// serialized row.
pub fn to_csv_string<S: Serialize>(rows: &[S]) -> Result<String> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).context("Failed to serialize CSV row")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV output: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Write `rows` to `path`, creating directories as needed
pub fn write_csv<S: Serialize>(path: &Path, rows: &[S]) -> Result<()> {
    let text = to_csv_string(rows)
        .with_context(|| format!("Failed to render CSV for {}", path.display()))?;
    super::write_output(path, &text)
}

/// Write pass-through rows under an existing header
pub fn write_records(path: &Path, headers: &StringRecord, rows: &[StringRecord]) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV output: {}", e.error()))?;
    super::write_output(path, &String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Row {
        operation: &'static str,
        speedup: f64,
        note: &'static str,
    }

    #[test]
    fn test_field_order_and_quoting() {
        let rows = vec![
            Row {
                operation: "gc_content",
                speedup: 4.0,
                note: "plain",
            },
            Row {
                operation: "base_counting",
                speedup: 0.1,
                note: "a, b",
            },
        ];
        let text = to_csv_string(&rows).unwrap();
        assert_eq!(
            text,
            "operation,speedup,note\ngc_content,4.0,plain\nbase_counting,0.1,\"a, b\"\n"
        );
    }

    #[test]
    fn test_empty_rows() {
        let rows: Vec<Row> = Vec::new();
        assert_eq!(to_csv_string(&rows).unwrap(), "");
    }

    #[test]
    fn test_write_records_keeps_header() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out").join("subset.csv");
        let headers = StringRecord::from(vec!["b", "a"]);
        let rows = vec![StringRecord::from(vec!["2", "1"])];
        write_records(&path, &headers, &rows).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "b,a\n2,1\n");
    }
}
