//! Record loader
//!
//! Reads whole CSV files into typed records. Columns are looked up by header
//! name, so field order in the file does not matter. Lines starting with `[`
//! are progress noise emitted by the benchmark harness and are skipped.
//!
//! A load either returns every row or fails: a missing required column or a
//! value that does not coerce to its field type aborts the whole file.

use crate::error::{AnalysisError, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

/// Marker that starts a progress/comment line in benchmark output
pub const COMMENT_MARKER: u8 = b'[';

/// A record that exposes its dimension fields by name
///
/// The baseline joiner and the generic report path only need string
/// dimensions; numeric measurements are read through typed fields or
/// accessor closures.
pub trait Record {
    fn dimension(&self, name: &str) -> Option<&str>;
}

/// A typed row schema with an explicit required-column list
pub trait Schema: DeserializeOwned {
    /// Columns that must be present in the header row
    const REQUIRED: &'static [&'static str];
}

/// Fail with `MissingFile` unless `path` exists
pub fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(AnalysisError::MissingFile {
            path: path.to_path_buf(),
        })
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    ensure_exists(path)?;
    ReaderBuilder::new()
        .comment(Some(COMMENT_MARKER))
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| AnalysisError::csv(path, e))
}

fn check_required(path: &Path, headers: &StringRecord, required: &[&str]) -> Result<()> {
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(AnalysisError::MissingColumn {
                path: path.to_path_buf(),
                column: (*column).to_string(),
            });
        }
    }
    Ok(())
}

/// Translate a csv deserialization failure into a row/column diagnostic
fn malformed(
    path: &Path,
    row: usize,
    headers: &StringRecord,
    record: &StringRecord,
    err: csv::Error,
) -> AnalysisError {
    if let csv::ErrorKind::Deserialize { err: de, .. } = err.kind() {
        if let Some(idx) = de.field() {
            let idx = idx as usize;
            return AnalysisError::MalformedRecord {
                path: path.to_path_buf(),
                row,
                column: headers.get(idx).unwrap_or("<unknown>").to_string(),
                value: record.get(idx).unwrap_or_default().to_string(),
            };
        }
        return AnalysisError::MalformedRecord {
            path: path.to_path_buf(),
            row,
            column: "<record>".to_string(),
            value: de.to_string(),
        };
    }
    AnalysisError::csv(path, err)
}

/// Report a row with the wrong field count as malformed at its first missing column
fn read_failure(path: &Path, row: usize, headers: &StringRecord, err: csv::Error) -> AnalysisError {
    if let csv::ErrorKind::UnequalLengths { len, .. } = err.kind() {
        let len = *len as usize;
        return AnalysisError::MalformedRecord {
            path: path.to_path_buf(),
            row,
            column: headers.get(len).unwrap_or("<record>").to_string(),
            value: format!("{len} of {} fields", headers.len()),
        };
    }
    AnalysisError::csv(path, err)
}

/// Load every row of `path` as `T`
pub fn load_records<T: Schema>(path: &Path) -> Result<Vec<T>> {
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|e| AnalysisError::csv(path, e))?
        .clone();
    check_required(path, &headers, T::REQUIRED)?;

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let raw = result.map_err(|e| read_failure(path, idx + 1, &headers, e))?;
        let record = raw
            .deserialize::<T>(Some(&headers))
            .map_err(|e| malformed(path, idx + 1, &headers, &raw, e))?;
        records.push(record);
    }

    debug!(path = %path.display(), rows = records.len(), "loaded records");
    Ok(records)
}

/// Header row plus raw rows, for reports that pass rows through untouched
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

impl RawTable {
    /// Index of a named column
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Load a file without typing its rows, checking only the required columns
pub fn load_raw(path: &Path, required: &[&str]) -> Result<RawTable> {
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|e| AnalysisError::csv(path, e))?
        .clone();
    check_required(path, &headers, required)?;

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        rows.push(result.map_err(|e| read_failure(path, idx + 1, &headers, e))?);
    }
    Ok(RawTable { headers, rows })
}

/// An untyped row with one coerced numeric metric
///
/// Backs the ad-hoc `speedup` report, where the dimensions and the metric
/// column are chosen on the command line.
#[derive(Debug, Clone)]
pub struct GenericRecord {
    index: Rc<HashMap<String, usize>>,
    fields: StringRecord,
    pub metric: f64,
}

impl GenericRecord {
    /// Raw field value by column name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.index.get(name).and_then(|&i| self.fields.get(i))
    }
}

impl Record for GenericRecord {
    fn dimension(&self, name: &str) -> Option<&str> {
        self.get(name)
    }
}

/// Load rows generically, coercing `metric` to `f64` on every row
pub fn load_generic(path: &Path, required: &[&str], metric: &str) -> Result<Vec<GenericRecord>> {
    let mut columns: Vec<&str> = required.to_vec();
    if !columns.contains(&metric) {
        columns.push(metric);
    }
    let table = load_raw(path, &columns)?;

    let index: HashMap<String, usize> = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_string(), i))
        .collect();
    let metric_idx = *index.get(metric).ok_or_else(|| AnalysisError::MissingColumn {
        path: path.to_path_buf(),
        column: metric.to_string(),
    })?;
    let index = Rc::new(index);

    table
        .rows
        .into_iter()
        .enumerate()
        .map(|(row, fields)| {
            let raw = fields.get(metric_idx).unwrap_or_default();
            let value = raw
                .parse::<f64>()
                .map_err(|_| AnalysisError::MalformedRecord {
                    path: path.to_path_buf(),
                    row: row + 1,
                    column: metric.to_string(),
                    value: raw.to_string(),
                })?;
            Ok(GenericRecord {
                index: Rc::clone(&index),
                fields,
                metric: value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Debug, Deserialize)]
    struct Row {
        operation: String,
        config: String,
        throughput_seqs_per_sec: f64,
    }

    impl Schema for Row {
        const REQUIRED: &'static [&'static str] = &["operation", "config", "throughput_seqs_per_sec"];
    }

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_lookup_by_name_ignores_column_order() {
        let file = write_csv("throughput_seqs_per_sec,extra,config,operation\n100.5,x,naive,gc_content\n");
        let rows: Vec<Row> = load_records(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].operation, "gc_content");
        assert_eq!(rows[0].config, "naive");
        assert_eq!(rows[0].throughput_seqs_per_sec, 100.5);
    }

    #[test]
    fn test_progress_lines_are_skipped() {
        let file = write_csv(
            "operation,config,throughput_seqs_per_sec\n[1/3] running gc_content\nA,naive,1\n[2/3] running\nA,neon,2\n",
        );
        let rows: Vec<Row> = load_records(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = load_records::<Row>(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingFile { .. }));
    }

    #[test]
    fn test_missing_column() {
        let file = write_csv("operation,config\nA,naive\n");
        let err = load_records::<Row>(file.path()).unwrap_err();
        match err {
            AnalysisError::MissingColumn { column, .. } => {
                assert_eq!(column, "throughput_seqs_per_sec")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_value_aborts_whole_load() {
        let file = write_csv("operation,config,throughput_seqs_per_sec\nA,naive,1\nA,neon,fast\n");
        let err = load_records::<Row>(file.path()).unwrap_err();
        match err {
            AnalysisError::MalformedRecord {
                row, column, value, ..
            } => {
                assert_eq!(row, 2);
                assert_eq!(column, "throughput_seqs_per_sec");
                assert_eq!(value, "fast");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_short_row_names_first_missing_column() {
        #[derive(Debug, Deserialize)]
        struct Tput {
            #[allow(dead_code)]
            operation: String,
            #[allow(dead_code)]
            tput: f64,
        }
        impl Schema for Tput {
            const REQUIRED: &'static [&'static str] = &["operation", "tput"];
        }

        let file = write_csv("operation,tput\nA,1\nB\n");
        let expect_short = |err: AnalysisError| match err {
            AnalysisError::MalformedRecord {
                row, column, value, ..
            } => {
                assert_eq!(row, 2);
                assert_eq!(column, "tput");
                assert_eq!(value, "1 of 2 fields");
            }
            other => panic!("unexpected error: {other}"),
        };
        expect_short(load_records::<Tput>(file.path()).unwrap_err());
        expect_short(load_raw(file.path(), &["operation"]).unwrap_err());
        expect_short(load_generic(file.path(), &["operation"], "tput").unwrap_err());
    }

    #[test]
    fn test_generic_records() {
        let file = write_csv("operation,scale,config,tput\nA,Small,naive,10\nA,Small,neon,40\n");
        let rows = load_generic(file.path(), &["operation", "config"], "tput").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].dimension("config"), Some("neon"));
        assert_eq!(rows[1].metric, 40.0);
        assert_eq!(rows[0].get("scale"), Some("Small"));
        assert_eq!(rows[0].get("missing"), None);
    }

    #[test]
    fn test_generic_metric_must_parse() {
        let file = write_csv("operation,tput\nA,abc\n");
        let err = load_generic(file.path(), &["operation"], "tput").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedRecord { row: 1, .. }));
    }

    #[test]
    fn test_raw_table_keeps_header_order() {
        let file = write_csv("b,a\n1,2\n");
        let table = load_raw(file.path(), &["a"]).unwrap();
        assert_eq!(table.headers.iter().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(table.column("a"), Some(1));
        assert_eq!(table.rows.len(), 1);
    }
}
