//! Generic speedup report
//!
//! Loads any benchmark CSV, joins every row to its group's baseline on a
//! chosen metric and summarizes the ratios by one dimension.

use crate::aggregate::{best_by, group_by, Direction, Summary};
use crate::baseline::{join, BaselineSpec, Confidence, GroupKey, NoBaselineWarning, Ratio};
use crate::cli::OutputFormat;
use crate::error::{AnalysisError, Result};
use crate::loader::{load_generic, Schema};
use crate::report::json_output::{
    to_json, JsonBaseline, JsonDerivedRow, JsonGroupSummary, JsonSpeedupReport,
};
use crate::report::markdown::{MarkdownDoc, MarkdownTable};
use crate::report::text::{banner, section, Align, TextTable};
use crate::report::{csv_output, times};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// What to compare and how to summarize it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedupRequest {
    pub baseline: BaselineSpec,
    pub metric: String,
    pub summarize_by: String,
}

impl SpeedupRequest {
    /// Build a request from a `field=value` baseline predicate
    pub fn new(group_by: &[String], predicate: &str, metric: &str, summarize_by: &str) -> Option<Self> {
        let (field, value) = BaselineSpec::parse_predicate(predicate)?;
        Some(Self {
            baseline: BaselineSpec {
                group_by: group_by.to_vec(),
                field,
                value,
            },
            metric: metric.to_string(),
            summarize_by: summarize_by.to_string(),
        })
    }

    fn required_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = self.baseline.group_by.iter().map(String::as_str).collect();
        for extra in [self.baseline.field.as_str(), self.summarize_by.as_str()] {
            if !columns.contains(&extra) {
                columns.push(extra);
            }
        }
        columns
    }
}

/// One record with its derived ratio
#[derive(Debug, Clone)]
pub struct SpeedupRow {
    pub key: GroupKey,
    /// Value of the summarize-by dimension
    pub label: String,
    pub is_baseline: bool,
    pub value: f64,
    pub ratio: Ratio,
}

/// Ratio summary for one summarize-by value
#[derive(Debug, Clone)]
pub struct LabelSummary {
    pub label: String,
    pub summary: Summary,
    pub best: Option<GroupKey>,
}

#[derive(Debug, Clone)]
pub struct SpeedupReport {
    pub input: PathBuf,
    pub request: SpeedupRequest,
    pub rows: Vec<SpeedupRow>,
    pub summaries: Vec<LabelSummary>,
    pub warnings: Vec<NoBaselineWarning>,
}

/// CSV row of the derived table
#[derive(Debug, Clone, Serialize)]
pub struct SpeedupCsvRow {
    pub group: String,
    pub label: String,
    pub is_baseline: bool,
    pub value: f64,
    pub ratio: f64,
    pub confidence: Confidence,
}

/// CSV row of the per-label summary table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub label: String,
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub best: String,
}

impl Schema for SummaryRow {
    const REQUIRED: &'static [&'static str] =
        &["label", "count", "mean", "std_dev", "median", "min", "max"];
}

/// Load `input` and derive ratios for `request`
pub fn analyze(input: &Path, request: &SpeedupRequest) -> Result<SpeedupReport> {
    let records = load_generic(input, &request.required_columns(), &request.metric)?;
    if records.is_empty() {
        return Err(AnalysisError::EmptyInput {
            path: input.to_path_buf(),
            reason: "no data rows".to_string(),
        });
    }

    let joined = join(&records, &request.baseline, |r| r.metric);
    let rows: Vec<SpeedupRow> = joined
        .rows
        .iter()
        .map(|d| SpeedupRow {
            key: d.key.clone(),
            label: d.record.get(&request.summarize_by).unwrap_or_default().to_string(),
            is_baseline: d.is_baseline,
            value: d.record.metric,
            ratio: d.ratio,
        })
        .collect();

    let summaries = group_by(&rows, |r| r.label.clone())
        .into_iter()
        .filter_map(|(label, members)| {
            let summary = Summary::of(&members, |r| r.ratio.value)?;
            let best = best_by(members.iter().copied(), |r| r.ratio.value, Direction::Max)
                .map(|r| r.key.clone());
            Some(LabelSummary {
                label,
                summary,
                best,
            })
        })
        .collect();

    info!(rows = rows.len(), groups_without_baseline = joined.warnings.len(), "speedup analysis done");
    Ok(SpeedupReport {
        input: input.to_path_buf(),
        request: request.clone(),
        rows,
        summaries,
        warnings: joined.warnings,
    })
}

fn flag(ratio: &Ratio) -> &'static str {
    ratio.confidence.marker()
}

pub fn render_text(report: &SpeedupReport) -> String {
    let req = &report.request;
    let mut out = banner("SPEEDUP ANALYSIS", 70);
    out.push_str(&format!("Input:    {}\n", report.input.display()));
    out.push_str(&format!(
        "Baseline: {}={}   Metric: {}   Groups: {}\n\n",
        req.baseline.field,
        req.baseline.value,
        req.metric,
        req.baseline.group_by.join(", ")
    ));

    let mut table = TextTable::new()
        .column("Group", 30, Align::Left)
        .column(&req.summarize_by, 16, Align::Left)
        .column("Value", 14, Align::Right)
        .column("Ratio", 10, Align::Right)
        .column("Flag", 13, Align::Left);
    for row in &report.rows {
        table.add_row(vec![
            row.key.to_string(),
            row.label.clone(),
            format!("{:.2}", row.value),
            times(row.ratio.value, 2),
            flag(&row.ratio).to_string(),
        ]);
    }
    out.push_str(&table.render());
    out.push('\n');

    out.push_str(&section(&format!("SUMMARY BY {}", req.summarize_by.to_uppercase()), 70));
    let mut summary = TextTable::new()
        .column(&req.summarize_by, 16, Align::Left)
        .column("N", 4, Align::Right)
        .column("Mean", 9, Align::Right)
        .column("Std", 8, Align::Right)
        .column("Median", 9, Align::Right)
        .column("Min", 9, Align::Right)
        .column("Max", 9, Align::Right)
        .column("Best", 24, Align::Left);
    for s in &report.summaries {
        summary.add_row(vec![
            s.label.clone(),
            s.summary.count.to_string(),
            times(s.summary.mean, 2),
            format!("{:.2}", s.summary.std_dev),
            times(s.summary.median, 2),
            times(s.summary.min, 2),
            times(s.summary.max, 2),
            s.best.as_ref().map(ToString::to_string).unwrap_or_default(),
        ]);
    }
    out.push_str(&summary.render());

    if !report.warnings.is_empty() {
        out.push('\n');
        out.push_str(&format!(
            "{} group(s) without a {}={} baseline (ratios reported as 1.00×):\n",
            report.warnings.len(),
            req.baseline.field,
            req.baseline.value
        ));
        for w in &report.warnings {
            out.push_str(&format!("  {}\n", w.key));
        }
    }
    out
}

pub fn render_markdown(report: &SpeedupReport) -> String {
    let req = &report.request;
    let mut doc = MarkdownDoc::new();
    doc.h1("Speedup Analysis");
    doc.paragraph(&format!(
        "**Input**: {}  \n**Baseline**: `{}={}`  \n**Metric**: `{}`",
        report.input.display(),
        req.baseline.field,
        req.baseline.value,
        req.metric
    ));

    doc.h2(&format!("Summary by {}", req.summarize_by));
    let mut table = MarkdownTable::new(&[req.summarize_by.as_str(), "N", "Mean", "Median", "Min", "Max", "Best"]);
    for s in &report.summaries {
        table.add_row(vec![
            s.label.clone(),
            s.summary.count.to_string(),
            times(s.summary.mean, 2),
            times(s.summary.median, 2),
            times(s.summary.min, 2),
            times(s.summary.max, 2),
            s.best.as_ref().map(ToString::to_string).unwrap_or_default(),
        ]);
    }
    doc.table(&table);

    doc.h2("Derived Rows");
    let mut rows = MarkdownTable::new(&["Group", req.summarize_by.as_str(), "Value", "Ratio", "Flag"]);
    for row in &report.rows {
        rows.add_row(vec![
            row.key.to_string(),
            row.label.clone(),
            format!("{:.2}", row.value),
            times(row.ratio.value, 2),
            flag(&row.ratio).to_string(),
        ]);
    }
    doc.table(&rows);

    if !report.warnings.is_empty() {
        doc.h2("Warnings");
        for w in &report.warnings {
            doc.bullet(&w.to_string());
        }
        doc.blank();
    }
    doc.finish()
}

pub fn csv_rows(report: &SpeedupReport) -> Vec<SpeedupCsvRow> {
    report
        .rows
        .iter()
        .map(|r| SpeedupCsvRow {
            group: r.key.to_string(),
            label: r.label.clone(),
            is_baseline: r.is_baseline,
            value: r.value,
            ratio: r.ratio.value,
            confidence: r.ratio.confidence,
        })
        .collect()
}

pub fn summary_rows(report: &SpeedupReport) -> Vec<SummaryRow> {
    report
        .summaries
        .iter()
        .map(|s| SummaryRow {
            label: s.label.clone(),
            count: s.summary.count,
            mean: s.summary.mean,
            std_dev: s.summary.std_dev,
            median: s.summary.median,
            min: s.summary.min,
            max: s.summary.max,
            best: s.best.as_ref().map(ToString::to_string).unwrap_or_default(),
        })
        .collect()
}

pub fn to_json_report(report: &SpeedupReport) -> JsonSpeedupReport {
    let req = &report.request;
    JsonSpeedupReport {
        input: report.input.display().to_string(),
        group_by: req.baseline.group_by.clone(),
        baseline: JsonBaseline {
            field: req.baseline.field.clone(),
            value: req.baseline.value.clone(),
        },
        metric: req.metric.clone(),
        rows: report
            .rows
            .iter()
            .map(|r| JsonDerivedRow {
                key: r.key.parts().to_vec(),
                label: r.label.clone(),
                is_baseline: r.is_baseline,
                value: r.value,
                ratio: r.ratio.value,
                flag: r.ratio.confidence.is_flagged().then_some(r.ratio.confidence),
            })
            .collect(),
        summaries: report
            .summaries
            .iter()
            .map(|s| JsonGroupSummary {
                label: s.label.clone(),
                summary: s.summary,
                best: s.best.as_ref().map(ToString::to_string),
            })
            .collect(),
        warnings: report.warnings.iter().map(ToString::to_string).collect(),
    }
}

/// Render the report in `format`
pub fn render(report: &SpeedupReport, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Text => render_text(report),
        OutputFormat::Markdown => render_markdown(report),
        OutputFormat::Csv => csv_output::to_csv_string(&csv_rows(report))?,
        OutputFormat::Json => to_json(&to_json_report(report))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn request() -> SpeedupRequest {
        SpeedupRequest::new(
            &["operation".to_string(), "scale".to_string()],
            "config=naive",
            "throughput_seqs_per_sec",
            "config",
        )
        .unwrap()
    }

    #[test]
    fn test_two_groups_equal_throughput_mean_one() {
        let file = csv_file(
            "operation,config,scale,throughput_seqs_per_sec\n\
             A,naive,Small,100\nA,fast,Small,100\n\
             B,naive,Small,50\nB,fast,Small,50\n",
        );
        let report = analyze(file.path(), &request()).unwrap();
        let fast = report.summaries.iter().find(|s| s.label == "fast").unwrap();
        assert_eq!(fast.summary.count, 2);
        assert_eq!(fast.summary.mean, 1.0);
    }

    #[test]
    fn test_fast_is_four_times_naive() {
        let file = csv_file(
            "operation,config,scale,throughput_seqs_per_sec\nA,naive,S,100\nA,fast,S,400\n",
        );
        let report = analyze(file.path(), &request()).unwrap();
        assert_eq!(report.rows[1].ratio.value, 4.0);
        let text = render_text(&report);
        assert!(text.contains("4.00×"));
        assert!(text.starts_with(&"=".repeat(70)));
    }

    #[test]
    fn test_missing_baseline_listed_in_text() {
        let file = csv_file(
            "operation,config,scale,throughput_seqs_per_sec\nA,neon,S,100\nA,fast,S,400\n",
        );
        let report = analyze(file.path(), &request()).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(render_text(&report).contains("without a config=naive baseline"));
    }

    #[test]
    fn test_missing_summarize_column_is_error() {
        let file = csv_file("operation,scale,throughput_seqs_per_sec\nA,S,1\n");
        let err = analyze(file.path(), &request()).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingColumn { ref column, .. } if column == "config"));
    }

    #[test]
    fn test_header_only_is_empty_input() {
        let file = csv_file("operation,config,scale,throughput_seqs_per_sec\n");
        assert!(matches!(
            analyze(file.path(), &request()),
            Err(AnalysisError::EmptyInput { .. })
        ));
    }

    #[test]
    fn test_render_formats() {
        let file = csv_file(
            "operation,config,scale,throughput_seqs_per_sec\nA,naive,S,0\nA,fast,S,50\n",
        );
        let report = analyze(file.path(), &request()).unwrap();
        let csv = render(&report, OutputFormat::Csv).unwrap();
        assert!(csv.starts_with("group,label,is_baseline,value,ratio,confidence\n"));
        assert!(csv.contains("A/S,fast,false,50.0,0.0,zero_baseline"));
        let json = render(&report, OutputFormat::Json).unwrap();
        assert!(json.contains("\"flag\": \"zero_baseline\""));
        let md = render(&report, OutputFormat::Markdown).unwrap();
        assert!(md.starts_with("# Speedup Analysis"));
    }

    #[test]
    fn test_bad_predicate() {
        assert!(SpeedupRequest::new(&[], "naive", "m", "config").is_none());
    }
}
