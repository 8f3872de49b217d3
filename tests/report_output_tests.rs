//! Integration tests for the Reporter: CSV, JSON, Markdown, text and charts
//!
//! Every renderer is a pure function of its input, so rendering twice must
//! produce byte-identical output.

mod utils;

use asbb_analysis::analyses::speedup::{self, SpeedupRequest, SummaryRow};
use asbb_analysis::cli::OutputFormat;
use asbb_analysis::loader::load_records;
use asbb_analysis::report::chart::{
    render_svg, BarChart, ChartStyle, Figure, LineChart, Panel, Series, XAxis,
};
use asbb_analysis::report::csv_output::write_csv;
use asbb_analysis::report::markdown::{MarkdownDoc, MarkdownTable};
use asbb_analysis::report::text::{Align, TextTable};
use tempfile::TempDir;
use utils::fixture;

fn report() -> speedup::SpeedupReport {
    let request = SpeedupRequest::new(
        &["operation".to_string(), "scale".to_string()],
        "config=naive",
        "throughput_seqs_per_sec",
        "config",
    )
    .unwrap();
    speedup::analyze(&fixture("benchmark_results.csv"), &request).unwrap()
}

#[test]
fn test_summary_csv_reloads_unchanged() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("summary.csv");
    let rows = speedup::summary_rows(&report());

    write_csv(&path, &rows).unwrap();
    let reloaded: Vec<SummaryRow> = load_records(&path).unwrap();
    assert_eq!(reloaded, rows);
}

#[test]
fn test_every_format_is_idempotent() {
    let report = report();
    for format in [
        OutputFormat::Text,
        OutputFormat::Markdown,
        OutputFormat::Csv,
        OutputFormat::Json,
    ] {
        let first = speedup::render(&report, format).unwrap();
        let second = speedup::render(&report, format).unwrap();
        assert_eq!(first, second, "{format:?} output differs between runs");
        assert!(!first.is_empty());
    }
}

#[test]
fn test_csv_format_columns() {
    let csv = speedup::render(&report(), OutputFormat::Csv).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "group,label,is_baseline,value,ratio,confidence"
    );
    assert_eq!(lines.next().unwrap(), "base_counting/Small,naive,true,100000.0,1.0,measured");
    assert!(csv.contains("reverse_complement/Small,neon,false,500000.0,1.0,no_baseline"));
}

#[test]
fn test_json_flags_only_unmeasured_rows() {
    let json = speedup::render(&report(), OutputFormat::Json).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let rows = parsed["rows"].as_array().unwrap();
    let flagged = rows.iter().filter(|r| !r["flag"].is_null()).count();
    assert_eq!(flagged, 2);
    assert_eq!(parsed["warnings"].as_array().unwrap().len(), 1);
}

#[test]
fn test_text_table_never_truncates() {
    let mut table = TextTable::new()
        .column("operation", 6, Align::Left)
        .column("speedup", 8, Align::Right);
    table.add_row(vec!["quality_aggregation".to_string(), "16.00".to_string()]);
    let text = table.render();
    assert!(text.contains("quality_aggregation"));
    assert!(text.lines().nth(1).unwrap().starts_with("---------"));
}

#[test]
fn test_markdown_document_layout() {
    let mut table = MarkdownTable::new(&["Config", "Speedup"]);
    table.add_row(vec!["neon".to_string(), "16.0×".to_string()]);

    let mut doc = MarkdownDoc::new();
    doc.h1("Findings");
    doc.h2("Results");
    doc.table(&table);
    let text = doc.finish();

    assert!(text.starts_with("# Findings\n\n## Results\n\n"));
    assert!(text.contains("| Config | Speedup |"));
    assert!(text.contains("| neon   | 16.0×   |"));
}

#[test]
fn test_charts_render_svg() {
    let style = ChartStyle::default();

    let mut line = LineChart::new("Speedup", "Scale", "Speedup", XAxis::Log10);
    line.series
        .push(Series::new("neon", vec![(100.0, 2.0), (10_000.0, 8.0), (1_000_000.0, 16.0)]));
    let figure = Figure::single(Panel::Line(&line));
    let svg = render_svg(&figure, &style).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.trim_end().ends_with("</svg>"));
    assert!(svg.contains("neon"));
    assert_eq!(svg, render_svg(&figure, &style).unwrap());

    let mut bars = BarChart::new("Overhead", "%", vec!["gzip".to_string(), "zstd".to_string()]);
    bars.series.push(("NEON".to_string(), vec![90.0, f64::NAN]));
    let svg = render_svg(&Figure::single(Panel::Bars(&bars)), &style).unwrap();
    assert!(svg.contains("gzip"));
    assert!(svg.contains("zstd"));
}
