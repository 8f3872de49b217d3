//! End-to-end tests for every asbb-analyze subcommand
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

mod utils;

use asbb_analysis::report::chart::file_name;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;
use utils::{analyze_cmd, fixture, stage, write_file};

#[test]
fn test_speedup_text_report() {
    analyze_cmd()
        .arg("speedup")
        .arg(fixture("benchmark_results.csv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("SPEEDUP ANALYSIS"))
        .stdout(predicate::str::contains("16.00×"))
        .stdout(predicate::str::contains("SUMMARY BY CONFIG"));
}

#[test]
fn test_speedup_missing_baseline_is_reported_not_fatal() {
    analyze_cmd()
        .arg("speedup")
        .arg(fixture("benchmark_results.csv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("without a config=naive baseline"));
}

#[test]
fn test_speedup_json_parses() {
    let output = analyze_cmd()
        .arg("speedup")
        .arg(fixture("benchmark_results.csv"))
        .arg("--format")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["metric"], "throughput_seqs_per_sec");
    assert_eq!(parsed["baseline"]["value"], "naive");
    assert_eq!(parsed["rows"].as_array().unwrap().len(), 11);
    assert!(parsed["summaries"].is_array());
}

#[test]
fn test_speedup_writes_output_and_summary_files() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("reports/speedup.md");
    let summary = dir.path().join("reports/summary.csv");

    analyze_cmd()
        .arg("speedup")
        .arg(fixture("benchmark_results.csv"))
        .arg("--format")
        .arg("markdown")
        .arg("--output")
        .arg(&report)
        .arg("--summary-output")
        .arg(&summary)
        .assert()
        .success()
        .stdout(predicate::str::contains("Report written to"));

    assert!(fs::read_to_string(&report).unwrap().contains('|'));
    let summary = fs::read_to_string(&summary).unwrap();
    assert!(summary.starts_with("label,count,mean,std_dev,median,min,max,best"));
}

#[test]
fn test_speedup_missing_column_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "bad.csv", "operation,scale,throughput_seqs_per_sec\nA,S,1\n");

    analyze_cmd()
        .arg("speedup")
        .arg(&input)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Missing required column 'config'"));
}

#[test]
fn test_speedup_non_numeric_metric_names_row_and_column() {
    let dir = TempDir::new().unwrap();
    let input = write_file(
        &dir,
        "bad.csv",
        "operation,config,scale,throughput_seqs_per_sec\nA,naive,S,100\nA,neon,S,fast\n",
    );

    analyze_cmd()
        .arg("speedup")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("row 2"))
        .stderr(predicate::str::contains("throughput_seqs_per_sec"));
}

#[test]
fn test_speedup_bad_baseline_predicate() {
    analyze_cmd()
        .arg("speedup")
        .arg(fixture("benchmark_results.csv"))
        .arg("--baseline")
        .arg("naive")
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected FIELD=VALUE"));
}

#[test]
fn test_missing_input_file() {
    analyze_cmd()
        .arg("composition")
        .arg("does/not/exist.csv")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_composition_report_and_csv() {
    let dir = TempDir::new().unwrap();
    let input = stage(&dir, "composition.csv");

    analyze_cmd()
        .arg("composition")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("COMPOSITION VALIDATION ANALYSIS"))
        .stdout(predicate::str::contains("COMPOSITION RATIO STATISTICS"))
        .stdout(predicate::str::contains("CONCLUSION"));

    let saved = fs::read_to_string(dir.path().join("composition_analysis.csv")).unwrap();
    let mut lines = saved.lines();
    assert_eq!(
        lines.next().unwrap(),
        "operation,complexity,scale,num_sequences,speedup_neon,expected_parallel,\
         observed_parallel,speedup_neon_parallel,predicted_combined,composition_ratio,error_pct,flag"
    );
    assert!(saved.lines().skip(1).all(|l| l.ends_with(",measured")));
    // translate has no neon_parallel row and is skipped
    assert_eq!(lines.count(), 3);
}

#[test]
fn test_parallel_writes_reports() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("parallel_analysis");

    analyze_cmd()
        .arg("parallel")
        .arg(fixture("parallel.csv"))
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("SPEEDUP MATRICES BY OPERATION"));

    for file in ["speedup_matrices.txt", "summary_statistics.txt", "decision_rules.txt"] {
        assert!(out.join(file).exists(), "missing {file}");
    }
    for stem in ["speedup_curves", "efficiency_8t", "core_assignment_comparison"] {
        assert!(out.join(file_name(stem)).exists(), "missing {stem} chart");
    }
    let rules = fs::read_to_string(out.join("decision_rules.txt")).unwrap();
    assert!(rules.contains("RULE 1"));
    assert!(rules.contains("RULE 3"));
    let image = fs::metadata(out.join(file_name("speedup_curves"))).unwrap();
    assert!(image.len() > 0);
}

#[test]
fn test_amx_writes_summary_and_charts() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("amx");

    analyze_cmd()
        .arg("amx")
        .arg(fixture("amx.csv"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("AMX SPEEDUP ANALYSIS"));

    let summary = fs::read_to_string(out.join("amx_summary.txt")).unwrap();
    assert!(summary.contains("1.50× (6.00× AMX / 4.00× NEON)"));
    assert!(summary.contains("quality_statistics       : N/A"));
    assert!(out.join("amx_decision_rules.txt").exists());
    assert!(out.join(file_name("amx_speedup_curves_edit_distance")).exists());
    assert!(out.join(file_name("amx_vs_neon_comparison")).exists());
}

#[test]
fn test_power_parse_then_findings() {
    let dir = TempDir::new().unwrap();
    let log = stage(&dir, "power.log");
    let pilot = stage(&dir, "power_pilot_raw_test.csv");

    analyze_cmd()
        .arg("power-parse")
        .arg(&log)
        .arg(&pilot)
        .assert()
        .success()
        .stdout(predicate::str::contains("Parsed 6 power samples"))
        .stdout(predicate::str::contains("Loaded 3 experiments"));

    let enriched = dir.path().join("power_enriched_test.csv");
    let content = fs::read_to_string(&enriched).unwrap();
    let header = content.lines().next().unwrap();
    assert!(header.starts_with("operation,config,scale,num_sequences,"));
    assert!(header.ends_with("energy_efficiency,flag,power_samples_count,timestamp"));
    assert_eq!(content.lines().count(), 4);

    analyze_cmd()
        .arg("power-findings")
        .arg(&enriched)
        .assert()
        .success();
    let findings = fs::read_to_string(dir.path().join("FINDINGS.md")).unwrap();
    assert!(findings.starts_with("# Power Consumption Pilot - Findings"));
    assert!(findings.contains("## Executive Summary"));
}

#[test]
fn test_cross_platform_flow() {
    let dir = TempDir::new().unwrap();
    let baseline = dir.path().join("mac_baseline.csv");
    let comparison = dir.path().join("comparison.csv");

    analyze_cmd()
        .arg("extract-baseline")
        .arg(fixture("mac.csv"))
        .arg("--output")
        .arg(&baseline)
        .assert()
        .success()
        .stdout(predicate::str::contains("Extracted 6 reference baseline experiments"));

    analyze_cmd()
        .arg("compare-platforms")
        .arg(&baseline)
        .arg(fixture("graviton.csv"))
        .arg("--output")
        .arg(&comparison)
        .assert()
        .success()
        .stdout(predicate::str::contains("Comparison complete: 6 experiments"))
        .stdout(predicate::str::contains("Portability Summary"));

    analyze_cmd()
        .arg("platform-findings")
        .arg(&comparison)
        .assert()
        .success();
    let findings = fs::read_to_string(dir.path().join("FINDINGS.md")).unwrap();
    assert!(findings.contains("## Executive Summary"));
    assert!(findings.contains("### base_counting"));
}

#[test]
fn test_regression_fits_models() {
    let dir = TempDir::new().unwrap();
    let input = stage(&dir, "complexity.csv");

    analyze_cmd()
        .arg("regression")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 12 samples (1 excluded)"))
        .stdout(predicate::str::contains("EXPLORATORY DATA ANALYSIS"))
        .stdout(predicate::str::contains("Correlation matrix:"))
        .stdout(predicate::str::contains("parallel_speedup"))
        .stdout(predicate::str::contains("Linear"))
        .stdout(predicate::str::contains("Best model:"))
        .stdout(predicate::str::contains("Within 20%:"))
        .stdout(predicate::str::contains("High complexity (e.g., translate)"));

    let predictions = fs::read_to_string(dir.path().join("complexity_predictions.csv")).unwrap();
    assert!(predictions.starts_with("operation,scale,actual,predicted,error_pct"));
    assert_eq!(predictions.lines().count(), 13);
    assert!(dir.path().join(file_name("complexity_predictions")).exists());
    assert!(dir.path().join(file_name("complexity_exploratory")).exists());
}

#[test]
fn test_regression_unknown_scale_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_file(
        &dir,
        "c.csv",
        "operation,complexity_score,scale,neon_speedup\ngc_content,0.3,gigantic,10\n",
    );

    analyze_cmd()
        .arg("regression")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("column 'scale'"))
        .stderr(predicate::str::contains("gigantic"));
}

#[test]
fn test_io_overhead_report() {
    let dir = TempDir::new().unwrap();

    analyze_cmd()
        .arg("io-overhead")
        .arg(fixture("io_overhead.csv"))
        .arg("--output-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Compute-only NEON speedup (in-memory): 16.0×"))
        .stdout(predicate::str::contains("uncompressed:\n  End-to-end NEON speedup: 4.00×"))
        .stdout(predicate::str::contains("GZIP:"));

    assert!(dir.path().join(file_name("io_overhead_impact")).exists());
}

#[test]
fn test_dag_stats_concatenates_batches() {
    let dir = TempDir::new().unwrap();

    analyze_cmd()
        .arg("dag-stats")
        .arg(fixture("batch1_n30.csv"))
        .arg(fixture("batch2_n30.csv"))
        .arg("-o")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 8 experiments"))
        .stdout(predicate::str::contains("Total measurements: 240"))
        .stdout(predicate::str::contains("translate                   1.20× (Medium)"));

    assert!(dir.path().join(file_name("neon_speedup_by_operation")).exists());
}

#[test]
fn test_config_file_overrides_baseline() {
    let dir = TempDir::new().unwrap();
    let config = write_file(&dir, "analysis.toml", "baseline = \"neon\"\n");

    analyze_cmd()
        .arg("--config")
        .arg(&config)
        .arg("io-overhead")
        .arg(fixture("io_overhead.csv"))
        .arg("-o")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Compute-only NEON speedup (in-memory): 1.0×"));
}

#[test]
fn test_invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    let config = write_file(&dir, "analysis.toml", "baseline = \"\"\n");

    analyze_cmd()
        .arg("--config")
        .arg(&config)
        .arg("composition")
        .arg(fixture("composition.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid analysis config"));
}

#[test]
fn test_publication_plots_from_every_input() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("plots");

    analyze_cmd()
        .arg("publication-plots")
        .arg("--batch")
        .arg(fixture("publication_batch.csv"))
        .arg("--memory")
        .arg(fixture("streaming_memory.csv"))
        .arg("--overhead")
        .arg(fixture("streaming_overhead.csv"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("(3 operations)"))
        .stdout(predicate::str::contains("96.2%"))
        .stdout(predicate::str::contains("84.0%"))
        .stdout(predicate::str::contains("5 of 5 figures generated"));

    for stem in [
        "plot1_neon_speedup_by_operation",
        "plot2_streaming_memory_footprint",
        "plot3_io_optimization_stack",
        "plot4_block_size_impact",
        "plot5_mmap_threshold_effect",
    ] {
        assert!(out.join(file_name(stem)).exists(), "missing {stem}");
    }
}

#[test]
fn test_publication_plots_skip_missing_inputs() {
    let dir = TempDir::new().unwrap();

    analyze_cmd()
        .arg("publication-plots")
        .arg("-o")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped plot2_streaming_memory_footprint"))
        .stdout(predicate::str::contains("2 of 5 figures generated"));
}

#[test]
fn test_file_reports_are_byte_identical_across_runs() {
    let dir = TempDir::new().unwrap();
    let baseline = dir.path().join("mac_baseline.csv");
    analyze_cmd()
        .arg("extract-baseline")
        .arg(fixture("mac.csv"))
        .arg("--output")
        .arg(&baseline)
        .assert()
        .success();

    let mut comparisons = Vec::new();
    for run in ["first.csv", "second.csv"] {
        let output = dir.path().join(run);
        analyze_cmd()
            .arg("compare-platforms")
            .arg(&baseline)
            .arg(fixture("graviton.csv"))
            .arg("--output")
            .arg(&output)
            .assert()
            .success();
        comparisons.push(fs::read(&output).unwrap());
    }
    assert!(!comparisons[0].is_empty());
    assert_eq!(comparisons[0], comparisons[1]);

    let log = stage(&dir, "power.log");
    let pilot = stage(&dir, "power_pilot_raw_test.csv");
    let enriched = dir.path().join("power_enriched_test.csv");
    let mut runs = Vec::new();
    for _ in 0..2 {
        analyze_cmd().arg("power-parse").arg(&log).arg(&pilot).assert().success();
        runs.push(fs::read(&enriched).unwrap());
    }
    assert_eq!(runs[0], runs[1]);

    let mut figures = Vec::new();
    for run in ["a", "b"] {
        let out = dir.path().join(run);
        analyze_cmd()
            .arg("publication-plots")
            .arg("-o")
            .arg(&out)
            .assert()
            .success();
        figures.push(fs::read(out.join(file_name("plot3_io_optimization_stack"))).unwrap());
    }
    assert_eq!(figures[0], figures[1]);
}
