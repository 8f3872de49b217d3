//! Statistical summary of DAG batch results
//!
//! Concatenates one or more batch CSVs, then reports the NEON effect size per
//! operation along with the measurement quality of the whole run.

use super::{default_dir, file_name};
use crate::aggregate::{sorted_unique, Summary};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::loader::{load_records, Schema};
use crate::report::chart::{self, write_bars, BarChart, BarLayout, Reference};
use crate::report::text::{banner, rule};
use crate::statistics::{cohens_d, EffectSize};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

const WIDTH: usize = 80;
const SCALES: [&str; 2] = ["Medium", "Large"];
const MINIMAL_BENEFIT: f64 = 2.0;

#[derive(Debug, Clone, Deserialize)]
pub struct BatchRecord {
    pub operation: String,
    pub scale: String,
    pub config_name: String,
    pub speedup_mean: f64,
    pub speedup_median: f64,
    pub speedup_ci_lower: f64,
    pub speedup_ci_upper: f64,
    pub speedup_std_dev: f64,
    pub n_valid: f64,
    pub n_outliers: f64,
}

impl Schema for BatchRecord {
    const REQUIRED: &'static [&'static str] = &[
        "operation",
        "scale",
        "config_name",
        "speedup_mean",
        "speedup_median",
        "speedup_ci_lower",
        "speedup_ci_upper",
        "speedup_std_dev",
        "n_valid",
        "n_outliers",
    ];
}

/// NEON against naive for one (operation, scale)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Significance {
    pub operation: String,
    pub scale: String,
    pub naive_speedup: f64,
    pub neon_speedup: f64,
    pub speedup_gain: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub cohens_d: f64,
    pub effect_size: EffectSize,
}

fn find<'a>(records: &'a [BatchRecord], op: &str, scale: &str, config: &str) -> Option<&'a BatchRecord> {
    records
        .iter()
        .find(|r| r.operation == op && r.scale == scale && r.config_name == config)
}

/// Effect of NEON per operation (sorted) and scale, where both configs ran
pub fn significance(records: &[BatchRecord]) -> Vec<Significance> {
    let mut out = Vec::new();
    for op in sorted_unique(records.iter().map(|r| r.operation.as_str())) {
        for scale in SCALES {
            let (Some(naive), Some(neon)) =
                (find(records, &op, scale, "naive"), find(records, &op, scale, "neon"))
            else {
                continue;
            };
            let d = cohens_d(neon.speedup_mean, naive.speedup_mean, neon.speedup_std_dev);
            out.push(Significance {
                operation: op.clone(),
                scale: scale.to_string(),
                naive_speedup: naive.speedup_mean,
                neon_speedup: neon.speedup_mean,
                speedup_gain: neon.speedup_mean - naive.speedup_mean,
                ci_lower: neon.speedup_ci_lower,
                ci_upper: neon.speedup_ci_upper,
                cohens_d: d,
                effect_size: EffectSize::classify(d),
            });
        }
    }
    out
}

/// Medium-scale rows by descending NEON speedup
fn medium_ranked(rows: &[Significance]) -> Vec<&Significance> {
    let mut medium: Vec<&Significance> = rows.iter().filter(|r| r.scale == "Medium").collect();
    medium.sort_by(|a, b| b.neon_speedup.total_cmp(&a.neon_speedup));
    medium
}

pub fn top_performers(rows: &[Significance]) -> String {
    let mut out = format!(
        "Top 5 Operations by NEON Speedup (Medium Scale):\n{}\n",
        rule('-', WIDTH)
    );
    for r in medium_ranked(rows).into_iter().take(5) {
        out.push_str(&format!(
            "  {:25} {:6.2}× (95% CI: [{:.2}, {:.2}]) Cohen's d={:.2} ({})\n",
            r.operation, r.neon_speedup, r.ci_lower, r.ci_upper, r.cohens_d, r.effect_size
        ));
    }
    out
}

pub fn minimal_benefit(rows: &[Significance]) -> String {
    let mut minimal: Vec<&Significance> = rows
        .iter()
        .filter(|r| r.neon_speedup < MINIMAL_BENEFIT)
        .collect();
    minimal.sort_by(|a, b| a.neon_speedup.total_cmp(&b.neon_speedup));

    let mut out = format!(
        "Operations with Minimal NEON Benefit (<2× speedup):\n{}\n",
        rule('-', WIDTH)
    );
    for r in minimal {
        out.push_str(&format!(
            "  {:25} {:6.2}× ({})\n",
            r.operation, r.neon_speedup, r.scale
        ));
    }
    out
}

pub fn summary_statistics(records: &[BatchRecord], repetitions: usize) -> String {
    let mut out = String::from("Overall Dataset Statistics:\n");
    out.push_str(&format!("  Total experiments: {}\n", records.len()));
    out.push_str(&format!(
        "  Total measurements: {}\n",
        group_thousands((records.len() * repetitions) as u64)
    ));
    out.push_str(&format!(
        "  Operations tested: {}\n",
        sorted_unique(records.iter().map(|r| r.operation.as_str())).len()
    ));
    out.push_str(&format!(
        "  Configurations tested: {}\n",
        sorted_unique(records.iter().map(|r| r.config_name.as_str())).len()
    ));
    out.push_str(&format!(
        "  Scales tested: {}\n\n",
        sorted_unique(records.iter().map(|r| r.scale.as_str())).len()
    ));

    let neon: Vec<f64> = records
        .iter()
        .filter(|r| r.config_name.contains("neon") && SCALES.contains(&r.scale.as_str()))
        .map(|r| r.speedup_median)
        .collect();
    out.push_str("Speedup Statistics (all NEON configs, Medium/Large scales):\n");
    match Summary::from_values(&neon) {
        Some(s) => {
            out.push_str(&format!("  Mean NEON speedup: {:.2}×\n", s.mean));
            out.push_str(&format!("  Median NEON speedup: {:.2}×\n", s.median));
            out.push_str(&format!("  Max NEON speedup: {:.2}×\n", s.max));
            out.push_str(&format!("  Min NEON speedup: {:.2}×\n\n", s.min));
        }
        None => out.push_str("  No NEON measurements at Medium/Large scale\n\n"),
    }

    let valid = Summary::of(records, |r| r.n_valid).map_or(0.0, |s| s.mean);
    let outliers = Summary::of(records, |r| r.n_outliers).map_or(0.0, |s| s.mean);
    let total_outliers: f64 = records.iter().map(|r| r.n_outliers).sum();
    let measurements = (records.len() * repetitions) as f64;
    let rate = if measurements > 0.0 {
        total_outliers / measurements * 100.0
    } else {
        0.0
    };
    out.push_str("Measurement Quality:\n");
    out.push_str(&format!(
        "  Mean valid samples per experiment: {valid:.1}/{repetitions}\n"
    ));
    out.push_str(&format!(
        "  Mean outliers per experiment: {outliers:.1}/{repetitions}\n"
    ));
    out.push_str(&format!("  Outlier rate: {rate:.1}%\n"));
    out
}

/// `12345` -> `12,345`
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Bars of NEON speedup per operation, coloured by benefit tier
pub(crate) fn speedup_bars(title: &str, ranked: &[(String, f64)]) -> BarChart {
    let mut chart = BarChart::new(
        title,
        "Speedup vs Naive (×)",
        ranked.iter().map(|(op, _)| op.clone()).collect(),
    );
    // one series per tier so each bar takes its tier colour
    let tiers: [(&str, fn(f64) -> bool); 3] = [
        ("High benefit (≥10×)", |s| s >= 10.0),
        ("Moderate (5-10×)", |s| (5.0..10.0).contains(&s)),
        ("Low (<5×)", |s| s < 5.0),
    ];
    chart.series = tiers
        .iter()
        .map(|(label, member)| {
            let values = ranked
                .iter()
                .map(|&(_, s)| if member(s) { s } else { f64::NAN })
                .collect();
            (label.to_string(), values)
        })
        .collect();
    chart.layout = BarLayout::Overlaid;
    chart.annotate = true;
    chart.reference = Some(Reference::new(1.0, "Baseline (1×)"));
    chart
}

fn write_chart(rows: &[Significance], path: &Path, config: &AnalysisConfig) -> Result<()> {
    let ranked: Vec<(String, f64)> = medium_ranked(rows)
        .into_iter()
        .map(|r| (r.operation.clone(), r.neon_speedup))
        .collect();
    let chart = speedup_bars("NEON SIMD Speedup by Operation (Medium Scale)", &ranked);
    write_bars(path, &chart, &config.chart)
}

/// Load every batch, report and write the chart
pub fn run(inputs: &[impl AsRef<Path>], output_dir: Option<&Path>, config: &AnalysisConfig) -> Result<String> {
    let first = inputs.first().context("No batch files given")?.as_ref();

    let mut out = banner("STATISTICAL ANALYSIS OF BATCH RESULTS", WIDTH);
    out.push_str("\nLoading datasets...\n");
    let mut records: Vec<BatchRecord> = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        let batch: Vec<BatchRecord> = load_records(input)?;
        out.push_str(&format!("  {}: {} experiments\n", file_name(input), batch.len()));
        records.extend(batch);
    }
    out.push_str(&format!("  Total: {} experiments\n\n", records.len()));
    if records.is_empty() {
        return Err(AnalysisError::EmptyInput {
            path: first.to_path_buf(),
            reason: "no batch experiments".to_string(),
        }
        .into());
    }

    let rows = significance(&records);
    out.push_str(&banner("1. STATISTICAL SIGNIFICANCE (effect sizes)", WIDTH));
    out.push('\n');
    out.push_str(&top_performers(&rows));
    out.push('\n');
    out.push_str(&minimal_benefit(&rows));
    out.push('\n');

    let chart = default_dir(first, output_dir).join(chart::file_name("neon_speedup_by_operation"));
    write_chart(&rows, &chart, config)?;
    out.push_str(&banner("2. PLOTS", WIDTH));
    out.push_str(&format!("  Saved: {}\n\n", chart.display()));

    out.push_str(&banner("3. SUMMARY STATISTICS", WIDTH));
    out.push('\n');
    out.push_str(&summary_statistics(&records, config.repetitions));
    info!(batches = inputs.len(), experiments = records.len(), "batch statistics complete");
    Ok(out)
}
