//! Cross-platform portability
//!
//! `extract-baseline` cuts the reference-platform subset out of a power
//! pilot; `compare-platforms` joins a target platform's runs onto it and
//! measures how well each configuration's speedup transfers.

use crate::aggregate::{mean, Summary};
use crate::baseline::{join, BaselineSpec, Confidence, Ratio};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::loader::{load_raw, load_records, Record, Schema};
use crate::report::csv_output::{write_csv, write_records};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

const SUBSET_OPERATIONS: &[&str] = &["base_counting", "gc_content", "quality_aggregation"];
const SUBSET_CONFIGS: &[&str] = &["naive", "neon", "neon_4t"];
const SUBSET_SCALES: &[&str] = &["Medium", "Large"];

/// Keep the reference-platform rows the target platform also runs
///
/// Rows are written verbatim with the input header order. Returns the number
/// of rows kept; nothing is written when none match.
pub fn extract_baseline(input: &Path, output: &Path) -> Result<usize> {
    let table = load_raw(input, &["operation", "config", "scale"])?;
    let column = |name: &str| {
        table.column(name).ok_or_else(|| AnalysisError::MissingColumn {
            path: input.to_path_buf(),
            column: name.to_string(),
        })
    };
    let (op, config, scale) = (column("operation")?, column("config")?, column("scale")?);

    let keep = |row: &csv::StringRecord, idx: usize, allowed: &[&str]| {
        row.get(idx).is_some_and(|v| allowed.contains(&v))
    };
    let kept: Vec<csv::StringRecord> = table
        .rows
        .iter()
        .filter(|r| {
            keep(r, op, SUBSET_OPERATIONS) && keep(r, config, SUBSET_CONFIGS) && keep(r, scale, SUBSET_SCALES)
        })
        .cloned()
        .collect();

    if kept.is_empty() {
        warn!(input = %input.display(), "No matching experiments found");
        return Ok(0);
    }
    write_records(output, &table.headers, &kept)?;
    info!(rows = kept.len(), output = %output.display(), "extracted reference baseline");
    Ok(kept.len())
}

/// `extract-baseline` entry point
pub fn run_extract(input: &Path, output: &Path) -> Result<String> {
    let kept = extract_baseline(input, output)?;
    Ok(if kept == 0 {
        "No matching experiments found\n".to_string()
    } else {
        format!(
            "Extracted {kept} reference baseline experiments\nOutput: {}\n",
            output.display()
        )
    })
}

/// One benchmark run on either platform
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformRecord {
    pub operation: String,
    pub config: String,
    pub scale: String,
    pub num_sequences: u64,
    pub throughput_seqs_per_sec: f64,
}

impl Schema for PlatformRecord {
    const REQUIRED: &'static [&'static str] = &[
        "operation",
        "config",
        "scale",
        "num_sequences",
        "throughput_seqs_per_sec",
    ];
}

impl Record for PlatformRecord {
    fn dimension(&self, name: &str) -> Option<&str> {
        match name {
            "operation" => Some(&self.operation),
            "config" => Some(&self.config),
            "scale" => Some(&self.scale),
            _ => None,
        }
    }
}

/// Target run joined onto its reference counterpart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub operation: String,
    pub config: String,
    pub scale: String,
    pub num_sequences: u64,
    pub mac_throughput: f64,
    pub mac_speedup: f64,
    pub graviton_throughput: f64,
    pub graviton_speedup: f64,
    pub portability_ratio: f64,
    pub speedup_variance_pct: f64,
    pub graviton_vs_mac_throughput: f64,
    /// Set when a speedup or ratio in this row divided by zero
    #[serde(default)]
    pub flag: Confidence,
}

impl Schema for ComparisonRecord {
    const REQUIRED: &'static [&'static str] = &[
        "operation",
        "config",
        "scale",
        "num_sequences",
        "mac_speedup",
        "graviton_speedup",
        "portability_ratio",
        "speedup_variance_pct",
    ];
}

/// `numerator / denominator`, flagged as zero-baseline unless the denominator is positive
fn positive_ratio(numerator: f64, denominator: f64) -> Ratio {
    Ratio::of(numerator, denominator.max(0.0))
}

/// Speedup of every run against its (operation, scale) baseline
fn speedups<'a>(records: &'a [PlatformRecord], baseline: &str) -> Vec<(&'a PlatformRecord, Ratio)> {
    let spec = BaselineSpec::new(&["operation", "scale"], "config", baseline);
    join(records, &spec, |r| r.throughput_seqs_per_sec)
        .rows
        .into_iter()
        .map(|d| (d.record, d.ratio))
        .collect()
}

/// Join target runs onto reference runs by (operation, config, scale)
///
/// Target runs without a reference counterpart are dropped. The first
/// reference run for a key wins.
pub fn compare(
    reference: &[PlatformRecord],
    target: &[PlatformRecord],
    baseline: &str,
) -> Vec<ComparisonRecord> {
    let mut lookup: HashMap<(&str, &str, &str), (&PlatformRecord, Ratio)> = HashMap::new();
    for (r, speedup) in speedups(reference, baseline) {
        lookup
            .entry((r.operation.as_str(), r.config.as_str(), r.scale.as_str()))
            .or_insert((r, speedup));
    }

    speedups(target, baseline)
        .into_iter()
        .filter_map(|(t, target_speedup)| {
            let &(m, mac_speedup) =
                lookup.get(&(t.operation.as_str(), t.config.as_str(), t.scale.as_str()))?;
            let portability = positive_ratio(target_speedup.value, mac_speedup.value);
            let variance =
                positive_ratio(target_speedup.value - mac_speedup.value, mac_speedup.value);
            let throughput = positive_ratio(t.throughput_seqs_per_sec, m.throughput_seqs_per_sec);
            let flag = Confidence::of_all([
                &mac_speedup,
                &target_speedup,
                &portability,
                &variance,
                &throughput,
            ]);
            if flag.is_flagged() {
                warn!(
                    operation = %t.operation,
                    config = %t.config,
                    scale = %t.scale,
                    flag = flag.marker(),
                    "comparison row divides by zero"
                );
            }
            Some(ComparisonRecord {
                operation: t.operation.clone(),
                config: t.config.clone(),
                scale: t.scale.clone(),
                num_sequences: t.num_sequences,
                mac_throughput: m.throughput_seqs_per_sec,
                mac_speedup: mac_speedup.value,
                graviton_throughput: t.throughput_seqs_per_sec,
                graviton_speedup: target_speedup.value,
                portability_ratio: portability.value,
                speedup_variance_pct: variance.value * 100.0,
                graviton_vs_mac_throughput: throughput.value,
                flag,
            })
        })
        .collect()
}

/// Portability of single-threaded NEON across the two platforms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Portability {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub validated: bool,
}

impl Portability {
    /// Summarize `portability_ratio` over the `neon` rows; `None` without any
    pub fn of(rows: &[ComparisonRecord], config: &AnalysisConfig) -> Option<Portability> {
        let neon: Vec<&ComparisonRecord> = rows.iter().filter(|r| r.config == "neon").collect();
        let summary = Summary::of(&neon, |r| r.portability_ratio)?;
        Some(Portability {
            count: summary.count,
            mean: summary.mean,
            min: summary.min,
            max: summary.max,
            validated: config.in_portability_band(summary.mean),
        })
    }

    pub fn status(&self) -> &'static str {
        if self.validated {
            "✅ VALIDATED"
        } else {
            "⚠️ Outside range"
        }
    }
}

/// Mean reference and target speedups of the 4-thread configuration
pub fn parallel_means(rows: &[ComparisonRecord]) -> Option<(f64, f64)> {
    let parallel: Vec<&ComparisonRecord> = rows.iter().filter(|r| r.config == "neon_4t").collect();
    Some((
        mean(parallel.iter().map(|r| r.mac_speedup))?,
        mean(parallel.iter().map(|r| r.graviton_speedup))?,
    ))
}

/// `compare-platforms` entry point
pub fn run_compare(
    reference: &Path,
    target: &Path,
    output: &Path,
    config: &AnalysisConfig,
) -> Result<String> {
    let reference_rows: Vec<PlatformRecord> = load_records(reference)?;
    let target_rows: Vec<PlatformRecord> = load_records(target)?;
    let rows = compare(&reference_rows, &target_rows, &config.baseline);

    let mut out = format!(
        "Reference experiments: {}\nTarget experiments: {}\n",
        reference_rows.len(),
        target_rows.len()
    );
    if rows.is_empty() {
        warn!("No comparison data to write");
        out.push_str("No comparison data to write\n");
        return Ok(out);
    }

    write_csv(output, &rows)?;
    out.push_str(&format!(
        "Comparison complete: {} experiments\nOutput: {}\n",
        rows.len(),
        output.display()
    ));

    if let Some(p) = Portability::of(&rows, config) {
        let (lo, hi) = config.portability_band;
        out.push_str("\n=== Portability Summary (NEON single-threaded) ===\n");
        out.push_str(&format!("Experiments: {}\n", p.count));
        out.push_str(&format!(
            "Portability ratio: {:.2} (range: {:.2} - {:.2})\n",
            p.mean, p.min, p.max
        ));
        out.push_str(&format!("Expected: {lo} - {hi}\n"));
        out.push_str(if p.validated {
            "✅ Portability VALIDATED\n"
        } else {
            "⚠️  Portability outside expected range\n"
        });
    }
    Ok(out)
}
