//! Publication figures
//!
//! Five figures for the write-up: NEON speedup by operation, streaming memory
//! footprint, the I/O optimization stack, record-by-record streaming overhead
//! and the mmap threshold effect. The I/O stack and mmap figures are drawn from
//! the measurements held in [`PublicationConfig`]; each of the other three
//! needs its CSV and is skipped when that input is not given.

use super::dag_stats::speedup_bars;
use crate::aggregate::{group_by, mean};
use crate::baseline::{join, BaselineSpec, Ratio};
use crate::config::AnalysisConfig;
use crate::loader::{load_records, Record, Schema};
use crate::report::chart::{
    self, write_bars, write_figure, BarChart, BarLayout, Figure, Panel, Reference,
};
use crate::report::text::{banner, rule};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

const WIDTH: usize = 60;
const MEMORY_SCALES: [&str; 3] = ["Medium", "Large", "VeryLarge"];
const OVERHEAD_SCALES: [&str; 4] = ["Small", "Medium", "Large", "VeryLarge"];
const SPEEDUP_SCALE: &str = "Medium";
const OVERHEAD_CONFIG: &str = "neon";

/// One panel of the I/O stack figure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoStackPanel {
    pub title: String,
    /// MB/s for each stage
    pub throughput: Vec<f64>,
    /// Measured speedup of each stage over the first
    pub speedup: Vec<f64>,
}

/// Measured I/O values behind the two data-free figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicationConfig {
    pub io_stages: Vec<String>,
    pub io_panels: Vec<IoStackPanel>,
    pub mmap_file_mb: Vec<f64>,
    /// MB/s with buffered reads
    pub mmap_standard: Vec<f64>,
    /// MB/s with mmap plus madvise hints
    pub mmap_madvise: Vec<f64>,
    pub mmap_threshold_mb: f64,
}

impl Default for PublicationConfig {
    fn default() -> Self {
        Self {
            io_stages: vec![
                "Sequential Baseline".to_string(),
                "Parallel bgzip".to_string(),
                "Parallel + mmap".to_string(),
            ],
            io_panels: vec![
                IoStackPanel {
                    title: "Small Files (<50 MB)".to_string(),
                    throughput: vec![646.0, 3541.0, 3541.0],
                    speedup: vec![1.0, 5.48, 5.48],
                },
                IoStackPanel {
                    title: "Large Files (≥50 MB)".to_string(),
                    throughput: vec![718.0, 4669.0, 15694.0],
                    speedup: vec![1.0, 6.50, 16.3],
                },
            ],
            mmap_file_mb: vec![0.54, 5.4, 54.0, 544.0],
            mmap_standard: vec![8092.0, 7192.0, 6524.0, 6162.0],
            mmap_madvise: vec![5350.0, 7149.0, 15021.0, 15694.0],
            mmap_threshold_mb: 50.0,
        }
    }
}

impl PublicationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.io_stages.is_empty() {
            return Err("publication.io_stages must not be empty".to_string());
        }
        for panel in &self.io_panels {
            if panel.throughput.len() != self.io_stages.len()
                || panel.speedup.len() != self.io_stages.len()
            {
                return Err(format!(
                    "publication I/O panel '{}' needs {} throughput and speedup values",
                    panel.title,
                    self.io_stages.len()
                ));
            }
        }
        let n = self.mmap_file_mb.len();
        if n == 0 || self.mmap_standard.len() != n || self.mmap_madvise.len() != n {
            return Err(
                "publication mmap series must be non-empty and of equal length".to_string(),
            );
        }
        if self.mmap_threshold_mb.is_nan() || self.mmap_threshold_mb <= 0.0 {
            return Err("publication.mmap_threshold_mb must be positive".to_string());
        }
        Ok(())
    }
}

/// Batch row with the mean throughput of its repetitions
#[derive(Debug, Clone, Deserialize)]
pub struct BatchThroughput {
    pub operation: String,
    pub scale: String,
    pub config_name: String,
    pub throughput_mean: f64,
}

impl Schema for BatchThroughput {
    const REQUIRED: &'static [&'static str] =
        &["operation", "scale", "config_name", "throughput_mean"];
}

impl Record for BatchThroughput {
    fn dimension(&self, name: &str) -> Option<&str> {
        match name {
            "operation" => Some(&self.operation),
            "scale" => Some(&self.scale),
            "config_name" => Some(&self.config_name),
            _ => None,
        }
    }
}

/// Peak memory of one batch or streaming run
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryRecord {
    pub scale: String,
    pub pattern: String,
    pub peak_mb: f64,
}

impl Schema for MemoryRecord {
    const REQUIRED: &'static [&'static str] = &["scale", "pattern", "peak_mb"];
}

/// Throughput of one batch or record-by-record streaming run
#[derive(Debug, Clone, Deserialize)]
pub struct OverheadRecord {
    pub operation: String,
    pub scale: String,
    pub config: String,
    pub pattern: String,
    pub throughput_mean: f64,
}

impl Schema for OverheadRecord {
    const REQUIRED: &'static [&'static str] =
        &["operation", "scale", "config", "pattern", "throughput_mean"];
}

/// CSV inputs; a missing one skips its figure
#[derive(Debug, Clone, Copy, Default)]
pub struct Sources<'a> {
    pub batch: Option<&'a Path>,
    pub memory: Option<&'a Path>,
    pub overhead: Option<&'a Path>,
}

/// NEON over baseline at the medium scale, highest first
pub fn neon_speedups(records: &[BatchThroughput], baseline: &str) -> Vec<(String, f64)> {
    let spec = BaselineSpec::new(&["operation", "scale"], "config_name", baseline);
    let joined = join(records, &spec, |r| r.throughput_mean);
    let mut ranked: Vec<(String, f64)> = joined
        .rows
        .iter()
        .filter(|d| d.record.scale == SPEEDUP_SCALE && d.record.config_name == "neon")
        .filter_map(|d| {
            if d.ratio.confidence.is_flagged() {
                warn!(
                    operation = %d.record.operation,
                    flag = d.ratio.confidence.marker(),
                    "NEON speedup left out of the publication figure"
                );
                return None;
            }
            Some((d.record.operation.clone(), d.ratio.value))
        })
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

/// Mean peak MB of (batch, streaming) per scale, with the percentage saved
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRow {
    pub scale: String,
    pub batch_mb: f64,
    pub streaming_mb: f64,
    pub reduction_pct: f64,
}

pub fn memory_rows(records: &[MemoryRecord]) -> Vec<MemoryRow> {
    let mean_of = |scale: &str, pattern: &str| {
        mean(
            records
                .iter()
                .filter(|r| r.scale == scale && r.pattern == pattern)
                .map(|r| r.peak_mb),
        )
        .unwrap_or(f64::NAN)
    };
    MEMORY_SCALES
        .iter()
        .map(|&scale| {
            let batch_mb = mean_of(scale, "batch");
            let streaming_mb = mean_of(scale, "streaming");
            let reduction_pct = if batch_mb.is_finite() && batch_mb > 0.0 {
                (1.0 - streaming_mb / batch_mb) * 100.0
            } else {
                f64::NAN
            };
            MemoryRow {
                scale: scale.to_string(),
                batch_mb,
                streaming_mb,
                reduction_pct,
            }
        })
        .collect()
}

/// Streaming overhead in percent of batch throughput, per operation and scale
///
/// Operations keep their first-appearance order; a cell is NaN when either
/// pattern is missing or the batch throughput is zero.
pub fn overhead_rows(records: &[OverheadRecord]) -> Vec<(String, Vec<f64>)> {
    let neon: Vec<&OverheadRecord> = records
        .iter()
        .filter(|r| r.config == OVERHEAD_CONFIG)
        .collect();
    group_by(&neon, |r| r.operation.clone())
        .into_iter()
        .map(|(op, rows)| {
            let mean_of = |scale: &str, pattern: &str| {
                mean(
                    rows.iter()
                        .filter(|r| r.scale == scale && r.pattern == pattern)
                        .map(|r| r.throughput_mean),
                )
            };
            let values = OVERHEAD_SCALES
                .iter()
                .map(|&scale| match (mean_of(scale, "batch"), mean_of(scale, "streaming")) {
                    (Some(batch), Some(streaming)) => {
                        let ratio = Ratio::of(streaming, batch);
                        if ratio.confidence.is_flagged() {
                            warn!(operation = %op, scale, "zero batch throughput; overhead undefined");
                            f64::NAN
                        } else {
                            (1.0 - ratio.value) * 100.0
                        }
                    }
                    _ => f64::NAN,
                })
                .collect();
            (op, values)
        })
        .collect()
}

fn io_stack_figure(path: &Path, data: &PublicationConfig, config: &AnalysisConfig) -> Result<()> {
    let charts: Vec<BarChart> = data
        .io_panels
        .iter()
        .map(|panel| {
            let categories = data
                .io_stages
                .iter()
                .zip(&panel.speedup)
                .map(|(stage, s)| format!("{stage} ({s:.1}×)"))
                .collect();
            let mut chart = BarChart::new(&panel.title, "Throughput (MB/s)", categories);
            chart.series.push(("Throughput".to_string(), panel.throughput.clone()));
            chart.annotate = true;
            chart
        })
        .collect();
    let figure = Figure::grid(
        "I/O Optimization Stack: Layered Benefits (parallel bgzip + smart mmap)",
        2,
        charts.iter().map(Panel::Bars).collect(),
    );
    write_figure(path, &figure, &config.chart)
}

fn mmap_figure(path: &Path, data: &PublicationConfig, config: &AnalysisConfig) -> Result<()> {
    let categories: Vec<String> = data.mmap_file_mb.iter().map(|mb| format!("{mb} MB")).collect();

    let mut throughput = BarChart::new("Throughput by File Size", "Throughput (MB/s)", categories.clone());
    throughput.series.push(("Standard I/O".to_string(), data.mmap_standard.clone()));
    throughput.series.push(("mmap + madvise".to_string(), data.mmap_madvise.clone()));

    let threshold = data.mmap_threshold_mb;
    let speedup: Vec<(f64, f64)> = data
        .mmap_file_mb
        .iter()
        .zip(data.mmap_madvise.iter().zip(&data.mmap_standard))
        .map(|(&mb, (&mapped, &standard))| (mb, Ratio::of(mapped, standard).value))
        .collect();
    let side = |above: bool| -> Vec<f64> {
        speedup
            .iter()
            .map(|&(mb, s)| if (mb >= threshold) == above { s } else { f64::NAN })
            .collect()
    };
    let mut gain = BarChart::new(
        &format!("mmap Speedup by File Size (threshold {threshold} MB)"),
        "Speedup (mmap / standard)",
        categories,
    );
    gain.series.push((format!("Below {threshold} MB"), side(false)));
    gain.series.push((format!("At or above {threshold} MB"), side(true)));
    gain.layout = BarLayout::Overlaid;
    gain.annotate = true;
    gain.reference = Some(Reference::new(1.0, "No benefit"));

    let figure = Figure::grid(
        "mmap Threshold Effect: File Size Determines Benefit",
        2,
        vec![Panel::Bars(&throughput), Panel::Bars(&gain)],
    );
    write_figure(path, &figure, &config.chart)
}

fn memory_table(rows: &[MemoryRow]) -> String {
    let mut out = format!(
        "{:<12} {:>12} {:>14} {:>10}\n{}\n",
        "Scale",
        "Batch (MB)",
        "Streaming (MB)",
        "Saved",
        rule('-', 51)
    );
    for r in rows {
        out.push_str(&format!(
            "{:<12} {:>12.1} {:>14.1} {:>9.1}%\n",
            r.scale, r.batch_mb, r.streaming_mb, r.reduction_pct
        ));
    }
    out
}

fn overhead_table(rows: &[(String, Vec<f64>)]) -> String {
    let mut out = format!("{:<20}", "Operation");
    for scale in OVERHEAD_SCALES {
        out.push_str(&format!(" {scale:>10}"));
    }
    out.push_str(&format!("\n{}\n", rule('-', 20 + 11 * OVERHEAD_SCALES.len())));
    for (op, values) in rows {
        out.push_str(&format!("{op:<20}"));
        for v in values {
            if v.is_finite() {
                out.push_str(&format!(" {:>9.1}%", v));
            } else {
                out.push_str(&format!(" {:>10}", "n/a"));
            }
        }
        out.push('\n');
    }
    out
}

/// Write every figure whose inputs are available into `output_dir`
pub fn run(sources: Sources, output_dir: &Path, config: &AnalysisConfig) -> Result<String> {
    let data = &config.publication;
    let mut out = banner("PUBLICATION PLOTS", WIDTH);
    out.push_str(&format!("\nOutput directory: {}\n\n", output_dir.display()));
    let mut written = 0;

    let name = chart::file_name("plot1_neon_speedup_by_operation");
    match sources.batch {
        Some(path) => {
            let records: Vec<BatchThroughput> = load_records(path)?;
            let ranked = neon_speedups(&records, &config.baseline);
            let bars = speedup_bars(
                "NEON SIMD Speedup by Operation (Medium scale: 10K sequences)",
                &ranked,
            );
            write_bars(&output_dir.join(&name), &bars, &config.chart)?;
            out.push_str(&format!("✓ Saved: {name} ({} operations)\n", ranked.len()));
            written += 1;
        }
        None => out.push_str(&format!("- Skipped {name}: no --batch input\n")),
    }

    let name = chart::file_name("plot2_streaming_memory_footprint");
    let mut memory = None;
    match sources.memory {
        Some(path) => {
            let records: Vec<MemoryRecord> = load_records(path)?;
            let rows = memory_rows(&records);
            let mut bars = BarChart::new(
                "Streaming Memory Footprint",
                "Peak Memory Usage (MB)",
                rows.iter()
                    .map(|r| format!("{} (-{:.1}%)", r.scale, r.reduction_pct))
                    .collect(),
            );
            bars.series.push((
                "Batch (load-all)".to_string(),
                rows.iter().map(|r| r.batch_mb).collect(),
            ));
            bars.series.push((
                "Streaming".to_string(),
                rows.iter().map(|r| r.streaming_mb).collect(),
            ));
            bars.annotate = true;
            write_bars(&output_dir.join(&name), &bars, &config.chart)?;
            out.push_str(&format!("✓ Saved: {name}\n"));
            memory = Some(rows);
            written += 1;
        }
        None => out.push_str(&format!("- Skipped {name}: no --memory input\n")),
    }

    let name = chart::file_name("plot3_io_optimization_stack");
    io_stack_figure(&output_dir.join(&name), data, config)?;
    out.push_str(&format!("✓ Saved: {name}\n"));
    written += 1;

    let name = chart::file_name("plot4_block_size_impact");
    let mut overhead = None;
    match sources.overhead {
        Some(path) => {
            let records: Vec<OverheadRecord> = load_records(path)?;
            let rows = overhead_rows(&records);
            let mut bars = BarChart::new(
                "Record-by-Record Streaming Overhead with NEON",
                "Streaming Overhead (%)",
                OVERHEAD_SCALES.iter().map(|s| s.to_string()).collect(),
            );
            bars.series = rows.clone();
            bars.reference = Some(Reference::new(0.0, "No overhead"));
            write_bars(&output_dir.join(&name), &bars, &config.chart)?;
            out.push_str(&format!("✓ Saved: {name}\n"));
            overhead = Some(rows);
            written += 1;
        }
        None => out.push_str(&format!("- Skipped {name}: no --overhead input\n")),
    }

    let name = chart::file_name("plot5_mmap_threshold_effect");
    mmap_figure(&output_dir.join(&name), data, config)?;
    out.push_str(&format!("✓ Saved: {name}\n"));
    written += 1;

    if let Some(rows) = memory {
        out.push_str("\nStreaming memory footprint:\n");
        out.push_str(&memory_table(&rows));
    }
    if let Some(rows) = overhead {
        out.push_str("\nStreaming overhead (NEON, % of batch throughput lost):\n");
        out.push_str(&overhead_table(&rows));
    }

    info!(figures = written, dir = %output_dir.display(), "publication plots complete");
    out.push_str(&format!("\n{written} of 5 figures generated\n"));
    Ok(out)
}
