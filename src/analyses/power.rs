//! Power log correlation
//!
//! Averages the power samples that fall inside each pilot experiment's
//! window, converts them to energy and derives time/energy speedups against
//! the baseline configuration of each (operation, scale) group.

use crate::baseline::{index_groups, BaselineSpec, Confidence, Ratio};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::loader::{load_records, Record, Schema};
use crate::powerlog::{load_log, PowerSample};
use crate::report::csv_output::write_csv;
use anyhow::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One pilot experiment as written by the benchmark harness
#[derive(Debug, Clone, Deserialize)]
pub struct PilotRecord {
    /// Naive local start time, ISO-8601
    pub timestamp: String,
    pub loop_duration_s: f64,
    pub num_sequences: u64,
    pub iterations: u64,
    pub sequences_processed: u64,
    pub throughput_seqs_per_sec: f64,
    pub operation: String,
    pub config: String,
    pub scale: String,
}

impl Schema for PilotRecord {
    const REQUIRED: &'static [&'static str] = &[
        "timestamp",
        "loop_duration_s",
        "num_sequences",
        "iterations",
        "sequences_processed",
        "throughput_seqs_per_sec",
        "operation",
        "config",
        "scale",
    ];
}

/// Pilot experiment with power, energy and efficiency metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub operation: String,
    pub config: String,
    pub scale: String,
    pub num_sequences: u64,
    pub loop_duration_s: f64,
    pub iterations: u64,
    pub sequences_processed: u64,
    pub throughput_seqs_per_sec: f64,
    pub cpu_power_mw: f64,
    pub cpu_power_w: f64,
    pub energy_wh: f64,
    pub energy_per_seq_uwh: f64,
    pub time_speedup_vs_naive: f64,
    pub energy_speedup_vs_naive: f64,
    pub energy_efficiency: f64,
    /// Confidence of the three speedup columns
    #[serde(default)]
    pub flag: Confidence,
    pub power_samples_count: usize,
    pub timestamp: String,
}

impl Schema for EnrichedRecord {
    const REQUIRED: &'static [&'static str] = &[
        "operation",
        "config",
        "scale",
        "num_sequences",
        "cpu_power_w",
        "energy_wh",
        "energy_per_seq_uwh",
        "time_speedup_vs_naive",
        "energy_speedup_vs_naive",
        "energy_efficiency",
        "throughput_seqs_per_sec",
    ];
}

impl Record for EnrichedRecord {
    fn dimension(&self, name: &str) -> Option<&str> {
        match name {
            "operation" => Some(&self.operation),
            "config" => Some(&self.config),
            "scale" => Some(&self.scale),
            _ => None,
        }
    }
}

impl EnrichedRecord {
    /// Loop time per iteration; 0 when no iterations ran
    fn time_per_iteration(&self) -> f64 {
        if self.iterations > 0 {
            self.loop_duration_s / self.iterations as f64
        } else {
            0.0
        }
    }
}

/// Mean power of the samples inside `[start, start + duration]`
fn window_power(samples: &[PowerSample], start: NaiveDateTime, duration_s: f64) -> (f64, usize) {
    let inside: Vec<f64> = samples
        .iter()
        .filter(|s| {
            (s.local_time() - start)
                .num_microseconds()
                .map(|us| {
                    let offset = us as f64 / 1e6;
                    (0.0..=duration_s).contains(&offset)
                })
                .unwrap_or(false)
        })
        .map(|s| s.cpu_power_mw)
        .collect();
    if inside.is_empty() {
        (0.0, 0)
    } else {
        (inside.iter().sum::<f64>() / inside.len() as f64, inside.len())
    }
}

/// Attach power and energy to each pilot experiment
///
/// Experiments without samples get 0 mW and a warning.
pub fn correlate(
    path: &Path,
    pilots: &[PilotRecord],
    samples: &[PowerSample],
) -> crate::error::Result<Vec<EnrichedRecord>> {
    pilots
        .iter()
        .enumerate()
        .map(|(idx, p)| {
            let start = p.timestamp.parse::<NaiveDateTime>().map_err(|_| {
                AnalysisError::MalformedRecord {
                    path: path.to_path_buf(),
                    row: idx + 1,
                    column: "timestamp".to_string(),
                    value: p.timestamp.clone(),
                }
            })?;
            let (cpu_power_mw, count) = window_power(samples, start, p.loop_duration_s);
            if count == 0 {
                warn!(start = %p.timestamp, operation = %p.operation, config = %p.config, "No power samples for experiment");
            }
            let cpu_power_w = cpu_power_mw / 1000.0;
            let energy_wh = cpu_power_w * (p.loop_duration_s / 3600.0);
            let energy_per_seq_uwh = if p.sequences_processed > 0 {
                energy_wh * 1e6 / p.sequences_processed as f64
            } else {
                0.0
            };
            Ok(EnrichedRecord {
                operation: p.operation.clone(),
                config: p.config.clone(),
                scale: p.scale.clone(),
                num_sequences: p.num_sequences,
                loop_duration_s: p.loop_duration_s,
                iterations: p.iterations,
                sequences_processed: p.sequences_processed,
                throughput_seqs_per_sec: p.throughput_seqs_per_sec,
                cpu_power_mw,
                cpu_power_w,
                energy_wh,
                energy_per_seq_uwh,
                time_speedup_vs_naive: 1.0,
                energy_speedup_vs_naive: 1.0,
                energy_efficiency: 1.0,
                flag: Confidence::Measured,
                power_samples_count: count,
                timestamp: p.timestamp.clone(),
            })
        })
        .collect()
}

/// Fill in time speedup, energy speedup and efficiency against the baseline
///
/// Returns the number of groups without a baseline.
pub fn apply_efficiency(records: &mut [EnrichedRecord], baseline: &str) -> usize {
    let spec = BaselineSpec::new(&["operation", "scale"], "config", baseline);
    let (groups, warnings) = index_groups(records, &spec);

    for group in &groups {
        let Some(b) = group.baseline else {
            for &idx in &group.members {
                let r = &mut records[idx];
                r.time_speedup_vs_naive = Ratio::NEUTRAL.value;
                r.energy_speedup_vs_naive = Ratio::NEUTRAL.value;
                r.energy_efficiency = Ratio::NEUTRAL.value;
                r.flag = Ratio::NEUTRAL.confidence;
            }
            continue;
        };

        let base_time = records[b].time_per_iteration();
        let base_energy = records[b].energy_per_seq_uwh;
        for &idx in &group.members {
            let r = &mut records[idx];
            let (time, energy, efficiency) = if idx == b {
                (Ratio::IDENTITY, Ratio::IDENTITY, Ratio::IDENTITY)
            } else {
                let time = Ratio::of(base_time, r.time_per_iteration());
                let energy = Ratio::of(base_energy, r.energy_per_seq_uwh);
                (time, energy, Ratio::of(time.value, energy.value))
            };
            r.time_speedup_vs_naive = time.value;
            r.energy_speedup_vs_naive = energy.value;
            r.energy_efficiency = efficiency.value;
            r.flag = Confidence::of_all([&time, &energy, &efficiency]);
            if r.flag.is_flagged() {
                warn!(
                    operation = %r.operation,
                    config = %r.config,
                    scale = %r.scale,
                    flag = r.flag.marker(),
                    "efficiency ratio divides by zero"
                );
            }
        }
    }
    warnings.len()
}

/// `power_pilot_raw_<run>.csv` -> `power_enriched_<run>.csv` beside the pilot
pub fn enriched_path(pilot: &Path) -> PathBuf {
    let run = super::stem(pilot).replace("power_pilot_raw_", "");
    super::sibling(pilot, &format!("power_enriched_{run}.csv"))
}

/// Parse the log, correlate, write the enriched CSV and return a summary
pub fn run(log: &Path, pilot: &Path, config: &AnalysisConfig) -> Result<String> {
    let samples = load_log(log)?;
    let pilots: Vec<PilotRecord> = load_records(pilot)?;
    if pilots.is_empty() {
        return Err(AnalysisError::EmptyInput {
            path: pilot.to_path_buf(),
            reason: "no experiments to enrich".to_string(),
        }
        .into());
    }

    let mut enriched = correlate(pilot, &pilots, &samples)?;
    let missing_baseline = apply_efficiency(&mut enriched, &config.baseline);
    let unsampled = enriched.iter().filter(|e| e.power_samples_count == 0).count();
    let zero_baseline = enriched
        .iter()
        .filter(|e| e.flag == Confidence::ZeroBaseline)
        .count();

    let output = enriched_path(pilot);
    write_csv(&output, &enriched)?;
    info!(path = %output.display(), rows = enriched.len(), "saved enriched CSV");

    let mut out = String::new();
    out.push_str(&format!("Parsed {} power samples from {}\n", samples.len(), log.display()));
    out.push_str(&format!("Loaded {} experiments from {}\n", pilots.len(), pilot.display()));
    if unsampled > 0 {
        out.push_str(&format!("Experiments without power samples: {unsampled}\n"));
    }
    if zero_baseline > 0 {
        out.push_str(&format!(
            "Experiments with zero-baseline ratios (reported as 0.0): {zero_baseline}\n"
        ));
    }
    if missing_baseline > 0 {
        out.push_str(&format!(
            "Groups without a {} baseline: {missing_baseline}\n",
            config.baseline
        ));
    }
    out.push_str(&format!("Enriched CSV: {}\n", output.display()));
    Ok(out)
}
