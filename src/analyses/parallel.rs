// Thread scaling report
//
// Speedup matrices (threads × scale per core assignment), summary statistics
// and three decision rules derived from a parallel dimension sweep. Scale
// columns always follow size order; only scales with data are printed.

use crate::aggregate::{best_by, group_by, mean, sorted_unique, Direction, Pivot};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::loader::{load_records, Schema};
use crate::report::chart::{self, write_bars, write_line, BarChart, LineChart, Reference, Series, XAxis};
use crate::report::text::rule;
use crate::report::write_output;
use crate::scale::Scale;
use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

const WIDTH: usize = 70;
const ASSIGNMENTS: [&str; 3] = ["default", "p_cores", "e_cores"];
const CHART_THREADS: [u32; 4] = [1, 2, 4, 8];
const BENEFIT_THRESHOLD: f64 = 1.1;

#[derive(Debug, Clone, Deserialize)]
pub struct ParallelRecord {
    pub operation: String,
    pub complexity: f64,
    pub scale: String,
    pub threads: u32,
    pub assignment: String,
    pub speedup_vs_1t: f64,
    pub efficiency: f64,
    pub num_sequences: u64,
}

impl Schema for ParallelRecord {
    const REQUIRED: &'static [&'static str] = &[
        "operation",
        "complexity",
        "scale",
        "threads",
        "assignment",
        "speedup_vs_1t",
        "efficiency",
        "num_sequences",
    ];
}

fn operations(records: &[ParallelRecord]) -> Vec<String> {
    sorted_unique(records.iter().map(|r| r.operation.as_str()))
}

fn complexity_of(records: &[ParallelRecord], operation: &str) -> f64 {
    records
        .iter()
        .find(|r| r.operation == operation)
        .map_or(0.0, |r| r.complexity)
}

fn mean_speedup<'a>(rows: impl IntoIterator<Item = &'a ParallelRecord>) -> Option<f64> {
    mean(rows.into_iter().map(|r| r.speedup_vs_1t))
}

/// Threads × scale pivot of mean speedup for one (operation, assignment)
fn matrix(rows: &[&ParallelRecord], assignment: &str) -> String {
    let mut threads: Vec<u32> = rows.iter().map(|r| r.threads).collect();
    threads.sort_unstable();
    threads.dedup();
    let row_order: Vec<String> = threads.iter().map(u32::to_string).collect();

    let pivot = Pivot::build(
        rows,
        |r| r.threads.to_string(),
        |r| r.scale.clone(),
        |r| r.speedup_vs_1t,
        &row_order,
        &Scale::labels(),
    );
    let cols = pivot.populated_cols();

    let mut out = format!("{:15}  ", assignment.to_uppercase());
    for col in &cols {
        out.push_str(&format!("{col:>12}"));
    }
    out.push('\n');
    out.push_str(&rule('-', 15 + 12 * cols.len()));
    out.push('\n');

    for t in &row_order {
        out.push_str(&format!("{t}t {assignment:13}  "));
        for col in &cols {
            match pivot.get(t, col) {
                Some(cell) => out.push_str(&format!("{:11.2}×", cell.mean)),
                None => out.push_str(&format!("{:>12}", "N/A")),
            }
        }
        out.push('\n');
    }
    out.push('\n');
    out
}

/// Render `speedup_matrices.txt`
pub fn speedup_matrices(records: &[ParallelRecord]) -> String {
    let bar = rule('=', WIDTH);
    let mut out = String::new();
    for op in operations(records) {
        let op_rows: Vec<&ParallelRecord> = records.iter().filter(|r| r.operation == op).collect();
        out.push_str(&format!(
            "\n{bar}\nOperation: {op} (complexity {:.2})\n{bar}\n\n",
            complexity_of(records, &op)
        ));
        for assignment in ASSIGNMENTS {
            let rows: Vec<&ParallelRecord> = op_rows
                .iter()
                .copied()
                .filter(|r| r.assignment == assignment)
                .collect();
            if !rows.is_empty() {
                out.push_str(&matrix(&rows, assignment));
            }
        }
    }
    out
}

fn at_huge_8t<'a>(records: &'a [ParallelRecord], op: &str) -> Vec<&'a ParallelRecord> {
    records
        .iter()
        .filter(|r| r.operation == op && r.scale == Scale::Huge.label() && r.threads == 8)
        .collect()
}

fn assignment_mean(rows: &[&ParallelRecord], assignment: &str) -> Option<f64> {
    mean_speedup(rows.iter().copied().filter(|r| r.assignment == assignment))
}

/// Render `summary_statistics.txt`
pub fn summary_statistics(records: &[ParallelRecord]) -> String {
    let dash = rule('-', WIDTH);
    let mut out = format!("OVERALL PARALLEL PERFORMANCE SUMMARY\n{}\n\n", rule('=', WIDTH));

    out.push_str(&format!("Best Speedup Achieved (any configuration):\n{dash}\n"));
    for op in operations(records) {
        let rows = records.iter().filter(|r| r.operation == op);
        if let Some(best) = best_by(rows, |r| r.speedup_vs_1t, Direction::Max) {
            out.push_str(&format!(
                "{op:20} (complexity {:.2}): {:.2}× ({}t/{}, {} scale)\n",
                best.complexity, best.speedup_vs_1t, best.threads, best.assignment, best.scale
            ));
        }
    }
    out.push('\n');

    out.push_str(&format!(
        "Speedup at 8 threads, Huge scale (10M sequences):\n{dash}\n"
    ));
    for op in operations(records) {
        let rows = at_huge_8t(records, &op);
        let best = best_by(rows.iter().copied(), |r| r.speedup_vs_1t, Direction::Max);
        if let (Some(avg), Some(best)) = (mean_speedup(rows.iter().copied()), best) {
            out.push_str(&format!(
                "{op:20}: Avg={avg:.2}×, Best={:.2}× ({})\n",
                best.speedup_vs_1t, best.assignment
            ));
        }
    }
    out.push('\n');

    out.push_str(&format!(
        "P-cores vs E-cores (8 threads, Huge scale, relative performance):\n{dash}\n"
    ));
    for op in operations(records) {
        let rows = at_huge_8t(records, &op);
        let (Some(p), Some(e)) = (assignment_mean(&rows, "p_cores"), assignment_mean(&rows, "e_cores")) else {
            continue;
        };
        if e <= 0.0 {
            continue;
        }
        let ratio = p / e;
        let (winner, margin) = if ratio > 1.0 {
            ("P-cores", (ratio - 1.0) * 100.0)
        } else {
            ("E-cores", (1.0 / ratio - 1.0) * 100.0)
        };
        out.push_str(&format!(
            "{op:20}: P={p:.2}×, E={e:.2}×, Winner: {winner} (+{margin:.1}%)\n"
        ));
    }
    out
}

/// First scale where the default 2-thread speedup clears the benefit threshold
pub fn minimum_batch(records: &[ParallelRecord], op: &str) -> Option<(Scale, u64)> {
    Scale::ALL.into_iter().find_map(|scale| {
        let first = records.iter().find(|r| {
            r.operation == op
                && r.threads == 2
                && r.assignment == "default"
                && r.scale == scale.label()
        })?;
        (first.speedup_vs_1t > BENEFIT_THRESHOLD).then_some((scale, first.num_sequences))
    })
}

/// Render `decision_rules.txt`
pub fn decision_rules(records: &[ParallelRecord]) -> String {
    let dash = rule('-', WIDTH);
    let ops = operations(records);
    let scales = sorted_unique(records.iter().map(|r| r.scale.as_str())).len();
    let configs = group_by(records, |r| (r.threads, r.assignment.clone())).len();

    let mut out = format!("PARALLEL OPTIMIZATION DECISION RULES\n{}\n\n", rule('=', WIDTH));
    out.push_str(&format!(
        "Based on {} experiments across {} operations × {scales} scales × {configs} configs\n\n",
        records.len(),
        ops.len()
    ));

    out.push_str(&format!("RULE 1: Minimum Batch Size for Parallel Benefit\n{dash}\n"));
    for op in &ops {
        match minimum_batch(records, op) {
            Some((scale, seqs)) => {
                out.push_str(&format!("{op:20}: >={seqs:>8} sequences ({scale})\n"))
            }
            None => out.push_str(&format!("{op:20}: No clear benefit observed\n")),
        }
    }
    out.push('\n');

    out.push_str(&format!("RULE 2: Optimal Thread Count (Default Assignment)\n{dash}\n"));
    for scale in &Scale::ALL[1..] {
        out.push_str(&format!("\n{scale} scale:\n"));
        for op in &ops {
            let rows = records.iter().filter(|r| {
                r.operation == *op && r.scale == scale.label() && r.assignment == "default"
            });
            if let Some(best) = best_by(rows, |r| r.speedup_vs_1t, Direction::Max) {
                out.push_str(&format!(
                    "  {op:20}: {}t ({:.2}× speedup)\n",
                    best.threads, best.speedup_vs_1t
                ));
            }
        }
    }
    out.push('\n');

    out.push_str(&format!("RULE 3: P-cores vs E-cores (8 threads, Huge scale)\n{dash}\n"));
    for op in &ops {
        let rows = at_huge_8t(records, op);
        let Some(default) = assignment_mean(&rows, "default") else {
            out.push_str(&format!("{op:20}: No default 8-thread Huge data\n"));
            continue;
        };
        let mut best = ("default", default);
        for assignment in ["p_cores", "e_cores"] {
            if let Some(speedup) = assignment_mean(&rows, assignment) {
                if speedup > best.1 {
                    best = (assignment, speedup);
                }
            }
        }
        if best.0 == "default" {
            out.push_str(&format!(
                "{op:20}: Use default (no benefit from explicit assignment)\n"
            ));
        } else {
            let improvement = if default > 0.0 {
                (best.1 / default - 1.0) * 100.0
            } else {
                0.0
            };
            out.push_str(&format!(
                "{op:20}: Use {} (+{improvement:.1}% vs default)\n",
                best.0
            ));
        }
    }
    out
}

fn scale_points<'a>(
    rows: impl Iterator<Item = &'a ParallelRecord> + Clone,
    value: impl Fn(&ParallelRecord) -> f64,
) -> Vec<(f64, f64)> {
    Scale::ALL
        .into_iter()
        .filter_map(|scale| {
            let avg = mean(rows.clone().filter(|r| r.scale == scale.label()).map(&value))?;
            Some((scale.num_sequences() as f64, avg))
        })
        .collect()
}

fn write_charts(records: &[ParallelRecord], dir: &Path, config: &AnalysisConfig) -> Result<()> {
    let default = || records.iter().filter(|r| r.assignment == "default");

    let mut curves = LineChart::new(
        "Speedup vs scale (default assignment, mean across operations)",
        "Sequences (log scale)",
        "Speedup vs 1t",
        XAxis::Log10,
    );
    for threads in CHART_THREADS {
        let points = scale_points(default().filter(move |r| r.threads == threads), |r| r.speedup_vs_1t);
        if !points.is_empty() {
            curves.series.push(Series::new(format!("{threads}t"), points));
        }
    }
    curves.reference = Some(Reference::new(1.0, "no speedup"));
    write_line(&dir.join(chart::file_name("speedup_curves")), &curves, &config.chart)?;

    let mut efficiency = LineChart::new(
        "Parallel efficiency (8 threads, default)",
        "Sequences (log scale)",
        "Efficiency (speedup/threads)",
        XAxis::Log10,
    );
    for op in operations(records) {
        let rows = default().filter(|r| r.threads == 8 && r.operation == op);
        let points = scale_points(rows, |r| r.efficiency);
        if !points.is_empty() {
            efficiency.series.push(Series::new(op.clone(), points));
        }
    }
    write_line(&dir.join(chart::file_name("efficiency_8t")), &efficiency, &config.chart)?;

    let ops = operations(records);
    let assignments = ASSIGNMENTS
        .iter()
        .map(|a| {
            let values = ops
                .iter()
                .map(|op| assignment_mean(&at_huge_8t(records, op), a).unwrap_or(f64::NAN))
                .collect();
            (a.to_string(), values)
        })
        .collect();
    let mut bars = BarChart::new(
        "Core assignment comparison (8 threads, Huge scale)",
        "Speedup vs 1t",
        ops,
    );
    bars.series = assignments;
    bars.reference = Some(Reference::new(1.0, "no speedup"));
    write_bars(&dir.join(chart::file_name("core_assignment_comparison")), &bars, &config.chart)?;
    Ok(())
}

/// Load, write the three reports and charts, return the matrices text
pub fn run(input: &Path, output_dir: &Path, config: &AnalysisConfig) -> Result<String> {
    let records: Vec<ParallelRecord> = load_records(input)?;
    if records.is_empty() {
        return Err(AnalysisError::EmptyInput {
            path: input.to_path_buf(),
            reason: "no parallel experiments".to_string(),
        }
        .into());
    }
    let unknown = records.iter().filter(|r| Scale::from_label(&r.scale).is_none()).count();
    if unknown > 0 {
        warn!(rows = unknown, "rows with unrecognised scale labels left out of scale tables");
    }

    let matrices = speedup_matrices(&records);
    write_output(&output_dir.join("speedup_matrices.txt"), &matrices)?;
    write_output(&output_dir.join("summary_statistics.txt"), &summary_statistics(&records))?;
    write_output(&output_dir.join("decision_rules.txt"), &decision_rules(&records))?;
    write_charts(&records, output_dir, config)?;
    info!(dir = %output_dir.display(), "parallel analysis complete");

    let mut out = format!(
        "Loaded {} experiments\n\n{}\nSPEEDUP MATRICES BY OPERATION\n{}\n",
        records.len(),
        rule('=', WIDTH),
        rule('=', WIDTH)
    );
    out.push_str(&matrices);
    out.push_str(&format!("\nAll outputs saved to: {}\n", output_dir.display()));
    for file in ["speedup_matrices.txt", "summary_statistics.txt", "decision_rules.txt"] {
        out.push_str(&format!("  - {file}\n"));
    }
    for stem in ["speedup_curves", "efficiency_8t", "core_assignment_comparison"] {
        out.push_str(&format!("  - {}\n", chart::file_name(stem)));
    }
    Ok(out)
}
