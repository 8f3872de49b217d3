// Power pilot findings document
//
// Reads a power-enriched CSV and writes FINDINGS.md beside it. The
// environmental and energy-claim sections are computed from base_counting at
// Large scale, baseline versus neon_8t; if either row is missing those
// sections report the data as unavailable.

use super::power::EnrichedRecord;
use super::{file_name, ordered_configs, sibling};
use crate::aggregate::{group_by, mean};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::loader::load_records;
use crate::report::markdown::{MarkdownDoc, MarkdownTable};
use crate::report::{times, write_output};
use crate::scale::Scale;
use anyhow::Result;
use std::path::Path;

const CONFIG_ORDER: &[&str] = &["naive", "neon", "neon_4t", "neon_8t"];
const SCENARIO_OPERATION: &str = "base_counting";
const SCENARIO_SCALE: &str = "Large";
const SCENARIO_OPTIMIZED: &str = "neon_8t";
const ANALYSES_PER_YEAR: f64 = 10_000.0;
const KG_CO2_PER_KWH: f64 = 0.5;
const ADOPTING_LABS: f64 = 10_000.0;

/// Scale labels in size order; unknown labels follow alphabetically
fn ordered_scales<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut labels: Vec<&str> = labels.into_iter().collect();
    labels.sort_by_key(|l| (Scale::from_label(l).map_or(usize::MAX, |s| s as usize), *l));
    labels.dedup();
    labels.into_iter().map(str::to_string).collect()
}

/// Baseline and optimized rows of the environmental scenario
fn scenario<'a>(
    records: &'a [EnrichedRecord],
    baseline: &str,
) -> Option<(&'a EnrichedRecord, &'a EnrichedRecord)> {
    let find = |config: &str| {
        records.iter().find(|r| {
            r.operation == SCENARIO_OPERATION && r.scale == SCENARIO_SCALE && r.config == config
        })
    };
    Some((find(baseline)?, find(SCENARIO_OPTIMIZED)?))
}

fn executive_summary(doc: &mut MarkdownDoc, records: &[EnrichedRecord], baseline: &str) {
    let operations = group_by(records, |r| r.operation.clone()).len();
    let configs = ordered_configs(CONFIG_ORDER, records.iter().map(|r| r.config.as_str()));
    let scales = ordered_scales(records.iter().map(|r| r.scale.as_str()));

    doc.h2("Executive Summary");
    doc.line(&format!("**Total experiments**: {}", records.len()));
    doc.line(&format!("**Operations tested**: {operations}"));
    doc.line(&format!("**Configurations**: {} ({})", configs.len(), configs.join(", ")));
    doc.line(&format!("**Scales**: {} ({})", scales.len(), scales.join(", ")));
    doc.blank();

    let optimized: Vec<&EnrichedRecord> = records.iter().filter(|r| r.config != baseline).collect();
    if let (Some(time), Some(energy), Some(efficiency)) = (
        mean(optimized.iter().map(|r| r.time_speedup_vs_naive)),
        mean(optimized.iter().map(|r| r.energy_speedup_vs_naive)),
        mean(optimized.iter().map(|r| r.energy_efficiency)),
    ) {
        doc.line("**Key Finding**: Energy scales with runtime");
        doc.bullet(&format!("Average time speedup: **{}**", times(time, 1)));
        doc.bullet(&format!("Average energy speedup: **{}**", times(energy, 1)));
        doc.bullet(&format!(
            "Average energy efficiency: **{efficiency:.2}** (1.0 = ideal)"
        ));
        doc.blank();
    }
    doc.rule();
}

fn results_by_operation(doc: &mut MarkdownDoc, records: &[EnrichedRecord]) {
    doc.h2("Results by Operation");

    let mut operations = group_by(records, |r| r.operation.clone());
    operations.sort_by(|a, b| a.0.cmp(&b.0));

    for (operation, rows) in operations {
        doc.h3(&operation);
        let scales = ordered_scales(rows.iter().map(|r| r.scale.as_str()));
        for scale in scales {
            let at_scale: Vec<&EnrichedRecord> =
                rows.iter().copied().filter(|r| r.scale == scale).collect();
            let Some(first) = at_scale.first() else {
                continue;
            };
            doc.paragraph(&format!(
                "**{scale} scale** ({} sequences):",
                first.num_sequences
            ));

            let mut table = MarkdownTable::new(&[
                "Config",
                "CPU Power (W)",
                "Energy (mWh)",
                "Energy/Seq (μWh)",
                "Time Speedup",
                "Energy Speedup",
                "Efficiency",
            ]);
            for config in ordered_configs(CONFIG_ORDER, at_scale.iter().map(|r| r.config.as_str())) {
                for r in at_scale.iter().filter(|r| r.config == config) {
                    table.add_row(vec![
                        r.config.clone(),
                        format!("{:.1}", r.cpu_power_w),
                        format!("{:.3}", r.energy_wh * 1000.0),
                        format!("{:.3}", r.energy_per_seq_uwh),
                        times(r.time_speedup_vs_naive, 1),
                        times(r.energy_speedup_vs_naive, 1),
                        format!("{:.2}", r.energy_efficiency),
                    ]);
                }
            }
            doc.table(&table);
        }
        doc.rule();
    }
}

fn power_draw(doc: &mut MarkdownDoc, records: &[EnrichedRecord], baseline: &str) {
    doc.h2("Power Draw Analysis");
    doc.paragraph("Does optimization increase power draw per unit time?");

    let by_config = group_by(records, |r| r.config.clone());
    let avg = |config: &str| {
        by_config
            .iter()
            .find(|(c, _)| c == config)
            .and_then(|(_, rows)| mean(rows.iter().map(|r| r.cpu_power_w)))
    };
    let base_power = avg(baseline).unwrap_or(0.0);

    let vs_header = format!("vs {baseline}");
    let mut table = MarkdownTable::new(&["Configuration", "Average CPU Power (W)", vs_header.as_str()]);
    for config in ordered_configs(CONFIG_ORDER, records.iter().map(|r| r.config.as_str())) {
        if let Some(power) = avg(&config) {
            let ratio = if base_power > 0.0 { power / base_power } else { 0.0 };
            table.add_row(vec![config, format!("{power:.1}"), times(ratio, 2)]);
        }
    }
    doc.table(&table);
    doc.paragraph(
        "**Insight**: Power draw increases with parallelism, but total energy decreases due to faster completion.",
    );
    doc.rule();
}

fn environmental_impact(doc: &mut MarkdownDoc, records: &[EnrichedRecord], baseline: &str) {
    doc.h2("Environmental Impact Extrapolation");

    let Some((naive, optimized)) = scenario(records, baseline) else {
        doc.paragraph(&format!(
            "Data unavailable: {SCENARIO_OPERATION} at {SCENARIO_SCALE} scale needs both {baseline} and {SCENARIO_OPTIMIZED} rows."
        ));
        doc.rule();
        return;
    };

    let saved_wh = naive.energy_wh - optimized.energy_wh;
    doc.paragraph(&format!(
        "**Scenario**: Small lab running 10,000 analyses/year ({SCENARIO_OPERATION}, {} sequences)",
        naive.num_sequences
    ));
    doc.bullet(&format!(
        "Naive energy per analysis: {:.3} mWh",
        naive.energy_wh * 1000.0
    ));
    doc.bullet(&format!(
        "Optimized energy per analysis: {:.3} mWh",
        optimized.energy_wh * 1000.0
    ));
    doc.bullet(&format!(
        "Energy saved per analysis: **{:.3} mWh**",
        saved_wh * 1000.0
    ));
    doc.blank();

    let annual_wh = saved_wh * ANALYSES_PER_YEAR;
    let annual_kwh = annual_wh / 1000.0;
    doc.line("**Per-lab annual savings**:");
    doc.bullet(&format!(
        "Energy saved: {annual_wh:.1} Wh/year ({annual_kwh:.3} kWh/year)"
    ));
    doc.bullet(&format!(
        "CO₂ avoided: {:.2} kg/year",
        annual_kwh * KG_CO2_PER_KWH
    ));
    doc.blank();

    let field_kwh = annual_kwh * ADOPTING_LABS;
    doc.line("**Field-wide impact** (10,000 labs adopt):");
    doc.bullet(&format!("Energy saved: {field_kwh:.1} kWh/year"));
    doc.bullet(&format!(
        "CO₂ avoided: {:.1} tons/year",
        field_kwh * KG_CO2_PER_KWH / 1000.0
    ));
    doc.blank();
    doc.rule();
}

fn energy_claim(doc: &mut MarkdownDoc, records: &[EnrichedRecord], baseline: &str) {
    doc.h2("Validation of \"300× Less Energy\" Claim");
    doc.line("**Current claim**:");
    doc.bullet("Traditional HPC: 150 Wh (naive, 30 minutes)");
    doc.bullet("Mac Mini optimized: 0.5 Wh (NEON+Parallel, 1 minute)");
    doc.bullet("Reduction: 300×");
    doc.blank();

    doc.line("**Our measurements** (Mac-to-Mac comparison):");
    match scenario(records, baseline) {
        Some((naive, optimized)) => {
            let reduction = if optimized.energy_wh > 0.0 {
                naive.energy_wh / optimized.energy_wh
            } else {
                0.0
            };
            doc.bullet(&format!("Naive (Mac): {:.3} mWh", naive.energy_wh * 1000.0));
            doc.bullet(&format!(
                "Optimized (Mac): {:.3} mWh",
                optimized.energy_wh * 1000.0
            ));
            doc.bullet(&format!("Reduction: **{}**", times(reduction, 1)));
            doc.blank();
            doc.paragraph(&format!(
                "**Conclusion**: Mac-to-Mac comparison shows ~{reduction:.0}× energy reduction. \
                 The 300× claim likely compares HPC (different hardware) to Mac, not Mac-to-Mac."
            ));
        }
        None => {
            doc.blank();
            doc.paragraph("Data unavailable for the Mac-to-Mac comparison.");
        }
    }
    doc.rule();
}

fn next_steps(doc: &mut MarkdownDoc) {
    doc.h2("Next Steps");
    doc.h3("Expand to Full 80 Experiments?");
    doc.line("**Decision criteria**:");
    doc.bullet("✅ If energy efficiency ≈ 1.0 (validated): Patterns hold, may not need full 80");
    doc.bullet("❌ If energy efficiency varies widely: Expand to more operations");
    doc.blank();
    doc.h3("Additional Validation");
    doc.line("1. **Test on Mac Mini M4**: Lower base power than MacBook");
    doc.line("2. **Measure HPC cluster**: Enable direct comparison for 300× claim");
    doc.line("3. **Test on real FASTQ data**: Validate synthetic results");
    doc.blank();
    doc.rule();
}

/// Render the findings document
pub fn render(records: &[EnrichedRecord], source: &str, config: &AnalysisConfig) -> String {
    let baseline = config.baseline.as_str();
    let mut doc = MarkdownDoc::new();
    doc.h1("Power Consumption Pilot - Findings");
    doc.rule();
    executive_summary(&mut doc, records, baseline);
    results_by_operation(&mut doc, records);
    power_draw(&mut doc, records, baseline);
    environmental_impact(&mut doc, records, baseline);
    energy_claim(&mut doc, records, baseline);
    next_steps(&mut doc);
    doc.line(&format!("**Data source**: {source}"));
    doc.finish()
}

/// Load the enriched CSV and write FINDINGS.md next to it
pub fn run(input: &Path, config: &AnalysisConfig) -> Result<String> {
    let records: Vec<EnrichedRecord> = load_records(input)?;
    if records.is_empty() {
        return Err(AnalysisError::EmptyInput {
            path: input.to_path_buf(),
            reason: "no enriched experiments".to_string(),
        }
        .into());
    }

    let output = sibling(input, "FINDINGS.md");
    write_output(&output, &render(&records, &file_name(input), config))?;
    Ok(format!(
        "Loaded {} experiments\nGenerated findings: {}\n",
        records.len(),
        output.display()
    ))
}
