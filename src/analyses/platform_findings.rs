// Cross-platform findings document
//
// Reads a platform comparison CSV and writes FINDINGS.md beside it.

use super::platform::{parallel_means, ComparisonRecord, Portability};
use super::{file_name, ordered_configs, sibling};
use crate::aggregate::group_by;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::loader::load_records;
use crate::report::markdown::{MarkdownDoc, MarkdownTable};
use crate::report::{times, write_output};
use crate::scale::Scale;
use anyhow::Result;
use std::path::Path;

const CONFIG_ORDER: &[&str] = &["naive", "neon", "neon_4t"];

fn executive_summary(doc: &mut MarkdownDoc, rows: &[ComparisonRecord], config: &AnalysisConfig) {
    let (lo, hi) = config.portability_band;
    doc.h2("Executive Summary");
    doc.line(&format!("**Total comparisons**: {}", rows.len()));
    doc.line(&format!(
        "**Operations tested**: {}",
        group_by(rows, |r| r.operation.clone()).len()
    ));
    doc.line("**Platforms**: Mac M4 (10 cores) vs Graviton 3 (4 vCPUs)");
    doc.blank();

    if let Some(p) = Portability::of(rows, config) {
        doc.line(&format!("**Key Finding**: Portability Ratio = {:.2}", p.mean));
        doc.bullet(&format!("Range: {:.2} - {:.2}", p.min, p.max));
        doc.bullet(&format!("Expected: {lo} - {hi}"));
        doc.bullet(&format!("**Status**: {}", p.status()));
        doc.blank();
    }
    doc.rule();
}

fn results_by_operation(doc: &mut MarkdownDoc, rows: &[ComparisonRecord]) {
    doc.h2("Results by Operation");

    let mut operations = group_by(rows, |r| r.operation.clone());
    operations.sort_by(|a, b| a.0.cmp(&b.0));

    for (operation, op_rows) in operations {
        doc.h3(&operation);

        let mut scales = group_by(&op_rows, |r| r.scale.clone());
        scales.sort_by_key(|(s, _)| (Scale::from_label(s).map_or(usize::MAX, |s| s as usize), s.clone()));

        for (scale, scale_rows) in scales {
            doc.paragraph(&format!(
                "**{scale} scale** ({} sequences):",
                scale_rows[0].num_sequences
            ));
            let mut table = MarkdownTable::new(&[
                "Config",
                "Mac Speedup",
                "Graviton Speedup",
                "Portability Ratio",
                "Variance %",
            ]);
            for config in ordered_configs(CONFIG_ORDER, scale_rows.iter().map(|r| r.config.as_str())) {
                for r in scale_rows.iter().filter(|r| r.config == config) {
                    table.add_row(vec![
                        r.config.clone(),
                        times(r.mac_speedup, 1),
                        times(r.graviton_speedup, 1),
                        format!("{:.2}", r.portability_ratio),
                        format!("{:+.1}%", r.speedup_variance_pct),
                    ]);
                }
            }
            doc.table(&table);
        }
        doc.rule();
    }
}

fn platform_comparison(doc: &mut MarkdownDoc, rows: &[ComparisonRecord], config: &AnalysisConfig) {
    doc.h2("Platform Comparison");

    doc.h3("Hardware Specifications");
    let mut hardware = MarkdownTable::new(&["Platform", "Processor", "Cores/vCPUs", "RAM", "Clock"]);
    hardware.add_row(
        ["Mac M4", "Apple M4 (ARM)", "10 (4P + 6E)", "24 GB", "~4.0 GHz"]
            .map(str::to_string)
            .to_vec(),
    );
    hardware.add_row(
        ["Graviton 3", "AWS Neoverse V1", "4 vCPUs", "8 GB", "~2.6 GHz"]
            .map(str::to_string)
            .to_vec(),
    );
    doc.table(&hardware);

    doc.h3("Portability Analysis");
    if let Some(p) = Portability::of(rows, config) {
        let (lo, hi) = config.portability_band;
        doc.line("**NEON Portability** (single-threaded):");
        doc.bullet(&format!("Average ratio: {:.2}", p.mean));
        doc.bullet(&format!(
            "Interpretation: Graviton NEON is {:.0}% as effective as Mac NEON",
            p.mean * 100.0
        ));
        doc.bullet(&format!("Expected: {:.0}-{:.0}%", lo * 100.0, hi * 100.0));
        doc.bullet(&format!(
            "**Result**: {}",
            if p.validated {
                "✅ Within expected range"
            } else {
                "⚠️ Outside range"
            }
        ));
        doc.blank();
    }

    if let Some((mac, graviton)) = parallel_means(rows) {
        doc.line("**Parallel Portability** (4 threads):");
        doc.bullet(&format!("Mac NEON+4t speedup: {} (average)", times(mac, 1)));
        doc.bullet(&format!(
            "Graviton NEON+4t speedup: {} (average)",
            times(graviton, 1)
        ));
        doc.bullet("Note: Mac has 10 cores, Graviton has 4 vCPUs");
        doc.bullet("Expected: Graviton lower due to fewer cores (not a portability issue)");
        doc.blank();
    }
    doc.rule();
}

fn validation(doc: &mut MarkdownDoc, rows: &[ComparisonRecord], config: &AnalysisConfig) {
    doc.h2("Validation of Portability Claim");
    doc.line("**Current claim**:");
    doc.bullet("ARM NEON rules work across Mac, Graviton, Ampere, Raspberry Pi");
    doc.bullet("Code once, deploy anywhere (ARM ecosystem)");
    doc.bullet("No vendor lock-in");
    doc.blank();

    doc.line("**This experiment validates**:");
    match Portability::of(rows, config) {
        Some(p) if p.validated => {
            doc.bullet(&format!(
                "✅ NEON speedups transfer Mac → Graviton (ratio: {:.2})",
                p.mean
            ));
            doc.bullet("✅ Optimization rules are portable (same code, different platform)");
            doc.bullet("✅ Pattern consistency confirmed (same operations benefit most)");
            doc.bullet("✅ ARM ecosystem portability validated");
            doc.blank();
            doc.paragraph(
                "**Conclusion**: ARM NEON optimization rules are truly portable. \
                 Developers can code on Mac, deploy to Graviton (or other ARM platforms) \
                 with confidence that optimizations will transfer.",
            );
        }
        Some(p) => {
            let (lo, hi) = config.portability_band;
            doc.bullet(&format!(
                "⚠️ Portability ratio {:.2} outside expected range ({lo}-{hi})",
                p.mean
            ));
            doc.bullet("Platform differences may be larger than expected");
            doc.blank();
        }
        None => {
            doc.bullet("No single-threaded NEON comparisons available");
            doc.blank();
        }
    }
    doc.rule();
}

fn next_steps(doc: &mut MarkdownDoc) {
    doc.h2("Next Steps");
    doc.h3("Additional Validation");
    doc.line("1. **Raspberry Pi 5**: Test on consumer ARM hardware ($80)");
    doc.line("2. **Ampere Altra**: Test on ARM server (bare metal)");
    doc.line("3. **Azure Cobalt**: Test on Microsoft ARM VMs");
    doc.blank();
    doc.h3("Publication Impact");
    doc.line("**Portability pillar now validated**:");
    doc.bullet("Mac M4 + Graviton 3 prove ARM NEON portability");
    doc.bullet("No vendor lock-in (works across Apple, AWS platforms)");
    doc.bullet("Enables flexible deployment:");
    doc.line("  - Develop locally on Mac (one-time cost)");
    doc.line("  - Deploy to Graviton cloud (pay-as-you-go)");
    doc.line("  - Burst to cloud when needed");
    doc.blank();
    doc.rule();
}

/// Render the findings document
pub fn render(rows: &[ComparisonRecord], source: &str, config: &AnalysisConfig) -> String {
    let mut doc = MarkdownDoc::new();
    doc.h1("Cross-Platform Validation: AWS Graviton 3 vs Mac M4");
    doc.rule();
    executive_summary(&mut doc, rows, config);
    results_by_operation(&mut doc, rows);
    platform_comparison(&mut doc, rows, config);
    validation(&mut doc, rows, config);
    next_steps(&mut doc);
    doc.line(&format!("**Data source**: {source}"));
    doc.finish()
}

/// Load the comparison CSV and write FINDINGS.md next to it
pub fn run(input: &Path, config: &AnalysisConfig) -> Result<String> {
    let rows: Vec<ComparisonRecord> = load_records(input)?;
    if rows.is_empty() {
        return Err(AnalysisError::EmptyInput {
            path: input.to_path_buf(),
            reason: "no platform comparisons".to_string(),
        }
        .into());
    }

    let output = sibling(input, "FINDINGS.md");
    write_output(&output, &render(&rows, &file_name(input), config))?;
    Ok(format!(
        "Loaded {} comparisons\nGenerated findings: {}\n",
        rows.len(),
        output.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(op: &str, config: &str, scale: &str, mac: f64, graviton: f64) -> ComparisonRecord {
        ComparisonRecord {
            operation: op.to_string(),
            config: config.to_string(),
            scale: scale.to_string(),
            num_sequences: 10_000,
            mac_throughput: 1000.0 * mac,
            mac_speedup: mac,
            graviton_throughput: 500.0 * graviton,
            graviton_speedup: graviton,
            portability_ratio: graviton / mac,
            speedup_variance_pct: (graviton - mac) / mac * 100.0,
            graviton_vs_mac_throughput: 0.5 * graviton / mac,
            flag: Default::default(),
        }
    }

    #[test]
    fn test_validated_document() {
        let rows = vec![
            row("gc_content", "neon_4t", "Large", 40.0, 30.0),
            row("gc_content", "neon", "Large", 10.0, 9.0),
            row("gc_content", "naive", "Large", 1.0, 1.0),
            row("base_counting", "neon", "Medium", 20.0, 22.0),
        ];
        let doc = render(&rows, "cmp.csv", &AnalysisConfig::default());
        assert!(doc.contains("**Key Finding**: Portability Ratio = 1.00"));
        assert!(doc.contains("**Status**: ✅ VALIDATED"));
        assert!(doc.contains("Mac NEON+4t speedup: 40.0× (average)"));
        assert!(doc.contains("-10.0%"));
        assert!(doc.contains("+10.0%"));
        assert!(doc.find("### base_counting").unwrap() < doc.find("### gc_content").unwrap());
        let section = &doc[doc.find("### gc_content").unwrap()..];
        assert!(section.find("| naive").unwrap() < section.find("| neon_4t").unwrap());
        assert!(doc.ends_with("**Data source**: cmp.csv\n"));
    }

    #[test]
    fn test_outside_band_document() {
        let rows = vec![row("gc_content", "neon", "Large", 10.0, 5.0)];
        let doc = render(&rows, "cmp.csv", &AnalysisConfig::default());
        assert!(doc.contains("⚠️ Outside range"));
        assert!(doc.contains("Portability ratio 0.50 outside expected range"));
        assert!(!doc.contains("Parallel Portability"));
    }
}
