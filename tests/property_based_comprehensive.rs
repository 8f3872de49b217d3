//! Property-based tests for the analysis core
//!
//! Covers the invariants every report depends on:
//! 1. Baseline joining (identity ratio, zero-baseline convention, row order)
//! 2. Summary statistics ordering
//! 3. Grouping conservation
//! 4. Scale label parsing
//! 5. Effect-size classification

use asbb_analysis::aggregate::{group_by, Summary};
use asbb_analysis::baseline::{join, BaselineSpec, Confidence, Ratio};
use asbb_analysis::loader::Record;
use asbb_analysis::scale::Scale;
use asbb_analysis::statistics::{cohens_d, EffectSize};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Row {
    operation: String,
    config: String,
    throughput: f64,
}

impl Record for Row {
    fn dimension(&self, name: &str) -> Option<&str> {
        match name {
            "operation" => Some(&self.operation),
            "config" => Some(&self.config),
            _ => None,
        }
    }
}

fn rows() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(
        (
            prop::sample::select(vec!["base_counting", "gc_content", "translate"]),
            prop::sample::select(vec!["naive", "neon", "neon_4t"]),
            0.0f64..1e7,
        )
            .prop_map(|(op, config, throughput)| Row {
                operation: op.to_string(),
                config: config.to_string(),
                throughput,
            }),
        0..40,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_baseline_ratio_is_identity(records in rows()) {
        let spec = BaselineSpec::new(&["operation"], "config", "naive");
        let joined = join(&records, &spec, |r| r.throughput);

        // Property: one derived row per input row, in input order
        prop_assert_eq!(joined.rows.len(), records.len());
        for (derived, original) in joined.rows.iter().zip(&records) {
            prop_assert_eq!(&derived.record.operation, &original.operation);
            if derived.is_baseline {
                prop_assert_eq!(derived.ratio.value, 1.0);
                prop_assert_eq!(derived.ratio.confidence, Confidence::Measured);
            }
        }

        // Property: each group has at most one baseline
        for (_, members) in group_by(&joined.rows, |d| d.record.operation.clone()) {
            prop_assert!(members.iter().filter(|d| d.is_baseline).count() <= 1);
        }
    }

    #[test]
    fn prop_groups_without_baseline_are_neutral(records in rows()) {
        let spec = BaselineSpec::new(&["operation"], "config", "naive");
        let joined = join(&records, &spec, |r| r.throughput);

        let orphaned: Vec<&str> = joined
            .warnings
            .iter()
            .map(|w| w.key.parts()[0].as_str())
            .collect();
        for derived in &joined.rows {
            if orphaned.contains(&derived.record.operation.as_str()) {
                prop_assert_eq!(derived.ratio.value, 1.0);
                prop_assert_eq!(derived.ratio.confidence, Confidence::NoBaseline);
            }
        }
    }

    #[test]
    fn prop_ratio_zero_denominator(numerator in -1e9f64..1e9) {
        let ratio = Ratio::of(numerator, 0.0);
        prop_assert_eq!(ratio.value, 0.0);
        prop_assert!(ratio.confidence.is_flagged());
    }

    #[test]
    fn prop_ratio_nonzero_denominator(
        numerator in 0.0f64..1e9,
        denominator in 1e-3f64..1e9,
    ) {
        let ratio = Ratio::of(numerator, denominator);
        prop_assert_eq!(ratio.value, numerator / denominator);
        prop_assert_eq!(ratio.confidence, Confidence::Measured);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_summary_is_ordered(values in prop::collection::vec(-1e6f64..1e6, 1..50)) {
        let s = Summary::from_values(&values).unwrap();

        prop_assert_eq!(s.count, values.len());
        prop_assert!(s.min <= s.median);
        prop_assert!(s.median <= s.max);
        let tolerance = 1e-9 * s.max.abs().max(s.min.abs()).max(1.0);
        prop_assert!(s.mean >= s.min - tolerance);
        prop_assert!(s.mean <= s.max + tolerance);
        prop_assert!(s.std_dev >= 0.0);
    }

    #[test]
    fn prop_group_by_conserves_items(keys in prop::collection::vec(0u8..6, 0..60)) {
        let groups = group_by(&keys, |k| *k);

        let total: usize = groups.iter().map(|(_, members)| members.len()).sum();
        prop_assert_eq!(total, keys.len());
        for (key, members) in &groups {
            prop_assert!(members.iter().all(|m| *m == key));
        }
        // first-occurrence key order
        let mut seen = Vec::new();
        for k in &keys {
            if !seen.contains(k) {
                seen.push(*k);
            }
        }
        let order: Vec<u8> = groups.iter().map(|(k, _)| *k).collect();
        prop_assert_eq!(order, seen);
    }

    #[test]
    fn prop_scale_labels_round_trip(index in 0usize..6, upper in any::<bool>()) {
        let scale = Scale::ALL[index];
        let label = if upper {
            scale.label().to_uppercase()
        } else {
            scale.label().to_lowercase()
        };

        prop_assert_eq!(Scale::from_label(scale.label()), Some(scale));
        prop_assert_eq!(Scale::from_alias(&label), Some(scale));
    }

    #[test]
    fn prop_effect_size_is_monotone(a in 0.0f64..5.0, b in 0.0f64..5.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let rank = |e: EffectSize| match e {
            EffectSize::Negligible => 0,
            EffectSize::Small => 1,
            EffectSize::Medium => 2,
            EffectSize::Large => 3,
        };

        prop_assert!(rank(EffectSize::classify(lo)) <= rank(EffectSize::classify(hi)));
        prop_assert_eq!(EffectSize::classify(-hi), EffectSize::classify(hi));
    }

    #[test]
    fn prop_cohens_d_without_spread_is_zero(
        treatment in -1e3f64..1e3,
        control in -1e3f64..1e3,
        std_dev in -10.0f64..=0.0,
    ) {
        prop_assert_eq!(cohens_d(treatment, control, std_dev), 0.0);
    }
}
