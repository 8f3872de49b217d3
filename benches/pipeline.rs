//! Analysis pipeline benchmark
//!
//! Measures the three stages every report runs through on a synthetic
//! benchmark CSV:
//!
//! 1. `load_generic` - CSV parse plus metric coercion
//! 2. `join` - group indexing and ratio derivation
//! 3. summaries - grouping by config plus `Summary::of`
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench pipeline
//! ```

use asbb_analysis::aggregate::{group_by, Summary};
use asbb_analysis::baseline::{join, BaselineSpec};
use asbb_analysis::loader::load_generic;
use asbb_analysis::scale::Scale;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::fmt::Write as _;
use std::io::Write;
use tempfile::NamedTempFile;

const OPERATIONS: [&str; 10] = [
    "base_counting",
    "gc_content",
    "at_content",
    "n_content",
    "reverse_complement",
    "quality_aggregation",
    "quality_filter",
    "length_filter",
    "complexity_score",
    "translate",
];
const CONFIGS: [&str; 6] = ["naive", "neon", "neon_2t", "neon_4t", "neon_8t", "gpu"];

/// Synthetic CSV with `repeats` full operation x config x scale grids
fn synthetic_csv(repeats: usize) -> NamedTempFile {
    let mut content = String::from("operation,config,scale,num_sequences,throughput_seqs_per_sec\n");
    for r in 0..repeats {
        for (oi, op) in OPERATIONS.iter().enumerate() {
            for (ci, config) in CONFIGS.iter().enumerate() {
                for scale in Scale::ALL {
                    let throughput = 1e5 * (1 + oi + ci * 3 + r) as f64;
                    let _ = writeln!(
                        content,
                        "{op},{config},{scale},{},{throughput}",
                        scale.num_sequences()
                    );
                }
            }
        }
    }
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn spec() -> BaselineSpec {
    BaselineSpec::new(&["operation", "scale"], "config", "naive")
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_generic");
    for repeats in [1, 10] {
        let file = synthetic_csv(repeats);
        group.bench_with_input(BenchmarkId::from_parameter(repeats * 360), &file, |b, file| {
            b.iter(|| {
                load_generic(
                    black_box(file.path()),
                    &["operation", "scale", "config"],
                    "throughput_seqs_per_sec",
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("join");
    for repeats in [1, 10] {
        let file = synthetic_csv(repeats);
        let records = load_generic(
            file.path(),
            &["operation", "scale", "config"],
            "throughput_seqs_per_sec",
        )
        .unwrap();
        let spec = spec();
        group.bench_with_input(BenchmarkId::from_parameter(records.len()), &records, |b, records| {
            b.iter(|| join(black_box(records), &spec, |r| r.metric))
        });
    }
    group.finish();
}

fn bench_summaries(c: &mut Criterion) {
    let file = synthetic_csv(10);
    let records = load_generic(
        file.path(),
        &["operation", "scale", "config"],
        "throughput_seqs_per_sec",
    )
    .unwrap();
    let joined = join(&records, &spec(), |r| r.metric);

    c.bench_function("summaries_by_config", |b| {
        b.iter(|| {
            group_by(black_box(&joined.rows), |d| {
                d.record.get("config").unwrap_or_default().to_string()
            })
            .into_iter()
            .filter_map(|(label, members)| Some((label, Summary::of(&members, |d| d.ratio.value)?)))
            .collect::<Vec<_>>()
        })
    });
}

criterion_group!(benches, bench_load, bench_join, bench_summaries);
criterion_main!(benches);
