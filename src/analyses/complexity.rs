//! Complexity-speedup regression
//!
//! Fits the predictor models to (complexity score, log10 scale) -> NEON
//! speedup and reports how well the best one predicts the measured data.
//! Before fitting, an exploratory pass prints the per-operation summaries and
//! the correlation matrix and draws the `complexity_exploratory` figure.

use super::{default_dir, percent, stem};
use crate::aggregate::{group_by, mean, sorted_unique};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::loader::{load_records, Schema};
use crate::predictor::{self, Dataset, ModelReport, PredictorOutcome};
use crate::report::chart::{
    self, write_figure, Figure, Heatmap, LineChart, Panel, Reference, Series, XAxis,
};
use crate::report::csv_output::write_csv;
use crate::report::text::rule;
use crate::scale::Scale;
use crate::statistics::correlation;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

const WIDTH: usize = 80;

const CORRELATION_COLUMNS: [&str; 4] = [
    "complexity_score",
    "scale_log10",
    "neon_speedup",
    "parallel_speedup",
];

/// Hypothetical operations to predict: (description, complexity, scale)
const HYPOTHETICAL: [(&str, f64, Scale); 6] = [
    ("Very simple counting (e.g., count A only)", 0.25, Scale::Tiny),
    ("Very simple counting", 0.25, Scale::Large),
    ("Medium-simple (e.g., AT count)", 0.35, Scale::Tiny),
    ("Medium-simple", 0.35, Scale::Large),
    ("High complexity (e.g., translate)", 0.75, Scale::Tiny),
    ("High complexity", 0.75, Scale::Large),
];

#[derive(Debug, Clone, Deserialize)]
pub struct ComplexityRecord {
    pub operation: String,
    pub complexity_score: f64,
    pub scale: String,
    pub neon_speedup: f64,
    #[serde(default)]
    pub parallel_speedup: Option<f64>,
}

impl Schema for ComplexityRecord {
    const REQUIRED: &'static [&'static str] =
        &["operation", "complexity_score", "scale", "neon_speedup"];
}

/// A record with its scale resolved
#[derive(Debug, Clone)]
pub struct Sample {
    pub operation: String,
    pub complexity: f64,
    pub scale: Scale,
    pub speedup: f64,
    pub parallel: Option<f64>,
}

impl Sample {
    pub fn features(&self) -> [f64; 2] {
        [self.complexity, f64::from(self.scale.log10())]
    }
}

/// One row of `<stem>_predictions.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub operation: String,
    pub scale: String,
    pub actual: f64,
    pub predicted: f64,
    pub error_pct: f64,
}

impl Prediction {
    /// |error| of at most `pct` percent
    fn within(&self, pct: f64) -> bool {
        self.error_pct.abs() <= pct
    }

    pub fn residual(&self) -> f64 {
        self.actual - self.predicted
    }
}

/// Resolve scales and drop excluded operations
pub fn prepare(
    path: &Path,
    records: &[ComplexityRecord],
    exclude: &[String],
) -> crate::error::Result<Vec<Sample>> {
    let mut samples = Vec::with_capacity(records.len());
    for (idx, r) in records.iter().enumerate() {
        let scale = Scale::from_alias(&r.scale).ok_or_else(|| AnalysisError::MalformedRecord {
            path: path.to_path_buf(),
            row: idx + 1,
            column: "scale".to_string(),
            value: r.scale.clone(),
        })?;
        if exclude.iter().any(|op| op == &r.operation) {
            continue;
        }
        samples.push(Sample {
            operation: r.operation.clone(),
            complexity: r.complexity_score,
            scale,
            speedup: r.neon_speedup,
            parallel: r.parallel_speedup,
        });
    }
    Ok(samples)
}

pub fn dataset(samples: &[Sample]) -> Dataset {
    let mut data = Dataset::default();
    for s in samples {
        data.push(s.features(), s.speedup);
    }
    data
}

/// Signed error of `predicted` relative to `actual`, 0 when `actual` is 0
fn error_pct(actual: f64, predicted: f64) -> f64 {
    if actual == 0.0 {
        0.0
    } else {
        (actual - predicted) / actual * 100.0
    }
}

/// Predictions of the best model for every sample
pub fn predictions(
    samples: &[Sample],
    outcome: &PredictorOutcome,
) -> predictor::Result<Vec<Prediction>> {
    let features: Vec<[f64; 2]> = samples.iter().map(Sample::features).collect();
    let predicted = outcome.predict(&features)?;
    Ok(samples
        .iter()
        .zip(predicted)
        .map(|(s, p)| Prediction {
            operation: s.operation.clone(),
            scale: s.scale.label().to_string(),
            actual: s.speedup,
            predicted: p,
            error_pct: error_pct(s.speedup, p),
        })
        .collect())
}

fn complexity_section(samples: &[Sample]) -> String {
    let mut ops: Vec<(String, f64)> = group_by(samples, |s| s.operation.clone())
        .into_iter()
        .map(|(op, rows)| (op, rows[0].complexity))
        .collect();
    ops.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    let mut out = String::from("\nComplexity scores:\n");
    for (op, score) in ops {
        out.push_str(&format!("  {op:25}: {score:.3}\n"));
    }
    out
}

fn speedup_section(samples: &[Sample]) -> String {
    let mut ops: Vec<(String, f64)> = group_by(samples, |s| s.operation.clone())
        .into_iter()
        .filter_map(|(op, rows)| Some((op, mean(rows.iter().map(|s| s.speedup))?)))
        .collect();
    ops.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut out = String::from("\nMean NEON speedup by operation:\n");
    for (op, s) in ops {
        out.push_str(&format!("  {op:25}: {s:.2}×\n"));
    }
    out
}

/// Pairwise Pearson correlations; a pair without two complete values is `n/a`
fn correlation_section(samples: &[Sample]) -> String {
    let columns: [Vec<Option<f64>>; 4] = [
        samples.iter().map(|s| Some(s.complexity)).collect(),
        samples
            .iter()
            .map(|s| Some(f64::from(s.scale.log10())))
            .collect(),
        samples.iter().map(|s| Some(s.speedup)).collect(),
        samples.iter().map(|s| s.parallel).collect(),
    ];

    let mut out = format!("\nCorrelation matrix:\n{:<18}", "");
    for name in CORRELATION_COLUMNS {
        out.push_str(&format!(" {name:>17}"));
    }
    out.push('\n');
    for (name, row) in CORRELATION_COLUMNS.iter().zip(&columns) {
        out.push_str(&format!("{name:<18}"));
        for column in &columns {
            match correlation(row, column) {
                Some(r) => out.push_str(&format!(" {r:>17.4}")),
                None => out.push_str(&format!(" {:>17}", "n/a")),
            }
        }
        out.push('\n');
    }
    out
}

/// Operation x scale grid of NEON speedup, first sample per cell
pub fn speedup_heatmap(samples: &[Sample]) -> Heatmap {
    let operations = sorted_unique(samples.iter().map(|s| s.operation.as_str()));
    let scales: Vec<Scale> = Scale::ALL
        .iter()
        .copied()
        .filter(|scale| samples.iter().any(|s| s.scale == *scale))
        .collect();
    let values = operations
        .iter()
        .map(|op| {
            scales
                .iter()
                .map(|scale| {
                    samples
                        .iter()
                        .find(|s| &s.operation == op && s.scale == *scale)
                        .map_or(f64::NAN, |s| s.speedup)
                })
                .collect()
        })
        .collect();
    Heatmap {
        title: "NEON Speedup Heatmap: Operation × Scale".to_string(),
        x_label: "Scale".to_string(),
        y_label: "Operation".to_string(),
        rows: operations,
        columns: scales.iter().map(|s| s.label().to_string()).collect(),
        values,
    }
}

fn write_exploratory(samples: &[Sample], path: &Path, config: &AnalysisConfig) -> Result<()> {
    let mut by_complexity = LineChart::new(
        "Complexity vs NEON Speedup (All Scales)",
        "Complexity Score",
        "NEON Speedup (×)",
        XAxis::Linear,
    );
    by_complexity.scatter = true;
    let mut by_scale = LineChart::new(
        "Scale-Dependent NEON Speedup",
        "Scale (log10 sequences)",
        "NEON Speedup (×)",
        XAxis::Linear,
    );
    for (op, rows) in group_by(samples, |s| s.operation.clone()) {
        by_complexity.series.push(Series::new(
            op.clone(),
            rows.iter().map(|s| (s.complexity, s.speedup)).collect(),
        ));
        let mut curve: Vec<(f64, f64)> = rows
            .iter()
            .map(|s| (f64::from(s.scale.log10()), s.speedup))
            .collect();
        curve.sort_by(|a, b| a.0.total_cmp(&b.0));
        by_scale.series.push(Series::new(op, curve));
    }

    let mut parallel = LineChart::new(
        "Complexity vs Parallel Speedup (Large Scale)",
        "Complexity Score",
        "Parallel Speedup (×)",
        XAxis::Linear,
    );
    parallel.scatter = true;
    for s in samples.iter().filter(|s| s.scale == Scale::Large) {
        if let Some(speedup) = s.parallel {
            parallel
                .series
                .push(Series::new(s.operation.clone(), vec![(s.complexity, speedup)]));
        }
    }

    let heatmap = speedup_heatmap(samples);
    let figure = Figure::grid(
        "Complexity exploratory analysis",
        2,
        vec![
            Panel::Line(&by_complexity),
            Panel::Line(&by_scale),
            Panel::Line(&parallel),
            Panel::Heatmap(&heatmap),
        ],
    );
    write_figure(path, &figure, &config.chart)
}

fn model_table(outcome: &PredictorOutcome) -> String {
    let mut out = format!(
        "\n{:<20} {:<12} {:<12} {}\n{}\n",
        "Model",
        "R² Score",
        "MAE (×)",
        "Cross-Val R²",
        rule('-', 60)
    );
    for r in &outcome.reports {
        out.push_str(&model_row(r));
    }
    for failure in &outcome.failures {
        out.push_str(&format!("  skipped: {failure}\n"));
    }
    out
}

fn model_row(r: &ModelReport) -> String {
    let cv = if r.cv_mean.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.3} ± {:.3}", r.cv_mean, r.cv_std)
    };
    format!(
        "{:<20} {:<12.3} {:<12.2} {cv}\n",
        r.kind.label(),
        r.r2,
        r.mae
    )
}

fn prediction_table(rows: &[Prediction]) -> String {
    let mut out = format!(
        "\n{:<25} {:<10} {:<10} {:<12} {}\n{}\n",
        "Operation",
        "Scale",
        "Actual",
        "Predicted",
        "Error (%)",
        rule('-', WIDTH)
    );
    for p in rows {
        out.push_str(&format!(
            "{:<25} {:<10} {:>8.2}× {:>10.2}× {:>10.1}%\n",
            p.operation, p.scale, p.actual, p.predicted, p.error_pct
        ));
    }

    let n = rows.len();
    let within_20 = rows.iter().filter(|p| p.within(20.0)).count();
    let within_50 = rows.iter().filter(|p| p.within(50.0)).count();
    out.push_str("\nPrediction accuracy:\n");
    out.push_str(&format!(
        "  Within 20%: {within_20}/{n} ({:.1}%)\n",
        percent(within_20, n)
    ));
    out.push_str(&format!(
        "  Within 50%: {within_50}/{n} ({:.1}%)\n",
        percent(within_50, n)
    ));
    out
}

fn hypothetical_table(outcome: &PredictorOutcome) -> predictor::Result<String> {
    let features: Vec<[f64; 2]> = HYPOTHETICAL
        .iter()
        .map(|(_, c, scale)| [*c, f64::from(scale.log10())])
        .collect();
    let predicted = outcome.predict(&features)?;

    let mut out = format!(
        "\n{:<45} {:<12} {:<10} {}\n{}\n",
        "Operation",
        "Complexity",
        "Scale",
        "Predicted",
        rule('-', WIDTH)
    );
    for ((name, c, scale), p) in HYPOTHETICAL.iter().zip(predicted) {
        out.push_str(&format!(
            "{name:<45} {c:<12.2} {:<10} {p:>8.2}×\n",
            scale.label().to_lowercase()
        ));
    }
    Ok(out)
}

/// Predicted-vs-actual and residual panels side by side
fn write_chart(rows: &[Prediction], path: &Path, config: &AnalysisConfig) -> Result<()> {
    let mut fit = LineChart::new(
        "Predicted vs actual NEON speedup",
        "Actual speedup (×)",
        "Predicted speedup (×)",
        XAxis::Linear,
    );
    fit.scatter = true;
    fit.series.push(Series::new(
        "Operations",
        rows.iter().map(|p| (p.actual, p.predicted)).collect(),
    ));

    let hi = rows
        .iter()
        .map(|p| p.actual.max(p.predicted))
        .fold(0.0_f64, f64::max);
    let diagonal = (0..=20).map(|i| hi * f64::from(i) / 20.0).map(|v| (v, v));
    fit.series
        .push(Series::new("Perfect prediction", diagonal.collect()));

    let mut residuals = LineChart::new(
        "Residual Plot",
        "Predicted speedup (×)",
        "Residual (actual - predicted)",
        XAxis::Linear,
    );
    residuals.scatter = true;
    residuals.series.push(Series::new(
        "Operations",
        rows.iter().map(|p| (p.predicted, p.residual())).collect(),
    ));
    residuals.reference = Some(Reference::new(0.0, "Zero residual"));

    let figure = Figure::grid(
        "Model predictions",
        2,
        vec![Panel::Line(&fit), Panel::Line(&residuals)],
    );
    write_figure(path, &figure, &config.chart)
}

/// Load, fit, report and write predictions
pub fn run(input: &Path, output_dir: Option<&Path>, config: &AnalysisConfig) -> Result<String> {
    let records: Vec<ComplexityRecord> = load_records(input)?;
    let samples = prepare(input, &records, &config.regression_exclude)?;
    if samples.is_empty() {
        return Err(AnalysisError::EmptyInput {
            path: input.to_path_buf(),
            reason: "no samples left after exclusions".to_string(),
        }
        .into());
    }

    let bar = rule('=', WIDTH);
    let mut out = format!(
        "{bar}\nCOMPLEXITY-SPEEDUP REGRESSION\n{bar}\n\nLoaded {} samples ({} excluded)\n",
        samples.len(),
        records.len() - samples.len()
    );
    out.push_str(&format!("\n{bar}\nEXPLORATORY DATA ANALYSIS\n{bar}\n"));
    out.push_str(&complexity_section(&samples));
    out.push_str(&speedup_section(&samples));
    out.push_str(&correlation_section(&samples));

    let dir = default_dir(input, output_dir);
    let exploratory_path = dir.join(chart::file_name("complexity_exploratory"));
    write_exploratory(&samples, &exploratory_path, config)?;
    out.push_str(&format!(
        "\nExploratory plots saved to: {}\n",
        exploratory_path.display()
    ));

    let outcome = predictor::evaluate(&dataset(&samples), &config.predictor);
    out.push_str(&format!("\n{bar}\nMODEL COMPARISON\n{bar}\n"));
    out.push_str(&model_table(&outcome));

    let best = outcome
        .best()
        .ok_or(predictor::PredictorError::NoUsableModel)?;
    out.push_str(&format!(
        "\n✅ Best model: {} (R² = {:.3})\n",
        best.kind.label(),
        best.r2
    ));

    let rows = predictions(&samples, &outcome)?;
    out.push_str(&format!("\n{bar}\nPREDICTIONS\n{bar}\n"));
    out.push_str(&prediction_table(&rows));

    out.push_str(&format!("\n{bar}\nHYPOTHETICAL OPERATIONS\n{bar}\n"));
    out.push_str(&hypothetical_table(&outcome)?);

    let csv_path = dir.join(format!("{}_predictions.csv", stem(input)));
    write_csv(&csv_path, &rows)?;
    let chart_path = dir.join(chart::file_name("complexity_predictions"));
    write_chart(&rows, &chart_path, config)?;
    info!(model = %best.kind, r2 = best.r2, "regression complete");

    out.push_str(&format!(
        "\nPredictions saved to: {}\nChart saved to: {}\n",
        csv_path.display(),
        chart_path.display()
    ));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(op: &str, complexity: f64, scale: &str, speedup: f64) -> ComplexityRecord {
        ComplexityRecord {
            operation: op.to_string(),
            complexity_score: complexity,
            scale: scale.to_string(),
            neon_speedup: speedup,
            parallel_speedup: None,
        }
    }

    fn prediction(error_pct: f64) -> Prediction {
        Prediction {
            operation: "a".into(),
            scale: "Tiny".into(),
            actual: 10.0,
            predicted: 10.0 - error_pct / 10.0,
            error_pct,
        }
    }

    #[test]
    fn test_prepare_maps_scales_and_excludes() {
        let records = vec![
            rec("gc_content", 0.3, "tiny", 10.0),
            rec("gc_content", 0.3, "VLarge", 14.0),
            rec("reverse_complement", 0.45, "large", 1.0),
        ];
        let exclude = vec!["reverse_complement".to_string()];
        let samples = prepare(Path::new("c.csv"), &records, &exclude).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].features(), [0.3, 2.0]);
        assert_eq!(samples[1].scale, Scale::VeryLarge);
    }

    #[test]
    fn test_unknown_scale_is_malformed() {
        let records = vec![rec("gc_content", 0.3, "tiny", 10.0), rec("x", 0.3, "gigantic", 1.0)];
        let err = prepare(Path::new("c.csv"), &records, &[]).unwrap_err();
        match err {
            AnalysisError::MalformedRecord { row, column, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "scale");
                assert_eq!(value, "gigantic");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_error_pct_sign() {
        assert_eq!(error_pct(10.0, 8.0), 20.0);
        assert_eq!(error_pct(10.0, 15.0), -50.0);
        assert_eq!(error_pct(0.0, 3.0), 0.0);
    }

    #[test]
    fn test_accuracy_lines() {
        let rows = vec![
            Prediction {
                operation: "a".into(),
                scale: "Tiny".into(),
                actual: 10.0,
                predicted: 9.0,
                error_pct: 10.0,
            },
            Prediction {
                operation: "b".into(),
                scale: "Large".into(),
                actual: 10.0,
                predicted: 13.0,
                error_pct: -30.0,
            },
        ];
        let text = prediction_table(&rows);
        assert!(text.contains("  Within 20%: 1/2 (50.0%)"));
        assert!(text.contains("  Within 50%: 2/2 (100.0%)"));
        assert!(text.contains("a                         Tiny          10.00×       9.00×       10.0%"));
    }

    #[test]
    fn test_accuracy_bands_include_their_edge() {
        assert!(prediction(20.0).within(20.0));
        assert!(prediction(-20.0).within(20.0));
        assert!(!prediction(20.01).within(20.0));

        let rows = vec![prediction(20.0), prediction(-50.0), prediction(60.0)];
        let text = prediction_table(&rows);
        assert!(text.contains("  Within 20%: 1/3 (33.3%)"));
        assert!(text.contains("  Within 50%: 2/3 (66.7%)"));
    }

    #[test]
    fn test_residual_is_actual_minus_predicted() {
        let p = Prediction {
            operation: "a".into(),
            scale: "Tiny".into(),
            actual: 10.0,
            predicted: 12.5,
            error_pct: -25.0,
        };
        assert_eq!(p.residual(), -2.5);
    }

    #[test]
    fn test_correlation_matrix_marks_missing_columns() {
        let records = vec![
            rec("a", 0.2, "tiny", 2.0),
            rec("b", 0.4, "small", 4.0),
            rec("c", 0.6, "large", 6.0),
        ];
        let samples = prepare(Path::new("c.csv"), &records, &[]).unwrap();
        let text = correlation_section(&samples);
        let neon_row = text.lines().find(|l| l.starts_with("neon_speedup")).unwrap();
        let cells: Vec<&str> = neon_row.split_whitespace().collect();
        assert_eq!(cells.len(), 5);
        assert_eq!(cells[1], "1.0000");
        assert_eq!(cells[3], "1.0000");
        assert_eq!(cells[4], "n/a");
    }

    #[test]
    fn test_speedup_heatmap_first_value_per_cell() {
        let records = vec![
            rec("translate", 0.7, "tiny", 1.2),
            rec("gc_content", 0.3, "tiny", 10.0),
            rec("gc_content", 0.3, "tiny", 99.0),
            rec("gc_content", 0.3, "large", 14.0),
        ];
        let samples = prepare(Path::new("c.csv"), &records, &[]).unwrap();
        let map = speedup_heatmap(&samples);
        assert_eq!(map.rows, vec!["gc_content", "translate"]);
        assert_eq!(map.columns, vec!["Tiny", "Large"]);
        assert_eq!(map.values[0], vec![10.0, 14.0]);
        assert_eq!(map.values[1][0], 1.2);
        assert!(map.values[1][1].is_nan());
    }

    #[test]
    fn test_speedup_section_descending() {
        let records = vec![
            rec("slow", 0.7, "tiny", 1.5),
            rec("fast", 0.3, "tiny", 20.0),
            rec("fast", 0.3, "large", 10.0),
        ];
        let samples = prepare(Path::new("c.csv"), &records, &[]).unwrap();
        let text = speedup_section(&samples);
        assert!(text.find("fast").unwrap() < text.find("slow").unwrap());
        assert!(text.contains("  fast                     : 15.00×"));
    }
}
