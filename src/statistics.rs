// Statistical tests for benchmark comparisons using aprender
//
// Wraps aprender's hypothesis tests with f64 in/out so report code never
// handles the f32 conversion. Effect sizes follow Cohen's conventional bands.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;

/// Result of a one-sample t-test
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TTest {
    /// t-statistic value
    pub statistic: f64,
    /// Two-tailed p-value
    pub pvalue: f64,
    /// Degrees of freedom
    pub df: f64,
}

impl TTest {
    /// Whether the null hypothesis is rejected at `alpha`
    pub fn rejects(&self, alpha: f64) -> bool {
        self.pvalue < alpha
    }
}

/// Test whether the mean of `values` differs from `mu`
///
/// # Example
/// ```
/// use asbb_analysis::statistics::one_sample_ttest;
///
/// let ratios = [1.02, 0.98, 1.01, 0.99, 1.00];
/// let test = one_sample_ttest(&ratios, 1.0).unwrap();
/// assert!(!test.rejects(0.05));
/// ```
pub fn one_sample_ttest(values: &[f64], mu: f64) -> Result<TTest> {
    if values.len() < 2 {
        anyhow::bail!(
            "Need at least 2 samples for a one-sample t-test, got {}",
            values.len()
        );
    }

    let sample: Vec<f32> = values.iter().map(|&v| v as f32).collect();
    let result = aprender::stats::hypothesis::ttest_1samp(&sample, mu as f32)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("Failed to compute one-sample t-test")?;

    Ok(TTest {
        statistic: f64::from(result.statistic),
        pvalue: f64::from(result.pvalue),
        df: f64::from(result.df),
    })
}

/// Pearson correlation over the pairs where both values are present
///
/// `None` when fewer than two complete pairs remain or either side has no
/// variance.
pub fn correlation(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let (xs, ys): (Vec<f32>, Vec<f32>) = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((*a as f32, *b as f32)),
            _ => None,
        })
        .unzip();
    if xs.len() < 2 {
        return None;
    }
    let r = aprender::stats::corr(
        &aprender::primitives::Vector::from_slice(&xs),
        &aprender::primitives::Vector::from_slice(&ys),
    )
    .ok()?;
    r.is_finite().then_some(f64::from(r))
}

/// Conventional interpretation of |d|
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectSize {
    Negligible,
    Small,
    Medium,
    Large,
}

impl EffectSize {
    pub fn classify(d: f64) -> EffectSize {
        let d = d.abs();
        if d < 0.2 {
            EffectSize::Negligible
        } else if d < 0.5 {
            EffectSize::Small
        } else if d < 0.8 {
            EffectSize::Medium
        } else {
            EffectSize::Large
        }
    }
}

impl fmt::Display for EffectSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EffectSize::Negligible => "negligible",
            EffectSize::Small => "small",
            EffectSize::Medium => "medium",
            EffectSize::Large => "large",
        })
    }
}

/// Cohen's d of `treatment` over `control`, scaled by `std_dev`
///
/// Uses the treatment group's spread as a conservative pooled estimate.
/// Returns 0.0 when `std_dev` is not positive.
pub fn cohens_d(treatment: f64, control: f64, std_dev: f64) -> f64 {
    if std_dev > 0.0 {
        (treatment - control) / std_dev
    } else {
        0.0
    }
}
