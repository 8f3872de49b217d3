// Analysis configuration
//
// Every threshold the reports apply lives here so a study can retune them
// from a TOML file instead of editing code. Defaults reproduce the values the
// published findings were generated with.

use crate::analyses::publication::PublicationConfig;
use crate::predictor::PredictorConfig;
use crate::report::chart::ChartStyle;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration shared by all reports
///
/// # Example
/// ```
/// use asbb_analysis::config::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.baseline, "naive");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Configuration/backend name that marks the baseline in every group
    pub baseline: String,

    /// Portability ratios inside this band count as "transferred"
    ///
    /// Default: [0.8, 1.2] (within ±20%)
    pub portability_band: (f64, f64),

    /// Composition ratios inside this band count as multiplicative
    ///
    /// Default: [0.9, 1.1]
    pub composition_band: (f64, f64),

    /// Share of predictions within 20% error required for "HIGH" accuracy
    pub high_accuracy_share: f64,

    /// Significance level for hypothesis tests
    pub significance_level: f64,

    /// Repetitions per experiment in statistical batch runs
    pub repetitions: usize,

    /// Operations excluded from the complexity regression
    pub regression_exclude: Vec<String>,

    pub predictor: PredictorConfig,

    pub chart: ChartStyle,

    /// Measured I/O values for the publication figures
    pub publication: PublicationConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            baseline: "naive".to_string(),
            portability_band: (0.8, 1.2),
            composition_band: (0.9, 1.1),
            high_accuracy_share: 0.8,
            significance_level: 0.05,
            repetitions: 30,
            regression_exclude: vec!["reverse_complement".to_string()],
            predictor: PredictorConfig::default(),
            chart: ChartStyle::default(),
            publication: PublicationConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a TOML file; omitted keys keep their defaults
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        let config: AnalysisConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML analysis config")?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid analysis config: {e}"))?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.baseline.trim().is_empty() {
            return Err("baseline must not be empty".to_string());
        }
        for (name, (lo, hi)) in [
            ("portability_band", self.portability_band),
            ("composition_band", self.composition_band),
        ] {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(format!("{name} must be a finite range with lo < hi, got ({lo}, {hi})"));
            }
        }
        if !(0.0..=1.0).contains(&self.high_accuracy_share) {
            return Err(format!(
                "high_accuracy_share must be in [0, 1], got {}",
                self.high_accuracy_share
            ));
        }
        if self.significance_level <= 0.0 || self.significance_level >= 1.0 {
            return Err(format!(
                "significance_level must be in (0, 1), got {}",
                self.significance_level
            ));
        }
        if self.repetitions == 0 {
            return Err("repetitions must be at least 1".to_string());
        }
        self.predictor.validate()?;
        self.chart.validate()?;
        self.publication.validate()?;
        Ok(())
    }

    pub fn in_portability_band(&self, ratio: f64) -> bool {
        self.portability_band.0 <= ratio && ratio <= self.portability_band.1
    }
}
