// Predictor configuration
//
// Model list and hyperparameters for the complexity-speedup regression.
// Defaults: 5-fold unshuffled CV, a 100-tree forest of depth 5 seeded with 42.

use super::ModelKind;
use serde::{Deserialize, Serialize};

/// Settings for [`evaluate`](super::evaluate)
///
/// # Example
/// ```
/// use asbb_analysis::predictor::{ModelKind, PredictorConfig};
///
/// let config = PredictorConfig::default();
/// assert_eq!(config.folds, 5);
/// assert_eq!(config.models[0], ModelKind::Linear);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Number of cross-validation folds (clamped to the sample count)
    pub folds: usize,

    /// Trees in the random forest
    pub n_estimators: usize,

    /// Maximum depth of each forest tree
    pub max_depth: usize,

    /// Seed for the forest's bootstrap sampling
    pub random_state: u64,

    /// Models to fit, in evaluation order
    pub models: Vec<ModelKind>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            folds: 5,
            n_estimators: 100,
            max_depth: 5,
            random_state: 42,
            models: ModelKind::ALL.to_vec(),
        }
    }
}

impl PredictorConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.folds < 2 {
            return Err(format!("predictor.folds must be at least 2, got {}", self.folds));
        }
        if self.n_estimators == 0 {
            return Err("predictor.n_estimators must be at least 1".to_string());
        }
        if self.max_depth == 0 {
            return Err("predictor.max_depth must be at least 1".to_string());
        }
        if self.models.is_empty() {
            return Err("predictor.models must name at least one model".to_string());
        }
        for (i, kind) in self.models.iter().enumerate() {
            if self.models[..i].contains(kind) {
                return Err(format!("predictor.models lists {kind} twice"));
            }
        }
        Ok(())
    }
}
