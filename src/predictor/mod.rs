// Complexity-speedup predictor
//
// Fits a fixed, ordered set of regression models to
// (complexity score, log10 scale) -> speedup and scores each one on its
// training data and with k-fold cross-validation.
//
// Implementation:
// - aprender (crates.io) supplies the estimators, scaler, k-fold splitter
//   and R²/MAE metrics
// - features and targets are f64 at the API boundary, f32 inside aprender
// - a model that cannot be fitted fails alone; the others still run

mod config;
mod models;

pub use config::PredictorConfig;
pub use models::{
    evaluate, Dataset, FittedModel, ModelDetail, ModelKind, ModelReport, PredictorOutcome,
};

use thiserror::Error;

/// Errors for predictor operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictorError {
    #[error("{model}: insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData {
        model: ModelKind,
        required: usize,
        actual: usize,
    },

    #[error("{model}: fit failed: {message}")]
    Fit { model: ModelKind, message: String },

    #[error("No model could be fitted")]
    NoUsableModel,
}

pub type Result<T> = std::result::Result<T, PredictorError>;

#[cfg(test)]
mod tests;
