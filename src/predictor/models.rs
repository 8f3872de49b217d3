//! Model fitting, scoring and cross-validation

use super::{PredictorConfig, PredictorError, Result};
use crate::aggregate::{best_by, mean, Direction};
use aprender::linear_model::LinearRegression;
use aprender::metrics::{mae, r_squared};
use aprender::model_selection::KFold;
use aprender::preprocessing::StandardScaler;
use aprender::primitives::{Matrix, Vector};
use aprender::traits::{Estimator, Transformer};
use aprender::tree::RandomForestRegressor;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Regression models, in their default evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Linear regression on standardized features
    Linear,
    /// Degree-2 expansion `[a, b, a², ab, b²]` of standardized features
    Polynomial,
    /// Random forest on raw features
    RandomForest,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::Linear,
        ModelKind::Polynomial,
        ModelKind::RandomForest,
    ];

    /// Fewest samples the model can be fitted on
    pub fn min_samples(self) -> usize {
        match self {
            ModelKind::Linear => 3,
            ModelKind::Polynomial => 6,
            ModelKind::RandomForest => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModelKind::Linear => "Linear",
            ModelKind::Polynomial => "Polynomial (deg 2)",
            ModelKind::RandomForest => "Random Forest",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Feature rows `[complexity, log10 scale]` with their targets
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub features: Vec<[f64; 2]>,
    pub target: Vec<f64>,
}

impl Dataset {
    pub fn push(&mut self, features: [f64; 2], target: f64) {
        self.features.push(features);
        self.target.push(target);
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: indices.iter().map(|&i| self.features[i]).collect(),
            target: indices.iter().map(|&i| self.target[i]).collect(),
        }
    }
}

/// Learned parameters worth reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelDetail {
    Coefficients { coefficients: Vec<f64>, intercept: f64 },
    Importances(Vec<f64>),
    None,
}

/// Goodness-of-fit of one model
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub kind: ModelKind,
    /// R² on the training data
    pub r2: f64,
    /// Mean absolute error on the training data
    pub mae: f64,
    /// Mean cross-validated R² (NaN when no fold could be scored)
    pub cv_mean: f64,
    /// Population std of the fold R² values
    pub cv_std: f64,
    /// Folds that were actually scored
    pub cv_folds: usize,
    pub detail: ModelDetail,
}

/// A model fitted on the full dataset
#[derive(Debug, Clone)]
pub enum FittedModel {
    Linear {
        scaler: StandardScaler,
        model: LinearRegression,
    },
    Polynomial {
        scaler: StandardScaler,
        model: LinearRegression,
    },
    RandomForest(RandomForestRegressor),
}

fn fit_error(model: ModelKind, message: impl fmt::Display) -> PredictorError {
    PredictorError::Fit {
        model,
        message: message.to_string(),
    }
}

fn to_matrix(model: ModelKind, rows: &[[f64; 2]]) -> Result<Matrix<f32>> {
    let data: Vec<f32> = rows
        .iter()
        .flat_map(|r| [r[0] as f32, r[1] as f32])
        .collect();
    Matrix::from_vec(rows.len(), 2, data).map_err(|e| fit_error(model, e))
}

fn to_vector(values: &[f64]) -> Vector<f32> {
    let data: Vec<f32> = values.iter().map(|&v| v as f32).collect();
    Vector::from_slice(&data)
}

fn from_vector(values: &Vector<f32>) -> Vec<f64> {
    values.as_slice().iter().map(|&v| f64::from(v)).collect()
}

/// `[a, b]` -> `[a, b, a², ab, b²]`
fn expand_quadratic(model: ModelKind, x: &Matrix<f32>) -> Result<Matrix<f32>> {
    let (rows, _) = x.shape();
    let mut data = Vec::with_capacity(rows * 5);
    for r in 0..rows {
        let (a, b) = (x.get(r, 0), x.get(r, 1));
        data.extend_from_slice(&[a, b, a * a, a * b, b * b]);
    }
    Matrix::from_vec(rows, 5, data).map_err(|e| fit_error(model, e))
}

impl FittedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            FittedModel::Linear { .. } => ModelKind::Linear,
            FittedModel::Polynomial { .. } => ModelKind::Polynomial,
            FittedModel::RandomForest(_) => ModelKind::RandomForest,
        }
    }

    /// Fit `kind` on `data`
    pub fn fit(kind: ModelKind, data: &Dataset, config: &PredictorConfig) -> Result<FittedModel> {
        if data.len() < kind.min_samples() {
            return Err(PredictorError::InsufficientData {
                model: kind,
                required: kind.min_samples(),
                actual: data.len(),
            });
        }

        let x = to_matrix(kind, &data.features)?;
        let y = to_vector(&data.target);

        match kind {
            ModelKind::Linear | ModelKind::Polynomial => {
                let mut scaler = StandardScaler::new();
                let mut design = scaler.fit_transform(&x).map_err(|e| fit_error(kind, e))?;
                if kind == ModelKind::Polynomial {
                    design = expand_quadratic(kind, &design)?;
                }
                let mut model = LinearRegression::new();
                model.fit(&design, &y).map_err(|e| fit_error(kind, e))?;
                Ok(if kind == ModelKind::Linear {
                    FittedModel::Linear { scaler, model }
                } else {
                    FittedModel::Polynomial { scaler, model }
                })
            }
            ModelKind::RandomForest => {
                let mut forest = RandomForestRegressor::new(config.n_estimators)
                    .with_max_depth(config.max_depth)
                    .with_random_state(config.random_state);
                forest.fit(&x, &y).map_err(|e| fit_error(kind, e))?;
                Ok(FittedModel::RandomForest(forest))
            }
        }
    }

    /// Predict targets for feature rows
    pub fn predict(&self, rows: &[[f64; 2]]) -> Result<Vec<f64>> {
        let kind = self.kind();
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let x = to_matrix(kind, rows)?;
        let predicted = match self {
            FittedModel::Linear { scaler, model } => {
                let scaled = scaler.transform(&x).map_err(|e| fit_error(kind, e))?;
                model.predict(&scaled)
            }
            FittedModel::Polynomial { scaler, model } => {
                let scaled = scaler.transform(&x).map_err(|e| fit_error(kind, e))?;
                model.predict(&expand_quadratic(kind, &scaled)?)
            }
            FittedModel::RandomForest(forest) => forest.predict(&x),
        };
        Ok(from_vector(&predicted))
    }

    pub fn detail(&self) -> ModelDetail {
        match self {
            FittedModel::Linear { model, .. } | FittedModel::Polynomial { model, .. } => {
                ModelDetail::Coefficients {
                    coefficients: from_vector(model.coefficients()),
                    intercept: f64::from(model.intercept()),
                }
            }
            FittedModel::RandomForest(forest) => match forest.feature_importances() {
                Some(imp) => ModelDetail::Importances(imp.into_iter().map(f64::from).collect()),
                None => ModelDetail::None,
            },
        }
    }
}

fn score(predicted: &[f64], actual: &[f64]) -> (f64, f64) {
    let (p, a) = (to_vector(predicted), to_vector(actual));
    (f64::from(r_squared(&p, &a)), f64::from(mae(&p, &a)))
}

/// Scores of every unshuffled k-fold split of `n` rows
///
/// Folds whose training split is smaller than `kind` needs are skipped, and
/// so are folds that `score_fold` fails on.
pub(super) fn fold_scores(
    kind: ModelKind,
    n: usize,
    folds: usize,
    mut score_fold: impl FnMut(&[usize], &[usize]) -> Result<f64>,
) -> Vec<f64> {
    let k = folds.min(n);
    let mut scores = Vec::with_capacity(k);
    for (train_idx, test_idx) in KFold::new(k).split(n) {
        if train_idx.len() < kind.min_samples() || test_idx.is_empty() {
            debug!(model = %kind, train = train_idx.len(), "skipping undersized fold");
            continue;
        }
        match score_fold(&train_idx, &test_idx) {
            Ok(score) => scores.push(score),
            Err(e) => debug!(model = %kind, error = %e, "skipping fold that failed to fit"),
        }
    }
    scores
}

fn cross_validate(kind: ModelKind, data: &Dataset, config: &PredictorConfig) -> Vec<f64> {
    fold_scores(kind, data.len(), config.folds, |train_idx, test_idx| {
        let test = data.subset(test_idx);
        let fitted = FittedModel::fit(kind, &data.subset(train_idx), config)?;
        let predicted = fitted.predict(&test.features)?;
        Ok(score(&predicted, &test.target).0)
    })
}

fn evaluate_one(
    kind: ModelKind,
    data: &Dataset,
    config: &PredictorConfig,
) -> Result<(ModelReport, FittedModel)> {
    let fitted = FittedModel::fit(kind, data, config)?;
    let predicted = fitted.predict(&data.features)?;
    let (r2, mae) = score(&predicted, &data.target);

    let folds = cross_validate(kind, data, config);
    let (cv_mean, cv_std) = match mean(folds.iter().copied()) {
        Some(m) => {
            let var = folds.iter().map(|s| (s - m).powi(2)).sum::<f64>() / folds.len() as f64;
            (m, var.sqrt())
        }
        None => (f64::NAN, f64::NAN),
    };

    let report = ModelReport {
        kind,
        r2,
        mae,
        cv_mean,
        cv_std,
        cv_folds: folds.len(),
        detail: fitted.detail(),
    };
    Ok((report, fitted))
}

/// Reports for every fitted model plus the failures, in evaluation order
#[derive(Debug, Clone)]
pub struct PredictorOutcome {
    pub reports: Vec<ModelReport>,
    pub failures: Vec<PredictorError>,
    fitted: Vec<FittedModel>,
    best: Option<usize>,
}

impl PredictorOutcome {
    /// Best model: highest CV mean, falling back to training R² when no
    /// model could be cross-validated. The first model wins ties.
    pub fn best(&self) -> Option<&ModelReport> {
        self.best.map(|i| &self.reports[i])
    }

    /// Predict with the best model
    pub fn predict(&self, rows: &[[f64; 2]]) -> Result<Vec<f64>> {
        let best = self.best.ok_or(PredictorError::NoUsableModel)?;
        self.fitted[best].predict(rows)
    }
}

/// Fit and score every configured model on `data`
pub fn evaluate(data: &Dataset, config: &PredictorConfig) -> PredictorOutcome {
    let mut reports = Vec::new();
    let mut fitted = Vec::new();
    let mut failures = Vec::new();

    for &kind in &config.models {
        match evaluate_one(kind, data, config) {
            Ok((report, model)) => {
                debug!(model = %kind, r2 = report.r2, cv_mean = report.cv_mean, "fitted model");
                reports.push(report);
                fitted.push(model);
            }
            Err(e) => {
                warn!("{e}");
                failures.push(e);
            }
        }
    }

    let indices: Vec<usize> = (0..reports.len()).collect();
    let best = best_by(&indices, |&i| reports[i].cv_mean, Direction::Max)
        .or_else(|| best_by(&indices, |&i| reports[i].r2, Direction::Max))
        .copied();

    PredictorOutcome {
        reports,
        failures,
        fitted,
        best,
    }
}
