use super::*;

fn linear_dataset(n: usize) -> Dataset {
    let mut data = Dataset::default();
    for i in 0..n {
        let complexity = 0.2 + 0.05 * i as f64;
        let scale = 2.0 + ((i * 5) % 6) as f64;
        data.push([complexity, scale], 1.0 + 10.0 * complexity + 0.5 * scale);
    }
    data
}

#[test]
fn test_three_points_polynomial_is_insufficient() {
    let data = linear_dataset(3);
    let outcome = evaluate(&data, &PredictorConfig::default());

    assert!(outcome.failures.contains(&PredictorError::InsufficientData {
        model: ModelKind::Polynomial,
        required: 6,
        actual: 3,
    }));
    assert!(outcome.reports.iter().any(|r| r.kind == ModelKind::Linear));
    assert!(outcome
        .reports
        .iter()
        .any(|r| r.kind == ModelKind::RandomForest));
}

#[test]
fn test_ten_points_all_models_fit() {
    let data = linear_dataset(10);
    let outcome = evaluate(&data, &PredictorConfig::default());

    assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
    let kinds: Vec<ModelKind> = outcome.reports.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, ModelKind::ALL.to_vec());
    for report in &outcome.reports {
        assert!(report.r2.is_finite(), "{report:?}");
        assert!(report.mae.is_finite());
        assert_eq!(report.cv_folds, 5);
    }
    assert!(outcome.best().is_some());
}

#[test]
fn test_linear_recovers_noiseless_plane() {
    let data = linear_dataset(10);
    let outcome = evaluate(&data, &PredictorConfig::default());
    let linear = outcome
        .reports
        .iter()
        .find(|r| r.kind == ModelKind::Linear)
        .unwrap();
    assert!(linear.r2 > 0.99, "r2 = {}", linear.r2);
    assert!(matches!(
        linear.detail,
        ModelDetail::Coefficients { ref coefficients, .. } if coefficients.len() == 2
    ));
}

#[test]
fn test_predict_uses_best_model() {
    let data = linear_dataset(10);
    let outcome = evaluate(&data, &PredictorConfig::default());
    let predicted = outcome.predict(&[[0.35, 5.0]]).unwrap();
    assert_eq!(predicted.len(), 1);
    assert!(predicted[0].is_finite());
}

#[test]
fn test_no_model_fits_single_point() {
    let data = linear_dataset(1);
    let outcome = evaluate(&data, &PredictorConfig::default());
    assert_eq!(outcome.failures.len(), 3);
    assert!(outcome.best().is_none());
    assert_eq!(
        outcome.predict(&[[0.3, 3.0]]),
        Err(PredictorError::NoUsableModel)
    );
}

#[test]
fn test_model_subset_respects_order() {
    let config = PredictorConfig {
        models: vec![ModelKind::RandomForest, ModelKind::Linear],
        n_estimators: 10,
        ..Default::default()
    };
    let outcome = evaluate(&linear_dataset(8), &config);
    let kinds: Vec<ModelKind> = outcome.reports.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![ModelKind::RandomForest, ModelKind::Linear]);
}

#[test]
fn test_config_validation() {
    assert!(PredictorConfig::default().validate().is_ok());

    let bad_folds = PredictorConfig {
        folds: 1,
        ..Default::default()
    };
    assert!(bad_folds.validate().is_err());

    let duplicate = PredictorConfig {
        models: vec![ModelKind::Linear, ModelKind::Linear],
        ..Default::default()
    };
    assert!(duplicate.validate().unwrap_err().contains("twice"));
}

#[test]
fn test_models_parse_from_toml() {
    let config: PredictorConfig = toml::from_str("models = [\"random_forest\"]\nfolds = 3").unwrap();
    assert_eq!(config.models, vec![ModelKind::RandomForest]);
    assert_eq!(config.folds, 3);
    assert_eq!(config.n_estimators, 100);
}

#[test]
fn test_failed_fold_is_skipped_not_fatal() {
    let mut seen = 0;
    let scores = models::fold_scores(ModelKind::Linear, 10, 5, |train, _test| {
        seen += 1;
        if train.contains(&0) {
            Err(PredictorError::Fit {
                model: ModelKind::Linear,
                message: "singular".to_string(),
            })
        } else {
            Ok(0.75)
        }
    });
    assert_eq!(seen, 5);
    assert_eq!(scores, vec![0.75]);
}
