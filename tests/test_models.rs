use assert_approx_eq::assert_approx_eq;
use chrono::{Duration, NaiveDate};
use demand_forecast::assemble;
use demand_forecast::data::PanelRow;
use demand_forecast::dataset::FeatureMatrix;
use demand_forecast::future::FutureRow;
use demand_forecast::gbdt::{Booster, GbdtParams, Objective};
use demand_forecast::predict;
use demand_forecast::trainer::EnsembleTrainer;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn matrix_from(columns: Vec<Vec<f64>>, categorical: Vec<bool>) -> FeatureMatrix {
    let n_rows = columns[0].len();
    FeatureMatrix {
        names: (0..columns.len()).map(|i| format!("f{}", i)).collect(),
        categorical,
        columns,
        n_rows,
    }
}

fn small_params() -> GbdtParams {
    GbdtParams {
        n_rounds: 200,
        learning_rate: 0.1,
        num_leaves: 8,
        min_data_in_leaf: 5,
        lambda_l2: 0.0,
        min_split_gain: 0.0,
        subsample: 1.0,
        seed: 42,
    }
}

#[test]
fn test_unsplittable_data_predicts_base_score() {
    // A constant feature admits no split, so boosting stops at the base score
    let matrix = matrix_from(vec![vec![1.0; 4]], vec![false]);
    let labels = [100.0, 120.0, 100.0, 120.0];
    let model = Booster::train(&matrix, &labels, Objective::SquaredError, &small_params()).unwrap();

    assert_eq!(model.n_trees(), 0);
    for prediction in model.predict_matrix(&matrix) {
        assert_approx_eq!(prediction, 110.0);
    }
}

#[test]
fn test_split_recovers_group_means() {
    let mut x = vec![0.0; 30];
    x.extend(vec![1.0; 30]);
    let mut labels = vec![10.0; 30];
    labels.extend(vec![100.0; 30]);
    // Second feature is constant noise and should earn no gain
    let matrix = matrix_from(vec![x, vec![7.0; 60]], vec![false, false]);

    let model = Booster::train(&matrix, &labels, Objective::SquaredError, &small_params()).unwrap();
    let predictions = model.predict_matrix(&matrix);
    for row in 0..30 {
        assert!((predictions[row] - 10.0).abs() < 0.5);
        assert!((predictions[30 + row] - 100.0).abs() < 0.5);
    }

    let importance = model.feature_importance();
    assert!(importance[0].1 > 0.0);
    assert_approx_eq!(importance[1].1, 0.0);
}

#[test]
fn test_categorical_split_separates_groups() {
    // Codes 0 and 2 share a low level, code 1 is high; a numeric threshold
    // cannot separate them but a category-set split can
    let mut codes = Vec::new();
    let mut labels = Vec::new();
    for _ in 0..20 {
        codes.extend([0.0, 1.0, 2.0]);
        labels.extend([10.0, 100.0, 10.0]);
    }
    let matrix = matrix_from(vec![codes], vec![true]);

    let model = Booster::train(&matrix, &labels, Objective::SquaredError, &small_params()).unwrap();
    let predictions = model.predict_matrix(&matrix);
    assert!((predictions[0] - 10.0).abs() < 1.0);
    assert!((predictions[1] - 100.0).abs() < 1.0);
    assert!((predictions[2] - 10.0).abs() < 1.0);
}

#[test]
fn test_quantile_models_bracket_the_mean() {
    let mut x = Vec::new();
    let mut labels = Vec::new();
    for i in 0..50 {
        x.push(0.0);
        labels.push(i as f64);
    }
    for i in 0..50 {
        x.push(1.0);
        labels.push(100.0 + i as f64);
    }
    let matrix = matrix_from(vec![x], vec![false]);
    let params = small_params();

    let mean = Booster::train(&matrix, &labels, Objective::SquaredError, &params).unwrap();
    let lower =
        Booster::train(&matrix, &labels, Objective::Quantile { alpha: 0.05 }, &params).unwrap();
    let upper =
        Booster::train(&matrix, &labels, Objective::Quantile { alpha: 0.95 }, &params).unwrap();

    let mean_pred = mean.predict_matrix(&matrix);
    let lower_pred = lower.predict_matrix(&matrix);
    let upper_pred = upper.predict_matrix(&matrix);
    for row in 0..matrix.n_rows {
        assert!(lower_pred[row] < mean_pred[row], "row {}", row);
        assert!(mean_pred[row] < upper_pred[row], "row {}", row);
    }
}

#[test]
fn test_missing_values_route_through_splits() {
    let mut x = vec![0.0; 30];
    x.extend(vec![1.0; 30]);
    x.push(f64::NAN);
    let mut labels = vec![10.0; 30];
    labels.extend(vec![100.0; 30]);
    labels.push(10.0);
    let matrix = matrix_from(vec![x], vec![false]);

    let model = Booster::train(&matrix, &labels, Objective::SquaredError, &small_params()).unwrap();
    let predictions = model.predict_matrix(&matrix);
    // The NaN row lands in some leaf and yields a finite prediction
    assert!(predictions[60].is_finite());
}

#[test]
fn test_training_is_reproducible() {
    let mut x = vec![0.0; 30];
    x.extend(vec![1.0; 30]);
    let mut labels = vec![10.0; 30];
    labels.extend(vec![100.0; 30]);
    let matrix = matrix_from(vec![x], vec![false]);
    let mut params = small_params();
    params.subsample = 0.8;

    let first = Booster::train(&matrix, &labels, Objective::SquaredError, &params).unwrap();
    let second = Booster::train(&matrix, &labels, Objective::SquaredError, &params).unwrap();
    assert_eq!(first.predict_matrix(&matrix), second.predict_matrix(&matrix));
}

#[test]
fn test_forecasts_clip_at_zero() {
    // Returns-style panel with negative demand; the raw model output is
    // negative and every exported column clips to zero
    let start = date(2023, 1, 2);
    let panel: Vec<PanelRow> = (0..30)
        .map(|i| PanelRow {
            market: "NYC".to_string(),
            sku_id: "SKU1".to_string(),
            week_start: Some(start + Duration::weeks(i)),
            units: Some(-50.0 - i as f64),
            price: Some(9.99),
            promo_flag: Some(0),
            holiday_flag: Some(0),
            temp_c: Some(10.0),
            rain_mm: Some(2.0),
        })
        .collect();
    let future = vec![FutureRow {
        market: "NYC".to_string(),
        sku_id: "SKU1".to_string(),
        week_start: start + Duration::weeks(30),
        price: Some(9.99),
        temp_c: Some(10.0),
        rain_mm: Some(2.0),
        holiday_flag: Some(0),
        promo_flag: 0,
    }];

    let assembled = assemble::assemble(&panel, &future).unwrap();
    let models = EnsembleTrainer::demand_default().train(&assembled.train).unwrap();
    let set = predict::predict(&models, &assembled.future).unwrap();

    assert_eq!(set.len(), 1);
    let record = &set.records()[0];
    assert_approx_eq!(record.forecast, 0.0);
    assert_approx_eq!(record.lower_90, 0.0);
    assert_approx_eq!(record.upper_90, 0.0);
}
