use assert_approx_eq::assert_approx_eq;
use chrono::{Datelike, NaiveDate};
use demand_forecast::error::ForecastError;
use demand_forecast::frame::{FeatureFrame, RowKind};
use demand_forecast::temporal;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn frame_with_weeks(weeks: Vec<Option<NaiveDate>>) -> FeatureFrame {
    let n = weeks.len();
    FeatureFrame::from_parts(
        vec!["NYC".to_string(); n],
        vec!["SKU1".to_string(); n],
        weeks,
        vec![RowKind::Historical { units: 0.0 }; n],
    )
    .unwrap()
}

fn float_column(frame: &FeatureFrame, name: &str) -> Vec<f64> {
    frame
        .float_values(name)
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap())
        .collect()
}

#[test]
fn test_time_index_is_dense_over_distinct_weeks() {
    // Three distinct weeks, one duplicated, deliberately out of order
    let w1 = date(2024, 1, 1);
    let w2 = date(2024, 1, 8);
    let w3 = date(2024, 1, 15);
    let mut frame = frame_with_weeks(vec![Some(w3), Some(w1), Some(w2), Some(w1)]);
    frame.sort_by_week().unwrap();
    temporal::encode(&mut frame).unwrap();

    assert_eq!(float_column(&frame, "time_index"), vec![0.0, 0.0, 1.0, 2.0]);
}

#[test]
fn test_shared_index_spans_history_and_future() {
    let weeks = vec![
        Some(date(2024, 1, 1)),
        Some(date(2024, 1, 8)),
        Some(date(2024, 2, 5)),
    ];
    let mut frame = frame_with_weeks(weeks);
    temporal::encode(&mut frame).unwrap();

    // The later week continues the same dense index, gap or not
    assert_approx_eq!(float_column(&frame, "time_index")[2], 2.0);
}

#[test]
fn test_cyclical_encoding_is_on_unit_circle() {
    let weeks = vec![
        Some(date(2024, 1, 1)),
        Some(date(2024, 4, 1)),
        Some(date(2024, 7, 1)),
        Some(date(2024, 12, 30)),
    ];
    let mut frame = frame_with_weeks(weeks.clone());
    temporal::encode(&mut frame).unwrap();

    let sin = float_column(&frame, "sin_week");
    let cos = float_column(&frame, "cos_week");
    let woy = float_column(&frame, "week_of_year");
    for row in 0..frame.len() {
        assert_approx_eq!(sin[row] * sin[row] + cos[row] * cos[row], 1.0);
        assert_approx_eq!(woy[row], weeks[row].unwrap().iso_week().week() as f64);
    }
}

#[test]
fn test_month_and_quarter_codes() {
    let mut frame = frame_with_weeks(vec![Some(date(2024, 5, 6)), Some(date(2024, 10, 7))]);
    temporal::encode(&mut frame).unwrap();

    assert_eq!(float_column(&frame, "month"), vec![5.0, 10.0]);
    assert_eq!(float_column(&frame, "quarter"), vec![2.0, 4.0]);
}

#[test]
fn test_missing_timestamp_is_rejected() {
    let mut frame = frame_with_weeks(vec![Some(date(2024, 1, 1)), None]);
    let result = temporal::encode(&mut frame);
    match result {
        Err(ForecastError::DataIntegrity(message)) => {
            assert!(message.contains("week_start"));
        }
        other => panic!("Expected DataIntegrity error, got {:?}", other),
    }
}
