use chrono::NaiveDate;
use demand_forecast::data::InputTables;
use demand_forecast::error::ForecastError;
use std::fs;
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn write_fixture_tables(dir: &TempDir) {
    fs::write(
        dir.path().join("panel_train.csv"),
        "market,sku_id,week_start,units,price,promo_flag,holiday_flag,temp_c,rain_mm\n\
         NYC,SKU1,01-01-2024,100,9.99,0,0,5.0,2.0\n\
         NYC,SKU1,08-01-2024,120,9.99,1,0,6.5,0.0\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("price_plan_future.csv"),
        "market,sku_id,week_start,planned_price\n\
         NYC,SKU1,15-01-2024,9.49\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("promos_future.csv"),
        "market,sku_id,week_start,week_end\n\
         NYC,SKU1,15-01-2024,22-01-2024\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("weather_future.csv"),
        "market,week_start,temp_c,rain_mm\n\
         NYC,15-01-2024,4.0,1.5\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("calendar_future.csv"),
        "week_start,holiday_flag\n\
         15-01-2024,0\n",
    )
    .unwrap();
}

#[test]
fn test_load_all_tables() {
    let dir = TempDir::new().unwrap();
    write_fixture_tables(&dir);

    let tables = InputTables::load_dir(dir.path()).unwrap();
    assert_eq!(tables.panel.len(), 2);
    assert_eq!(tables.price_plan.len(), 1);
    assert_eq!(tables.promos.len(), 1);
    assert_eq!(tables.weather.len(), 1);
    assert_eq!(tables.calendar.len(), 1);

    // Day-month-year dates are parsed on ingestion
    assert_eq!(tables.panel[0].week_start, Some(date(2024, 1, 1)));
    assert_eq!(tables.price_plan[0].week_start, date(2024, 1, 15));
    assert_eq!(tables.promos[0].week_end, date(2024, 1, 22));
    assert_eq!(tables.panel[1].promo_flag, Some(1));
    assert_eq!(tables.panel[1].units, Some(120.0));
}

#[test]
fn test_missing_table_is_a_load_error() {
    let dir = TempDir::new().unwrap();
    write_fixture_tables(&dir);
    fs::remove_file(dir.path().join("weather_future.csv")).unwrap();

    let result = InputTables::load_dir(dir.path());
    match result {
        Err(ForecastError::DataLoad(message)) => {
            assert!(message.contains("weather_future.csv"));
        }
        other => panic!("Expected DataLoad error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_unparseable_date_is_a_load_error() {
    let dir = TempDir::new().unwrap();
    write_fixture_tables(&dir);
    fs::write(
        dir.path().join("calendar_future.csv"),
        "week_start,holiday_flag\n2024-01-15,0\n",
    )
    .unwrap();

    assert!(matches!(
        InputTables::load_dir(dir.path()),
        Err(ForecastError::DataLoad(_))
    ));
}

#[test]
fn test_empty_week_start_loads_as_missing() {
    let dir = TempDir::new().unwrap();
    write_fixture_tables(&dir);
    fs::write(
        dir.path().join("panel_train.csv"),
        "market,sku_id,week_start,units,price,promo_flag,holiday_flag,temp_c,rain_mm\n\
         NYC,SKU1,,100,9.99,0,0,5.0,2.0\n",
    )
    .unwrap();

    let tables = InputTables::load_dir(dir.path()).unwrap();
    assert_eq!(tables.panel[0].week_start, None);
}

#[test]
fn test_fingerprint_tracks_input_identity() {
    let dir = TempDir::new().unwrap();
    write_fixture_tables(&dir);
    let first = InputTables::load_dir(dir.path()).unwrap();
    let second = InputTables::load_dir(dir.path()).unwrap();
    assert_eq!(first.fingerprint(), second.fingerprint());

    let mut changed = first.clone();
    changed.panel[0].units = Some(101.0);
    assert_ne!(first.fingerprint(), changed.fingerprint());
}
