//! Integration test: reference CSVs → store records → pipeline → per-store summary

use ndarray::{Array1, Array2};
use std::sync::Arc;
use store_sales::inference::{summarize_by_store, Regressor};
use store_sales::pipeline::{PipelineConfig, SalesPipeline};
use store_sales::preprocessing::{LabelEncoder, Rescaler, ScalerBank, FEATURE_COUNT};
use store_sales::utils::{RecordSource, StoreDataset};
use store_sales::ForecastError;

const TEST_CSV: &str = "\
Id,Store,DayOfWeek,Date,Open,Promo,StateHoliday,SchoolHoliday
1,1,4,2015-09-17,1.0,1,0,0
2,3,4,2015-09-17,1.0,1,0,0
857,1,3,2015-09-16,1.0,1,0,0
858,3,3,2015-09-16,1.0,1,0,0
1713,1,2,2015-09-15,0.0,1,0,0
";

const STORE_CSV: &str = "\
Store,StoreType,Assortment,CompetitionDistance,CompetitionOpenSinceMonth,CompetitionOpenSinceYear,Promo2,Promo2SinceWeek,Promo2SinceYear,PromoInterval
1,c,a,1270.0,9.0,2008.0,0,,,
3,a,a,14130.0,12.0,2006.0,1,14.0,2011.0,\"Jan,Apr,Jul,Oct\"
";

/// Scores ln(1001) for every row, so each day predicts 1000
struct Flat;

impl Regressor for Flat {
    fn predict(&self, x: &Array2<f64>) -> store_sales::Result<Array1<f64>> {
        Ok(Array1::from_elem(x.nrows(), 1001f64.ln()))
    }

    fn n_features(&self) -> usize {
        FEATURE_COUNT
    }
}

fn pipeline() -> SalesPipeline {
    let bank = ScalerBank::new(
        Rescaler::Robust { center: 2330.0, scale: 6250.0 },
        Rescaler::Robust { center: 4.0, scale: 32.0 },
        Rescaler::MinMax { scale: 0.04, min: 0.0, feature_range: (0.0, 1.0) },
        Rescaler::MinMax { scale: 0.5, min: -1006.5, feature_range: (0.0, 1.0) },
        LabelEncoder::new(["a", "b", "c", "d"]),
    );
    SalesPipeline::new(Arc::new(bank), Arc::new(Flat), PipelineConfig::default()).unwrap()
}

fn dataset() -> StoreDataset {
    let dir = std::env::temp_dir().join(format!("store_sales_forecast_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("test.csv"), TEST_CSV).unwrap();
    std::fs::write(dir.join("store.csv"), STORE_CSV).unwrap();
    let ds = StoreDataset::from_csv(dir.join("test.csv"), dir.join("store.csv")).unwrap();
    let _ = std::fs::remove_dir_all(&dir);
    ds
}

#[test]
fn test_store_forecast_message() {
    let ds = dataset();
    let pipeline = pipeline();

    let records = ds.records_for_store(1).unwrap();
    let forecast = pipeline.predict_json(&records).unwrap();
    assert_eq!(forecast.records().len(), 2);

    let summary = summarize_by_store(forecast.records());
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].store, 1);
    assert_eq!(summary[0].days, 2);
    assert!((summary[0].total - 2000.0).abs() < 1e-6);
    assert_eq!(
        summary[0].to_string(),
        "The sales forecast for the next 7 weeks for Store No. 1 is $2,000.00."
    );
}

#[test]
fn test_promo_store_with_interval() {
    let ds = dataset();
    let forecast = pipeline().predict_json(&ds.records_for_store(3).unwrap()).unwrap();
    let out = forecast.to_json().unwrap();
    assert_eq!(out[0]["promo_interval"], "Jan,Apr,Jul,Oct");
    assert_eq!(out[0]["id"], 2);
}

#[test]
fn test_unknown_store() {
    let err = dataset().records_for_store(999).unwrap_err();
    assert!(matches!(err, ForecastError::StoreNotAvailable(999)));
    assert_eq!(err.to_string(), "Store 999 not available");
}
