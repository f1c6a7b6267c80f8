//! Prediction stage
//!
//! Runs the model over prepared feature vectors, undoes the log1p target
//! transform and attaches each prediction to the caller's original record.

use super::model::Regressor;
use crate::error::{ForecastError, Result};
use crate::preprocessing::{check_feature_order, feature_matrix, FeatureVector, FEATURE_COUNT};
use crate::record::{coerce, InputRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Date format of output records
pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%dT00:00:00.000";

/// An original input record with its sales prediction appended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Original fields under their canonical names
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    /// Predicted sales, in currency units
    pub prediction: f64,
}

impl PredictionResult {
    /// Build the output record for `record`
    pub fn new(record: &InputRecord, prediction: f64) -> Self {
        let mut fields = record.fields.clone();
        fields.remove("prediction");
        fields.insert(
            "date".to_string(),
            Value::String(record.raw.date.format(OUTPUT_DATE_FORMAT).to_string()),
        );
        Self { fields, prediction }
    }

    /// Store id of the record, if it reads as an integer
    pub fn store(&self) -> Option<i64> {
        self.fields.get("store").and_then(|v| coerce::int(v).ok().flatten())
    }
}

/// Runs a [`Regressor`] over feature vectors
#[derive(Clone)]
pub struct InferenceEngine {
    model: Arc<dyn Regressor>,
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("n_features", &self.model.n_features())
            .field("has_feature_names", &self.model.feature_names().is_some())
            .finish()
    }
}

impl InferenceEngine {
    /// Wrap a model, checking that it accepts the 20-feature input.
    ///
    /// With `validate_feature_names`, names stored with the model must match
    /// the feature order exactly.
    pub fn new(model: Arc<dyn Regressor>, validate_feature_names: bool) -> Result<Self> {
        if model.n_features() != FEATURE_COUNT {
            return Err(ForecastError::ShapeError {
                expected: format!("a model over {} features", FEATURE_COUNT),
                actual: format!("a model over {} features", model.n_features()),
            });
        }
        if validate_feature_names {
            if let Some(names) = model.feature_names() {
                check_feature_order(names)?;
            }
        }
        Ok(Self { model })
    }

    pub fn model(&self) -> &Arc<dyn Regressor> {
        &self.model
    }

    /// Predicted sales for each vector: `exp(raw) - 1`
    pub fn predict(&self, vectors: &[FeatureVector]) -> Result<Vec<f64>> {
        let start = Instant::now();
        let x = feature_matrix(vectors);
        let raw = self.model.predict(&x)?;

        if raw.len() != vectors.len() {
            return Err(ForecastError::InferenceError(format!(
                "model returned {} scores for {} rows",
                raw.len(),
                vectors.len()
            )));
        }

        let predictions: Vec<f64> = raw.iter().map(|s| s.exp_m1()).collect();
        debug!(
            rows = vectors.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Model inference complete"
        );
        Ok(predictions)
    }

    /// Predict and attach each value to the original record at the same position
    pub fn predict_records(
        &self,
        originals: &[&InputRecord],
        vectors: &[FeatureVector],
    ) -> Result<Vec<PredictionResult>> {
        if originals.len() != vectors.len() {
            return Err(ForecastError::ShapeError {
                expected: format!("{} feature vectors", originals.len()),
                actual: format!("{} feature vectors", vectors.len()),
            });
        }
        let predictions = self.predict(vectors)?;
        Ok(originals
            .iter()
            .zip(predictions)
            .map(|(record, p)| PredictionResult::new(record, p))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::InputBatch;
    use ndarray::{Array1, Array2};
    use serde_json::json;

    /// Scores the store id column
    struct StoreEcho {
        names: Option<Vec<String>>,
        width: usize,
    }

    impl Regressor for StoreEcho {
        fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
            Ok(x.column(0).to_owned())
        }

        fn n_features(&self) -> usize {
            self.width
        }

        fn feature_names(&self) -> Option<&[String]> {
            self.names.as_deref()
        }
    }

    fn vector(store: f64) -> FeatureVector {
        FeatureVector {
            store,
            promo: 0.0,
            store_type: 0.0,
            assortment: 1.0,
            competition_distance: 0.0,
            competition_open_since_month: 1.0,
            competition_open_since_year: 2010.0,
            promo2: 0.0,
            promo2_since_week: 1.0,
            promo2_since_year: 2015.0,
            competition_months_old: 0.0,
            promo2_months_old: 0.0,
            month_sin: 0.0,
            month_cos: 1.0,
            day_sin: 0.0,
            day_cos: 1.0,
            day_of_week_sin: 0.0,
            day_of_week_cos: 1.0,
            week_of_year_sin: 0.0,
            week_of_year_cos: 1.0,
        }
    }

    fn echo() -> Arc<dyn Regressor> {
        Arc::new(StoreEcho { names: None, width: FEATURE_COUNT })
    }

    #[test]
    fn test_inverse_log_transform() {
        let engine = InferenceEngine::new(echo(), true).unwrap();
        let out = engine.predict(&[vector(0.0), vector(1.0)]).unwrap();
        assert_eq!(out[0], 0.0);
        assert!((out[1] - (std::f64::consts::E - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_wrong_width() {
        let model: Arc<dyn Regressor> = Arc::new(StoreEcho { names: None, width: 19 });
        assert!(matches!(
            InferenceEngine::new(model, false),
            Err(ForecastError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_rejects_misordered_feature_names() {
        let mut names: Vec<String> =
            crate::preprocessing::FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        names.swap(12, 13);
        let model: Arc<dyn Regressor> =
            Arc::new(StoreEcho { names: Some(names), width: FEATURE_COUNT });
        assert!(InferenceEngine::new(model.clone(), true).is_err());
        assert!(InferenceEngine::new(model, false).is_ok());
    }

    #[test]
    fn test_output_keeps_original_values() {
        let batch = InputBatch::from_json(&json!({
            "Store": 1,
            "Date": "2015-07-31",
            "Open": 1,
            "Promo": 1,
            "StoreType": "c",
            "Assortment": "a",
            "CompetitionDistance": 1270.0,
            "Promo2": 0,
            "StateHoliday": "0"
        }))
        .unwrap();
        let originals: Vec<&InputRecord> = batch.records().iter().collect();
        let engine = InferenceEngine::new(echo(), true).unwrap();
        let results = engine.predict_records(&originals, &[vector(0.0)]).unwrap();

        let out = serde_json::to_value(&results[0]).unwrap();
        assert_eq!(out["store"], json!(1));
        assert_eq!(out["competition_distance"], json!(1270.0));
        assert_eq!(out["state_holiday"], json!("0"));
        assert_eq!(out["date"], json!("2015-07-31T00:00:00.000"));
        assert_eq!(out["prediction"], json!(0.0));
        assert_eq!(results[0].store(), Some(1));
    }
}
