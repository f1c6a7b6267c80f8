//! End-to-end sales pipeline
//!
//! Cleaning, feature engineering, feature preparation and prediction run in
//! sequence over one batch. The scaler bank and model are loaded once and
//! shared read-only between calls.

mod config;

pub use config::PipelineConfig;

use crate::error::{ForecastError, Result};
use crate::feature_engineering::engineer;
use crate::imputation::DataCleaner;
use crate::inference::{InferenceEngine, PredictionResult, Regressor, XGBoostModel};
use crate::preprocessing::{FeaturePreparer, ScalerBank};
use crate::record::{InputBatch, InputRecord};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Outcome of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum Forecast {
    /// The batch had no records
    NoInput,
    /// No record belonged to an open store
    NoPredictableRecords,
    Predicted(Vec<PredictionResult>),
}

impl Forecast {
    pub fn records(&self) -> &[PredictionResult] {
        match self {
            Forecast::Predicted(results) => results,
            Forecast::NoInput | Forecast::NoPredictableRecords => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    pub fn into_records(self) -> Vec<PredictionResult> {
        match self {
            Forecast::Predicted(results) => results,
            Forecast::NoInput | Forecast::NoPredictableRecords => Vec::new(),
        }
    }

    /// Output exchange format: an array of records, `[]` when empty
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.records())?)
    }
}

/// The sales prediction pipeline
#[derive(Debug, Clone)]
pub struct SalesPipeline {
    bank: Arc<ScalerBank>,
    engine: InferenceEngine,
    config: PipelineConfig,
}

impl SalesPipeline {
    /// Assemble a pipeline from already-loaded parts
    pub fn new(
        bank: Arc<ScalerBank>,
        model: Arc<dyn Regressor>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let engine = InferenceEngine::new(model, config.validate_feature_names)?;
        Ok(Self { bank, engine, config })
    }

    /// Load the scaler bank and model named by `config`.
    ///
    /// Any unreadable artifact fails the load; there is no partial pipeline.
    pub fn load(config: PipelineConfig) -> Result<Self> {
        let bank = ScalerBank::load(&config.artifact_dir)?;
        let model = XGBoostModel::load(&config.model_path)?;
        let model_path = config.model_path.clone();
        Self::new(Arc::new(bank), Arc::new(model), config)
            .map_err(|e| ForecastError::artifact(&model_path, e))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn bank(&self) -> &ScalerBank {
        &self.bank
    }

    pub fn model(&self) -> &Arc<dyn Regressor> {
        self.engine.model()
    }

    /// Run one batch through every stage
    pub fn predict(&self, batch: &InputBatch) -> Result<Forecast> {
        if batch.is_empty() {
            info!("Empty batch, nothing to predict");
            return Ok(Forecast::NoInput);
        }

        let start = Instant::now();
        let cleaned = DataCleaner::new()
            .with_distance_fallback(self.config.competition_distance_fallback)
            .clean(&batch.raw_records())?;

        let engineered = match engineer(cleaned) {
            Ok(records) => records,
            Err(ForecastError::EmptyResult) => {
                info!(records = batch.len(), "No open-store records in batch");
                return Ok(Forecast::NoPredictableRecords);
            }
            Err(e) => return Err(e),
        };

        let vectors = FeaturePreparer::new(&self.bank, self.config.rescale_mode).prepare(&engineered)?;

        let originals = engineered
            .iter()
            .map(|r| {
                batch.records().get(r.row).ok_or_else(|| {
                    ForecastError::InferenceError(format!("record {} lost its input row", r.row))
                })
            })
            .collect::<Result<Vec<&InputRecord>>>()?;

        let results = self.engine.predict_records(&originals, &vectors)?;

        info!(
            records = batch.len(),
            predicted = results.len(),
            mode = ?self.config.rescale_mode,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Batch predicted"
        );
        Ok(Forecast::Predicted(results))
    }

    /// Parse the input exchange format and run it
    pub fn predict_json(&self, value: &Value) -> Result<Forecast> {
        let batch = InputBatch::from_json(value)?;
        self.predict(&batch)
    }
}
