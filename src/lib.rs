//! Store Sales - daily sales prediction for retail stores
//!
//! This crate turns raw per-store, per-day records into sales predictions
//! from a gradient-boosted model trained on log1p-transformed sales:
//! - Record validation at the exchange-format boundary
//! - Batch-dependent cleaning and imputation
//! - Calendar and competition/promo age features
//! - Persisted rescalers and encoders, cyclical encodings
//! - Model scoring and per-store forecast summaries
//!
//! # Modules
//!
//! ## Pipeline stages
//! - [`record`] - Input records, field-name normalization, coercion
//! - [`imputation`] - Cleaning stage: batch fill values for nulls
//! - [`feature_engineering`] - Calendar fields, ages, closed-store filter
//! - [`preprocessing`] - Rescaling, encoding, feature vector
//! - [`inference`] - Model seam, prediction stage, summaries
//! - [`pipeline`] - The end-to-end pipeline and its configuration
//!
//! ## Services
//! - [`utils`] - Reference CSV data source
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Pipeline stages
pub mod record;
pub mod imputation;
pub mod feature_engineering;
pub mod preprocessing;
pub mod inference;
pub mod pipeline;

// Services
pub mod utils;
pub mod cli;

pub use error::{ForecastError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ForecastError, Result};

    // Records
    pub use crate::record::{InputBatch, InputRecord, RawRecord};

    // Stages
    pub use crate::imputation::DataCleaner;
    pub use crate::feature_engineering::engineer;
    pub use crate::preprocessing::{FeaturePreparer, FeatureVector, RescaleMode, ScalerBank};
    pub use crate::inference::{summarize_by_store, PredictionResult, Regressor, StoreForecast, XGBoostModel};

    // Pipeline
    pub use crate::pipeline::{Forecast, PipelineConfig, SalesPipeline};

    // Reference data
    pub use crate::utils::{RecordSource, StoreDataset};
}
