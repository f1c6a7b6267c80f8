//! Inference module
//!
//! - [`Regressor`]: the model seam, with an XGBoost JSON implementation
//! - [`InferenceEngine`]: shape checks, inverse log transform, output records
//! - [`summarize_by_store`]: per-store forecast totals

mod engine;
mod model;
mod summary;

pub use engine::{InferenceEngine, PredictionResult, OUTPUT_DATE_FORMAT};
pub use model::{Regressor, XGBoostModel};
pub use summary::{summarize_by_store, StoreForecast};
