//! Feature preparation
//!
//! Turns engineered records into the model's feature vectors:
//! - Rescaling of competition distance, ages and year (robust / min-max)
//! - Ordinal assortment and label-encoded store type
//! - Sine/cosine encoding of month, day, weekday and ISO week
//! - Selection of the 20 features in model order

mod bank;
mod encoder;
mod features;
mod preparation;
mod scaler;

pub use bank::{ScalerBank, TransformId};
pub use encoder::{encode_assortment, EncoderType, LabelEncoder};
pub use features::{
    check_feature_order, cyclical_encode, feature_matrix, FeatureVector, FEATURE_COUNT,
    FEATURE_NAMES,
};
pub use preparation::{FeaturePreparer, PreparedRecord};
pub use scaler::{Rescaler, ScalerType};

use serde::{Deserialize, Serialize};

/// How persisted transforms are applied to a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescaleMode {
    /// Apply the stored parameters unchanged
    #[default]
    Frozen,
    /// Re-derive parameters from the batch before applying them.
    /// Predictions then depend on which other records share the batch.
    Refit,
}

impl std::str::FromStr for RescaleMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "frozen" => Ok(RescaleMode::Frozen),
            "refit" => Ok(RescaleMode::Refit),
            other => Err(format!("unknown rescale mode: {}", other)),
        }
    }
}
