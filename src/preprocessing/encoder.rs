//! Categorical encoding

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Type of encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderType {
    /// Label encoding: index into the sorted class list
    Label,
}

/// Label encoder with a frozen, sorted class list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "label")]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Create an encoder; classes are sorted and deduplicated
    pub fn new<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes: Vec<String> = classes.into_iter().map(Into::into).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn encoder_type(&self) -> EncoderType {
        EncoderType::Label
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Reject an encoder that cannot encode anything, or whose classes are unsorted
    pub fn validate(&self) -> Result<()> {
        if self.classes.is_empty() {
            return Err(ForecastError::ConfigError("label encoder has no classes".into()));
        }
        if self.classes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ForecastError::ConfigError(
                "label encoder classes must be sorted and unique".into(),
            ));
        }
        Ok(())
    }

    /// Encode one value, `None` if it was never seen at fit time
    pub fn encode_one(&self, value: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(value)).ok()
    }

    /// Encode a column. An unseen value is a schema error; its `row` is the
    /// position within `values`.
    pub fn transform(&self, field: &str, values: &[String]) -> Result<Vec<f64>> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                self.encode_one(v).map(|code| code as f64).ok_or_else(|| {
                    ForecastError::schema(
                        i,
                        field,
                        format!("unseen label {:?}, expected one of {:?}", v, self.classes),
                    )
                })
            })
            .collect()
    }

    /// Fit on `values` (sorted unique classes) and encode them
    pub fn fit_transform(field: &str, values: &[String]) -> Result<(Self, Vec<f64>)> {
        let encoder = Self::new(values.iter().cloned());
        let encoded = encoder.transform(field, values)?;
        Ok((encoder, encoded))
    }
}

/// Ordinal code of a store assortment level: a < b < c
pub fn encode_assortment(value: &str) -> Option<f64> {
    match value {
        "a" => Some(1.0),
        "b" => Some(2.0),
        "c" => Some(3.0),
        _ => None,
    }
}
