//! The model's feature vector

use crate::error::{ForecastError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Number of features the model was trained on
pub const FEATURE_COUNT: usize = 20;

/// Feature names in the exact order the model expects
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "store",
    "promo",
    "store_type",
    "assortment",
    "competition_distance",
    "competition_open_since_month",
    "competition_open_since_year",
    "promo2",
    "promo2_since_week",
    "promo2_since_year",
    "competition_months_old",
    "promo2_months_old",
    "month_sin",
    "month_cos",
    "day_sin",
    "day_cos",
    "day_of_week_sin",
    "day_of_week_cos",
    "week_of_year_sin",
    "week_of_year_cos",
];

/// Sine/cosine pair placing `value` on a circle of circumference `period`
#[inline]
pub fn cyclical_encode(value: f64, period: f64) -> (f64, f64) {
    let angle = value * (2.0 * PI / period);
    (angle.sin(), angle.cos())
}

/// One model input row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub store: f64,
    pub promo: f64,
    pub store_type: f64,
    pub assortment: f64,
    pub competition_distance: f64,
    pub competition_open_since_month: f64,
    pub competition_open_since_year: f64,
    pub promo2: f64,
    pub promo2_since_week: f64,
    pub promo2_since_year: f64,
    pub competition_months_old: f64,
    pub promo2_months_old: f64,
    pub month_sin: f64,
    pub month_cos: f64,
    pub day_sin: f64,
    pub day_cos: f64,
    pub day_of_week_sin: f64,
    pub day_of_week_cos: f64,
    pub week_of_year_sin: f64,
    pub week_of_year_cos: f64,
}

impl FeatureVector {
    /// Values in [`FEATURE_NAMES`] order
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.store,
            self.promo,
            self.store_type,
            self.assortment,
            self.competition_distance,
            self.competition_open_since_month,
            self.competition_open_since_year,
            self.promo2,
            self.promo2_since_week,
            self.promo2_since_year,
            self.competition_months_old,
            self.promo2_months_old,
            self.month_sin,
            self.month_cos,
            self.day_sin,
            self.day_cos,
            self.day_of_week_sin,
            self.day_of_week_cos,
            self.week_of_year_sin,
            self.week_of_year_cos,
        ]
    }

    /// Name/value pairs in model order
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> {
        FEATURE_NAMES.into_iter().zip(self.to_array())
    }

    /// The (sin, cos) pairs of every cyclical feature
    pub fn cyclical_pairs(&self) -> [(f64, f64); 4] {
        [
            (self.month_sin, self.month_cos),
            (self.day_sin, self.day_cos),
            (self.day_of_week_sin, self.day_of_week_cos),
            (self.week_of_year_sin, self.week_of_year_cos),
        ]
    }
}

/// Check that `names` is exactly the model's feature contract, in order
pub fn check_feature_order<S: AsRef<str>>(names: &[S]) -> Result<()> {
    if names.len() != FEATURE_COUNT {
        return Err(ForecastError::ShapeError {
            expected: format!("{} features", FEATURE_COUNT),
            actual: format!("{} features", names.len()),
        });
    }

    for (i, (got, want)) in names.iter().zip(FEATURE_NAMES).enumerate() {
        let got = got.as_ref();
        if got != want {
            return Err(ForecastError::ShapeError {
                expected: format!("feature {} to be `{}`", i, want),
                actual: format!("`{}`", got),
            });
        }
    }

    Ok(())
}

/// Stack feature vectors into an `(n, FEATURE_COUNT)` model input matrix
pub fn feature_matrix(vectors: &[FeatureVector]) -> Array2<f64> {
    let mut matrix = Array2::<f64>::zeros((vectors.len(), FEATURE_COUNT));
    for (mut row, vector) in matrix.rows_mut().into_iter().zip(vectors) {
        for (cell, value) in row.iter_mut().zip(vector.to_array()) {
            *cell = value;
        }
    }
    matrix
}
