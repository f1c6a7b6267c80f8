//! Feature rescaling with persisted parameters

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Type of rescaler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerType {
    /// Robust scaling using median and IQR: (x - median) / IQR
    Robust,
    /// Min-Max scaling into a bounded feature range: x * scale + min
    MinMax,
}

fn unit_range() -> (f64, f64) {
    (0.0, 1.0)
}

/// A fitted rescaler.
///
/// Parameters use scikit-learn's naming: a robust scaler stores `center` and
/// `scale`; a min-max scaler stores the precomputed `scale` and `min`
/// (`scale = (hi - lo) / (data_max - data_min)`, `min = lo - data_min * scale`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rescaler {
    Robust {
        center: f64,
        scale: f64,
    },
    MinMax {
        scale: f64,
        min: f64,
        #[serde(default = "unit_range")]
        feature_range: (f64, f64),
    },
}

/// Spreads below this are treated as constant features and scaled by 1
const ZERO_SCALE_TOLERANCE: f64 = 10.0 * f64::EPSILON;

fn handle_zero_scale(scale: f64) -> f64 {
    if scale < ZERO_SCALE_TOLERANCE {
        1.0
    } else {
        scale
    }
}

impl Rescaler {
    /// The rescaler's type
    pub fn scaler_type(&self) -> ScalerType {
        match self {
            Rescaler::Robust { .. } => ScalerType::Robust,
            Rescaler::MinMax { .. } => ScalerType::MinMax,
        }
    }

    /// Reject parameters that cannot produce finite output
    pub fn validate(&self) -> Result<()> {
        let ok = match *self {
            Rescaler::Robust { center, scale } => center.is_finite() && scale.is_finite() && scale != 0.0,
            Rescaler::MinMax { scale, min, feature_range } => {
                scale.is_finite() && min.is_finite() && feature_range.0 < feature_range.1
            }
        };
        if ok {
            Ok(())
        } else {
            Err(ForecastError::ConfigError(format!("invalid rescaler parameters: {:?}", self)))
        }
    }

    /// Rescale one value
    #[inline]
    pub fn transform_one(&self, x: f64) -> f64 {
        match *self {
            Rescaler::Robust { center, scale } => (x - center) / scale,
            Rescaler::MinMax { scale, min, .. } => x * scale + min,
        }
    }

    /// Rescale a column
    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&x| self.transform_one(x)).collect()
    }

    /// Derive parameters of the same type (and feature range) from `values`
    pub fn refit(&self, values: &[f64]) -> Result<Self> {
        match *self {
            Rescaler::Robust { .. } => Self::fit_robust(values),
            Rescaler::MinMax { feature_range, .. } => Self::fit_min_max(values, feature_range),
        }
    }

    /// Median / interquartile-range parameters
    pub fn fit_robust(values: &[f64]) -> Result<Self> {
        let sorted = sorted_finite(values)?;
        let center = median(&sorted);
        let iqr = percentile(&sorted, 75.0) - percentile(&sorted, 25.0);
        Ok(Rescaler::Robust {
            center,
            scale: handle_zero_scale(iqr),
        })
    }

    /// Min-max parameters mapping the observed range onto `feature_range`
    pub fn fit_min_max(values: &[f64], feature_range: (f64, f64)) -> Result<Self> {
        let sorted = sorted_finite(values)?;
        let data_min = sorted[0];
        let data_max = sorted[sorted.len() - 1];
        let scale = (feature_range.1 - feature_range.0) / handle_zero_scale(data_max - data_min);
        Ok(Rescaler::MinMax {
            scale,
            min: feature_range.0 - data_min * scale,
            feature_range,
        })
    }
}

fn sorted_finite(values: &[f64]) -> Result<Vec<f64>> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return Err(ForecastError::DataError("cannot fit a rescaler on an empty column".into()));
    }
    sorted.sort_by(f64::total_cmp);
    Ok(sorted)
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Linearly interpolated percentile of a sorted column (numpy's default method)
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let index = (sorted.len() - 1) as f64 * (q / 100.0);
    let lo = index.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let t = index - lo as f64;

    let (a, b) = (sorted[lo], sorted[hi]);
    let diff = b - a;
    if t >= 0.5 {
        b - diff * (1.0 - t)
    } else {
        a + diff * t
    }
}
