//! Record cleaning: missing-value imputation and integer normalization
//!
//! Every fill is a fixed policy rather than a statistical estimate:
//! - `competition_distance`: twice the largest distance seen in the batch
//!   (an absent competitor is farther away than any known one)
//! - `competition_open_since_{year,month}`: year and month of the latest
//!   date in the batch (the competitor just opened)
//! - `promo2_since_{week,year}`: the ISO week and ISO year of the record's own
//!   date (promo2 starts "now", so its age comes out as zero). A filled week
//!   paired with a caller's year is capped at that year's last ISO week.
//!
//! The distance and competition fills depend on the whole batch, so the same
//! record can be cleaned differently depending on its neighbours.

use crate::error::{ForecastError, Result};
use crate::feature_engineering::calendar::iso_weeks_in_year;
use crate::record::{CleanedRecord, RawRecord};
use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

/// Fill values derived from one batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchFill {
    /// Imputed competition distance, `None` if the batch has no distance to derive it from
    pub competition_distance: Option<f64>,
    pub competition_open_since_year: i64,
    pub competition_open_since_month: i64,
}

impl BatchFill {
    /// Derive fill values from a non-empty batch
    pub fn fit(records: &[RawRecord], distance_fallback: Option<f64>) -> Result<Self> {
        let latest: NaiveDate = records
            .iter()
            .map(|r| r.date)
            .max()
            .ok_or(ForecastError::EmptyResult)?;

        let max_distance = records
            .iter()
            .filter_map(|r| r.competition_distance)
            .filter(|d| !d.is_nan())
            .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |m| m.max(d))));

        let competition_distance = match max_distance {
            Some(max) => Some(max * 2.0),
            None => distance_fallback,
        };

        Ok(Self {
            competition_distance,
            competition_open_since_year: latest.year() as i64,
            competition_open_since_month: latest.month() as i64,
        })
    }
}

/// The cleaning stage
#[derive(Debug, Clone, Default)]
pub struct DataCleaner {
    distance_fallback: Option<f64>,
}

impl DataCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distance to impute when no record in the batch reports one
    pub fn with_distance_fallback(mut self, fallback: Option<f64>) -> Self {
        self.distance_fallback = fallback;
        self
    }

    /// Resolve every null and cast the imputed fields to integers.
    ///
    /// An empty batch yields [`ForecastError::EmptyResult`].
    pub fn clean(&self, records: &[RawRecord]) -> Result<Vec<CleanedRecord>> {
        if records.is_empty() {
            return Err(ForecastError::EmptyResult);
        }

        let fill = BatchFill::fit(records, self.distance_fallback)?;
        debug!(
            competition_distance = ?fill.competition_distance,
            competition_open_since_year = fill.competition_open_since_year,
            competition_open_since_month = fill.competition_open_since_month,
            "Derived batch fill values"
        );

        if records.iter().all(|r| r.competition_distance.is_none()) {
            if let Some(fallback) = fill.competition_distance {
                warn!(fallback, "No competition distance in batch, using configured fallback");
            }
        }

        records
            .iter()
            .enumerate()
            .map(|(row, raw)| Self::clean_one(row, raw, &fill))
            .collect()
    }

    fn clean_one(row: usize, raw: &RawRecord, fill: &BatchFill) -> Result<CleanedRecord> {
        let distance = match raw.competition_distance.filter(|d| !d.is_nan()) {
            Some(d) => d,
            None => fill.competition_distance.ok_or_else(|| {
                ForecastError::schema(
                    row,
                    "competition_distance",
                    "null, and no distance in the batch to impute from",
                )
            })?,
        };

        let (promo2_since_week, promo2_since_year) = promo2_since(raw);

        Ok(CleanedRecord {
            row,
            store: raw.store,
            date: raw.date,
            open: raw.open,
            promo: raw.promo,
            store_type: raw.store_type.clone(),
            assortment: raw.assortment.clone(),
            // float -> int truncates toward zero
            competition_distance: distance as i64,
            competition_open_since_month: raw
                .competition_open_since_month
                .unwrap_or(fill.competition_open_since_month),
            competition_open_since_year: raw
                .competition_open_since_year
                .unwrap_or(fill.competition_open_since_year),
            promo2: raw.promo2,
            promo2_since_week,
            promo2_since_year,
            promo_interval: raw.promo_interval.clone(),
            id: raw.id.clone(),
        })
    }
}

/// Promo2 start as `(week, year)`, filling nulls from the record's own ISO week
fn promo2_since(raw: &RawRecord) -> (i64, i64) {
    let own = raw.date.iso_week();
    let (own_week, own_year) = (own.week() as i64, own.year() as i64);
    match (raw.promo2_since_week, raw.promo2_since_year) {
        (Some(week), Some(year)) => (week, year),
        (Some(week), None) => (week, own_year),
        (None, Some(year)) => (own_week.min(iso_weeks_in_year(year)), year),
        (None, None) => (own_week, own_year),
    }
}
