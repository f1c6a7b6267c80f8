//! Feature preparation stage: rescaling, encoding and feature selection

use super::bank::{ScalerBank, TransformId};
use super::encoder::encode_assortment;
use super::features::{cyclical_encode, FeatureVector};
use super::RescaleMode;
use crate::error::{ForecastError, Result};
use crate::record::EngineeredRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Every prepared column, before feature selection.
///
/// `year` is rescaled but is not one of the model's features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreparedRecord {
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
    pub year: f64,
    pub month: f64,
    pub day: f64,
    pub day_of_week: f64,
    pub week_of_year: f64,
    pub competition_months_old: f64,
    pub promo2_months_old: f64,
}

impl PreparedRecord {
    /// Cyclical encodings plus the selected columns, in model order
    pub fn select(&self) -> FeatureVector {
        let (month_sin, month_cos) = cyclical_encode(self.month, 12.0);
        // 30 approximates the month length; it is what the model was trained on
        let (day_sin, day_cos) = cyclical_encode(self.day, 30.0);
        let (day_of_week_sin, day_of_week_cos) = cyclical_encode(self.day_of_week, 7.0);
        let (week_of_year_sin, week_of_year_cos) = cyclical_encode(self.week_of_year, 52.0);

        FeatureVector {
            store: self.store,
            promo: self.promo,
            store_type: self.store_type,
            assortment: self.assortment,
            competition_distance: self.competition_distance,
            competition_open_since_month: self.competition_open_since_month,
            competition_open_since_year: self.competition_open_since_year,
            promo2: self.promo2,
            promo2_since_week: self.promo2_since_week,
            promo2_since_year: self.promo2_since_year,
            competition_months_old: self.competition_months_old,
            promo2_months_old: self.promo2_months_old,
            month_sin,
            month_cos,
            day_sin,
            day_cos,
            day_of_week_sin,
            day_of_week_cos,
            week_of_year_sin,
            week_of_year_cos,
        }
    }
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Turns engineered records into model-ready feature vectors
#[derive(Debug, Clone, Copy)]
pub struct FeaturePreparer<'a> {
    bank: &'a ScalerBank,
    mode: RescaleMode,
}

impl<'a> FeaturePreparer<'a> {
    pub fn new(bank: &'a ScalerBank, mode: RescaleMode) -> Self {
        Self { bank, mode }
    }

    /// Prepare and select the model's features, one vector per record, same order
    pub fn prepare(&self, records: &[EngineeredRecord]) -> Result<Vec<FeatureVector>> {
        Ok(self
            .prepare_records(records)?
            .iter()
            .map(PreparedRecord::select)
            .collect())
    }

    /// Rescale and encode every column without selecting
    pub fn prepare_records(&self, records: &[EngineeredRecord]) -> Result<Vec<PreparedRecord>> {
        if records.is_empty() {
            return Err(ForecastError::EmptyResult);
        }

        // validate categoricals before touching any numeric column
        let assortment = records
            .iter()
            .map(|r| {
                encode_assortment(&r.assortment).ok_or_else(|| {
                    ForecastError::schema(
                        r.row,
                        "assortment",
                        format!("{:?} is not one of a, b, c", r.assortment),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let store_types: Vec<String> = records.iter().map(|r| r.store_type.clone()).collect();
        let store_type = self
            .bank
            .encode(&store_types, self.mode)
            .map_err(|e| attribute_row(e, records))?;

        let column = |f: fn(&EngineeredRecord) -> f64| records.iter().map(f).collect::<Vec<f64>>();

        let competition_distance = self.bank.apply(
            TransformId::CompetitionDistance,
            &column(|r| r.competition_distance as f64),
            self.mode,
        )?;
        let competition_months_old = self.bank.apply(
            TransformId::CompetitionMonthsOld,
            &column(|r| r.competition_months_old as f64),
            self.mode,
        )?;
        let promo2_months_old = self.bank.apply(
            TransformId::Promo2MonthsOld,
            &column(|r| r.promo2_months_old as f64),
            self.mode,
        )?;
        let year = self
            .bank
            .apply(TransformId::Year, &column(|r| r.year as f64), self.mode)?;

        debug!(records = records.len(), mode = ?self.mode, "Prepared feature columns");

        Ok(records
            .iter()
            .enumerate()
            .map(|(i, r)| PreparedRecord {
                store: r.store as f64,
                promo: flag(r.promo),
                store_type: store_type[i],
                assortment: assortment[i],
                competition_distance: competition_distance[i],
                competition_open_since_month: r.competition_open_since_month as f64,
                competition_open_since_year: r.competition_open_since_year as f64,
                promo2: flag(r.promo2),
                promo2_since_week: r.promo2_since_week as f64,
                promo2_since_year: r.promo2_since_year as f64,
                year: year[i],
                month: r.month as f64,
                day: r.day as f64,
                day_of_week: r.day_of_week as f64,
                week_of_year: r.week_of_year as f64,
                competition_months_old: competition_months_old[i],
                promo2_months_old: promo2_months_old[i],
            })
            .collect())
    }
}

/// Map a column-position schema error back to the record's input row
fn attribute_row(err: ForecastError, records: &[EngineeredRecord]) -> ForecastError {
    match err {
        ForecastError::Schema { row, field, reason } => ForecastError::Schema {
            row: records.get(row).map_or(row, |r| r.row),
            field,
            reason,
        },
        other => other,
    }
}
