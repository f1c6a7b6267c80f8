//! Feature engineering stage
//!
//! Derives calendar fields and competition/promo2 ages from cleaned records,
//! then keeps only records of stores that were open. `id`, `open` and
//! `promo_interval` do not survive this stage.

pub mod calendar;

use crate::error::{ForecastError, Result};
use crate::record::{CleanedRecord, EngineeredRecord};
use calendar::{iso_week_monday, month_start, months_between};
use chrono::Datelike;
use tracing::debug;

/// Drop closed-store records and derive features for the rest.
///
/// Records with `open` false or unknown are discarded before any feature is
/// derived, so they can never fail the batch. If no record is open the stage
/// returns [`ForecastError::EmptyResult`].
pub fn engineer(records: Vec<CleanedRecord>) -> Result<Vec<EngineeredRecord>> {
    let total = records.len();

    let kept = records
        .into_iter()
        .filter(|record| record.open == Some(true))
        .map(derive)
        .collect::<Result<Vec<_>>>()?;

    debug!(total, kept = kept.len(), "Filtered closed-store records");

    if kept.is_empty() {
        return Err(ForecastError::EmptyResult);
    }
    Ok(kept)
}

/// Derive calendar and age features for one record
pub fn derive(record: CleanedRecord) -> Result<EngineeredRecord> {
    let date = record.date;

    let competition_since = month_start(
        record.competition_open_since_year,
        record.competition_open_since_month,
    )
    .ok_or_else(|| {
        ForecastError::schema(
            record.row,
            "competition_open_since_month",
            format!(
                "{}-{} is not a valid month",
                record.competition_open_since_year, record.competition_open_since_month
            ),
        )
    })?;
    let competition_months_old = months_between(competition_since, date);

    let promo2_months_old = if record.promo2 {
        let since = iso_week_monday(record.promo2_since_year, record.promo2_since_week).ok_or_else(|| {
            ForecastError::schema(
                record.row,
                "promo2_since_week",
                format!(
                    "week {} does not exist in ISO year {}",
                    record.promo2_since_week, record.promo2_since_year
                ),
            )
        })?;
        months_between(since, date)
    } else {
        0
    };

    Ok(EngineeredRecord {
        row: record.row,
        store: record.store,
        date,
        promo: record.promo,
        store_type: record.store_type,
        assortment: record.assortment,
        competition_distance: record.competition_distance,
        competition_open_since_month: record.competition_open_since_month,
        competition_open_since_year: record.competition_open_since_year,
        promo2: record.promo2,
        promo2_since_week: record.promo2_since_week,
        promo2_since_year: record.promo2_since_year,
        year: date.year(),
        month: date.month(),
        day: date.day(),
        day_of_week: date.weekday().number_from_monday(),
        week_of_year: date.iso_week().week(),
        competition_months_old,
        promo2_months_old,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn cleaned(row: usize, date: (i32, u32, u32), open: Option<bool>) -> CleanedRecord {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        CleanedRecord {
            row,
            store: 1,
            date,
            open,
            promo: true,
            store_type: "a".into(),
            assortment: "c".into(),
            competition_distance: 1270,
            competition_open_since_month: 9,
            competition_open_since_year: 2008,
            promo2: false,
            promo2_since_week: date.iso_week().week() as i64,
            promo2_since_year: date.year() as i64,
            promo_interval: None,
            id: None,
        }
    }

    #[test]
    fn test_calendar_fields() {
        let record = derive(cleaned(0, (2015, 7, 31), Some(true))).unwrap();
        assert_eq!((record.year, record.month, record.day), (2015, 7, 31));
        assert_eq!(record.day_of_week, 5);
        assert_eq!(record.week_of_year, 31);
        assert_eq!(record.competition_months_old, 84);
        assert_eq!(record.promo2_months_old, 0);
    }

    #[test]
    fn test_iso_week_at_year_boundary() {
        assert_eq!(derive(cleaned(0, (2015, 1, 1), Some(true))).unwrap().week_of_year, 1);
        assert_eq!(derive(cleaned(0, (2014, 12, 29), Some(true))).unwrap().week_of_year, 1);
        assert_eq!(derive(cleaned(0, (2016, 1, 1), Some(true))).unwrap().week_of_year, 53);
    }

    #[test]
    fn test_promo2_age() {
        let mut record = cleaned(0, (2015, 7, 31), Some(true));
        record.promo2 = true;
        record.promo2_since_week = 31;
        record.promo2_since_year = 2013;
        // 2013-07-29 .. 2015-07-31 is 732 days
        assert_eq!(derive(record).unwrap().promo2_months_old, 24);
    }

    #[test]
    fn test_promo2_in_future_clamps() {
        let mut record = cleaned(0, (2015, 7, 31), Some(true));
        record.promo2 = true;
        record.promo2_since_week = 40;
        record.promo2_since_year = 2015;
        assert_eq!(derive(record).unwrap().promo2_months_old, 0);
    }

    #[test]
    fn test_invalid_promo2_week() {
        let mut record = cleaned(4, (2015, 7, 31), Some(true));
        record.promo2 = true;
        record.promo2_since_week = 53;
        record.promo2_since_year = 2014;
        let err = derive(record).unwrap_err();
        assert!(matches!(err, ForecastError::Schema { row: 4, .. }));
    }

    #[test]
    fn test_closed_and_unknown_filtered() {
        let batch = vec![
            cleaned(0, (2015, 7, 31), Some(false)),
            cleaned(1, (2015, 7, 31), Some(true)),
            cleaned(2, (2015, 7, 31), None),
        ];
        let kept = engineer(batch).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].row, 1);
    }

    #[test]
    fn test_closed_record_with_impossible_promo2_is_dropped() {
        let mut closed = cleaned(0, (2015, 7, 31), Some(false));
        closed.promo2 = true;
        closed.promo2_since_week = 53;
        closed.promo2_since_year = 2014;
        assert!(engineer(vec![closed.clone()]).unwrap_err().is_empty_result());

        let kept = engineer(vec![closed, cleaned(1, (2015, 7, 31), Some(true))]).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].row, 1);
    }

    #[test]
    fn test_all_closed_is_empty_result() {
        let batch = vec![cleaned(0, (2015, 7, 31), Some(false))];
        assert!(engineer(batch).unwrap_err().is_empty_result());
    }
}
