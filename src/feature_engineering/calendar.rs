//! Calendar arithmetic for age features

use chrono::{NaiveDate, Weekday};

/// Whole 30-day "months" from `since` to `date`, truncated toward zero and
/// clamped at zero when `since` lies in the future.
pub fn months_between(since: NaiveDate, date: NaiveDate) -> i64 {
    let days = (date - since).num_days();
    (days / 30).max(0)
}

/// First day of a month, `None` for an invalid month/year
pub fn month_start(year: i64, month: i64) -> Option<NaiveDate> {
    let year = i32::try_from(year).ok()?;
    let month = u32::try_from(month).ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Monday of an ISO week, `None` if the week does not exist in that ISO year
pub fn iso_week_monday(year: i64, week: i64) -> Option<NaiveDate> {
    let year = i32::try_from(year).ok()?;
    let week = u32::try_from(week).ok()?;
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
}

/// Number of ISO weeks (52 or 53) in an ISO year
pub fn iso_weeks_in_year(year: i64) -> i64 {
    if iso_week_monday(year, 53).is_some() {
        53
    } else {
        52
    }
}
