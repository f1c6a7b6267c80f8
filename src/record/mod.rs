//! Typed records flowing through the pipeline
//!
//! Inbound batches are untyped key/value maps. They are validated once here,
//! at the boundary, into [`RawRecord`]s; later stages only ever see typed
//! records:
//!
//! - [`RawRecord`] - one observation as received, nullable fields intact
//! - [`CleanedRecord`] - every null resolved, numeric fields as integers
//! - [`EngineeredRecord`] - calendar and age features derived, open stores only

pub mod coerce;
mod naming;

pub use naming::normalize_field_name;

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde_json::{Map, Value};

/// One observation as received
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub store: i64,
    pub date: NaiveDate,
    pub open: Option<bool>,
    pub promo: bool,
    pub store_type: String,
    pub assortment: String,
    pub competition_distance: Option<f64>,
    pub competition_open_since_month: Option<i64>,
    pub competition_open_since_year: Option<i64>,
    pub promo2: bool,
    pub promo2_since_week: Option<i64>,
    pub promo2_since_year: Option<i64>,
    pub promo_interval: Option<String>,
    pub id: Option<Value>,
}

/// Reads typed fields out of a canonical-keyed map, attributing failures to a row
struct FieldReader<'a> {
    row: usize,
    fields: &'a Map<String, Value>,
}

impl<'a> FieldReader<'a> {
    fn optional<T>(
        &self,
        name: &str,
        coerce: fn(&Value) -> std::result::Result<Option<T>, String>,
    ) -> Result<Option<T>> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(value) => coerce(value).map_err(|reason| ForecastError::schema(self.row, name, reason)),
        }
    }

    fn required<T>(
        &self,
        name: &str,
        coerce: fn(&Value) -> std::result::Result<Option<T>, String>,
    ) -> Result<T> {
        self.optional(name, coerce)?
            .ok_or_else(|| ForecastError::schema(self.row, name, "required field is missing or null"))
    }
}

impl RawRecord {
    /// Validate a canonical-keyed map into a typed record
    pub fn from_fields(row: usize, fields: &Map<String, Value>) -> Result<Self> {
        let r = FieldReader { row, fields };

        Ok(Self {
            store: r.required("store", coerce::int)?,
            date: r.required("date", coerce::date)?,
            open: r.optional("open", coerce::flag)?,
            promo: r.required("promo", coerce::flag)?,
            store_type: r.required("store_type", coerce::text)?,
            assortment: r.required("assortment", coerce::text)?,
            competition_distance: r.optional("competition_distance", coerce::float)?,
            competition_open_since_month: r.optional("competition_open_since_month", coerce::int)?,
            competition_open_since_year: r.optional("competition_open_since_year", coerce::int)?,
            promo2: r.required("promo2", coerce::flag)?,
            promo2_since_week: r.optional("promo2_since_week", coerce::int)?,
            promo2_since_year: r.optional("promo2_since_year", coerce::int)?,
            promo_interval: r.optional("promo_interval", coerce::text)?,
            id: fields.get("id").filter(|v| !v.is_null()).cloned(),
        })
    }
}

/// An inbound record: its canonical-keyed original fields plus the typed view
#[derive(Debug, Clone, PartialEq)]
pub struct InputRecord {
    pub fields: Map<String, Value>,
    pub raw: RawRecord,
}

/// A validated inbound batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputBatch {
    records: Vec<InputRecord>,
}

impl InputBatch {
    /// Parse the exchange format.
    ///
    /// `null`, `[]` and `{}` give an empty batch. A single object is a batch
    /// of one. Every element of an array must be an object.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) if map.is_empty() => Ok(Self::default()),
            Value::Object(map) => Self::from_maps(std::slice::from_ref(map)),
            Value::Array(items) => {
                let maps = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| match item {
                        Value::Object(map) => Ok(map.clone()),
                        other => Err(ForecastError::InvalidInput(format!(
                            "record {} is not an object: {}",
                            i, other
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Self::from_maps(&maps)
            }
            other => Err(ForecastError::InvalidInput(format!(
                "expected an object or an array of objects, got {}",
                other
            ))),
        }
    }

    /// Parse a JSON document
    pub fn from_json_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_str(s)
            .map_err(|e| ForecastError::InvalidInput(format!("malformed JSON: {}", e)))?;
        Self::from_json(&value)
    }

    /// Build from field maps, normalizing field names
    pub fn from_maps(maps: &[Map<String, Value>]) -> Result<Self> {
        let records = maps
            .iter()
            .enumerate()
            .map(|(row, map)| {
                let fields: Map<String, Value> = map
                    .iter()
                    .map(|(k, v)| (normalize_field_name(k), v.clone()))
                    .collect();
                let raw = RawRecord::from_fields(row, &fields)?;
                Ok(InputRecord { fields, raw })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[InputRecord] {
        &self.records
    }

    /// Typed views of every record, in input order
    pub fn raw_records(&self) -> Vec<RawRecord> {
        self.records.iter().map(|r| r.raw.clone()).collect()
    }
}

/// A record with every null resolved. `row` is its position in the input batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRecord {
    pub row: usize,
    pub store: i64,
    pub date: NaiveDate,
    pub open: Option<bool>,
    pub promo: bool,
    pub store_type: String,
    pub assortment: String,
    pub competition_distance: i64,
    pub competition_open_since_month: i64,
    pub competition_open_since_year: i64,
    pub promo2: bool,
    pub promo2_since_week: i64,
    pub promo2_since_year: i64,
    pub promo_interval: Option<String>,
    pub id: Option<Value>,
}

/// A cleaned record of an open store with derived calendar and age features
#[derive(Debug, Clone, PartialEq)]
pub struct EngineeredRecord {
    pub row: usize,
    pub store: i64,
    pub date: NaiveDate,
    pub promo: bool,
    pub store_type: String,
    pub assortment: String,
    pub competition_distance: i64,
    pub competition_open_since_month: i64,
    pub competition_open_since_year: i64,
    pub promo2: bool,
    pub promo2_since_week: i64,
    pub promo2_since_year: i64,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// 1 = Monday .. 7 = Sunday
    pub day_of_week: u32,
    /// ISO 8601 week number
    pub week_of_year: u32,
    pub competition_months_old: i64,
    pub promo2_months_old: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_one() -> Value {
        json!({
            "Store": 1, "Date": "2015-07-31", "Open": 1, "Promo": 0,
            "StoreType": "a", "Assortment": "c", "CompetitionDistance": 1270.0,
            "CompetitionOpenSinceMonth": 9, "CompetitionOpenSinceYear": 2008,
            "Promo2": 0, "Promo2SinceWeek": null, "Promo2SinceYear": null,
            "PromoInterval": null, "Id": 1, "DayOfWeek": 5
        })
    }

    #[test]
    fn test_single_object_is_batch_of_one() {
        let batch = InputBatch::from_json(&store_one()).unwrap();
        assert_eq!(batch.len(), 1);

        let record = &batch.records()[0];
        assert_eq!(record.raw.store, 1);
        assert_eq!(record.raw.date, NaiveDate::from_ymd_opt(2015, 7, 31).unwrap());
        assert_eq!(record.raw.open, Some(true));
        assert_eq!(record.raw.competition_distance, Some(1270.0));
        assert_eq!(record.raw.promo2_since_week, None);
        assert_eq!(record.raw.id, Some(json!(1)));
        // extra fields survive under canonical names
        assert_eq!(record.fields.get("day_of_week"), Some(&json!(5)));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(InputBatch::from_json(&Value::Null).unwrap().is_empty());
        assert!(InputBatch::from_json(&json!([])).unwrap().is_empty());
        assert!(InputBatch::from_json(&json!({})).unwrap().is_empty());
        assert!(InputBatch::from_json_str("  ").unwrap().is_empty());
    }

    #[test]
    fn test_non_object_rejected() {
        let err = InputBatch::from_json(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
        assert!(InputBatch::from_json(&json!("x")).is_err());
    }

    #[test]
    fn test_missing_required_field() {
        let mut value = store_one();
        value.as_object_mut().unwrap().remove("StoreType");
        let err = InputBatch::from_json(&json!([store_one(), value])).unwrap_err();
        match err {
            ForecastError::Schema { row, field, .. } => {
                assert_eq!(row, 1);
                assert_eq!(field, "store_type");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unparsable_date() {
        let mut value = store_one();
        value["Date"] = json!("not a date");
        let err = InputBatch::from_json(&value).unwrap_err();
        assert!(err.is_schema_error());
    }
}
