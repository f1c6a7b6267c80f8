//! Reference data loading
//!
//! Reads the daily schedule (`test.csv`) and the store master data
//! (`store.csv`), left-joins them on `Store` and serves the open days of one
//! store in the pipeline's input exchange format.

use crate::error::{ForecastError, Result};
use crate::record::coerce;
use polars::prelude::*;
use serde_json::{Map, Value};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Column both files are joined on
pub const STORE_COLUMN: &str = "Store";
/// Column flagging whether the store trades that day
pub const OPEN_COLUMN: &str = "Open";

/// Source of input records for a single store
pub trait RecordSource {
    /// Open-day records of `store` as a JSON array of objects.
    ///
    /// Fails with [`ForecastError::StoreNotAvailable`] when the store has no
    /// rows at all.
    fn records_for_store(&self, store: i64) -> Result<Value>;
}

/// Load a CSV file with a header row
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| ForecastError::DataError(format!("{}: {}", path.display(), e)))?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(10_000))
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| ForecastError::DataError(format!("{}: {}", path.display(), e)))?;

    debug!(path = %path.display(), rows = df.height(), cols = df.width(), "Loaded CSV");
    Ok(df)
}

/// Convert one cell to JSON. NaN becomes null.
fn any_value_to_json(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(v) => Value::Bool(v),
        AnyValue::Int8(v) => Value::from(v),
        AnyValue::Int16(v) => Value::from(v),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::UInt8(v) => Value::from(v),
        AnyValue::UInt16(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        AnyValue::Float32(v) => serde_json::Number::from_f64(v as f64).map_or(Value::Null, Value::Number),
        AnyValue::Float64(v) => serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number),
        AnyValue::String(v) => Value::String(v.to_string()),
        AnyValue::StringOwned(v) => Value::String(v.to_string()),
        other => Value::String(other.to_string()),
    }
}

/// Rows of a frame as JSON objects keyed by column name
pub fn frame_to_rows(df: &DataFrame) -> Result<Vec<Map<String, Value>>> {
    let columns = df.get_columns();
    let mut rows = vec![Map::new(); df.height()];
    for column in columns {
        let name = column.name().to_string();
        for (i, row) in rows.iter_mut().enumerate() {
            let value = column.get(i)?;
            row.insert(name.clone(), any_value_to_json(value));
        }
    }
    Ok(rows)
}

/// Cast the join key to `Int64` so both sides agree on its dtype
fn with_int_key(df: &DataFrame) -> Result<DataFrame> {
    let key = df.column(STORE_COLUMN)?.cast(&DataType::Int64)?;
    let mut df = df.clone();
    df.with_column(key)?;
    Ok(df)
}

fn store_of(row: &Map<String, Value>) -> Option<i64> {
    row.get(STORE_COLUMN).and_then(|v| coerce::int(v).ok().flatten())
}

/// Daily rows joined with their store's master data
#[derive(Debug, Clone, Default)]
pub struct StoreDataset {
    rows: Vec<Map<String, Value>>,
}

impl StoreDataset {
    /// Read and join `test_csv` (daily rows) with `store_csv` (one row per store)
    pub fn from_csv(test_csv: impl AsRef<Path>, store_csv: impl AsRef<Path>) -> Result<Self> {
        let daily = load_csv(test_csv)?;
        let stores = load_csv(store_csv)?;
        Self::from_frames(&daily, &stores)
    }

    /// Left-join `daily` with `stores` on `Store`.
    ///
    /// Days of a store missing from `stores` get nulls for every store column.
    pub fn from_frames(daily: &DataFrame, stores: &DataFrame) -> Result<Self> {
        for (df, what) in [(daily, "daily data"), (stores, "store data")] {
            if df.column(STORE_COLUMN).is_err() {
                return Err(ForecastError::DataError(format!(
                    "{} has no `{}` column",
                    what, STORE_COLUMN
                )));
            }
        }

        let daily = with_int_key(daily)?;
        let stores = with_int_key(stores)?;
        let joined = daily.left_join(&stores, [STORE_COLUMN], [STORE_COLUMN])?;
        let rows = frame_to_rows(&joined)?;

        info!(rows = rows.len(), stores = stores.height(), "Joined store reference data");
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct store ids, ascending
    pub fn stores(&self) -> Vec<i64> {
        let mut stores: Vec<i64> = self.rows.iter().filter_map(store_of).collect();
        stores.sort_unstable();
        stores.dedup();
        stores
    }
}

impl RecordSource for StoreDataset {
    fn records_for_store(&self, store: i64) -> Result<Value> {
        let rows: Vec<&Map<String, Value>> =
            self.rows.iter().filter(|r| store_of(r) == Some(store)).collect();
        if rows.is_empty() {
            return Err(ForecastError::StoreNotAvailable(store));
        }

        let open: Vec<Value> = rows
            .into_iter()
            .filter(|r| {
                r.get(OPEN_COLUMN)
                    .and_then(|v| coerce::float(v).ok().flatten())
                    .is_some_and(|v| v != 0.0)
            })
            .map(|r| Value::Object(r.clone()))
            .collect();

        debug!(store, open_days = open.len(), "Selected store records");
        Ok(Value::Array(open))
    }
}
