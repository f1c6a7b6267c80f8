//! Per-store totals of a forecast

use super::engine::PredictionResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Total predicted sales of one store over the forecast horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreForecast {
    pub store: i64,
    pub total: f64,
    /// Number of predicted days
    pub days: usize,
}

impl fmt::Display for StoreForecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The sales forecast for the next 7 weeks for Store No. {} is ${}.",
            self.store,
            thousands(self.total)
        )
    }
}

/// Sum predictions per store, in ascending store order.
/// Results without a readable store id are skipped.
pub fn summarize_by_store(results: &[PredictionResult]) -> Vec<StoreForecast> {
    let mut totals: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for result in results {
        if let Some(store) = result.store() {
            let entry = totals.entry(store).or_insert((0.0, 0));
            entry.0 += result.prediction;
            entry.1 += 1;
        }
    }
    totals
        .into_iter()
        .map(|(store, (total, days))| StoreForecast { store, total, days })
        .collect()
}

/// `1234567.891` -> `1,234,567.89`
fn thousands(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(formatted.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    // no sign on a value that rounds to zero
    let sign = if value < 0.0 && formatted.chars().any(|c| matches!(c, '1'..='9')) {
        "-"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn result(store: Value, prediction: f64) -> PredictionResult {
        let mut fields = Map::new();
        fields.insert("store".into(), store);
        PredictionResult { fields, prediction }
    }

    #[test]
    fn test_thousands_separator() {
        assert_eq!(thousands(0.0), "0.00");
        assert_eq!(thousands(999.999), "1,000.00");
        assert_eq!(thousands(1234567.891), "1,234,567.89");
        assert_eq!(thousands(-4321.5), "-4,321.50");
    }

    #[test]
    fn test_summarize_groups_and_sorts() {
        let results = vec![
            result(json!(22), 100.0),
            result(json!(1), 5000.25),
            result(json!("22"), 50.5),
            result(json!(1), 4999.75),
        ];
        let summary = summarize_by_store(&results);
        assert_eq!(
            summary,
            vec![
                StoreForecast { store: 1, total: 10000.0, days: 2 },
                StoreForecast { store: 22, total: 150.5, days: 2 },
            ]
        );
        assert_eq!(
            summary[0].to_string(),
            "The sales forecast for the next 7 weeks for Store No. 1 is $10,000.00."
        );
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize_by_store(&[]).is_empty());
    }
}
