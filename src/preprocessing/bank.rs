//! The bank of fitted transforms the model was trained with

use super::encoder::LabelEncoder;
use super::scaler::Rescaler;
use super::RescaleMode;
use crate::error::{ForecastError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Identifies one of the five persisted transforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformId {
    CompetitionDistance,
    CompetitionMonthsOld,
    Promo2MonthsOld,
    Year,
    StoreType,
}

impl TransformId {
    pub const ALL: [TransformId; 5] = [
        TransformId::CompetitionDistance,
        TransformId::CompetitionMonthsOld,
        TransformId::Promo2MonthsOld,
        TransformId::Year,
        TransformId::StoreType,
    ];

    /// Artifact file name inside the artifact directory
    pub fn artifact_name(&self) -> &'static str {
        match self {
            TransformId::CompetitionDistance => "competition_distance_scaler.json",
            TransformId::CompetitionMonthsOld => "competition_months_old_scaler.json",
            TransformId::Promo2MonthsOld => "promo2_months_old_scaler.json",
            TransformId::Year => "year_scaler.json",
            TransformId::StoreType => "store_type_scaler.json",
        }
    }

    /// Field the transform is applied to
    pub fn field(&self) -> &'static str {
        match self {
            TransformId::CompetitionDistance => "competition_distance",
            TransformId::CompetitionMonthsOld => "competition_months_old",
            TransformId::Promo2MonthsOld => "promo2_months_old",
            TransformId::Year => "year",
            TransformId::StoreType => "store_type",
        }
    }
}

/// Read-only bank of the four rescalers and the store-type encoder.
///
/// Loaded once and shared across pipeline invocations; nothing mutates it
/// after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalerBank {
    competition_distance: Rescaler,
    competition_months_old: Rescaler,
    promo2_months_old: Rescaler,
    year: Rescaler,
    store_type: LabelEncoder,
}

impl ScalerBank {
    /// Assemble a bank from already-fitted transforms
    pub fn new(
        competition_distance: Rescaler,
        competition_months_old: Rescaler,
        promo2_months_old: Rescaler,
        year: Rescaler,
        store_type: LabelEncoder,
    ) -> Self {
        Self {
            competition_distance,
            competition_months_old,
            promo2_months_old,
            year,
            store_type,
        }
    }

    /// Load all five artifacts from `dir`. Any missing or corrupt artifact fails the load.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        let bank = Self {
            competition_distance: load_rescaler(dir, TransformId::CompetitionDistance)?,
            competition_months_old: load_rescaler(dir, TransformId::CompetitionMonthsOld)?,
            promo2_months_old: load_rescaler(dir, TransformId::Promo2MonthsOld)?,
            year: load_rescaler(dir, TransformId::Year)?,
            store_type: {
                let path = dir.join(TransformId::StoreType.artifact_name());
                let encoder: LabelEncoder = read_artifact(&path)?;
                encoder.validate().map_err(|e| ForecastError::artifact(&path, e))?;
                encoder
            },
        };

        info!(
            dir = %dir.display(),
            competition_distance = ?bank.competition_distance.scaler_type(),
            competition_months_old = ?bank.competition_months_old.scaler_type(),
            promo2_months_old = ?bank.promo2_months_old.scaler_type(),
            year = ?bank.year.scaler_type(),
            store_types = bank.store_type.classes().len(),
            "Loaded scaler bank"
        );

        Ok(bank)
    }

    /// Write all five artifacts to `dir`
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        for id in TransformId::ALL {
            let path = dir.join(id.artifact_name());
            match id {
                TransformId::StoreType => write_artifact(&path, &self.store_type)?,
                _ => write_artifact(&path, self.rescaler(id)?)?,
            }
        }
        Ok(())
    }

    /// The rescaler behind a numeric transform
    pub fn rescaler(&self, id: TransformId) -> Result<&Rescaler> {
        match id {
            TransformId::CompetitionDistance => Ok(&self.competition_distance),
            TransformId::CompetitionMonthsOld => Ok(&self.competition_months_old),
            TransformId::Promo2MonthsOld => Ok(&self.promo2_months_old),
            TransformId::Year => Ok(&self.year),
            TransformId::StoreType => Err(ForecastError::ConfigError(
                "store_type is a categorical encoder, not a rescaler".into(),
            )),
        }
    }

    pub fn store_type_encoder(&self) -> &LabelEncoder {
        &self.store_type
    }

    /// Rescale a numeric column.
    ///
    /// In [`RescaleMode::Refit`] the parameters are re-derived from `values`
    /// before transforming, so results depend on the batch.
    pub fn apply(&self, id: TransformId, values: &[f64], mode: RescaleMode) -> Result<Vec<f64>> {
        let rescaler = self.rescaler(id)?;
        match mode {
            RescaleMode::Frozen => Ok(rescaler.transform(values)),
            RescaleMode::Refit => Ok(rescaler.refit(values)?.transform(values)),
        }
    }

    /// Encode the store-type column. Errors carry the position within `values`.
    pub fn encode(&self, values: &[String], mode: RescaleMode) -> Result<Vec<f64>> {
        let field = TransformId::StoreType.field();
        match mode {
            RescaleMode::Frozen => self.store_type.transform(field, values),
            RescaleMode::Refit => LabelEncoder::fit_transform(field, values).map(|(_, encoded)| encoded),
        }
    }
}

fn load_rescaler(dir: &Path, id: TransformId) -> Result<Rescaler> {
    let path = dir.join(id.artifact_name());
    let rescaler: Rescaler = read_artifact(&path)?;
    rescaler.validate().map_err(|e| ForecastError::artifact(&path, e))?;
    Ok(rescaler)
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path).map_err(|e| ForecastError::artifact(path, e))?;
    serde_json::from_str(&json).map_err(|e| ForecastError::artifact(path, e))
}

fn write_artifact<T: Serialize>(path: &Path, artifact: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(artifact)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bank() -> ScalerBank {
        ScalerBank::new(
            Rescaler::Robust { center: 2330.0, scale: 6250.0 },
            Rescaler::Robust { center: 4.0, scale: 32.0 },
            Rescaler::MinMax { scale: 1.0 / 75.0, min: 0.0, feature_range: (0.0, 1.0) },
            Rescaler::MinMax { scale: 0.5, min: -1006.5, feature_range: (0.0, 1.0) },
            LabelEncoder::new(["a", "b", "c", "d"]),
        )
    }

    fn temp_dir(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("store_sales_bank_{}_{}", name, std::process::id()))
    }

    #[test]
    fn test_save_and_load() {
        let dir = temp_dir("roundtrip");
        let bank = sample_bank();
        bank.save(&dir).unwrap();
        let loaded = ScalerBank::load(&dir).unwrap();
        assert_eq!(loaded, bank);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_artifact_fails_load() {
        let dir = temp_dir("missing");
        sample_bank().save(&dir).unwrap();
        std::fs::remove_file(dir.join(TransformId::Year.artifact_name())).unwrap();

        let err = ScalerBank::load(&dir).unwrap_err();
        match err {
            ForecastError::ArtifactLoad { path, .. } => assert!(path.ends_with("year_scaler.json")),
            other => panic!("unexpected error: {other}"),
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_corrupt_artifact_fails_load() {
        let dir = temp_dir("corrupt");
        sample_bank().save(&dir).unwrap();
        std::fs::write(dir.join(TransformId::StoreType.artifact_name()), "{not json").unwrap();
        assert!(matches!(ScalerBank::load(&dir), Err(ForecastError::ArtifactLoad { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_apply_frozen_vs_refit() {
        let bank = sample_bank();
        let frozen = bank.apply(TransformId::Year, &[2015.0], RescaleMode::Frozen).unwrap();
        assert!((frozen[0] - 1.0).abs() < 1e-12);

        // a single-value batch collapses to the lower bound when refit
        let refit = bank.apply(TransformId::Year, &[2015.0], RescaleMode::Refit).unwrap();
        assert_eq!(refit, vec![0.0]);

        assert!(bank.apply(TransformId::StoreType, &[1.0], RescaleMode::Frozen).is_err());
    }

    #[test]
    fn test_encode_modes() {
        let bank = sample_bank();
        let values = vec!["c".to_string()];
        assert_eq!(bank.encode(&values, RescaleMode::Frozen).unwrap(), vec![2.0]);
        assert_eq!(bank.encode(&values, RescaleMode::Refit).unwrap(), vec![0.0]);
    }
}
