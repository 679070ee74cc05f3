// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the FeatureSpec       (Layer 3 - domain)
//   Step 2: Load the CSV dataset           (Layer 4 - data)
//   Step 3: Normalise headers, derive dates (Layer 4 - data)
//   Step 4: Type cells, drop incomplete rows (Layer 4 - data)
//   Step 5: Fit encoders + regressors      (Layer 5 - ml)
//   Step 6: Publish every bundle           (Layer 6 - infra)
//
// Every bundle is fitted before the first one is published,
// so a run that fails half-way publishes nothing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{loader::CsvLoader, preprocessor::Preprocessor};
use crate::domain::feature_spec::FeatureSpec;
use crate::domain::traits::TabularSource;
use crate::infra::artifact_store::ArtifactStore;
use crate::ml::regressor::RegressorKind;
use crate::ml::trainer::fit_bundles;

/// Where categorical encoders are fitted when the data is segmented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EncoderScope {
    /// One vocabulary per segment, fitted on that segment's rows only
    #[default]
    Segment,
    /// One vocabulary shared by all segments
    Global,
}

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a training run needs. Serialisable so it can be
// stored next to each bundle as a record of how it was built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_path:     String,
    pub artifacts_dir: String,
    pub spec:          FeatureSpec,
    pub regressor:     RegressorKind,
    pub test_fraction: f64,
    pub seed:          u64,
    pub min_rows:      usize,
    /// Bundle id used when there is no segment key
    pub bundle_id:     String,
    pub encoder_scope: EncoderScope,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:     "data/raw_material_prices.csv".to_string(),
            artifacts_dir: "artifacts".to_string(),
            spec: FeatureSpec::new(
                &["Date_day_of_year", "Weather", "Demand"],
                &["Weather", "Demand"],
                "Price",
            )
            .with_date_column("Date"),
            regressor:     RegressorKind::Linear,
            test_fraction: 0.2,
            seed:          42,
            min_rows:      2,
            bundle_id:     "default".to_string(),
            encoder_scope: EncoderScope::Segment,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline and return the ids of the published bundles.
    pub fn execute(&self) -> Result<Vec<String>> {
        let cfg = &self.config;

        // ── Step 1: Validate features ─────────────────────────────────────────
        cfg.spec.validate()?;

        // ── Step 2: Load the dataset ──────────────────────────────────────────
        let table = CsvLoader::new(&cfg.data_path).load()?;
        self.execute_on(table)
    }

    /// Steps 3–6 on an already loaded table.
    pub fn execute_on(&self, table: crate::data::dataset::Table) -> Result<Vec<String>> {
        let cfg = &self.config;
        cfg.spec.validate()?;

        // ── Step 3: Normalise headers, renames, date parts ────────────────────
        let preprocessor = Preprocessor::new(&cfg.spec);
        let table        = preprocessor.prepare(table)?;

        // ── Step 4: Typed samples ─────────────────────────────────────────────
        let extracted = preprocessor.extract(&table)?;
        tracing::info!(
            "{} usable rows ({} dropped as incomplete)",
            extracted.samples.len(),
            extracted.dropped
        );

        // ── Step 5: Fit every bundle ──────────────────────────────────────────
        let bundles = fit_bundles(cfg, extracted.samples)?;

        // ── Step 6: Publish ───────────────────────────────────────────────────
        let store = ArtifactStore::new(&cfg.artifacts_dir);
        store
            .publish_all(&bundles, cfg)
            .with_context(|| format!("Cannot publish bundles to '{}'", cfg.artifacts_dir))?;

        let ids: Vec<String> = bundles.iter().map(|b| b.id().to_string()).collect();
        tracing::info!("Published {} bundle(s): {}", ids.len(), ids.join(", "));
        Ok(ids)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ModelError;
    use std::io::Write;

    fn write_csv(dir: &std::path::Path, body: &str) -> String {
        let path = dir.join("prices.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_default_config_matches_the_raw_material_layout() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.spec.feature_names(), vec!["Date_day_of_year", "Weather", "Demand"]);
        assert_eq!(cfg.spec.date_column.as_deref(), Some("Date"));
        assert_eq!(cfg.test_fraction, 0.2);
        assert_eq!(cfg.encoder_scope, EncoderScope::Segment);
    }

    #[test]
    fn test_csv_to_published_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(
            dir.path(),
            "Date, Weather ,Demand,Price\n\
             2024-01-01,Sunny,High,100\n\
             2024-01-02,Rainy,Low,80\n\
             2024-01-03,Sunny,Low,90\n\
             2024-01-04,,High,95\n",
        );
        let cfg = TrainConfig {
            data_path:     csv,
            artifacts_dir: dir.path().join("artifacts").to_string_lossy().into_owned(),
            ..TrainConfig::default()
        };

        let ids = TrainUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(ids, vec!["default".to_string()]);

        let bundle = ArtifactStore::new(&cfg.artifacts_dir).load("default").unwrap();
        assert_eq!(bundle.manifest.summary.rows, 3);
        assert_eq!(bundle.encoders["Weather"].classes(), &["Rainy", "Sunny"]);
    }

    #[test]
    fn test_bundled_crop_data_trains_one_bundle_per_crop() {
        let dir = tempfile::tempdir().unwrap();
        let spec = FeatureSpec::new(
            &["STATE", "District", "Market", "Variety", "Grade", "Arrival_Date_day_of_year"],
            &["STATE", "District", "Market", "Variety", "Grade"],
            "Modal_x0020_Price",
        )
        .with_segment_key("Commodity")
        .with_segments(["Onion", "Tomato", "Wheat"])
        .with_date_column("Arrival_Date")
        .with_rename("District Name", "District")
        .with_rename("Market Name", "Market");
        let cfg = TrainConfig {
            data_path:     format!("{}/data/crop_prices.csv", env!("CARGO_MANIFEST_DIR")),
            artifacts_dir: dir.path().to_string_lossy().into_owned(),
            spec,
            regressor:     RegressorKind::Ridge { alpha: 1.0 },
            ..TrainConfig::default()
        };

        let ids = TrainUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(ids, vec!["onion", "tomato", "wheat"]);

        let store = ArtifactStore::new(&cfg.artifacts_dir);
        assert_eq!(store.list().unwrap(), ids);
        let tomato = store.load("tomato").unwrap();
        assert_eq!(tomato.segment().unwrap().value, "Tomato");
        assert!(!tomato.encoders["District"].classes().iter().any(|d| d == "Nashik"));
    }

    #[test]
    fn test_missing_column_fails_before_publishing() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), "Date,Weather,Price\n2024-01-01,Sunny,100\n");
        let artifacts = dir.path().join("artifacts");
        let cfg = TrainConfig {
            data_path:     csv,
            artifacts_dir: artifacts.to_string_lossy().into_owned(),
            ..TrainConfig::default()
        };

        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(matches!(err.downcast_ref::<ModelError>(), Some(ModelError::Schema { .. })));
        assert!(!artifacts.join("default").exists());
    }
}
