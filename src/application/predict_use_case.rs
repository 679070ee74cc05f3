// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// One-shot prediction from the command line, through the same
// load → validate → route → predict path the HTTP service uses:
//
//   1. Load the named bundle (or every bundle) from the store
//   2. Parse the request JSON into a feature map
//   3. Route, predict, round

use anyhow::{Context, Result};

use crate::infra::artifact_store::ArtifactStore;
use crate::ml::inferencer::{round_price, FeatureMap};
use crate::ml::registry::{ModelRegistry, Prediction};

pub struct PredictUseCase {
    registry: ModelRegistry,
    bundle:   Option<String>,
    decimals: u32,
}

impl PredictUseCase {
    pub fn new(artifacts_dir: &str, bundle: Option<String>, decimals: u32) -> Result<Self> {
        let store = ArtifactStore::new(artifacts_dir);
        let ids: Vec<String> = bundle.iter().cloned().collect();
        let registry = ModelRegistry::load(&store, &ids)
            .with_context(|| format!("Cannot load bundles from '{artifacts_dir}'"))?;
        Ok(Self { registry, bundle, decimals })
    }

    /// Parse `input` as a JSON object and predict a rounded price.
    pub fn predict_json(&self, input: &str) -> Result<Prediction> {
        let request: FeatureMap = serde_json::from_str(input).context("Input must be a JSON object")?;
        self.predict(&request)
    }

    pub fn predict(&self, request: &FeatureMap) -> Result<Prediction> {
        let mut prediction = self.registry.predict(self.bundle.as_deref(), request)?;
        prediction.price = round_price(prediction.price, self.decimals);
        Ok(prediction)
    }
}
