// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Turns one JSON prediction request into one price.
//
//   {"Weather": "Sunny", "Date_day_of_year": 1, "Demand": "High"}
//        │
//        ├─ Step 1: every contract field present with the right JSON type
//        ├─ Step 2: categoricals → codes via the bundle's encoders
//        ├─ Step 3: vector in CONTRACT order (request key order is irrelevant)
//        └─ Step 4: regressor.predict_row → f64
//
// Extra request fields are ignored.

use serde_json::{Map, Value};

use crate::domain::error::{ArtifactError, ModelError, ModelResult};
use crate::domain::feature_spec::FeatureKind;
use crate::domain::traits::Predictor;
use crate::infra::artifact_store::ArtifactStore;
use crate::ml::bundle::{ArtifactBundle, BundleManifest};

/// A prediction request: feature name → JSON value.
pub type FeatureMap = Map<String, Value>;

/// Round a prediction for presentation, e.g. 81.23456 → 81.23.
/// A value too large to scale is returned unrounded.
pub fn round_price(value: f64, decimals: u32) -> f64 {
    let scale  = 10f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX));
    let scaled = value * scale;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / scale
}

/// A validated bundle, ready to answer requests. Read-only after construction.
#[derive(Debug)]
pub struct LoadedModel {
    bundle: ArtifactBundle,
}

impl LoadedModel {
    pub fn new(bundle: ArtifactBundle) -> Result<Self, ArtifactError> {
        bundle.validate()?;
        Ok(Self { bundle })
    }

    pub fn from_store(store: &ArtifactStore, id: &str) -> Result<Self, ArtifactError> {
        let model = Self::new(store.load(id)?)?;
        tracing::info!(
            "Loaded bundle '{}' ({}, {} features)",
            id,
            model.manifest().regressor,
            model.manifest().features.len()
        );
        Ok(model)
    }

    pub fn id(&self) -> &str {
        self.bundle.id()
    }

    pub fn manifest(&self) -> &BundleManifest {
        &self.bundle.manifest
    }

    /// The model input for `request`, in feature-order-contract order.
    pub fn feature_vector(&self, request: &FeatureMap) -> ModelResult<Vec<f64>> {
        let features = &self.bundle.manifest.features;

        // ── Step 1: Presence and primitive type ───────────────────────────────
        for field in features {
            let value = request
                .get(&field.name)
                .ok_or_else(|| ModelError::schema(&field.name, "is missing from the request"))?;
            let type_ok = match field.kind {
                FeatureKind::Numeric     => value.is_number(),
                FeatureKind::Categorical => value.is_string(),
            };
            if !type_ok {
                let expected = match field.kind {
                    FeatureKind::Numeric     => "must be a JSON number",
                    FeatureKind::Categorical => "must be a JSON string",
                };
                return Err(ModelError::schema(&field.name, expected));
            }
        }

        // ── Steps 2–3: Encode and assemble in contract order ──────────────────
        features
            .iter()
            .map(|field| {
                let value = &request[&field.name];
                match field.kind {
                    FeatureKind::Numeric => value
                        .as_f64()
                        .ok_or_else(|| ModelError::schema(&field.name, "is not representable as f64")),
                    FeatureKind::Categorical => {
                        let enc = self.bundle.encoders.get(&field.name).ok_or_else(|| {
                            ModelError::from(ArtifactError::inconsistent(
                                self.id(),
                                format!("no encoder for '{}'", field.name),
                            ))
                        })?;
                        let text = value.as_str().unwrap_or_default();
                        enc.encode(text).map(f64::from)
                    }
                }
            })
            .collect()
    }

    pub fn predict(&self, request: &FeatureMap) -> ModelResult<f64> {
        let row = self.feature_vector(request)?;

        // ── Step 4: Single-row inference ──────────────────────────────────────
        let price = self.bundle.regressor.predict_row(&row);
        tracing::debug!("Bundle '{}' row {:?} → {:.4}", self.id(), row, price);
        if !price.is_finite() {
            return Err(ModelError::data(format!(
                "bundle '{}' produced a non-finite price ({price}) for this request",
                self.id()
            )));
        }
        Ok(price)
    }
}
