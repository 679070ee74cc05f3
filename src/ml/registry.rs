// ============================================================
// Layer 5 — Model Registry
// ============================================================
// The set of bundles one service instance answers for.
// Built once at startup, then shared read-only behind an Arc.
//
// Routing a request:
//
//   named bundle   → that bundle, or UnknownBundle
//   no name, 1 bundle loaded       → that bundle
//   no name, segment bundles       → the bundle whose segment
//                                    value equals request[segment_key]
//   no name, several unsegmented   → SchemaError (ambiguous)
//
// All segment bundles in one registry must share the same
// segment key, and no two may claim the same segment value.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::error::{ArtifactError, ModelError};
use crate::infra::artifact_store::ArtifactStore;
use crate::ml::inferencer::{FeatureMap, LoadedModel};

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("bundle '{0}' is not loaded")]
    UnknownBundle(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Result of one prediction, before rounding.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub bundle_id: String,
    pub price:     f64,
}

#[derive(Debug)]
pub struct ModelRegistry {
    models:      BTreeMap<String, Arc<LoadedModel>>,
    segment_key: Option<String>,
    /// segment value → bundle id
    by_segment:  BTreeMap<String, String>,
}

impl ModelRegistry {
    pub fn new(models: Vec<LoadedModel>) -> Result<Self, ArtifactError> {
        if models.is_empty() {
            return Err(ArtifactError::inconsistent("*", "no bundles to serve"));
        }

        let segmented = models.iter().filter(|m| m.manifest().segment.is_some()).count();
        if segmented != 0 && segmented != models.len() {
            return Err(ArtifactError::inconsistent(
                "*",
                "segment bundles cannot be served together with unsegmented ones",
            ));
        }

        let mut segment_key = None;
        let mut by_segment  = BTreeMap::new();
        let mut by_id       = BTreeMap::new();

        for model in models {
            let id = model.id().to_string();

            if let Some(tag) = &model.manifest().segment {
                match &segment_key {
                    None => segment_key = Some(tag.key.clone()),
                    Some(key) if *key != tag.key => {
                        return Err(ArtifactError::inconsistent(
                            &id,
                            format!("segment key '{}' differs from '{}'", tag.key, key),
                        ));
                    }
                    Some(_) => {}
                }
                if let Some(other) = by_segment.insert(tag.value.clone(), id.clone()) {
                    return Err(ArtifactError::inconsistent(
                        &id,
                        format!("segment '{}' is already served by bundle '{}'", tag.value, other),
                    ));
                }
            }

            if by_id.insert(id.clone(), Arc::new(model)).is_some() {
                return Err(ArtifactError::inconsistent(&id, "bundle loaded twice"));
            }
        }

        Ok(Self { models: by_id, segment_key, by_segment })
    }

    /// Load `ids` from the store, or every published bundle when `ids` is empty.
    pub fn load(store: &ArtifactStore, ids: &[String]) -> Result<Self, ArtifactError> {
        let ids = if ids.is_empty() { store.list()? } else { ids.to_vec() };
        let models = ids
            .iter()
            .map(|id| LoadedModel::from_store(store, id))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(models)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    pub fn segment_key(&self) -> Option<&str> {
        self.segment_key.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<LoadedModel>> {
        self.models.get(id)
    }

    /// Pick the bundle for a request that does not name one.
    pub fn select(&self, request: &FeatureMap) -> Result<&Arc<LoadedModel>, ModelError> {
        if let Some(key) = &self.segment_key {
            let value = request
                .get(key)
                .ok_or_else(|| ModelError::schema(key, "is required to choose a segment bundle"))?
                .as_str()
                .ok_or_else(|| ModelError::schema(key, "must be a JSON string"))?;
            return self
                .by_segment
                .get(value)
                .and_then(|id| self.models.get(id))
                .ok_or_else(|| ModelError::encoding(key, value));
        }

        match self.models.values().next() {
            Some(only) if self.models.len() == 1 => Ok(only),
            _ => Err(ModelError::schema(
                "bundle",
                format!("must be named; {} bundles are loaded", self.models.len()),
            )),
        }
    }

    pub fn predict(&self, bundle: Option<&str>, request: &FeatureMap) -> Result<Prediction, PredictError> {
        let model = match bundle {
            Some(id) => self
                .get(id)
                .ok_or_else(|| PredictError::UnknownBundle(id.to_string()))?,
            None => self.select(request)?,
        };
        let price = model.predict(request)?;
        Ok(Prediction { bundle_id: model.id().to_string(), price })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::data::dataset::{FeatureValue, Sample};
    use crate::domain::feature_spec::{FeatureSpec, SegmentTag};
    use crate::ml::bundle::fixtures::weather_bundle;
    use crate::ml::trainer::fit_bundles;
    use serde_json::json;

    fn request(value: serde_json::Value) -> FeatureMap {
        value.as_object().cloned().unwrap()
    }

    fn segment_model(id: &str, value: &str) -> LoadedModel {
        let mut bundle = weather_bundle();
        bundle.manifest.bundle_id = id.into();
        bundle.manifest.segment   = Some(SegmentTag { key: "Commodity".into(), value: value.into() });
        LoadedModel::new(bundle).unwrap()
    }

    /// Onion and Tomato bundles with disjoint District vocabularies.
    pub(crate) fn crop_registry() -> ModelRegistry {
        let spec = FeatureSpec::new(&["District", "Day"], &["District"], "Price").with_segment_key("Commodity");
        let cfg  = TrainConfig { spec, test_fraction: 0.0, ..TrainConfig::default() };
        let row  = |crop: &str, district: &str, day: f64, price: f64| Sample {
            features: vec![FeatureValue::Category(district.into()), FeatureValue::Number(day)],
            target:   price,
            segment:  Some(crop.into()),
        };
        let samples = vec![
            row("Onion", "Nashik", 1.0, 1200.0),
            row("Onion", "Pune", 2.0, 1300.0),
            row("Onion", "Nashik", 3.0, 1250.0),
            row("Tomato", "Kolar", 1.0, 900.0),
            row("Tomato", "Madanapalle", 2.0, 950.0),
        ];
        let models = fit_bundles(&cfg, samples)
            .unwrap()
            .into_iter()
            .map(|b| LoadedModel::new(b).unwrap())
            .collect();
        ModelRegistry::new(models).unwrap()
    }

    #[test]
    fn test_single_bundle_needs_no_name() {
        let reg = ModelRegistry::new(vec![LoadedModel::new(weather_bundle()).unwrap()]).unwrap();
        let p   = reg.predict(None, &request(json!({"day": 1, "weather": "Rainy"}))).unwrap();
        assert_eq!(p.bundle_id, "default");
        assert_eq!(p.price, 12.0);
    }

    #[test]
    fn test_named_bundle() {
        let reg = crop_registry();
        let p   = reg.predict(Some("tomato"), &request(json!({"District": "Kolar", "Day": 1}))).unwrap();
        assert_eq!(p.bundle_id, "tomato");
    }

    #[test]
    fn test_unknown_bundle() {
        let reg = crop_registry();
        let err = reg.predict(Some("wheat"), &request(json!({}))).unwrap_err();
        assert!(matches!(err, PredictError::UnknownBundle(id) if id == "wheat"));
    }

    #[test]
    fn test_segment_routing() {
        let reg = crop_registry();
        assert_eq!(reg.segment_key(), Some("Commodity"));
        let p = reg
            .predict(None, &request(json!({"Commodity": "Onion", "District": "Pune", "Day": 4})))
            .unwrap();
        assert_eq!(p.bundle_id, "onion");
    }

    #[test]
    fn test_segment_value_never_leaks_across_bundles() {
        let reg = crop_registry();
        // Kolar only appears in Tomato rows
        let err = reg
            .predict(None, &request(json!({"Commodity": "Onion", "District": "Kolar", "Day": 1})))
            .unwrap_err();
        assert!(matches!(err, PredictError::Model(ModelError::Encoding { .. })));

        let err = reg
            .predict(Some("onion"), &request(json!({"District": "Kolar", "Day": 1})))
            .unwrap_err();
        assert!(matches!(err, PredictError::Model(ModelError::Encoding { .. })));
    }

    #[test]
    fn test_missing_segment_field_is_schema_error() {
        let reg = crop_registry();
        let err = reg.predict(None, &request(json!({"District": "Pune", "Day": 1}))).unwrap_err();
        assert!(matches!(err, PredictError::Model(ModelError::Schema { .. })));
    }

    #[test]
    fn test_unknown_segment_is_encoding_error() {
        let reg = crop_registry();
        let err = reg
            .predict(None, &request(json!({"Commodity": "Wheat", "District": "Pune", "Day": 1})))
            .unwrap_err();
        assert!(matches!(err, PredictError::Model(ModelError::Encoding { .. })));
    }

    #[test]
    fn test_several_unsegmented_bundles_need_a_name() {
        let mut other = weather_bundle();
        other.manifest.bundle_id = "other".into();
        let reg = ModelRegistry::new(vec![
            LoadedModel::new(weather_bundle()).unwrap(),
            LoadedModel::new(other).unwrap(),
        ])
        .unwrap();
        let err = reg.predict(None, &request(json!({"day": 1, "weather": "Rainy"}))).unwrap_err();
        assert!(matches!(err, PredictError::Model(ModelError::Schema { .. })));
    }

    #[test]
    fn test_mixed_segment_keys_are_rejected() {
        let mut odd = weather_bundle();
        odd.manifest.bundle_id = "kolar".into();
        odd.manifest.segment   = Some(SegmentTag { key: "District".into(), value: "Kolar".into() });
        let result = ModelRegistry::new(vec![segment_model("onion", "Onion"), LoadedModel::new(odd).unwrap()]);
        assert!(matches!(result, Err(ArtifactError::Inconsistent { .. })));
    }

    #[test]
    fn test_segmented_and_unsegmented_are_rejected() {
        let result = ModelRegistry::new(vec![
            segment_model("onion", "Onion"),
            LoadedModel::new(weather_bundle()).unwrap(),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_segment_values_are_rejected() {
        let result = ModelRegistry::new(vec![segment_model("onion", "Onion"), segment_model("onion_2", "Onion")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_registry_is_rejected() {
        assert!(ModelRegistry::new(Vec::new()).is_err());
    }

    #[test]
    fn test_load_everything_in_the_store() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.publish(&weather_bundle(), &TrainConfig::default()).unwrap();

        let reg = ModelRegistry::load(&store, &[]).unwrap();
        assert_eq!(reg.ids(), vec!["default"]);
    }
}
