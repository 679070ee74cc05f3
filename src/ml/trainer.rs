// ============================================================
// Layer 5 — Trainer
// ============================================================
// Turns typed Samples into one Artifact Bundle per segment
// (or a single bundle when no segment key is configured).
//
// Per bundle:
//   1. Check there are enough rows (DataError otherwise)
//   2. Fit one CategoricalEncoder per categorical feature
//   3. Encode every row into a numeric feature vector, in
//      feature-order-contract order
//   4. Seeded train / held-out split
//   5. Fit the configured regressor on the training subset
//
// The held-out subset is only counted; evaluating on it is
// not this layer's job.

use std::collections::BTreeMap;

use chrono::Utc;
use ndarray::{Array1, Array2};

use crate::application::train_use_case::{EncoderScope, TrainConfig};
use crate::data::dataset::{FeatureValue, Sample};
use crate::data::encoder::CategoricalEncoder;
use crate::data::splitter::split_train_holdout;
use crate::domain::error::{ModelError, ModelResult};
use crate::domain::feature_spec::{slugify, FeatureSpec, SegmentTag};
use crate::domain::traits::Regressor;
use crate::ml::bundle::{ArtifactBundle, BundleManifest, TrainingSummary, FORMAT_VERSION};

/// Fit every bundle described by `cfg` from `samples`.
pub fn fit_bundles(cfg: &TrainConfig, samples: Vec<Sample>) -> ModelResult<Vec<ArtifactBundle>> {
    let spec = &cfg.spec;
    spec.validate()?;

    let Some(key) = &spec.segment_key else {
        let rows: Vec<&Sample> = samples.iter().collect();
        return Ok(vec![fit_bundle(cfg, &cfg.bundle_id, None, &rows, None)?]);
    };

    let segments = partition(&samples, &spec.segments)?;

    // Encoders shared by every segment, when configured that way.
    let shared = match cfg.encoder_scope {
        EncoderScope::Global => {
            let all: Vec<&Sample> = segments.values().flatten().copied().collect();
            Some(fit_encoders(spec, &all))
        }
        EncoderScope::Segment => None,
    };

    let mut ids: BTreeMap<String, &str> = BTreeMap::new();
    let mut bundles = Vec::with_capacity(segments.len());

    for (value, rows) in &segments {
        let id = slugify(value);
        if id.is_empty() {
            return Err(ModelError::data(format!("segment '{value}' does not yield a usable bundle id")));
        }
        if let Some(other) = ids.insert(id.clone(), value.as_str()) {
            return Err(ModelError::data(format!(
                "segments '{other}' and '{value}' both map to bundle id '{id}'"
            )));
        }

        let tag = SegmentTag { key: key.clone(), value: value.clone() };
        bundles.push(fit_bundle(cfg, &id, Some(tag), rows, shared.as_ref())?);
    }

    Ok(bundles)
}

/// Group samples by segment value, keeping only allowlisted segments.
fn partition<'a>(samples: &'a [Sample], allow: &[String]) -> ModelResult<BTreeMap<String, Vec<&'a Sample>>> {
    let mut groups: BTreeMap<String, Vec<&Sample>> = BTreeMap::new();
    let mut skipped = 0usize;

    for sample in samples {
        let Some(seg) = &sample.segment else { continue };
        if !allow.is_empty() && !allow.iter().any(|a| a == seg) {
            skipped += 1;
            continue;
        }
        groups.entry(seg.clone()).or_default().push(sample);
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} rows outside the segment allowlist", skipped);
    }

    if let Some(missing) = allow.iter().find(|a| !groups.contains_key(*a)) {
        return Err(ModelError::data(format!("segment '{missing}' has no usable rows")));
    }
    if groups.is_empty() {
        return Err(ModelError::data("no segment has any usable rows"));
    }

    Ok(groups)
}

/// One encoder per categorical feature, fitted on `rows`.
fn fit_encoders(spec: &FeatureSpec, rows: &[&Sample]) -> BTreeMap<String, CategoricalEncoder> {
    spec.features
        .iter()
        .enumerate()
        .filter(|(_, f)| f.is_categorical())
        .map(|(idx, field)| {
            let enc = CategoricalEncoder::fit(&field.name, rows.iter().filter_map(|s| s.category(idx)));
            tracing::debug!("Encoder '{}': {} classes", field.name, enc.len());
            (field.name.clone(), enc)
        })
        .collect()
}

/// Encode one sample in feature-order-contract order.
fn encode_row(
    spec:     &FeatureSpec,
    encoders: &BTreeMap<String, CategoricalEncoder>,
    sample:   &Sample,
) -> ModelResult<Vec<f64>> {
    spec.features
        .iter()
        .zip(&sample.features)
        .map(|(field, value)| match value {
            FeatureValue::Number(v) => Ok(*v),
            FeatureValue::Category(s) => {
                let enc = encoders
                    .get(&field.name)
                    .ok_or_else(|| ModelError::schema(&field.name, "has no fitted encoder"))?;
                enc.encode(s).map(f64::from)
            }
        })
        .collect()
}

fn fit_bundle(
    cfg:     &TrainConfig,
    id:      &str,
    segment: Option<SegmentTag>,
    rows:    &[&Sample],
    shared:  Option<&BTreeMap<String, CategoricalEncoder>>,
) -> ModelResult<ArtifactBundle> {
    let spec  = &cfg.spec;
    let label = segment.as_ref().map(|s| s.value.as_str()).unwrap_or(id);

    // ── Step 1: Enough rows? ──────────────────────────────────────────────────
    if rows.len() < cfg.min_rows {
        return Err(ModelError::data(format!(
            "'{label}' has {} usable rows, at least {} are required",
            rows.len(),
            cfg.min_rows
        )));
    }

    // ── Step 2: Encoders ──────────────────────────────────────────────────────
    let encoders = match shared {
        Some(enc) => enc.clone(),
        None => fit_encoders(spec, rows),
    };

    // ── Step 3: Encode ────────────────────────────────────────────────────────
    let encoded: Vec<(Vec<f64>, f64)> = rows
        .iter()
        .map(|s| encode_row(spec, &encoders, s).map(|x| (x, s.target)))
        .collect::<ModelResult<_>>()?;

    // ── Step 4: Split ─────────────────────────────────────────────────────────
    let total = encoded.len();
    let (train, held_out) = split_train_holdout(encoded, 1.0 - cfg.test_fraction, cfg.seed);
    if train.is_empty() {
        return Err(ModelError::data(format!(
            "'{label}' has no training rows left after holding out {:.0}%",
            cfg.test_fraction * 100.0
        )));
    }

    // ── Step 5: Fit ───────────────────────────────────────────────────────────
    let width = spec.features.len();
    let flat: Vec<f64> = train.iter().flat_map(|(x, _)| x.iter().copied()).collect();
    let x = Array2::from_shape_vec((train.len(), width), flat)
        .map_err(|e| ModelError::data(format!("cannot shape feature matrix: {e}")))?;
    let y: Array1<f64> = train.iter().map(|(_, t)| *t).collect();

    let regressor = cfg.regressor.fit(x.view(), y.view())?;

    tracing::info!(
        "Fitted bundle '{}' ({}): {} rows, {} train / {} held out",
        id,
        cfg.regressor.name(),
        total,
        train.len(),
        held_out.len()
    );

    let bundle = ArtifactBundle {
        manifest: BundleManifest {
            format_version: FORMAT_VERSION,
            bundle_id:      id.to_string(),
            segment,
            features:       spec.features.clone(),
            target:         spec.target.clone(),
            regressor:      cfg.regressor.name().to_string(),
            summary: TrainingSummary {
                rows:          total,
                train_rows:    train.len(),
                held_out_rows: held_out.len(),
            },
            created_at: Utc::now(),
        },
        encoders,
        regressor,
    };
    bundle.validate()?;
    Ok(bundle)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::Predictor;
    use crate::ml::boosted::BoostedTrees;
    use crate::ml::regressor::RegressorKind;

    fn sample(features: Vec<FeatureValue>, target: f64, segment: Option<&str>) -> Sample {
        Sample { features, target, segment: segment.map(str::to_string) }
    }

    fn num(v: f64) -> FeatureValue {
        FeatureValue::Number(v)
    }

    fn cat(s: &str) -> FeatureValue {
        FeatureValue::Category(s.to_string())
    }

    fn weather_cfg() -> TrainConfig {
        TrainConfig {
            spec: FeatureSpec::new(&["day", "weather", "demand"], &["weather", "demand"], "price"),
            ..TrainConfig::default()
        }
    }

    fn crop_cfg() -> TrainConfig {
        TrainConfig {
            spec: FeatureSpec::new(&["District", "Grade"], &["District", "Grade"], "Modal_Price")
                .with_segment_key("Commodity"),
            ..TrainConfig::default()
        }
    }

    fn crop_rows() -> Vec<Sample> {
        vec![
            sample(vec![cat("Nashik"), cat("FAQ")], 1200.0, Some("Onion")),
            sample(vec![cat("Pune"), cat("FAQ")], 1300.0, Some("Onion")),
            sample(vec![cat("Nashik"), cat("Local")], 1100.0, Some("Onion")),
            sample(vec![cat("Kolar"), cat("FAQ")], 900.0, Some("Tomato")),
            sample(vec![cat("Madanapalle"), cat("Local")], 800.0, Some("Tomato")),
            sample(vec![cat("Kolar"), cat("Local")], 850.0, Some("Tomato")),
            sample(vec![cat("Indore"), cat("FAQ")], 2100.0, Some("Wheat")),
            sample(vec![cat("Sehore"), cat("FAQ")], 2200.0, Some("Wheat")),
        ]
    }

    #[test]
    fn test_two_row_scenario_produces_a_bundle() {
        let rows = vec![
            sample(vec![num(1.0), cat("Sunny"), cat("High")], 100.0, None),
            sample(vec![num(2.0), cat("Rainy"), cat("Low")], 80.0, None),
        ];
        let bundles = fit_bundles(&weather_cfg(), rows).unwrap();
        assert_eq!(bundles.len(), 1);

        let b = &bundles[0];
        assert_eq!(b.id(), "default");
        assert_eq!(b.manifest.summary.train_rows, 2);
        assert_eq!(b.encoders["weather"].classes(), &["Rainy", "Sunny"]);
        // Sunny = 1, High = 0
        let p = b.regressor.predict_row(&[1.0, 1.0, 0.0]);
        assert!(p.is_finite());
    }

    #[test]
    fn test_too_few_rows_is_data_error() {
        let rows = vec![sample(vec![num(1.0), cat("Sunny"), cat("High")], 100.0, None)];
        let err = fit_bundles(&weather_cfg(), rows).unwrap_err();
        assert!(matches!(err, ModelError::Data(_)));
    }

    #[test]
    fn test_one_bundle_per_segment() {
        let bundles = fit_bundles(&crop_cfg(), crop_rows()).unwrap();
        let ids: Vec<&str> = bundles.iter().map(|b| b.id()).collect();
        assert_eq!(ids, vec!["onion", "tomato", "wheat"]);
        let onion = &bundles[0];
        assert_eq!(onion.segment().unwrap().value, "Onion");
        assert_eq!(onion.segment().unwrap().key, "Commodity");
    }

    #[test]
    fn test_segment_encoders_only_see_their_rows() {
        let bundles = fit_bundles(&crop_cfg(), crop_rows()).unwrap();
        let onion   = bundles.iter().find(|b| b.id() == "onion").unwrap();
        let tomato  = bundles.iter().find(|b| b.id() == "tomato").unwrap();
        assert_eq!(onion.encoders["District"].classes(), &["Nashik", "Pune"]);
        assert_eq!(tomato.encoders["District"].classes(), &["Kolar", "Madanapalle"]);
        assert!(onion.encoders["District"].encode("Kolar").is_err());
    }

    #[test]
    fn test_global_encoders_are_shared() {
        let cfg = TrainConfig { encoder_scope: EncoderScope::Global, ..crop_cfg() };
        let bundles = fit_bundles(&cfg, crop_rows()).unwrap();
        let first = &bundles[0].encoders["District"];
        assert_eq!(first.len(), 6);
        assert!(bundles.iter().all(|b| &b.encoders["District"] == first));
    }

    #[test]
    fn test_allowlist_limits_segments() {
        let mut cfg = crop_cfg();
        cfg.spec = cfg.spec.with_segments(["Onion", "Tomato"]);
        let bundles = fit_bundles(&cfg, crop_rows()).unwrap();
        assert_eq!(bundles.len(), 2);
        assert!(bundles.iter().all(|b| b.id() != "wheat"));
    }

    #[test]
    fn test_allowlisted_segment_without_rows_is_data_error() {
        let mut cfg = crop_cfg();
        cfg.spec = cfg.spec.with_segments(["Onion", "Potato"]);
        assert!(matches!(fit_bundles(&cfg, crop_rows()), Err(ModelError::Data(_))));
    }

    #[test]
    fn test_small_segment_fails_the_whole_run() {
        let mut rows = crop_rows();
        rows.push(sample(vec![cat("Agra"), cat("FAQ")], 700.0, Some("Potato")));
        assert!(matches!(fit_bundles(&crop_cfg(), rows), Err(ModelError::Data(_))));
    }

    #[test]
    fn test_colliding_bundle_ids_are_rejected() {
        let mut rows = crop_rows();
        rows.push(sample(vec![cat("Pune"), cat("FAQ")], 1250.0, Some("onion")));
        rows.push(sample(vec![cat("Pune"), cat("FAQ")], 1260.0, Some("onion")));
        assert!(matches!(fit_bundles(&crop_cfg(), rows), Err(ModelError::Data(_))));
    }

    #[test]
    fn test_split_is_reproducible() {
        let rows: Vec<Sample> = (0..20)
            .map(|i| sample(vec![num(i as f64), cat(if i % 2 == 0 { "Sunny" } else { "Rainy" }), cat("High")], 50.0 + i as f64 * 3.0, None))
            .collect();
        let cfg = TrainConfig { regressor: RegressorKind::Ridge { alpha: 0.5 }, ..weather_cfg() };
        let a = fit_bundles(&cfg, rows.clone()).unwrap();
        let b = fit_bundles(&cfg, rows).unwrap();
        assert_eq!(a[0].manifest.summary.train_rows, 16);
        assert_eq!(a[0].manifest.summary.held_out_rows, 4);
        let row = [7.0, 1.0, 0.0];
        assert_eq!(a[0].regressor.predict_row(&row), b[0].regressor.predict_row(&row));
    }

    #[test]
    fn test_boosted_trees_bundle() {
        let rows: Vec<Sample> = (0..30)
            .map(|i| sample(vec![num(i as f64), cat("Sunny"), cat(if i < 15 { "Low" } else { "High" })], if i < 15 { 60.0 } else { 120.0 }, None))
            .collect();
        let cfg = TrainConfig {
            regressor: RegressorKind::BoostedTrees(BoostedTrees::default()),
            ..weather_cfg()
        };
        let bundles = fit_bundles(&cfg, rows).unwrap();
        assert_eq!(bundles[0].manifest.regressor, "boosted_trees");
        assert!(bundles[0].regressor.predict_row(&[3.0, 0.0, 1.0]).is_finite());
    }
}
