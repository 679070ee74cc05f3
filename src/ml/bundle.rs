// ============================================================
// Layer 5 — Artifact Bundle
// ============================================================
// Everything needed to reproduce a prediction, in one value:
//
//   manifest  — bundle id, segment, feature-order contract,
//               target name, regressor kind, row counts
//   encoders  — one CategoricalEncoder per categorical feature
//   regressor — the fitted model
//
// A bundle is built once by the trainer, published by the
// artifact store, and loaded read-only by the service.
// `validate` is run on both sides so a bundle whose parts
// disagree is never published and never served.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::encoder::CategoricalEncoder;
use crate::domain::error::ArtifactError;
use crate::domain::feature_spec::{FeatureField, SegmentTag};
use crate::domain::traits::Predictor;
use crate::ml::regressor::FittedRegressor;

/// Bumped whenever the on-disk layout changes incompatibly.
pub const FORMAT_VERSION: u32 = 1;

/// Row counts recorded at training time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub rows:          usize,
    pub train_rows:    usize,
    pub held_out_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub format_version: u32,
    pub bundle_id:      String,
    pub segment:        Option<SegmentTag>,
    /// The feature-order contract
    pub features:       Vec<FeatureField>,
    pub target:         String,
    pub regressor:      String,
    pub summary:        TrainingSummary,
    pub created_at:     DateTime<Utc>,
}

#[derive(Debug)]
pub struct ArtifactBundle {
    pub manifest:  BundleManifest,
    pub encoders:  BTreeMap<String, CategoricalEncoder>,
    pub regressor: FittedRegressor,
}

impl ArtifactBundle {
    pub fn id(&self) -> &str {
        &self.manifest.bundle_id
    }

    pub fn segment(&self) -> Option<&SegmentTag> {
        self.manifest.segment.as_ref()
    }

    /// Check that the manifest, encoders and regressor agree.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let id = self.id();
        let m  = &self.manifest;

        if m.format_version != FORMAT_VERSION {
            return Err(ArtifactError::VersionMismatch {
                bundle:   id.to_string(),
                found:    u64::from(m.format_version),
                expected: FORMAT_VERSION,
            });
        }

        if self.regressor.n_features() != m.features.len() {
            return Err(ArtifactError::inconsistent(
                id,
                format!(
                    "regressor expects {} features but the feature-order contract lists {}",
                    self.regressor.n_features(),
                    m.features.len()
                ),
            ));
        }

        for field in m.features.iter().filter(|f| f.is_categorical()) {
            let enc = self.encoders.get(&field.name).ok_or_else(|| {
                ArtifactError::inconsistent(id, format!("no encoder for categorical feature '{}'", field.name))
            })?;
            if enc.field() != field.name {
                return Err(ArtifactError::inconsistent(
                    id,
                    format!("encoder stored under '{}' was fitted for '{}'", field.name, enc.field()),
                ));
            }
            if enc.is_empty() || !enc.is_well_formed() {
                return Err(ArtifactError::inconsistent(
                    id,
                    format!("encoder for '{}' has an empty or unsorted vocabulary", field.name),
                ));
            }
        }

        if let Some(extra) = self
            .encoders
            .keys()
            .find(|k| !m.features.iter().any(|f| f.is_categorical() && &f.name == *k))
        {
            return Err(ArtifactError::inconsistent(
                id,
                format!("encoder '{extra}' does not match any categorical feature"),
            ));
        }

        Ok(())
    }
}
