// ============================================================
// Layer 6 — Artifact Store
// ============================================================
// Saves and restores Artifact Bundles on the filesystem.
//
// Layout: one directory per bundle, one JSON file per component
//
//   artifacts/
//     tomato/
//       manifest.json          ← feature-order contract, segment, counts
//       regressor.json         ← fitted model (tagged by kind)
//       district_encoder.json  ← one per categorical feature
//       grade_encoder.json
//       train_config.json      ← how this bundle was trained
//     onion/
//       ...
//
// Publishing is all-or-nothing:
//   1. write every component into  artifacts/.staging-<id>-<uuid>/
//   2. move any existing bundle to artifacts/.retired-<id>-<uuid>/
//   3. rename staging → artifacts/<id>/
//   4. delete the retired copy
// A reader therefore sees either the old bundle or the new
// one, never a directory that is still being written.
//
// Reference: Rust Book §9 (Error Handling)
//            std::fs::rename (atomic within one filesystem)

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::application::train_use_case::TrainConfig;
use crate::data::encoder::CategoricalEncoder;
use crate::domain::error::ArtifactError;
use crate::domain::feature_spec::slugify;
use crate::ml::bundle::{ArtifactBundle, BundleManifest, FORMAT_VERSION};
use crate::ml::regressor::FittedRegressor;

const MANIFEST: &str = "manifest";
const REGRESSOR: &str = "regressor";
const TRAIN_CONFIG: &str = "train_config";

/// Component name of the encoder for `field`, e.g. "District Name" → "district_name_encoder".
pub fn encoder_component(field: &str) -> String {
    format!("{}_encoder", slugify(field))
}

/// Durable key → blob store keyed by (bundle id, component name).
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Bundle ids are slugs: lowercase alphanumerics joined by `_`.
    pub fn validate_id(id: &str) -> Result<(), ArtifactError> {
        if id.is_empty() || slugify(id) != id {
            return Err(ArtifactError::InvalidId(id.to_string()));
        }
        Ok(())
    }

    pub fn bundle_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    pub fn component_path(&self, id: &str, component: &str) -> PathBuf {
        self.bundle_dir(id).join(format!("{component}.json"))
    }

    // ─── Publishing ───────────────────────────────────────────────────────────

    /// Validate every bundle first, then publish them one by one.
    pub fn publish_all(&self, bundles: &[ArtifactBundle], cfg: &TrainConfig) -> Result<(), ArtifactError> {
        for bundle in bundles {
            Self::validate_id(bundle.id())?;
            bundle.validate()?;
            self.check_encoder_names(bundle)?;
        }
        for bundle in bundles {
            self.publish(bundle, cfg)?;
        }
        Ok(())
    }

    /// Publish one bundle atomically and return its directory.
    pub fn publish(&self, bundle: &ArtifactBundle, cfg: &TrainConfig) -> Result<PathBuf, ArtifactError> {
        self.publish_with(bundle, |staging| write_components(staging, bundle, cfg))
    }

    /// `publish` with the component writer supplied by the caller.
    fn publish_with<W>(&self, bundle: &ArtifactBundle, write: W) -> Result<PathBuf, ArtifactError>
    where
        W: FnOnce(&Path) -> Result<(), ArtifactError>,
    {
        let id = bundle.id();
        Self::validate_id(id)?;
        bundle.validate()?;
        self.check_encoder_names(bundle)?;

        fs::create_dir_all(&self.root).map_err(|e| ArtifactError::io(&self.root, e))?;

        // ── Step 1: Write everything into a staging directory ─────────────────
        let staging = self.root.join(format!(".staging-{id}-{}", Uuid::new_v4()));
        fs::create_dir(&staging).map_err(|e| ArtifactError::io(&staging, e))?;

        if let Err(e) = write(&staging) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        // ── Steps 2–4: Swap it in ─────────────────────────────────────────────
        let target = self.swap_in(id, &staging)?;
        tracing::info!("Published bundle '{}' to '{}'", id, target.display());
        Ok(target)
    }

    /// Replace bundle `id` with the fully written `staging` directory.
    /// On failure the previous bundle, if any, is put back and staging
    /// is removed.
    fn swap_in(&self, id: &str, staging: &Path) -> Result<PathBuf, ArtifactError> {
        // ── Step 2: Move an existing bundle out of the way ────────────────────
        let target  = self.bundle_dir(id);
        let retired = if target.exists() {
            let retired = self.root.join(format!(".retired-{id}-{}", Uuid::new_v4()));
            if let Err(e) = fs::rename(&target, &retired) {
                let _ = fs::remove_dir_all(staging);
                return Err(ArtifactError::io(&target, e));
            }
            Some(retired)
        } else {
            None
        };

        // ── Step 3: Swap the new bundle in ────────────────────────────────────
        if let Err(e) = fs::rename(staging, &target) {
            if let Some(retired) = &retired {
                if let Err(restore) = fs::rename(retired, &target) {
                    tracing::error!(
                        "Could not restore bundle '{}' from '{}': {}",
                        id,
                        retired.display(),
                        restore
                    );
                }
            }
            let _ = fs::remove_dir_all(staging);
            return Err(ArtifactError::io(&target, e));
        }

        // ── Step 4: Drop the old copy ─────────────────────────────────────────
        if let Some(retired) = retired {
            if let Err(e) = fs::remove_dir_all(&retired) {
                tracing::warn!("Could not remove retired bundle '{}': {}", retired.display(), e);
            }
        }
        Ok(target)
    }

    /// Two fields must never share an encoder file.
    fn check_encoder_names(&self, bundle: &ArtifactBundle) -> Result<(), ArtifactError> {
        let mut seen: BTreeMap<String, &str> = BTreeMap::new();
        for field in bundle.encoders.keys() {
            let component = encoder_component(field);
            if let Some(other) = seen.insert(component.clone(), field) {
                return Err(ArtifactError::inconsistent(
                    bundle.id(),
                    format!("fields '{other}' and '{field}' both map to component '{component}'"),
                ));
            }
        }
        Ok(())
    }

    // ─── Loading ──────────────────────────────────────────────────────────────

    /// Read and validate a bundle. Any missing or unreadable component
    /// fails the whole load.
    pub fn load(&self, id: &str) -> Result<ArtifactBundle, ArtifactError> {
        Self::validate_id(id)?;

        let manifest  = self.load_manifest(id)?;
        let regressor: FittedRegressor = self.read_component(id, REGRESSOR)?;

        let mut encoders = BTreeMap::new();
        for field in manifest.features.iter().filter(|f| f.is_categorical()) {
            let enc: CategoricalEncoder = self.read_component(id, &encoder_component(&field.name))?;
            encoders.insert(field.name.clone(), enc);
        }

        let bundle = ArtifactBundle { manifest, encoders, regressor };
        bundle.validate()?;

        tracing::debug!("Loaded bundle '{}' from '{}'", id, self.bundle_dir(id).display());
        Ok(bundle)
    }

    /// The manifest alone, with its format version checked before the
    /// rest of the layout is trusted.
    pub fn load_manifest(&self, id: &str) -> Result<BundleManifest, ArtifactError> {
        let raw: serde_json::Value = self.read_component(id, MANIFEST)?;

        let found = raw
            .get("format_version")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        if found != u64::from(FORMAT_VERSION) {
            return Err(ArtifactError::VersionMismatch {
                bundle:   id.to_string(),
                found,
                expected: FORMAT_VERSION,
            });
        }

        let manifest: BundleManifest = serde_json::from_value(raw).map_err(|source| ArtifactError::Corrupt {
            bundle:    id.to_string(),
            component: MANIFEST.to_string(),
            source,
        })?;
        if manifest.bundle_id != id {
            return Err(ArtifactError::inconsistent(
                id,
                format!("manifest names bundle '{}'", manifest.bundle_id),
            ));
        }
        Ok(manifest)
    }

    /// Ids of every published bundle, sorted. Staging and retired
    /// directories are hidden.
    pub fn list(&self) -> Result<Vec<String>, ArtifactError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ArtifactError::io(&self.root, e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ArtifactError::io(&self.root, e))?;
            let name  = entry.file_name().to_string_lossy().into_owned();
            if entry.path().is_dir() && Self::validate_id(&name).is_ok() {
                ids.push(name);
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn read_component<T: DeserializeOwned>(&self, id: &str, component: &str) -> Result<T, ArtifactError> {
        let path  = self.component_path(id, component);
        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ArtifactError::Missing {
                bundle:    id.to_string(),
                component: component.to_string(),
            },
            _ => ArtifactError::io(&path, e),
        })?;

        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Corrupt {
            bundle:    id.to_string(),
            component: component.to_string(),
            source,
        })
    }
}

fn write_components(dir: &Path, bundle: &ArtifactBundle, cfg: &TrainConfig) -> Result<(), ArtifactError> {
    write_json(dir, bundle.id(), MANIFEST, &bundle.manifest)?;
    write_json(dir, bundle.id(), REGRESSOR, &bundle.regressor)?;
    for (field, encoder) in &bundle.encoders {
        write_json(dir, bundle.id(), &encoder_component(field), encoder)?;
    }
    write_json(dir, bundle.id(), TRAIN_CONFIG, cfg)
}

fn write_json<T: Serialize>(dir: &Path, id: &str, component: &str, value: &T) -> Result<(), ArtifactError> {
    let path = dir.join(format!("{component}.json"));
    let json = serde_json::to_vec_pretty(value).map_err(|source| ArtifactError::Corrupt {
        bundle:    id.to_string(),
        component: component.to_string(),
        source,
    })?;

    let mut file = fs::File::create(&path).map_err(|e| ArtifactError::io(&path, e))?;
    file.write_all(&json).map_err(|e| ArtifactError::io(&path, e))?;
    file.sync_all().map_err(|e| ArtifactError::io(&path, e))?;
    Ok(())
}
