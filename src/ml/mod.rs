// ============================================================
// Layer 5 — ML / Model Layer
// ============================================================
// Everything that fits or evaluates a regressor.
//
// What's in this layer:
//
//   linear.rs     — ordinary and ridge least squares on ndarray
//                   (centred normal equations, Gauss-Jordan solve)
//
//   boosted.rs    — gradient-boosted regression trees (gbdt)
//
//   regressor.rs  — RegressorKind / FittedRegressor: the pluggable
//                   algorithm choice and its fitted result
//
//   bundle.rs     — ArtifactBundle: manifest + encoders + regressor
//
//   trainer.rs    — encodes samples, splits, fits one bundle per
//                   segment
//
//   inferencer.rs — LoadedModel: JSON request → feature vector → price
//
//   registry.rs   — the loaded bundles of one service, with
//                   segment routing
//
// Reference: Rust Book §10 (Traits), §17 (Trait Objects vs Enums)
//            ndarray docs (ArrayView2, Axis)

/// Ordinary / ridge least squares
pub mod linear;

/// Gradient-boosted trees
pub mod boosted;

/// Algorithm selection and fitted models
pub mod regressor;

/// The unit of publishing and loading
pub mod bundle;

/// Bundle fitting, one per segment
pub mod trainer;

/// Request validation, encoding, and prediction
pub mod inferencer;

/// Loaded bundles and request routing
pub mod registry;
