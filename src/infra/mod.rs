// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Persistence that the training and serving workflows share:
//
//   artifact_store.rs — Artifact Bundle persistence
//                       One directory per bundle, one JSON file
//                       per component. Publishing goes through a
//                       staging directory and a rename, so a
//                       half-written bundle is never visible.
//                       Also keeps the TrainConfig next to each
//                       bundle as a record of how it was built.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling)

/// Bundle publishing and loading
pub mod artifact_store;
