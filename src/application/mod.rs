// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one goal: training bundles, serving them, or answering a
// single prediction.
//
// Rules for this layer:
//   - No fitting maths or encoding here (that's Layer 5)
//   - No argument parsing or printing here (that's Layer 1)
//   - No direct file access (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// CSV → fitted bundles → artifact store
pub mod train_use_case;

// Artifact store → model registry → HTTP service
pub mod serve_use_case;

// Artifact store → one prediction
pub mod predict_use_case;
