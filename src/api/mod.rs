// ============================================================
// Layer 1 — HTTP Presentation Layer
// ============================================================
// The network face of the prediction service (axum).
//
//   GET  /health            → {"status": "ok", "bundles": [...]}
//   POST /predict           → bundle chosen by the registry
//   POST /predict/:bundle   → named bundle
//
// Handlers only translate HTTP ⇄ registry calls. They hold
// no state of their own beyond an Arc to the loaded registry,
// so tests can build a router around bundles made in memory.

pub mod routes;

pub use routes::{build_router, ApiState};
