// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust types and traits that describe the pipeline:
// what a feature is, which errors can happen, and which
// capabilities the other layers plug in.
//
// Rules for this layer:
//   - NO file I/O or network calls
//   - NO numeric fitting code
//   - Only plain structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// The four-way error taxonomy shared by training and serving
pub mod error;

// Feature declarations and the feature-order contract
pub mod feature_spec;

// Core abstractions (traits) that other layers implement
pub mod traits;
