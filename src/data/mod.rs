// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a CSV file on disk and a numeric
// feature matrix the regressor can fit on.
//
// The pipeline flows in this order:
//
//   CSV file
//       │
//       ▼
//   CsvLoader           → reads rows, keeps cells as strings
//       │
//       ▼
//   Preprocessor        → normalises headers, derives dates,
//       │                 types cells, drops incomplete rows
//       ▼
//   CategoricalEncoder  → string values → integer codes
//       │
//       ▼
//   split_train_holdout → seeded train / held-out split
//
// Each module is responsible for exactly one step.

/// Table and typed Sample types
pub mod dataset;

/// Reads CSV files into a Table
pub mod loader;

/// Header normalisation, date parts, row cleaning
pub mod preprocessor;

/// Frozen string → code vocabularies
pub mod encoder;

/// Seeded train/held-out split
pub mod splitter;
