// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training pipeline only talks to these traits, so the
// CSV loader or the regression algorithm can be swapped
// without touching the pipeline itself.
//
//   TabularSource — anything that yields a Table of rows
//   Regressor     — fit(X, y) → a fitted Predictor
//   Predictor     — predict(x) → price
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use ndarray::{ArrayView1, ArrayView2};

use crate::data::dataset::Table;
use crate::domain::error::ModelResult;

// ─── TabularSource ────────────────────────────────────────────────────────────
/// Any component that can load a labelled dataset.
///
/// Implementations:
///   - CsvLoader → reads a CSV file with a header row
pub trait TabularSource {
    fn load(&self) -> Result<Table>;
}

// ─── Regressor ────────────────────────────────────────────────────────────────
/// The fitting half of the regressor capability.
///
/// Implementations are configuration values (hyperparameters);
/// fitting never mutates them, it returns a new fitted model.
pub trait Regressor {
    type Fitted: Predictor;

    /// Fit against an `n × f` feature matrix and an `n` target vector.
    fn fit(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> ModelResult<Self::Fitted>;
}

// ─── Predictor ────────────────────────────────────────────────────────────────
/// The inference half of the regressor capability.
pub trait Predictor {
    /// Number of features the model was fitted on.
    fn n_features(&self) -> usize;

    /// Predict a single row laid out in feature-order-contract order.
    fn predict_row(&self, row: &[f64]) -> f64;
}
