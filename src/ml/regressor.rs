// ============================================================
// Layer 5 — Pluggable Regressor
// ============================================================
// Three interchangeable algorithms behind one capability:
//
//   RegressorKind   — WHICH algorithm + its hyperparameters
//                     (part of the training configuration)
//   FittedRegressor — the fitted model, whatever the algorithm
//                     (stored in the Artifact Bundle)
//
// The trainer only ever calls `RegressorKind::fit` and the
// inferencer only ever calls `FittedRegressor::predict_row`,
// so neither changes when an algorithm is added.

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::domain::error::ModelResult;
use crate::domain::traits::{Predictor, Regressor};
use crate::ml::boosted::{BoostedModel, BoostedTrees};
use crate::ml::linear::{LeastSquares, LinearModel};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressorKind {
    /// Ordinary least squares
    Linear,
    /// L2-regularised least squares
    Ridge { alpha: f64 },
    /// Gradient-boosted regression trees
    BoostedTrees(BoostedTrees),
}

impl RegressorKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear          => "linear",
            Self::Ridge { .. }    => "ridge",
            Self::BoostedTrees(_) => "boosted_trees",
        }
    }
}

impl Default for RegressorKind {
    fn default() -> Self {
        Self::Linear
    }
}

impl Regressor for RegressorKind {
    type Fitted = FittedRegressor;

    fn fit(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> ModelResult<FittedRegressor> {
        match self {
            Self::Linear => LeastSquares::ordinary().fit(x, y).map(FittedRegressor::Linear),
            Self::Ridge { alpha } => LeastSquares::ridge(*alpha).fit(x, y).map(FittedRegressor::Linear),
            Self::BoostedTrees(params) => params.fit(x, y).map(FittedRegressor::BoostedTrees),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedRegressor {
    Linear(LinearModel),
    BoostedTrees(BoostedModel),
}

impl Predictor for FittedRegressor {
    fn n_features(&self) -> usize {
        match self {
            Self::Linear(m)       => m.n_features(),
            Self::BoostedTrees(m) => m.n_features(),
        }
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            Self::Linear(m)       => m.predict_row(row),
            Self::BoostedTrees(m) => m.predict_row(row),
        }
    }
}
