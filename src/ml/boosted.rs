// ============================================================
// Layer 5 — Gradient-Boosted Regression Trees
// ============================================================
// Thin adapter over the `gbdt` crate so boosted trees plug
// into the same Regressor / Predictor capability as the
// linear models.
//
// gbdt works in f32 and on its own `Data` rows, so the
// adapter converts the f64 matrix row by row. Sampling
// ratios are pinned to 1.0: every tree sees every row and
// every feature, which keeps fitting deterministic.
//
// Reference: gbdt crate documentation

use std::fmt;

use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::domain::error::{ModelError, ModelResult};
use crate::domain::traits::{Predictor, Regressor};

/// Boosting hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostedTrees {
    pub iterations:    usize,
    pub max_depth:     u32,
    pub shrinkage:     f32,
    pub min_leaf_size: usize,
}

impl Default for BoostedTrees {
    fn default() -> Self {
        Self {
            iterations:    100,
            max_depth:     3,
            shrinkage:     0.1,
            min_leaf_size: 1,
        }
    }
}

impl BoostedTrees {
    fn config(&self, n_features: usize) -> Config {
        let mut cfg = Config::new();
        cfg.set_feature_size(n_features);
        cfg.set_max_depth(self.max_depth);
        cfg.set_iterations(self.iterations);
        cfg.set_shrinkage(self.shrinkage);
        cfg.set_min_leaf_size(self.min_leaf_size);
        cfg.set_loss("SquaredError");
        cfg.set_data_sample_ratio(1.0);
        cfg.set_feature_sample_ratio(1.0);
        cfg.set_debug(false);
        cfg
    }
}

/// A fitted tree ensemble plus the width it was trained on.
#[derive(Serialize, Deserialize)]
pub struct BoostedModel {
    n_features: usize,
    model:      GBDT,
}

impl fmt::Debug for BoostedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoostedModel")
            .field("n_features", &self.n_features)
            .finish_non_exhaustive()
    }
}

impl Regressor for BoostedTrees {
    type Fitted = BoostedModel;

    fn fit(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> ModelResult<BoostedModel> {
        let (n, f) = x.dim();
        if n == 0 {
            return Err(ModelError::data("cannot fit boosted trees on zero rows"));
        }
        if y.len() != n {
            return Err(ModelError::data(format!(
                "feature matrix has {n} rows but target has {}",
                y.len()
            )));
        }
        if self.iterations == 0 || self.max_depth == 0 {
            return Err(ModelError::data("boosted trees need at least one iteration and depth 1"));
        }

        let mut train: DataVec = x
            .rows()
            .into_iter()
            .zip(y.iter())
            .map(|(row, &label)| {
                let features = row.iter().map(|&v| v as f32).collect();
                Data::new_training_data(features, 1.0, label as f32, None)
            })
            .collect();

        let mut model = GBDT::new(&self.config(f));
        model.fit(&mut train);

        tracing::debug!(
            "Boosted trees fit: {} iterations, depth {}, {} rows",
            self.iterations,
            self.max_depth,
            n
        );

        Ok(BoostedModel { n_features: f, model })
    }
}

impl Predictor for BoostedModel {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        let features = row.iter().map(|&v| v as f32).collect();
        let test: DataVec = vec![Data::new_test_data(features, None)];
        self.model
            .predict(&test)
            .first()
            .map(|&p| p as f64)
            .unwrap_or(f64::NAN)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn step_data() -> (Array2<f64>, Array1<f64>) {
        // price jumps from 10 to 20 once x crosses 5
        let xs: Vec<f64> = (0..10).map(f64::from).collect();
        let x  = Array2::from_shape_vec((10, 1), xs.clone()).unwrap();
        let y  = xs.iter().map(|&v| if v < 5.0 { 10.0 } else { 20.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_learns_a_step() {
        let (x, y) = step_data();
        let params = BoostedTrees { iterations: 50, max_depth: 2, shrinkage: 0.3, min_leaf_size: 1 };
        let model  = params.fit(x.view(), y.view()).unwrap();
        let low    = model.predict_row(&[1.0]);
        let high   = model.predict_row(&[8.0]);
        assert!(low.is_finite() && high.is_finite());
        assert!(low < high, "expected {low} < {high}");
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let (x, y) = step_data();
        let model  = BoostedTrees::default().fit(x.view(), y.view()).unwrap();
        assert_eq!(model.predict_row(&[3.0]), model.predict_row(&[3.0]));
    }

    #[test]
    fn test_serde_round_trip_predicts_the_same() {
        let (x, y) = step_data();
        let model  = BoostedTrees::default().fit(x.view(), y.view()).unwrap();
        let json   = serde_json::to_string(&model).unwrap();
        let back: BoostedModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back.n_features(), 1);
        assert_eq!(back.predict_row(&[7.0]), model.predict_row(&[7.0]));
    }

    #[test]
    fn test_rejects_zero_iterations() {
        let (x, y) = step_data();
        let params = BoostedTrees { iterations: 0, ..BoostedTrees::default() };
        assert!(params.fit(x.view(), y.view()).is_err());
    }
}
