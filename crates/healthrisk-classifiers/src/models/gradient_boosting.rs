use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::classifier_trait::{ClassifierModel, FeatureWeights};
use crate::models::tree::{BinMapper, BoostGrower, BoostParams, TreeNode};
use crate::models::utils::{check_fit_input, check_predict_input, not_fitted, sigmoid};

/// Newton-boosted regression trees on the logistic loss.
///
/// Each round fits a tree to the first and second derivatives of the loss
/// at the current margins; leaf weights are `-G / (H + lambda)` shrunk by
/// the learning rate. Importances are the average split gain per feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub reg_lambda: f64,
    pub min_child_weight: f64,
    pub max_bins: usize,
    /// Initial probability; its logit is the starting margin.
    pub base_score: f64,
    /// Recorded for reproducibility; row and column sampling are not used.
    pub random_state: u64,
    trees: Vec<TreeNode>,
    importances: Vec<f64>,
    n_features: usize,
}

impl GradientBoosting {
    pub fn new(
        n_estimators: usize,
        learning_rate: f64,
        max_depth: usize,
        reg_lambda: f64,
        min_child_weight: f64,
        max_bins: usize,
        random_state: u64,
    ) -> Self {
        GradientBoosting {
            n_estimators,
            learning_rate,
            max_depth,
            reg_lambda,
            min_child_weight,
            max_bins,
            base_score: 0.5,
            random_state,
            trees: Vec::new(),
            importances: Vec::new(),
            n_features: 0,
        }
    }

    fn base_margin(&self) -> f64 {
        let p = self.base_score.clamp(1e-6, 1.0 - 1e-6);
        (p / (1.0 - p)).ln()
    }

    /// Raw margins (log-odds) for every row.
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(not_fitted(self.name()));
        }
        check_predict_input(x, self.n_features)?;
        let base = self.base_margin();
        let margins: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                base + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
            })
            .collect();
        Ok(Array1::from_vec(margins))
    }
}

impl ClassifierModel for GradientBoosting {
    fn fit(&mut self, x: &Array2<f64>, y: &[i32]) -> Result<()> {
        check_fit_input(x, y)?;
        let (n, p) = x.dim();
        let mapper = BinMapper::fit(x, self.max_bins);
        let binned = mapper.transform(x);
        let rows: Vec<usize> = (0..n).collect();
        let params = BoostParams {
            max_depth: self.max_depth,
            reg_lambda: self.reg_lambda,
            min_child_weight: self.min_child_weight,
        };

        let mut margins = vec![self.base_margin(); n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut gain = vec![0.0; p];
        let mut splits = vec![0usize; p];
        let mut trees = Vec::with_capacity(self.n_estimators);

        for round in 0..self.n_estimators {
            for i in 0..n {
                let prob = sigmoid(margins[i]);
                grad[i] = prob - y[i] as f64;
                hess[i] = (prob * (1.0 - prob)).max(1e-16);
            }

            let mut grower = BoostGrower {
                binned: &binned,
                mapper: &mapper,
                grad: &grad,
                hess: &hess,
                params,
                gain: std::mem::take(&mut gain),
                splits: std::mem::take(&mut splits),
            };
            let mut tree = grower.grow(&rows, 0);
            gain = grower.gain;
            splits = grower.splits;
            tree.scale_leaves(self.learning_rate);

            margins
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, m)| *m += tree.predict(x.row(i)));

            if round % 25 == 0 {
                log::trace!("Boosting round {} (depth {})", round, tree.depth());
            }
            trees.push(tree);
        }

        let mut importances: Vec<f64> = gain
            .iter()
            .zip(&splits)
            .map(|(&g, &c)| if c > 0 { g / c as f64 } else { 0.0 })
            .collect();
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        self.trees = trees;
        self.importances = importances;
        self.n_features = p;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn feature_weights(&self) -> FeatureWeights {
        if self.trees.is_empty() {
            FeatureWeights::Unavailable
        } else {
            FeatureWeights::Importances(self.importances.clone())
        }
    }

    fn name(&self) -> &str {
        "XGBoost"
    }
}
