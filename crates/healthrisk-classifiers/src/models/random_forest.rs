use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::classifier_trait::{ClassifierModel, FeatureWeights};
use crate::models::tree::{BinMapper, GiniGrower, GiniParams, TreeNode};
use crate::models::utils::{check_fit_input, check_predict_input, not_fitted};

/// Bagged Gini trees with `sqrt(n_features)` candidate features per split.
///
/// Every tree draws its bootstrap sample and feature subsets from its own
/// generator seeded with `random_state + tree_index`, so the fitted forest
/// does not depend on how rayon schedules the trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_bins: usize,
    pub random_state: u64,
    trees: Vec<TreeNode>,
    importances: Vec<f64>,
    n_features: usize,
}

impl RandomForest {
    pub fn new(
        n_estimators: usize,
        max_depth: Option<usize>,
        min_samples_split: usize,
        min_samples_leaf: usize,
        max_bins: usize,
        random_state: u64,
    ) -> Self {
        RandomForest {
            n_estimators,
            max_depth,
            min_samples_split,
            min_samples_leaf,
            max_bins,
            random_state,
            trees: Vec::new(),
            importances: Vec::new(),
            n_features: 0,
        }
    }

    pub fn trees(&self) -> &[TreeNode] {
        &self.trees
    }
}

fn normalize(v: &mut [f64]) {
    let total: f64 = v.iter().sum();
    if total > 0.0 {
        v.iter_mut().for_each(|x| *x /= total);
    }
}

impl ClassifierModel for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &[i32]) -> Result<()> {
        check_fit_input(x, y)?;
        let (n, p) = x.dim();
        let mapper = BinMapper::fit(x, self.max_bins);
        let binned = mapper.transform(x);
        let params = GiniParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: ((p as f64).sqrt() as usize).max(1),
        };

        let fitted: Vec<(TreeNode, Vec<f64>)> = (0..self.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.wrapping_add(t as u64));
                let mut weights = vec![0.0; n];
                for _ in 0..n {
                    weights[rng.gen_range(0..n)] += 1.0;
                }
                let rows: Vec<usize> = (0..n).filter(|&i| weights[i] > 0.0).collect();

                let mut grower = GiniGrower {
                    binned: &binned,
                    mapper: &mapper,
                    y,
                    weights: &weights,
                    params,
                    rng: &mut rng,
                    importances: vec![0.0; p],
                };
                let tree = grower.grow(&rows, 0);
                let mut imp = grower.importances;
                normalize(&mut imp);
                (tree, imp)
            })
            .collect();

        let mut importances = vec![0.0; p];
        for (_, imp) in &fitted {
            for (acc, v) in importances.iter_mut().zip(imp) {
                *acc += v;
            }
        }
        normalize(&mut importances);

        self.trees = fitted.into_iter().map(|(t, _)| t).collect();
        self.importances = importances;
        self.n_features = p;
        log::trace!(
            "Random forest fitted {} trees (max depth {})",
            self.trees.len(),
            self.trees.iter().map(|t| t.depth()).max().unwrap_or(0)
        );
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(not_fitted(self.name()));
        }
        check_predict_input(x, self.n_features)?;
        let n_trees = self.trees.len() as f64;
        let probs: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / n_trees
            })
            .collect();
        Ok(Array1::from_vec(probs))
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
        "Random Forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> (Array2<f64>, Vec<i32>) {
        // Feature 0 separates the classes, feature 1 is noise.
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for i in 0..60 {
            let label = (i % 2) as i32;
            let signal = if label == 1 { 3.0 } else { -3.0 } + (i % 7) as f64 * 0.1;
            let noise = ((i * 37) % 11) as f64;
            rows.extend_from_slice(&[signal, noise]);
            y.push(label);
        }
        (Array2::from_shape_vec((60, 2), rows).unwrap(), y)
    }

    #[test]
    fn learns_separable_data() {
        let (x, y) = blobs();
        let mut rf = RandomForest::new(20, None, 2, 1, 255, 42);
        rf.fit(&x, &y).unwrap();
        let pred = rf.predict(&x).unwrap();
        let correct = pred.iter().zip(&y).filter(|(p, t)| **p == **t).count();
        assert_eq!(correct, 60);
    }

    #[test]
    fn importances_favor_signal_and_sum_to_one() {
        let (x, y) = blobs();
        let mut rf = RandomForest::new(30, None, 2, 1, 255, 42);
        rf.fit(&x, &y).unwrap();
        match rf.feature_weights() {
            FeatureWeights::Importances(imp) => {
                assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
                assert!(imp[0] > imp[1]);
            }
            other => panic!("unexpected weights {:?}", other),
        }
    }

    #[test]
    fn same_seed_gives_same_forest() {
        let (x, y) = blobs();
        let mut a = RandomForest::new(10, None, 2, 1, 255, 7);
        let mut b = RandomForest::new(10, None, 2, 1, 255, 7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }
}
