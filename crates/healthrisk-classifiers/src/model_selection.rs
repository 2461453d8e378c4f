//! Stratified k-fold splitting and cross-validated scoring.
use std::fmt;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data_handling::Frame;
use crate::error::{Result, RiskError};
use crate::metrics;
use crate::pipeline::RiskPipeline;

/// One train/validation partition of the row indices.
#[derive(Debug, Clone, PartialEq)]
pub struct CvSplit {
    pub fold_idx: usize,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// K folds whose class ratios match the full label vector as closely as the
/// class counts allow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StratifiedKFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub random_state: u64,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize, shuffle: bool, random_state: u64) -> Self {
        StratifiedKFold {
            n_splits,
            shuffle,
            random_state,
        }
    }

    /// Every row lands in exactly one validation fold. Members of each class
    /// are (optionally shuffled, then) dealt round-robin across the folds,
    /// continuing where the previous class stopped so fold sizes differ by
    /// at most one.
    pub fn split(&self, y: &[i32]) -> Result<Vec<CvSplit>> {
        let n = y.len();
        if self.n_splits < 2 {
            return Err(RiskError::invalid_state(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }
        if self.n_splits > n {
            return Err(RiskError::invalid_state(format!(
                "cannot make {} folds from {} samples",
                self.n_splits, n
            )));
        }

        let mut classes: Vec<i32> = y.to_vec();
        classes.sort_unstable();
        classes.dedup();

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut fold_of = vec![0usize; n];
        let mut next_fold = 0;
        for class in classes {
            let mut members: Vec<usize> = (0..n).filter(|&i| y[i] == class).collect();
            if members.len() < self.n_splits {
                log::warn!(
                    "class {} has only {} members, fewer than n_splits={}",
                    class,
                    members.len(),
                    self.n_splits
                );
            }
            if self.shuffle {
                members.shuffle(&mut rng);
            }
            for i in members {
                fold_of[i] = next_fold;
                next_fold = (next_fold + 1) % self.n_splits;
            }
        }

        Ok((0..self.n_splits)
            .map(|fold_idx| {
                let (test_indices, train_indices): (Vec<usize>, Vec<usize>) =
                    (0..n).partition(|&i| fold_of[i] == fold_idx);
                CvSplit {
                    fold_idx,
                    train_indices,
                    test_indices,
                }
            })
            .collect())
    }
}

/// Score used by [`cross_val_score`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scoring {
    F1,
    Recall,
    Accuracy,
    RocAuc,
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scoring::F1 => "f1",
            Scoring::Recall => "recall",
            Scoring::Accuracy => "accuracy",
            Scoring::RocAuc => "roc_auc",
        };
        write!(f, "{}", s)
    }
}

fn score_fold(pipeline: &RiskPipeline, x: &Frame, y: &[i32], scoring: Scoring) -> Result<f64> {
    match scoring {
        Scoring::RocAuc => {
            let prob = pipeline.predict_proba(x)?.to_vec();
            metrics::roc_auc_score(y, &prob)
        }
        other => {
            let pred = pipeline.predict(x)?.to_vec();
            match other {
                Scoring::Recall => metrics::recall(y, &pred),
                Scoring::Accuracy => metrics::accuracy(y, &pred),
                _ => metrics::f1_score(y, &pred),
            }
        }
    }
}

/// Fit a fresh copy of `pipeline` on each training fold and score it on the
/// matching validation fold. Scores come back in fold order; the input
/// pipeline is left untouched.
pub fn cross_val_score(
    pipeline: &RiskPipeline,
    x: &Frame,
    y: &[i32],
    cv: &StratifiedKFold,
    scoring: Scoring,
) -> Result<Vec<f64>> {
    if x.n_rows() != y.len() {
        return Err(RiskError::invalid_state(format!(
            "cross-validation got {} rows but {} labels",
            x.n_rows(),
            y.len()
        )));
    }
    let splits = cv.split(y)?;
    splits
        .par_iter()
        .map(|split| {
            let mut fold_pipeline = pipeline.clone();
            let x_train = x.select_rows(&split.train_indices);
            let y_train: Vec<i32> = split.train_indices.iter().map(|&i| y[i]).collect();
            fold_pipeline.fit(&x_train, &y_train)?;

            let x_val = x.select_rows(&split.test_indices);
            let y_val: Vec<i32> = split.test_indices.iter().map(|&i| y[i]).collect();
            let score = score_fold(&fold_pipeline, &x_val, &y_val, scoring)?;
            log::debug!(
                "[{}] fold {} {} = {:.4}",
                pipeline.name,
                split.fold_idx + 1,
                scoring,
                score
            );
            Ok(score)
        })
        .collect()
}
