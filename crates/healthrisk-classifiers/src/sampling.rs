//! SMOTE oversampling for binary labels.
//!
//! Synthetic minority rows are placed on the segment between a minority row
//! and one of its `k` nearest minority neighbours, until both classes have
//! the same count. Original rows come first in the output, synthetic rows
//! after them.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndarray::{Array2, ArrayView1, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// Ordered float for BinaryHeap-based partial sort
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Smote {
    pub k_neighbors: usize,
    pub random_state: u64,
}

impl Smote {
    pub fn new(random_state: u64) -> Self {
        Smote {
            k_neighbors: 5,
            random_state,
        }
    }

    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    /// Indices (into `minority`) of the `k` nearest rows of every minority row,
    /// nearest first, excluding the row itself.
    fn neighbors(minority: &Array2<f64>, k: usize) -> Vec<Vec<usize>> {
        (0..minority.nrows())
            .into_par_iter()
            .map(|i| {
                let point = minority.row(i);
                let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);
                for (j, other) in minority.outer_iter().enumerate() {
                    if j == i {
                        continue;
                    }
                    let d = DistIdx(squared_distance(point, other), j);
                    if heap.len() < k {
                        heap.push(d);
                    } else if heap.peek().is_some_and(|top| d < *top) {
                        heap.pop();
                        heap.push(d);
                    }
                }
                heap.into_sorted_vec().into_iter().map(|DistIdx(_, j)| j).collect()
            })
            .collect()
    }

    /// Oversample the minority class of `y` up to the majority count.
    pub fn fit_resample(&self, x: &Array2<f64>, y: &[i32]) -> Result<(Array2<f64>, Vec<i32>)> {
        if x.nrows() != y.len() {
            return Err(RiskError::invalid_state(format!(
                "SMOTE got {} rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        let n_pos = y.iter().filter(|&&v| v == 1).count();
        let n_neg = y.len() - n_pos;
        if n_pos == 0 || n_neg == 0 {
            return Err(RiskError::invalid_state(
                "SMOTE needs samples from both classes",
            ));
        }
        if n_pos == n_neg {
            return Ok((x.clone(), y.to_vec()));
        }

        let (minority_label, n_min, n_maj) = if n_pos < n_neg {
            (1, n_pos, n_neg)
        } else {
            (0, n_neg, n_pos)
        };
        if n_min < 2 {
            return Err(RiskError::invalid_state(format!(
                "SMOTE needs at least 2 minority samples, found {}",
                n_min
            )));
        }
        let k = self.k_neighbors.min(n_min - 1);
        if k < self.k_neighbors {
            log::warn!(
                "SMOTE k_neighbors reduced from {} to {} (only {} minority samples)",
                self.k_neighbors,
                k,
                n_min
            );
        }

        let minority_idx: Vec<usize> = (0..y.len()).filter(|&i| y[i] == minority_label).collect();
        let minority = x.select(Axis(0), &minority_idx);
        let nn = Self::neighbors(&minority, k);

        let n_new = n_maj - n_min;
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut synthetic = Array2::<f64>::zeros((n_new, x.ncols()));
        for mut out in synthetic.outer_iter_mut() {
            let row = rng.gen_range(0..n_min);
            let neighbor = nn[row][rng.gen_range(0..k)];
            let gap: f64 = rng.gen();
            let base = minority.row(row);
            let other = minority.row(neighbor);
            for (c, v) in out.iter_mut().enumerate() {
                *v = base[c] + gap * (other[c] - base[c]);
            }
        }

        let resampled = ndarray::concatenate(Axis(0), &[x.view(), synthetic.view()])
            .map_err(|e| RiskError::invalid_state(format!("SMOTE assembly failed: {}", e)))?;
        let mut labels = y.to_vec();
        labels.extend(std::iter::repeat(minority_label).take(n_new));

        log::debug!(
            "SMOTE generated {} synthetic samples for class {}",
            n_new,
            minority_label
        );
        Ok((resampled, labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn imbalanced() -> (Array2<f64>, Vec<i32>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.2],
            [0.2, 0.1],
            [0.3, 0.3],
            [0.4, 0.2],
            [0.5, 0.5],
            [5.0, 5.0],
            [5.5, 5.0],
            [5.0, 5.5]
        ];
        (x, vec![0, 0, 0, 0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn balances_classes_and_keeps_originals_first() {
        let (x, y) = imbalanced();
        let (xr, yr) = Smote::new(42).fit_resample(&x, &y).unwrap();
        assert_eq!(xr.nrows(), 12);
        assert_eq!(yr.iter().filter(|&&v| v == 1).count(), 6);
        assert_eq!(xr.slice(ndarray::s![..9, ..]), x);
        assert_eq!(&yr[..9], &y[..]);
    }

    #[test]
    fn synthetic_rows_lie_inside_the_minority_hull() {
        let (x, y) = imbalanced();
        let (xr, _) = Smote::new(42).fit_resample(&x, &y).unwrap();
        for r in 9..12 {
            assert!(xr[[r, 0]] >= 5.0 && xr[[r, 0]] <= 5.5);
            assert!(xr[[r, 1]] >= 5.0 && xr[[r, 1]] <= 5.5);
        }
    }

    #[test]
    fn deterministic_for_a_seed() {
        let (x, y) = imbalanced();
        let a = Smote::new(3).fit_resample(&x, &y).unwrap();
        let b = Smote::new(3).fit_resample(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn balanced_input_is_untouched() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = vec![0, 1, 0, 1];
        let (xr, yr) = Smote::new(42).fit_resample(&x, &y).unwrap();
        assert_eq!(xr, x);
        assert_eq!(yr, y);
    }

    #[test]
    fn rejects_single_minority_sample() {
        let x = array![[0.0], [1.0], [2.0]];
        assert!(Smote::new(42).fit_resample(&x, &[0, 0, 1]).is_err());
        assert!(Smote::new(42).fit_resample(&x, &[0, 0, 0]).is_err());
    }
}
