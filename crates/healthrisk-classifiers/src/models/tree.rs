//! Histogram-based tree growing shared by the forest and the boosted model.
//!
//! Features are discretised once per fit into at most `max_bins` ordered
//! bins ([`BinMapper`]); split search then scans per-node histograms instead
//! of re-sorting samples. Split thresholds are stored in raw feature units,
//! so fitted trees predict directly on unbinned rows.

use ndarray::{Array2, ArrayView1};
use rand::seq::index::sample;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Per-feature bin boundaries learned from a training matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinMapper {
    /// Ascending thresholds; a value `v` falls in bin `b` when
    /// `thresholds[b - 1] < v <= thresholds[b]`.
    thresholds: Vec<Vec<f64>>,
}

impl BinMapper {
    pub fn fit(x: &Array2<f64>, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, 256);
        let thresholds = x
            .columns()
            .into_iter()
            .map(|col| {
                let mut values: Vec<f64> = col.iter().copied().filter(|v| !v.is_nan()).collect();
                values.sort_by(|a, b| a.total_cmp(b));
                let mut unique = values.clone();
                unique.dedup();

                if unique.len() <= max_bins {
                    unique.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
                } else {
                    let n = values.len();
                    let mut cuts: Vec<f64> = (1..max_bins)
                        .map(|q| values[q * n / max_bins])
                        .collect();
                    cuts.dedup();
                    // The largest value must land in the last bin.
                    if cuts.last().copied() == values.last().copied() {
                        cuts.pop();
                    }
                    cuts
                }
            })
            .collect();
        BinMapper { thresholds }
    }

    pub fn n_features(&self) -> usize {
        self.thresholds.len()
    }

    pub fn n_bins(&self, feature: usize) -> usize {
        self.thresholds[feature].len() + 1
    }

    pub fn threshold(&self, feature: usize, bin: usize) -> f64 {
        self.thresholds[feature][bin]
    }

    fn bin(&self, feature: usize, value: f64) -> u8 {
        if value.is_nan() {
            return 0;
        }
        self.thresholds[feature].partition_point(|&t| t < value) as u8
    }

    /// Bin every value; the result is stored column by column.
    pub fn transform(&self, x: &Array2<f64>) -> BinnedMatrix {
        let columns = x
            .columns()
            .into_iter()
            .enumerate()
            .map(|(f, col)| col.iter().map(|&v| self.bin(f, v)).collect())
            .collect();
        BinnedMatrix { columns }
    }
}

/// Column-major bin indices.
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    columns: Vec<Vec<u8>>,
}

impl BinnedMatrix {
    #[inline]
    fn get(&self, row: usize, feature: usize) -> usize {
        self.columns[feature][row] as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    pub fn predict(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    // NaN goes left, matching bin 0.
                    node = if row[*feature] > *threshold { right } else { left };
                }
            }
        }
    }

    pub fn scale_leaves(&mut self, factor: f64) {
        match self {
            TreeNode::Leaf { value } => *value *= factor,
            TreeNode::Split { left, right, .. } => {
                left.scale_leaves(factor);
                right.scale_leaves(factor);
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

fn partition(binned: &BinnedMatrix, rows: &[usize], feature: usize, bin: usize) -> (Vec<usize>, Vec<usize>) {
    rows.iter().partition(|&&r| binned.get(r, feature) <= bin)
}

// ---------------------------------------------------------------------------
// Gini trees (random forest)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct GiniParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: usize,
}

#[inline]
fn gini(weight: f64, positive: f64) -> f64 {
    if weight <= 0.0 {
        return 0.0;
    }
    let p = positive / weight;
    2.0 * p * (1.0 - p)
}

pub struct GiniGrower<'a, R: Rng> {
    pub binned: &'a BinnedMatrix,
    pub mapper: &'a BinMapper,
    pub y: &'a [i32],
    /// Bootstrap multiplicity per row.
    pub weights: &'a [f64],
    pub params: GiniParams,
    pub rng: &'a mut R,
    /// Weighted impurity decrease accumulated per feature.
    pub importances: Vec<f64>,
}

struct GiniSplit {
    feature: usize,
    bin: usize,
    child_impurity: f64,
}

impl<'a, R: Rng> GiniGrower<'a, R> {
    pub fn grow(&mut self, rows: &[usize], depth: usize) -> TreeNode {
        let (w, pos) = rows.iter().fold((0.0, 0.0), |(w, p), &r| {
            let rw = self.weights[r];
            (w + rw, p + rw * self.y[r] as f64)
        });
        let impurity = gini(w, pos);
        let leaf = TreeNode::Leaf {
            value: if w > 0.0 { pos / w } else { 0.0 },
        };

        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if depth_reached
            || w < self.params.min_samples_split as f64
            || w < 2.0 * self.params.min_samples_leaf as f64
            || impurity <= 1e-12
        {
            return leaf;
        }

        let split = match self.best_split(rows) {
            Some(s) if w * impurity - s.child_impurity > 1e-12 => s,
            _ => return leaf,
        };
        self.importances[split.feature] += w * impurity - split.child_impurity;

        let (left_rows, right_rows) = partition(self.binned, rows, split.feature, split.bin);
        let left = self.grow(&left_rows, depth + 1);
        let right = self.grow(&right_rows, depth + 1);
        TreeNode::Split {
            feature: split.feature,
            threshold: self.mapper.threshold(split.feature, split.bin),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn best_split(&mut self, rows: &[usize]) -> Option<GiniSplit> {
        let n_features = self.mapper.n_features();
        let k = self.params.max_features.clamp(1, n_features);
        let candidates = sample(&mut *self.rng, n_features, k).into_vec();
        let min_leaf = self.params.min_samples_leaf as f64;

        let mut best: Option<GiniSplit> = None;
        for feature in candidates {
            let n_bins = self.mapper.n_bins(feature);
            if n_bins < 2 {
                continue;
            }
            let mut hist_w = vec![0.0; n_bins];
            let mut hist_p = vec![0.0; n_bins];
            for &r in rows {
                let b = self.binned.get(r, feature);
                let rw = self.weights[r];
                hist_w[b] += rw;
                hist_p[b] += rw * self.y[r] as f64;
            }
            let total_w: f64 = hist_w.iter().sum();
            let total_p: f64 = hist_p.iter().sum();

            let (mut lw, mut lp) = (0.0, 0.0);
            for bin in 0..n_bins - 1 {
                lw += hist_w[bin];
                lp += hist_p[bin];
                let (rw, rp) = (total_w - lw, total_p - lp);
                if lw < min_leaf || rw < min_leaf || lw <= 0.0 || rw <= 0.0 {
                    continue;
                }
                let child = lw * gini(lw, lp) + rw * gini(rw, rp);
                if best.as_ref().map_or(true, |b| child < b.child_impurity) {
                    best = Some(GiniSplit {
                        feature,
                        bin,
                        child_impurity: child,
                    });
                }
            }
        }
        best
    }
}

// ---------------------------------------------------------------------------
// Second-order boosted trees
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct BoostParams {
    pub max_depth: usize,
    pub reg_lambda: f64,
    pub min_child_weight: f64,
}

pub struct BoostGrower<'a> {
    pub binned: &'a BinnedMatrix,
    pub mapper: &'a BinMapper,
    pub grad: &'a [f64],
    pub hess: &'a [f64],
    pub params: BoostParams,
    /// Total split gain per feature.
    pub gain: Vec<f64>,
    /// Number of splits per feature.
    pub splits: Vec<usize>,
}

fn leaf_weight(g: f64, h: f64, lambda: f64) -> f64 {
    -g / (h + lambda)
}

fn score(g: f64, h: f64, lambda: f64) -> f64 {
    g * g / (h + lambda)
}

impl<'a> BoostGrower<'a> {
    pub fn grow(&mut self, rows: &[usize], depth: usize) -> TreeNode {
        let (g, h) = rows
            .iter()
            .fold((0.0, 0.0), |(g, h), &r| (g + self.grad[r], h + self.hess[r]));
        let lambda = self.params.reg_lambda;
        let leaf = TreeNode::Leaf {
            value: leaf_weight(g, h, lambda),
        };
        if depth >= self.params.max_depth || rows.len() < 2 {
            return leaf;
        }

        let parent = score(g, h, lambda);
        let mut best: Option<(usize, usize, f64)> = None;
        for feature in 0..self.mapper.n_features() {
            let n_bins = self.mapper.n_bins(feature);
            if n_bins < 2 {
                continue;
            }
            let mut hist_g = vec![0.0; n_bins];
            let mut hist_h = vec![0.0; n_bins];
            for &r in rows {
                let b = self.binned.get(r, feature);
                hist_g[b] += self.grad[r];
                hist_h[b] += self.hess[r];
            }
            let (mut gl, mut hl) = (0.0, 0.0);
            for bin in 0..n_bins - 1 {
                gl += hist_g[bin];
                hl += hist_h[bin];
                let (gr, hr) = (g - gl, h - hl);
                if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                    continue;
                }
                let gain = 0.5 * (score(gl, hl, lambda) + score(gr, hr, lambda) - parent);
                if gain > 1e-12 && best.map_or(true, |(_, _, b)| gain > b) {
                    best = Some((feature, bin, gain));
                }
            }
        }

        let Some((feature, bin, gain)) = best else {
            return leaf;
        };
        self.gain[feature] += gain;
        self.splits[feature] += 1;

        let (left_rows, right_rows) = partition(self.binned, rows, feature, bin);
        let left = self.grow(&left_rows, depth + 1);
        let right = self.grow(&right_rows, depth + 1);
        TreeNode::Split {
            feature,
            threshold: self.mapper.threshold(feature, bin),
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn bins_are_ordered_and_consistent_with_thresholds() {
        let x = array![[1.0], [2.0], [2.0], [5.0]];
        let mapper = BinMapper::fit(&x, 255);
        assert_eq!(mapper.n_bins(0), 3);
        let binned = mapper.transform(&x);
        assert_eq!(
            (0..4).map(|r| binned.get(r, 0)).collect::<Vec<_>>(),
            vec![0, 1, 1, 2]
        );
        for r in 0..4 {
            let b = binned.get(r, 0);
            if b < mapper.n_bins(0) - 1 {
                assert!(x[[r, 0]] <= mapper.threshold(0, b));
            }
        }
    }

    #[test]
    fn quantile_bins_respect_the_limit() {
        let x = Array2::from_shape_fn((1000, 1), |(i, _)| i as f64);
        let mapper = BinMapper::fit(&x, 16);
        assert!(mapper.n_bins(0) <= 16);
        let binned = mapper.transform(&x);
        assert_eq!(binned.get(999, 0), mapper.n_bins(0) - 1);
    }

    #[test]
    fn gini_tree_fits_a_threshold() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [10.0], [11.0], [12.0], [13.0]];
        let y = [0, 0, 0, 0, 1, 1, 1, 1];
        let mapper = BinMapper::fit(&x, 255);
        let binned = mapper.transform(&x);
        let weights = vec![1.0; 8];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut grower = GiniGrower {
            binned: &binned,
            mapper: &mapper,
            y: &y,
            weights: &weights,
            params: GiniParams {
                max_depth: None,
                min_samples_split: 2,
                min_samples_leaf: 1,
                max_features: 1,
            },
            rng: &mut rng,
            importances: vec![0.0],
        };
        let rows: Vec<usize> = (0..8).collect();
        let tree = grower.grow(&rows, 0);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict(array![2.5].view()), 0.0);
        assert_eq!(tree.predict(array![9.0].view()), 1.0);
        assert!(grower.importances[0] > 0.0);
    }

    #[test]
    fn boost_tree_leaf_weights_follow_gradients() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let grad = [0.5, 0.5, -0.5, -0.5];
        let hess = [0.25; 4];
        let mapper = BinMapper::fit(&x, 255);
        let binned = mapper.transform(&x);
        let mut grower = BoostGrower {
            binned: &binned,
            mapper: &mapper,
            grad: &grad,
            hess: &hess,
            params: BoostParams {
                max_depth: 1,
                reg_lambda: 1.0,
                min_child_weight: 0.0,
            },
            gain: vec![0.0],
            splits: vec![0],
        };
        let tree = grower.grow(&[0, 1, 2, 3], 0);
        // left leaf: -(1.0) / (0.5 + 1.0)
        assert!((tree.predict(array![0.5].view()) + 1.0 / 1.5).abs() < 1e-12);
        assert!((tree.predict(array![2.5].view()) - 1.0 / 1.5).abs() < 1e-12);
        assert_eq!(grower.splits[0], 1);
    }
}
