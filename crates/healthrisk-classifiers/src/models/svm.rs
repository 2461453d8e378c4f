//! RBF-kernel support vector classifier with Platt-calibrated probabilities.
//!
//! The dual problem is solved with SMO over a precomputed kernel matrix, so
//! training sets above `max_train_samples` rows are first reduced to a
//! stratified, seeded subsample. `predict` uses the sign of the decision
//! value; `predict_proba` maps the decision value through a sigmoid whose
//! parameters are fitted on the training decision values.

use ndarray::{Array1, Array2, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data_handling::stratified_partition;
use crate::error::Result;
use crate::models::classifier_trait::{ClassifierModel, FeatureWeights};
use crate::models::utils::{check_fit_input, check_predict_input, not_fitted, sigmoid};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportVectorClassifier {
    pub c: f64,
    pub tol: f64,
    /// Maximum number of full sweeps over the training rows.
    pub max_iter: usize,
    pub max_train_samples: usize,
    pub random_state: u64,
    state: Option<SvcState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SvcState {
    gamma: f64,
    n_features: usize,
    support_vectors: Vec<Vec<f64>>,
    /// `alpha_i * y_i` for every support vector.
    dual_coef: Vec<f64>,
    intercept: f64,
    platt_a: f64,
    platt_b: f64,
}

#[inline]
fn rbf(a: ArrayView1<f64>, b: &[f64], gamma: f64) -> f64 {
    let d2: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    (-gamma * d2).exp()
}

impl SupportVectorClassifier {
    pub fn new(c: f64, tol: f64, max_iter: usize, max_train_samples: usize, random_state: u64) -> Self {
        SupportVectorClassifier {
            c,
            tol,
            max_iter,
            max_train_samples,
            random_state,
            state: None,
        }
    }

    pub fn n_support(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.support_vectors.len())
    }

    /// Signed distance-like score; positive values predict class 1.
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let state = self.state.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        check_predict_input(x, state.n_features)?;
        let values: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                state
                    .support_vectors
                    .iter()
                    .zip(&state.dual_coef)
                    .map(|(sv, &coef)| coef * rbf(row, sv, state.gamma))
                    .sum::<f64>()
                    + state.intercept
            })
            .collect();
        Ok(Array1::from_vec(values))
    }
}

/// Solve the soft-margin dual with sequential minimal optimisation.
/// Returns `(alpha, b)`; `y` holds -1/+1 labels.
fn smo(k: &Array2<f64>, y: &[f64], c: f64, tol: f64, max_iter: usize, rng: &mut ChaCha8Rng) -> (Vec<f64>, f64) {
    let n = y.len();
    let mut alpha = vec![0.0; n];
    let mut b = 0.0;
    // errors[i] = f(x_i) - y_i
    let mut errors: Vec<f64> = y.iter().map(|&v| -v).collect();

    let take_step = |i: usize, j: usize, alpha: &mut [f64], errors: &mut [f64], b: &mut f64| -> bool {
        if i == j {
            return false;
        }
        let (ai, aj) = (alpha[i], alpha[j]);
        let (yi, yj) = (y[i], y[j]);
        let (lo, hi) = if yi != yj {
            ((aj - ai).max(0.0), (c + aj - ai).min(c))
        } else {
            ((ai + aj - c).max(0.0), (ai + aj).min(c))
        };
        if hi - lo < 1e-12 {
            return false;
        }
        let eta = 2.0 * k[[i, j]] - k[[i, i]] - k[[j, j]];
        if eta >= -1e-12 {
            return false;
        }
        let aj_new = (aj - yj * (errors[i] - errors[j]) / eta).clamp(lo, hi);
        if (aj_new - aj).abs() < 1e-8 * (aj_new + aj + 1e-8) {
            return false;
        }
        let ai_new = ai + yi * yj * (aj - aj_new);
        let (dai, daj) = (ai_new - ai, aj_new - aj);

        let b1 = *b - errors[i] - yi * dai * k[[i, i]] - yj * daj * k[[i, j]];
        let b2 = *b - errors[j] - yi * dai * k[[i, j]] - yj * daj * k[[j, j]];
        let b_new = if ai_new > 0.0 && ai_new < c {
            b1
        } else if aj_new > 0.0 && aj_new < c {
            b2
        } else {
            0.5 * (b1 + b2)
        };
        let db = b_new - *b;

        for (m, e) in errors.iter_mut().enumerate() {
            *e += yi * dai * k[[i, m]] + yj * daj * k[[j, m]] + db;
        }
        alpha[i] = ai_new;
        alpha[j] = aj_new;
        *b = b_new;
        true
    };

    let mut quiet_sweeps = 0;
    let mut sweeps = 0;
    while sweeps < max_iter && quiet_sweeps < 2 {
        let mut changed = 0;
        for i in 0..n {
            let r = errors[i] * y[i];
            let violates = (r < -tol && alpha[i] < c) || (r > tol && alpha[i] > 0.0);
            if !violates {
                continue;
            }
            // Second choice: maximise |E_i - E_j|, then fall back to a random partner.
            let ei = errors[i];
            let j = (0..n)
                .filter(|&j| j != i)
                .max_by(|&p, &q| {
                    (ei - errors[p])
                        .abs()
                        .total_cmp(&(ei - errors[q]).abs())
                })
                .unwrap_or(i);
            if take_step(i, j, &mut alpha, &mut errors, &mut b) {
                changed += 1;
                continue;
            }
            let j = rng.gen_range(0..n);
            if take_step(i, j, &mut alpha, &mut errors, &mut b) {
                changed += 1;
            }
        }
        sweeps += 1;
        quiet_sweeps = if changed == 0 { quiet_sweeps + 1 } else { 0 };
    }
    if sweeps >= max_iter {
        log::warn!("SVC solver stopped after max_iter={} sweeps", max_iter);
    }
    log::trace!("SVC solver finished after {} sweeps", sweeps);
    (alpha, b)
}

/// Fit `P(y = 1 | f) = sigmoid(a * f + b)` by Newton's method on smoothed targets.
fn fit_platt(decision: &[f64], y: &[i32]) -> (f64, f64) {
    let n_pos = y.iter().filter(|&&v| v == 1).count() as f64;
    let n_neg = y.len() as f64 - n_pos;
    let hi = (n_pos + 1.0) / (n_pos + 2.0);
    let lo = 1.0 / (n_neg + 2.0);
    let targets: Vec<f64> = y.iter().map(|&v| if v == 1 { hi } else { lo }).collect();

    let nll = |a: f64, b: f64| -> f64 {
        decision
            .iter()
            .zip(&targets)
            .map(|(&f, &t)| {
                let p = sigmoid(a * f + b).clamp(1e-15, 1.0 - 1e-15);
                -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
            })
            .sum()
    };

    let (mut a, mut b) = (1.0, ((n_pos + 1.0) / (n_neg + 1.0)).ln());
    let mut current = nll(a, b);
    for _ in 0..100 {
        let (mut ga, mut gb, mut haa, mut hab, mut hbb) = (0.0, 0.0, 1e-12, 0.0, 1e-12);
        for (&f, &t) in decision.iter().zip(&targets) {
            let p = sigmoid(a * f + b);
            let d1 = p - t;
            let d2 = p * (1.0 - p);
            ga += f * d1;
            gb += d1;
            haa += f * f * d2;
            hab += f * d2;
            hbb += d2;
        }
        let det = haa * hbb - hab * hab;
        if det.abs() < 1e-20 {
            break;
        }
        let da = (hbb * ga - hab * gb) / det;
        let db = (haa * gb - hab * ga) / det;

        let mut step = 1.0;
        let mut improved = false;
        while step > 1e-10 {
            let (na, nb) = (a - step * da, b - step * db);
            let value = nll(na, nb);
            if value < current + 1e-4 * step * (ga * -da + gb * -db) {
                a = na;
                b = nb;
                current = value;
                improved = true;
                break;
            }
            step *= 0.5;
        }
        if !improved || (ga.abs() < 1e-5 && gb.abs() < 1e-5) {
            break;
        }
    }
    (a, b)
}

impl ClassifierModel for SupportVectorClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[i32]) -> Result<()> {
        check_fit_input(x, y)?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);

        let (x, y): (Array2<f64>, Vec<i32>) = if x.nrows() > self.max_train_samples {
            log::warn!(
                "SVC training set has {} rows; using a stratified subsample of {}",
                x.nrows(),
                self.max_train_samples
            );
            let (_, keep) = stratified_partition(y, self.max_train_samples, &mut rng);
            (x.select(ndarray::Axis(0), &keep), keep.iter().map(|&i| y[i]).collect())
        } else {
            (x.clone(), y.to_vec())
        };
        check_fit_input(&x, &y)?;

        let (n, p) = x.dim();
        let var = x.var(0.0);
        let gamma = if var > 0.0 { 1.0 / (p as f64 * var) } else { 1.0 };

        let rows: Vec<Vec<f64>> = x.rows().into_iter().map(|r| r.to_vec()).collect();
        let kernel_rows: Vec<f64> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| {
                let xi = x.row(i);
                rows.iter().map(move |xj| rbf(xi, xj, gamma)).collect::<Vec<_>>()
            })
            .collect();
        let k = Array2::from_shape_vec((n, n), kernel_rows)
            .map_err(|e| crate::error::RiskError::invalid_state(e.to_string()))?;

        let signed: Vec<f64> = y.iter().map(|&v| if v == 1 { 1.0 } else { -1.0 }).collect();
        let (alpha, b) = smo(&k, &signed, self.c, self.tol, self.max_iter, &mut rng);

        let mut support_vectors = Vec::new();
        let mut dual_coef = Vec::new();
        for i in 0..n {
            if alpha[i] > 1e-8 {
                support_vectors.push(rows[i].clone());
                dual_coef.push(alpha[i] * signed[i]);
            }
        }
        let decision: Vec<f64> = (0..n)
            .map(|i| (0..n).map(|j| alpha[j] * signed[j] * k[[i, j]]).sum::<f64>() + b)
            .collect();
        let (platt_a, platt_b) = fit_platt(&decision, &y);

        log::debug!(
            "SVC fitted: {} support vectors of {} rows, gamma {:.4}",
            support_vectors.len(),
            n,
            gamma
        );
        self.state = Some(SvcState {
            gamma,
            n_features: p,
            support_vectors,
            dual_coef,
            intercept: b,
            platt_a,
            platt_b,
        });
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let state = self.state.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        let (a, b) = (state.platt_a, state.platt_b);
        Ok(self.decision_function(x)?.mapv(|f| sigmoid(a * f + b)))
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i32>> {
        Ok(self.decision_function(x)?.mapv(|f| i32::from(f > 0.0)))
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn feature_weights(&self) -> FeatureWeights {
        FeatureWeights::Unavailable
    }

    fn name(&self) -> &str {
        "SVC"
    }
}
