//! L2-regularised logistic regression fitted with damped Newton steps.
//!
//! Minimises `0.5 * ||w||^2 + C * sum(logloss)`; the intercept is not
//! penalised. The problem is strictly convex, so the fit is deterministic
//! and independent of the seed.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::classifier_trait::{ClassifierModel, FeatureWeights};
use crate::models::utils::{
    check_fit_input, check_predict_input, cholesky_solve, not_fitted, sigmoid, softplus,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub random_state: u64,
    coef: Option<Vec<f64>>,
    intercept: f64,
    n_iter: usize,
}

impl LogisticRegression {
    pub fn new(c: f64, max_iter: usize, tol: f64, random_state: u64) -> Self {
        LogisticRegression {
            c,
            max_iter,
            tol,
            random_state,
            coef: None,
            intercept: 0.0,
            n_iter: 0,
        }
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coef.as_deref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Newton iterations used by the last fit.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    fn objective(&self, xd: &Array2<f64>, y: &Array1<f64>, beta: &Array1<f64>) -> f64 {
        let d = beta.len();
        let z = xd.dot(beta);
        let loss: f64 = z.iter().zip(y.iter()).map(|(&z, &t)| softplus(z) - t * z).sum();
        let penalty: f64 = beta.iter().take(d - 1).map(|w| w * w).sum::<f64>() * 0.5;
        penalty + self.c * loss
    }
}

/// Append a column of ones for the intercept.
fn design_matrix(x: &Array2<f64>) -> Array2<f64> {
    let (n, p) = x.dim();
    let mut xd = Array2::<f64>::ones((n, p + 1));
    xd.slice_mut(ndarray::s![.., ..p]).assign(x);
    xd
}

impl ClassifierModel for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &[i32]) -> Result<()> {
        check_fit_input(x, y)?;
        let xd = design_matrix(x);
        let d = xd.ncols();
        let t: Array1<f64> = y.iter().map(|&v| v as f64).collect();

        let mut beta = Array1::<f64>::zeros(d);
        let mut obj = self.objective(&xd, &t, &beta);
        let mut iterations = 0;

        for iter in 0..self.max_iter {
            iterations = iter + 1;
            let p = xd.dot(&beta).mapv(sigmoid);
            let resid = &p - &t;

            let mut grad = xd.t().dot(&resid) * self.c;
            for j in 0..d - 1 {
                grad[j] += beta[j];
            }

            let w = p.mapv(|v| (v * (1.0 - v)).max(1e-12) * self.c);
            let xw = &xd * &w.view().insert_axis(Axis(1));
            let mut hess = xd.t().dot(&xw);
            for j in 0..d - 1 {
                hess[[j, j]] += 1.0;
            }
            hess[[d - 1, d - 1]] += 1e-10;

            let step = cholesky_solve(&hess, &grad)?;

            // Backtracking keeps every accepted step a descent step.
            let mut scale = 1.0;
            let mut accepted = false;
            for _ in 0..30 {
                let candidate = &beta - &(&step * scale);
                let cand_obj = self.objective(&xd, &t, &candidate);
                if cand_obj <= obj {
                    beta = candidate;
                    obj = cand_obj;
                    accepted = true;
                    break;
                }
                scale *= 0.5;
            }

            let max_step = step.iter().fold(0.0f64, |m, v| m.max(v.abs())) * scale;
            if !accepted || max_step < self.tol {
                break;
            }
        }

        if iterations == self.max_iter {
            log::warn!(
                "Logistic regression reached max_iter={} before converging",
                self.max_iter
            );
        }
        log::trace!("Logistic regression converged after {} iterations", iterations);

        self.n_iter = iterations;
        self.intercept = beta[d - 1];
        self.coef = Some(beta.iter().take(d - 1).copied().collect());
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coef = self.coef.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        check_predict_input(x, coef.len())?;
        let w = Array1::from_vec(coef.clone());
        Ok((x.dot(&w) + self.intercept).mapv(sigmoid))
    }

    fn is_fitted(&self) -> bool {
        self.coef.is_some()
    }

    fn feature_weights(&self) -> FeatureWeights {
        match &self.coef {
            Some(c) => FeatureWeights::Coefficients(c.clone()),
            None => FeatureWeights::Unavailable,
        }
    }

    fn name(&self) -> &str {
        "Logistic Regression"
    }
}
