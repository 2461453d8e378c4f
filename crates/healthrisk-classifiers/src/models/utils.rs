use ndarray::{Array1, Array2};

use crate::error::{Result, RiskError};

#[inline]
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + exp(z))` without overflow.
#[inline]
pub fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}

/// Validate a training matrix and its 0/1 labels. Both classes must be present.
pub fn check_fit_input(x: &Array2<f64>, y: &[i32]) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(RiskError::invalid_state("cannot fit on an empty matrix"));
    }
    if x.nrows() != y.len() {
        return Err(RiskError::invalid_state(format!(
            "feature matrix has {} rows but {} labels were given",
            x.nrows(),
            y.len()
        )));
    }
    if let Some(bad) = y.iter().find(|&&v| v != 0 && v != 1) {
        return Err(RiskError::invalid_state(format!(
            "labels must be 0 or 1, found {}",
            bad
        )));
    }
    let n_pos = y.iter().filter(|&&v| v == 1).count();
    if n_pos == 0 || n_pos == y.len() {
        return Err(RiskError::invalid_state(
            "training labels contain a single class",
        ));
    }
    Ok(())
}

/// Fail when predicting with a different feature count than seen in `fit`.
pub fn check_predict_input(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(RiskError::invalid_state(format!(
            "model fitted on {} features, got {}",
            n_features,
            x.ncols()
        )));
    }
    Ok(())
}

pub fn not_fitted(name: &str) -> RiskError {
    RiskError::invalid_state(format!("{} must be fitted before predicting", name))
}

/// Solve `a * x = b` for symmetric positive definite `a` by Cholesky factorisation.
pub fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return Err(RiskError::invalid_state(
                        "matrix is not positive definite",
                    ));
                }
                l[[i, i]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }

    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }
    Ok(x)
}
