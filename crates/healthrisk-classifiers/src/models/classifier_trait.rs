use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Per-feature weights exposed by a fitted model, aligned with the
/// columns of the matrix it was fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureWeights {
    /// Signed linear coefficients.
    Coefficients(Vec<f64>),
    /// Non-negative importances summing to one.
    Importances(Vec<f64>),
    /// The model has no interpretable per-feature weights.
    Unavailable,
}

/// A small trait abstraction over the binary classifiers of the registry.
///
/// Labels follow the dataset convention: 1 for the at-risk class, 0 otherwise.
pub trait ClassifierModel {
    /// Fit the model, replacing any previously learned state.
    fn fit(&mut self, x: &Array2<f64>, y: &[i32]) -> Result<()>;

    /// Probability of class 1 for every row. Fails before `fit`.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Hard 0/1 predictions. Defaults to thresholding `predict_proba` at 0.5.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i32>> {
        Ok(self.predict_proba(x)?.mapv(|p| i32::from(p >= 0.5)))
    }

    fn is_fitted(&self) -> bool;

    /// Coefficients or importances learned during `fit`.
    fn feature_weights(&self) -> FeatureWeights {
        FeatureWeights::Unavailable
    }

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}
