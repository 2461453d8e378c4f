use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, ModelType};
use crate::error::Result;
use crate::models::classifier_trait::{ClassifierModel, FeatureWeights};
use crate::models::gradient_boosting::GradientBoosting;
use crate::models::logistic::LogisticRegression;
use crate::models::random_forest::RandomForest;
use crate::models::svm::SupportVectorClassifier;

/// Any registry classifier. Kept as an enum so fitted pipelines serialize
/// without trait objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Model {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    XGBoost(GradientBoosting),
    SVC(SupportVectorClassifier),
}

impl Model {
    fn inner(&self) -> &dyn ClassifierModel {
        match self {
            Model::LogisticRegression(m) => m,
            Model::RandomForest(m) => m,
            Model::XGBoost(m) => m,
            Model::SVC(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ClassifierModel {
        match self {
            Model::LogisticRegression(m) => m,
            Model::RandomForest(m) => m,
            Model::XGBoost(m) => m,
            Model::SVC(m) => m,
        }
    }
}

impl ClassifierModel for Model {
    fn fit(&mut self, x: &Array2<f64>, y: &[i32]) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict_proba(x)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i32>> {
        self.inner().predict(x)
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }

    fn feature_weights(&self) -> FeatureWeights {
        self.inner().feature_weights()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}

/// Build an unfitted classifier from a `ModelConfig`.
pub fn build_model(params: ModelConfig) -> Model {
    let seed = params.random_state;
    match params.model_type {
        ModelType::LogisticRegression { c, max_iter, tol } => {
            Model::LogisticRegression(LogisticRegression::new(c, max_iter, tol, seed))
        }
        ModelType::RandomForest {
            n_estimators,
            max_depth,
            min_samples_split,
            min_samples_leaf,
            max_bins,
        } => Model::RandomForest(RandomForest::new(
            n_estimators,
            max_depth,
            min_samples_split,
            min_samples_leaf,
            max_bins,
            seed,
        )),
        ModelType::XGBoost {
            n_estimators,
            learning_rate,
            max_depth,
            reg_lambda,
            min_child_weight,
            max_bins,
        } => Model::XGBoost(GradientBoosting::new(
            n_estimators,
            learning_rate,
            max_depth,
            reg_lambda,
            min_child_weight,
            max_bins,
            seed,
        )),
        ModelType::SVC {
            c,
            tol,
            max_iter,
            max_train_samples,
        } => Model::SVC(SupportVectorClassifier::new(
            c,
            tol,
            max_iter,
            max_train_samples,
            seed,
        )),
    }
}

/// The registry: fresh, unfitted, identically seeded models in fixed order
/// (Logistic Regression, Random Forest, XGBoost, SVC).
pub fn get_models(random_state: u64) -> Vec<(String, Model)> {
    ModelType::registry()
        .into_iter()
        .map(|mt| {
            let name = mt.display_name().to_string();
            (name, build_model(ModelConfig::new(random_state, mt)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_order_and_names() {
        let names: Vec<String> = get_models(42).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["Logistic Regression", "Random Forest", "XGBoost", "SVC"]);
    }

    #[test]
    fn registry_models_are_unfitted_and_named() {
        for (name, model) in get_models(42) {
            assert!(!model.is_fitted());
            assert_eq!(model.name(), name);
        }
    }
}
