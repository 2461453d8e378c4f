use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::preprocessing::{ColumnTransformer, CATEGORICAL_FEATURES, CONTINUOUS_FEATURES};

/// Seed shared by the splitter, SMOTE, cross-validation and every model.
pub const RANDOM_STATE: u64 = 42;
/// Fraction of rows held out for testing.
pub const TEST_SIZE: f64 = 0.2;
/// Number of stratified cross-validation folds.
pub const CV_FOLDS: usize = 5;
/// Label column of the health dataset.
pub const TARGET_COLUMN: &str = "disease_risk";
/// Experiment under which training runs are tracked.
pub const EXPERIMENT_NAME: &str = "Disease_Risk_Classification_SMOTE";

/// Columns handled by the preprocessor; every other feature column passes
/// through unchanged.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PreprocessorConfig {
    pub continuous: Vec<String>,
    pub categorical: Vec<String>,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        PreprocessorConfig {
            continuous: CONTINUOUS_FEATURES.iter().map(|s| s.to_string()).collect(),
            categorical: CATEGORICAL_FEATURES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PreprocessorConfig {
    /// Unfitted transformer for these columns.
    pub fn build(&self) -> ColumnTransformer {
        ColumnTransformer::new(self.continuous.clone(), self.categorical.clone())
    }
}

/// Central configuration for one registry model.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub random_state: u64,

    #[serde(flatten)]
    pub model_type: ModelType,
}

/// Supported model types and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelType {
    LogisticRegression {
        c: f64,
        max_iter: usize,
        tol: f64,
    },
    RandomForest {
        n_estimators: usize,
        max_depth: Option<usize>,
        min_samples_split: usize,
        min_samples_leaf: usize,
        max_bins: usize,
    },
    XGBoost {
        n_estimators: usize,
        learning_rate: f64,
        max_depth: usize,
        reg_lambda: f64,
        min_child_weight: f64,
        max_bins: usize,
    },
    SVC {
        c: f64,
        tol: f64,
        max_iter: usize,
        max_train_samples: usize,
    },
}

impl ModelType {
    pub fn logistic_regression() -> Self {
        ModelType::LogisticRegression {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-6,
        }
    }

    pub fn random_forest() -> Self {
        ModelType::RandomForest {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_bins: 255,
        }
    }

    pub fn xgboost() -> Self {
        ModelType::XGBoost {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            max_bins: 255,
        }
    }

    pub fn svc() -> Self {
        ModelType::SVC {
            c: 1.0,
            tol: 1e-3,
            max_iter: 100,
            max_train_samples: 2000,
        }
    }

    /// Registry display name, also used as the tracking run name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelType::LogisticRegression { .. } => "Logistic Regression",
            ModelType::RandomForest { .. } => "Random Forest",
            ModelType::XGBoost { .. } => "XGBoost",
            ModelType::SVC { .. } => "SVC",
        }
    }

    /// Default configurations in registry order.
    pub fn registry() -> Vec<ModelType> {
        vec![
            ModelType::logistic_regression(),
            ModelType::random_forest(),
            ModelType::xgboost(),
            ModelType::svc(),
        ]
    }
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::logistic_regression()
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "logistic regression" | "logistic" | "lr" => Ok(ModelType::logistic_regression()),
            "random forest" | "random_forest" | "rf" => Ok(ModelType::random_forest()),
            "xgboost" | "xgb" | "gradient boosting" => Ok(ModelType::xgboost()),
            "svc" | "svm" => Ok(ModelType::svc()),
            _ => Err(format!(
                "Unknown model type: {}. Expected one of: Logistic Regression, Random Forest, XGBoost, SVC",
                s
            )),
        }
    }
}

impl ModelConfig {
    pub fn new(random_state: u64, model_type: ModelType) -> Self {
        Self {
            random_state,
            model_type,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            random_state: RANDOM_STATE,
            model_type: ModelType::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_names_and_aliases() {
        for m in ModelType::registry() {
            let parsed: ModelType = m.display_name().parse().unwrap();
            assert_eq!(parsed, m);
        }
        assert_eq!("rf".parse::<ModelType>().unwrap(), ModelType::random_forest());
        assert!("Naive Bayes".parse::<ModelType>().is_err());
    }

    #[test]
    fn config_round_trips_json() {
        let cfg = ModelConfig::new(7, ModelType::xgboost());
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("XGBoost"));
        let back: ModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
