pub mod gradient_boosting;
pub mod logistic;
pub mod random_forest;
pub mod svm;
pub mod tree;
pub mod utils;

pub mod classifier_trait;
pub mod factory;

pub use classifier_trait::{ClassifierModel, FeatureWeights};
pub use factory::{build_model, get_models, Model};
