//! healthrisk-classifiers: disease-risk classification on tabular health data.
//!
//! The crate covers the whole training path (CSV loading, stratified
//! splitting, column preprocessing, SMOTE oversampling, four registry
//! classifiers, cross-validation, metrics and feature importances), a small
//! file-backed experiment tracking store, model comparison, and the
//! single-record inference used by the serving form.
//!
//! Models are implemented on top of `ndarray` and serialize to JSON, so a
//! fitted [`pipeline::RiskPipeline`] can be written by one process and served
//! by another without native dependencies.
pub mod comparator;
pub mod config;
pub mod data_handling;
pub mod error;
pub mod importance;
pub mod metrics;
pub mod model_selection;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod sampling;
pub mod serving;
pub mod tracking;
pub mod trainer;

pub use error::{ErrorKind, Result, RiskError};
