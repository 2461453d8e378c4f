//! Cross-validate, fit, evaluate and track every selected registry model.
use std::path::PathBuf;

use crate::config::{ModelType, CV_FOLDS, RANDOM_STATE, TEST_SIZE};
use crate::data_handling::SplitData;
use crate::error::Result;
use crate::importance::get_feature_importances;
use crate::metrics::{get_metrics, tracking_name, Metrics};
use crate::model_selection::{cross_val_score, Scoring, StratifiedKFold};
use crate::models::{get_models, Model};
use crate::pipeline::{create_pipeline, RiskPipeline};
use crate::preprocessing::ColumnTransformer;
use crate::tracking::{Run, TrackingStore};

/// `(model name, test metrics)` in registry order.
pub type ModelResults = Vec<(String, Metrics)>;

/// Number of rows written to `feature_importance/top_10_features.txt`.
pub const TOP_FEATURES: usize = 10;

#[derive(Debug, Clone)]
pub struct TrainingContext {
    pub store: TrackingStore,
    pub random_state: u64,
    /// Logged as a run parameter; the split itself happens before training.
    pub test_size: f64,
    pub cv_folds: usize,
}

impl TrainingContext {
    pub fn new(store: TrackingStore) -> Self {
        TrainingContext {
            store,
            random_state: RANDOM_STATE,
            test_size: TEST_SIZE,
            cv_folds: CV_FOLDS,
        }
    }
}

/// Registry models to train: the one named by `selected` when it resolves,
/// otherwise all of them.
pub fn select_models(selected: Option<&str>, random_state: u64) -> Vec<(String, Model)> {
    let all = get_models(random_state);
    match selected {
        None => {
            log::info!("Starting training for all models...");
            all
        }
        Some(name) => match name.parse::<ModelType>() {
            Ok(model_type) => {
                let wanted = model_type.display_name();
                log::info!("Starting training for selected model: {}...", wanted);
                all.into_iter().filter(|(n, _)| n == wanted).collect()
            }
            Err(_) => {
                log::warn!("Model '{}' not found. Training all models.", name);
                all
            }
        },
    }
}

fn log_common_params(run: &Run, ctx: &TrainingContext, name: &str) -> Result<()> {
    run.log_param("test_size", ctx.test_size)?;
    run.log_param("random_state", ctx.random_state)?;
    run.log_param("resampling_method", "SMOTE")?;
    run.log_param("numerical_scaling", "StandardScaler")?;
    run.log_param("categorical_encoding", "OneHotEncoder")?;
    run.log_param("model_name", name)
}

fn evaluate_one(
    run: &Run,
    mut pipeline: RiskPipeline,
    split: &SplitData,
    ctx: &TrainingContext,
) -> Result<(Metrics, PathBuf)> {
    log_common_params(run, ctx, &pipeline.name)?;

    let cv = StratifiedKFold::new(ctx.cv_folds, true, ctx.random_state);
    let scores = cross_val_score(&pipeline, &split.x_train, &split.y_train, &cv, Scoring::F1)?;
    let cv_mean_f1 = scores.iter().sum::<f64>() / scores.len() as f64;
    log::info!("{}-Fold CV F1-Score (Train): {:.4}", ctx.cv_folds, cv_mean_f1);
    run.log_metric("cv_mean_f1_score", cv_mean_f1)?;

    pipeline.fit(&split.x_train, &split.y_train)?;

    let y_pred = pipeline.predict(&split.x_test)?.to_vec();
    let y_prob = pipeline.predict_proba(&split.x_test)?.to_vec();
    let metrics = get_metrics(&split.y_test, &y_pred, &y_prob)?;
    for (metric_name, value) in metrics.iter() {
        run.log_metric(&tracking_name(metric_name), value)?;
        log::info!("Test {}: {:.4}", metric_name, value);
    }

    let model_path = run.log_model(&pipeline, "model")?;
    let importances = get_feature_importances(&pipeline)?;
    if !importances.is_empty() {
        run.log_text(
            &importances.top(TOP_FEATURES).to_string(),
            "feature_importance/top_10_features.txt",
        )?;
    }
    Ok((metrics, model_path))
}

/// For each selected model: 5-fold stratified CV (F1) on the training
/// partition, a full fit, test-set metrics, then the fitted pipeline and its
/// top features are logged to a tracking run named after the model.
///
/// An unknown `selected` name falls back to every registry model with a
/// warning. The first failing model aborts training; its run is marked failed.
pub fn train_and_evaluate_models(
    split: &SplitData,
    preprocessor: &ColumnTransformer,
    selected: Option<&str>,
    ctx: &TrainingContext,
) -> Result<ModelResults> {
    let mut results = ModelResults::new();
    for (name, model) in select_models(selected, ctx.random_state) {
        log::info!("--- {} ---", name);
        let pipeline = create_pipeline(&name, model, preprocessor, ctx.random_state);
        let run = ctx.store.start_run(&name)?;
        match evaluate_one(&run, pipeline, split, ctx) {
            Ok((metrics, model_path)) => {
                log::debug!("[{}] model logged to {}", name, model_path.display());
                run.finish()?;
                results.push((name, metrics));
            }
            Err(e) => {
                log::error!("[{}] training failed: {}", name, e);
                if let Err(close_err) = run.fail() {
                    log::warn!("[{}] could not mark run failed: {}", name, close_err);
                }
                return Err(e);
            }
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_resolves_names_and_falls_back() {
        let one = select_models(Some("Random Forest"), 42);
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].0, "Random Forest");

        let alias = select_models(Some("svm"), 42);
        assert_eq!(alias[0].0, "SVC");

        assert_eq!(select_models(Some("Naive Bayes"), 42).len(), 4);
        assert_eq!(select_models(None, 42).len(), 4);
    }
}
