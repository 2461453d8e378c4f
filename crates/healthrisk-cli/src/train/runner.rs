use anyhow::{Context, Result};

use healthrisk_classifiers::comparator::compare_results;
use healthrisk_classifiers::data_handling::{load_data, split_data};
use healthrisk_classifiers::tracking::TrackingStore;
use healthrisk_classifiers::trainer::{train_and_evaluate_models, ModelResults, TrainingContext};

use crate::report::write_training_report;
use crate::train::input::TrainConfig;

/// Run name of the tracking run that holds the model comparison.
pub const SUMMARY_RUN_NAME: &str = "Comparison_Summary";

#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub results: ModelResults,
    pub best_model: String,
    pub summary_run_id: String,
}

/// Load, split, train the configured model(s), log the comparison summary
/// run and optionally write the HTML report.
pub fn run_training(config: &TrainConfig) -> Result<TrainingSummary> {
    let df = load_data(&config.data_file)
        .with_context(|| format!("Failed to load data: {}", config.data_file))?;
    if df.is_empty() {
        anyhow::bail!("Data loading failed: {} yielded no rows", config.data_file);
    }

    let split = split_data(
        &df,
        &config.target_column,
        config.test_size,
        config.random_state,
    )?;
    log::info!(
        "[HealthRisk::Train] {} training rows, {} test rows",
        split.y_train.len(),
        split.y_test.len()
    );

    let preprocessor = config.preprocessor.build();
    let store = TrackingStore::new(&config.tracking_root).experiment(&config.experiment_name);
    let ctx = TrainingContext {
        store: store.clone(),
        random_state: config.random_state,
        test_size: config.test_size,
        cv_folds: config.cv_folds,
    };

    let results = train_and_evaluate_models(&split, &preprocessor, config.model.as_deref(), &ctx)?;
    if results.is_empty() {
        anyhow::bail!("No models were successfully trained or evaluated.");
    }

    let run = store.start_run(SUMMARY_RUN_NAME)?;
    let best_model = compare_results(&results, &run)?;
    let summary_run_id = run.run_id().to_string();
    run.finish()?;

    let summary = TrainingSummary {
        results,
        best_model,
        summary_run_id,
    };

    if let Some(report_path) = &config.report_file {
        write_training_report(config, &summary, report_path)?;
        log::info!("[HealthRisk::Train] Report written to {}", report_path.display());
    }

    log::info!(
        "[HealthRisk::Train] Runs logged under {}",
        store.experiment_dir().display()
    );
    Ok(summary)
}
