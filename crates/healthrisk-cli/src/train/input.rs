use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use healthrisk_classifiers::config::{
    PreprocessorConfig, CV_FOLDS, EXPERIMENT_NAME, RANDOM_STATE, TARGET_COLUMN, TEST_SIZE,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub data_file: String,
    pub target_column: String,
    pub test_size: f64,
    pub random_state: u64,
    pub cv_folds: usize,
    /// Registry model to train; `None` trains all of them.
    pub model: Option<String>,
    pub tracking_root: PathBuf,
    pub experiment_name: String,
    pub preprocessor: PreprocessorConfig,
    pub report_file: Option<PathBuf>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            data_file: String::from("data/health_lifestyle_dataset.csv"),
            target_column: TARGET_COLUMN.to_string(),
            test_size: TEST_SIZE,
            random_state: RANDOM_STATE,
            cv_folds: CV_FOLDS,
            model: Some(String::from("Logistic Regression")),
            tracking_root: PathBuf::from("mlruns"),
            experiment_name: EXPERIMENT_NAME.to_string(),
            preprocessor: PreprocessorConfig::default(),
            report_file: None,
        }
    }
}

/// Load a training configuration from a JSON file. Missing keys take their
/// default values.
pub fn load_train_config<P: AsRef<Path>>(path: P) -> Result<TrainConfig> {
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: TrainConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

impl TrainConfig {
    /// Config file (or defaults) with CLI overrides applied.
    pub fn from_arguments(config_path: Option<&PathBuf>, matches: &ArgMatches) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => load_train_config(path)?,
            None => {
                log::info!("[HealthRisk::Train] No config file provided; using defaults");
                TrainConfig::default()
            }
        };

        if let Some(data) = matches.get_one::<String>("data") {
            config.data_file = data.clone();
        }
        validate_csv_file(&config.data_file)?;

        if matches.get_flag("all_models") {
            config.model = None;
        } else if let Some(model) = matches.get_one::<String>("model") {
            config.model = Some(model.clone());
        }

        if let Some(root) = matches.get_one::<PathBuf>("tracking_root") {
            config.tracking_root = root.clone();
        }
        if let Some(experiment) = matches.get_one::<String>("experiment") {
            config.experiment_name = experiment.clone();
        }
        if let Some(report) = matches.get_one::<PathBuf>("report") {
            config.report_file = Some(report.clone());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            anyhow::bail!("test_size must be between 0 and 1, got {}", self.test_size);
        }
        if self.cv_folds < 2 {
            anyhow::bail!("cv_folds must be at least 2, got {}", self.cv_folds);
        }
        if self.target_column.is_empty() {
            anyhow::bail!("target_column must not be empty");
        }
        Ok(())
    }
}

pub fn validate_csv_file(path: &str) -> Result<()> {
    let pb = PathBuf::from(path);

    let ext = pb
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    if ext.as_deref() != Some("csv") {
        anyhow::bail!("File must have a .csv extension: {}", path);
    }

    if !pb.exists() {
        anyhow::bail!("File does not exist: {}", path);
    }

    Ok(())
}
