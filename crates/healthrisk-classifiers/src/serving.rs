//! Single-record inference for the serving form.
//!
//! A [`ModelCache`] resolves an [`ArtifactSource`] to a fitted pipeline on
//! first use and keeps it for the lifetime of the process. A failed load is
//! not remembered, so the next request tries again.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::data_handling::{Column, Frame};
use crate::error::{Result, RiskError};
use crate::pipeline::RiskPipeline;
use crate::tracking::MODEL_FILE;

/// Column order of the single-row frame handed to the pipeline.
pub const INPUT_FEATURES: [&str; 14] = [
    "age",
    "bmi",
    "daily_steps",
    "sleep_hours",
    "water_intake_l",
    "calories_consumed",
    "resting_hr",
    "systolic_bp",
    "diastolic_bp",
    "cholesterol",
    "family_history",
    "smoker",
    "alcohol",
    "gender",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum YesNo {
    #[default]
    No,
    Yes,
}

impl YesNo {
    pub fn as_f64(self) -> f64 {
        match self {
            YesNo::No => 0.0,
            YesNo::Yes => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            YesNo::No => "No",
            YesNo::Yes => "Yes",
        }
    }
}

/// One patient as entered in the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub age: u32,
    pub bmi: f64,
    pub daily_steps: u32,
    pub sleep_hours: f64,
    pub water_intake_l: f64,
    pub calories_consumed: u32,
    pub resting_hr: u32,
    pub systolic_bp: u32,
    pub diastolic_bp: u32,
    pub cholesterol: u32,
    pub family_history: YesNo,
    pub smoker: YesNo,
    pub alcohol: YesNo,
    pub gender: String,
}

impl Default for PatientRecord {
    fn default() -> Self {
        PatientRecord {
            age: 48,
            bmi: 29.0,
            daily_steps: 10000,
            sleep_hours: 6.5,
            water_intake_l: 2.75,
            calories_consumed: 2600,
            resting_hr: 74,
            systolic_bp: 135,
            diastolic_bp: 90,
            cholesterol: 224,
            family_history: YesNo::No,
            smoker: YesNo::No,
            alcohol: YesNo::No,
            gender: "Female".to_string(),
        }
    }
}

/// Inclusive `(field, min, max)` bounds accepted by the form.
pub const FIELD_RANGES: [(&str, f64, f64); 10] = [
    ("age", 18.0, 100.0),
    ("bmi", 15.0, 50.0),
    ("daily_steps", 0.0, 30000.0),
    ("sleep_hours", 3.0, 10.0),
    ("water_intake_l", 0.0, 5.0),
    ("calories_consumed", 1000.0, 5000.0),
    ("resting_hr", 40.0, 120.0),
    ("systolic_bp", 90.0, 200.0),
    ("diastolic_bp", 60.0, 130.0),
    ("cholesterol", 150.0, 300.0),
];

/// Gender choices offered by the form.
pub const GENDERS: [&str; 2] = ["Female", "Male"];

impl PatientRecord {
    fn numeric_values(&self) -> [f64; 13] {
        [
            self.age as f64,
            self.bmi,
            self.daily_steps as f64,
            self.sleep_hours,
            self.water_intake_l,
            self.calories_consumed as f64,
            self.resting_hr as f64,
            self.systolic_bp as f64,
            self.diastolic_bp as f64,
            self.cholesterol as f64,
            self.family_history.as_f64(),
            self.smoker.as_f64(),
            self.alcohol.as_f64(),
        ]
    }

    /// `(feature, display value)` pairs in [`INPUT_FEATURES`] order.
    pub fn display_values(&self) -> Vec<(&'static str, String)> {
        let mut out: Vec<(&'static str, String)> = INPUT_FEATURES
            .iter()
            .zip(self.numeric_values())
            .map(|(name, v)| (*name, v.to_string()))
            .collect();
        out.push(("gender", self.gender.clone()));
        out
    }

    /// Reject values outside the form's ranges.
    pub fn validate(&self) -> Result<()> {
        for ((name, lo, hi), v) in FIELD_RANGES.iter().zip(self.numeric_values()) {
            if !v.is_finite() || v < *lo || v > *hi {
                return Err(RiskError::invalid_state(format!(
                    "{} must be between {} and {}, got {}",
                    name, lo, hi, v
                )));
            }
        }
        if self.gender.trim().is_empty() {
            return Err(RiskError::invalid_state("gender must not be empty"));
        }
        Ok(())
    }

    /// Single-row frame with Yes/No mapped to 1/0 and gender kept as text.
    pub fn to_frame(&self) -> Result<Frame> {
        let mut columns: Vec<Column> = INPUT_FEATURES
            .iter()
            .zip(self.numeric_values())
            .map(|(name, v)| Column::numeric(*name, vec![v]))
            .collect();
        columns.push(Column::categorical("gender", vec![self.gender.clone()]));
        Frame::new(columns)
    }
}

/// Where the serving form looks for its pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Newest `model.json` anywhere under a tracking root.
    Latest { tracking_root: PathBuf },
    Fixed(PathBuf),
}

impl ArtifactSource {
    pub fn resolve(&self) -> Result<PathBuf> {
        match self {
            ArtifactSource::Latest { tracking_root } => find_latest_model(tracking_root),
            ArtifactSource::Fixed(path) if path.is_file() => Ok(path.clone()),
            ArtifactSource::Fixed(path) => Err(RiskError::NotFound(path.clone())),
        }
    }
}

fn subdirs(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Newest `<root>/*/*/artifacts/model/model.json` by modification time;
/// equal times resolve to the lexicographically last path.
pub fn find_latest_model<P: AsRef<Path>>(root: P) -> Result<PathBuf> {
    let root = root.as_ref();
    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for experiment in subdirs(root) {
        for run in subdirs(&experiment) {
            let candidate = run.join("artifacts").join("model").join(MODEL_FILE);
            let Ok(modified) = fs::metadata(&candidate).and_then(|m| m.modified()) else {
                continue;
            };
            let newer = match &latest {
                None => true,
                Some((t, p)) => (modified, &candidate) > (*t, p),
            };
            if newer {
                latest = Some((modified, candidate));
            }
        }
    }
    match latest {
        Some((_, path)) => {
            log::info!("Heuristic load path: {}", path.display());
            Ok(path)
        }
        None => {
            log::error!(
                "No model files found under {}. Did the training run succeed?",
                root.display()
            );
            Err(RiskError::NotFound(root.join("*/*/artifacts/model").join(MODEL_FILE)))
        }
    }
}

/// A pipeline loaded for serving and where it came from.
#[derive(Debug)]
pub struct LoadedModel {
    pub pipeline: RiskPipeline,
    pub path: PathBuf,
}

impl LoadedModel {
    pub fn model_name(&self) -> &str {
        &self.pipeline.name
    }
}

/// Init-once holder for the serving pipeline; never invalidated.
#[derive(Debug)]
pub struct ModelCache {
    source: ArtifactSource,
    cell: OnceCell<Arc<LoadedModel>>,
}

impl ModelCache {
    pub fn new(source: ArtifactSource) -> Self {
        ModelCache {
            source,
            cell: OnceCell::new(),
        }
    }

    pub fn source(&self) -> &ArtifactSource {
        &self.source
    }

    /// Loaded model, if a previous call succeeded.
    pub fn loaded(&self) -> Option<Arc<LoadedModel>> {
        self.cell.get().cloned()
    }

    /// Load on first call; later calls return the same instance.
    pub fn get(&self) -> Result<Arc<LoadedModel>> {
        self.cell
            .get_or_try_init(|| {
                let path = self.source.resolve()?;
                let pipeline = RiskPipeline::load(&path)?;
                if !pipeline.is_fitted() {
                    return Err(RiskError::invalid_state(format!(
                        "artifact {} holds an unfitted pipeline",
                        path.display()
                    )));
                }
                log::info!("Loaded '{}' from {}", pipeline.name, path.display());
                Ok(Arc::new(LoadedModel { pipeline, path }))
            })
            .cloned()
    }
}

/// Outcome of one form submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// 0 (low risk) or 1 (high risk).
    pub outcome: i32,
    /// Probability of class 1.
    pub probability: f64,
}

impl Prediction {
    pub fn is_high_risk(&self) -> bool {
        self.outcome == 1
    }

    pub fn risk_label(&self) -> &'static str {
        if self.is_high_risk() {
            "High Disease Risk Predicted"
        } else {
            "Low Disease Risk Predicted"
        }
    }

    /// Probability of the predicted outcome.
    pub fn display_probability(&self) -> f64 {
        if self.is_high_risk() {
            self.probability
        } else {
            1.0 - self.probability
        }
    }

    pub fn headline(&self) -> String {
        format!(
            "{} (Probability: {:.2})",
            self.risk_label(),
            self.display_probability()
        )
    }
}

pub fn predict_record(pipeline: &RiskPipeline, record: &PatientRecord) -> Result<Prediction> {
    record.validate()?;
    let frame = record.to_frame()?;
    let outcome = pipeline
        .predict(&frame)?
        .get(0)
        .copied()
        .ok_or_else(|| RiskError::invalid_state("pipeline returned no prediction"))?;
    let probability = pipeline
        .predict_proba(&frame)?
        .get(0)
        .copied()
        .ok_or_else(|| RiskError::invalid_state("pipeline returned no probability"))?;
    Ok(Prediction {
        outcome,
        probability,
    })
}
