//! Preprocess -> SMOTE -> classify, as one fit/predict unit.
//!
//! Oversampling runs inside [`RiskPipeline::fit`] only and sees nothing but
//! the rows passed to it, so cross-validation folds and the held-out test
//! set never leak into the synthetic samples. Prediction goes straight from
//! the preprocessor to the classifier and keeps the input row count.

use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::data_handling::Frame;
use crate::error::{Result, RiskError};
use crate::models::{ClassifierModel, Model};
use crate::preprocessing::ColumnTransformer;
use crate::sampling::Smote;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPipeline {
    pub name: String,
    preprocessor: ColumnTransformer,
    sampler: Smote,
    classifier: Model,
    fitted: bool,
}

/// Compose a pipeline from a registry model and a (fitted or unfitted)
/// preprocessor; `fit` always refits the preprocessor.
pub fn create_pipeline(
    name: &str,
    model: Model,
    preprocessor: &ColumnTransformer,
    random_state: u64,
) -> RiskPipeline {
    RiskPipeline {
        name: name.to_string(),
        preprocessor: preprocessor.clone(),
        sampler: Smote::new(random_state),
        classifier: model,
        fitted: false,
    }
}

impl RiskPipeline {
    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    pub fn classifier(&self) -> &Model {
        &self.classifier
    }

    pub fn preprocessor(&self) -> &ColumnTransformer {
        &self.preprocessor
    }

    /// Fit every stage on `x`/`y`, replacing all previously learned state.
    pub fn fit(&mut self, x: &Frame, y: &[i32]) -> Result<()> {
        if x.n_rows() != y.len() {
            return Err(RiskError::invalid_state(format!(
                "pipeline got {} rows but {} labels",
                x.n_rows(),
                y.len()
            )));
        }
        self.fitted = false;
        let features = self.preprocessor.fit_transform(x)?;
        let (features, labels) = self.sampler.fit_resample(&features, y)?;
        log::debug!(
            "[{}] fitting on {} rows ({} after resampling)",
            self.name,
            y.len(),
            labels.len()
        );
        self.classifier.fit(&features, &labels)?;
        self.fitted = true;
        Ok(())
    }

    fn check_fitted(&self) -> Result<()> {
        if self.fitted {
            Ok(())
        } else {
            Err(RiskError::invalid_state(format!(
                "pipeline '{}' must be fitted before predicting",
                self.name
            )))
        }
    }

    /// Preprocessed feature matrix for `x` (no resampling).
    pub fn transform(&self, x: &Frame) -> Result<Array2<f64>> {
        self.check_fitted()?;
        self.preprocessor.transform(x)
    }

    pub fn predict(&self, x: &Frame) -> Result<Array1<i32>> {
        let features = self.transform(x)?;
        self.classifier.predict(&features)
    }

    /// Probability of class 1 for every row.
    pub fn predict_proba(&self, x: &Frame) -> Result<Array1<f64>> {
        let features = self.transform(x)?;
        self.classifier.predict_proba(&features)
    }

    /// Names of the columns the classifier sees.
    pub fn feature_names(&self) -> Result<Vec<String>> {
        self.check_fitted()?;
        self.preprocessor.feature_names_out()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a pipeline written by [`RiskPipeline::save`]. A missing file is
    /// `NotFound`; an undecodable one is `Upstream`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(RiskError::NotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json).map_err(|e| {
            RiskError::upstream(format!("cannot decode {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::Column;
    use crate::models::get_models;

    fn toy_frame() -> (Frame, Vec<i32>) {
        let n = 30;
        let age: Vec<f64> = (0..n).map(|i| 20.0 + i as f64).collect();
        let gender: Vec<String> = (0..n)
            .map(|i| if i % 3 == 0 { "Male" } else { "Female" }.to_string())
            .collect();
        let y: Vec<i32> = (0..n).map(|i| i32::from(i >= 22)).collect();
        let df = Frame::new(vec![
            Column::numeric("age", age),
            Column::categorical("gender", gender),
        ])
        .unwrap();
        (df, y)
    }

    fn logistic_pipeline() -> RiskPipeline {
        let pre = ColumnTransformer::new(vec!["age".into()], vec!["gender".into()]);
        let (name, model) = get_models(42).into_iter().next().unwrap();
        create_pipeline(&name, model, &pre, 42)
    }

    #[test]
    fn predict_before_fit_is_invalid_state() {
        let (df, _) = toy_frame();
        let p = logistic_pipeline();
        let err = p.predict(&df).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidState);
        assert!(p.predict_proba(&df).is_err());
    }

    #[test]
    fn inference_keeps_row_count() {
        let (df, y) = toy_frame();
        let mut p = logistic_pipeline();
        p.fit(&df, &y).unwrap();
        let few = df.select_rows(&[0, 5, 29]);
        assert_eq!(p.predict(&few).unwrap().len(), 3);
        assert_eq!(p.predict_proba(&few).unwrap().len(), 3);
        assert_eq!(p.feature_names().unwrap(), vec!["age", "gender_Male"]);
    }

    #[test]
    fn json_round_trip_preserves_predictions() {
        let (df, y) = toy_frame();
        let mut p = logistic_pipeline();
        p.fit(&df, &y).unwrap();
        let back = RiskPipeline::from_json(&p.to_json().unwrap()).unwrap();
        assert_eq!(back.predict_proba(&df).unwrap(), p.predict_proba(&df).unwrap());
    }
}
