//! Column-wise preprocessing for the risk models.
//!
//! Continuous columns are standardized with a [`StandardScaler`], categorical
//! columns are one-hot encoded with a [`OneHotEncoder`], and every other
//! column of the input frame passes through unchanged. The assembled
//! [`ColumnTransformer`] learns its parameters from the training partition
//! only and is reused as-is at inference time.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::data_handling::{ColumnData, Frame};
use crate::error::{Result, RiskError};

/// Columns standardized by the default preprocessor.
pub const CONTINUOUS_FEATURES: [&str; 13] = [
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
];

/// Columns one-hot encoded by the default preprocessor.
pub const CATEGORICAL_FEATURES: [&str; 1] = ["gender"];

/// Per-column mean/std standardization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Fit a `StandardScaler` from a matrix where rows are samples and columns
/// are features. Uses the population variance; constant columns get a scale
/// of 1 so they map to zero.
pub fn fit_scaler(x: &Array2<f64>) -> Result<StandardScaler> {
    if x.nrows() == 0 {
        return Err(RiskError::invalid_state(
            "cannot fit a scaler on an empty matrix",
        ));
    }
    let mean = x
        .mean_axis(Axis(0))
        .ok_or_else(|| RiskError::invalid_state("cannot fit a scaler on an empty matrix"))?;
    let scale = x
        .std_axis(Axis(0), 0.0)
        .mapv(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s });

    Ok(StandardScaler {
        mean: mean.to_vec(),
        scale: scale.to_vec(),
    })
}

impl StandardScaler {
    /// Transform all rows and return a new matrix.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.mean.len() {
            return Err(RiskError::invalid_state(format!(
                "scaler fitted on {} columns, got {}",
                self.mean.len(),
                x.ncols()
            )));
        }
        let mut out = x.clone();
        for (c, mut col) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (m, s) = (self.mean[c], self.scale[c]);
            col.mapv_inplace(|v| (v - m) / s);
        }
        Ok(out)
    }
}

/// One-hot encoder for a single categorical column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub drop_if_binary: bool,
    pub handle_unknown_ignore: bool,
    /// Sorted category vocabulary learned at fit time.
    pub categories: Vec<String>,
    /// Index of the category that gets no output column.
    pub dropped: Option<usize>,
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        OneHotEncoder {
            drop_if_binary: true,
            handle_unknown_ignore: true,
            categories: Vec::new(),
            dropped: None,
        }
    }
}

impl OneHotEncoder {
    pub fn fit(&mut self, values: &[String]) -> Result<()> {
        let mut categories: Vec<String> = values.to_vec();
        categories.sort();
        categories.dedup();
        if categories.is_empty() {
            return Err(RiskError::invalid_state(
                "cannot fit a one-hot encoder without categories",
            ));
        }
        self.dropped = if self.drop_if_binary && categories.len() == 2 {
            Some(0)
        } else {
            None
        };
        self.categories = categories;
        Ok(())
    }

    /// Number of output columns.
    pub fn n_outputs(&self) -> usize {
        self.categories.len() - usize::from(self.dropped.is_some())
    }

    fn output_index(&self, category: usize) -> Option<usize> {
        match self.dropped {
            Some(d) if d == category => None,
            Some(d) if category > d => Some(category - 1),
            _ => Some(category),
        }
    }

    /// Encode values into `n_outputs()` indicator columns. Unknown categories
    /// map to an all-zero row when `handle_unknown_ignore` is set.
    pub fn transform(&self, values: &[String]) -> Result<Array2<f64>> {
        let mut out = Array2::<f64>::zeros((values.len(), self.n_outputs()));
        for (r, v) in values.iter().enumerate() {
            match self.categories.binary_search(v) {
                Ok(k) => {
                    if let Some(c) = self.output_index(k) {
                        out[[r, c]] = 1.0;
                    }
                }
                Err(_) if self.handle_unknown_ignore => {
                    log::debug!("Unknown category '{}' encoded as all zeros", v);
                }
                Err(_) => {
                    return Err(RiskError::invalid_state(format!(
                        "unknown category '{}'",
                        v
                    )))
                }
            }
        }
        Ok(out)
    }

    pub fn feature_names(&self, column: &str) -> Vec<String> {
        self.categories
            .iter()
            .enumerate()
            .filter(|(k, _)| self.output_index(*k).is_some())
            .map(|(_, c)| format!("{}_{}", column, c))
            .collect()
    }
}

/// Column-wise transformer: scale numeric columns, encode categorical
/// columns, pass the remaining (numeric) columns through.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    scaler: Option<StandardScaler>,
    encoders: Vec<OneHotEncoder>,
    passthrough: Vec<String>,
}

/// Build the default (unfitted) preprocessor for the health dataset.
pub fn create_preprocessor() -> ColumnTransformer {
    crate::config::PreprocessorConfig::default().build()
}

fn categorical_values(df: &Frame, name: &str) -> Result<Vec<String>> {
    match df.column(name).map(|c| &c.data) {
        Some(ColumnData::Categorical(v)) => Ok(v.clone()),
        Some(ColumnData::Numeric(v)) => Ok(v.iter().map(|x| x.to_string()).collect()),
        None => Err(RiskError::invalid_state(format!(
            "column '{}' not found",
            name
        ))),
    }
}

fn numeric_matrix(df: &Frame, names: &[String]) -> Result<Array2<f64>> {
    let n = df.n_rows();
    let mut out = Array2::<f64>::zeros((n, names.len()));
    for (c, name) in names.iter().enumerate() {
        let values = df.numeric(name)?;
        for (r, v) in values.iter().enumerate() {
            out[[r, c]] = *v;
        }
    }
    Ok(out)
}

impl ColumnTransformer {
    pub fn new(numeric_columns: Vec<String>, categorical_columns: Vec<String>) -> Self {
        ColumnTransformer {
            numeric_columns,
            categorical_columns,
            scaler: None,
            encoders: Vec::new(),
            passthrough: Vec::new(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.scaler.is_some()
    }

    /// Learn scaling parameters and category vocabularies from `df`.
    /// Refitting replaces everything learned before.
    pub fn fit(&mut self, df: &Frame) -> Result<()> {
        if df.is_empty() {
            return Err(RiskError::invalid_state(
                "cannot fit the preprocessor on an empty frame",
            ));
        }
        let x = numeric_matrix(df, &self.numeric_columns)?;
        let scaler = fit_scaler(&x)?;

        let mut encoders = Vec::with_capacity(self.categorical_columns.len());
        for name in &self.categorical_columns {
            let mut enc = OneHotEncoder::default();
            enc.fit(&categorical_values(df, name)?)?;
            encoders.push(enc);
        }

        let mut passthrough = Vec::new();
        for col in df.columns() {
            if self.numeric_columns.contains(&col.name)
                || self.categorical_columns.contains(&col.name)
            {
                continue;
            }
            if !col.is_numeric() {
                return Err(RiskError::invalid_state(format!(
                    "passthrough column '{}' is not numeric",
                    col.name
                )));
            }
            passthrough.push(col.name.clone());
        }

        log::trace!(
            "Preprocessor fitted: {} scaled, {} encoded, {} passthrough",
            self.numeric_columns.len(),
            encoders.len(),
            passthrough.len()
        );
        self.scaler = Some(scaler);
        self.encoders = encoders;
        self.passthrough = passthrough;
        Ok(())
    }

    /// Map raw records to the numeric feature matrix.
    pub fn transform(&self, df: &Frame) -> Result<Array2<f64>> {
        let scaler = self.scaler.as_ref().ok_or_else(|| {
            RiskError::invalid_state("preprocessor must be fitted before transform")
        })?;

        let mut blocks = vec![scaler.transform(&numeric_matrix(df, &self.numeric_columns)?)?];
        for (name, enc) in self.categorical_columns.iter().zip(&self.encoders) {
            blocks.push(enc.transform(&categorical_values(df, name)?)?);
        }
        blocks.push(numeric_matrix(df, &self.passthrough)?);

        let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
        ndarray::concatenate(Axis(1), &views)
            .map_err(|e| RiskError::invalid_state(format!("feature assembly failed: {}", e)))
    }

    pub fn fit_transform(&mut self, df: &Frame) -> Result<Array2<f64>> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Output feature names in transform column order.
    pub fn feature_names_out(&self) -> Result<Vec<String>> {
        if !self.is_fitted() {
            return Err(RiskError::invalid_state(
                "preprocessor must be fitted before reading feature names",
            ));
        }
        let mut names = self.numeric_columns.clone();
        for (name, enc) in self.categorical_columns.iter().zip(&self.encoders) {
            names.extend(enc.feature_names(name));
        }
        names.extend(self.passthrough.iter().cloned());
        Ok(names)
    }
}
