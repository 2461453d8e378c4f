//! Per-feature coefficient / importance tables for fitted pipelines.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{ClassifierModel, FeatureWeights};
use crate::pipeline::RiskPipeline;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceRow {
    pub feature: String,
    /// Signed coefficient, linear models only.
    pub coefficient: Option<f64>,
    pub importance: f64,
}

/// Rows sorted by descending importance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportanceTable {
    rows: Vec<ImportanceRow>,
}

impl ImportanceTable {
    pub fn new(mut rows: Vec<ImportanceRow>) -> Self {
        // stable, so equal importances keep feature order
        rows.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        ImportanceTable { rows }
    }

    pub fn rows(&self) -> &[ImportanceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn top(&self, n: usize) -> ImportanceTable {
        ImportanceTable {
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    fn has_coefficients(&self) -> bool {
        self.rows.iter().any(|r| r.coefficient.is_some())
    }
}

impl fmt::Display for ImportanceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return Ok(());
        }
        let width = self
            .rows
            .iter()
            .map(|r| r.feature.len())
            .chain(std::iter::once("Feature".len()))
            .max()
            .unwrap_or(0);
        let with_coef = self.has_coefficients();

        write!(f, "{:<width$}", "Feature", width = width)?;
        if with_coef {
            write!(f, "  {:>12}", "Coefficient")?;
        }
        write!(f, "  {:>12}", "Importance")?;
        for row in &self.rows {
            write!(f, "\n{:<width$}", row.feature, width = width)?;
            if with_coef {
                match row.coefficient {
                    Some(c) => write!(f, "  {:>12.6}", c)?,
                    None => write!(f, "  {:>12}", "")?,
                }
            }
            write!(f, "  {:>12.6}", row.importance)?;
        }
        Ok(())
    }
}

/// Coefficients (ranked by magnitude) for the linear model, impurity or gain
/// importances for the tree ensembles, and an empty table for models without
/// per-feature weights.
pub fn get_feature_importances(pipeline: &RiskPipeline) -> Result<ImportanceTable> {
    let names = pipeline.feature_names()?;
    let rows = match pipeline.classifier().feature_weights() {
        FeatureWeights::Coefficients(coef) => names
            .into_iter()
            .zip(coef)
            .map(|(feature, c)| ImportanceRow {
                feature,
                coefficient: Some(c),
                importance: c.abs(),
            })
            .collect(),
        FeatureWeights::Importances(imp) => names
            .into_iter()
            .zip(imp)
            .map(|(feature, importance)| ImportanceRow {
                feature,
                coefficient: None,
                importance,
            })
            .collect(),
        FeatureWeights::Unavailable => {
            log::debug!("[{}] exposes no feature importances", pipeline.name);
            Vec::new()
        }
    };
    Ok(ImportanceTable::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(feature: &str, coefficient: Option<f64>, importance: f64) -> ImportanceRow {
        ImportanceRow {
            feature: feature.to_string(),
            coefficient,
            importance,
        }
    }

    #[test]
    fn sorted_descending_and_truncated() {
        let table = ImportanceTable::new(vec![
            row("age", Some(-0.2), 0.2),
            row("bmi", Some(1.5), 1.5),
            row("smoker", Some(-0.9), 0.9),
        ]);
        let names: Vec<&str> = table.rows().iter().map(|r| r.feature.as_str()).collect();
        assert_eq!(names, ["bmi", "smoker", "age"]);
        assert_eq!(table.top(2).len(), 2);
        assert_eq!(table.top(10).len(), 3);
    }

    #[test]
    fn rendering_has_header_and_one_line_per_row() {
        let table = ImportanceTable::new(vec![row("age", None, 0.7), row("bmi", None, 0.3)]);
        let text = table.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Feature"));
        assert!(!lines[0].contains("Coefficient"));
        assert!(lines[1].starts_with("age"));

        let linear = ImportanceTable::new(vec![row("age", Some(-0.5), 0.5)]);
        assert!(linear.to_string().contains("Coefficient"));
        assert!(ImportanceTable::default().to_string().is_empty());
    }
}
