//! Side-by-side comparison of trained models and best-model selection.
use crate::error::{Result, RiskError};
use crate::metrics::Metrics;
use crate::tracking::Run;
use crate::trainer::ModelResults;

/// Name of the model with the highest test recall. Only a strictly greater
/// recall replaces the current best, so ties go to the earlier entry and a
/// NaN recall never wins.
pub fn best_by_recall(results: &[(String, Metrics)]) -> Option<&str> {
    let mut best: Option<(&str, f64)> = None;
    for (name, metrics) in results {
        let r = metrics.recall;
        match best {
            None if !r.is_nan() => best = Some((name.as_str(), r)),
            Some((_, b)) if r > b => best = Some((name.as_str(), r)),
            _ => {}
        }
    }
    best.map(|(name, _)| name)
}

/// One row per model, one column per metric, four decimals.
pub fn comparison_table(results: &[(String, Metrics)]) -> String {
    let name_width = results
        .iter()
        .map(|(n, _)| n.len())
        .max()
        .unwrap_or(0);
    let mut out = format!("{:<w$}", "", w = name_width);
    for header in Metrics::NAMES {
        out.push_str(&format!("  {:>9}", header));
    }
    for (name, metrics) in results {
        out.push('\n');
        out.push_str(&format!("{:<w$}", name, w = name_width));
        for v in metrics.values() {
            out.push_str(&format!("  {:>9.4}", v));
        }
    }
    out
}

/// Log the comparison, pick the best model by recall, and write
/// `model_comparison/all_metrics.txt` and `model_comparison/best_model.txt`
/// into `run`. Returns the best model's name.
pub fn compare_results(results: &ModelResults, run: &Run) -> Result<String> {
    if results.is_empty() {
        return Err(RiskError::invalid_state("no model results to compare"));
    }
    let table = comparison_table(results);
    log::info!("Final Model Comparison:\n{}", table);

    let best = best_by_recall(results)
        .ok_or_else(|| RiskError::invalid_state("no model has a finite recall"))?
        .to_string();
    log::info!("Based on Recall (Sensitivity), the best model is: {}", best);

    run.log_text(
        &format!("Best model based on Recall: {}", best),
        "model_comparison/best_model.txt",
    )?;
    run.log_text(&table, "model_comparison/all_metrics.txt")?;
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(recall: f64) -> Metrics {
        Metrics {
            accuracy: 0.5,
            recall,
            f1: 0.5,
            roc_auc: 0.5,
        }
    }

    #[test]
    fn highest_recall_wins_and_first_breaks_ties() {
        let r = vec![("A".to_string(), m(0.9)), ("B".to_string(), m(0.95))];
        assert_eq!(best_by_recall(&r), Some("B"));

        let tied = vec![("A".to_string(), m(0.9)), ("B".to_string(), m(0.9))];
        assert_eq!(best_by_recall(&tied), Some("A"));

        let nan = vec![("A".to_string(), m(f64::NAN)), ("B".to_string(), m(0.1))];
        assert_eq!(best_by_recall(&nan), Some("B"));
        assert_eq!(best_by_recall(&[]), None);
    }

    #[test]
    fn table_lists_every_model() {
        let r = vec![("Logistic Regression".to_string(), m(0.61)), ("SVC".to_string(), m(0.7))];
        let table = comparison_table(&r);
        assert_eq!(table.lines().count(), 3);
        assert!(table.lines().next().unwrap().contains("ROC AUC"));
        assert!(table.contains("0.7000"));
    }

    #[test]
    fn compare_writes_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let run = crate::tracking::TrackingStore::new(tmp.path())
            .start_run("Comparison_Summary")
            .unwrap();
        let r = vec![("A".to_string(), m(0.4)), ("B".to_string(), m(0.8))];
        assert_eq!(compare_results(&r, &run).unwrap(), "B");
        let best =
            std::fs::read_to_string(run.dir().join("artifacts/model_comparison/best_model.txt"))
                .unwrap();
        assert_eq!(best, "Best model based on Recall: B");
        assert!(compare_results(&Vec::new(), &run).is_err());
    }
}
