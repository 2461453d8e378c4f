//! Integration tests for metrics, model comparison and config types.

use healthrisk_classifiers::comparator::{best_by_recall, comparison_table};
use healthrisk_classifiers::config::{ModelConfig, ModelType, RANDOM_STATE};
use healthrisk_classifiers::metrics::{get_metrics, roc_auc_score, Metrics};

fn recall_only(recall: f64) -> Metrics {
    Metrics {
        accuracy: 0.0,
        recall,
        f1: 0.0,
        roc_auc: 0.0,
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[test]
fn get_metrics_on_known_confusion() {
    let y_true = [1, 0, 1, 1, 0, 0, 1, 0];
    let y_pred = [1, 0, 0, 1, 0, 1, 1, 0];
    let y_prob = [0.9, 0.1, 0.4, 0.8, 0.2, 0.6, 0.7, 0.3];
    let m = get_metrics(&y_true, &y_pred, &y_prob).unwrap();
    assert!((m.accuracy - 0.75).abs() < 1e-12);
    assert!((m.recall - 0.75).abs() < 1e-12);
    assert!((m.f1 - 0.75).abs() < 1e-12);
    // positives 0.9, 0.4, 0.8, 0.7 vs negatives 0.1, 0.2, 0.6, 0.3: 15 of 16 pairs
    assert!((m.roc_auc - 15.0 / 16.0).abs() < 1e-12);
}

#[test]
fn auc_is_invariant_to_monotone_rescaling() {
    let y = [0, 1, 1, 0, 1, 0, 0, 1];
    let s = [0.3, 0.35, 0.8, 0.1, 0.2, 0.55, 0.4, 0.9];
    let scaled: Vec<f64> = s.iter().map(|v| v * 10.0 - 3.0).collect();
    assert_eq!(roc_auc_score(&y, &s).unwrap(), roc_auc_score(&y, &scaled).unwrap());
}

#[test]
fn mismatched_lengths_fail() {
    assert!(get_metrics(&[0, 1], &[0], &[0.1, 0.9]).is_err());
}

// ---------------------------------------------------------------------------
// Comparator
// ---------------------------------------------------------------------------

#[test]
fn best_model_is_highest_recall() {
    let results = vec![
        ("A".to_string(), recall_only(0.9)),
        ("B".to_string(), recall_only(0.95)),
    ];
    assert_eq!(best_by_recall(&results), Some("B"));
}

#[test]
fn first_model_wins_a_tie() {
    let results = vec![
        ("Logistic Regression".to_string(), recall_only(0.7)),
        ("Random Forest".to_string(), recall_only(0.6)),
        ("XGBoost".to_string(), recall_only(0.7)),
    ];
    assert_eq!(best_by_recall(&results), Some("Logistic Regression"));
    let table = comparison_table(&results);
    assert_eq!(table.lines().count(), 4);
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[test]
fn default_config_is_seeded_logistic_regression() {
    let cfg = ModelConfig::default();
    assert_eq!(cfg.random_state, RANDOM_STATE);
    assert_eq!(cfg.model_type.display_name(), "Logistic Regression");
}

#[test]
fn model_type_parses_case_insensitively() {
    let mt: ModelType = "  XGBOOST ".parse().unwrap();
    assert_eq!(mt, ModelType::xgboost());
    assert!("knn".parse::<ModelType>().is_err());
}
