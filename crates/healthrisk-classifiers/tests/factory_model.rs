use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use healthrisk_classifiers::config::{ModelConfig, ModelType};
use healthrisk_classifiers::models::{build_model, get_models, ClassifierModel, FeatureWeights};

/// Two noisy blobs; only the first feature carries signal.
fn blobs(n: usize, seed: u64) -> (Array2<f64>, Vec<i32>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut x = Array2::<f64>::zeros((n, 3));
    let mut y = Vec::with_capacity(n);
    for r in 0..n {
        let label = i32::from(r % 3 == 0);
        let centre = if label == 1 { 2.0 } else { -2.0 };
        x[[r, 0]] = centre + rng.gen_range(-1.0..1.0);
        x[[r, 1]] = rng.gen_range(-1.0..1.0);
        x[[r, 2]] = rng.gen_range(-1.0..1.0);
        y.push(label);
    }
    (x, y)
}

fn accuracy(pred: &[i32], y: &[i32]) -> f64 {
    pred.iter().zip(y).filter(|(a, b)| a == b).count() as f64 / y.len() as f64
}

#[test]
fn every_registry_model_learns_separable_data() {
    let (x, y) = blobs(150, 1);
    let (x_test, y_test) = blobs(60, 2);
    for (name, mut model) in get_models(42) {
        model.fit(&x, &y).unwrap();
        assert!(model.is_fitted(), "{} not fitted", name);

        let proba = model.predict_proba(&x_test).unwrap();
        assert_eq!(proba.len(), x_test.nrows());
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)), "{} proba out of range", name);

        let pred = model.predict(&x_test).unwrap().to_vec();
        let acc = accuracy(&pred, &y_test);
        assert!(acc > 0.9, "{} accuracy {}", name, acc);
    }
}

#[test]
fn feature_weights_follow_model_family() {
    let (x, y) = blobs(120, 3);
    for (name, mut model) in get_models(42) {
        model.fit(&x, &y).unwrap();
        match (name.as_str(), model.feature_weights()) {
            ("Logistic Regression", FeatureWeights::Coefficients(c)) => {
                assert_eq!(c.len(), 3);
                assert!(c[0].abs() > c[1].abs() && c[0].abs() > c[2].abs());
            }
            ("Random Forest" | "XGBoost", FeatureWeights::Importances(imp)) => {
                assert_eq!(imp.len(), 3);
                assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
                assert!(imp[0] > imp[1] && imp[0] > imp[2], "{}: {:?}", name, imp);
            }
            ("SVC", FeatureWeights::Unavailable) => {}
            (other, w) => panic!("unexpected weights for {}: {:?}", other, w),
        }
    }
}

#[test]
fn identical_seeds_give_identical_models() {
    let (x, y) = blobs(90, 4);
    for mt in ModelType::registry() {
        let mut a = build_model(ModelConfig::new(42, mt.clone()));
        let mut b = build_model(ModelConfig::new(42, mt.clone()));
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap(), "{}", mt);
    }
}

#[test]
fn predicting_unfitted_models_fails() {
    let (x, _) = blobs(10, 5);
    for (_, model) in get_models(42) {
        assert!(model.predict_proba(&x).is_err());
    }
}

#[test]
fn single_class_labels_are_rejected() {
    let (x, _) = blobs(10, 6);
    let y = vec![0; 10];
    for (_, mut model) in get_models(42) {
        assert!(model.fit(&x, &y).is_err());
    }
}
