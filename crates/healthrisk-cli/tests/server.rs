//! Router tests driven through `tower::ServiceExt::oneshot`.

mod common;

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use healthrisk_classifiers::config::{RANDOM_STATE, TARGET_COLUMN, TEST_SIZE};
use healthrisk_classifiers::data_handling::{load_data, split_data};
use healthrisk_classifiers::preprocessing::create_preprocessor;
use healthrisk_classifiers::tracking::TrackingStore;
use healthrisk_classifiers::trainer::{train_and_evaluate_models, TrainingContext};
use healthrisk_cli::serve::config::ServeConfig;
use healthrisk_cli::serve::server::{create_router, AppState};

fn train_fixture(dir: &Path) {
    let data = dir.join("health.csv");
    common::write_health_csv(&data, 300);
    let df = load_data(&data).unwrap();
    let split = split_data(&df, TARGET_COLUMN, TEST_SIZE, RANDOM_STATE).unwrap();
    let ctx = TrainingContext::new(TrackingStore::new(dir.join("mlruns")));
    train_and_evaluate_models(&split, &create_preprocessor(), Some("Logistic Regression"), &ctx)
        .unwrap();
}

fn state_for(root: &Path) -> Arc<AppState> {
    let config = ServeConfig {
        tracking_root: root.to_path_buf(),
        ..ServeConfig::default()
    };
    Arc::new(AppState::new(config))
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn form_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

const HIGH_RISK_FORM: &str = "age=85&bmi=44.0&daily_steps=800&sleep_hours=4.5&water_intake_l=1.0\
    &calories_consumed=4200&resting_hr=110&systolic_bp=188&diastolic_bp=120&cholesterol=290\
    &family_history=Yes&smoker=Yes&alcohol=Yes&gender=Male";

// ---------------------------------------------------------------------------
// Without a model
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(state_for(&dir.path().join("mlruns")));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn index_without_model_disables_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_for(&dir.path().join("mlruns"));
    let app = create_router(state.clone());
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("Prediction functionality is disabled"));
    assert!(!html.contains("Predict Risk Score"));
    assert!(state.cache.loaded().is_none());
}

// ---------------------------------------------------------------------------
// With a trained model
// ---------------------------------------------------------------------------

#[tokio::test]
async fn index_shows_form_and_model_details() {
    let dir = tempfile::tempdir().unwrap();
    train_fixture(dir.path());
    let app = create_router(state_for(&dir.path().join("mlruns")));
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let html = body_string(response).await;
    assert!(html.contains("Predict Risk Score"));
    assert!(html.contains("Logistic Regression"));
    assert!(html.contains("model.json"));
    assert!(!html.contains("Prediction Result"));
}

#[tokio::test]
async fn predict_renders_result_and_reuses_cache() {
    let dir = tempfile::tempdir().unwrap();
    train_fixture(dir.path());
    let state = state_for(&dir.path().join("mlruns"));

    let response = create_router(state.clone())
        .oneshot(form_request(HIGH_RISK_FORM))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("Prediction Result"));
    assert!(html.contains("Disease Risk Predicted (Probability: "));
    assert!(html.contains("Show Raw Input Data"));
    let first = state.cache.loaded().unwrap();

    create_router(state.clone())
        .oneshot(form_request(HIGH_RISK_FORM))
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&first, &state.cache.loaded().unwrap()));
}

#[tokio::test]
async fn invalid_form_renders_inline_error() {
    let dir = tempfile::tempdir().unwrap();
    train_fixture(dir.path());
    let app = create_router(state_for(&dir.path().join("mlruns")));
    let response = app.oneshot(form_request("age=old&bmi=29.0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("Invalid form input"));
    assert!(!html.contains("Prediction Result"));
}
