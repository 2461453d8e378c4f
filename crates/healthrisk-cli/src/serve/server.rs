use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Form, Router};

use healthrisk_classifiers::serving::{predict_record, ModelCache, PatientRecord};

use super::config::ServeConfig;
use super::pages::{form_page, unavailable_page, ModelInfo, Outcome};

/// Shared by every request: the configuration and the one model cache of
/// the process.
pub struct AppState {
    pub config: ServeConfig,
    pub cache: ModelCache,
}

impl AppState {
    pub fn new(config: ServeConfig) -> Self {
        let cache = ModelCache::new(config.artifact_source());
        AppState { config, cache }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

fn render(state: &AppState, record: &PatientRecord, outcome: impl FnOnce() -> Outcome) -> Html<String> {
    match state.cache.get() {
        Ok(loaded) => {
            let info = ModelInfo {
                model_type: loaded.model_name(),
                load_path: Some(loaded.path.as_path()),
            };
            Html(form_page(&info, record, &outcome()).into_string())
        }
        Err(e) => {
            log::error!("[HealthRisk::Serve] Model unavailable: {}", e);
            Html(unavailable_page(&state.config.model_label, &e.to_string()).into_string())
        }
    }
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    render(&state, &PatientRecord::default(), || Outcome::None)
}

async fn predict(
    State(state): State<Arc<AppState>>,
    form: std::result::Result<Form<PatientRecord>, FormRejection>,
) -> Html<String> {
    let record = match form {
        Ok(Form(record)) => record,
        Err(rejection) => {
            let message = format!("Invalid form input: {}", rejection.body_text());
            log::warn!("[HealthRisk::Serve] {}", message);
            return render(&state, &PatientRecord::default(), || Outcome::Error(message));
        }
    };

    render(&state, &record, || {
        let Some(loaded) = state.cache.loaded() else {
            return Outcome::Error("No model loaded".to_string());
        };
        match predict_record(&loaded.pipeline, &record) {
            Ok(prediction) => {
                log::info!(
                    "[HealthRisk::Serve] outcome={} probability={:.4}",
                    prediction.outcome,
                    prediction.probability
                );
                Outcome::Predicted(prediction)
            }
            Err(e) => {
                log::warn!("[HealthRisk::Serve] Prediction error: {}", e);
                Outcome::Error(format!("Prediction error: {}", e))
            }
        }
    })
}

/// Load the model eagerly (failures only warn) and serve until the process
/// is stopped.
pub fn run_server(config: ServeConfig) -> Result<()> {
    let address = config.bind_address();
    let state = Arc::new(AppState::new(config));
    match state.cache.get() {
        Ok(loaded) => log::info!(
            "[HealthRisk::Serve] Serving '{}' from {}",
            loaded.model_name(),
            loaded.path.display()
        ),
        Err(e) => log::warn!(
            "[HealthRisk::Serve] No model loaded yet ({}); the form will retry on each request",
            e
        ),
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind {}", address))?;
        log::info!("[HealthRisk::Serve] Listening on http://{}", address);
        axum::serve(listener, create_router(state))
            .await
            .context("Server error")
    })
}
