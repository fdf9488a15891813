use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::error::PredictError;
use crate::model::{InferenceTransformer, InputData, PredictResp};
use crate::preprocess::N_FEATURES;

pub type AppState = Arc<InferenceTransformer>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .with_state(state)
}

pub async fn root() -> Json<Value> {
    Json(json!({"message": "Disease prediction API"}))
}

pub async fn health(State(st): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "features": N_FEATURES,
        "labels": st.encoders().label_encoder().len(),
        "backend": st.classifier_name(),
    }))
}

pub async fn predict(
    State(st): State<AppState>,
    Json(body): Json<InputData>,
) -> Result<Json<PredictResp>, PredictError> {
    let predicted_disease = st.predict(body.symptoms.as_slice()).inspect_err(|e| match e {
        PredictError::InvalidInputLength { got } => {
            tracing::debug!(got, "rejected request")
        }
        other => tracing::error!(error = %other, "prediction failed"),
    })?;
    Ok(Json(PredictResp { predicted_disease }))
}
