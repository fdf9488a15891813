use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures while loading the model directory. Fatal at startup.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("encoder table has no column {0:?}")]
    MissingColumn(String),

    #[error("encoder for {column:?} lists class {class:?} more than once")]
    DuplicateClass { column: String, class: String },

    #[error("{what}: expected {expected} values, got {got}")]
    Dimension {
        what: String,
        expected: usize,
        got: usize,
    },

    #[error("failed to load classifier {path}: {message}")]
    Model { path: PathBuf, message: String },

    #[error("unsupported classifier file {0} (expected .onnx or .json)")]
    UnsupportedClassifier(PathBuf),

    #[error("onnx backend {0:?} is not compiled into this build")]
    BackendUnavailable(String),
}

/// Request-scoped failures of a single prediction.
#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Exactly 6 symptoms are required")]
    InvalidInputLength { got: usize },

    #[error("classifier returned class index {0} which has no label")]
    UnknownClass(i64),

    #[error("inference failed: {0}")]
    Inference(String),
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = match self {
            PredictError::InvalidInputLength { .. } => StatusCode::BAD_REQUEST,
            PredictError::UnknownClass(_) | PredictError::Inference(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
