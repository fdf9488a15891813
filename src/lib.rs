//! Disease prediction from six categorical symptoms.
//!
//! Fitted artifacts (per-column encoders, a standard scaler and a classifier)
//! are loaded once into an [`InferenceTransformer`] and shared read-only; each
//! request runs encode → scale → classify → decode over them.

pub mod api;
pub mod config;
pub mod error;
pub mod linear;
pub mod model;
pub mod onnx_backend;
pub mod preprocess;

pub use error::{ArtifactError, PredictError};
pub use model::{ArtifactPaths, Classifier, InferenceTransformer, Prediction};

/// Installs the compact `tracing` subscriber shared by both binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .compact()
        .init();
}
