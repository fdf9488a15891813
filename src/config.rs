use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::model::ArtifactPaths;
use crate::onnx_backend::OnnxRuntime;

/// Process settings, read from the environment once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: IpAddr,
    pub port: u16,
    pub model_dir: PathBuf,
    pub artifacts: ArtifactPaths,
    pub onnx_runtime: OnnxRuntime,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup; unset or unparsable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST")
            .and_then(|s| s.parse().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let port = lookup("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(8000);

        let model_dir = PathBuf::from(lookup("MODEL_DIR").unwrap_or_else(|| "./models".into()));
        let defaults = ArtifactPaths::in_dir(&model_dir);
        let artifacts = ArtifactPaths {
            encoders: lookup("ENCODERS_JSON")
                .map(PathBuf::from)
                .unwrap_or(defaults.encoders),
            scaler: lookup("SCALER_JSON")
                .map(PathBuf::from)
                .unwrap_or(defaults.scaler),
            classifier: lookup("CLASSIFIER_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.classifier),
        };

        let onnx_runtime = match lookup("ONNX_BACKEND").map(|s| s.parse::<OnnxRuntime>()) {
            Some(Ok(runtime)) => runtime,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "ignoring ONNX_BACKEND");
                OnnxRuntime::default()
            }
            None => OnnxRuntime::default(),
        };

        Self {
            host,
            port,
            model_dir,
            artifacts,
            onnx_runtime,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
