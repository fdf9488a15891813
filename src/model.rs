use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{ArtifactError, PredictError};
use crate::linear::LinearClassifier;
use crate::onnx_backend::{self, OnnxRuntime};
use crate::preprocess::{Encoded, EncoderTable, StandardScaler, N_FEATURES};

/// A fitted classifier over the scaled feature vector, returning the top-1 class index.
pub trait Classifier: Send + Sync {
    fn predict(&self, x: &Array1<f32>) -> Result<i64, PredictError>;

    /// Input width, when the model can tell.
    fn n_features(&self) -> Option<usize> {
        None
    }

    fn name(&self) -> &str {
        "classifier"
    }
}

pub type DynClassifier = Arc<dyn Classifier>;

#[derive(Debug, Clone, Deserialize)]
pub struct InputData {
    pub symptoms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictResp {
    pub predicted_disease: String,
}

/// Full result of one prediction, for callers that want more than the label.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub class_index: i64,
    pub encoded: Encoded,
}

/// File locations of the three fitted artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub encoders: PathBuf,
    pub scaler: PathBuf,
    pub classifier: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            encoders: dir.join("encoders.json"),
            scaler: dir.join("scaler.json"),
            classifier: dir.join("final_model.onnx"),
        }
    }
}

/// Picks the loader from the file extension: `.json` linear model, `.onnx` graph.
pub fn load_classifier(path: &Path, runtime: OnnxRuntime) -> Result<DynClassifier, ArtifactError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("json") => Ok(Arc::new(LinearClassifier::from_json_file(path)?)),
        Some("onnx") => onnx_backend::load(runtime, path),
        _ => Err(ArtifactError::UnsupportedClassifier(path.to_path_buf())),
    }
}

/// encode → scale → classify → decode over artifacts that never change after load.
pub struct InferenceTransformer {
    encoders: EncoderTable,
    scaler: StandardScaler,
    classifier: DynClassifier,
}

impl InferenceTransformer {
    pub fn new(
        encoders: EncoderTable,
        scaler: StandardScaler,
        classifier: DynClassifier,
    ) -> Result<Self, ArtifactError> {
        if let Some(width) = classifier.n_features() {
            if width != N_FEATURES {
                return Err(ArtifactError::Dimension {
                    what: format!("{} classifier input", classifier.name()),
                    expected: N_FEATURES,
                    got: width,
                });
            }
        }
        Ok(Self {
            encoders,
            scaler,
            classifier,
        })
    }

    pub fn load(paths: &ArtifactPaths, runtime: OnnxRuntime) -> Result<Self, ArtifactError> {
        let encoders = EncoderTable::from_json_file(&paths.encoders)?;
        let scaler = StandardScaler::from_json_file(&paths.scaler)?;
        let classifier = load_classifier(&paths.classifier, runtime)?;
        let transformer = Self::new(encoders, scaler, classifier)?;

        tracing::info!(
            encoders = %paths.encoders.display(),
            scaler = %paths.scaler.display(),
            classifier = %paths.classifier.display(),
            backend = transformer.classifier_name(),
            labels = transformer.encoders.label_encoder().len(),
            "artifacts loaded"
        );
        Ok(transformer)
    }

    pub fn encode<S: AsRef<str>>(&self, symptoms: &[S]) -> Result<Encoded, PredictError> {
        self.encoders.encode(symptoms)
    }

    pub fn predict_detailed<S: AsRef<str>>(
        &self,
        symptoms: &[S],
    ) -> Result<Prediction, PredictError> {
        let encoded = self.encode(symptoms)?;
        let x = self.scaler.transform(&encoded.indices);
        let class_index = self.classifier.predict(&x)?;
        let label = self.encoders.decode(class_index)?.to_string();

        tracing::debug!(
            encoded = ?encoded.indices,
            fallbacks = ?encoded.fallbacks,
            class_index,
            %label,
            "prediction"
        );
        Ok(Prediction {
            label,
            class_index,
            encoded,
        })
    }

    pub fn predict<S: AsRef<str>>(&self, symptoms: &[S]) -> Result<String, PredictError> {
        self.predict_detailed(symptoms).map(|p| p.label)
    }

    pub fn encoders(&self) -> &EncoderTable {
        &self.encoders
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }
}
