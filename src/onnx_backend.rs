use std::path::Path;
use std::str::FromStr;

use crate::error::ArtifactError;
use crate::model::DynClassifier;

/// Which ONNX runtime executes `.onnx` classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnnxRuntime {
    #[default]
    Tract,
    Ort,
}

impl FromStr for OnnxRuntime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tract" => Ok(OnnxRuntime::Tract),
            "ort" | "onnxruntime" => Ok(OnnxRuntime::Ort),
            _ => Err(format!("unknown onnx backend: {s} (expected tract or ort)")),
        }
    }
}

impl std::fmt::Display for OnnxRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OnnxRuntime::Tract => write!(f, "tract"),
            OnnxRuntime::Ort => write!(f, "ort"),
        }
    }
}

/// Loads an ONNX classifier with the requested runtime.
#[cfg_attr(
    not(any(feature = "tract", feature = "ort")),
    allow(unused_variables)
)]
pub fn load(runtime: OnnxRuntime, model_path: &Path) -> Result<DynClassifier, ArtifactError> {
    match runtime {
        #[cfg(feature = "tract")]
        OnnxRuntime::Tract => Ok(std::sync::Arc::new(tract_backend::TractBackend::new(
            model_path,
        )?)),
        #[cfg(feature = "ort")]
        OnnxRuntime::Ort => Ok(std::sync::Arc::new(ort_backend::OrtBackend::new(model_path)?)),
        #[allow(unreachable_patterns)]
        other => Err(ArtifactError::BackendUnavailable(other.to_string())),
    }
}

#[cfg(feature = "tract")]
pub mod tract_backend {
    use std::path::Path;

    use ndarray::Array1;
    use tract_onnx::prelude::*;

    use crate::error::{ArtifactError, PredictError};
    use crate::model::Classifier;
    use crate::preprocess::N_FEATURES;

    /// tract backend. The runnable plan is immutable, so `predict` needs no lock.
    pub struct TractBackend {
        model: TypedRunnableModel<TypedModel>,
    }

    impl TractBackend {
        /// Loads the graph with its input pinned to `f32 [1, 6]`; a model that
        /// cannot take six features fails here rather than per request.
        pub fn new(model_path: &Path) -> Result<Self, ArtifactError> {
            let fail = |e: TractError| ArtifactError::Model {
                path: model_path.to_path_buf(),
                message: format!("{e:#}"),
            };

            let mut model = tract_onnx::onnx().model_for_path(model_path).map_err(fail)?;
            model
                .set_input_fact(0, f32::fact([1, N_FEATURES]).into())
                .map_err(fail)?;

            let model = model
                .into_optimized()
                .map_err(fail)?
                .into_runnable()
                .map_err(fail)?;

            Ok(Self { model })
        }
    }

    impl Classifier for TractBackend {
        fn predict(&self, x: &Array1<f32>) -> Result<i64, PredictError> {
            let fail = |e: TractError| PredictError::Inference(format!("{e:#}"));

            let input = tract_ndarray::Array2::from_shape_vec(
                (1, x.len()),
                x.iter().copied().collect(),
            )
            .map_err(|e| PredictError::Inference(e.to_string()))?;

            let outputs = self
                .model
                .run(tvec![input.into_tensor().into()])
                .map_err(fail)?;

            // first output is the label, [1] or [1, 1]
            let output = outputs
                .first()
                .ok_or_else(|| PredictError::Inference("no outputs from model".to_string()))?;
            if !output.datum_type().is_integer() {
                return Err(PredictError::Inference(format!(
                    "first model output is {:?}, expected an integer class label",
                    output.datum_type()
                )));
            }
            let label = output.cast_to::<i64>().map_err(fail)?;
            let view = label.to_array_view::<i64>().map_err(fail)?;
            view.iter()
                .next()
                .copied()
                .ok_or_else(|| PredictError::Inference("empty output tensor".to_string()))
        }

        fn n_features(&self) -> Option<usize> {
            Some(N_FEATURES)
        }

        fn name(&self) -> &str {
            "tract"
        }
    }
}

#[cfg(feature = "ort")]
pub mod ort_backend {
    use std::path::Path;
    use std::sync::Mutex;

    use ndarray::{Array1, Array2};
    use ort::session::Session;
    use ort::value::TensorRef;

    use crate::error::{ArtifactError, PredictError};
    use crate::model::Classifier;

    /// ONNX Runtime backend. `Session::run` takes `&mut self`, hence the Mutex.
    pub struct OrtBackend {
        session: Mutex<Session>,
    }

    impl OrtBackend {
        pub fn new(model_path: &Path) -> Result<Self, ArtifactError> {
            let fail = |e: ort::Error| ArtifactError::Model {
                path: model_path.to_path_buf(),
                message: e.to_string(),
            };

            let session = Session::builder()
                .map_err(fail)?
                .commit_from_file(model_path)
                .map_err(fail)?;

            Ok(Self {
                session: Mutex::new(session),
            })
        }
    }

    impl Classifier for OrtBackend {
        fn predict(&self, x: &Array1<f32>) -> Result<i64, PredictError> {
            let fail = |e: ort::Error| PredictError::Inference(e.to_string());

            let arr = Array2::from_shape_vec((1, x.len()), x.to_vec())
                .map_err(|e| PredictError::Inference(e.to_string()))?;
            let inputs = ort::inputs![TensorRef::from_array_view(arr.view()).map_err(fail)?];

            let mut session = self
                .session
                .lock()
                .map_err(|_| PredictError::Inference("onnx session poisoned".to_string()))?;
            let outputs = session.run(inputs).map_err(fail)?;

            // label output is int64, [1] or [1, 1]
            let view = outputs[0].try_extract_array::<i64>().map_err(fail)?;
            view.iter()
                .next()
                .copied()
                .ok_or_else(|| PredictError::Inference("empty output tensor".to_string()))
        }

        fn name(&self) -> &str {
            "ort"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_from_str() {
        assert_eq!("tract".parse::<OnnxRuntime>().unwrap(), OnnxRuntime::Tract);
        assert_eq!("ORT".parse::<OnnxRuntime>().unwrap(), OnnxRuntime::Ort);
        assert_eq!(
            "onnxruntime".parse::<OnnxRuntime>().unwrap(),
            OnnxRuntime::Ort
        );
        assert!("torch".parse::<OnnxRuntime>().is_err());
    }

    #[test]
    fn test_default_runtime_is_tract() {
        assert_eq!(OnnxRuntime::default(), OnnxRuntime::Tract);
        assert_eq!(OnnxRuntime::Tract.to_string(), "tract");
    }

    #[cfg(not(feature = "ort"))]
    #[test]
    fn test_ort_not_compiled_in() {
        let err = load(OnnxRuntime::Ort, Path::new("model.onnx")).err().unwrap();
        assert!(matches!(err, ArtifactError::BackendUnavailable(name) if name == "ort"));
    }

    #[cfg(feature = "tract")]
    #[test]
    fn test_tract_missing_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(OnnxRuntime::Tract, &dir.path().join("absent.onnx")).err().unwrap();
        assert!(matches!(err, ArtifactError::Model { .. }));
    }
}
