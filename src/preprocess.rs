use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use ndarray::Array1;
use serde::Deserialize;

use crate::error::{ArtifactError, PredictError};

/// Number of symptom slots the classifier was trained on.
pub const N_FEATURES: usize = 6;

/// Column names in training order. Position `i` of a request uses `SYMPTOM_COLUMNS[i]`.
pub const SYMPTOM_COLUMNS: [&str; N_FEATURES] = [
    "Symptom_1",
    "Symptom_2",
    "Symptom_3",
    "Symptom_4",
    "Symptom_5",
    "Symptom_6",
];

pub const LABEL_COLUMN: &str = "Disease";

/// Index substituted for a symptom its column encoder has never seen.
///
/// This collides with the first trained category of every column: an unknown
/// or blank symptom is indistinguishable from that category downstream.
pub const FALLBACK_INDEX: i64 = 0;

/// Fitted categorical encoder: the class list in fitted order, index = position.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    classes: Vec<String>,
    lookup: HashMap<String, usize>,
}

impl LabelEncoder {
    pub fn new(column: &str, classes: Vec<String>) -> Result<Self, ArtifactError> {
        let mut lookup = HashMap::with_capacity(classes.len());
        for (i, class) in classes.iter().enumerate() {
            if lookup.insert(class.clone(), i).is_some() {
                return Err(ArtifactError::DuplicateClass {
                    column: column.to_string(),
                    class: class.clone(),
                });
            }
        }
        Ok(Self { classes, lookup })
    }

    pub fn transform(&self, value: &str) -> Option<usize> {
        self.lookup.get(value).copied()
    }

    pub fn inverse_transform(&self, index: i64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.classes.get(i))
            .map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Both layouts an exported encoder may take.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClassesEither {
    /// `["a", "b", ...]`
    Plain(Vec<String>),
    /// `{"classes_": ["a", "b", ...]}`
    Fitted {
        #[serde(rename = "classes_")]
        classes: Vec<String>,
    },
}

impl ClassesEither {
    fn into_classes(self) -> Vec<String> {
        match self {
            ClassesEither::Plain(classes) | ClassesEither::Fitted { classes } => classes,
        }
    }
}

/// Encoded symptom vector together with the slots that fell back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub indices: [i64; N_FEATURES],
    pub fallbacks: Vec<usize>,
}

/// Per-column encoders for the six symptom slots plus the disease label.
#[derive(Debug, Clone)]
pub struct EncoderTable {
    symptoms: Vec<LabelEncoder>,
    label: LabelEncoder,
}

impl EncoderTable {
    /// Builds the table from `column -> classes`. Extra columns are ignored.
    pub fn from_columns(
        mut columns: BTreeMap<String, Vec<String>>,
    ) -> Result<Self, ArtifactError> {
        let mut take = |name: &str| -> Result<LabelEncoder, ArtifactError> {
            let classes = columns
                .remove(name)
                .ok_or_else(|| ArtifactError::MissingColumn(name.to_string()))?;
            LabelEncoder::new(name, classes)
        };

        let symptoms = SYMPTOM_COLUMNS
            .iter()
            .map(|name| take(*name))
            .collect::<Result<Vec<_>, _>>()?;
        let label = take(LABEL_COLUMN)?;

        Ok(Self { symptoms, label })
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: BTreeMap<String, ClassesEither> =
            serde_json::from_str(&json).map_err(|source| ArtifactError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let columns = raw
            .into_iter()
            .map(|(name, classes)| (name, classes.into_classes()))
            .collect();
        Self::from_columns(columns)
    }

    /// Maps each slot to its trained index, substituting [`FALLBACK_INDEX`]
    /// for anything the column encoder does not know.
    pub fn encode<S: AsRef<str>>(&self, symptoms: &[S]) -> Result<Encoded, PredictError> {
        if symptoms.len() != N_FEATURES {
            return Err(PredictError::InvalidInputLength {
                got: symptoms.len(),
            });
        }

        let mut indices = [FALLBACK_INDEX; N_FEATURES];
        let mut fallbacks = Vec::new();
        for (i, (encoder, value)) in self.symptoms.iter().zip(symptoms).enumerate() {
            match encoder.transform(value.as_ref()) {
                Some(index) => indices[i] = index as i64,
                None => fallbacks.push(i),
            }
        }

        Ok(Encoded { indices, fallbacks })
    }

    pub fn decode(&self, class_index: i64) -> Result<&str, PredictError> {
        self.label
            .inverse_transform(class_index)
            .ok_or(PredictError::UnknownClass(class_index))
    }

    pub fn symptom_encoder(&self, position: usize) -> Option<&LabelEncoder> {
        self.symptoms.get(position)
    }

    pub fn label_encoder(&self) -> &LabelEncoder {
        &self.label
    }
}

/// Fitted standard scaler: `(x - mean) / scale`, each part optional.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    pub mean: Option<[f64; N_FEATURES]>,
    pub scale: Option<[f64; N_FEATURES]>,
}

/// Scaler JSON comes either flat or with the fitted attribute names.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScalerEither {
    /// {"scaler_means": [...], "scaler_stds": [...]}
    Flat {
        scaler_means: Vec<f64>,
        scaler_stds: Vec<f64>,
    },
    /// {"mean_": [...] | null, "scale_": [...] | null}, both keys present
    Fitted {
        #[serde(rename = "mean_", deserialize_with = "present_or_null")]
        mean: Option<Vec<f64>>,
        #[serde(rename = "scale_", deserialize_with = "present_or_null")]
        scale: Option<Vec<f64>>,
    },
}

/// Accepts an explicit `null`; without `default` the key itself stays required.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::deserialize(deserializer)
}

fn to6(v: Vec<f64>, name: &str) -> Result<[f64; N_FEATURES], ArtifactError> {
    let got = v.len();
    v.try_into().map_err(|_| ArtifactError::Dimension {
        what: name.to_string(),
        expected: N_FEATURES,
        got,
    })
}

impl StandardScaler {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let either: ScalerEither =
            serde_json::from_str(&json).map_err(|source| ArtifactError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let scaler = match either {
            ScalerEither::Flat {
                scaler_means,
                scaler_stds,
            } => Self {
                mean: Some(to6(scaler_means, "scaler_means")?),
                scale: Some(to6(scaler_stds, "scaler_stds")?),
            },
            ScalerEither::Fitted { mean, scale } => Self {
                mean: mean.map(|m| to6(m, "mean_")).transpose()?,
                scale: scale.map(|s| to6(s, "scale_")).transpose()?,
            },
        };

        if scaler.mean.is_none() && scaler.scale.is_none() {
            tracing::info!(path = %path.display(), "scaler fitted without mean and scale; identity");
        }
        Ok(scaler)
    }

    pub fn transform(&self, x: &[i64; N_FEATURES]) -> Array1<f32> {
        let mut v = x.map(|i| i as f64);

        if let Some(mean) = &self.mean {
            for (t, m) in v.iter_mut().zip(mean) {
                *t -= m;
            }
        }
        // zero variance columns are left unscaled
        if let Some(scale) = &self.scale {
            for (t, s) in v.iter_mut().zip(scale) {
                if *s != 0.0 {
                    *t /= s;
                }
            }
        }

        v.iter().map(|&t| t as f32).collect()
    }
}
