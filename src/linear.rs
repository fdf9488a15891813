//! Linear classifier exported as JSON.
//!
//! Stores the fitted `coef_` (one row per class, one column per feature) and
//! `intercept_` of a linear model and predicts by argmax over
//!
//! ```text
//! score[c] = intercept[c] + Σ(x[f] × coef[c, f])
//! ```
//!
//! A single-row model is the binary case: class 1 when its score is positive.

use std::path::Path;

use ndarray::{Array1, Array2};
use serde::Deserialize;

use crate::error::{ArtifactError, PredictError};
use crate::model::Classifier;

#[derive(Deserialize)]
struct LinearJson {
    #[serde(rename = "coef_")]
    coef: Vec<Vec<f64>>,
    #[serde(rename = "intercept_")]
    intercept: Vec<f64>,
    #[serde(rename = "classes_", default)]
    classes: Option<Vec<i64>>,
}

#[derive(Debug, Clone)]
pub struct LinearClassifier {
    coef: Array2<f64>,
    intercept: Array1<f64>,
    classes: Option<Vec<i64>>,
}

impl LinearClassifier {
    pub fn new(
        coef: Array2<f64>,
        intercept: Array1<f64>,
        classes: Option<Vec<i64>>,
    ) -> Result<Self, ArtifactError> {
        let rows = coef.nrows();
        if rows == 0 {
            return Err(ArtifactError::Dimension {
                what: "coef_ rows".to_string(),
                expected: 1,
                got: 0,
            });
        }
        if intercept.len() != rows {
            return Err(ArtifactError::Dimension {
                what: "intercept_".to_string(),
                expected: rows,
                got: intercept.len(),
            });
        }
        if let Some(classes) = &classes {
            let expected = if rows == 1 { 2 } else { rows };
            if classes.len() != expected {
                return Err(ArtifactError::Dimension {
                    what: "classes_".to_string(),
                    expected,
                    got: classes.len(),
                });
            }
        }
        Ok(Self {
            coef,
            intercept,
            classes,
        })
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: LinearJson = serde_json::from_str(&json).map_err(|source| ArtifactError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let rows = raw.coef.len();
        let cols = raw.coef.first().map_or(0, Vec::len);
        if let Some(bad) = raw.coef.iter().find(|row| row.len() != cols) {
            return Err(ArtifactError::Dimension {
                what: "coef_ row".to_string(),
                expected: cols,
                got: bad.len(),
            });
        }
        let flat: Vec<f64> = raw.coef.into_iter().flatten().collect();
        let coef = Array2::from_shape_vec((rows, cols), flat).map_err(|e| ArtifactError::Model {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::new(coef, Array1::from(raw.intercept), raw.classes)
    }

    fn position(&self, scores: &Array1<f64>) -> usize {
        if scores.len() == 1 {
            return usize::from(scores[0] > 0.0);
        }
        // first maximum wins on ties
        let mut best = 0;
        for (i, &s) in scores.iter().enumerate().skip(1) {
            if s > scores[best] {
                best = i;
            }
        }
        best
    }
}

impl Classifier for LinearClassifier {
    fn predict(&self, x: &Array1<f32>) -> Result<i64, PredictError> {
        if x.len() != self.coef.ncols() {
            return Err(PredictError::Inference(format!(
                "expected {} features, got {}",
                self.coef.ncols(),
                x.len()
            )));
        }
        let x = x.mapv(f64::from);
        let scores = self.coef.dot(&x) + &self.intercept;
        let pos = self.position(&scores);

        Ok(match &self.classes {
            Some(classes) => classes[pos],
            None => pos as i64,
        })
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.coef.ncols())
    }

    fn name(&self) -> &str {
        "linear"
    }
}
