//! Runs one prediction straight from the model directory, without the HTTP server.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use symptom_api::{
    model::ArtifactPaths, onnx_backend::OnnxRuntime, preprocess::N_FEATURES, InferenceTransformer,
};

const SAMPLE: [&str; N_FEATURES] = [
    "itching",
    "skin_rash",
    "nodal_skin_eruptions",
    "dischromic _patches",
    "",
    "",
];

#[derive(Parser, Debug)]
#[command(name = "predict-local", about = "Predict a disease from up to six symptoms")]
struct Args {
    /// Directory holding encoders.json, scaler.json and final_model.onnx
    #[arg(long, default_value = "./models")]
    model_dir: PathBuf,

    /// Classifier file; overrides <model-dir>/final_model.onnx
    #[arg(long)]
    classifier: Option<PathBuf>,

    /// ONNX runtime for .onnx classifiers
    #[arg(long, default_value = "tract")]
    backend: OnnxRuntime,

    /// Symptoms in column order; missing trailing slots are left blank
    symptoms: Vec<String>,
}

/// Pads to six slots with blanks; more than six is an error.
fn symptom_slots(mut symptoms: Vec<String>) -> anyhow::Result<Vec<String>> {
    if symptoms.is_empty() {
        return Ok(SAMPLE.iter().map(|s| s.to_string()).collect());
    }
    anyhow::ensure!(
        symptoms.len() <= N_FEATURES,
        "at most {N_FEATURES} symptoms are accepted, got {}",
        symptoms.len()
    );
    symptoms.resize(N_FEATURES, String::new());
    Ok(symptoms)
}

fn main() -> anyhow::Result<()> {
    symptom_api::init_tracing();
    let args = Args::parse();

    let mut paths = ArtifactPaths::in_dir(&args.model_dir);
    if let Some(classifier) = args.classifier {
        paths.classifier = classifier;
    }
    let transformer = InferenceTransformer::load(&paths, args.backend)
        .with_context(|| format!("failed to load artifacts from {}", args.model_dir.display()))?;

    let symptoms = symptom_slots(args.symptoms)?;
    let prediction = transformer.predict_detailed(symptoms.as_slice())?;

    println!("Encoded symptoms: {:?}", prediction.encoded.indices);
    if !prediction.encoded.fallbacks.is_empty() {
        println!(
            "Unrecognized slots (encoded as 0): {:?}",
            prediction.encoded.fallbacks
        );
    }
    println!("Predicted class: {}", prediction.class_index);
    println!("Predicted disease: {}", prediction.label);
    Ok(())
}
