//! ONNX classifiers built in memory, written to disk and run through tract.
#![cfg(feature = "tract")]

use std::path::{Path, PathBuf};

use ndarray::arr1;
use prost::Message;
use serde_json::json;
use tempfile::TempDir;
use tract_onnx::pb;

use symptom_api::model::ArtifactPaths;
use symptom_api::onnx_backend::{self, OnnxRuntime};
use symptom_api::{Classifier, InferenceTransformer, PredictError};

fn value_info(
    name: &str,
    elem_type: pb::tensor_proto::DataType,
    shape: Option<&[i64]>,
) -> pb::ValueInfoProto {
    let shape = shape.map(|dims| pb::TensorShapeProto {
        dim: dims
            .iter()
            .map(|&d| pb::tensor_shape_proto::Dimension {
                value: Some(pb::tensor_shape_proto::dimension::Value::DimValue(d)),
                ..Default::default()
            })
            .collect(),
    });
    pb::ValueInfoProto {
        name: name.to_string(),
        r#type: Some(pb::TypeProto {
            value: Some(pb::type_proto::Value::TensorType(pb::type_proto::Tensor {
                elem_type: elem_type as i32,
                shape,
            })),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn int_attr(name: &str, i: i64) -> pb::AttributeProto {
    pb::AttributeProto {
        name: name.to_string(),
        r#type: pb::attribute_proto::AttributeType::Int as i32,
        i,
        ..Default::default()
    }
}

/// One-node graph `features: f32[1, 6] -> label`, opset 13.
fn write_graph(
    dir: &Path,
    file: &str,
    node: pb::NodeProto,
    output_type: pb::tensor_proto::DataType,
) -> PathBuf {
    let model = pb::ModelProto {
        ir_version: 7,
        opset_import: vec![pb::OperatorSetIdProto {
            domain: String::new(),
            version: 13,
        }],
        graph: Some(pb::GraphProto {
            name: "classifier".to_string(),
            node: vec![node],
            input: vec![value_info(
                "features",
                pb::tensor_proto::DataType::Float,
                Some(&[1, 6]),
            )],
            output: vec![value_info("label", output_type, None)],
            ..Default::default()
        }),
        ..Default::default()
    };

    let path = dir.join(file);
    std::fs::write(&path, model.encode_to_vec()).unwrap();
    path
}

fn argmax_node(keepdims: i64) -> pb::NodeProto {
    pb::NodeProto {
        input: vec!["features".to_string()],
        output: vec!["label".to_string()],
        name: "argmax".to_string(),
        op_type: "ArgMax".to_string(),
        attribute: vec![int_attr("axis", 1), int_attr("keepdims", keepdims)],
        ..Default::default()
    }
}

fn argmax_model(dir: &Path, keepdims: i64) -> PathBuf {
    write_graph(
        dir,
        "final_model.onnx",
        argmax_node(keepdims),
        pb::tensor_proto::DataType::Int64,
    )
}

#[test]
fn test_tract_reads_label_of_shape_1() {
    let dir = tempfile::tempdir().unwrap();
    let clf = onnx_backend::load(OnnxRuntime::Tract, &argmax_model(dir.path(), 0)).unwrap();

    assert_eq!(clf.name(), "tract");
    assert_eq!(clf.n_features(), Some(6));
    assert_eq!(clf.predict(&arr1(&[0.0, 0.1, 3.0, 0.2, 0.0, -1.0])).unwrap(), 2);
    assert_eq!(clf.predict(&arr1(&[0.0, 0.0, 0.0, 0.0, 0.0, 5.0])).unwrap(), 5);
}

#[test]
fn test_tract_reads_label_of_shape_1x1() {
    let dir = tempfile::tempdir().unwrap();
    let clf = onnx_backend::load(OnnxRuntime::Tract, &argmax_model(dir.path(), 1)).unwrap();

    assert_eq!(clf.predict(&arr1(&[4.0, 0.1, 3.0, 0.2, 0.0, -1.0])).unwrap(), 0);
}

#[test]
fn test_tract_rejects_float_output() {
    let dir = tempfile::tempdir().unwrap();
    let softmax = pb::NodeProto {
        input: vec!["features".to_string()],
        output: vec!["label".to_string()],
        name: "softmax".to_string(),
        op_type: "Softmax".to_string(),
        attribute: vec![int_attr("axis", 1)],
        ..Default::default()
    };
    let path = write_graph(dir.path(), "proba.onnx", softmax, pb::tensor_proto::DataType::Float);
    let clf = onnx_backend::load(OnnxRuntime::Tract, &path).unwrap();

    let err = clf.predict(&arr1(&[0.0, 0.1, 3.0, 0.2, 0.0, -1.0])).unwrap_err();
    assert!(matches!(err, PredictError::Inference(msg) if msg.contains("integer")));
}

/// Six disease labels, one per feature; the scaler weights the sample so
/// that its third slot dominates.
fn model_dir() -> (TempDir, ArtifactPaths) {
    let dir = tempfile::tempdir().unwrap();
    argmax_model(dir.path(), 0);
    let paths = ArtifactPaths::in_dir(dir.path());

    let encoders = json!({
        "Symptom_1": ["chills", "itching"],
        "Symptom_2": ["shivering", "skin_rash"],
        "Symptom_3": ["chills", "nodal_skin_eruptions"],
        "Symptom_4": ["dischromic _patches", "joint_pain"],
        "Symptom_5": ["vomiting"],
        "Symptom_6": ["fatigue"],
        "Disease": ["Allergy", "GERD", "Fungal infection", "Acne", "Psoriasis", "Impetigo"]
    });
    let scaler = json!({
        "mean_": [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        "scale_": [4.0, 2.0, 1.0, 0.5, 1.0, 1.0]
    });
    std::fs::write(&paths.encoders, encoders.to_string()).unwrap();
    std::fs::write(&paths.scaler, scaler.to_string()).unwrap();

    (dir, paths)
}

#[test]
fn test_transformer_over_onnx_classifier() {
    let (_dir, paths) = model_dir();
    let t = InferenceTransformer::load(&paths, OnnxRuntime::Tract).unwrap();
    assert_eq!(t.classifier_name(), "tract");

    let p = t
        .predict_detailed(&[
            "itching",
            "skin_rash",
            "nodal_skin_eruptions",
            "dischromic _patches",
            "",
            "",
        ])
        .unwrap();
    assert_eq!(p.encoded.indices, [1, 1, 1, 0, 0, 0]);
    assert_eq!(p.class_index, 2);
    assert_eq!(p.label, "Fungal infection");

    let label = t.predict(&["", "", "", "joint_pain", "", ""]).unwrap();
    assert_eq!(label, "Acne");
}
