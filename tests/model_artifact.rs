use std::fs;
use std::path::Path;

use leafscan::network::{LayerConfig, ModelConfig, ModelMetadata};
use leafscan::{load_model, save_model, Error, Sequential, Tensor};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};

fn small_model() -> Sequential {
    let config = ModelConfig::sequential(
        "sequential",
        vec![
            LayerConfig::input("input_layer", &[6, 6, 3]),
            LayerConfig::conv2d("conv2d", 2, [3, 3], "relu"),
            LayerConfig::max_pooling2d("max_pooling2d", [2, 2]),
            LayerConfig::flatten("flatten"),
            LayerConfig::dense("dense", 3, "softmax"),
        ],
    );
    let mut model = Sequential::from_config(&config).unwrap();
    model.init_weights(&mut StdRng::seed_from_u64(21));
    model
}

fn probe() -> Tensor {
    Tensor::new(vec![1, 6, 6, 3], (0..108).map(|i| ((i * 13) % 17) as f64 / 17.0).collect()).unwrap()
}

fn read(path: &Path) -> Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

fn policy(name: &str) -> Value {
    json!({"module": "keras", "class_name": "DTypePolicy", "config": {"name": name}, "registered_name": null})
}

/// Rewrites a saved artifact the way a newer writer would emit it.
fn upgrade_schema(artifact: &mut Value) {
    let layers = artifact["model_config"]["config"]["layers"].as_array_mut().unwrap();
    for layer in layers.iter_mut() {
        let cfg = layer["config"].as_object_mut().unwrap();
        cfg.insert("dtype".into(), policy("float32"));
        if layer["class_name"] == "InputLayer" {
            let cfg = layer["config"].as_object_mut().unwrap();
            let shape = cfg.remove("batch_input_shape").unwrap();
            cfg.insert("batch_shape".into(), shape);
            cfg.insert("optional".into(), json!(false));
        } else if layer["class_name"] == "Dense" || layer["class_name"] == "Conv2D" {
            layer["config"]["quantization_config"] = Value::Null;
        }
    }
    artifact["model_config"]["config"]["dtype"] = policy("float32");
}

#[test]
fn newer_schema_loads_through_patch_with_identical_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let model = small_model();
    save_model(&model, ModelMetadata::default(), &path).unwrap();

    let mut artifact = read(&path);
    upgrade_schema(&mut artifact);
    fs::write(&path, serde_json::to_vec(&artifact).unwrap()).unwrap();

    let loaded = load_model(&path).unwrap();
    assert!(loaded.used_fallback);
    assert_eq!(model.predict(&probe()).unwrap(), loaded.model.predict(&probe()).unwrap());
}

#[test]
fn string_encoded_config_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let model = small_model();
    save_model(&model, ModelMetadata::default(), &path).unwrap();

    let mut artifact = read(&path);
    upgrade_schema(&mut artifact);
    let encoded = serde_json::to_string(&artifact["model_config"]).unwrap();
    artifact["model_config"] = Value::String(encoded);
    fs::write(&path, serde_json::to_vec(&artifact).unwrap()).unwrap();

    let loaded = load_model(&path).unwrap();
    assert!(loaded.used_fallback);
    assert_eq!(loaded.model.output_units(), Some(3));
}

#[test]
fn unrecoverable_artifact_reports_the_strict_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    save_model(&small_model(), ModelMetadata::default(), &path).unwrap();

    let mut artifact = read(&path);
    artifact["model_config"]["config"]["layers"][1]["class_name"] = json!("LSTM");
    fs::write(&path, serde_json::to_vec(&artifact).unwrap()).unwrap();

    let err = load_model(&path).unwrap_err();
    assert!(matches!(err, Error::Json(_)), "unexpected error: {}", err);
}

#[test]
fn weights_that_do_not_fit_the_architecture_fail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    save_model(&small_model(), ModelMetadata::default(), &path).unwrap();

    let mut artifact = read(&path);
    artifact["model_config"]["config"]["layers"][4]["config"]["units"] = json!(5);
    fs::write(&path, serde_json::to_vec(&artifact).unwrap()).unwrap();

    assert!(load_model(&path).is_err());
}

#[test]
fn zero_pooling_stride_or_window_is_an_error() {
    for key in ["strides", "pool_size"] {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        save_model(&small_model(), ModelMetadata::default(), &path).unwrap();

        let mut artifact = read(&path);
        let pooling = &mut artifact["model_config"]["config"]["layers"][2];
        assert_eq!(pooling["class_name"], "MaxPooling2D");
        pooling["config"][key] = json!([0, 0]);
        fs::write(&path, serde_json::to_vec(&artifact).unwrap()).unwrap();

        let err = load_model(&path).unwrap_err();
        assert!(matches!(err, Error::Layer(_)), "{}: unexpected error: {}", key, err);
    }
}
