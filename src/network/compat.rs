//! Loading artifacts written under a newer model-config schema.
//!
//! Newer writers emit a few constructs the strict config types reject:
//! `dtype` as a nested `DTypePolicy` object, `batch_shape` instead of
//! `batch_input_shape` on the input layer, and extra `quantization_config` /
//! `optional` keys. When the strict parse fails, the embedded config is
//! patched as plain JSON, the architecture is rebuilt from it, and the
//! weights are loaded separately.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::network::artifact::{Artifact, LoadedModel};
use crate::network::config::ModelConfig;
use crate::network::metadata::ModelMetadata;
use crate::network::sequential::Sequential;
use crate::network::weights::WeightMap;

/// A rewrite applied to a raw model config before it is parsed.
pub trait SchemaPatch {
    fn name(&self) -> &'static str;

    fn apply(&self, config: &mut Value);
}

/// Reconciles configs that carry `DTypePolicy` objects and the renamed
/// input-shape key.
#[derive(Debug, Default, Clone, Copy)]
pub struct DTypePolicyPatch;

impl SchemaPatch for DTypePolicyPatch {
    fn name(&self) -> &'static str {
        "dtype-policy"
    }

    fn apply(&self, config: &mut Value) {
        patch_node(config);
    }
}

fn patch_node(node: &mut Value) {
    match node {
        Value::Object(map) => {
            if let Some(Value::Object(cfg)) = map.get_mut("config") {
                flatten_dtype_policy(cfg);
                cfg.remove("quantization_config");
            }

            if map.get("class_name").and_then(Value::as_str) == Some("InputLayer") {
                if let Some(Value::Object(cfg)) = map.get_mut("config") {
                    if !cfg.contains_key("batch_input_shape") {
                        if let Some(shape) = cfg.remove("batch_shape") {
                            cfg.insert("batch_input_shape".to_string(), shape);
                        }
                    }
                    cfg.remove("optional");
                }
            }

            for value in map.values_mut() {
                patch_node(value);
            }
        }
        Value::Array(items) => {
            for item in items {
                patch_node(item);
            }
        }
        _ => {}
    }
}

fn flatten_dtype_policy(cfg: &mut Map<String, Value>) {
    let is_policy = cfg
        .get("dtype")
        .and_then(|d| d.get("class_name"))
        .and_then(Value::as_str)
        == Some("DTypePolicy");
    if !is_policy {
        return;
    }
    let name = cfg
        .get("dtype")
        .and_then(|d| d.get("config"))
        .and_then(|c| c.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("float32")
        .to_string();
    cfg.insert("dtype".to_string(), Value::String(name));
}

/// Strict load first; on failure, patch and retry. If the retry fails too,
/// the error from the strict attempt is returned.
pub fn load_with_fallback(path: &Path, patch: &dyn SchemaPatch) -> Result<LoadedModel> {
    let primary_err = match Artifact::read_json(path).and_then(Artifact::into_model) {
        Ok(loaded) => return Ok(loaded),
        Err(e) => e,
    };
    warn!(path = %path.display(), error = %primary_err, patch = patch.name(), "strict model load failed, retrying with schema patch");

    match load_patched(path, patch) {
        Ok(loaded) => {
            info!(path = %path.display(), "model loaded through schema patch");
            Ok(loaded)
        }
        Err(fallback_err) => {
            debug!(error = %fallback_err, "schema-patched load failed as well");
            Err(primary_err)
        }
    }
}

/// Second-pass view of an artifact: the config stays raw JSON so it can be
/// patched, while the weights deserialize straight into their typed form.
#[derive(Deserialize)]
struct LooseArtifact {
    #[serde(default)]
    model_config: Option<Value>,
    #[serde(default)]
    weights: Option<WeightMap>,
    #[serde(default)]
    metadata: Option<Value>,
}

fn load_patched(path: &Path, patch: &dyn SchemaPatch) -> Result<LoadedModel> {
    let reader = BufReader::new(File::open(path)?);
    let artifact: LooseArtifact = serde_json::from_reader(reader)?;

    let mut config = match artifact.model_config {
        Some(Value::Null) | None => {
            return Err(Error::ModelLoad("Artifact has no embedded model_config".to_string()))
        }
        // Some writers store the config as a JSON-encoded string.
        Some(Value::String(encoded)) => serde_json::from_str(&encoded)?,
        Some(other) => other,
    };
    patch.apply(&mut config);

    let config: ModelConfig = serde_json::from_value(config)?;
    let mut model = Sequential::from_config(&config)?;

    let weights = artifact
        .weights
        .ok_or_else(|| Error::ModelLoad("Artifact has no weights section".to_string()))?;
    model.load_weights(&weights)?;

    let metadata = artifact
        .metadata
        .and_then(|m| serde_json::from_value::<ModelMetadata>(m).ok())
        .unwrap_or_default();

    Ok(LoadedModel {
        model,
        metadata,
        used_fallback: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::config::LayerConfig;
    use serde_json::json;

    #[test]
    fn patch_flattens_policy_and_renames_batch_shape() {
        let mut cfg = json!({
            "class_name": "Sequential",
            "config": {
                "name": "sequential",
                "dtype": {"class_name": "DTypePolicy", "config": {"name": "mixed_float16"}},
                "layers": [
                    {
                        "class_name": "InputLayer",
                        "config": {"name": "input_layer", "batch_shape": [null, 8, 8, 3], "optional": false,
                                   "dtype": {"class_name": "DTypePolicy", "config": {}}}
                    },
                    {
                        "class_name": "Dense",
                        "config": {"name": "dense", "units": 2, "quantization_config": null,
                                   "dtype": {"class_name": "DTypePolicy", "config": {"name": "float32"}}}
                    }
                ]
            }
        });
        DTypePolicyPatch.apply(&mut cfg);

        assert_eq!(cfg["config"]["dtype"], "mixed_float16");
        let input = &cfg["config"]["layers"][0]["config"];
        assert_eq!(input["batch_input_shape"], json!([null, 8, 8, 3]));
        assert!(input.get("batch_shape").is_none());
        assert!(input.get("optional").is_none());
        assert_eq!(input["dtype"], "float32");
        let dense = &cfg["config"]["layers"][1]["config"];
        assert!(dense.get("quantization_config").is_none());
        assert_eq!(dense["dtype"], "float32");
    }

    #[test]
    fn existing_batch_input_shape_wins() {
        let mut cfg = json!({
            "class_name": "InputLayer",
            "config": {"name": "in", "batch_input_shape": [null, 2], "batch_shape": [null, 9]}
        });
        DTypePolicyPatch.apply(&mut cfg);
        assert_eq!(cfg["config"]["batch_input_shape"], json!([null, 2]));
        assert_eq!(cfg["config"]["batch_shape"], json!([null, 9]));
    }

    fn tiny_artifact() -> Value {
        let config = ModelConfig::sequential(
            "sequential",
            vec![
                LayerConfig::input("input_layer", &[2, 2, 1]),
                LayerConfig::flatten("flatten"),
                LayerConfig::dense("dense", 2, "softmax"),
            ],
        );
        let model = Sequential::from_config(&config).unwrap();
        serde_json::to_value(Artifact::from_model(&model, ModelMetadata::default())).unwrap()
    }

    #[test]
    fn patched_pass_reads_typed_weights_and_reports_missing_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let mut artifact = tiny_artifact();
        artifact["model_config"]["config"]["layers"][0]["config"]["optional"] = json!(false);
        artifact["metadata"] = json!({"description": 42});
        std::fs::write(&path, serde_json::to_vec(&artifact).unwrap()).unwrap();
        let loaded = load_patched(&path, &DTypePolicyPatch).unwrap();
        assert!(loaded.used_fallback);
        assert_eq!(loaded.model.output_units(), Some(2));
        assert_eq!(loaded.metadata, ModelMetadata::default());

        let mut artifact = tiny_artifact();
        artifact.as_object_mut().unwrap().remove("weights");
        std::fs::write(&path, serde_json::to_vec(&artifact).unwrap()).unwrap();
        let err = load_patched(&path, &DTypePolicyPatch).unwrap_err();
        assert!(matches!(err, Error::ModelLoad(ref msg) if msg.contains("weights")), "{}", err);

        let mut artifact = tiny_artifact();
        artifact["model_config"] = Value::Null;
        std::fs::write(&path, serde_json::to_vec(&artifact).unwrap()).unwrap();
        let err = load_patched(&path, &DTypePolicyPatch).unwrap_err();
        assert!(matches!(err, Error::ModelLoad(ref msg) if msg.contains("model_config")), "{}", err);
    }

    #[test]
    fn plain_string_dtype_is_left_alone() {
        let mut cfg = json!({"class_name": "Flatten", "config": {"name": "f", "dtype": "float64"}});
        DTypePolicyPatch.apply(&mut cfg);
        assert_eq!(cfg["config"]["dtype"], "float64");
    }
}
