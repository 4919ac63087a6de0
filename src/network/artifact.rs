use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::network::compat::{self, DTypePolicyPatch};
use crate::network::config::ModelConfig;
use crate::network::metadata::ModelMetadata;
use crate::network::sequential::Sequential;
use crate::network::weights::WeightMap;

pub const FORMAT_VERSION: u32 = 1;

/// On-disk model: architecture, parameters and annotations in one JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub format_version: u32,
    pub model_config: ModelConfig,
    pub weights: WeightMap,
    #[serde(default)]
    pub metadata: ModelMetadata,
}

/// A model ready for inference plus what was read alongside it.
#[derive(Debug)]
pub struct LoadedModel {
    pub model: Sequential,
    pub metadata: ModelMetadata,
    /// True when the artifact only loaded after schema patching.
    pub used_fallback: bool,
}

impl Artifact {
    pub fn from_model(model: &Sequential, metadata: ModelMetadata) -> Artifact {
        Artifact {
            format_version: FORMAT_VERSION,
            model_config: model.to_config(),
            weights: model.weights(),
            metadata,
        }
    }

    /// Rebuilds the architecture, then loads the parameters into it.
    pub fn into_model(self) -> Result<LoadedModel> {
        let mut model = Sequential::from_config(&self.model_config)?;
        model.load_weights(&self.weights)?;
        Ok(LoadedModel {
            model,
            metadata: self.metadata,
            used_fallback: false,
        })
    }

    /// Serializes the artifact as compact JSON; weight tensors make pretty
    /// printing impractically large.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Strict deserialization against the current schema.
    pub fn read_json(path: &Path) -> Result<Artifact> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Writes `model` to `path` with the given annotations.
pub fn save_model(model: &Sequential, metadata: ModelMetadata, path: &Path) -> Result<()> {
    Artifact::from_model(model, metadata).save_json(path)?;
    info!(path = %path.display(), params = model.parameter_count(), "model saved");
    Ok(())
}

/// Loads a model artifact, falling back to schema patching when the strict
/// parse fails. A missing file is reported as `Error::ModelNotFound`.
pub fn load_model(path: &Path) -> Result<LoadedModel> {
    if !path.exists() {
        return Err(Error::ModelNotFound(path.to_path_buf()));
    }
    compat::load_with_fallback(path, &DTypePolicyPatch)
}
