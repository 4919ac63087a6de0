pub mod artifact;
pub mod compat;
pub mod config;
pub mod metadata;
pub mod sequential;
pub mod weights;

pub use artifact::{load_model, save_model, Artifact, LoadedModel};
pub use compat::{DTypePolicyPatch, SchemaPatch};
pub use config::{LayerConfig, ModelConfig};
pub use metadata::{InputType, ModelMetadata};
pub use sequential::Sequential;
pub use weights::{LayerWeights, WeightArray, WeightMap};
