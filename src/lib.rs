pub mod error;
pub mod logging;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod catalog;
pub mod preprocess;
pub mod predict;
pub mod dataset;
pub mod loss;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::{Matrix, Tensor};
pub use activation::Activation;
pub use layers::Layer;
pub use network::{load_model, save_model, LoadedModel, ModelConfig, ModelMetadata, Sequential};
pub use catalog::{ConfidenceTier, Severity, CLASS_NAMES};
pub use predict::{interpret, predict_image, PredictionResponse, TopPrediction};
pub use dataset::ImageFolder;
pub use optim::{Adam, Optimizer, Sgd};
pub use train::{train_loop, EpochStats, SampleSource, TrainConfig};
