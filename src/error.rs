use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Model loading error: {0}")]
    ModelLoad(String),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Unsupported layer type: {0}")]
    UnsupportedLayer(String),

    #[error("Unsupported activation: {0}")]
    UnsupportedActivation(String),

    #[error("Unsupported padding: {0}")]
    UnsupportedPadding(String),

    #[error("Model output index {index} has no class label ({labels} labels known)")]
    LabelMismatch { index: usize, labels: usize },

    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
