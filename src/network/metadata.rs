use serde::{Deserialize, Serialize};

/// Describes how to interpret the input fed to a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InputType {
    /// RGB image resized to width×height, normalized to [0, 1], laid out HWC.
    ImageRgb { width: u32, height: u32 },
}

/// Optional annotations attached to a saved model.
/// All fields are Option<> so artifacts without metadata deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelMetadata {
    pub description: Option<String>,
    pub input_type: Option<InputType>,
    /// Class identifiers in output order, as discovered by the trainer.
    pub output_labels: Option<Vec<String>>,
    /// Number of epochs the weights were trained for.
    pub epochs: Option<usize>,
}
