use serde::{Deserialize, Serialize};

/// Architecture description stored in a model artifact.
///
/// The layout follows Keras' `model.to_json()` so that artifacts stay
/// readable by anyone who knows that format:
/// `{"class_name": "Sequential", "config": {"name": ..., "layers": [...]}}`.
///
/// Per-layer config objects are strict (`deny_unknown_fields`, string
/// `dtype`). Artifacts written under a newer schema are reconciled by
/// `network::compat` before they reach these types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub class_name: String,
    pub config: SequentialConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequentialConfig {
    pub name: String,
    pub layers: Vec<LayerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class_name", content = "config")]
pub enum LayerConfig {
    InputLayer(InputLayerConfig),
    Conv2D(Conv2DConfig),
    MaxPooling2D(PoolingConfig),
    Flatten(FlattenConfig),
    Dense(DenseConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputLayerConfig {
    pub name: String,
    #[serde(default = "default_dtype")]
    pub dtype: String,
    /// Leading entry is the (unbounded) batch dimension.
    pub batch_input_shape: Vec<Option<usize>>,
    #[serde(default)]
    pub sparse: bool,
    #[serde(default)]
    pub ragged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Conv2DConfig {
    pub name: String,
    #[serde(default = "default_dtype")]
    pub dtype: String,
    #[serde(default = "default_true")]
    pub trainable: bool,
    pub filters: usize,
    pub kernel_size: [usize; 2],
    #[serde(default = "default_strides")]
    pub strides: [usize; 2],
    #[serde(default = "default_padding")]
    pub padding: String,
    #[serde(default = "default_activation")]
    pub activation: String,
    #[serde(default = "default_true")]
    pub use_bias: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolingConfig {
    pub name: String,
    #[serde(default = "default_dtype")]
    pub dtype: String,
    #[serde(default = "default_true")]
    pub trainable: bool,
    pub pool_size: [usize; 2],
    #[serde(default)]
    pub strides: Option<[usize; 2]>,
    #[serde(default = "default_padding")]
    pub padding: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlattenConfig {
    pub name: String,
    #[serde(default = "default_dtype")]
    pub dtype: String,
    #[serde(default = "default_true")]
    pub trainable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DenseConfig {
    pub name: String,
    #[serde(default = "default_dtype")]
    pub dtype: String,
    #[serde(default = "default_true")]
    pub trainable: bool,
    pub units: usize,
    #[serde(default = "default_activation")]
    pub activation: String,
    #[serde(default = "default_true")]
    pub use_bias: bool,
}

fn default_dtype() -> String {
    "float32".to_string()
}

fn default_true() -> bool {
    true
}

fn default_strides() -> [usize; 2] {
    [1, 1]
}

fn default_padding() -> String {
    "valid".to_string()
}

fn default_activation() -> String {
    "linear".to_string()
}

impl LayerConfig {
    /// Input layer for un-batched samples of `shape`.
    pub fn input(name: &str, shape: &[usize]) -> LayerConfig {
        let mut batch_input_shape = vec![None];
        batch_input_shape.extend(shape.iter().map(|&d| Some(d)));
        LayerConfig::InputLayer(InputLayerConfig {
            name: name.to_string(),
            dtype: default_dtype(),
            batch_input_shape,
            sparse: false,
            ragged: false,
        })
    }

    /// Stride-1, valid-padded convolution with a bias.
    pub fn conv2d(name: &str, filters: usize, kernel_size: [usize; 2], activation: &str) -> LayerConfig {
        LayerConfig::Conv2D(Conv2DConfig {
            name: name.to_string(),
            dtype: default_dtype(),
            trainable: true,
            filters,
            kernel_size,
            strides: default_strides(),
            padding: default_padding(),
            activation: activation.to_string(),
            use_bias: true,
        })
    }

    /// Valid-padded max pooling whose stride equals the window.
    pub fn max_pooling2d(name: &str, pool_size: [usize; 2]) -> LayerConfig {
        LayerConfig::MaxPooling2D(PoolingConfig {
            name: name.to_string(),
            dtype: default_dtype(),
            trainable: true,
            pool_size,
            strides: Some(pool_size),
            padding: default_padding(),
        })
    }

    pub fn flatten(name: &str) -> LayerConfig {
        LayerConfig::Flatten(FlattenConfig {
            name: name.to_string(),
            dtype: default_dtype(),
            trainable: true,
        })
    }

    pub fn dense(name: &str, units: usize, activation: &str) -> LayerConfig {
        LayerConfig::Dense(DenseConfig {
            name: name.to_string(),
            dtype: default_dtype(),
            trainable: true,
            units,
            activation: activation.to_string(),
            use_bias: true,
        })
    }
}

impl ModelConfig {
    pub fn sequential(name: impl Into<String>, layers: Vec<LayerConfig>) -> ModelConfig {
        ModelConfig {
            class_name: "Sequential".to_string(),
            config: SequentialConfig { name: name.into(), layers },
        }
    }

    /// The leaf-disease CNN: two conv/pool blocks, a 128-unit hidden layer and
    /// a softmax head with one unit per class.
    pub fn plant_cnn(num_classes: usize, image_size: usize) -> ModelConfig {
        ModelConfig::sequential(
            "sequential",
            vec![
                LayerConfig::input("input_layer", &[image_size, image_size, 3]),
                LayerConfig::conv2d("conv2d", 32, [3, 3], "relu"),
                LayerConfig::max_pooling2d("max_pooling2d", [2, 2]),
                LayerConfig::conv2d("conv2d_1", 64, [3, 3], "relu"),
                LayerConfig::max_pooling2d("max_pooling2d_1", [2, 2]),
                LayerConfig::flatten("flatten"),
                LayerConfig::dense("dense", 128, "relu"),
                LayerConfig::dense("dense_1", num_classes, "softmax"),
            ],
        )
    }
}
