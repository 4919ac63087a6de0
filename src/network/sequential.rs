use rand::Rng;

use crate::activation::Activation;
use crate::error::{Error, Result};
use crate::layers::{Conv2D, Dense, Flatten, Layer, MaxPooling2D, Padding};
use crate::math::{Matrix, Tensor};
use crate::network::config::{
    Conv2DConfig, DenseConfig, FlattenConfig, InputLayerConfig, LayerConfig, ModelConfig, PoolingConfig,
};
use crate::network::weights::{LayerWeights, WeightArray, WeightMap};

/// A linear stack of layers fed by a fixed-shape input.
#[derive(Debug, Clone)]
pub struct Sequential {
    name: String,
    input_shape: Vec<usize>,
    layers: Vec<Layer>,
}

impl Sequential {
    /// Builds the architecture described by `config` with zeroed parameters.
    /// Follow with `init_weights` (training) or `load_weights` (inference).
    pub fn from_config(config: &ModelConfig) -> Result<Sequential> {
        if config.class_name != "Sequential" {
            return Err(Error::ModelLoad(format!(
                "Only Sequential models are supported, got '{}'",
                config.class_name
            )));
        }

        let mut entries = config.config.layers.iter();
        let input_shape = match entries.next() {
            Some(LayerConfig::InputLayer(input)) => input_shape_from(input)?,
            _ => {
                return Err(Error::ModelLoad(
                    "Model config must start with an InputLayer".to_string(),
                ))
            }
        };

        let mut layers = Vec::new();
        let mut shape = input_shape.clone();
        for entry in entries {
            let layer = build_layer(entry, &shape)?;
            shape = layer.output_shape(&shape)?;
            layers.push(layer);
        }

        Ok(Sequential {
            name: config.config.name.clone(),
            input_shape,
            layers,
        })
    }

    pub fn to_config(&self) -> ModelConfig {
        let mut entries = Vec::with_capacity(self.layers.len() + 1);
        entries.push(LayerConfig::input("input_layer", &self.input_shape));

        for layer in &self.layers {
            entries.push(match layer {
                Layer::Conv2D(l) => LayerConfig::Conv2D(Conv2DConfig {
                    name: l.name.clone(),
                    dtype: "float32".to_string(),
                    trainable: true,
                    filters: l.filters,
                    kernel_size: [l.kernel_size.0, l.kernel_size.1],
                    strides: [l.strides.0, l.strides.1],
                    padding: l.padding.name().to_string(),
                    activation: l.activation.name().to_string(),
                    use_bias: l.bias.is_some(),
                }),
                Layer::MaxPooling2D(l) => LayerConfig::MaxPooling2D(PoolingConfig {
                    name: l.name.clone(),
                    dtype: "float32".to_string(),
                    trainable: true,
                    pool_size: [l.pool_size.0, l.pool_size.1],
                    strides: Some([l.strides.0, l.strides.1]),
                    padding: l.padding.name().to_string(),
                }),
                Layer::Flatten(l) => LayerConfig::Flatten(FlattenConfig {
                    name: l.name.clone(),
                    dtype: "float32".to_string(),
                    trainable: true,
                }),
                Layer::Dense(l) => LayerConfig::Dense(DenseConfig {
                    name: l.name.clone(),
                    dtype: "float32".to_string(),
                    trainable: true,
                    units: l.units,
                    activation: l.activation.name().to_string(),
                    use_bias: l.biases.is_some(),
                }),
            });
        }

        ModelConfig::sequential(self.name.clone(), entries)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shape of one sample, without the batch dimension.
    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    /// Shape of one output sample.
    pub fn output_shape(&self) -> Result<Vec<usize>> {
        let mut shape = self.input_shape.clone();
        for layer in &self.layers {
            shape = layer.output_shape(&shape)?;
        }
        Ok(shape)
    }

    /// Width of the final rank-1 output, if the model ends in one.
    pub fn output_units(&self) -> Option<usize> {
        match self.output_shape().ok()?.as_slice() {
            &[n] => Some(n),
            _ => None,
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(Layer::parameter_count).sum()
    }

    pub fn init_weights<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for layer in &mut self.layers {
            layer.init_weights(rng);
        }
    }

    /// Runs one un-batched sample through every layer.
    pub fn forward(&self, sample: &Tensor) -> Result<Tensor> {
        self.check_sample_shape(sample)?;
        let mut current = sample.clone();
        for layer in &self.layers {
            current = layer.forward(&current)?;
        }
        Ok(current)
    }

    /// Like `forward`, but keeps every intermediate activation.
    /// `trace[0]` is the input and `trace[i + 1]` the output of layer `i`.
    pub fn forward_trace(&self, sample: &Tensor) -> Result<Vec<Tensor>> {
        self.check_sample_shape(sample)?;
        let mut trace = Vec::with_capacity(self.layers.len() + 1);
        trace.push(sample.clone());
        for layer in &self.layers {
            let next = layer.forward(&trace[trace.len() - 1])?;
            trace.push(next);
        }
        Ok(trace)
    }

    /// Runs a batch (leading dimension = batch size) and returns one score
    /// vector per sample.
    pub fn predict(&self, batch: &Tensor) -> Result<Vec<Vec<f64>>> {
        if batch.shape().len() != self.input_shape.len() + 1 {
            let mut expected = vec![batch.batch_size()];
            expected.extend_from_slice(&self.input_shape);
            return Err(Error::ShapeMismatch {
                expected,
                actual: batch.shape().to_vec(),
            });
        }
        (0..batch.batch_size())
            .map(|i| Ok(self.forward(&batch.sample(i)?)?.into_data()))
            .collect()
    }

    fn check_sample_shape(&self, sample: &Tensor) -> Result<()> {
        if sample.shape() != self.input_shape.as_slice() {
            return Err(Error::ShapeMismatch {
                expected: self.input_shape.clone(),
                actual: sample.shape().to_vec(),
            });
        }
        Ok(())
    }

    /// Exports all trainable parameters keyed by layer name.
    pub fn weights(&self) -> WeightMap {
        let mut map = WeightMap::new();
        for layer in &self.layers {
            match layer {
                Layer::Conv2D(l) => {
                    map.insert(
                        l.name.clone(),
                        LayerWeights {
                            kernel: WeightArray::new(l.kernel_shape(), l.kernel.clone()),
                            bias: l.bias.as_ref().map(|b| WeightArray::new(vec![b.len()], b.clone())),
                        },
                    );
                }
                Layer::Dense(l) => {
                    map.insert(
                        l.name.clone(),
                        LayerWeights {
                            kernel: WeightArray::new(vec![l.weights.rows, l.weights.cols], l.weights.data.clone()),
                            bias: l.biases.as_ref().map(|b| WeightArray::new(vec![b.len()], b.clone())),
                        },
                    );
                }
                Layer::MaxPooling2D(_) | Layer::Flatten(_) => {}
            }
        }
        map
    }

    /// Copies parameters from `weights` into the matching layers.
    /// Every parameterized layer must be present with the exact shapes.
    pub fn load_weights(&mut self, weights: &WeightMap) -> Result<()> {
        for layer in &mut self.layers {
            match layer {
                Layer::Conv2D(l) => {
                    let entry = lookup(weights, &l.name)?;
                    l.kernel = entry.kernel.expect_shape(&l.name, &l.kernel_shape())?.to_vec();
                    l.bias = load_bias(&l.name, entry, l.bias.as_ref().map(Vec::len))?;
                }
                Layer::Dense(l) => {
                    let entry = lookup(weights, &l.name)?;
                    let values = entry.kernel.expect_shape(&l.name, &[l.weights.rows, l.weights.cols])?;
                    l.weights = Matrix::from_vec(l.weights.rows, l.weights.cols, values.to_vec())?;
                    l.biases = load_bias(&l.name, entry, l.biases.as_ref().map(Vec::len))?;
                }
                Layer::MaxPooling2D(_) | Layer::Flatten(_) => {}
            }
        }
        Ok(())
    }

    /// Keras-style one-line-per-layer summary.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Model: \"{}\"  input {:?}", self.name, self.input_shape)];
        let mut shape = self.input_shape.clone();
        for layer in &self.layers {
            shape = layer.output_shape(&shape).unwrap_or_default();
            lines.push(format!(
                "  {:<18} {:<14} {:<18} {:>10}",
                layer.name(),
                layer.class_name(),
                format!("{:?}", shape),
                layer.parameter_count()
            ));
        }
        lines.push(format!("  Total params: {}", self.parameter_count()));
        lines.join("\n")
    }
}

fn lookup<'a>(weights: &'a WeightMap, name: &str) -> Result<&'a LayerWeights> {
    weights
        .get(name)
        .ok_or_else(|| Error::ModelLoad(format!("No weights stored for layer '{}'", name)))
}

fn load_bias(name: &str, entry: &LayerWeights, expected: Option<usize>) -> Result<Option<Vec<f64>>> {
    match (expected, &entry.bias) {
        (Some(len), Some(bias)) => Ok(Some(bias.expect_shape(name, &[len])?.to_vec())),
        (None, None) => Ok(None),
        (Some(_), None) => Err(Error::ModelLoad(format!("Layer '{}' expects a bias but none is stored", name))),
        (None, Some(_)) => Err(Error::ModelLoad(format!("Layer '{}' has no bias but one is stored", name))),
    }
}

fn input_shape_from(input: &InputLayerConfig) -> Result<Vec<usize>> {
    let dims = input.batch_input_shape.get(1..).unwrap_or_default();
    let shape: Option<Vec<usize>> = dims.iter().copied().collect();
    match shape {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(Error::ModelLoad(format!(
            "InputLayer '{}' needs fully specified dimensions, got {:?}",
            input.name, input.batch_input_shape
        ))),
    }
}

fn build_layer(entry: &LayerConfig, input_shape: &[usize]) -> Result<Layer> {
    match entry {
        LayerConfig::InputLayer(cfg) => Err(Error::ModelLoad(format!(
            "InputLayer '{}' may only appear first",
            cfg.name
        ))),
        LayerConfig::Conv2D(cfg) => {
            let in_channels = match input_shape {
                &[_, _, c] => c,
                other => {
                    return Err(Error::Layer(format!(
                        "Conv2D '{}' expects HWC input, got {:?}",
                        cfg.name, other
                    )))
                }
            };
            Ok(Layer::Conv2D(Conv2D::new(
                cfg.name.clone(),
                cfg.filters,
                (cfg.kernel_size[0], cfg.kernel_size[1]),
                (cfg.strides[0], cfg.strides[1]),
                Padding::from_name(&cfg.padding)?,
                in_channels,
                cfg.use_bias,
                Activation::from_name(&cfg.activation)?,
            )?))
        }
        LayerConfig::MaxPooling2D(cfg) => Ok(Layer::MaxPooling2D(MaxPooling2D::new(
            cfg.name.clone(),
            (cfg.pool_size[0], cfg.pool_size[1]),
            cfg.strides.map(|s| (s[0], s[1])),
            Padding::from_name(&cfg.padding)?,
        )?)),
        LayerConfig::Flatten(cfg) => Ok(Layer::Flatten(Flatten::new(cfg.name.clone()))),
        LayerConfig::Dense(cfg) => {
            let input_size = match input_shape {
                &[n] => n,
                other => {
                    return Err(Error::Layer(format!(
                        "Dense '{}' expects a flat input, got {:?}",
                        cfg.name, other
                    )))
                }
            };
            Ok(Layer::Dense(Dense::new(
                cfg.name.clone(),
                cfg.units,
                input_size,
                cfg.use_bias,
                Activation::from_name(&cfg.activation)?,
            )?))
        }
    }
}
