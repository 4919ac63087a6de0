pub mod conv2d;
pub mod dense;
pub mod flatten;
pub mod pooling;

use rand::Rng;

use crate::error::Result;
use crate::math::Tensor;

pub use conv2d::Conv2D;
pub use dense::Dense;
pub use flatten::Flatten;
pub use pooling::{MaxPooling2D, Padding};

/// Per-layer gradient buffers, one per parameter tensor (kernel, then bias).
pub type Gradients = Vec<Vec<f64>>;

/// One layer of a `Sequential` model.
///
/// Forward passes take `&self` and allocate their own outputs, so a single
/// model can serve concurrent callers without locking.
#[derive(Debug, Clone)]
pub enum Layer {
    Conv2D(Conv2D),
    MaxPooling2D(MaxPooling2D),
    Flatten(Flatten),
    Dense(Dense),
}

impl Layer {
    pub fn name(&self) -> &str {
        match self {
            Layer::Conv2D(l) => &l.name,
            Layer::MaxPooling2D(l) => &l.name,
            Layer::Flatten(l) => &l.name,
            Layer::Dense(l) => &l.name,
        }
    }

    /// Keras-style class name, as written in model configs.
    pub fn class_name(&self) -> &'static str {
        match self {
            Layer::Conv2D(_) => "Conv2D",
            Layer::MaxPooling2D(_) => "MaxPooling2D",
            Layer::Flatten(_) => "Flatten",
            Layer::Dense(_) => "Dense",
        }
    }

    pub fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        match self {
            Layer::Conv2D(l) => l.output_shape(input_shape),
            Layer::MaxPooling2D(l) => l.output_shape(input_shape),
            Layer::Flatten(l) => Ok(l.output_shape(input_shape)),
            Layer::Dense(l) => l.output_shape(input_shape),
        }
    }

    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        match self {
            Layer::Conv2D(l) => l.forward(input),
            Layer::MaxPooling2D(l) => l.forward(input),
            Layer::Flatten(l) => l.forward(input),
            Layer::Dense(l) => l.forward(input),
        }
    }

    /// Back-propagates `grad_output` (∂L/∂output) through the layer, adding
    /// parameter gradients into `grads`, and returns ∂L/∂input.
    pub fn backward(
        &self,
        input: &Tensor,
        output: &Tensor,
        grad_output: &Tensor,
        grads: &mut Gradients,
    ) -> Result<Tensor> {
        match self {
            Layer::Conv2D(l) => l.backward(input, output, grad_output, grads),
            Layer::MaxPooling2D(l) => l.backward(input, grad_output),
            Layer::Flatten(l) => l.backward(input, grad_output),
            Layer::Dense(l) => l.backward(input, output, grad_output, grads),
        }
    }

    /// Zeroed gradient buffers matching `params_mut`.
    pub fn zero_gradients(&self) -> Gradients {
        match self {
            Layer::Conv2D(l) => {
                let mut g = vec![vec![0.0; l.kernel.len()]];
                if let Some(b) = &l.bias {
                    g.push(vec![0.0; b.len()]);
                }
                g
            }
            Layer::Dense(l) => {
                let mut g = vec![vec![0.0; l.weights.data.len()]];
                if let Some(b) = &l.biases {
                    g.push(vec![0.0; b.len()]);
                }
                g
            }
            Layer::MaxPooling2D(_) | Layer::Flatten(_) => Vec::new(),
        }
    }

    /// Trainable parameter tensors: kernel first, then bias when present.
    pub fn params_mut(&mut self) -> Vec<&mut [f64]> {
        match self {
            Layer::Conv2D(l) => {
                let mut p: Vec<&mut [f64]> = vec![l.kernel.as_mut_slice()];
                if let Some(b) = l.bias.as_mut() {
                    p.push(b.as_mut_slice());
                }
                p
            }
            Layer::Dense(l) => {
                let mut p: Vec<&mut [f64]> = vec![l.weights.data.as_mut_slice()];
                if let Some(b) = l.biases.as_mut() {
                    p.push(b.as_mut_slice());
                }
                p
            }
            Layer::MaxPooling2D(_) | Layer::Flatten(_) => Vec::new(),
        }
    }

    pub fn parameter_count(&self) -> usize {
        match self {
            Layer::Conv2D(l) => l.kernel.len() + l.bias.as_ref().map_or(0, Vec::len),
            Layer::Dense(l) => l.weights.data.len() + l.biases.as_ref().map_or(0, Vec::len),
            Layer::MaxPooling2D(_) | Layer::Flatten(_) => 0,
        }
    }

    pub fn init_weights<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        match self {
            Layer::Conv2D(l) => l.init_weights(rng),
            Layer::Dense(l) => l.init_weights(rng),
            Layer::MaxPooling2D(_) | Layer::Flatten(_) => {}
        }
    }
}
