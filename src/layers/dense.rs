use rand::Rng;

use crate::activation::Activation;
use crate::error::{Error, Result};
use crate::math::{Matrix, Tensor};

#[derive(Debug, Clone)]
pub struct Dense {
    pub name: String,
    pub units: usize,
    /// `input_size × units`
    pub weights: Matrix,
    pub biases: Option<Vec<f64>>,
    pub activation: Activation,
}

impl Dense {
    pub fn new(name: String, units: usize, input_size: usize, use_bias: bool, activation: Activation) -> Result<Dense> {
        if units == 0 || input_size == 0 {
            return Err(Error::Layer(format!("Dense '{}' needs non-zero units and input size", name)));
        }
        Ok(Dense {
            name,
            units,
            weights: Matrix::zeros(input_size, units),
            biases: if use_bias { Some(vec![0.0; units]) } else { None },
            activation,
        })
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    /// He init for ReLU, Xavier otherwise; biases start at zero.
    pub fn init_weights<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let (rows, cols) = (self.weights.rows, self.weights.cols);
        self.weights = match self.activation {
            Activation::ReLU => Matrix::he(rows, cols, rows, rng),
            _ => Matrix::xavier(rows, cols, rows, rng),
        };
        if let Some(b) = self.biases.as_mut() {
            b.iter_mut().for_each(|v| *v = 0.0);
        }
    }

    pub fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        if input_shape != [self.input_size()] {
            return Err(Error::ShapeMismatch {
                expected: vec![self.input_size()],
                actual: input_shape.to_vec(),
            });
        }
        Ok(vec![self.units])
    }

    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        self.output_shape(input.shape())?;
        let mut z = self.weights.vec_mul(input.data());
        if let Some(b) = &self.biases {
            for (v, bias) in z.iter_mut().zip(b) {
                *v += bias;
            }
        }
        self.activation.apply(&mut z);
        Ok(Tensor::from_vec(z))
    }

    /// Accumulates weight (and bias) gradients and returns ∂L/∂input.
    /// `grad_output` is ∂L/∂a (error in activation space).
    pub fn backward(
        &self,
        input: &Tensor,
        output: &Tensor,
        grad_output: &Tensor,
        grads: &mut [Vec<f64>],
    ) -> Result<Tensor> {
        // δ = error ⊙ σ'(a)
        let delta: Vec<f64> = grad_output
            .data()
            .iter()
            .zip(output.data())
            .map(|(d, &a)| d * self.activation.derivative_from_output(a))
            .collect();

        let (w_grad, rest) = grads
            .split_first_mut()
            .ok_or_else(|| Error::Layer(format!("Missing gradient buffers for '{}'", self.name)))?;
        Matrix::add_outer(w_grad, input.data(), &delta);
        if let Some(b_grad) = rest.first_mut() {
            for (bg, dv) in b_grad.iter_mut().zip(&delta) {
                *bg += dv;
            }
        }

        Ok(Tensor::from_vec(self.weights.mul_vec(&delta)))
    }
}
