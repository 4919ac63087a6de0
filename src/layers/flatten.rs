use crate::error::Result;
use crate::math::Tensor;

#[derive(Debug, Clone)]
pub struct Flatten {
    pub name: String,
}

impl Flatten {
    pub fn new(name: String) -> Self {
        Flatten { name }
    }

    pub fn output_shape(&self, input_shape: &[usize]) -> Vec<usize> {
        vec![input_shape.iter().product()]
    }

    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        Ok(Tensor::from_vec(input.data().to_vec()))
    }

    pub fn backward(&self, input: &Tensor, grad_output: &Tensor) -> Result<Tensor> {
        grad_output.clone().reshape(input.shape().to_vec())
    }
}
