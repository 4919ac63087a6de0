use crate::error::{Error, Result};

/// A dense n-dimensional array of `f64` in row-major order.
///
/// Images are laid out HWC (height, width, channels), matching the kernel
/// layout used by `Conv2D`. A batch adds a leading dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Tensor> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::ShapeMismatch {
                expected: shape,
                actual: vec![data.len()],
            });
        }
        Ok(Tensor { shape, data })
    }

    pub fn zeros(shape: Vec<usize>) -> Tensor {
        let len = shape.iter().product();
        Tensor { shape, data: vec![0.0; len] }
    }

    /// A rank-1 tensor wrapping `data`.
    pub fn from_vec(data: Vec<f64>) -> Tensor {
        Tensor { shape: vec![data.len()], data }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reinterprets the data under a new shape with the same element count.
    pub fn reshape(self, shape: Vec<usize>) -> Result<Tensor> {
        Tensor::new(shape, self.data)
    }

    /// Prepends a batch dimension of size 1: `[h, w, c]` becomes `[1, h, w, c]`.
    pub fn with_batch_dim(self) -> Tensor {
        let mut shape = Vec::with_capacity(self.shape.len() + 1);
        shape.push(1);
        shape.extend_from_slice(&self.shape);
        Tensor { shape, data: self.data }
    }

    /// Size of the leading (batch) dimension.
    pub fn batch_size(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Copies out sample `index` along the leading dimension.
    pub fn sample(&self, index: usize) -> Result<Tensor> {
        if self.shape.len() < 2 || index >= self.shape[0] {
            return Err(Error::Layer(format!(
                "Cannot take sample {} of tensor with shape {:?}",
                index, self.shape
            )));
        }
        let inner: usize = self.shape[1..].iter().product();
        let start = index * inner;
        Ok(Tensor {
            shape: self.shape[1..].to_vec(),
            data: self.data[start..start + inner].to_vec(),
        })
    }

    /// Interprets the tensor as a single HWC image and returns its dimensions.
    pub fn hwc(&self) -> Result<(usize, usize, usize)> {
        match self.shape.as_slice() {
            &[h, w, c] => Ok((h, w, c)),
            other => Err(Error::Layer(format!("Expected a 3D HWC tensor, got {:?}", other))),
        }
    }
}

/// Index of the maximum element in a slice.
pub fn argmax(v: &[f64]) -> usize {
    let mut best = 0;
    for (i, x) in v.iter().enumerate().skip(1) {
        if x.partial_cmp(&v[best]) == Some(std::cmp::Ordering::Greater) {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_wrong_element_count() {
        assert!(Tensor::new(vec![2, 2], vec![1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn batch_dim_and_sample() {
        let t = Tensor::new(vec![1, 2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(t.batch_size(), 1);
        let s = t.sample(0).unwrap();
        assert_eq!(s.shape(), &[2, 2]);
        assert_eq!(s.data(), &[1.0, 2.0, 3.0, 4.0]);
        assert!(t.sample(1).is_err());

        let batched = s.with_batch_dim();
        assert_eq!(batched.shape(), &[1, 2, 2]);
    }

    #[test]
    fn argmax_prefers_first_max() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.2]), 1);
        assert_eq!(argmax(&[]), 0);
        assert_eq!(argmax(&[f64::NAN, 0.3, 0.9]), 0);
    }
}
