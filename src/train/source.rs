use crate::error::{Error, Result};
use crate::math::Tensor;

/// Indexed access to labelled training samples.
///
/// Implementations may load lazily; `train_loop` only asks for the samples
/// of the current mini-batch.
pub trait SampleSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The input tensor (without batch dimension) and class index of sample `index`.
    fn load(&self, index: usize) -> Result<(Tensor, usize)>;
}

/// Samples already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemory {
    samples: Vec<(Tensor, usize)>,
}

impl InMemory {
    pub fn push(&mut self, input: Tensor, class: usize) {
        self.samples.push((input, class));
    }
}

impl SampleSource for InMemory {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn load(&self, index: usize) -> Result<(Tensor, usize)> {
        self.samples
            .get(index)
            .cloned()
            .ok_or_else(|| Error::Dataset(format!("sample index {} out of range ({})", index, self.samples.len())))
    }
}
