use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A flat parameter tensor with its logical shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightArray {
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

impl WeightArray {
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> WeightArray {
        WeightArray { shape, values }
    }

    /// Checks the declared shape against both the expected shape and the
    /// number of stored values.
    pub fn expect_shape(&self, layer: &str, expected: &[usize]) -> Result<&[f64]> {
        let count: usize = self.shape.iter().product();
        if self.shape != expected || count != self.values.len() {
            return Err(Error::ModelLoad(format!(
                "Weights for layer '{}' have shape {:?} ({} values), expected {:?}",
                layer,
                self.shape,
                self.values.len(),
                expected
            )));
        }
        Ok(&self.values)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerWeights {
    pub kernel: WeightArray,
    #[serde(default)]
    pub bias: Option<WeightArray>,
}

/// Layer name → parameters. Ordered so artifacts serialize deterministically.
pub type WeightMap = BTreeMap<String, LayerWeights>;
