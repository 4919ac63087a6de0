use std::f64::consts::E;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Linear,
    ReLU,
    Sigmoid,
    Tanh,
    /// Softmax is vector-valued; `apply` normalizes the whole slice at once.
    Softmax,
}

impl Activation {
    /// Parses the activation names used in model configs (`"relu"`, `"softmax"`, ...).
    pub fn from_name(name: &str) -> Result<Activation> {
        match name {
            "linear" => Ok(Activation::Linear),
            "relu" => Ok(Activation::ReLU),
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "softmax" => Ok(Activation::Softmax),
            other => Err(Error::UnsupportedActivation(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Activation::Linear => "linear",
            Activation::ReLU => "relu",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::Softmax => "softmax",
        }
    }

    /// Applies the activation in place.
    ///
    /// For conv outputs the slice is a whole HWC feature map; softmax is only
    /// meaningful on a rank-1 dense output.
    pub fn apply(&self, values: &mut [f64]) {
        match self {
            Activation::Linear => {}
            Activation::ReLU => values.iter_mut().for_each(|x| *x = x.max(0.0)),
            Activation::Sigmoid => values.iter_mut().for_each(|x| *x = 1.0 / (1.0 + E.powf(-*x))),
            Activation::Tanh => values.iter_mut().for_each(|x| *x = x.tanh()),
            Activation::Softmax => softmax_in_place(values),
        }
    }

    /// Element-wise derivative expressed in terms of the activation OUTPUT `a`.
    ///
    /// For `Softmax` the layer is paired with cross-entropy, whose gradient
    /// (`predicted - expected`) is already taken w.r.t. the logits, so this
    /// returns `1.0` and the delta passes through unchanged.
    pub fn derivative_from_output(&self, a: f64) -> f64 {
        match self {
            Activation::Linear => 1.0,
            Activation::ReLU => if a > 0.0 { 1.0 } else { 0.0 },
            Activation::Sigmoid => a * (1.0 - a),
            Activation::Tanh => 1.0 - a * a,
            Activation::Softmax => 1.0,
        }
    }
}

/// Numerically stable softmax (max-shifted).
fn softmax_in_place(values: &mut [f64]) {
    if values.is_empty() {
        return;
    }
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for x in values.iter_mut() {
        *x = (*x - max).exp();
        sum += *x;
    }
    for x in values.iter_mut() {
        *x /= sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn parses_config_names() {
        assert_eq!(Activation::from_name("relu").unwrap(), Activation::ReLU);
        assert_eq!(Activation::from_name("softmax").unwrap().name(), "softmax");
        assert!(Activation::from_name("swish").is_err());
    }

    #[test]
    fn softmax_sums_to_one_and_survives_large_logits() {
        let mut v = vec![1000.0, 1001.0, 1002.0];
        Activation::Softmax.apply(&mut v);
        assert_abs_diff_eq!(v.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(v[2] > v[1] && v[1] > v[0]);
    }

    #[test]
    fn relu_and_its_derivative() {
        let mut v = vec![-2.0, 0.0, 3.0];
        Activation::ReLU.apply(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 3.0]);
        assert_eq!(Activation::ReLU.derivative_from_output(0.0), 0.0);
        assert_eq!(Activation::ReLU.derivative_from_output(3.0), 1.0);
    }

    #[test]
    fn sigmoid_derivative_from_output() {
        let mut v = vec![0.0];
        Activation::Sigmoid.apply(&mut v);
        assert_abs_diff_eq!(v[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(Activation::Sigmoid.derivative_from_output(v[0]), 0.25, epsilon = 1e-12);
    }
}
