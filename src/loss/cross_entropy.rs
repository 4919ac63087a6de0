/// Categorical cross-entropy loss for use with a Softmax output layer.
pub struct CrossEntropyLoss;

/// Keeps log() away from zero probabilities.
const EPS: f64 = 1e-12;

impl CrossEntropyLoss {
    /// L = -sum(expected[i] * ln(predicted[i] + eps))
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        predicted
            .iter()
            .zip(expected.iter())
            .map(|(p, e)| -e * (p + EPS).ln())
            .sum()
    }

    /// Loss against a single class index; equivalent to `loss` with a one-hot target.
    pub fn loss_for_class(predicted: &[f64], class: usize) -> f64 {
        predicted.get(class).map_or(-EPS.ln(), |p| -(p + EPS).ln())
    }

    /// Gradient of Softmax + cross-entropy w.r.t. the pre-softmax logits:
    ///   ∂L/∂z_i = predicted[i] - expected[i]
    ///
    /// The Softmax derivative step in the output layer is identity (1.0), so
    /// passing this as ∂L/∂a does not apply it twice.
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted
            .iter()
            .zip(expected.iter())
            .map(|(p, e)| p - e)
            .collect()
    }
}

/// One-hot target vector of length `classes`.
pub fn one_hot(class: usize, classes: usize) -> Vec<f64> {
    let mut v = vec![0.0; classes];
    if let Some(slot) = v.get_mut(class) {
        *slot = 1.0;
    }
    v
}
