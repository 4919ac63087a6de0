use serde::{Deserialize, Serialize};

/// Per-epoch training statistics emitted by `train_loop`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    pub total_epochs: usize,
    /// Mean cross-entropy over the training samples, measured while training.
    pub train_loss: f64,
    /// Fraction of training samples whose forward pass picked the right class.
    pub train_accuracy: f64,
    pub val_loss: Option<f64>,
    pub val_accuracy: Option<f64>,
    /// Wall-clock duration of the epoch including validation, in milliseconds.
    pub elapsed_ms: u64,
}
