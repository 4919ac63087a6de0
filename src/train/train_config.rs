use std::sync::mpsc;

use crate::train::epoch_stats::EpochStats;

/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `epochs`     : total number of full passes over the training data
/// - `batch_size` : samples per mini-batch
/// - `progress_tx`: optional channel sender; one `EpochStats` is sent per
///                   completed epoch. If the receiver is dropped the loop
///                   stops early.
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
}

impl TrainConfig {
    /// Creates a `TrainConfig` with no progress channel.
    pub fn new(epochs: usize, batch_size: usize) -> Self {
        TrainConfig {
            epochs,
            batch_size,
            progress_tx: None,
        }
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<EpochStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }
}
