use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::layers::Gradients;
use crate::loss::{one_hot, CrossEntropyLoss};
use crate::math::{argmax, Tensor};
use crate::network::Sequential;
use crate::optim::Optimizer;
use crate::train::epoch_stats::EpochStats;
use crate::train::source::SampleSource;
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `model` for `config.epochs` epochs with softmax cross-entropy and
/// returns the statistics of every completed epoch.
///
/// Sample order is reshuffled each epoch from `rng`. Gradients are averaged
/// over each mini-batch before one optimizer step. When a validation source
/// is given, its loss and accuracy are measured after every epoch.
///
/// The loop ends early if the `progress_tx` receiver has been dropped.
pub fn train_loop<R: Rng + ?Sized>(
    model: &mut Sequential,
    train: &dyn SampleSource,
    val: Option<&dyn SampleSource>,
    optimizer: &mut dyn Optimizer,
    config: &TrainConfig,
    rng: &mut R,
) -> Result<Vec<EpochStats>> {
    if train.is_empty() {
        return Err(Error::Dataset("training set is empty".to_string()));
    }
    if config.batch_size == 0 {
        return Err(Error::Dataset("batch size must be at least 1".to_string()));
    }
    let classes = model
        .output_units()
        .ok_or_else(|| Error::Layer("model has no output units".to_string()))?;

    let mut history = Vec::with_capacity(config.epochs);

    for epoch in 1..=config.epochs {
        let t_start = Instant::now();

        let (train_loss, train_accuracy) =
            run_one_epoch(model, train, optimizer, config.batch_size, classes, rng)?;

        let (val_loss, val_accuracy) = match val {
            Some(source) if !source.is_empty() => {
                let (loss, acc) = evaluate(model, source)?;
                (Some(loss), Some(acc))
            }
            _ => (None, None),
        };

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            train_accuracy,
            val_loss,
            val_accuracy,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        history.push(stats.clone());

        if let Some(ref tx) = config.progress_tx {
            if tx.send(stats).is_err() {
                info!(epoch, "progress receiver dropped, stopping training");
                break;
            }
        }
    }

    Ok(history)
}

/// Mean cross-entropy and accuracy of `model` over every sample of `source`.
pub fn evaluate(model: &Sequential, source: &dyn SampleSource) -> Result<(f64, f64)> {
    let n = source.len();
    if n == 0 {
        return Ok((0.0, 0.0));
    }
    let mut total_loss = 0.0;
    let mut correct = 0usize;
    for i in 0..n {
        let (input, class) = source.load(i)?;
        let output = model.forward(&input)?;
        total_loss += CrossEntropyLoss::loss_for_class(output.data(), class);
        if argmax(output.data()) == class {
            correct += 1;
        }
    }
    Ok((total_loss / n as f64, correct as f64 / n as f64))
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// One pass of mini-batch training. Returns (mean loss, accuracy).
fn run_one_epoch<R: Rng + ?Sized>(
    model: &mut Sequential,
    source: &dyn SampleSource,
    optimizer: &mut dyn Optimizer,
    batch_size: usize,
    classes: usize,
    rng: &mut R,
) -> Result<(f64, f64)> {
    let n = source.len();
    let mut total_loss = 0.0;
    let mut correct = 0usize;

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);

    for (batch_no, batch) in indices.chunks(batch_size).enumerate() {
        let mut grads: Vec<Gradients> = model.layers().iter().map(|l| l.zero_gradients()).collect();

        for &idx in batch {
            let (input, class) = source.load(idx)?;
            let trace = model.forward_trace(&input)?;
            let output = trace[trace.len() - 1].data();

            total_loss += CrossEntropyLoss::loss_for_class(output, class);
            if argmax(output) == class {
                correct += 1;
            }

            let mut delta = Tensor::from_vec(CrossEntropyLoss::derivative(output, &one_hot(class, classes)));
            for (i, layer) in model.layers().iter().enumerate().rev() {
                delta = layer.backward(&trace[i], &trace[i + 1], &delta, &mut grads[i])?;
            }
        }

        let inv_batch = 1.0 / batch.len() as f64;
        optimizer.begin_step();
        let mut slot = 0;
        for (layer, layer_grads) in model.layers_mut().iter_mut().zip(grads.iter_mut()) {
            for (params, grad) in layer.params_mut().into_iter().zip(layer_grads.iter_mut()) {
                grad.iter_mut().for_each(|g| *g *= inv_batch);
                optimizer.step(slot, params, grad);
                slot += 1;
            }
        }

        debug!(batch = batch_no + 1, samples = batch.len(), "mini-batch applied");
    }

    Ok((total_loss / n as f64, correct as f64 / n as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{LayerConfig, ModelConfig};
    use crate::optim::{Adam, Sgd};
    use crate::train::source::InMemory;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::mpsc;

    /// Two linearly separable 2x2x1 "images": bright left column vs bright right column.
    fn toy_source() -> InMemory {
        let left = Tensor::new(vec![2, 2, 1], vec![1.0, 0.0, 1.0, 0.0]).unwrap();
        let right = Tensor::new(vec![2, 2, 1], vec![0.0, 1.0, 0.0, 1.0]).unwrap();
        let mut source = InMemory::default();
        for _ in 0..8 {
            source.push(left.clone(), 0);
            source.push(right.clone(), 1);
        }
        source
    }

    fn toy_model(rng: &mut StdRng) -> Sequential {
        let config = ModelConfig::sequential(
            "toy",
            vec![
                LayerConfig::input("input_layer", &[2, 2, 1]),
                LayerConfig::flatten("flatten"),
                LayerConfig::dense("dense", 2, "softmax"),
            ],
        );
        let mut model = Sequential::from_config(&config).unwrap();
        model.init_weights(rng);
        model
    }

    #[test]
    fn adam_learns_separable_toy_problem() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut model = toy_model(&mut rng);
        let source = toy_source();
        let mut adam = Adam::new(0.05);
        let config = TrainConfig::new(40, 4);

        let history = train_loop(&mut model, &source, Some(&source as &dyn SampleSource), &mut adam, &config, &mut rng).unwrap();

        assert_eq!(history.len(), 40);
        let last = history.last().unwrap();
        assert!(last.train_loss < history[0].train_loss);
        assert_eq!(last.val_accuracy, Some(1.0));
    }

    #[test]
    fn sgd_reduces_loss() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut model = toy_model(&mut rng);
        let source = toy_source();
        let before = evaluate(&model, &source).unwrap().0;

        let mut sgd = Sgd::new(0.5);
        train_loop(&mut model, &source, None, &mut sgd, &TrainConfig::new(20, 2), &mut rng).unwrap();

        let after = evaluate(&model, &source).unwrap().0;
        assert!(after < before, "loss {} -> {}", before, after);
    }

    #[test]
    fn progress_is_streamed_and_dropped_receiver_stops() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut model = toy_model(&mut rng);
        let source = toy_source();
        let mut sgd = Sgd::new(0.1);

        let (tx, rx) = mpsc::channel();
        let config = TrainConfig::new(3, 8).with_progress(tx);
        train_loop(&mut model, &source, None, &mut sgd, &config, &mut rng).unwrap();
        let epochs: Vec<usize> = rx.try_iter().map(|s| s.epoch).collect();
        assert_eq!(epochs, vec![1, 2, 3]);

        let (tx, rx) = mpsc::channel();
        drop(rx);
        let config = TrainConfig::new(10, 8).with_progress(tx);
        let history = train_loop(&mut model, &source, None, &mut sgd, &config, &mut rng).unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn empty_training_set_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut model = toy_model(&mut rng);
        let mut sgd = Sgd::new(0.1);
        let err = train_loop(&mut model, &InMemory::default(), None, &mut sgd, &TrainConfig::new(1, 4), &mut rng)
            .unwrap_err();
        assert!(matches!(err, Error::Dataset(_)));
    }
}
