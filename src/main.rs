//! Trains the leaf-disease CNN on a class-per-directory image dataset and
//! writes a model artifact the prediction service can load.

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use leafscan::catalog::CLASS_NAMES;
use leafscan::dataset::ImageFolder;
use leafscan::logging::init_logging;
use leafscan::network::{InputType, ModelConfig, ModelMetadata};
use leafscan::preprocess::IMAGE_SIZE;
use leafscan::{save_model, train_loop, Adam, EpochStats, Optimizer, SampleSource, Sequential, Sgd, TrainConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OptimizerKind {
    Adam,
    Sgd,
}

/// Train the leaf-disease classifier
#[derive(Parser, Debug)]
#[command(name = "leafscan-train")]
#[command(version)]
#[command(about = "Train the leaf-disease CNN and write a model artifact", long_about = None)]
struct Cli {
    /// Dataset root with one sub-directory of images per class
    #[arg(long, default_value = "dataset/PlantVillage")]
    dataset: PathBuf,

    /// Where to write the model artifact
    #[arg(short, long, default_value = "model.json")]
    output: PathBuf,

    #[arg(short, long, default_value = "5")]
    epochs: usize,

    #[arg(short, long, default_value = "32")]
    batch_size: usize,

    #[arg(long, default_value = "0.001")]
    learning_rate: f64,

    /// Fraction of each class held out for validation
    #[arg(long, default_value = "0.2")]
    validation_split: f64,

    #[arg(long, value_enum, default_value = "adam")]
    optimizer: OptimizerKind,

    /// Seed for weight init and shuffling; random when omitted
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging("info");

    let folder = ImageFolder::discover(&cli.dataset)
        .with_context(|| format!("Failed to read dataset at {}", cli.dataset.display()))?;
    let (train_set, val_set) = folder.split(cli.validation_split)?;
    info!(
        root = %folder.root().display(),
        classes = folder.num_classes(),
        train = train_set.len(),
        validation = val_set.len(),
        "dataset split"
    );

    println!("Class indices:");
    for (index, class) in folder.classes().iter().enumerate() {
        println!("  {:3} {}", index, class);
    }
    let labels_match = folder.classes().iter().map(String::as_str).eq(CLASS_NAMES.iter().copied());
    if !labels_match {
        warn!("discovered classes differ from the service's CLASS_NAMES; update the list before serving this model");
    }

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let config = ModelConfig::plant_cnn(folder.num_classes(), IMAGE_SIZE as usize);
    let mut model = Sequential::from_config(&config)?;
    model.init_weights(&mut rng);
    info!("\n{}", model.summary());

    let mut optimizer: Box<dyn Optimizer + Send> = match cli.optimizer {
        OptimizerKind::Adam => Box::new(Adam::new(cli.learning_rate)),
        OptimizerKind::Sgd => Box::new(Sgd::new(cli.learning_rate)),
    };
    info!(
        optimizer = optimizer.name(),
        learning_rate = cli.learning_rate,
        epochs = cli.epochs,
        batch_size = cli.batch_size,
        "starting training"
    );

    let (tx, rx) = mpsc::channel::<EpochStats>();
    let train_config = TrainConfig::new(cli.epochs, cli.batch_size).with_progress(tx);
    let t_start = Instant::now();

    let worker = thread::spawn(move || {
        let val = if val_set.is_empty() {
            None
        } else {
            Some(&val_set as &dyn SampleSource)
        };
        let history = train_loop(&mut model, &train_set, val, optimizer.as_mut(), &train_config, &mut rng);
        // Closes the channel so the progress loop below ends.
        drop(train_config);
        history.map(|h| (model, h))
    });

    for stats in rx {
        log_epoch(&stats);
    }

    let (model, history) = worker
        .join()
        .map_err(|_| anyhow!("training thread panicked"))?
        .context("Training failed")?;
    info!(
        epochs = history.len(),
        elapsed_s = t_start.elapsed().as_secs(),
        "training finished"
    );

    let metadata = ModelMetadata {
        description: Some("Leaf disease classifier".to_string()),
        input_type: Some(InputType::ImageRgb {
            width: IMAGE_SIZE,
            height: IMAGE_SIZE,
        }),
        output_labels: Some(folder.classes().to_vec()),
        epochs: Some(history.len()),
    };
    save_model(&model, metadata, &cli.output)
        .with_context(|| format!("Failed to write model to {}", cli.output.display()))?;

    println!("Model saved to {}", cli.output.display());
    Ok(())
}

fn log_epoch(stats: &EpochStats) {
    match (stats.val_loss, stats.val_accuracy) {
        (Some(val_loss), Some(val_accuracy)) => info!(
            "epoch {}/{}: loss {:.4}, accuracy {:.4}, val_loss {:.4}, val_accuracy {:.4} ({} ms)",
            stats.epoch,
            stats.total_epochs,
            stats.train_loss,
            stats.train_accuracy,
            val_loss,
            val_accuracy,
            stats.elapsed_ms
        ),
        _ => info!(
            "epoch {}/{}: loss {:.4}, accuracy {:.4} ({} ms)",
            stats.epoch, stats.total_epochs, stats.train_loss, stats.train_accuracy, stats.elapsed_ms
        ),
    }
}
