pub mod epoch_stats;
pub mod loop_fn;
pub mod source;
pub mod train_config;

pub use epoch_stats::EpochStats;
pub use loop_fn::{evaluate, train_loop};
pub use source::{InMemory, SampleSource};
pub use train_config::TrainConfig;
