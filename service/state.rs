use std::sync::Arc;

use leafscan::Sequential;

/// Everything a request handler needs. Built once at startup and only read
/// afterwards, so it is shared between request threads without a lock.
#[derive(Debug)]
pub struct AppState {
    pub model: Sequential,
    /// Class ids in model output order.
    pub labels: &'static [&'static str],
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(model: Sequential, labels: &'static [&'static str]) -> SharedState {
        Arc::new(AppState { model, labels })
    }
}
