//! HTTP prediction service for the leaf-disease classifier.
//!
//!   GET  /          health check
//!   POST /predict   multipart upload with a `file` field, returns the diagnosis
//!
//! Each request is handled on its own thread; the model is loaded once and
//! shared read-only.

mod error;
mod handlers;
mod routes;
mod state;
mod util;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tiny_http::Server;
use tracing::{info, warn};

use leafscan::catalog::CLASS_NAMES;
use leafscan::load_model;
use leafscan::logging::init_logging;

use state::AppState;

/// Leaf disease prediction service
#[derive(Parser, Debug)]
#[command(name = "leafscan-service")]
#[command(version)]
#[command(about = "Serve leaf-disease predictions over HTTP", long_about = None)]
struct Cli {
    /// Host to bind to
    #[arg(long, env = "LEAFSCAN_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "LEAFSCAN_PORT", default_value = "8000")]
    port: u16,

    /// Model artifact; defaults to model.json next to the executable
    #[arg(short, long, env = "LEAFSCAN_MODEL")]
    model: Option<PathBuf>,
}

fn default_model_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Cannot locate the running executable")?;
    let dir = exe
        .parent()
        .ok_or_else(|| anyhow!("Executable path has no parent directory"))?;
    Ok(dir.join("model.json"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging("info");

    let model_path = match cli.model {
        Some(path) => path,
        None => default_model_path()?,
    };
    let loaded = load_model(&model_path)
        .with_context(|| format!("Failed to load model from {}", model_path.display()))?;
    if loaded.used_fallback {
        info!("model artifact required schema patching");
    }
    info!("\n{}", loaded.model.summary());

    match loaded.model.output_units() {
        Some(units) if units != CLASS_NAMES.len() => warn!(
            units,
            labels = CLASS_NAMES.len(),
            "model output width differs from the class label count"
        ),
        _ => {}
    }
    if let Some(labels) = &loaded.metadata.output_labels {
        if !labels.iter().map(String::as_str).eq(CLASS_NAMES.iter().copied()) {
            warn!(?labels, "labels stored with the model differ from CLASS_NAMES");
        }
    }

    let state = AppState::new(loaded.model, &CLASS_NAMES);

    let addr = format!("{}:{}", cli.host, cli.port);
    let server = Server::http(&addr).map_err(|e| anyhow!("Failed to bind {}: {}", addr, e))?;
    info!(addr = %addr, "listening");

    for request in server.incoming_requests() {
        let state = state.clone();
        std::thread::spawn(move || {
            routes::dispatch(request, state);
        });
    }
    Ok(())
}
