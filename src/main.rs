//! Gallery batch processor
//!
//! Adds thumbnails and stub manifest entries for newly uploaded originals.
//! Takes no arguments; paths come from the environment or their defaults.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gallery_admin::batch::BatchProcessor;
use gallery_admin::config::Config;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting gallery batch processor");
    tracing::info!("Uploads: {:?}", config.uploads_dir);
    tracing::info!("Thumbnails: {:?}", config.thumbs_dir);
    tracing::info!("Manifest: {:?}", config.local_manifest_path());

    let report = BatchProcessor::from_config(&config).run()?;

    tracing::info!(
        "Done: {} added, {} skipped, {} failed",
        report.added.len(),
        report.skipped.len(),
        report.failed.len()
    );
    for name in &report.failed {
        tracing::warn!("Failed: {}", name);
    }

    Ok(())
}
