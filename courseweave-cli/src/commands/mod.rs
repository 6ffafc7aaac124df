//! CLI command implementations.

pub mod build;
pub mod verify;

pub use build::build_course;
pub use verify::verify_course;

use anyhow::{Context, Result};
use courseweave_core::{Config, DirectoryLoader, ExcludeFilter};
use std::path::Path;

/// Load the configuration and a loader for its content tree
pub(crate) fn load_course(config_path: &Path) -> Result<(Config, DirectoryLoader)> {
    tracing::info!("Loading config from {:?}", config_path);
    let config = Config::from_file(config_path).context("Failed to load configuration")?;
    let loader = DirectoryLoader::new(
        config.content_dir(),
        ExcludeFilter::new(config.filter.clone()),
    );
    Ok((config, loader))
}
