//! Subcommand implementations and the shared service bootstrap.

pub mod catalog;
pub mod learner;
pub mod lessons;
pub mod progress;

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use signpath_core::{LessonCatalog, ProgressService, TursoProgressStore};
use tracing::{debug, warn};

use crate::config::{SignpathConfig, StoreConfig};

/// Open the configured store and catalog and build the service.
pub async fn open_service(config: &SignpathConfig) -> Result<ProgressService> {
    let store = match &config.store {
        StoreConfig::Local { path } => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            debug!(path = %path.display(), "opening local progress database");
            TursoProgressStore::new_local(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?
        }
        StoreConfig::Remote { url, auth_token } => {
            debug!(url, "connecting to remote progress database");
            TursoProgressStore::new_remote(url, auth_token)
                .await
                .with_context(|| format!("connecting to {url}"))?
        }
    };

    let catalog = load_catalog(config)?;
    Ok(ProgressService::new(
        Arc::new(store),
        Arc::new(catalog),
        config.progress.clone(),
    ))
}

/// Load the lesson catalog, or an empty one when the file does not exist.
pub fn load_catalog(config: &SignpathConfig) -> Result<LessonCatalog> {
    let path = &config.catalog.path;
    if !path.exists() {
        warn!(path = %path.display(), "lesson catalog not found, lesson commands will reject every lesson");
        return Ok(LessonCatalog::empty());
    }
    let catalog = LessonCatalog::load(path)?;
    debug!(lessons = catalog.len(), "lesson catalog loaded");
    Ok(catalog)
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
