//! Application state and shared resources.

use std::sync::Arc;

use rand::Rng;

use digits_common::DigitsError;

use crate::config::AppConfig;
use crate::obfuscate::Forge;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Obfuscation pipeline and artifact store
    pub forge: Arc<Forge>,
}

impl AppState {
    /// Build state from validated configuration
    pub fn new(config: AppConfig) -> Result<Self, DigitsError> {
        let forge = Arc::new(Forge::from_config(&config)?);
        forge.store().ensure_dir()?;

        Ok(Self {
            config: Arc::new(config),
            forge,
        })
    }

    /// Public URL for an artifact file name
    pub fn artifact_url(&self, filename: &str) -> String {
        format!("{}/{}", self.config.public_prefix, filename)
    }

    /// Roll the cleanup dice and, on a hit, purge in the background.
    ///
    /// Returns whether a cleanup was scheduled.
    pub fn maybe_cleanup(&self) -> bool {
        let probability = self.config.retention.cleanup_probability;
        if probability <= 0.0 || !rand::rng().random_bool(probability) {
            return false;
        }

        let forge = self.forge.clone();
        let max_age = self.config.retention.max_age_minutes;
        // Detached; the report is logged by the store
        tokio::task::spawn_blocking(move || forge.cleanup(max_age));
        true
    }
}
