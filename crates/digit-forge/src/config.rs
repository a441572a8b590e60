//! Configuration management for the forge.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use digits_common::constants::{
    DEFAULT_ARTIFACT_DIR, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, DEFAULT_CLEANUP_PROBABILITY,
    DEFAULT_FONT_PATHS, DEFAULT_FONT_SIZE_MAX, DEFAULT_FONT_SIZE_MIN, DEFAULT_LISTEN_ADDR,
    DEFAULT_MAX_AGE_MINUTES, DEFAULT_PUBLIC_PREFIX, DEFAULT_TIER,
};
use digits_common::{CorruptionRecipe, Span};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Directory generated PNGs are written to
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// URL path the artifact directory is served under
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,

    /// Tier used for unknown or unusable tier labels
    #[serde(default = "default_tier")]
    pub default_tier: String,

    /// Canvas and font settings
    #[serde(default)]
    pub image: ImageConfig,

    /// Artifact retention settings
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Recipes overriding or extending the built-in book
    #[serde(default)]
    pub recipes: BTreeMap<String, CorruptionRecipe>,
}

/// Canvas and glyph settings
#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Font size is sampled from this range per render
    #[serde(default = "default_font_size")]
    pub font_size: Span<u32>,

    /// Font files tried in order; the built-in font is used if none load
    #[serde(default = "default_font_paths")]
    pub font_paths: Vec<PathBuf>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            font_size: default_font_size(),
            font_paths: default_font_paths(),
        }
    }
}

/// Artifact retention configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Artifacts older than this are purged
    #[serde(default = "default_max_age")]
    pub max_age_minutes: u64,

    /// Chance that a generation request also runs a cleanup scan
    #[serde(default = "default_cleanup_probability")]
    pub cleanup_probability: f64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_minutes: default_max_age(),
            cleanup_probability: default_cleanup_probability(),
        }
    }
}

// Default value functions
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_artifact_dir() -> PathBuf { PathBuf::from(DEFAULT_ARTIFACT_DIR) }
fn default_public_prefix() -> String { DEFAULT_PUBLIC_PREFIX.to_string() }
fn default_tier() -> String { DEFAULT_TIER.to_string() }
fn default_width() -> u32 { DEFAULT_CANVAS_WIDTH }
fn default_height() -> u32 { DEFAULT_CANVAS_HEIGHT }
fn default_font_size() -> Span<u32> { Span::new(DEFAULT_FONT_SIZE_MIN, DEFAULT_FONT_SIZE_MAX) }
fn default_font_paths() -> Vec<PathBuf> { DEFAULT_FONT_PATHS.iter().map(PathBuf::from).collect() }
fn default_max_age() -> u64 { DEFAULT_MAX_AGE_MINUTES }
fn default_cleanup_probability() -> f64 { DEFAULT_CLEANUP_PROBABILITY }

impl AppConfig {
    /// Load configuration from file, falling back to defaults if it is absent
    pub fn load(config_path: &str) -> Result<Self> {
        let config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.image.width == 0 || self.image.height == 0 {
            anyhow::bail!("image dimensions must be non-zero");
        }
        let font = self.image.font_size;
        if font.min == 0 || !font.is_ordered() {
            anyhow::bail!("font_size must be a non-empty range of positive sizes");
        }
        if !(0.0..=1.0).contains(&self.retention.cleanup_probability) {
            anyhow::bail!("retention.cleanup_probability must be within [0, 1]");
        }
        let prefix = &self.public_prefix;
        if !prefix.starts_with('/') || prefix.ends_with('/') {
            anyhow::bail!("public_prefix must start with '/' and must not end with one");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            artifact_dir: default_artifact_dir(),
            public_prefix: default_public_prefix(),
            default_tier: default_tier(),
            image: ImageConfig::default(),
            retention: RetentionConfig::default(),
            recipes: BTreeMap::new(),
        }
    }
}
