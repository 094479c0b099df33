//! Service configuration.
//!
//! Configuration is sparse TOML with env-var overrides — deployment
//! environments (the original ran as a function URL behind a CDN) inject
//! store locations through the environment, while local runs and tests use
//! a config file or plain defaults.
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! path_prefix_segments = 1      # Path segments to drop before the image path
//! origin_root = "originals"     # Root directory of the origin store
//! variant_root = "variants"     # Root directory of the variant store (omit to disable caching)
//! ```
//!
//! Environment overrides: `ORIGIN_IMAGE_ROOT`, `VARIANT_IMAGE_ROOT`.
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Runtime knobs for the request handler and the filesystem stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ServiceConfig {
    /// Leading path segments dropped before the image path. The default of
    /// 1 drops the empty segment before the first `/`, so
    /// `/images/sample.jpg/<ops>` maps to image path `images/sample.jpg`.
    pub path_prefix_segments: usize,
    /// Root directory for [`FsOriginStore`](crate::store::FsOriginStore).
    pub origin_root: Option<PathBuf>,
    /// Root directory for [`FsVariantStore`](crate::store::FsVariantStore).
    /// `None` disables variant caching entirely.
    pub variant_root: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            path_prefix_segments: 1,
            origin_root: None,
            variant_root: None,
        }
    }
}

impl ServiceConfig {
    /// Load from a TOML file, apply env overrides, validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus env overrides — the deployment path, no file needed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(root) = std::env::var("ORIGIN_IMAGE_ROOT") {
            if !root.is_empty() {
                self.origin_root = Some(PathBuf::from(root));
            }
        }
        if let Ok(root) = std::env::var("VARIANT_IMAGE_ROOT") {
            if !root.is_empty() {
                self.variant_root = Some(PathBuf::from(root));
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let (Some(origin), Some(variant)) = (&self.origin_root, &self.variant_root) {
            if origin == variant {
                return Err(ConfigError::Validation(
                    "origin_root and variant_root must differ: variants would overwrite originals"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }
}
