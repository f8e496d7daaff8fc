//! Engine configuration
//!
//! Loaded from YAML. Every field has a default, so a partial file (or none
//! at all) is valid.

use crate::model::TextField;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors from reading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for scoring, allocation and clustering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Highest score a standard can receive (scores range over `0..=max_score`)
    pub max_score: i32,
    /// Proposal fields concatenated into the clustering document
    pub text_fields: Vec<TextField>,
    /// Additional noise terms dropped before clustering
    pub extra_stop_words: Vec<String>,
    /// Latent dimensions used when the caller does not choose
    pub topic_count: usize,
    /// Similarity above which two proposals are linked when the caller does not choose
    pub similarity_threshold: f64,
    /// Fixed seed for the allocation tie-break; random when absent
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_score: 2,
            text_fields: vec![
                TextField::Title,
                TextField::Description,
                TextField::Abstract,
                TextField::Objectives,
                TextField::Outline,
            ],
            extra_stop_words: Vec::new(),
            topic_count: 20,
            similarity_threshold: 0.6,
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from YAML text
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML configuration file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_score < 1 {
            return Err(ConfigError::Invalid(format!(
                "max_score must be at least 1, got {}",
                self.max_score
            )));
        }
        if self.text_fields.is_empty() {
            return Err(ConfigError::Invalid("text_fields must not be empty".to_string()));
        }
        if !self.similarity_threshold.is_finite() {
            return Err(ConfigError::Invalid(
                "similarity_threshold must be a finite number".to_string(),
            ));
        }
        Ok(())
    }
}
