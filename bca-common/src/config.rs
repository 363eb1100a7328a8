//! Configuration loading and resolution
//!
//! Config file resolution priority:
//! 1. Explicit path (e.g. command-line argument)
//! 2. `BCA_CONFIG` environment variable
//! 3. `<user config dir>/bca/config.toml`
//! 4. Compiled defaults
//!
//! A missing file is never fatal: the resolver logs a warning and continues with
//! defaults. A file that exists but cannot be parsed is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "BCA_CONFIG";

/// Tolerance used when checking that weights sum to 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub pipeline: PipelineSettings,
    pub scoring: ScoringSettings,
    pub generative: GenerativeSettings,
    pub retry: RetrySettings,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive (overridden by `RUST_LOG`)
    pub level: String,
    /// Emit ANSI colour codes
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: true,
        }
    }
}

/// Orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    /// Layers scored per batch
    pub batch_size: usize,
    /// Concurrent layer-scoring workers within one batch
    pub max_concurrent_layers: usize,
    /// Progress event channel capacity
    pub event_capacity: usize,
    /// Contribution of each segment to the overall score
    pub segment_weights: SegmentWeightSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: 30,
            max_concurrent_layers: 10,
            event_capacity: 256,
            segment_weights: SegmentWeightSettings::default(),
        }
    }
}

/// Per-segment weights for the overall score (must sum to 1.0)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmentWeightSettings {
    pub consumer: f64,
    pub market: f64,
    pub product: f64,
    pub brand: f64,
    pub experience: f64,
}

impl Default for SegmentWeightSettings {
    fn default() -> Self {
        Self {
            consumer: 0.2,
            market: 0.2,
            product: 0.2,
            brand: 0.2,
            experience: 0.2,
        }
    }
}

impl SegmentWeightSettings {
    pub fn sum(&self) -> f64 {
        self.consumer + self.market + self.product + self.brand + self.experience
    }
}

/// Layer scoring limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringSettings {
    /// Evidence items kept per layer
    pub max_evidence_items: usize,
    /// Characters kept from each evidence body
    pub evidence_char_budget: usize,
    /// Characters kept from a generated assessment
    pub assessment_max_chars: usize,
    /// Amplitude of the random jitter added to heuristic scores
    pub heuristic_jitter: f64,
    /// Word count at which evidence volume stops adding much signal
    pub heuristic_word_threshold: usize,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            max_evidence_items: 10,
            evidence_char_budget: 1200,
            assessment_max_chars: 600,
            heuristic_jitter: 0.05,
            heuristic_word_threshold: 400,
        }
    }
}

/// Generative-text backend settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerativeSettings {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub requests_per_second: u32,
    pub api_key: Option<String>,
}

impl Default for GenerativeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "llama3".to_string(),
            requests_per_second: 5,
            api_key: None,
        }
    }
}

/// Retry/backoff settings for generative calls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
    pub call_timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 8000,
            multiplier: 2.0,
            call_timeout_secs: 30,
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from a file that must exist
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Apply environment variable overrides (environment wins over TOML)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("BCA_LOG_LEVEL") {
            if !level.trim().is_empty() {
                self.logging.level = level;
            }
        }
        if let Ok(url) = std::env::var("BCA_GENERATIVE_URL") {
            if !url.trim().is_empty() {
                self.generative.base_url = url;
                self.generative.enabled = true;
            }
        }
        if let Ok(model) = std::env::var("BCA_GENERATIVE_MODEL") {
            if !model.trim().is_empty() {
                self.generative.model = model;
            }
        }
        if let Ok(key) = std::env::var("BCA_GENERATIVE_API_KEY") {
            if !key.trim().is_empty() {
                self.generative.api_key = Some(key);
            }
        }
    }

    /// Check invariants the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.batch_size == 0 {
            return Err(Error::Config("pipeline.batch_size must be > 0".to_string()));
        }
        if self.pipeline.max_concurrent_layers == 0 {
            return Err(Error::Config(
                "pipeline.max_concurrent_layers must be > 0".to_string(),
            ));
        }
        let weights = &self.pipeline.segment_weights;
        let all = [
            weights.consumer,
            weights.market,
            weights.product,
            weights.brand,
            weights.experience,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::Config(
                "pipeline.segment_weights must be finite and non-negative".to_string(),
            ));
        }
        if (weights.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::Config(format!(
                "pipeline.segment_weights must sum to 1.0 (got {:.6})",
                weights.sum()
            )));
        }
        if self.scoring.max_evidence_items == 0 {
            return Err(Error::Config(
                "scoring.max_evidence_items must be > 0".to_string(),
            ));
        }
        if self.scoring.evidence_char_budget == 0 {
            return Err(Error::Config(
                "scoring.evidence_char_budget must be > 0".to_string(),
            ));
        }
        if !self.scoring.heuristic_jitter.is_finite() || self.scoring.heuristic_jitter < 0.0 {
            return Err(Error::Config(
                "scoring.heuristic_jitter must be >= 0".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be >= 1".to_string()));
        }
        if self.generative.enabled && self.generative.requests_per_second == 0 {
            return Err(Error::Config(
                "generative.requests_per_second must be > 0 when enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Config file resolver
///
/// Walks the priority chain and returns the first config that exists.
pub struct ConfigResolver {
    explicit_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(explicit_path: Option<PathBuf>) -> Self {
        Self { explicit_path }
    }

    /// Candidate config path in priority order, if any is configured
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit_path {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        dirs::config_dir().map(|d| d.join("bca").join("config.toml"))
    }

    /// Resolve, load, override from environment and validate
    pub fn load(&self) -> Result<TomlConfig> {
        let mut config = match self.config_path() {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                TomlConfig::from_file(&path)?
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                TomlConfig::default()
            }
            None => {
                warn!("No config location available, using compiled defaults");
                TomlConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}
