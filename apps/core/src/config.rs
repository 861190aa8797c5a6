//! Runtime configuration.
//!
//! Every tunable constant of the pipeline lives in [`BrainConfig`] and is passed
//! into the analyzer at construction. Values can be overridden from `PULSE_*`
//! environment variables (a `.env` file is honoured).

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use validator::Validate;

use crate::error::AppError;

/// How rule and similarity signals are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMode {
    /// Rule and neighbor vote into a per-category score table.
    WeightedVote,
    /// A matching rule decides outright; the neighbor is only reported.
    RuleOverride,
}

impl FromStr for FusionMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weighted_vote" | "weighted" => Ok(FusionMode::WeightedVote),
            "rule_override" | "override" => Ok(FusionMode::RuleOverride),
            other => Err(AppError::Config(format!("Unknown fusion mode: {}", other))),
        }
    }
}

/// Tunable parameters of the classification pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct BrainConfig {
    /// Version tag echoed in every result.
    #[validate(length(min = 1))]
    pub pipeline_version: String,
    pub fusion_mode: FusionMode,
    /// Minimum cosine similarity for a corpus neighbor to count as a signal.
    #[validate(range(min = 0.0, max = 1.0))]
    pub similarity_threshold: f64,
    /// Score a matching rule adds to its category.
    #[validate(range(min = 0.0, max = 2.0))]
    pub rule_weight: f64,
    /// Minimum similarity for a past correction to override a draft.
    #[validate(range(min = 0.0, max = 1.0))]
    pub feedback_threshold: f64,
    /// Ring buffer capacity across all users.
    #[validate(range(min = 1))]
    pub feedback_capacity: usize,
    /// Most recent corrections considered per user.
    #[validate(range(min = 1))]
    pub per_user_window: usize,
    /// Entries shorter than this (in characters) are penalised.
    pub short_entry_chars: usize,
    pub short_entry_penalty: u8,
    #[validate(range(max = 100))]
    pub min_confidence: u8,
    #[validate(range(max = 100))]
    pub max_confidence: u8,
    #[validate(range(max = 100))]
    pub fallback_confidence: u8,
    #[validate(range(max = 100))]
    pub degraded_confidence: u8,
    pub upstream_agreement_bonus: u8,
    pub upstream_disagreement_penalty: u8,
    /// Capacity of the feedback text vector cache.
    #[validate(range(min = 1))]
    pub vector_cache_size: usize,
    /// Key under which the feedback buffer is persisted.
    #[validate(length(min = 1))]
    pub store_key: String,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            pipeline_version: "pulse-v3".to_string(),
            fusion_mode: FusionMode::WeightedVote,
            similarity_threshold: 0.22,
            rule_weight: 0.95,
            feedback_threshold: 0.40,
            feedback_capacity: 1000,
            per_user_window: 200,
            short_entry_chars: 60,
            short_entry_penalty: 8,
            min_confidence: 40,
            max_confidence: 95,
            fallback_confidence: 45,
            degraded_confidence: 40,
            upstream_agreement_bonus: 5,
            upstream_disagreement_penalty: 10,
            vector_cache_size: 512,
            store_key: "pulse.feedback.v1".to_string(),
        }
    }
}

impl BrainConfig {
    /// Loads the configuration from the environment on top of the defaults.
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();

        let mut config = Self::default();
        if let Some(v) = env_value("PULSE_PIPELINE_VERSION") {
            config.pipeline_version = v;
        }
        if let Some(v) = env_parsed("PULSE_FUSION_MODE")? {
            config.fusion_mode = v;
        }
        if let Some(v) = env_parsed("PULSE_SIMILARITY_THRESHOLD")? {
            config.similarity_threshold = v;
        }
        if let Some(v) = env_parsed("PULSE_RULE_WEIGHT")? {
            config.rule_weight = v;
        }
        if let Some(v) = env_parsed("PULSE_FEEDBACK_THRESHOLD")? {
            config.feedback_threshold = v;
        }
        if let Some(v) = env_parsed("PULSE_FEEDBACK_CAPACITY")? {
            config.feedback_capacity = v;
        }
        if let Some(v) = env_parsed("PULSE_PER_USER_WINDOW")? {
            config.per_user_window = v;
        }
        if let Some(v) = env_parsed("PULSE_SHORT_ENTRY_CHARS")? {
            config.short_entry_chars = v;
        }
        if let Some(v) = env_parsed("PULSE_SHORT_ENTRY_PENALTY")? {
            config.short_entry_penalty = v;
        }
        if let Some(v) = env_parsed("PULSE_MIN_CONFIDENCE")? {
            config.min_confidence = v;
        }
        if let Some(v) = env_parsed("PULSE_MAX_CONFIDENCE")? {
            config.max_confidence = v;
        }
        if let Some(v) = env_parsed("PULSE_FALLBACK_CONFIDENCE")? {
            config.fallback_confidence = v;
        }
        if let Some(v) = env_parsed("PULSE_DEGRADED_CONFIDENCE")? {
            config.degraded_confidence = v;
        }
        if let Some(v) = env_parsed("PULSE_UPSTREAM_AGREEMENT_BONUS")? {
            config.upstream_agreement_bonus = v;
        }
        if let Some(v) = env_parsed("PULSE_UPSTREAM_DISAGREEMENT_PENALTY")? {
            config.upstream_disagreement_penalty = v;
        }
        if let Some(v) = env_parsed("PULSE_VECTOR_CACHE_SIZE")? {
            config.vector_cache_size = v;
        }
        if let Some(v) = env_value("PULSE_STORE_KEY") {
            config.store_key = v;
        }

        config.check()?;
        Ok(config)
    }

    /// Validates field ranges and the cross-field confidence ordering.
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()
            .map_err(|e| AppError::Config(format!("Invalid configuration: {}", e)))?;

        if self.min_confidence > self.max_confidence {
            return Err(AppError::Config(format!(
                "min_confidence ({}) exceeds max_confidence ({})",
                self.min_confidence, self.max_confidence
            )));
        }
        for (name, value) in [
            ("fallback_confidence", self.fallback_confidence),
            ("degraded_confidence", self.degraded_confidence),
        ] {
            if value < self.min_confidence || value > self.max_confidence {
                return Err(AppError::Config(format!(
                    "{} ({}) must lie within [{}, {}]",
                    name, value, self.min_confidence, self.max_confidence
                )));
            }
        }
        Ok(())
    }

    /// Clamps a raw confidence into the configured band.
    pub fn clamp_confidence(&self, raw: i64) -> u8 {
        raw.clamp(self.min_confidence as i64, self.max_confidence as i64) as u8
    }
}

/// Which key-value adapter backs the feedback buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "file" => Ok(StoreBackend::File),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(AppError::Config(format!("Unknown store backend: {}", other))),
        }
    }
}

/// Storage settings for the host binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();

        let mut config = Self::default();
        if let Some(v) = env_parsed("PULSE_STORE")? {
            config.backend = v;
        }
        if let Some(v) = env_value("PULSE_DATA_DIR") {
            config.data_dir = PathBuf::from(v);
        }
        Ok(config)
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parsed<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_value(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{}={:?} is invalid: {}", key, raw, e))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BrainConfig::default();
        assert!(config.check().is_ok());
        assert_eq!(config.feedback_capacity, 1000);
        assert_eq!(config.per_user_window, 200);
        assert!((config.similarity_threshold - 0.22).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clamp_confidence() {
        let config = BrainConfig::default();
        assert_eq!(config.clamp_confidence(120), 95);
        assert_eq!(config.clamp_confidence(-3), 40);
        assert_eq!(config.clamp_confidence(70), 70);
    }

    #[test]
    fn test_inverted_band_rejected() {
        let config = BrainConfig {
            min_confidence: 90,
            max_confidence: 50,
            ..BrainConfig::default()
        };
        assert!(matches!(config.check(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_fallback_outside_band_rejected() {
        let config = BrainConfig {
            fallback_confidence: 30,
            ..BrainConfig::default()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn test_fusion_mode_parsing() {
        assert_eq!(
            "rule_override".parse::<FusionMode>().unwrap(),
            FusionMode::RuleOverride
        );
        assert_eq!(
            "Weighted".parse::<FusionMode>().unwrap(),
            FusionMode::WeightedVote
        );
        assert!("majority".parse::<FusionMode>().is_err());
    }
}
