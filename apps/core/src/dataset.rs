//! Training corpus loading and validation.

use std::collections::HashSet;
use std::path::Path;
use tracing::info;
use validator::Validate;

use crate::error::{AppError, DatasetError};
use crate::models::TrainingExample;

/// Curated corpus shipped with the crate.
const DEFAULT_CORPUS: &str = include_str!("../data/training_corpus.json");

/// The embedded curated corpus, validated.
pub fn default_corpus() -> Result<Vec<TrainingExample>, AppError> {
    load_corpus_from_json(DEFAULT_CORPUS)
}

/// Decode a JSON array of examples and validate it.
pub fn load_corpus_from_json(json: &str) -> Result<Vec<TrainingExample>, AppError> {
    let examples: Vec<TrainingExample> =
        serde_json::from_str(json).map_err(|e| DatasetError::Malformed(e.to_string()))?;
    validate_corpus(&examples)?;
    Ok(examples)
}

/// Read a corpus file from disk.
pub async fn load_corpus_from_path(path: impl AsRef<Path>) -> Result<Vec<TrainingExample>, AppError> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path).await?;
    let examples = load_corpus_from_json(&json)?;
    info!("Loaded {} training examples from {}", examples.len(), path.display());
    Ok(examples)
}

/// Checks every corpus invariant; the first violation wins.
pub fn validate_corpus(examples: &[TrainingExample]) -> Result<(), DatasetError> {
    if examples.is_empty() {
        return Err(DatasetError::EmptyCorpus);
    }

    let mut seen = HashSet::new();
    for example in examples {
        let invalid = |reason: String| DatasetError::InvalidField {
            id: example.id.clone(),
            reason,
        };

        example.validate().map_err(|e| invalid(e.to_string()))?;
        if example.id.trim().is_empty() {
            return Err(invalid("id is blank".to_string()));
        }
        if example.text.trim().is_empty() {
            return Err(invalid("text is blank".to_string()));
        }
        if example.expected_mood.trim().is_empty() {
            return Err(invalid("expected_mood is blank".to_string()));
        }
        let (low, high) = example.confidence_range;
        if low > high || high > 100 {
            return Err(invalid(format!(
                "confidence_range ({}, {}) must satisfy low <= high <= 100",
                low, high
            )));
        }
        if !seen.insert(example.id.as_str()) {
            return Err(DatasetError::DuplicateId(example.id.clone()));
        }
    }
    Ok(())
}
