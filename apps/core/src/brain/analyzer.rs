//! Brain Analyzer - Main orchestrator for journal entry classification.
//!
//! Pipeline per entry:
//! 1. First matching business rule (fast regex path)
//! 2. Nearest labeled corpus example (TF-IDF cosine)
//! 3. Fusion into a calibrated draft
//! 4. Per-user corrections from the feedback store

use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::corpus::CorpusIndex;
use super::feedback::{FeedbackLearner, FeedbackStats};
use super::fusion::Calibrator;
use super::rules::RuleEngine;
use crate::config::BrainConfig;
use crate::dataset::{self, validate_corpus};
use crate::error::AppError;
use crate::models::{AnalysisResult, TrainingExample, UpstreamAnalysis, UserFeedback};
use crate::store::KeyValueStore;

pub const DEGRADED_RATIONALE: &str = "degraded analysis";

/// Main analyzer that orchestrates all classification components
pub struct BrainAnalyzer {
    config: BrainConfig,
    rules: RuleEngine,
    examples: Vec<TrainingExample>,
    /// Built on first use, read-only afterwards
    index: OnceLock<CorpusIndex>,
    feedback: FeedbackLearner,
}

impl BrainAnalyzer {
    /// Create an analyzer over a validated corpus.
    ///
    /// An invalid configuration or corpus is refused here, so a constructed
    /// analyzer can always serve.
    pub fn new(
        config: BrainConfig,
        examples: Vec<TrainingExample>,
        store: Option<Arc<dyn KeyValueStore>>,
    ) -> Result<Self, AppError> {
        config.check()?;
        validate_corpus(&examples)?;

        let feedback = FeedbackLearner::new(&config, store);
        info!(
            "Brain analyzer ready: {} training examples, pipeline {}",
            examples.len(),
            config.pipeline_version
        );

        Ok(Self {
            config,
            rules: RuleEngine::new(),
            examples,
            index: OnceLock::new(),
            feedback,
        })
    }

    /// Create an analyzer over the embedded curated corpus
    pub fn with_default_corpus(
        config: BrainConfig,
        store: Option<Arc<dyn KeyValueStore>>,
    ) -> Result<Self, AppError> {
        Self::new(config, dataset::default_corpus()?, store)
    }

    /// Replace the built-in business rules
    pub fn with_rules(mut self, rules: RuleEngine) -> Self {
        self.rules = rules;
        self
    }

    pub fn config(&self) -> &BrainConfig {
        &self.config
    }

    /// Get or build the corpus index
    fn index(&self) -> &CorpusIndex {
        self.index.get_or_init(|| {
            let start = Instant::now();
            let index = CorpusIndex::build(&self.examples, self.config.similarity_threshold);
            info!(
                "Corpus index built: {} documents, {} terms in {:?}",
                index.len(),
                index.vectorizer().vocabulary_size(),
                start.elapsed()
            );
            index
        })
    }

    /// Build the corpus index now instead of on the first request.
    ///
    /// Returns the number of indexed examples.
    pub fn warm_up(&self) -> usize {
        self.index().len()
    }

    /// Classify one journal entry for a user.
    ///
    /// Always returns a well-formed result; internal faults degrade to a
    /// low-confidence Learning result.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub fn classify_entry(&self, text: &str, user_id: &str) -> AnalysisResult {
        match self.try_classify(text, user_id) {
            Ok(result) => {
                debug!("{}", result.summary());
                result
            }
            Err(e) => {
                warn!("Classification degraded: {}", e);
                AnalysisResult::fallback(
                    self.config.degraded_confidence,
                    DEGRADED_RATIONALE,
                    &self.config.pipeline_version,
                )
            }
        }
    }

    fn try_classify(&self, text: &str, user_id: &str) -> Result<AnalysisResult, AppError> {
        let index = self.index();
        let draft = Calibrator::new(&self.config).classify(text, &self.rules, index)?;
        Ok(self.feedback.adjust(text, draft, user_id, index.vectorizer()))
    }

    /// Classify and cross-check against an external model's verdict.
    ///
    /// The core's own category always stands; agreement or disagreement
    /// only moves the confidence.
    pub fn classify_with_upstream(
        &self,
        text: &str,
        user_id: &str,
        upstream: &UpstreamAnalysis,
    ) -> AnalysisResult {
        let mut result = self.classify_entry(text, user_id);
        let Some(category) = upstream.business_category else {
            return result;
        };

        let raw = result.confidence as i64;
        let (raw, verdict) = if category == result.business_category {
            (raw + self.config.upstream_agreement_bonus as i64, "agrees")
        } else {
            (raw - self.config.upstream_disagreement_penalty as i64, "disagrees")
        };
        result.confidence = self.config.clamp_confidence(raw);
        result.rationale = format!(
            "{}; upstream {} ({} at {}%)",
            result.rationale, verdict, category, upstream.confidence
        );
        result
    }

    /// Record a user's correction of an earlier classification
    #[instrument(skip(self, feedback), fields(user_id = %feedback.user_id, entry_id = %feedback.entry_id))]
    pub fn submit_feedback(&self, feedback: UserFeedback) -> Result<(), AppError> {
        self.feedback.record(feedback)?;
        info!("Feedback recorded");
        Ok(())
    }

    /// Restore stored corrections; returns how many were loaded
    pub async fn load_feedback(&self) -> usize {
        self.feedback.load().await
    }

    /// Wait until stored corrections match memory
    pub async fn flush_feedback(&self) -> Result<(), AppError> {
        self.feedback.flush().await
    }

    pub fn learning_stats(&self, user_id: &str) -> FeedbackStats {
        self.feedback.stats(user_id)
    }

    pub fn feedback(&self) -> &FeedbackLearner {
        &self.feedback
    }
}
