//! Per-user learning from explicit corrections.
//!
//! Corrections live in a bounded ring buffer shared by all users. When a new
//! entry is close enough to text the same user corrected before, the earlier
//! correction overrides the pipeline's draft.

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};
use validator::Validate;

use crate::brain::fusion::contrast_penalty;
use crate::brain::mood::{canonical_mood, polarity_of};
use crate::brain::vectorizer::{cosine_similarity, TermVector, Vectorizer};
use crate::config::BrainConfig;
use crate::error::AppError;
use crate::models::{AnalysisResult, BusinessCategory, FeedbackType, UserFeedback};
use crate::persistence::PersistenceHandle;
use crate::store::KeyValueStore;

/// Correction history shared between the learner and the persistence writer.
pub type FeedbackBuffer = Arc<RwLock<VecDeque<UserFeedback>>>;

fn read_buffer(buffer: &FeedbackBuffer) -> RwLockReadGuard<'_, VecDeque<UserFeedback>> {
    buffer.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_buffer(buffer: &FeedbackBuffer) -> RwLockWriteGuard<'_, VecDeque<UserFeedback>> {
    buffer.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Copy of the whole buffer, oldest first.
pub fn snapshot_of(buffer: &FeedbackBuffer) -> Vec<UserFeedback> {
    read_buffer(buffer).iter().cloned().collect()
}

/// Aggregate view of one user's corrections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FeedbackStats {
    pub total: usize,
    pub category_corrections: usize,
    pub mood_corrections: usize,
    pub both: usize,
    /// Category users most often corrected *to*.
    pub top_corrected_category: Option<BusinessCategory>,
}

/// Bounded correction store with similarity-based recall
pub struct FeedbackLearner {
    buffer: FeedbackBuffer,
    capacity: usize,
    per_user_window: usize,
    threshold: f64,
    /// Confidence band shared with the calibrator
    band: (u8, u8),
    store_key: String,
    store: Option<Arc<dyn KeyValueStore>>,
    /// Set once the stored history has been merged in. Writes are held until then.
    hydrated: Arc<AtomicBool>,
    writer: Option<PersistenceHandle>,
    /// Vectors of corrected texts. Valid because the corpus vectorizer never changes.
    vectors: Mutex<LruCache<String, Arc<TermVector>>>,
}

impl FeedbackLearner {
    /// Creates a learner, spawning the persistence writer when a store is given.
    pub fn new(config: &BrainConfig, store: Option<Arc<dyn KeyValueStore>>) -> Self {
        let buffer: FeedbackBuffer = Arc::new(RwLock::new(VecDeque::new()));
        let hydrated = Arc::new(AtomicBool::new(store.is_none()));

        let writer = match &store {
            Some(store) => {
                let handle = PersistenceHandle::spawn(
                    Arc::clone(store),
                    config.store_key.clone(),
                    Arc::clone(&buffer),
                    Arc::clone(&hydrated),
                );
                if handle.is_none() {
                    warn!("No tokio runtime available, feedback will only be written on flush");
                }
                handle
            }
            None => {
                info!("No feedback store configured, corrections are kept in memory only");
                None
            }
        };

        let cache_size = NonZeroUsize::new(config.vector_cache_size).unwrap_or(NonZeroUsize::MIN);

        Self {
            buffer,
            capacity: config.feedback_capacity,
            per_user_window: config.per_user_window,
            threshold: config.feedback_threshold,
            band: (config.min_confidence, config.max_confidence),
            store_key: config.store_key.clone(),
            store,
            hydrated,
            writer,
            vectors: Mutex::new(LruCache::new(cache_size)),
        }
    }

    pub fn len(&self) -> usize {
        read_buffer(&self.buffer).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every stored correction, oldest first.
    pub fn snapshot(&self) -> Vec<UserFeedback> {
        snapshot_of(&self.buffer)
    }

    /// Validates and stores a correction, evicting the oldest when full.
    pub fn record(&self, feedback: UserFeedback) -> Result<(), AppError> {
        check_feedback(&feedback)?;

        {
            let mut buffer = write_buffer(&self.buffer);
            buffer.push_back(feedback);
            while buffer.len() > self.capacity {
                buffer.pop_front();
            }
        }

        if let Some(writer) = &self.writer {
            writer.notify();
        }
        Ok(())
    }

    /// Whether the stored history has been merged into the buffer.
    pub fn is_hydrated(&self) -> bool {
        self.hydrated.load(Ordering::Acquire)
    }

    /// Hydrates the buffer from the store. Returns how many entries were loaded.
    ///
    /// Never fails: a missing key means no history, anything else is logged.
    /// Only the first successful call merges; later calls return 0.
    pub async fn load(&self) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };
        if self.is_hydrated() {
            debug!("Stored feedback already loaded");
            return 0;
        }

        let mut stored: Vec<UserFeedback> = match store.get(&self.store_key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(stored) => stored,
                Err(e) => {
                    warn!("Stored feedback is unreadable, starting empty: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => {
                info!("No stored feedback under {}", self.store_key);
                Vec::new()
            }
            Err(e) => {
                // the stored history may still exist, so keep writes on hold
                warn!("Failed to read stored feedback: {}", e);
                return 0;
            }
        };
        if stored.len() > self.capacity {
            stored.drain(..stored.len() - self.capacity);
        }
        let loaded = stored.len();

        let pending = {
            let mut buffer = write_buffer(&self.buffer);
            if self.hydrated.swap(true, Ordering::AcqRel) {
                return 0;
            }
            // anything recorded before hydration is newer than the stored history
            let mut recent: Vec<UserFeedback> = buffer.drain(..).collect();
            recent.retain(|f| !stored.contains(f));
            let pending = recent.len();
            buffer.extend(stored);
            buffer.extend(recent);
            while buffer.len() > self.capacity {
                buffer.pop_front();
            }
            pending
        };

        if pending > 0 {
            if let Some(writer) = &self.writer {
                writer.notify();
            }
        }
        info!("Loaded {} feedback entries", loaded);
        loaded
    }

    /// Waits until the store reflects the current buffer.
    ///
    /// Hydrates first when nothing was loaded yet, so a flush never replaces
    /// history it has not seen.
    pub async fn flush(&self) -> Result<(), AppError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        if !self.is_hydrated() {
            self.load().await;
            if !self.is_hydrated() {
                return Err(AppError::Persistence(
                    "Stored feedback could not be read, write held back".to_string(),
                ));
            }
        }

        match &self.writer {
            Some(writer) => writer.flush().await,
            None => {
                let bytes = serde_json::to_vec(&self.snapshot())
                    .map_err(|e| AppError::Persistence(format!("Failed to encode feedback: {}", e)))?;
                store.set(&self.store_key, bytes).await
            }
        }
    }

    /// Applies the user's most similar past correction to `draft`, if any is close enough.
    pub fn adjust(
        &self,
        text: &str,
        draft: AnalysisResult,
        user_id: &str,
        vectorizer: &Vectorizer,
    ) -> AnalysisResult {
        let history: Vec<UserFeedback> = read_buffer(&self.buffer)
            .iter()
            .rev()
            .filter(|f| f.user_id == user_id)
            .take(self.per_user_window)
            .cloned()
            .collect();
        if history.is_empty() {
            return draft;
        }

        let query = vectorizer.vectorize(text);
        if query.is_empty() {
            return draft;
        }

        // newest first, strict comparison keeps the most recent on ties
        let mut best: Option<(&UserFeedback, f64)> = None;
        for feedback in &history {
            let vector = self.vector_for(&feedback.text_content, vectorizer);
            let similarity = cosine_similarity(&query, &vector);
            if best.map_or(true, |(_, s)| similarity > s) {
                best = Some((feedback, similarity));
            }
        }

        let Some((feedback, similarity)) = best else {
            return draft;
        };
        if similarity < self.threshold {
            return draft;
        }

        debug!(
            entry_id = %feedback.entry_id,
            similarity,
            "Applying learned correction"
        );
        apply_correction(draft, feedback, similarity, text, self.band)
    }

    /// Correction statistics for one user
    pub fn stats(&self, user_id: &str) -> FeedbackStats {
        let buffer = read_buffer(&self.buffer);
        let mut stats = FeedbackStats::default();
        let mut corrected_to = [0usize; BusinessCategory::ALL.len()];

        for feedback in buffer.iter().filter(|f| f.user_id == user_id) {
            stats.total += 1;
            match feedback.feedback_type {
                FeedbackType::CategoryCorrection => stats.category_corrections += 1,
                FeedbackType::MoodCorrection => stats.mood_corrections += 1,
                FeedbackType::Both => stats.both += 1,
            }
            if feedback.feedback_type.overrides_category() {
                if let Some(slot) = BusinessCategory::ALL
                    .iter()
                    .position(|c| *c == feedback.corrected_category)
                {
                    corrected_to[slot] += 1;
                }
            }
        }

        let mut top: Option<(BusinessCategory, usize)> = None;
        for (category, count) in BusinessCategory::ALL.iter().zip(corrected_to) {
            if count > 0 && top.map_or(true, |(_, best)| count > best) {
                top = Some((*category, count));
            }
        }
        stats.top_corrected_category = top.map(|(c, _)| c);
        stats
    }

    fn vector_for(&self, text: &str, vectorizer: &Vectorizer) -> Arc<TermVector> {
        let mut cache = self
            .vectors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(vector) = cache.get(text) {
            return Arc::clone(vector);
        }
        let vector = Arc::new(vectorizer.vectorize(text));
        cache.put(text.to_string(), Arc::clone(&vector));
        vector
    }
}

fn check_feedback(feedback: &UserFeedback) -> Result<(), AppError> {
    feedback.validate()?;

    for (field, value) in [
        ("entry_id", &feedback.entry_id),
        ("user_id", &feedback.user_id),
        ("text_content", &feedback.text_content),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{} must not be blank", field)));
        }
    }
    if feedback.feedback_type.overrides_mood() && feedback.corrected_mood.trim().is_empty() {
        return Err(AppError::Validation(
            "corrected_mood must not be blank for a mood correction".to_string(),
        ));
    }
    Ok(())
}

fn apply_correction(
    mut result: AnalysisResult,
    feedback: &UserFeedback,
    similarity: f64,
    text: &str,
    (min, max): (u8, u8),
) -> AnalysisResult {
    if feedback.feedback_type.overrides_category() {
        result.business_category = feedback.corrected_category;
    }
    if feedback.feedback_type.overrides_mood() {
        result.primary_mood = canonical_mood(&feedback.corrected_mood);
        result.mood_polarity = polarity_of(&result.primary_mood);
    }

    let raw = result.confidence as i64 + (similarity * 20.0).round() as i64
        - (contrast_penalty(text) * 100.0).round() as i64;
    result.confidence = raw.clamp(min as i64, max as i64) as u8;
    result.similarity_score = similarity;
    result.user_learned = true;
    result.rationale = format!(
        "{}; learned from correction {} ({:.2})",
        result.rationale, feedback.entry_id, similarity
    );
    result
}
