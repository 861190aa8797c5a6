//! # Brain Module
//!
//! Deterministic, non-LLM classification of business journal entries.
//!
//! ## Components
//! - `vectorizer`: TF-IDF term vectors with business-term boosts
//! - `corpus`: nearest labeled example by cosine similarity
//! - `rules`: first-match business pattern rules (fast path)
//! - `fusion`: signal fusion and confidence calibration
//! - `mood`: mood polarity and energy inference
//! - `feedback`: per-user learning from corrections
//! - `analyzer`: Main orchestrator

pub mod analyzer;
pub mod corpus;
pub mod feedback;
pub mod fusion;
pub mod mood;
pub mod rules;
pub mod vectorizer;

// Re-export main types for convenience
pub use analyzer::BrainAnalyzer;
pub use corpus::{CorpusBuilder, CorpusIndex, CorpusMatch};
pub use feedback::{FeedbackLearner, FeedbackStats};
pub use fusion::{contrast_penalty, Calibrator};
pub use mood::{infer_energy, polarity_of};
pub use rules::{Rule, RuleEngine};
pub use vectorizer::{cosine_similarity, TermVector, Vectorizer};
