//! Brain Module Tests
//!
//! End-to-end scenarios through `BrainAnalyzer` over the curated corpus,
//! plus the pipeline-wide properties every result must satisfy.

use crate::brain::corpus::CorpusIndex;
use crate::brain::BrainAnalyzer;
use crate::config::BrainConfig;
use crate::dataset;
use crate::error::{AppError, DatasetError};
use crate::models::{BusinessCategory, Energy, FeedbackType, MoodPolarity, UserFeedback};
use chrono::Utc;
use std::sync::Arc;

const SUPPLIER_DELAY: &str =
    "Supplier delayed the raw material shipment by two weeks, and now our production schedule is at risk";
const MRR_HIGH: &str =
    "We closed five new accounts this week, and our monthly recurring revenue is now at an all-time high";
const HOUSEKEEPING: &str = "Watered the ficus and tidied the bookshelf.";

fn brain() -> BrainAnalyzer {
    BrainAnalyzer::with_default_corpus(BrainConfig::default(), None)
        .expect("default corpus must be valid")
}

#[cfg(test)]
mod scenario_tests {
    use super::*;

    #[test]
    fn test_supplier_delay_is_a_challenge() {
        let result = brain().classify_entry(SUPPLIER_DELAY, "founder-1");

        assert_eq!(result.business_category, BusinessCategory::Challenge);
        assert_eq!(result.mood_polarity, MoodPolarity::Negative);
        assert!(result.confidence >= 80, "confidence {}", result.confidence);
        assert_eq!(result.rules_matched, vec!["supply_disruption".to_string()]);
        assert!(!result.user_learned);
    }

    #[test]
    fn test_record_mrr_is_growth() {
        let result = brain().classify_entry(MRR_HIGH, "founder-1");

        assert_eq!(result.business_category, BusinessCategory::Growth);
        assert_eq!(result.energy, Energy::High);
        assert!(result.confidence >= 85, "confidence {}", result.confidence);
        assert_eq!(result.primary_mood, "Excited");
        assert!(result.similarity_score > 0.22);
    }

    #[test]
    fn test_unrelated_short_entry_falls_back() {
        let result = brain().classify_entry(HOUSEKEEPING, "founder-1");

        assert_eq!(result.business_category, BusinessCategory::Learning);
        assert_eq!(result.primary_mood, "Thoughtful");
        assert_eq!(result.energy, Energy::Medium);
        assert!((40..=45).contains(&result.confidence));
        assert!(result.rules_matched.is_empty());
        assert_eq!(result.similarity_score, 0.0);
        assert_eq!(result.rationale, "no pattern detected");
    }

    #[test]
    fn test_category_correction_is_learned_per_user() {
        let brain = brain();
        let first = "Spent the afternoon reorganizing the warehouse shelving and labeling every bin";
        let later = "Reorganizing the warehouse shelving and labeling bins took the whole afternoon";

        let shown = brain.classify_entry(first, "founder-7");
        brain
            .submit_feedback(UserFeedback {
                entry_id: "entry-41".to_string(),
                original_category: shown.business_category,
                corrected_category: BusinessCategory::Planning,
                original_mood: shown.primary_mood.clone(),
                corrected_mood: "Anxious".to_string(),
                text_content: first.to_string(),
                user_id: "founder-7".to_string(),
                timestamp: Utc::now(),
                feedback_type: FeedbackType::CategoryCorrection,
            })
            .unwrap();

        let learned = brain.classify_entry(later, "founder-7");
        let other_user = brain.classify_entry(later, "founder-8");

        assert_eq!(learned.business_category, BusinessCategory::Planning);
        assert!(learned.user_learned);
        assert!(learned.similarity_score >= 0.40);
        // mood stays the pipeline's own
        assert_eq!(learned.primary_mood, other_user.primary_mood);
        assert_ne!(learned.primary_mood, "Anxious");

        assert!(!other_user.user_learned);
        assert_ne!(other_user.business_category, BusinessCategory::Planning);
    }

    #[test]
    fn test_mood_correction_keeps_category() {
        let brain = brain();
        brain
            .submit_feedback(UserFeedback {
                entry_id: "entry-9".to_string(),
                original_category: BusinessCategory::Challenge,
                corrected_category: BusinessCategory::Challenge,
                original_mood: "Worried".to_string(),
                corrected_mood: "determined".to_string(),
                text_content: SUPPLIER_DELAY.to_string(),
                user_id: "founder-2".to_string(),
                timestamp: Utc::now(),
                feedback_type: FeedbackType::MoodCorrection,
            })
            .unwrap();

        let result = brain.classify_entry(SUPPLIER_DELAY, "founder-2");
        assert_eq!(result.business_category, BusinessCategory::Challenge);
        assert_eq!(result.primary_mood, "Determined");
        assert_eq!(result.mood_polarity, MoodPolarity::Positive);
        assert!(result.user_learned);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        SUPPLIER_DELAY,
        MRR_HIGH,
        HOUSEKEEPING,
        "",
        "   ",
        "!!!???",
        "Cash flow is tight but payroll is covered, however the runway is short",
        "Interviewed six buyers about pricing; they want annual plans!!!",
        "Émotions mélangées aujourd'hui 🚀🚀",
        "We finally launched version two of the app after six months of hard work",
    ];

    #[test]
    fn test_results_are_well_formed() {
        let brain = brain();
        let long = "revenue grew ".repeat(2_000);
        for text in SAMPLES.iter().copied().chain(std::iter::once(long.as_str())) {
            let result = brain.classify_entry(text, "u1");
            assert!(
                (40..=95).contains(&result.confidence),
                "{:?} -> {}",
                text,
                result.confidence
            );
            assert!(result.rules_matched.len() <= 1);
            assert!((0.0..=1.0).contains(&result.similarity_score));
            assert!((0.0..=0.24).contains(&result.contrast_penalty));
            assert!(!result.primary_mood.is_empty());
            assert_eq!(result.pipeline_version, "pulse-v3");
        }
    }

    #[test]
    fn test_classification_is_deterministic() {
        let brain = brain();
        for text in SAMPLES {
            assert_eq!(brain.classify_entry(text, "u1"), brain.classify_entry(text, "u1"));
        }
        // a fresh analyzer builds an identical index
        assert_eq!(
            brain.classify_entry(MRR_HIGH, "u1"),
            super::brain().classify_entry(MRR_HIGH, "u1")
        );
    }

    #[test]
    fn test_every_corpus_example_is_its_own_best_match() {
        let corpus = dataset::default_corpus().unwrap();
        let index = CorpusIndex::build(&corpus, 0.22);
        for example in &corpus {
            let found = index.best_match(&example.text).expect("self match");
            assert!(
                (found.similarity - 1.0).abs() < 1e-9,
                "{} matched {} at {}",
                example.id,
                found.example.id,
                found.similarity
            );
            assert_eq!(found.example.id, example.id);
        }
    }

    #[test]
    fn test_extra_contrast_clause_never_raises_confidence() {
        let brain = brain();
        let plain = "Our cash flow is tight and payroll is due Friday, so I am chasing every overdue invoice";
        let hedged = format!("{}, but the team stays upbeat", plain);

        let a = brain.classify_entry(plain, "u1");
        let b = brain.classify_entry(&hedged, "u1");
        assert_eq!(a.rules_matched, vec!["cash_flow_pressure".to_string()]);
        assert!(b.confidence <= a.confidence, "{} > {}", b.confidence, a.confidence);
        assert!(b.contrast_penalty > a.contrast_penalty);
    }

    #[test]
    fn test_duplicate_corpus_ids_refuse_to_serve() {
        let mut corpus = dataset::default_corpus().unwrap();
        let mut copy = corpus[0].clone();
        copy.text = "A different text with the same id".to_string();
        corpus.push(copy);

        let outcome = BrainAnalyzer::new(BrainConfig::default(), corpus, None);
        assert!(matches!(
            outcome,
            Err(AppError::Dataset(DatasetError::DuplicateId(_)))
        ));
    }

    #[test]
    fn test_analyzer_is_shareable_across_threads() {
        let brain = Arc::new(brain());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let brain = Arc::clone(&brain);
                std::thread::spawn(move || {
                    let user = format!("user-{}", i);
                    for n in 0..25 {
                        brain
                            .submit_feedback(UserFeedback {
                                entry_id: format!("{}-{}", user, n),
                                original_category: BusinessCategory::Learning,
                                corrected_category: BusinessCategory::Research,
                                original_mood: "Thoughtful".to_string(),
                                corrected_mood: "Curious".to_string(),
                                text_content: format!("Benchmarked vendor number {}", n),
                                user_id: user.clone(),
                                timestamp: Utc::now(),
                                feedback_type: FeedbackType::Both,
                            })
                            .unwrap();
                        let result = brain.classify_entry(MRR_HIGH, &user);
                        assert_eq!(result.business_category, BusinessCategory::Growth);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(brain.feedback().len(), 100);
        assert_eq!(brain.learning_stats("user-2").total, 25);
    }
}
