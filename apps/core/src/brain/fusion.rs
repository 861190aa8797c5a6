//! Signal fusion and confidence calibration.
//!
//! Combines the first matching rule and the best corpus neighbor into one
//! draft [`AnalysisResult`], before any user-specific learning is applied.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::brain::corpus::{CorpusIndex, CorpusMatch};
use crate::brain::mood::{canonical_mood, infer_energy, mood_label, polarity_of};
use crate::brain::rules::{Rule, RuleEngine};
use crate::config::{BrainConfig, FusionMode};
use crate::error::AppError;
use crate::models::{AnalysisResult, BusinessCategory, MoodPolarity};

static CONTRAST_CONNECTIVES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:on the other hand|even though|however|although|nevertheless|nonetheless|whereas|despite|though|but)\b")
        .expect("Invalid regex: contrast connectives")
});

const CONTRAST_STEP: f64 = 0.08;
const CONTRAST_CAP: f64 = 0.24;

pub const NO_PATTERN_RATIONALE: &str = "no pattern detected";

/// Deduction for hedged or mixed entries: `min(0.24, 0.08 x connectives)`.
pub fn contrast_penalty(text: &str) -> f64 {
    let count = CONTRAST_CONNECTIVES.find_iter(text).count() as f64;
    (CONTRAST_STEP * count).min(CONTRAST_CAP)
}

/// Per-category votes, in insertion order
#[derive(Debug, Default)]
struct ScoreTable {
    scores: Vec<(BusinessCategory, f64)>,
}

impl ScoreTable {
    fn add(&mut self, category: BusinessCategory, weight: f64) {
        match self.scores.iter_mut().find(|(c, _)| *c == category) {
            Some((_, score)) => *score += weight,
            None => self.scores.push((category, weight)),
        }
    }

    /// Winner and margin over the runner-up.
    ///
    /// The first inserted category wins ties, so the rule is inserted first.
    fn winner(&self) -> Option<(BusinessCategory, f64)> {
        let mut winner: Option<(BusinessCategory, f64)> = None;
        for &(category, score) in &self.scores {
            if winner.map_or(true, |(_, best)| score > best) {
                winner = Some((category, score));
            }
        }
        let (category, top) = winner?;
        let runner_up = self
            .scores
            .iter()
            .filter(|(c, _)| *c != category)
            .map(|(_, s)| *s)
            .fold(0.0_f64, f64::max);
        Some((category, top - runner_up))
    }
}

/// Turns rule and neighbor signals into a calibrated draft
pub struct Calibrator<'a> {
    config: &'a BrainConfig,
}

impl<'a> Calibrator<'a> {
    pub fn new(config: &'a BrainConfig) -> Self {
        Self { config }
    }

    /// Collect both signals for `text` and fuse them
    pub fn classify(
        &self,
        text: &str,
        rules: &RuleEngine,
        index: &CorpusIndex,
    ) -> Result<AnalysisResult, AppError> {
        let rule = rules.first_match(text);
        let neighbor = index.best_match(text);
        self.fuse(text, rule, neighbor)
    }

    /// Fuse already collected signals
    pub fn fuse(
        &self,
        text: &str,
        rule: Option<&Rule>,
        neighbor: Option<CorpusMatch<'_>>,
    ) -> Result<AnalysisResult, AppError> {
        if rule.is_none() && neighbor.is_none() {
            return Ok(AnalysisResult::fallback(
                self.config.fallback_confidence,
                NO_PATTERN_RATIONALE,
                &self.config.pipeline_version,
            ));
        }

        let similarity = neighbor.map_or(0.0, |n| n.similarity);
        if !similarity.is_finite() {
            return Err(AppError::Internal(format!(
                "Non-finite neighbor similarity: {}",
                similarity
            )));
        }

        // In override mode a rule silences the neighbor for every decision
        let voting_neighbor = match (self.config.fusion_mode, rule) {
            (FusionMode::RuleOverride, Some(_)) => None,
            _ => neighbor,
        };

        let mut table = ScoreTable::default();
        if let Some(rule) = rule {
            table.add(rule.category, self.config.rule_weight);
        }
        if let Some(n) = voting_neighbor {
            table.add(n.example.expected_category, n.similarity);
        }
        let (category, margin) = table
            .winner()
            .ok_or_else(|| AppError::Internal("Empty score table".to_string()))?;
        if !margin.is_finite() {
            return Err(AppError::Internal(format!("Non-finite margin: {}", margin)));
        }

        let contrast = contrast_penalty(text);
        let mut raw = 60 + ((margin * 25.0).round() as i64).min(30);
        if let Some(rule) = rule {
            raw += rule.confidence_boost as i64;
        }
        raw -= (contrast * 100.0).round() as i64;
        if text.trim().chars().count() < self.config.short_entry_chars {
            raw -= self.config.short_entry_penalty as i64;
        }
        let confidence = self.config.clamp_confidence(raw);

        let energy = rule
            .and_then(|r| r.energy)
            .or_else(|| voting_neighbor.map(|n| n.example.expected_energy))
            .unwrap_or_else(|| infer_energy(text));

        let (primary_mood, mood_polarity) = match (rule.and_then(|r| r.mood_polarity), voting_neighbor) {
            (Some(polarity), _) => (mood_label(polarity, energy, category).to_string(), polarity),
            (None, Some(n)) => {
                let mood = canonical_mood(&n.example.expected_mood);
                let polarity = polarity_of(&mood);
                (mood, polarity)
            }
            (None, None) => ("Thoughtful".to_string(), MoodPolarity::Neutral),
        };

        let rationale = rationale(rule, neighbor, category, margin);
        debug!(
            category = %category,
            confidence,
            margin,
            contrast,
            "Fused classification signals"
        );

        Ok(AnalysisResult {
            primary_mood,
            business_category: category,
            confidence,
            energy,
            mood_polarity,
            rules_matched: rule.map(|r| vec![r.id.clone()]).unwrap_or_default(),
            similarity_score: similarity,
            contrast_penalty: contrast,
            user_learned: false,
            rationale,
            pipeline_version: self.config.pipeline_version.clone(),
        })
    }
}

fn rationale(
    rule: Option<&Rule>,
    neighbor: Option<CorpusMatch<'_>>,
    winner: BusinessCategory,
    margin: f64,
) -> String {
    let mut parts = Vec::new();
    if let Some(rule) = rule {
        parts.push(format!("rule {} ({})", rule.id, rule.category));
    }
    if let Some(n) = neighbor {
        parts.push(format!(
            "neighbor {} ({}, {:.2})",
            n.example.id, n.example.expected_category, n.similarity
        ));
    }
    format!("{}; {} by margin {:.2}", parts.join(" + "), winner, margin)
}
