use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::error::AppError;

/// The closed business taxonomy every journal entry is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BusinessCategory {
    Growth,
    Challenge,
    Achievement,
    Planning,
    Learning,
    Research,
}

impl BusinessCategory {
    /// All categories, in declaration order.
    pub const ALL: [BusinessCategory; 6] = [
        BusinessCategory::Growth,
        BusinessCategory::Challenge,
        BusinessCategory::Achievement,
        BusinessCategory::Planning,
        BusinessCategory::Learning,
        BusinessCategory::Research,
    ];

    /// Returns the display label for the category
    pub fn label(&self) -> &'static str {
        match self {
            BusinessCategory::Growth => "Growth",
            BusinessCategory::Challenge => "Challenge",
            BusinessCategory::Achievement => "Achievement",
            BusinessCategory::Planning => "Planning",
            BusinessCategory::Learning => "Learning",
            BusinessCategory::Research => "Research",
        }
    }
}

impl fmt::Display for BusinessCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for BusinessCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        BusinessCategory::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::Validation(format!("Unknown business category: {}", s)))
    }
}

/// Energy level expressed by an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Energy {
    High,
    Medium,
    Low,
}

impl Energy {
    pub fn label(&self) -> &'static str {
        match self {
            Energy::High => "high",
            Energy::Medium => "medium",
            Energy::Low => "low",
        }
    }
}

impl fmt::Display for Energy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Energy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Energy::High),
            "medium" => Ok(Energy::Medium),
            "low" => Ok(Energy::Low),
            _ => Err(AppError::Validation(format!("Unknown energy level: {}", s))),
        }
    }
}

/// Coarse sentiment direction of a mood label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoodPolarity {
    Positive,
    Negative,
    Neutral,
}

/// Which part of a prediction the user disputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    CategoryCorrection,
    MoodCorrection,
    Both,
}

impl FeedbackType {
    /// Derives the feedback type from what the user actually edited.
    ///
    /// Returns `None` when neither the category nor the mood changed.
    pub fn from_changes(category_changed: bool, mood_changed: bool) -> Option<Self> {
        match (category_changed, mood_changed) {
            (true, true) => Some(FeedbackType::Both),
            (true, false) => Some(FeedbackType::CategoryCorrection),
            (false, true) => Some(FeedbackType::MoodCorrection),
            (false, false) => None,
        }
    }

    pub fn overrides_category(&self) -> bool {
        !matches!(self, FeedbackType::MoodCorrection)
    }

    pub fn overrides_mood(&self) -> bool {
        !matches!(self, FeedbackType::CategoryCorrection)
    }
}

/// A labeled corpus entry used for nearest-neighbor retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TrainingExample {
    /// Unique identifier across the corpus.
    #[validate(length(min = 1))]
    pub id: String,
    /// Dataset revision of this example, starting at 1.
    #[validate(range(min = 1))]
    pub version: u32,
    /// The journal text.
    #[validate(length(min = 1))]
    pub text: String,
    /// The category this text should be classified into.
    pub expected_category: BusinessCategory,
    /// The mood label a reviewer assigned.
    #[validate(length(min = 1))]
    pub expected_mood: String,
    /// The energy level a reviewer assigned.
    pub expected_energy: Energy,
    /// Acceptable confidence band, `(low, high)` on a 0-100 scale.
    pub confidence_range: (u8, u8),
    /// Free-text annotation describing the business situation.
    #[serde(default)]
    pub business_context: String,
    /// Provenance tag.
    #[serde(default)]
    pub source: String,
}

/// A user's correction of a previously shown classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UserFeedback {
    /// The journal entry the correction applies to.
    #[validate(length(min = 1))]
    pub entry_id: String,
    pub original_category: BusinessCategory,
    pub corrected_category: BusinessCategory,
    pub original_mood: String,
    pub corrected_mood: String,
    /// The text of the journal entry at the time of the correction.
    #[validate(length(min = 1))]
    pub text_content: String,
    #[validate(length(min = 1))]
    pub user_id: String,
    /// When the correction was made (RFC 3339, UTC).
    pub timestamp: DateTime<Utc>,
    pub feedback_type: FeedbackType,
}

/// Output of an optional external inference collaborator, passed in by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UpstreamAnalysis {
    #[serde(default)]
    pub business_category: Option<BusinessCategory>,
    #[serde(default)]
    pub primary_mood: Option<String>,
    /// Upstream confidence on a 0-100 scale.
    #[serde(default)]
    pub confidence: u8,
}

/// The classification returned for a journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Concrete mood label (e.g. "Excited", "Worried").
    pub primary_mood: String,
    /// Winning business category.
    pub business_category: BusinessCategory,
    /// Calibrated confidence (0 - 100).
    pub confidence: u8,
    /// Energy level.
    pub energy: Energy,
    /// Polarity of `primary_mood`.
    pub mood_polarity: MoodPolarity,
    /// Identifier of the rule that fired, if any (at most one).
    pub rules_matched: Vec<String>,
    /// Cosine similarity of the deciding neighbor (0.0 - 1.0).
    pub similarity_score: f64,
    /// Contrast deduction applied (0.0 - 1.0).
    pub contrast_penalty: f64,
    /// Whether the user's own corrections changed this result.
    pub user_learned: bool,
    /// Short explanation of which signals decided the result.
    pub rationale: String,
    /// Version of the pipeline that produced the result.
    pub pipeline_version: String,
}

impl AnalysisResult {
    /// The designed output when neither a rule nor a corpus neighbor applies.
    pub fn fallback(confidence: u8, rationale: &str, pipeline_version: &str) -> Self {
        Self {
            primary_mood: "Thoughtful".to_string(),
            business_category: BusinessCategory::Learning,
            confidence,
            energy: Energy::Medium,
            mood_polarity: MoodPolarity::Neutral,
            rules_matched: vec![],
            similarity_score: 0.0,
            contrast_penalty: 0.0,
            user_learned: false,
            rationale: rationale.to_string(),
            pipeline_version: pipeline_version.to_string(),
        }
    }

    /// Get a summary for logging
    pub fn summary(&self) -> String {
        format!(
            "Category: {} ({}%), Mood: {} ({:?}), Energy: {}, Rules: {:?}, Similarity: {:.2}, Learned: {}",
            self.business_category,
            self.confidence,
            self.primary_mood,
            self.mood_polarity,
            self.energy,
            self.rules_matched,
            self.similarity_score,
            if self.user_learned { "yes" } else { "no" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parsing_is_case_insensitive() {
        assert_eq!(
            "growth".parse::<BusinessCategory>().unwrap(),
            BusinessCategory::Growth
        );
        assert_eq!(
            " RESEARCH ".parse::<BusinessCategory>().unwrap(),
            BusinessCategory::Research
        );
        assert!("Marketing".parse::<BusinessCategory>().is_err());
    }

    #[test]
    fn test_enum_wire_format() {
        assert_eq!(
            serde_json::to_string(&BusinessCategory::Achievement).unwrap(),
            "\"Achievement\""
        );
        assert_eq!(serde_json::to_string(&Energy::High).unwrap(), "\"high\"");
        assert_eq!(
            serde_json::to_string(&FeedbackType::CategoryCorrection).unwrap(),
            "\"category_correction\""
        );
        assert!(serde_json::from_str::<Energy>("\"extreme\"").is_err());
    }

    #[test]
    fn test_feedback_type_from_changes() {
        assert_eq!(FeedbackType::from_changes(true, true), Some(FeedbackType::Both));
        assert_eq!(
            FeedbackType::from_changes(true, false),
            Some(FeedbackType::CategoryCorrection)
        );
        assert_eq!(
            FeedbackType::from_changes(false, true),
            Some(FeedbackType::MoodCorrection)
        );
        assert_eq!(FeedbackType::from_changes(false, false), None);

        assert!(FeedbackType::CategoryCorrection.overrides_category());
        assert!(!FeedbackType::CategoryCorrection.overrides_mood());
        assert!(!FeedbackType::MoodCorrection.overrides_category());
        assert!(FeedbackType::Both.overrides_mood());
    }

    #[test]
    fn test_fallback_shape() {
        let result = AnalysisResult::fallback(45, "no pattern detected", "pulse-v3");
        assert_eq!(result.business_category, BusinessCategory::Learning);
        assert_eq!(result.primary_mood, "Thoughtful");
        assert_eq!(result.energy, Energy::Medium);
        assert_eq!(result.confidence, 45);
        assert!(result.rules_matched.is_empty());
        assert!(!result.user_learned);
        assert!(result.summary().contains("Category: Learning"));
    }

    #[test]
    fn test_feedback_timestamp_is_iso8601() {
        let feedback = UserFeedback {
            entry_id: "e1".to_string(),
            original_category: BusinessCategory::Learning,
            corrected_category: BusinessCategory::Growth,
            original_mood: "Thoughtful".to_string(),
            corrected_mood: "Excited".to_string(),
            text_content: "text".to_string(),
            user_id: "u1".to_string(),
            timestamp: "2026-03-01T09:30:00Z".parse().unwrap(),
            feedback_type: FeedbackType::Both,
        };
        let json = serde_json::to_string(&feedback).unwrap();
        assert!(json.contains("\"timestamp\":\"2026-03-01T09:30:00Z\""));
        let back: UserFeedback = serde_json::from_str(&json).unwrap();
        assert_eq!(back, feedback);
    }
}
