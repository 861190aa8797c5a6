//! Mood polarity lookup and energy inference.
//!
//! Fine-grained mood labels map to a coarse polarity through a static table,
//! and energy is read from linguistic intensity markers.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{BusinessCategory, Energy, MoodPolarity};

const POSITIVE_MOODS: &[&str] = &[
    "excited",
    "proud",
    "happy",
    "confident",
    "optimistic",
    "motivated",
    "grateful",
    "energized",
    "accomplished",
    "hopeful",
    "inspired",
    "determined",
    "satisfied",
    "relieved",
    "thrilled",
    "encouraged",
    "enthusiastic",
    "content",
    "joyful",
    "elated",
];

const NEGATIVE_MOODS: &[&str] = &[
    "worried",
    "frustrated",
    "anxious",
    "stressed",
    "overwhelmed",
    "disappointed",
    "concerned",
    "discouraged",
    "exhausted",
    "nervous",
    "angry",
    "sad",
    "uncertain",
    "afraid",
    "burned out",
    "drained",
    "annoyed",
    "panicked",
];

const NEUTRAL_MOODS: &[&str] = &[
    "thoughtful",
    "curious",
    "reflective",
    "calm",
    "focused",
    "analytical",
    "contemplative",
    "neutral",
    "pragmatic",
    "steady",
];

static INTENSIFIERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(very|extremely|incredibly|super|totally|absolutely|hugely|massively|insanely|really|truly|seriously|amazingly)\b")
        .expect("Invalid regex: intensifier words")
});

static DAMPENERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(slightly|somewhat|a bit|a little|kind of|sort of|barely|mildly|fairly|marginally|moderately)\b")
        .expect("Invalid regex: dampener words")
});

/// Polarity of a mood label. Unknown labels are Neutral.
pub fn polarity_of(mood_label: &str) -> MoodPolarity {
    let label = mood_label.trim().to_lowercase();
    if POSITIVE_MOODS.contains(&label.as_str()) {
        MoodPolarity::Positive
    } else if NEGATIVE_MOODS.contains(&label.as_str()) {
        MoodPolarity::Negative
    } else {
        MoodPolarity::Neutral
    }
}

/// Trims a mood label and title-cases each word ("  burned OUT" -> "Burned Out").
pub fn canonical_mood(mood_label: &str) -> String {
    mood_label
        .split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Concrete mood label for a rule's polarity given the resolved energy and category.
pub fn mood_label(
    polarity: MoodPolarity,
    energy: Energy,
    category: BusinessCategory,
) -> &'static str {
    match (polarity, energy) {
        (MoodPolarity::Positive, Energy::High) => match category {
            BusinessCategory::Growth => "Excited",
            BusinessCategory::Achievement => "Proud",
            _ => "Motivated",
        },
        (MoodPolarity::Positive, Energy::Medium) => "Optimistic",
        (MoodPolarity::Positive, Energy::Low) => "Grateful",
        (MoodPolarity::Negative, Energy::High) => "Stressed",
        (MoodPolarity::Negative, Energy::Medium) => "Frustrated",
        (MoodPolarity::Negative, Energy::Low) => "Worried",
        (MoodPolarity::Neutral, _) => match category {
            BusinessCategory::Learning | BusinessCategory::Research => "Curious",
            BusinessCategory::Planning => "Focused",
            _ => "Thoughtful",
        },
    }
}

/// Raw intensity score: `0.6 x '!' + 0.5 x intensifiers - 0.4 x dampeners`.
pub fn intensity_score(text: &str) -> f64 {
    let exclamations = text.chars().filter(|c| *c == '!').count() as f64;
    let intensifiers = INTENSIFIERS.find_iter(text).count() as f64;
    let dampeners = DAMPENERS.find_iter(text).count() as f64;

    0.6 * exclamations + 0.5 * intensifiers - 0.4 * dampeners
}

/// Energy inferred from intensity markers when no stronger signal exists.
pub fn infer_energy(text: &str) -> Energy {
    let score = intensity_score(text);
    if score >= 0.8 {
        Energy::High
    } else if score <= -0.2 {
        Energy::Low
    } else {
        Energy::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_lookup() {
        assert_eq!(polarity_of("Excited"), MoodPolarity::Positive);
        assert_eq!(polarity_of("  worried "), MoodPolarity::Negative);
        assert_eq!(polarity_of("Burned Out"), MoodPolarity::Negative);
        assert_eq!(polarity_of("Thoughtful"), MoodPolarity::Neutral);
        assert_eq!(polarity_of("flabbergasted"), MoodPolarity::Neutral);
        assert_eq!(polarity_of(""), MoodPolarity::Neutral);
    }

    #[test]
    fn test_canonical_mood() {
        assert_eq!(canonical_mood("  burned OUT "), "Burned Out");
        assert_eq!(canonical_mood("proud"), "Proud");
        assert_eq!(canonical_mood(""), "");
    }

    #[test]
    fn test_mood_label_table() {
        use BusinessCategory::*;
        assert_eq!(mood_label(MoodPolarity::Positive, Energy::High, Growth), "Excited");
        assert_eq!(mood_label(MoodPolarity::Positive, Energy::High, Achievement), "Proud");
        assert_eq!(mood_label(MoodPolarity::Negative, Energy::Low, Challenge), "Worried");
        assert_eq!(mood_label(MoodPolarity::Negative, Energy::Medium, Challenge), "Frustrated");
        assert_eq!(mood_label(MoodPolarity::Neutral, Energy::Medium, Research), "Curious");
        assert_eq!(mood_label(MoodPolarity::Neutral, Energy::Low, Planning), "Focused");
    }

    #[test]
    fn test_energy_thresholds() {
        // 0.0
        assert_eq!(infer_energy("Met the accountant."), Energy::Medium);
        // 0.6
        assert_eq!(infer_energy("Met the accountant!"), Energy::Medium);
        // 1.2
        assert_eq!(infer_energy("We did it!!"), Energy::High);
        // 1.1
        assert_eq!(infer_energy("Extremely good call!"), Energy::High);
        // 0.5
        assert_eq!(infer_energy("A very long day."), Energy::Medium);
        // -0.4
        assert_eq!(infer_energy("Sales were slightly lower."), Energy::Low);
        // 0.1
        assert_eq!(infer_energy("Very tired, somewhat calm."), Energy::Medium);
    }

    #[test]
    fn test_multiword_dampeners() {
        assert!((intensity_score("It felt a bit slow, kind of flat") + 0.8).abs() < 1e-9);
    }
}
