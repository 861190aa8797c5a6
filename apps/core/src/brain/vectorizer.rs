//! TF-IDF term vectors with bigrams and business-term boosting.
//!
//! Document frequencies are learned from the training corpus through
//! [`Vectorizer::observe`]; once the corpus is loaded vectorization is pure.

use std::collections::{BTreeMap, HashMap, HashSet};

/// Weighted term map. Ordered so that dot products are summed in a fixed order.
pub type TermVector = BTreeMap<String, f64>;

/// Stopwords for English journal text
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "nor", "for", "yet", "so", "i", "you", "he", "she", "it",
    "we", "they", "me", "him", "her", "us", "them", "my", "your", "his", "its", "our", "their",
    "mine", "yours", "hers", "ours", "theirs", "this", "that", "these", "those", "who", "whom",
    "which", "what", "whose", "is", "am", "are", "was", "were", "be", "been", "being", "have",
    "has", "had", "having", "do", "does", "did", "doing", "will", "would", "shall", "should",
    "can", "could", "may", "might", "must", "in", "on", "at", "to", "from", "by", "with", "about",
    "against", "between", "into", "through", "during", "before", "after", "above", "below", "up",
    "down", "out", "off", "over", "under", "again", "further", "here", "there", "where", "when",
    "why", "how", "all", "each", "every", "both", "few", "more", "most", "other", "some", "any",
    "no", "not", "only", "own", "same", "than", "too", "very", "just", "also", "now", "then",
    "once", "always", "never", "if", "because", "as", "until", "while", "although", "though",
    "yes", "maybe", "dont", "didnt", "cant", "wont", "isnt", "wasnt", "arent", "doesnt", "ive",
    "weve", "theyre", "im", "ill", "today", "yesterday", "really", "got", "get", "went",
    "lot", "bit", "thing", "things", "even", "much", "many", "well", "like",
];

/// Business vocabulary that is rare in the corpus but highly discriminative.
const DOMAIN_BOOSTS: &[(&str, f64)] = &[
    ("cash flow", 1.6),
    ("burn rate", 1.5),
    ("recurring revenue", 1.5),
    ("market fit", 1.4),
    ("raw material", 1.4),
    ("mrr", 1.6),
    ("arr", 1.5),
    ("churn", 1.5),
    ("runway", 1.5),
    ("payroll", 1.4),
    ("revenue", 1.3),
    ("investors", 1.3),
    ("funding", 1.3),
    ("valuation", 1.3),
    ("margin", 1.3),
    ("margins", 1.3),
    ("supplier", 1.3),
    ("shipment", 1.3),
    ("inventory", 1.3),
    ("outage", 1.3),
    ("roadmap", 1.3),
    ("pricing", 1.2),
    ("customers", 1.2),
    ("competitors", 1.2),
];

/// TF-IDF vectorizer backed by corpus document frequencies
#[derive(Debug, Clone)]
pub struct Vectorizer {
    stopwords: HashSet<&'static str>,
    domain_boosts: HashMap<&'static str, f64>,
    /// Tokens must be strictly longer than this many characters
    max_dropped_len: usize,
    documents: usize,
    document_frequency: HashMap<String, usize>,
}

impl Default for Vectorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Vectorizer {
    /// Create a vectorizer with no observed documents
    pub fn new() -> Self {
        Self {
            stopwords: STOPWORDS.iter().copied().collect(),
            domain_boosts: DOMAIN_BOOSTS.iter().copied().collect(),
            max_dropped_len: 2,
            documents: 0,
            document_frequency: HashMap::new(),
        }
    }

    /// Number of documents registered through [`Vectorizer::observe`]
    pub fn document_count(&self) -> usize {
        self.documents
    }

    /// Number of distinct terms seen across the observed documents
    pub fn vocabulary_size(&self) -> usize {
        self.document_frequency.len()
    }

    /// Lowercase, strip punctuation, split and drop stopwords and short tokens
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let cleaned: String = text
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();

        cleaned
            .split_whitespace()
            .filter(|word| {
                word.chars().count() > self.max_dropped_len && !self.stopwords.contains(*word)
            })
            .map(|s| s.to_string())
            .collect()
    }

    /// Unigrams followed by adjacent-pair bigrams
    pub fn terms(&self, text: &str) -> Vec<String> {
        let tokens = self.tokenize(text);
        let bigrams: Vec<String> = tokens
            .windows(2)
            .map(|pair| format!("{} {}", pair[0], pair[1]))
            .collect();

        let mut terms = tokens;
        terms.extend(bigrams);
        terms
    }

    /// Register one corpus document in the document-frequency table
    pub fn observe(&mut self, text: &str) {
        let distinct: HashSet<String> = self.terms(text).into_iter().collect();
        for term in distinct {
            *self.document_frequency.entry(term).or_insert(0) += 1;
        }
        self.documents += 1;
    }

    /// Smoothed inverse document frequency: `ln((N+1)/(df+1)) + 1`
    pub fn idf(&self, term: &str) -> f64 {
        let n = self.documents as f64;
        let df = self.document_frequency.get(term).copied().unwrap_or(0) as f64;
        ((n + 1.0) / (df + 1.0)).ln() + 1.0
    }

    /// Multiplier for recognised business-domain terms, 1.0 otherwise
    pub fn domain_boost(&self, term: &str) -> f64 {
        self.domain_boosts.get(term).copied().unwrap_or(1.0)
    }

    /// Build the weighted term vector of a text
    pub fn vectorize(&self, text: &str) -> TermVector {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for term in self.terms(text) {
            *counts.entry(term).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(term, tf)| {
                let weight = tf as f64 * self.idf(&term) * self.domain_boost(&term);
                (term, weight)
            })
            .collect()
    }
}

/// Cosine similarity between two term vectors, in `[0, 1]`.
///
/// Returns 0 when either vector is empty.
pub fn cosine_similarity(a: &TermVector, b: &TermVector) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(term, w)| large.get(term).map(|v| w * v))
        .sum();
    let magnitude_a = a.values().map(|w| w * w).sum::<f64>().sqrt();
    let magnitude_b = b.values().map(|w| w * w).sum::<f64>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    (dot / (magnitude_a * magnitude_b)).clamp(0.0, 1.0)
}
