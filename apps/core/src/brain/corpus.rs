//! Nearest-neighbor lookup over the labeled training corpus.
//!
//! Every example is vectorized once at build time. Lookup is a linear scan,
//! which is fine for a few hundred examples; a large corpus would need an
//! approximate nearest-neighbor index instead.

use crate::brain::vectorizer::{cosine_similarity, TermVector, Vectorizer};
use crate::models::TrainingExample;

/// The closest corpus example to a query, above the similarity threshold.
#[derive(Debug, Clone, Copy)]
pub struct CorpusMatch<'a> {
    pub example: &'a TrainingExample,
    pub similarity: f64,
}

/// Accumulates documents before the index is frozen.
///
/// Document frequencies must be complete before any example is vectorized,
/// so documents can only be added here and never to a built [`CorpusIndex`].
#[derive(Debug, Default)]
pub struct CorpusBuilder {
    vectorizer: Vectorizer,
    examples: Vec<TrainingExample>,
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one labeled example
    pub fn add_document(&mut self, example: TrainingExample) {
        self.vectorizer.observe(&example.text);
        self.examples.push(example);
    }

    /// Vectorize every example with the final document frequencies
    pub fn build(self, threshold: f64) -> CorpusIndex {
        let vectors = self
            .examples
            .iter()
            .map(|e| self.vectorizer.vectorize(&e.text))
            .collect();

        CorpusIndex {
            vectorizer: self.vectorizer,
            examples: self.examples,
            vectors,
            threshold,
        }
    }
}

/// Frozen corpus with precomputed TF-IDF vectors
#[derive(Debug)]
pub struct CorpusIndex {
    vectorizer: Vectorizer,
    examples: Vec<TrainingExample>,
    vectors: Vec<TermVector>,
    threshold: f64,
}

impl CorpusIndex {
    /// Index a whole corpus in one go
    pub fn build(examples: &[TrainingExample], threshold: f64) -> Self {
        let mut builder = CorpusBuilder::new();
        for example in examples {
            builder.add_document(example.clone());
        }
        builder.build(threshold)
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// The vectorizer holding the corpus document frequencies
    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    /// Best neighbor of `text`, if its similarity reaches the threshold
    pub fn best_match(&self, text: &str) -> Option<CorpusMatch<'_>> {
        let query = self.vectorizer.vectorize(text);
        self.best_match_vector(&query)
    }

    /// Same as [`CorpusIndex::best_match`] for an already vectorized query.
    ///
    /// Ties keep the earliest example in corpus order.
    pub fn best_match_vector(&self, query: &TermVector) -> Option<CorpusMatch<'_>> {
        if query.is_empty() {
            return None;
        }

        let mut best: Option<CorpusMatch<'_>> = None;
        for (example, vector) in self.examples.iter().zip(&self.vectors) {
            let similarity = cosine_similarity(query, vector);
            if best.map_or(true, |b| similarity > b.similarity) {
                best = Some(CorpusMatch {
                    example,
                    similarity,
                });
            }
        }

        best.filter(|m| m.similarity >= self.threshold)
    }
}
