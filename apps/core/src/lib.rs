//! Pulse core: classifies business journal entries into a category, a mood
//! and an energy level, and learns from each user's corrections.

pub mod brain;
pub mod config;
pub mod database;
pub mod dataset;
pub mod error;
pub mod fs_manager;
pub mod models;
pub mod persistence;
pub mod store;

#[cfg(test)]
mod tests;

pub use brain::BrainAnalyzer;
pub use config::{BrainConfig, FusionMode, StoreBackend, StoreConfig};
pub use error::{AppError, DatasetError};
pub use models::{
    AnalysisResult, BusinessCategory, Energy, FeedbackType, MoodPolarity, TrainingExample,
    UpstreamAnalysis, UserFeedback,
};
pub use store::{FileStore, KeyValueStore, MemoryStore};
