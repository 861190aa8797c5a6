//! Test Module
//!
//! Cross-module test suite for the Pulse core.
//!
//! ## Test Categories
//! - `brain_tests`: end-to-end classification scenarios and pipeline properties
//! - `feedback_tests`: learning, persistence writer, failure injection
//! - `store_tests`: file and SQLite key-value adapters
//! - `config_tests`: environment overrides

pub mod brain_tests;
pub mod store_tests;
