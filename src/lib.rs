//! accountpulse: account health scoring, snapshot trend detection,
//! playbook triggering, and onboarding milestone detection for a customer
//! success portfolio.
//!
//! Data flows one way: the signal aggregator merges provider data into one
//! record per account; the classifier turns that into a category, score,
//! and signal lists; the snapshot store and trend detector track changes
//! over time; downgrades, inactivity, stalled onboarding, and AI risk
//! flags feed the playbook trigger engine, which creates deduplicated
//! follow-up tasks. The report scorers reuse the classifier's output.

pub mod cache;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod health;
pub mod jobs;
pub mod migrations;
pub mod onboarding;
pub mod playbooks;
pub mod providers;
pub mod reports;
pub mod signals;
pub mod types;
pub mod util;

pub use error::EngineError;
