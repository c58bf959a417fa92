//! AITEA core data models.
//!
//! This crate defines the data structures shared by the feature library,
//! time tracking, estimation and reporting crates.

#![warn(missing_docs)]

// Core identities
mod id;

// Library and tracked time
mod feature;
mod tracked;

// Derived estimates
mod estimate;
pub mod stats;

// Scenarios, templates and settings
mod scenario;
mod config;

// Re-exports
pub use id::*;

pub use feature::Feature;
pub use tracked::{TrackedTimeEntry, EntryFilter, DuplicateKey};
pub use estimate::{
    EstimationStyle, Confidence, EstimateSource, SampleStats, FeatureEstimate, ProjectEstimate,
};
pub use scenario::{Scenario, ScenarioCase, Template, TemplateFeature};
pub use config::{AppConfig, ConfigError};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
