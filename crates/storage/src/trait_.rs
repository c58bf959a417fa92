//! Storage trait abstraction.

use async_trait::async_trait;
use aitea_core::{AppConfig, Feature, Scenario, TrackedTimeEntry};
use std::path::PathBuf;

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A data file exists but cannot be parsed
    #[error("malformed data file {}: {source}", .path.display())]
    Malformed {
        /// File that failed to parse
        path: PathBuf,
        /// Parse error
        source: serde_json::Error,
    },
}

/// Storage abstraction for AITEA data.
///
/// Each collection is loaded and saved whole. Missing collections load as
/// their defaults.
///
/// The `update_*` methods run load, modify and save under one write lock, so
/// concurrent callers never overwrite each other. Nothing is written when
/// the closure returns an error.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Feature library ===

    /// Load every feature.
    async fn load_features(&self) -> Result<Vec<Feature>>;

    /// Replace the feature library.
    async fn save_features(&self, features: &[Feature]) -> Result<()>;

    /// Modify the feature library in place.
    async fn update_features<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Vec<Feature>) -> std::result::Result<T, E> + Send,
        T: Send,
        E: From<StorageError> + Send;

    // === Tracked time ===

    /// Load every tracked time entry.
    async fn load_entries(&self) -> Result<Vec<TrackedTimeEntry>>;

    /// Append entries after the existing ones.
    async fn append_entries(&self, entries: &[TrackedTimeEntry]) -> Result<()>;

    // === Scenarios ===

    /// Load every scenario.
    async fn load_scenarios(&self) -> Result<Vec<Scenario>>;

    /// Replace the scenario list.
    async fn save_scenarios(&self, scenarios: &[Scenario]) -> Result<()>;

    /// Modify the scenario list in place.
    async fn update_scenarios<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Vec<Scenario>) -> std::result::Result<T, E> + Send,
        T: Send,
        E: From<StorageError> + Send;

    // === Configuration ===

    /// Load configuration.
    async fn load_config(&self) -> Result<AppConfig>;

    /// Save configuration.
    async fn save_config(&self, config: &AppConfig) -> Result<()>;

    /// Modify configuration in place.
    async fn update_config<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut AppConfig) -> std::result::Result<T, E> + Send,
        T: Send,
        E: From<StorageError> + Send;
}
