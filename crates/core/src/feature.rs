//! Feature model - a unit of software scope with a seed estimate.

use serde::{Deserialize, Serialize};
use crate::id::FeatureId;
use crate::Time;

/// A feature in the library.
///
/// Tracked time refers to features by id, so a feature is only changed
/// through an explicit update once time has been logged against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Unique identifier
    pub id: FeatureId,

    /// Display name, unique within the library (case-insensitive)
    pub name: String,

    /// Owning team
    pub team: String,

    /// Process classification (e.g. "development", "design", "qa")
    pub process: String,

    /// Judgment-based estimate in hours
    pub seed_hours: f64,

    /// Alternative names used when matching imports and BRD text
    #[serde(default)]
    pub synonyms: Vec<String>,

    /// Free-form notes
    #[serde(default)]
    pub notes: Option<String>,

    /// When created
    pub created_at: Time,

    /// Last update
    pub updated_at: Time,
}

impl Feature {
    /// Create a new feature.
    pub fn new(
        name: impl Into<String>,
        team: impl Into<String>,
        process: impl Into<String>,
        seed_hours: f64,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: FeatureId::new(),
            name: name.into(),
            team: team.into(),
            process: process.into(),
            seed_hours,
            synonyms: Vec::new(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a synonym.
    pub fn with_synonym(mut self, synonym: impl Into<String>) -> Self {
        self.synonyms.push(synonym.into());
        self
    }

    /// Whether `name` refers to this feature, by name or synonym.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim();
        self.name.eq_ignore_ascii_case(name)
            || self.synonyms.iter().any(|s| s.eq_ignore_ascii_case(name))
    }
}
