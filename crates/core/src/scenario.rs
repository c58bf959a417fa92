//! Scenario and template models.

use serde::{Deserialize, Serialize};
use crate::id::{FeatureId, ScenarioId};
use crate::Time;

/// A named bundle of best, likely and worst case feature sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique identifier
    pub id: ScenarioId,

    /// Name, unique case-insensitively
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Features in the best case
    pub best: Vec<FeatureId>,

    /// Features in the likely case
    pub likely: Vec<FeatureId>,

    /// Features in the worst case
    pub worst: Vec<FeatureId>,

    /// When created
    pub created_at: Time,
}

impl Scenario {
    /// Feature set for one case.
    pub fn case(&self, case: ScenarioCase) -> &[FeatureId] {
        match case {
            ScenarioCase::Best => &self.best,
            ScenarioCase::Likely => &self.likely,
            ScenarioCase::Worst => &self.worst,
        }
    }

    /// Every feature referenced by any case.
    pub fn all_features(&self) -> impl Iterator<Item = &FeatureId> {
        self.best.iter().chain(&self.likely).chain(&self.worst)
    }
}

/// One of the three scenario cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioCase {
    Best,
    Likely,
    Worst,
}

impl ScenarioCase {
    /// All cases in display order.
    pub const ALL: [ScenarioCase; 3] = [ScenarioCase::Best, ScenarioCase::Likely, ScenarioCase::Worst];

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioCase::Best => "best",
            ScenarioCase::Likely => "likely",
            ScenarioCase::Worst => "worst",
        }
    }
}

/// A static bundle of predefined features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Template name (e.g. "web-app")
    pub name: String,

    /// Description
    pub description: String,

    /// Features the template provides
    pub features: Vec<TemplateFeature>,
}

impl Template {
    /// Sum of seed hours.
    pub fn total_seed_hours(&self) -> f64 {
        self.features.iter().map(|f| f.seed_hours).sum()
    }
}

/// A feature definition inside a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateFeature {
    pub name: String,
    pub team: String,
    pub process: String,
    pub seed_hours: f64,
}
