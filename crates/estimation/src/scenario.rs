//! Best, likely and worst case scenario comparison.

use aitea_core::{Feature, FeatureId, ProjectEstimate, Scenario, ScenarioCase, ScenarioId};
use aitea_storage::Storage;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::estimator::{estimate_project, EstimationError, Result};

/// Input for creating a scenario. Features are named by id, name or synonym.
#[derive(Debug, Clone, Default)]
pub struct NewScenario {
    pub name: String,
    pub description: String,
    /// Defaults to `likely` when empty
    pub best: Vec<String>,
    /// Must not be empty
    pub likely: Vec<String>,
    /// Defaults to `likely` when empty
    pub worst: Vec<String>,
}

/// Estimates for the three cases of a scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioComparison {
    pub scenario: Scenario,
    pub best: ProjectEstimate,
    pub likely: ProjectEstimate,
    pub worst: ProjectEstimate,
}

impl ScenarioComparison {
    /// Estimate for one case.
    pub fn case(&self, case: ScenarioCase) -> &ProjectEstimate {
        match case {
            ScenarioCase::Best => &self.best,
            ScenarioCase::Likely => &self.likely,
            ScenarioCase::Worst => &self.worst,
        }
    }

    /// Hours between the worst and best case totals.
    pub fn spread(&self) -> f64 {
        self.worst.total_hours - self.best.total_hours
    }
}

/// Scenario persistence and comparison.
pub struct ScenarioService<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> ScenarioService<S> {
    /// Create a new scenario service.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Create and persist a scenario.
    pub async fn create(&self, input: NewScenario) -> Result<Scenario> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(EstimationError::InvalidScenario("name must not be empty".to_string()));
        }
        if input.likely.is_empty() {
            return Err(EstimationError::InvalidScenario(
                "the likely case needs at least one feature".to_string(),
            ));
        }

        let features = self.storage.load_features().await?;
        let likely = resolve(&features, &input.likely)?;
        let best = if input.best.is_empty() { likely.clone() } else { resolve(&features, &input.best)? };
        let worst = if input.worst.is_empty() { likely.clone() } else { resolve(&features, &input.worst)? };

        let scenario = Scenario {
            id: ScenarioId::new(),
            name: name.to_string(),
            description: input.description,
            best,
            likely,
            worst,
            created_at: chrono::Utc::now(),
        };
        let scenario = self
            .storage
            .update_scenarios(|scenarios| {
                if scenarios.iter().any(|s| s.name.eq_ignore_ascii_case(&scenario.name)) {
                    return Err(EstimationError::DuplicateScenario(scenario.name.clone()));
                }
                scenarios.push(scenario.clone());
                Ok(scenario)
            })
            .await?;
        info!(id = %scenario.id, name = %scenario.name, "scenario created");
        Ok(scenario)
    }

    /// List scenarios, ordered by name.
    pub async fn list(&self) -> Result<Vec<Scenario>> {
        let mut scenarios = self.storage.load_scenarios().await?;
        scenarios.sort_by_key(|s| s.name.to_lowercase());
        Ok(scenarios)
    }

    /// Get a scenario by name or id.
    pub async fn get(&self, name_or_id: &str) -> Result<Scenario> {
        let scenarios = self.storage.load_scenarios().await?;
        find(&scenarios, name_or_id)
            .cloned()
            .ok_or_else(|| EstimationError::ScenarioNotFound(name_or_id.to_string()))
    }

    /// Remove a scenario by name or id.
    pub async fn remove(&self, name_or_id: &str) -> Result<Scenario> {
        let removed = self
            .storage
            .update_scenarios(|scenarios| {
                let index = find(scenarios, name_or_id)
                    .map(|s| s.id)
                    .and_then(|id| scenarios.iter().position(|s| s.id == id))
                    .ok_or_else(|| EstimationError::ScenarioNotFound(name_or_id.to_string()))?;
                Ok::<_, EstimationError>(scenarios.remove(index))
            })
            .await?;
        info!(name = %removed.name, "scenario removed");
        Ok(removed)
    }

    /// Estimate all three cases of a scenario.
    pub async fn compare(&self, name_or_id: &str) -> Result<ScenarioComparison> {
        let scenario = self.get(name_or_id).await?;
        let features = self.storage.load_features().await?;
        let entries = self.storage.load_entries().await?;
        let config = self.storage.load_config().await?;

        let estimate = |case: ScenarioCase| estimate_project(scenario.case(case), &features, &entries, &config);
        let best = estimate(ScenarioCase::Best)?;
        let likely = estimate(ScenarioCase::Likely)?;
        let worst = estimate(ScenarioCase::Worst)?;

        Ok(ScenarioComparison {
            scenario,
            best,
            likely,
            worst,
        })
    }
}

fn find<'a>(scenarios: &'a [Scenario], name_or_id: &str) -> Option<&'a Scenario> {
    let key = name_or_id.trim();
    if let Ok(id) = key.parse::<ScenarioId>() {
        if let Some(s) = scenarios.iter().find(|s| s.id == id) {
            return Some(s);
        }
    }
    scenarios.iter().find(|s| s.name.eq_ignore_ascii_case(key))
}

fn resolve(features: &[Feature], names: &[String]) -> Result<Vec<FeatureId>> {
    names
        .iter()
        .map(|n| {
            aitea_library::find_in(features, n)
                .map(|f| f.id)
                .ok_or_else(|| EstimationError::UnknownFeature(n.clone()))
        })
        .collect()
}
