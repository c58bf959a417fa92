//! Feature library service.

use aitea_core::{Feature, FeatureId, Template};
use aitea_storage::{Storage, StorageError};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Errors raised by library operations.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// Storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// No feature with this id or name
    #[error("feature not found: {0}")]
    NotFound(String),

    /// A feature with this name already exists
    #[error("a feature named '{0}' already exists")]
    DuplicateName(String),

    /// Invalid field value
    #[error("invalid feature: {0}")]
    Invalid(String),

    /// Tracked time references the feature
    #[error("feature '{name}' has {count} tracked time entries and cannot be removed")]
    InUse {
        /// Feature name
        name: String,
        /// Referencing entries
        count: usize,
    },

    /// Stored scenarios reference the feature
    #[error("feature '{name}' is used by scenarios {} and cannot be removed", .scenarios.join(", "))]
    InScenario {
        /// Feature name
        name: String,
        /// Names of the referencing scenarios
        scenarios: Vec<String>,
    },
}

/// Result type for library operations.
pub type Result<T> = std::result::Result<T, LibraryError>;

/// Input for creating a feature.
#[derive(Debug, Clone)]
pub struct NewFeature {
    pub name: String,
    pub team: String,
    pub process: String,
    pub seed_hours: f64,
    pub synonyms: Vec<String>,
    pub notes: Option<String>,
}

impl NewFeature {
    /// Create input with the required fields.
    pub fn new(
        name: impl Into<String>,
        team: impl Into<String>,
        process: impl Into<String>,
        seed_hours: f64,
    ) -> Self {
        Self {
            name: name.into(),
            team: team.into(),
            process: process.into(),
            seed_hours,
            synonyms: Vec::new(),
            notes: None,
        }
    }
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct FeatureUpdate {
    pub name: Option<String>,
    pub team: Option<String>,
    pub process: Option<String>,
    pub seed_hours: Option<f64>,
    pub notes: Option<String>,
    pub add_synonyms: Vec<String>,
}

/// Filter for listing features.
#[derive(Debug, Clone, Default)]
pub struct FeatureFilter {
    /// Only features owned by this team (case-insensitive)
    pub team: Option<String>,
    /// Only features with this process (case-insensitive)
    pub process: Option<String>,
}

impl FeatureFilter {
    fn accepts(&self, feature: &Feature) -> bool {
        self.team.as_deref().map_or(true, |t| feature.team.eq_ignore_ascii_case(t))
            && self.process.as_deref().map_or(true, |p| feature.process.eq_ignore_ascii_case(p))
    }
}

/// Outcome of applying a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateApplication {
    /// Features created
    pub added: Vec<Feature>,
    /// Template feature names skipped because they already exist
    pub skipped: Vec<String>,
}

/// CRUD over the feature library.
pub struct FeatureLibrary<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> FeatureLibrary<S> {
    /// Create a new library service.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Add a feature.
    pub async fn add(&self, input: NewFeature) -> Result<Feature> {
        let name = validate_name(&input.name)?.to_string();
        validate_hours(input.seed_hours)?;

        let mut feature = Feature::new(&name, input.team.trim(), input.process.trim(), input.seed_hours);
        feature.synonyms = clean_synonyms(input.synonyms);
        feature.notes = input.notes;

        let feature = self
            .storage
            .update_features(|features| {
                ensure_unique(features, &name, None)?;
                features.push(feature.clone());
                Ok::<_, LibraryError>(feature)
            })
            .await?;
        info!(id = %feature.id, name = %feature.name, "feature added");
        Ok(feature)
    }

    /// Get a feature by id.
    pub async fn get(&self, id: FeatureId) -> Result<Feature> {
        self.storage
            .load_features()
            .await?
            .into_iter()
            .find(|f| f.id == id)
            .ok_or_else(|| LibraryError::NotFound(id.to_string()))
    }

    /// Find a feature by id, name or synonym.
    pub async fn find(&self, name_or_id: &str) -> Result<Feature> {
        let features = self.storage.load_features().await?;
        find_in(&features, name_or_id)
            .cloned()
            .ok_or_else(|| LibraryError::NotFound(name_or_id.to_string()))
    }

    /// Resolve several names or ids, failing on the first unknown one.
    pub async fn resolve(&self, names: &[String]) -> Result<Vec<Feature>> {
        let features = self.storage.load_features().await?;
        names
            .iter()
            .map(|n| {
                find_in(&features, n)
                    .cloned()
                    .ok_or_else(|| LibraryError::NotFound(n.clone()))
            })
            .collect()
    }

    /// List features matching the filter, sorted by name.
    pub async fn list(&self, filter: &FeatureFilter) -> Result<Vec<Feature>> {
        let mut features: Vec<_> = self
            .storage
            .load_features()
            .await?
            .into_iter()
            .filter(|f| filter.accepts(f))
            .collect();
        features.sort_by_key(|f| f.name.to_lowercase());
        Ok(features)
    }

    /// Update a feature.
    pub async fn update(&self, id: FeatureId, update: FeatureUpdate) -> Result<Feature> {
        if let Some(name) = &update.name {
            validate_name(name)?;
        }
        if let Some(hours) = update.seed_hours {
            validate_hours(hours)?;
        }

        let updated = self
            .storage
            .update_features(|features| {
                if let Some(name) = &update.name {
                    ensure_unique(features, name.trim(), Some(id))?;
                }
                let feature = features
                    .iter_mut()
                    .find(|f| f.id == id)
                    .ok_or_else(|| LibraryError::NotFound(id.to_string()))?;

                if let Some(name) = update.name {
                    feature.name = name.trim().to_string();
                }
                if let Some(team) = update.team {
                    feature.team = team.trim().to_string();
                }
                if let Some(process) = update.process {
                    feature.process = process.trim().to_string();
                }
                if let Some(hours) = update.seed_hours {
                    feature.seed_hours = hours;
                }
                if let Some(notes) = update.notes {
                    feature.notes = Some(notes);
                }
                let mut synonyms = std::mem::take(&mut feature.synonyms);
                synonyms.extend(update.add_synonyms);
                feature.synonyms = clean_synonyms(synonyms);
                feature.updated_at = chrono::Utc::now();
                Ok::<_, LibraryError>(feature.clone())
            })
            .await?;
        info!(id = %updated.id, name = %updated.name, "feature updated");
        Ok(updated)
    }

    /// Remove a feature that no tracked time or scenario references.
    pub async fn remove(&self, id: FeatureId) -> Result<Feature> {
        let entries = self.storage.load_entries().await?;
        let scenarios = self.storage.load_scenarios().await?;

        let removed = self
            .storage
            .update_features(|features| {
                let index = features
                    .iter()
                    .position(|f| f.id == id)
                    .ok_or_else(|| LibraryError::NotFound(id.to_string()))?;

                let count = entries.iter().filter(|e| e.feature_id == id).count();
                if count > 0 {
                    return Err(LibraryError::InUse {
                        name: features[index].name.clone(),
                        count,
                    });
                }

                let referencing: Vec<String> = scenarios
                    .iter()
                    .filter(|s| s.all_features().any(|f| *f == id))
                    .map(|s| s.name.clone())
                    .collect();
                if !referencing.is_empty() {
                    return Err(LibraryError::InScenario {
                        name: features[index].name.clone(),
                        scenarios: referencing,
                    });
                }

                Ok::<_, LibraryError>(features.remove(index))
            })
            .await?;
        info!(id = %removed.id, name = %removed.name, "feature removed");
        Ok(removed)
    }

    /// Search by relevance over name, synonyms, team, process and notes.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Feature>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<_> = self
            .storage
            .load_features()
            .await?
            .into_iter()
            .map(|f| {
                let score = relevance_score(&f, &query);
                (f, score)
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.name.cmp(&b.0.name))
        });

        Ok(scored.into_iter().take(limit).map(|(f, _)| f).collect())
    }

    /// Add every template feature whose name is not already in the library.
    pub async fn apply_template(&self, template: &Template) -> Result<TemplateApplication> {
        let result = self
            .storage
            .update_features(|features| {
                let mut result = TemplateApplication::default();
                for tf in &template.features {
                    if features.iter().any(|f| f.matches(&tf.name)) {
                        debug!(name = %tf.name, "template feature already present");
                        result.skipped.push(tf.name.clone());
                        continue;
                    }
                    let feature = Feature::new(&tf.name, &tf.team, &tf.process, tf.seed_hours);
                    features.push(feature.clone());
                    result.added.push(feature);
                }
                Ok::<_, LibraryError>(result)
            })
            .await?;
        info!(
            template = %template.name,
            added = result.added.len(),
            skipped = result.skipped.len(),
            "template applied"
        );
        Ok(result)
    }
}

/// Look up a feature by id string, then by name or synonym.
pub fn find_in<'a>(features: &'a [Feature], name_or_id: &str) -> Option<&'a Feature> {
    if let Ok(id) = name_or_id.trim().parse::<FeatureId>() {
        if let Some(f) = features.iter().find(|f| f.id == id) {
            return Some(f);
        }
    }
    features
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case(name_or_id.trim()))
        .or_else(|| features.iter().find(|f| f.matches(name_or_id)))
}

fn relevance_score(feature: &Feature, query: &str) -> f64 {
    let mut score = 0.0;

    let name = feature.name.to_lowercase();
    if name == query {
        score += 20.0;
    } else if name.contains(query) {
        score += 10.0;
    }
    for synonym in &feature.synonyms {
        if synonym.to_lowercase().contains(query) {
            score += 7.0;
        }
    }
    if feature.team.to_lowercase().contains(query) {
        score += 3.0;
    }
    if feature.process.to_lowercase().contains(query) {
        score += 3.0;
    }
    if let Some(notes) = &feature.notes {
        if notes.to_lowercase().contains(query) {
            score += 2.0;
        }
    }
    score
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LibraryError::Invalid("name must not be empty".to_string()));
    }
    Ok(name)
}

fn validate_hours(hours: f64) -> Result<()> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(LibraryError::Invalid(format!(
            "seed hours must be a non-negative number, got {}",
            hours
        )));
    }
    Ok(())
}

fn ensure_unique(features: &[Feature], name: &str, except: Option<FeatureId>) -> Result<()> {
    let clash = features
        .iter()
        .filter(|f| Some(f.id) != except)
        .any(|f| f.matches(name));
    if clash {
        return Err(LibraryError::DuplicateName(name.to_string()));
    }
    Ok(())
}

fn clean_synonyms(synonyms: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    synonyms
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .collect()
}
