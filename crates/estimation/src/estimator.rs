//! Feature and project estimation from tracked time.
//!
//! With fewer than `min_samples` usable samples a feature falls back to its
//! seed estimate at low confidence. Otherwise the configured central
//! tendency is reported with a one-standard-deviation band, and confidence
//! follows the coefficient of variation.

use aitea_core::{
    AppConfig, Confidence, EstimateSource, EstimationStyle, Feature, FeatureEstimate, FeatureId,
    ProjectEstimate, SampleStats, TrackedTimeEntry,
};
use aitea_storage::{Storage, StorageError};
use aitea_tracking::flag_anomalies;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Relative width of the band around a seed-only estimate.
pub const SEED_BAND: f64 = 0.5;

/// Coefficient of variation at or below which confidence is high.
pub const HIGH_CONFIDENCE_CV: f64 = 0.25;

/// Coefficient of variation at or below which confidence is medium.
pub const MEDIUM_CONFIDENCE_CV: f64 = 0.5;

/// Errors raised by estimation and scenario operations.
#[derive(Debug, thiserror::Error)]
pub enum EstimationError {
    /// Storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Requested feature does not exist
    #[error("feature not found: {0}")]
    UnknownFeature(String),

    /// No scenario with this name or id
    #[error("scenario not found: {0}")]
    ScenarioNotFound(String),

    /// A scenario with this name already exists
    #[error("a scenario named '{0}' already exists")]
    DuplicateScenario(String),

    /// Scenario input rejected
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),
}

/// Result type for estimation operations.
pub type Result<T> = std::result::Result<T, EstimationError>;

/// Split samples into those used for statistics and the count dropped as anomalies.
pub fn usable_samples(samples: &[f64], config: &AppConfig) -> (Vec<f64>, usize) {
    let finite: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    if !config.exclude_anomalies {
        return (finite, 0);
    }

    let flags = flag_anomalies(&finite, config.anomaly_threshold);
    let used: Vec<f64> = finite
        .iter()
        .zip(&flags)
        .filter(|&(_, &flagged)| !flagged)
        .map(|(&v, _)| v)
        .collect();
    let excluded = finite.len() - used.len();
    (used, excluded)
}

/// Confidence from the coefficient of variation.
pub fn confidence_for(stats: &SampleStats) -> Confidence {
    if stats.mean == 0.0 {
        return Confidence::High;
    }
    let cv = stats.std_dev / stats.mean;
    if cv <= HIGH_CONFIDENCE_CV {
        Confidence::High
    } else if cv <= MEDIUM_CONFIDENCE_CV {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// Estimate one feature from its historical samples.
pub fn estimate_feature(feature: &Feature, samples: &[f64], config: &AppConfig) -> FeatureEstimate {
    let style = config.estimation_style;
    let (used, excluded_count) = usable_samples(samples, config);

    let stats = if used.len() >= config.min_samples {
        SampleStats::from_samples(&used)
    } else {
        None
    };

    match stats {
        Some(stats) => {
            let hours = stats.central(style);
            FeatureEstimate {
                feature_id: feature.id,
                feature_name: feature.name.clone(),
                style,
                hours,
                low: (hours - stats.std_dev).max(0.0),
                high: hours + stats.std_dev,
                confidence: confidence_for(&stats),
                source: EstimateSource::Historical,
                sample_count: stats.count,
                excluded_count,
                stats: Some(stats),
            }
        }
        None => {
            let seed = feature.seed_hours;
            FeatureEstimate {
                feature_id: feature.id,
                feature_name: feature.name.clone(),
                style,
                hours: seed,
                low: seed * (1.0 - SEED_BAND),
                high: seed * (1.0 + SEED_BAND),
                confidence: Confidence::Low,
                source: EstimateSource::Seed,
                sample_count: used.len(),
                excluded_count,
                stats: None,
            }
        }
    }
}

/// Hours per feature, in stored order.
pub fn hours_by_feature(entries: &[TrackedTimeEntry]) -> HashMap<FeatureId, Vec<f64>> {
    let mut map: HashMap<FeatureId, Vec<f64>> = HashMap::new();
    for entry in entries {
        map.entry(entry.feature_id).or_default().push(entry.hours);
    }
    map
}

/// Estimate the given features. Repeated ids are estimated once, in first-seen order.
pub fn estimate_project(
    ids: &[FeatureId],
    features: &[Feature],
    entries: &[TrackedTimeEntry],
    config: &AppConfig,
) -> Result<ProjectEstimate> {
    let by_id: HashMap<FeatureId, &Feature> = features.iter().map(|f| (f.id, f)).collect();
    let hours = hours_by_feature(entries);
    let mut seen = HashSet::new();
    let mut estimates = Vec::new();

    for id in ids {
        if !seen.insert(*id) {
            continue;
        }
        let feature = by_id
            .get(id)
            .ok_or_else(|| EstimationError::UnknownFeature(id.to_string()))?;
        let samples = hours.get(id).map(Vec::as_slice).unwrap_or(&[]);
        let estimate = estimate_feature(feature, samples, config);
        debug!(
            feature = %estimate.feature_name,
            hours = estimate.hours,
            source = estimate.source.as_str(),
            confidence = estimate.confidence.as_str(),
            "feature estimated"
        );
        estimates.push(estimate);
    }

    Ok(ProjectEstimate::from_features(config.estimation_style, estimates))
}

/// Estimation service over stored features and tracked time.
pub struct EstimationService<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> EstimationService<S> {
    /// Create a new estimation service.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    async fn config_with(&self, style: Option<EstimationStyle>) -> Result<AppConfig> {
        let mut config = self.storage.load_config().await?;
        if let Some(style) = style {
            config.estimation_style = style;
        }
        Ok(config)
    }

    /// Estimate features by id.
    pub async fn estimate_features(
        &self,
        ids: &[FeatureId],
        style: Option<EstimationStyle>,
    ) -> Result<ProjectEstimate> {
        let config = self.config_with(style).await?;
        let features = self.storage.load_features().await?;
        let entries = self.storage.load_entries().await?;
        estimate_project(ids, &features, &entries, &config)
    }

    /// Estimate features by name, synonym or id.
    pub async fn estimate_names(
        &self,
        names: &[String],
        style: Option<EstimationStyle>,
    ) -> Result<ProjectEstimate> {
        let features = self.storage.load_features().await?;
        let ids = names
            .iter()
            .map(|n| {
                aitea_library::find_in(&features, n)
                    .map(|f| f.id)
                    .ok_or_else(|| EstimationError::UnknownFeature(n.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        self.estimate_features(&ids, style).await
    }

    /// Estimate every feature in the library, ordered by name.
    pub async fn estimate_all(&self, style: Option<EstimationStyle>) -> Result<ProjectEstimate> {
        let mut features = self.storage.load_features().await?;
        features.sort_by_key(|f| f.name.to_lowercase());
        let ids: Vec<_> = features.iter().map(|f| f.id).collect();
        self.estimate_features(&ids, style).await
    }

    /// Estimate a single feature.
    pub async fn estimate_one(&self, name: &str, style: Option<EstimationStyle>) -> Result<FeatureEstimate> {
        let mut project = self.estimate_names(&[name.to_string()], style).await?;
        project
            .features
            .pop()
            .ok_or_else(|| EstimationError::UnknownFeature(name.to_string()))
    }
}
