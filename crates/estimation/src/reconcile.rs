//! Seed reconciliation - compare seed estimates with observed actuals.

use aitea_core::{stats, AppConfig, Feature, FeatureId, TrackedTimeEntry};
use aitea_storage::Storage;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::estimator::{hours_by_feature, usable_samples, EstimationError, Result};

/// How a seed compares with what was actually tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedVerdict {
    /// Within tolerance
    Accurate,
    /// Actuals ran higher than the seed
    Underestimated,
    /// Actuals ran lower than the seed
    Overestimated,
}

impl SeedVerdict {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SeedVerdict::Accurate => "accurate",
            SeedVerdict::Underestimated => "underestimated",
            SeedVerdict::Overestimated => "overestimated",
        }
    }
}

/// Seed versus actual for one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedReconciliation {
    pub feature_id: FeatureId,
    pub feature_name: String,
    pub seed: f64,
    /// Median of the usable samples
    pub actual: f64,
    /// `actual / seed`
    pub ratio: f64,
    pub sample_count: usize,
    pub verdict: SeedVerdict,
}

/// Verdict for a seed/actual pair.
pub fn verdict(seed: f64, actual: f64, tolerance: f64) -> (f64, SeedVerdict) {
    let ratio = if seed == 0.0 {
        if actual == 0.0 { 1.0 } else { f64::INFINITY }
    } else {
        actual / seed
    };

    let verdict = if ratio > 1.0 + tolerance {
        SeedVerdict::Underestimated
    } else if ratio < 1.0 - tolerance {
        SeedVerdict::Overestimated
    } else {
        SeedVerdict::Accurate
    };
    (ratio, verdict)
}

/// Reconcile every feature that has at least `min_samples` usable samples.
pub fn reconcile(
    features: &[Feature],
    entries: &[TrackedTimeEntry],
    config: &AppConfig,
) -> Vec<SeedReconciliation> {
    let hours = hours_by_feature(entries);
    let mut results: Vec<_> = features
        .iter()
        .filter_map(|feature| {
            let samples = hours.get(&feature.id)?;
            let (used, _) = usable_samples(samples, config);
            if used.len() < config.min_samples {
                return None;
            }
            let actual = stats::median(&used)?;
            let (ratio, verdict) = verdict(feature.seed_hours, actual, config.seed_tolerance);
            Some(SeedReconciliation {
                feature_id: feature.id,
                feature_name: feature.name.clone(),
                seed: feature.seed_hours,
                actual,
                ratio,
                sample_count: used.len(),
                verdict,
            })
        })
        .collect();

    results.sort_by_key(|r| r.feature_name.to_lowercase());
    results
}

/// Reconciliation backed by storage.
pub struct SeedReconciler<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> SeedReconciler<S> {
    /// Create a new reconciler.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Compare seeds with actuals without changing anything.
    pub async fn reconcile(&self) -> Result<Vec<SeedReconciliation>> {
        let features = self.storage.load_features().await?;
        let entries = self.storage.load_entries().await?;
        let config = self.storage.load_config().await?;
        Ok(reconcile(&features, &entries, &config))
    }

    /// Update the seed of every inaccurate feature to its observed median.
    /// Returns the reconciliations that were applied.
    pub async fn apply(&self) -> Result<Vec<SeedReconciliation>> {
        let entries = self.storage.load_entries().await?;
        let config = self.storage.load_config().await?;

        let applied = self
            .storage
            .update_features(|features| {
                let applied: Vec<_> = reconcile(features, &entries, &config)
                    .into_iter()
                    .filter(|r| r.verdict != SeedVerdict::Accurate)
                    .collect();
                let now = chrono::Utc::now();
                for r in &applied {
                    if let Some(feature) = features.iter_mut().find(|f| f.id == r.feature_id) {
                        feature.seed_hours = r.actual;
                        feature.updated_at = now;
                    }
                }
                Ok::<_, EstimationError>(applied)
            })
            .await?;

        for r in &applied {
            info!(feature = %r.feature_name, from = r.seed, to = r.actual, "seed updated");
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aitea_storage::JsonStorage;
    use chrono::NaiveDate;

    fn entries_for(feature: &Feature, hours: &[f64]) -> Vec<TrackedTimeEntry> {
        let date = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        hours
            .iter()
            .map(|&h| TrackedTimeEntry::new(feature.id, "alice", date, h))
            .collect()
    }

    #[test]
    fn test_verdict_thresholds() {
        assert_eq!(verdict(10.0, 12.0, 0.25).1, SeedVerdict::Accurate);
        assert_eq!(verdict(10.0, 12.5, 0.25).1, SeedVerdict::Accurate);
        assert_eq!(verdict(10.0, 13.0, 0.25).1, SeedVerdict::Underestimated);
        assert_eq!(verdict(10.0, 7.0, 0.25).1, SeedVerdict::Overestimated);
        assert_eq!(verdict(0.0, 0.0, 0.25), (1.0, SeedVerdict::Accurate));
        assert_eq!(verdict(0.0, 3.0, 0.25).1, SeedVerdict::Underestimated);
    }

    #[test]
    fn test_reconcile_requires_min_samples() {
        let rich = Feature::new("Login", "backend", "development", 4.0);
        let thin = Feature::new("Search", "backend", "development", 4.0);
        let mut entries = entries_for(&rich, &[8.0, 8.0, 9.0]);
        entries.extend(entries_for(&thin, &[8.0]));

        let results = reconcile(&[rich.clone(), thin], &entries, &AppConfig::default());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].feature_id, rich.id);
        assert_eq!(results[0].actual, 8.0);
        assert_eq!(results[0].ratio, 2.0);
        assert_eq!(results[0].verdict, SeedVerdict::Underestimated);
    }

    #[tokio::test]
    async fn test_apply_updates_only_inaccurate_seeds() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(JsonStorage::new(dir.path()).await.unwrap());
        let low = Feature::new("Login", "backend", "development", 4.0);
        let good = Feature::new("Search", "backend", "development", 10.0);
        storage.save_features(&[low.clone(), good.clone()]).await.unwrap();
        let mut entries = entries_for(&low, &[6.0, 6.0, 6.0]);
        entries.extend(entries_for(&good, &[10.0, 11.0, 9.0]));
        storage.append_entries(&entries).await.unwrap();

        let reconciler = SeedReconciler::new(storage.clone());
        let applied = reconciler.apply().await.unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].feature_id, low.id);

        let features = storage.load_features().await.unwrap();
        let seeds: Vec<_> = features.iter().map(|f| (f.name.as_str(), f.seed_hours)).collect();
        assert_eq!(seeds, vec![("Login", 6.0), ("Search", 10.0)]);

        assert!(reconciler.apply().await.unwrap().is_empty());
    }
}
