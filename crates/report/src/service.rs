//! Tracked time summaries.

use aitea_core::{FeatureId, TrackedTimeEntry, Feature};
use aitea_storage::{Storage, StorageError};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Label used for entries whose feature is no longer in the library.
pub const UNKNOWN_LABEL: &str = "(unknown)";

/// Errors raised while building reports.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// JSON rendering failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Hours grouped by feature, team and member.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackingSummary {
    pub feature_count: usize,
    pub entry_count: usize,
    pub total_hours: f64,
    /// Sorted by hours descending, then name
    pub by_feature: Vec<(String, f64)>,
    pub by_team: Vec<(String, f64)>,
    /// Members are grouped case-insensitively under their first spelling
    pub by_member: Vec<(String, f64)>,
}

impl TrackingSummary {
    /// Build a summary from in-memory data.
    pub fn build(features: &[Feature], entries: &[TrackedTimeEntry]) -> Self {
        let by_id: HashMap<FeatureId, &Feature> = features.iter().map(|f| (f.id, f)).collect();
        let mut by_feature: HashMap<String, f64> = HashMap::new();
        let mut by_team: HashMap<String, f64> = HashMap::new();
        let mut by_member: HashMap<String, (String, f64)> = HashMap::new();

        for entry in entries {
            let (feature, team) = match by_id.get(&entry.feature_id) {
                Some(f) => (f.name.clone(), f.team.clone()),
                None => (UNKNOWN_LABEL.to_string(), UNKNOWN_LABEL.to_string()),
            };
            *by_feature.entry(feature).or_default() += entry.hours;
            *by_team.entry(team).or_default() += entry.hours;
            let member = entry.member.trim();
            by_member
                .entry(member.to_lowercase())
                .or_insert_with(|| (member.to_string(), 0.0))
                .1 += entry.hours;
        }

        Self {
            feature_count: features.len(),
            entry_count: entries.len(),
            total_hours: entries.iter().map(|e| e.hours).sum(),
            by_feature: ranked(by_feature),
            by_team: ranked(by_team),
            by_member: ranked(by_member.into_values()),
        }
    }
}

fn ranked(totals: impl IntoIterator<Item = (String, f64)>) -> Vec<(String, f64)> {
    let mut rows: Vec<_> = totals.into_iter().collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

/// Report service over stored data.
pub struct ReportService<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> ReportService<S> {
    /// Create a new report service.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Summarize all tracked time.
    pub async fn summary(&self) -> Result<TrackingSummary> {
        let features = self.storage.load_features().await?;
        let entries = self.storage.load_entries().await?;
        let summary = TrackingSummary::build(&features, &entries);
        debug!(entries = summary.entry_count, hours = summary.total_hours, "summary built");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aitea_storage::JsonStorage;
    use chrono::NaiveDate;

    fn entry(feature: &Feature, member: &str, hours: f64) -> TrackedTimeEntry {
        let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        TrackedTimeEntry::new(feature.id, member, date, hours)
    }

    #[test]
    fn test_summary_groups_and_ranks() {
        let login = Feature::new("Login", "backend", "development", 4.0);
        let search = Feature::new("Search", "backend", "development", 8.0);
        let charts = Feature::new("Charts", "frontend", "development", 8.0);
        let entries = vec![
            entry(&login, "alice", 3.0),
            entry(&search, "bob", 5.0),
            entry(&charts, "alice", 4.0),
            entry(&login, "carol", 1.0),
        ];

        let summary = TrackingSummary::build(&[login, search, charts], &entries);
        assert_eq!(summary.entry_count, 4);
        assert_eq!(summary.total_hours, 13.0);
        assert_eq!(
            summary.by_feature,
            vec![("Search".to_string(), 5.0), ("Charts".to_string(), 4.0), ("Login".to_string(), 4.0)]
        );
        assert_eq!(summary.by_team, vec![("backend".to_string(), 9.0), ("frontend".to_string(), 4.0)]);
        assert_eq!(summary.by_member[0], ("alice".to_string(), 7.0));
    }

    #[test]
    fn test_members_group_case_insensitively() {
        let login = Feature::new("Login", "backend", "development", 4.0);
        let entries = vec![
            entry(&login, "Alice", 3.0),
            entry(&login, " alice ", 2.0),
            entry(&login, "bob", 1.0),
        ];

        let summary = TrackingSummary::build(&[login], &entries);
        assert_eq!(summary.by_member, vec![("Alice".to_string(), 5.0), ("bob".to_string(), 1.0)]);
    }

    #[test]
    fn test_orphaned_entries_are_labelled() {
        let gone = Feature::new("Removed", "backend", "development", 4.0);
        let summary = TrackingSummary::build(&[], &[entry(&gone, "alice", 2.0)]);
        assert_eq!(summary.by_feature, vec![(UNKNOWN_LABEL.to_string(), 2.0)]);
        assert_eq!(summary.feature_count, 0);
    }

    #[tokio::test]
    async fn test_summary_from_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(JsonStorage::new(dir.path()).await.unwrap());
        let service = ReportService::new(storage.clone());
        assert_eq!(service.summary().await.unwrap(), TrackingSummary::default());

        let login = Feature::new("Login", "backend", "development", 4.0);
        storage.save_features(std::slice::from_ref(&login)).await.unwrap();
        storage.append_entries(&[entry(&login, "alice", 6.0)]).await.unwrap();

        let summary = service.summary().await.unwrap();
        assert_eq!(summary.feature_count, 1);
        assert_eq!(summary.total_hours, 6.0);
    }
}
