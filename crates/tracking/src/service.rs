//! Time tracking service.

use aitea_core::{EntryFilter, FeatureId, TrackedTimeEntry};
use aitea_storage::{Storage, StorageError};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::import::{self, ImportFormat};
use crate::quality::{self, QualityReport};

/// Errors raised by tracking operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    /// Storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Import file could not be read
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        /// File being imported
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Import file is not valid JSON for the expected layout
    #[error("malformed JSON import: {0}")]
    Json(#[from] serde_json::Error),

    /// Format could not be determined
    #[error("unknown import format '{0}' (expected json or csv)")]
    UnknownFormat(String),

    /// A row failed validation
    #[error("row {row}: {reason}")]
    InvalidRow {
        /// 1-based row or record number
        row: usize,
        /// What was wrong
        reason: String,
    },

    /// A record names a feature that is not in the library
    #[error("{}unknown feature '{feature}'", .row.map(|r| format!("row {}: ", r)).unwrap_or_default())]
    UnknownFeature {
        /// Row, when the reference came from a file
        row: Option<usize>,
        /// The unresolved reference
        feature: String,
    },
}

/// Result type for tracking operations.
pub type Result<T> = std::result::Result<T, TrackingError>;

/// Outcome of an import.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    /// Entries appended
    pub imported: usize,
    /// Hours across the imported entries
    pub total_hours: f64,
    /// Quality of the whole dataset after the import
    pub quality: QualityReport,
}

/// Records and imports tracked time.
pub struct TimeTrackingService<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> TimeTrackingService<S> {
    /// Create a new tracking service.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Record a single entry against a feature named by id, name or synonym.
    pub async fn record(
        &self,
        feature: &str,
        member: &str,
        date: NaiveDate,
        hours: f64,
        notes: Option<String>,
    ) -> Result<TrackedTimeEntry> {
        let features = self.storage.load_features().await?;
        let raw = import::RawRecord {
            feature: feature.to_string(),
            member: member.to_string(),
            date: date.format("%Y-%m-%d").to_string(),
            hours,
            notes,
        };

        let entry = import::resolve_records(vec![(1, raw)], &features)
            .map_err(|e| match e {
                TrackingError::UnknownFeature { feature, .. } => {
                    TrackingError::UnknownFeature { row: None, feature }
                }
                TrackingError::InvalidRow { reason, .. } => TrackingError::InvalidRow { row: 1, reason },
                other => other,
            })?
            .remove(0);

        self.storage.append_entries(std::slice::from_ref(&entry)).await?;
        info!(id = %entry.id, feature = %entry.feature_id, hours = entry.hours, "time recorded");
        Ok(entry)
    }

    /// Import a file. The format is taken from the extension unless given.
    pub async fn import(&self, path: &Path, format: Option<ImportFormat>) -> Result<ImportSummary> {
        let format = match format.or_else(|| ImportFormat::from_path(path)) {
            Some(f) => f,
            None => {
                return Err(TrackingError::UnknownFormat(
                    path.extension()
                        .and_then(|e| e.to_str())
                        .unwrap_or_default()
                        .to_string(),
                ))
            }
        };
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| TrackingError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        info!(path = %path.display(), ?format, "importing tracked time");
        self.import_str(&content, format).await
    }

    /// Import from in-memory content. Nothing is appended if any row is invalid.
    pub async fn import_str(&self, content: &str, format: ImportFormat) -> Result<ImportSummary> {
        let features = self.storage.load_features().await?;
        let records = import::parse_records(content, format)?;
        let entries = import::resolve_records(records, &features)?;

        self.storage.append_entries(&entries).await?;

        let all = self.storage.load_entries().await?;
        let config = self.storage.load_config().await?;
        let quality = quality::analyze(&all, &features, config.anomaly_threshold);
        if !quality.is_clean() {
            warn!(
                duplicates = quality.duplicate_entry_count(),
                anomalies = quality.anomalies.len(),
                orphans = quality.orphans.len(),
                "tracked time has quality flags"
            );
        }

        let summary = ImportSummary {
            imported: entries.len(),
            total_hours: entries.iter().map(|e| e.hours).sum(),
            quality,
        };
        info!(imported = summary.imported, hours = summary.total_hours, "import complete");
        Ok(summary)
    }

    /// List entries matching the filter, ordered by date.
    pub async fn list(&self, filter: &EntryFilter) -> Result<Vec<TrackedTimeEntry>> {
        let mut entries: Vec<_> = self
            .storage
            .load_entries()
            .await?
            .into_iter()
            .filter(|e| filter.accepts(e))
            .collect();
        entries.sort_by_key(|e| e.date);
        Ok(entries)
    }

    /// Hours logged against one feature, in recorded order.
    pub async fn hours_for(&self, feature_id: FeatureId) -> Result<Vec<f64>> {
        Ok(self
            .storage
            .load_entries()
            .await?
            .iter()
            .filter(|e| e.feature_id == feature_id)
            .map(|e| e.hours)
            .collect())
    }

    /// Run every quality check with the configured anomaly threshold.
    pub async fn quality_report(&self) -> Result<QualityReport> {
        let entries = self.storage.load_entries().await?;
        let features = self.storage.load_features().await?;
        let config = self.storage.load_config().await?;
        Ok(quality::analyze(&entries, &features, config.anomaly_threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aitea_core::Feature;
    use aitea_storage::JsonStorage;

    async fn service() -> (tempfile::TempDir, Arc<JsonStorage>, TimeTrackingService<JsonStorage>, Feature) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(JsonStorage::new(dir.path()).await.unwrap());
        let feature = Feature::new("Login", "backend", "development", 6.0);
        storage.save_features(std::slice::from_ref(&feature)).await.unwrap();
        let service = TimeTrackingService::new(storage.clone());
        (dir, storage, service, feature)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[tokio::test]
    async fn test_record_entry() {
        let (_dir, storage, service, feature) = service().await;
        let entry = service.record("login", "alice", day(3), 4.0, None).await.unwrap();

        assert_eq!(entry.feature_id, feature.id);
        assert_eq!(storage.load_entries().await.unwrap(), vec![entry]);
    }

    #[tokio::test]
    async fn test_record_unknown_feature() {
        let (_dir, storage, service, _feature) = service().await;
        let err = service.record("billing", "alice", day(3), 4.0, None).await.unwrap_err();

        assert!(matches!(err, TrackingError::UnknownFeature { row: None, .. }));
        assert!(storage.load_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_is_all_or_nothing() {
        let (_dir, storage, service, _feature) = service().await;
        let csv = "feature,member,date,hours\n\
                   Login,alice,2024-06-01,3\n\
                   Billing,bob,2024-06-01,2\n";

        let err = service.import_str(csv, ImportFormat::Csv).await.unwrap_err();
        assert!(matches!(err, TrackingError::UnknownFeature { row: Some(3), .. }));
        assert!(storage.load_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_reports_duplicates() {
        let (_dir, _storage, service, _feature) = service().await;
        let csv = "feature,member,date,hours\n\
                   Login,alice,2024-06-01,3\n\
                   Login,Alice,2024-06-01,3\n\
                   Login,bob,2024-06-02,4\n";

        let summary = service.import_str(csv, ImportFormat::Csv).await.unwrap();
        assert_eq!(summary.imported, 3);
        assert_eq!(summary.total_hours, 10.0);
        assert_eq!(summary.quality.duplicates.len(), 1);
        assert_eq!(summary.quality.duplicate_entry_count(), 2);
    }

    #[tokio::test]
    async fn test_import_file_detects_format() {
        let (dir, _storage, service, feature) = service().await;
        let path = dir.path().join("export.json");
        std::fs::write(
            &path,
            r#"[{"feature": "Login", "member": "carol", "date": "2024-06-05", "hours": 5}]"#,
        )
        .unwrap();

        let summary = service.import(&path, None).await.unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(service.hours_for(feature.id).await.unwrap(), vec![5.0]);

        let err = service.import(&dir.path().join("export.xlsx"), None).await.unwrap_err();
        assert!(matches!(err, TrackingError::UnknownFormat(_)));

        let err = service.import(&dir.path().join("missing.csv"), None).await.unwrap_err();
        assert!(matches!(err, TrackingError::Io { .. }));
    }

    #[tokio::test]
    async fn test_list_sorted_and_filtered() {
        let (_dir, _storage, service, _feature) = service().await;
        service.record("Login", "bob", day(9), 1.0, None).await.unwrap();
        service.record("Login", "alice", day(2), 2.0, None).await.unwrap();
        service.record("Login", "alice", day(5), 3.0, None).await.unwrap();

        let all = service.list(&EntryFilter::default()).await.unwrap();
        let dates: Vec<_> = all.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![day(2), day(5), day(9)]);

        let alice = service
            .list(&EntryFilter { member: Some("ALICE".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(alice.len(), 2);
    }
}
