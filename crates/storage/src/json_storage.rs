//! JSON file storage implementation.
//!
//! Stores each collection as one pretty-printed JSON file in the data
//! directory (`.aitea` by default). Writes go through a temporary file and a
//! rename so a crash never leaves a half-written collection behind.

use std::path::{Path, PathBuf};
use aitea_core::{AppConfig, Feature, Scenario, TrackedTimeEntry};
use serde::{de::DeserializeOwned, Serialize};
use super::{Result, Storage, StorageError};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

const FEATURES_FILE: &str = "features.json";
const ENTRIES_FILE: &str = "tracked_time.json";
const SCENARIOS_FILE: &str = "scenarios.json";
const CONFIG_FILE: &str = "config.json";

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStorage {
    /// Create storage rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    /// Load, modify and save one file while holding the write lock.
    async fn update_file<C, F, T, E>(&self, file: &str, f: F) -> std::result::Result<T, E>
    where
        C: Serialize + DeserializeOwned + Default + Send,
        F: FnOnce(&mut C) -> std::result::Result<T, E> + Send,
        T: Send,
        E: From<StorageError> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let path = self.path(file);
        let mut value: C = read_json(&path).await?.unwrap_or_default();
        let out = f(&mut value)?;
        write_json(&path, &value).await?;
        Ok(out)
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn load_features(&self) -> Result<Vec<Feature>> {
        Ok(read_json(&self.path(FEATURES_FILE)).await?.unwrap_or_default())
    }

    async fn save_features(&self, features: &[Feature]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        write_json(&self.path(FEATURES_FILE), &features).await
    }

    async fn update_features<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Vec<Feature>) -> std::result::Result<T, E> + Send,
        T: Send,
        E: From<StorageError> + Send,
    {
        self.update_file(FEATURES_FILE, f).await
    }

    async fn load_entries(&self) -> Result<Vec<TrackedTimeEntry>> {
        Ok(read_json(&self.path(ENTRIES_FILE)).await?.unwrap_or_default())
    }

    async fn append_entries(&self, entries: &[TrackedTimeEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        self.update_file(ENTRIES_FILE, |all: &mut Vec<TrackedTimeEntry>| {
            all.extend_from_slice(entries);
            Ok::<_, StorageError>(())
        })
        .await
    }

    async fn load_scenarios(&self) -> Result<Vec<Scenario>> {
        Ok(read_json(&self.path(SCENARIOS_FILE)).await?.unwrap_or_default())
    }

    async fn save_scenarios(&self, scenarios: &[Scenario]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        write_json(&self.path(SCENARIOS_FILE), &scenarios).await
    }

    async fn update_scenarios<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Vec<Scenario>) -> std::result::Result<T, E> + Send,
        T: Send,
        E: From<StorageError> + Send,
    {
        self.update_file(SCENARIOS_FILE, f).await
    }

    async fn load_config(&self) -> Result<AppConfig> {
        Ok(read_json(&self.path(CONFIG_FILE)).await?.unwrap_or_default())
    }

    async fn save_config(&self, config: &AppConfig) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        write_json(&self.path(CONFIG_FILE), config).await
    }

    async fn update_config<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut AppConfig) -> std::result::Result<T, E> + Send,
        T: Send,
        E: From<StorageError> + Send,
    {
        self.update_file(CONFIG_FILE, f).await
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json).map_err(|source| StorageError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "data file missing, using defaults");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json.as_bytes()).await?;
    fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), bytes = json.len(), "wrote data file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aitea_core::{EstimationStyle, FeatureId, Scenario, ScenarioId};
    use chrono::NaiveDate;
    use std::sync::Arc;

    async fn storage() -> (tempfile::TempDir, JsonStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path().join("data")).await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_missing_files_load_defaults() {
        let (_dir, storage) = storage().await;
        assert!(storage.load_features().await.unwrap().is_empty());
        assert!(storage.load_entries().await.unwrap().is_empty());
        assert!(storage.load_scenarios().await.unwrap().is_empty());
        assert_eq!(storage.load_config().await.unwrap(), AppConfig::default());
    }

    #[tokio::test]
    async fn test_features_roundtrip() {
        let (_dir, storage) = storage().await;
        let features = vec![
            Feature::new("Login", "backend", "development", 6.0).with_synonym("sign in"),
            Feature::new("Dashboard", "frontend", "design", 12.5),
        ];

        storage.save_features(&features).await.unwrap();
        assert_eq!(storage.load_features().await.unwrap(), features);
    }

    #[tokio::test]
    async fn test_config_roundtrip() {
        let (_dir, storage) = storage().await;
        let config = AppConfig {
            estimation_style: EstimationStyle::P80,
            min_samples: 5,
            ..Default::default()
        };

        storage.save_config(&config).await.unwrap();
        assert_eq!(storage.load_config().await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_append_entries_keeps_existing() {
        let (_dir, storage) = storage().await;
        let feature = FeatureId::new();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let first = TrackedTimeEntry::new(feature, "alice", date, 3.0);
        let second = TrackedTimeEntry::new(feature, "bob", date, 5.0);

        storage.append_entries(std::slice::from_ref(&first)).await.unwrap();
        storage.append_entries(std::slice::from_ref(&second)).await.unwrap();
        storage.append_entries(&[]).await.unwrap();

        assert_eq!(storage.load_entries().await.unwrap(), vec![first, second]);
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let (_dir, storage) = storage().await;
        std::fs::write(storage.root().join(FEATURES_FILE), "{ not json").unwrap();

        let err = storage.load_features().await.unwrap_err();
        assert!(matches!(err, StorageError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let (_dir, storage) = storage().await;
        storage.save_scenarios(&[]).await.unwrap();
        assert!(storage.root().join(SCENARIOS_FILE).exists());
        assert!(!storage.root().join("scenarios.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_scenarios_roundtrip() {
        let (_dir, storage) = storage().await;
        let (a, b, c) = (FeatureId::new(), FeatureId::new(), FeatureId::new());
        let scenarios = vec![Scenario {
            id: ScenarioId::new(),
            name: "Launch".to_string(),
            description: "first public release".to_string(),
            best: vec![a],
            likely: vec![a, b],
            worst: vec![a, b, c],
            created_at: chrono::Utc::now(),
        }];

        storage.save_scenarios(&scenarios).await.unwrap();
        assert_eq!(storage.load_scenarios().await.unwrap(), scenarios);
    }

    #[tokio::test]
    async fn test_update_error_writes_nothing() {
        let (_dir, storage) = storage().await;
        let original = vec![Feature::new("Login", "backend", "development", 6.0)];
        storage.save_features(&original).await.unwrap();

        let result: std::result::Result<(), StorageError> = storage
            .update_features(|features| {
                features.clear();
                Err(StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, "rejected")))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(storage.load_features().await.unwrap(), original);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_keep_every_write() {
        let (_dir, storage) = storage().await;
        let storage = Arc::new(storage);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let storage = storage.clone();
                tokio::spawn(async move {
                    storage
                        .update_features(|features| {
                            features.push(Feature::new(format!("F{}", i), "backend", "development", 1.0));
                            Ok::<_, StorageError>(())
                        })
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(storage.load_features().await.unwrap().len(), 8);
    }
}
