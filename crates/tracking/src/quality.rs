//! Data quality checks over tracked time.
//!
//! Checks never modify entries; they return flags for the caller to report.

use aitea_core::{stats, DuplicateKey, EntryId, Feature, FeatureId, TrackedTimeEntry};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Entries sharing the same feature, member and date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub feature_id: FeatureId,
    /// Normalized member name
    pub member: String,
    pub date: NaiveDate,
    /// Every entry in the group, in file order
    pub entries: Vec<EntryId>,
}

/// An entry far from its feature's median.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub entry_id: EntryId,
    pub feature_id: FeatureId,
    pub hours: f64,
    /// Median hours for the feature
    pub median: f64,
    /// `|hours - median| / median`
    pub deviation: f64,
}

/// Combined result of all checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityReport {
    pub duplicates: Vec<DuplicateGroup>,
    pub anomalies: Vec<Anomaly>,
    /// Entries whose feature is not in the library
    pub orphans: Vec<EntryId>,
}

impl QualityReport {
    /// Whether no check raised a flag.
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty() && self.anomalies.is_empty() && self.orphans.is_empty()
    }

    /// Number of entries flagged as duplicates.
    pub fn duplicate_entry_count(&self) -> usize {
        self.duplicates.iter().map(|g| g.entries.len()).sum()
    }
}

/// Run every check.
pub fn analyze(entries: &[TrackedTimeEntry], features: &[Feature], threshold: f64) -> QualityReport {
    QualityReport {
        duplicates: detect_duplicates(entries),
        anomalies: detect_anomalies(entries, threshold),
        orphans: detect_orphans(entries, features),
    }
}

/// Group entries by `(feature, member, date)`; every group of two or more is flagged.
pub fn detect_duplicates(entries: &[TrackedTimeEntry]) -> Vec<DuplicateGroup> {
    let mut order: Vec<DuplicateKey> = Vec::new();
    let mut groups: HashMap<DuplicateKey, Vec<EntryId>> = HashMap::new();

    for entry in entries {
        let key = entry.duplicate_key();
        let ids = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        ids.push(entry.id);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let ids = groups.remove(&key)?;
            (ids.len() > 1).then(|| DuplicateGroup {
                feature_id: key.0,
                member: key.1,
                date: key.2,
                entries: ids,
            })
        })
        .collect()
}

/// Flag samples whose relative deviation from the median exceeds `threshold`.
pub fn flag_anomalies(hours: &[f64], threshold: f64) -> Vec<bool> {
    let Some(median) = stats::median(hours) else {
        return vec![false; hours.len()];
    };
    hours
        .iter()
        .map(|&h| h.is_finite() && stats::relative_deviation(h, median) > threshold)
        .collect()
}

/// Per feature, flag entries more than `threshold` away from the feature's median.
pub fn detect_anomalies(entries: &[TrackedTimeEntry], threshold: f64) -> Vec<Anomaly> {
    let mut by_feature: HashMap<FeatureId, Vec<f64>> = HashMap::new();
    for entry in entries {
        by_feature.entry(entry.feature_id).or_default().push(entry.hours);
    }
    let medians: HashMap<FeatureId, f64> = by_feature
        .into_iter()
        .filter_map(|(id, hours)| Some((id, stats::median(&hours)?)))
        .collect();

    let mut anomalies = Vec::new();
    for entry in entries {
        let Some(&median) = medians.get(&entry.feature_id) else {
            continue;
        };
        let deviation = stats::relative_deviation(entry.hours, median);
        if entry.hours.is_finite() && deviation > threshold {
            anomalies.push(Anomaly {
                entry_id: entry.id,
                feature_id: entry.feature_id,
                hours: entry.hours,
                median,
                deviation,
            });
        }
    }
    anomalies
}

/// Entries referencing a feature that is not in `features`.
pub fn detect_orphans(entries: &[TrackedTimeEntry], features: &[Feature]) -> Vec<EntryId> {
    let known: HashSet<FeatureId> = features.iter().map(|f| f.id).collect();
    entries
        .iter()
        .filter(|e| !known.contains(&e.feature_id))
        .map(|e| e.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    #[test]
    fn test_identical_key_always_flagged() {
        let feature = FeatureId::new();
        let entries = vec![
            TrackedTimeEntry::new(feature, "alice", day(1), 4.0),
            TrackedTimeEntry::new(feature, "bob", day(1), 4.0),
            TrackedTimeEntry::new(feature, "Alice", day(1), 1.0),
            TrackedTimeEntry::new(feature, "alice", day(2), 4.0),
        ];

        let groups = detect_duplicates(&entries);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].entries, vec![entries[0].id, entries[2].id]);
        assert_eq!(groups[0].member, "alice");
    }

    #[test]
    fn test_same_member_date_different_feature_not_duplicate() {
        let entries = vec![
            TrackedTimeEntry::new(FeatureId::new(), "alice", day(1), 4.0),
            TrackedTimeEntry::new(FeatureId::new(), "alice", day(1), 4.0),
        ];
        assert!(detect_duplicates(&entries).is_empty());
    }

    #[test]
    fn test_anomaly_beyond_two_hundred_percent() {
        let feature = FeatureId::new();
        // median 10; 31 deviates 210%, 30 exactly 200%
        let entries = vec![
            TrackedTimeEntry::new(feature, "a", day(1), 10.0),
            TrackedTimeEntry::new(feature, "b", day(2), 9.0),
            TrackedTimeEntry::new(feature, "c", day(3), 11.0),
            TrackedTimeEntry::new(feature, "d", day(4), 31.0),
            TrackedTimeEntry::new(feature, "e", day(5), 10.0),
        ];

        let anomalies = detect_anomalies(&entries, 2.0);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].entry_id, entries[3].id);
        assert_eq!(anomalies[0].median, 10.0);

        let mut within = entries.clone();
        within[3].hours = 30.0;
        assert!(detect_anomalies(&within, 2.0).is_empty());
    }

    #[test]
    fn test_anomalies_are_per_feature() {
        let small = FeatureId::new();
        let large = FeatureId::new();
        let entries = vec![
            TrackedTimeEntry::new(small, "a", day(1), 1.0),
            TrackedTimeEntry::new(small, "a", day(2), 1.0),
            TrackedTimeEntry::new(large, "a", day(1), 40.0),
            TrackedTimeEntry::new(large, "a", day(2), 40.0),
        ];
        assert!(detect_anomalies(&entries, 2.0).is_empty());
    }

    #[test]
    fn test_flag_anomalies_zero_median() {
        assert_eq!(flag_anomalies(&[0.0, 0.0, 0.0, 2.0], 2.0), vec![false, false, false, true]);
        assert!(flag_anomalies(&[], 2.0).is_empty());
    }

    #[test]
    fn test_orphans_and_clean_report() {
        let feature = Feature::new("Login", "backend", "development", 4.0);
        let entries = vec![
            TrackedTimeEntry::new(feature.id, "a", day(1), 4.0),
            TrackedTimeEntry::new(FeatureId::new(), "a", day(1), 4.0),
        ];

        let report = analyze(&entries, std::slice::from_ref(&feature), 2.0);
        assert_eq!(report.orphans, vec![entries[1].id]);
        assert!(!report.is_clean());

        let clean = analyze(&entries[..1], std::slice::from_ref(&feature), 2.0);
        assert!(clean.is_clean());
    }
}
