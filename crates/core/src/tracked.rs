//! Tracked time model - hours logged against a feature.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::id::{EntryId, FeatureId};
use crate::Time;

/// A single tracked time record.
///
/// Entries are append-only. Duplicate and anomaly flags are computed on
/// demand and never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedTimeEntry {
    /// Unique identifier
    pub id: EntryId,

    /// Feature the hours were spent on
    pub feature_id: FeatureId,

    /// Team member who logged the time
    pub member: String,

    /// Day the work happened
    pub date: NaiveDate,

    /// Hours logged
    pub hours: f64,

    /// Free-form notes
    #[serde(default)]
    pub notes: Option<String>,

    /// When the entry was recorded or imported
    pub recorded_at: Time,
}

/// Key shared by entries that describe the same piece of work.
pub type DuplicateKey = (FeatureId, String, NaiveDate);

impl TrackedTimeEntry {
    /// Create a new entry.
    pub fn new(feature_id: FeatureId, member: impl Into<String>, date: NaiveDate, hours: f64) -> Self {
        Self {
            id: EntryId::new(),
            feature_id,
            member: member.into(),
            date,
            hours,
            notes: None,
            recorded_at: chrono::Utc::now(),
        }
    }

    /// The `(feature, member, date)` key used for duplicate detection.
    /// Member names compare case-insensitively.
    pub fn duplicate_key(&self) -> DuplicateKey {
        (self.feature_id, self.member.trim().to_lowercase(), self.date)
    }
}

/// Filter for listing tracked time.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Only entries for this feature
    pub feature_id: Option<FeatureId>,

    /// Only entries by this member (case-insensitive)
    pub member: Option<String>,

    /// Only entries on or after this date
    pub since: Option<NaiveDate>,

    /// Only entries on or before this date
    pub until: Option<NaiveDate>,
}

impl EntryFilter {
    /// Whether an entry passes the filter.
    pub fn accepts(&self, entry: &TrackedTimeEntry) -> bool {
        if let Some(id) = self.feature_id {
            if entry.feature_id != id {
                return false;
            }
        }
        if let Some(member) = &self.member {
            if !entry.member.trim().eq_ignore_ascii_case(member.trim()) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.date < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.date > until {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_duplicate_key_ignores_member_case() {
        let feature = FeatureId::new();
        let a = TrackedTimeEntry::new(feature, "Alice", day(1), 4.0);
        let b = TrackedTimeEntry::new(feature, " alice ", day(1), 2.0);
        assert_eq!(a.duplicate_key(), b.duplicate_key());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_entry_filter() {
        let feature = FeatureId::new();
        let entry = TrackedTimeEntry::new(feature, "Bob", day(10), 3.0);

        assert!(EntryFilter::default().accepts(&entry));
        assert!(EntryFilter { member: Some("bob".into()), ..Default::default() }.accepts(&entry));
        assert!(!EntryFilter { feature_id: Some(FeatureId::new()), ..Default::default() }.accepts(&entry));
        assert!(!EntryFilter { since: Some(day(11)), ..Default::default() }.accepts(&entry));
        assert!(EntryFilter { since: Some(day(10)), until: Some(day(10)), ..Default::default() }.accepts(&entry));
    }
}
