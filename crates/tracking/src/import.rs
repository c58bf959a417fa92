//! Parsing of exported time tracking files.
//!
//! Two layouts are accepted:
//! - JSON: an array of `{ "feature", "member", "date", "hours", "notes"? }`
//! - CSV: a header row naming `feature,member,date,hours` (any order) and an
//!   optional `notes` column. Fields may be double-quoted, and quoted fields
//!   may span lines.

use aitea_core::{Feature, FeatureId, TrackedTimeEntry};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;

use crate::service::TrackingError;

/// Import file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Json,
    Csv,
}

impl ImportFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_lowercase().as_str() {
            "json" => Some(ImportFormat::Json),
            "csv" => Some(ImportFormat::Csv),
            _ => None,
        }
    }
}

impl std::str::FromStr for ImportFormat {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ImportFormat::Json),
            "csv" => Ok(ImportFormat::Csv),
            other => Err(TrackingError::UnknownFormat(other.to_string())),
        }
    }
}

/// One record as it appears in the file, before validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawRecord {
    pub feature: String,
    pub member: String,
    pub date: String,
    pub hours: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Parse file content into raw records, numbered from 1 for error messages.
pub fn parse_records(content: &str, format: ImportFormat) -> Result<Vec<(usize, RawRecord)>, TrackingError> {
    match format {
        ImportFormat::Json => {
            let values: Vec<serde_json::Value> = serde_json::from_str(content)?;
            values
                .into_iter()
                .enumerate()
                .map(|(i, value)| {
                    let row = i + 1;
                    serde_json::from_value::<RawRecord>(value)
                        .map(|record| (row, record))
                        .map_err(|e| invalid(row, &e.to_string()))
                })
                .collect()
        }
        ImportFormat::Csv => parse_csv(content),
    }
}

/// Validate records and resolve feature references.
///
/// Fails on the first invalid row so a bad file imports nothing.
pub fn resolve_records(
    records: Vec<(usize, RawRecord)>,
    features: &[Feature],
) -> Result<Vec<TrackedTimeEntry>, TrackingError> {
    records
        .into_iter()
        .map(|(row, record)| {
            let member = record.member.trim();
            if member.is_empty() {
                return Err(invalid(row, "member is empty"));
            }
            if !record.hours.is_finite() || record.hours < 0.0 {
                return Err(invalid(row, &format!("hours must be non-negative, got {}", record.hours)));
            }
            let date = parse_date(&record.date).ok_or_else(|| {
                invalid(row, &format!("invalid date '{}', expected YYYY-MM-DD", record.date))
            })?;
            let feature = lookup_feature(features, &record.feature).ok_or_else(|| {
                TrackingError::UnknownFeature {
                    row: Some(row),
                    feature: record.feature.clone(),
                }
            })?;

            let mut entry = TrackedTimeEntry::new(feature.id, member, date, record.hours);
            entry.notes = record.notes.filter(|n| !n.trim().is_empty());
            Ok(entry)
        })
        .collect()
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Resolve a feature reference by id, exact name, then synonym.
pub(crate) fn lookup_feature<'a>(features: &'a [Feature], reference: &str) -> Option<&'a Feature> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    if let Ok(id) = reference.parse::<FeatureId>() {
        if let Some(f) = features.iter().find(|f| f.id == id) {
            return Some(f);
        }
    }
    features.iter().find(|f| f.matches(reference))
}

fn invalid(row: usize, reason: &str) -> TrackingError {
    TrackingError::InvalidRow {
        row,
        reason: reason.to_string(),
    }
}

fn parse_csv(content: &str) -> Result<Vec<(usize, RawRecord)>, TrackingError> {
    let mut rows = split_csv_records(content)?.into_iter();

    let Some((header_row, header)) = rows.next() else {
        return Ok(Vec::new());
    };
    let columns: Vec<String> = header.into_iter().map(|c| c.trim().to_lowercase()).collect();
    let column = |name: &str| columns.iter().position(|c| c == name);
    let (Some(feature), Some(member), Some(date), Some(hours)) =
        (column("feature"), column("member"), column("date"), column("hours"))
    else {
        return Err(invalid(header_row, "header must name feature, member, date and hours columns"));
    };
    let notes = column("notes");

    let mut records = Vec::new();
    for (row, fields) in rows {
        let get = |index: usize| {
            fields
                .get(index)
                .map(|s| s.trim())
                .ok_or_else(|| invalid(row, &format!("expected {} columns, found {}", columns.len(), fields.len())))
        };

        let hours_text = get(hours)?;
        let hours_value = hours_text
            .parse::<f64>()
            .map_err(|_| invalid(row, &format!("hours '{}' is not a number", hours_text)))?;

        records.push((
            row,
            RawRecord {
                feature: get(feature)?.to_string(),
                member: get(member)?.to_string(),
                date: get(date)?.to_string(),
                hours: hours_value,
                notes: notes
                    .and_then(|i| fields.get(i))
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            },
        ));
    }
    Ok(records)
}

/// Split CSV content into records tagged with the line each one starts on.
///
/// Honours double quotes and `""` escapes. A newline inside quotes belongs
/// to the field. Blank lines are skipped.
fn split_csv_records(content: &str) -> Result<Vec<(usize, Vec<String>)>, TrackingError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut start = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            '\n' if in_quotes => {
                current.push('\n');
                line += 1;
            }
            '\n' => {
                finish_record(&mut records, &mut fields, &mut current, start);
                line += 1;
                start = line;
            }
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err(invalid(start, "unterminated quoted field"));
    }
    finish_record(&mut records, &mut fields, &mut current, start);
    Ok(records)
}

fn finish_record(
    records: &mut Vec<(usize, Vec<String>)>,
    fields: &mut Vec<String>,
    current: &mut String,
    row: usize,
) {
    fields.push(std::mem::take(current));
    let record = std::mem::take(fields);
    let blank = record.len() == 1 && record[0].trim().is_empty();
    if !blank {
        records.push((row, record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> Vec<Feature> {
        vec![
            Feature::new("User Login", "backend", "development", 6.0).with_synonym("login"),
            Feature::new("Dashboard", "frontend", "development", 12.0),
        ]
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ImportFormat::from_path(Path::new("a/b.CSV")), Some(ImportFormat::Csv));
        assert_eq!(ImportFormat::from_path(Path::new("x.json")), Some(ImportFormat::Json));
        assert_eq!(ImportFormat::from_path(Path::new("x.txt")), None);
        assert!("xml".parse::<ImportFormat>().is_err());
    }

    #[test]
    fn test_split_csv_quotes() {
        assert_eq!(split_csv_records("a,b,,c").unwrap(), vec![(1, vec!["a".to_string(), "b".into(), "".into(), "c".into()])]);
        let records = split_csv_records("x\r\nLogin,\"Smith, Jo\",2024-01-02,3,\"said \"\"hi\"\"\"\r\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].0, 2);
        assert_eq!(records[1].1, vec!["Login", "Smith, Jo", "2024-01-02", "3", r#"said "hi""#]);

        let err = split_csv_records("a\nb,\"open").unwrap_err();
        assert!(matches!(err, TrackingError::InvalidRow { row: 2, .. }));
    }

    #[test]
    fn test_parse_csv_multiline_quoted_notes() {
        let csv = "feature,member,date,hours,notes\n\
                   Login,alice,2024-01-02,3,\"line one\nline two\"\n\
                   Dashboard,bob,2024-01-03,2,\n";
        let records = parse_records(csv, ImportFormat::Csv).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, 2);
        assert_eq!(records[0].1.notes.as_deref(), Some("line one\nline two"));
        assert_eq!(records[1].0, 4);
        assert_eq!(records[1].1.member, "bob");
    }

    #[test]
    fn test_parse_csv_any_column_order() {
        let csv = "member,feature,hours,date,notes\n\
                   alice,User Login,4.5,2024-02-01,\n\
                   \n\
                   bob,dashboard,8,2024-02-02,\"first pass, rough\"\n";
        let records = parse_records(csv, ImportFormat::Csv).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, 2);
        assert_eq!(records[0].1.member, "alice");
        assert_eq!(records[0].1.hours, 4.5);
        assert_eq!(records[0].1.notes, None);
        assert_eq!(records[1].0, 4);
        assert_eq!(records[1].1.notes.as_deref(), Some("first pass, rough"));
    }

    #[test]
    fn test_parse_csv_rejects_bad_header_and_hours() {
        let err = parse_records("feature,member,hours\n", ImportFormat::Csv).unwrap_err();
        assert!(matches!(err, TrackingError::InvalidRow { row: 1, .. }));

        let err = parse_records("feature,member,date,hours\nLogin,a,2024-01-01,lots\n", ImportFormat::Csv)
            .unwrap_err();
        assert!(matches!(err, TrackingError::InvalidRow { row: 2, .. }));

        let err = parse_records("feature,member,date,hours\nLogin,a\n", ImportFormat::Csv).unwrap_err();
        assert!(matches!(err, TrackingError::InvalidRow { row: 2, .. }));
    }

    #[test]
    fn test_parse_json() {
        let json = r#"[
            {"feature": "Dashboard", "member": "carol", "date": "2024-03-04", "hours": 6},
            {"feature": "login", "member": "dave", "date": "2024-03-05", "hours": 2.5, "notes": "review"}
        ]"#;
        let records = parse_records(json, ImportFormat::Json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].0, 2);
        assert_eq!(records[1].1.notes.as_deref(), Some("review"));

        assert!(matches!(
            parse_records("{", ImportFormat::Json),
            Err(TrackingError::Json(_))
        ));
    }

    #[test]
    fn test_parse_json_names_the_bad_record() {
        let missing_member = r#"[
            {"feature": "Dashboard", "member": "carol", "date": "2024-03-04", "hours": 6},
            {"feature": "Dashboard", "date": "2024-03-05", "hours": 2}
        ]"#;
        let err = parse_records(missing_member, ImportFormat::Json).unwrap_err();
        match err {
            TrackingError::InvalidRow { row, reason } => {
                assert_eq!(row, 2);
                assert!(reason.contains("member"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }

        let bad_hours = r#"[{"feature": "Dashboard", "member": "carol", "date": "2024-03-04", "hours": "lots"}]"#;
        let err = parse_records(bad_hours, ImportFormat::Json).unwrap_err();
        assert!(matches!(err, TrackingError::InvalidRow { row: 1, .. }));
    }

    #[test]
    fn test_resolve_records() {
        let features = features();
        let records = vec![
            (1, RawRecord {
                feature: "LOGIN".into(),
                member: " alice ".into(),
                date: "2024-02-01".into(),
                hours: 3.0,
                notes: Some("  ".into()),
            }),
            (2, RawRecord {
                feature: features[1].id.to_string(),
                member: "bob".into(),
                date: "2024-02-02".into(),
                hours: 0.0,
                notes: None,
            }),
        ];

        let entries = resolve_records(records, &features).unwrap();
        assert_eq!(entries[0].feature_id, features[0].id);
        assert_eq!(entries[0].member, "alice");
        assert_eq!(entries[0].notes, None);
        assert_eq!(entries[1].feature_id, features[1].id);
    }

    #[test]
    fn test_resolve_rejects_unknown_feature_and_bad_values() {
        let features = features();
        let record = |feature: &str, date: &str, hours: f64| RawRecord {
            feature: feature.into(),
            member: "alice".into(),
            date: date.into(),
            hours,
            notes: None,
        };

        let err = resolve_records(vec![(7, record("Billing", "2024-01-01", 1.0))], &features).unwrap_err();
        assert!(matches!(err, TrackingError::UnknownFeature { row: Some(7), .. }));

        let err = resolve_records(vec![(3, record("Dashboard", "01/02/2024", 1.0))], &features).unwrap_err();
        assert!(matches!(err, TrackingError::InvalidRow { row: 3, .. }));

        let err = resolve_records(vec![(4, record("Dashboard", "2024-01-01", -2.0))], &features).unwrap_err();
        assert!(matches!(err, TrackingError::InvalidRow { row: 4, .. }));
    }
}
