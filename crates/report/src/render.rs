//! Text rendering for estimates, summaries and quality reports.

use aitea_core::{Feature, FeatureId, ProjectEstimate, TrackedTimeEntry};
use aitea_estimation::{ScenarioComparison, SeedReconciliation};
use aitea_tracking::QualityReport;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use serde::Serialize;
use std::collections::HashMap;

use crate::service::{Result, TrackingSummary, UNKNOWN_LABEL};

/// How command output is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("unknown output format '{}' (expected table, json or csv)", other)),
        }
    }
}

fn table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn hours(value: f64) -> String {
    format!("{:.1}", value)
}

fn days(value: f64, hours_per_day: f64) -> String {
    if hours_per_day > 0.0 {
        format!("{:.1}", value / hours_per_day)
    } else {
        "-".to_string()
    }
}

/// Pretty-printed JSON for any serializable value.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// One row per feature plus a total row.
///
/// With `hours_per_day` set, a `Days` column follows `Hours`.
pub fn estimate_table(project: &ProjectEstimate, hours_per_day: Option<f64>) -> String {
    let mut table = table();
    let mut header = vec!["Feature", "Hours"];
    if hours_per_day.is_some() {
        header.push("Days");
    }
    header.extend(["Low", "High", "Confidence", "Source", "Samples"]);
    table.set_header(header);

    let row = |name: &str, value: f64, low: f64, high: f64, confidence: &str, source: &str, samples: String| {
        let mut cells = vec![Cell::new(name), Cell::new(hours(value))];
        if let Some(per_day) = hours_per_day {
            cells.push(Cell::new(days(value, per_day)));
        }
        cells.extend([
            Cell::new(hours(low)),
            Cell::new(hours(high)),
            Cell::new(confidence),
            Cell::new(source),
            Cell::new(samples),
        ]);
        cells
    };

    for f in &project.features {
        let samples = if f.excluded_count > 0 {
            format!("{} ({} excluded)", f.sample_count, f.excluded_count)
        } else {
            f.sample_count.to_string()
        };
        table.add_row(row(
            &f.feature_name,
            f.hours,
            f.low,
            f.high,
            f.confidence.as_str(),
            f.source.as_str(),
            samples,
        ));
    }
    table.add_row(row(
        "TOTAL",
        project.total_hours,
        project.total_low,
        project.total_high,
        project.confidence.as_str(),
        "",
        String::new(),
    ));
    table.to_string()
}

/// CSV with a header row and one row per feature.
pub fn estimate_csv(project: &ProjectEstimate) -> String {
    let mut out = String::from("feature,style,hours,low,high,confidence,source,samples,excluded\n");
    for f in &project.features {
        out.push_str(&format!(
            "{},{},{:.2},{:.2},{:.2},{},{},{},{}\n",
            csv_field(&f.feature_name),
            f.style,
            f.hours,
            f.low,
            f.high,
            f.confidence,
            f.source.as_str(),
            f.sample_count,
            f.excluded_count,
        ));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Horizontal bars of `#` scaled so the largest value spans `width`.
pub fn bar_chart(rows: &[(String, f64)], width: usize) -> String {
    let max = rows.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    let label_width = rows.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);

    let mut out = String::new();
    for (label, value) in rows {
        let len = if max > 0.0 {
            ((value / max) * width as f64).round() as usize
        } else {
            0
        };
        out.push_str(&format!(
            "{:<lw$} | {} {}\n",
            label,
            "#".repeat(len),
            hours(*value),
            lw = label_width
        ));
    }
    out
}

/// Totals followed by per-feature, per-team and per-member breakdowns.
///
/// With `hours_per_day` set, each breakdown gains a `Days` column.
pub fn summary_table(summary: &TrackingSummary, hours_per_day: Option<f64>) -> String {
    let mut out = format!(
        "{} features, {} entries, {} hours tracked",
        summary.feature_count,
        summary.entry_count,
        hours(summary.total_hours)
    );
    if let Some(per_day) = hours_per_day {
        out.push_str(&format!(" ({} days)", days(summary.total_hours, per_day)));
    }
    out.push('\n');
    for (title, rows) in [
        ("Feature", &summary.by_feature),
        ("Team", &summary.by_team),
        ("Member", &summary.by_member),
    ] {
        if rows.is_empty() {
            continue;
        }
        let mut table = table();
        let mut header = vec![title, "Hours"];
        if hours_per_day.is_some() {
            header.push("Days");
        }
        header.push("Share");
        table.set_header(header);
        for (name, value) in rows {
            let share = if summary.total_hours > 0.0 {
                format!("{:.0}%", value / summary.total_hours * 100.0)
            } else {
                "-".to_string()
            };
            let mut cells = vec![name.clone(), hours(*value)];
            if let Some(per_day) = hours_per_day {
                cells.push(days(*value, per_day));
            }
            cells.push(share);
            table.add_row(cells);
        }
        out.push('\n');
        out.push_str(&table.to_string());
        out.push('\n');
    }
    out
}

/// Library listing.
pub fn feature_table(features: &[Feature]) -> String {
    let mut table = table();
    table.set_header(vec!["Name", "Team", "Process", "Seed", "Synonyms", "Id"]);
    for f in features {
        table.add_row(vec![
            f.name.clone(),
            f.team.clone(),
            f.process.clone(),
            hours(f.seed_hours),
            f.synonyms.join(", "),
            f.id.to_string(),
        ]);
    }
    table.to_string()
}

fn names(features: &[Feature]) -> HashMap<FeatureId, &str> {
    features.iter().map(|f| (f.id, f.name.as_str())).collect()
}

/// Tracked time listing with feature names resolved.
pub fn entries_table(entries: &[TrackedTimeEntry], features: &[Feature]) -> String {
    let names = names(features);
    let mut table = table();
    table.set_header(vec!["Date", "Feature", "Member", "Hours", "Notes"]);
    for e in entries {
        table.add_row(vec![
            e.date.to_string(),
            names.get(&e.feature_id).copied().unwrap_or(UNKNOWN_LABEL).to_string(),
            e.member.clone(),
            hours(e.hours),
            e.notes.clone().unwrap_or_default(),
        ]);
    }
    table.to_string()
}

/// Seed versus actual comparison.
pub fn reconciliation_table(rows: &[SeedReconciliation]) -> String {
    let mut table = table();
    table.set_header(vec!["Feature", "Seed", "Actual", "Ratio", "Samples", "Verdict"]);
    for r in rows {
        let ratio = if r.ratio.is_finite() {
            format!("{:.2}", r.ratio)
        } else {
            "-".to_string()
        };
        table.add_row(vec![
            r.feature_name.clone(),
            hours(r.seed),
            hours(r.actual),
            ratio,
            r.sample_count.to_string(),
            r.verdict.as_str().to_string(),
        ]);
    }
    table.to_string()
}

/// Every duplicate group, anomaly and orphan, one per line.
pub fn quality_table(report: &QualityReport, features: &[Feature]) -> String {
    if report.is_clean() {
        return "No quality issues found.\n".to_string();
    }
    let names = names(features);
    let name = |id: &FeatureId| names.get(id).copied().unwrap_or(UNKNOWN_LABEL).to_string();

    let mut table = table();
    table.set_header(vec!["Issue", "Feature", "Detail"]);
    for d in &report.duplicates {
        table.add_row(vec![
            "duplicate".to_string(),
            name(&d.feature_id),
            format!("{} entries by {} on {}", d.entries.len(), d.member, d.date),
        ]);
    }
    for a in &report.anomalies {
        table.add_row(vec![
            "anomaly".to_string(),
            name(&a.feature_id),
            format!("{} h vs median {} h ({:.0}% off)", hours(a.hours), hours(a.median), a.deviation * 100.0),
        ]);
    }
    for id in &report.orphans {
        table.add_row(vec!["orphan".to_string(), UNKNOWN_LABEL.to_string(), format!("entry {}", id)]);
    }
    table.to_string()
}

/// Totals for the best, likely and worst cases.
pub fn scenario_table(comparison: &ScenarioComparison) -> String {
    let mut table = table();
    table.set_header(vec!["Case", "Features", "Hours", "Low", "High", "Confidence"]);
    for case in aitea_core::ScenarioCase::ALL {
        let estimate = comparison.case(case);
        table.add_row(vec![
            case.as_str().to_string(),
            estimate.features.len().to_string(),
            hours(estimate.total_hours),
            hours(estimate.total_low),
            hours(estimate.total_high),
            estimate.confidence.as_str().to_string(),
        ]);
    }
    format!("{}\nSpread: {} hours\n", table, hours(comparison.spread()))
}
