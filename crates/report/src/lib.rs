//! Reporting (Layer 4)
//!
//! Tracked time summaries and rendering of estimates as tables, CSV and JSON.

pub mod service;
pub mod render;

pub use service::{ReportService, ReportError, TrackingSummary, Result, UNKNOWN_LABEL};
pub use render::{
    OutputFormat, to_json, estimate_table, estimate_csv, bar_chart, summary_table, feature_table,
    entries_table, reconciliation_table, quality_table, scenario_table,
};
