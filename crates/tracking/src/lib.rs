//! Time Tracking (Layer 2)
//!
//! Import of tracked time, single-entry recording, and data quality checks.

#![warn(missing_docs)]

pub mod service;
pub mod import;
pub mod quality;

pub use service::{TimeTrackingService, TrackingError, ImportSummary};
pub use import::{ImportFormat, RawRecord, parse_records, resolve_records, parse_date};
pub use quality::{
    QualityReport, DuplicateGroup, Anomaly, analyze, detect_duplicates, detect_anomalies,
    detect_orphans, flag_anomalies,
};
