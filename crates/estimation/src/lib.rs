//! Estimation (Layer 3)
//!
//! Feature and project estimates from tracked time, seed reconciliation,
//! and scenario comparison.

pub mod estimator;
pub mod reconcile;
pub mod scenario;

pub use estimator::{
    EstimationService, EstimationError, Result, estimate_feature, estimate_project, usable_samples,
    confidence_for, hours_by_feature, SEED_BAND, HIGH_CONFIDENCE_CV, MEDIUM_CONFIDENCE_CV,
};
pub use reconcile::{SeedReconciler, SeedReconciliation, SeedVerdict, reconcile, verdict};
pub use scenario::{ScenarioService, ScenarioComparison, NewScenario};
