//! Estimate model - derived statistics, recomputed on demand.

use serde::{Deserialize, Serialize};
use crate::id::FeatureId;

/// Which central tendency to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationStyle {
    Mean,
    #[default]
    Median,
    P80,
}

impl EstimationStyle {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimationStyle::Mean => "mean",
            EstimationStyle::Median => "median",
            EstimationStyle::P80 => "p80",
        }
    }
}

impl std::fmt::Display for EstimationStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EstimationStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" | "average" => Ok(EstimationStyle::Mean),
            "median" => Ok(EstimationStyle::Median),
            "p80" => Ok(EstimationStyle::P80),
            other => Err(format!("unknown estimation style '{}' (expected mean, median or p80)", other)),
        }
    }
}

/// Confidence in an estimate. Ordered from least to most confident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an estimate's hours came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    /// Not enough history; the seed estimate was used
    Seed,
    /// Computed from tracked time
    Historical,
}

impl EstimateSource {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimateSource::Seed => "seed",
            EstimateSource::Historical => "historical",
        }
    }
}

/// Descriptive statistics over a set of hour samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleStats {
    /// Number of samples
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// 50th percentile
    pub median: f64,
    /// 80th percentile
    pub p80: f64,
    /// Sample standard deviation (n - 1)
    pub std_dev: f64,
    /// Smallest sample
    pub min: f64,
    /// Largest sample
    pub max: f64,
}

impl SampleStats {
    /// The value for a given style.
    pub fn central(&self, style: EstimationStyle) -> f64 {
        match style {
            EstimationStyle::Mean => self.mean,
            EstimationStyle::Median => self.median,
            EstimationStyle::P80 => self.p80,
        }
    }
}

/// Estimate for a single feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEstimate {
    pub feature_id: FeatureId,
    pub feature_name: String,
    pub style: EstimationStyle,
    /// Estimated hours
    pub hours: f64,
    /// Lower edge of the confidence band
    pub low: f64,
    /// Upper edge of the confidence band
    pub high: f64,
    pub confidence: Confidence,
    pub source: EstimateSource,
    /// Samples that fed the statistics
    pub sample_count: usize,
    /// Samples dropped as anomalies
    pub excluded_count: usize,
    /// Statistics when history was used
    pub stats: Option<SampleStats>,
}

/// Estimate for a set of features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEstimate {
    pub style: EstimationStyle,
    pub features: Vec<FeatureEstimate>,
    pub total_hours: f64,
    pub total_low: f64,
    pub total_high: f64,
    /// Lowest confidence among the features
    pub confidence: Confidence,
}

impl ProjectEstimate {
    /// Aggregate feature estimates into a project estimate.
    pub fn from_features(style: EstimationStyle, features: Vec<FeatureEstimate>) -> Self {
        let total_hours = features.iter().map(|f| f.hours).sum();
        let total_low = features.iter().map(|f| f.low).sum();
        let total_high = features.iter().map(|f| f.high).sum();
        let confidence = features
            .iter()
            .map(|f| f.confidence)
            .min()
            .unwrap_or(Confidence::Low);

        Self {
            style,
            features,
            total_hours,
            total_low,
            total_high,
            confidence,
        }
    }

    /// Number of features estimated from seeds only.
    pub fn seed_only_count(&self) -> usize {
        self.features
            .iter()
            .filter(|f| f.source == EstimateSource::Seed)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(hours: f64, confidence: Confidence) -> FeatureEstimate {
        FeatureEstimate {
            feature_id: FeatureId::new(),
            feature_name: "f".to_string(),
            style: EstimationStyle::Median,
            hours,
            low: hours / 2.0,
            high: hours * 2.0,
            confidence,
            source: EstimateSource::Seed,
            sample_count: 0,
            excluded_count: 0,
            stats: None,
        }
    }

    #[test]
    fn test_style_parse() {
        assert_eq!("P80".parse::<EstimationStyle>().unwrap(), EstimationStyle::P80);
        assert_eq!("mean".parse::<EstimationStyle>().unwrap(), EstimationStyle::Mean);
        assert!("mode".parse::<EstimationStyle>().is_err());
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
    }

    #[test]
    fn test_project_totals_and_confidence() {
        let project = ProjectEstimate::from_features(
            EstimationStyle::Median,
            vec![estimate(10.0, Confidence::High), estimate(4.0, Confidence::Medium)],
        );
        assert_eq!(project.total_hours, 14.0);
        assert_eq!(project.total_low, 7.0);
        assert_eq!(project.total_high, 28.0);
        assert_eq!(project.confidence, Confidence::Medium);
        assert_eq!(project.seed_only_count(), 2);
    }

    #[test]
    fn test_empty_project_is_low_confidence() {
        let project = ProjectEstimate::from_features(EstimationStyle::Mean, Vec::new());
        assert_eq!(project.total_hours, 0.0);
        assert_eq!(project.confidence, Confidence::Low);
    }
}
