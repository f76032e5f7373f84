//! Core data types for the climate risk engine.
//!
//! This module defines the shared domain model imported by all other modules:
//! climate series, localities, ordinal risk levels and the engine error type.
//! It contains no scoring logic and performs no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Climate series
// ---------------------------------------------------------------------------

/// One daily (or hourly, for flood scoring) climate observation.
///
/// Units: precipitation and ET0 in mm, temperatures in °C, soil moisture
/// and relative humidity in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateRecord {
    pub timestamp: DateTime<Utc>,
    pub precipitation: f64,
    pub temperature_max: f64,
    pub temperature_min: f64,
    pub et0: f64,
    pub soil_moisture: f64,
    pub relative_humidity: f64,
}

impl ClimateRecord {
    /// Daily mean temperature, taken as the midpoint of min and max.
    pub fn temperature_mean(&self) -> f64 {
        (self.temperature_max + self.temperature_min) / 2.0
    }

    fn first_non_finite(&self) -> Option<&'static str> {
        [
            ("precipitation", self.precipitation),
            ("temperature_max", self.temperature_max),
            ("temperature_min", self.temperature_min),
            ("et0", self.et0),
            ("soil_moisture", self.soil_moisture),
            ("relative_humidity", self.relative_humidity),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }
}

/// Column-oriented view of a series, as most weather providers return it.
///
/// Converted into a [`ClimateSeries`] with [`ClimateSeries::from_columns`],
/// which enforces equal lengths.
#[derive(Debug, Clone, Copy)]
pub struct SeriesColumns<'a> {
    pub timestamps: &'a [DateTime<Utc>],
    pub precipitation: &'a [f64],
    pub temperature_max: &'a [f64],
    pub temperature_min: &'a [f64],
    pub et0: &'a [f64],
    pub soil_moisture: &'a [f64],
    pub relative_humidity: &'a [f64],
}

/// An ordered, validated climate time series for a single locality.
///
/// Invariants (checked at construction):
///   - timestamps strictly increasing
///   - every channel value finite
///
/// Records are stored row-wise, so all channels always have equal length.
/// An empty series is valid; downstream components return documented
/// defaults for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClimateSeries {
    records: Vec<ClimateRecord>,
}

impl ClimateSeries {
    pub fn new(records: Vec<ClimateRecord>) -> Result<Self, EngineError> {
        for (index, record) in records.iter().enumerate() {
            if let Some(field) = record.first_non_finite() {
                return Err(EngineError::NonFiniteValue { field, index });
            }
            if index > 0 && record.timestamp <= records[index - 1].timestamp {
                return Err(EngineError::NonMonotonicTimestamps { index });
            }
        }
        Ok(Self { records })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a series from parallel channel slices.
    ///
    /// Every channel must have the same length as `timestamps`.
    pub fn from_columns(columns: SeriesColumns<'_>) -> Result<Self, EngineError> {
        let expected = columns.timestamps.len();
        let channels: [(&'static str, &[f64]); 6] = [
            ("precipitation", columns.precipitation),
            ("temperature_max", columns.temperature_max),
            ("temperature_min", columns.temperature_min),
            ("et0", columns.et0),
            ("soil_moisture", columns.soil_moisture),
            ("relative_humidity", columns.relative_humidity),
        ];
        for (field, values) in channels {
            if values.len() != expected {
                return Err(EngineError::LengthMismatch {
                    field,
                    expected,
                    found: values.len(),
                });
            }
        }

        let records = (0..expected)
            .map(|i| ClimateRecord {
                timestamp: columns.timestamps[i],
                precipitation: columns.precipitation[i],
                temperature_max: columns.temperature_max[i],
                temperature_min: columns.temperature_min[i],
                et0: columns.et0[i],
                soil_moisture: columns.soil_moisture[i],
                relative_humidity: columns.relative_humidity[i],
            })
            .collect();
        Self::new(records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ClimateRecord] {
        &self.records
    }

    /// The first `n` records (or all of them if the series is shorter).
    pub fn head(&self, n: usize) -> &[ClimateRecord] {
        &self.records[..n.min(self.records.len())]
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.records.iter().map(|r| r.timestamp).collect()
    }

    pub fn precipitation(&self) -> Vec<f64> {
        self.column(|r| r.precipitation)
    }

    pub fn temperature_max(&self) -> Vec<f64> {
        self.column(|r| r.temperature_max)
    }

    pub fn et0(&self) -> Vec<f64> {
        self.column(|r| r.et0)
    }

    pub fn soil_moisture(&self) -> Vec<f64> {
        self.column(|r| r.soil_moisture)
    }

    pub fn relative_humidity(&self) -> Vec<f64> {
        self.column(|r| r.relative_humidity)
    }

    fn column(&self, f: impl Fn(&ClimateRecord) -> f64) -> Vec<f64> {
        self.records.iter().map(f).collect()
    }
}

// ---------------------------------------------------------------------------
// Computation outcomes
// ---------------------------------------------------------------------------

/// Why a numerical method fell back to a simpler formula.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FallbackReason {
    /// Series too short for the windowed method; per-point z-score used.
    ShortSeries,
    /// Distribution fit failed (degenerate sample, non-convergence).
    FitFailed(String),
    /// Fit succeeded but the transformed value was infinite or NaN.
    NonFinite,
}

/// A computed value tagged with the path that produced it.
///
/// Tests assert on the variant, callers usually just want [`Outcome::value`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Outcome<T> {
    Fitted(T),
    Fallback { value: T, reason: FallbackReason },
}

impl<T: Copy> Outcome<T> {
    pub fn value(&self) -> T {
        match self {
            Outcome::Fitted(v) => *v,
            Outcome::Fallback { value, .. } => *value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback { .. })
    }
}

// ---------------------------------------------------------------------------
// Risk levels
// ---------------------------------------------------------------------------

/// Ordinal drought risk classification, in ascending order of severity.
///
/// `Undetermined` sorts below every real level; it is only produced by the
/// failure path of a scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Indéterminé")]
    Undetermined,
    #[serde(rename = "Très Faible")]
    VeryLow,
    #[serde(rename = "Faible")]
    Low,
    #[serde(rename = "Modéré")]
    Moderate,
    #[serde(rename = "Élevé")]
    High,
    #[serde(rename = "Très Élevé")]
    VeryHigh,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 6] = [
        RiskLevel::Undetermined,
        RiskLevel::VeryLow,
        RiskLevel::Low,
        RiskLevel::Moderate,
        RiskLevel::High,
        RiskLevel::VeryHigh,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Undetermined => "Indéterminé",
            RiskLevel::VeryLow => "Très Faible",
            RiskLevel::Low => "Faible",
            RiskLevel::Moderate => "Modéré",
            RiskLevel::High => "Élevé",
            RiskLevel::VeryHigh => "Très Élevé",
        }
    }

    /// Display color token used by dashboards.
    pub fn color(&self) -> &'static str {
        match self {
            RiskLevel::Undetermined => "gray",
            RiskLevel::VeryLow => "green",
            RiskLevel::Low => "blue",
            RiskLevel::Moderate => "yellow",
            RiskLevel::High => "orange",
            RiskLevel::VeryHigh => "red",
        }
    }

    /// `Élevé` or `Très Élevé`.
    pub fn is_high(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::VeryHigh)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Localities
// ---------------------------------------------------------------------------

/// Predominant flood mechanism at a locality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloodType {
    #[serde(rename = "Côtière")]
    Coastal,
    #[serde(rename = "Pluviale")]
    Pluvial,
    #[serde(rename = "Fluviale")]
    Fluvial,
    #[serde(rename = "Mixte")]
    Mixed,
}

impl FloodType {
    pub fn label(&self) -> &'static str {
        match self {
            FloodType::Coastal => "Côtière",
            FloodType::Pluvial => "Pluviale",
            FloodType::Fluvial => "Fluviale",
            FloodType::Mixed => "Mixte",
        }
    }

    /// Parses a catalog label. Unknown labels map to `Mixed`.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Côtière" => FloodType::Coastal,
            "Pluviale" => FloodType::Pluvial,
            "Fluviale" => FloodType::Fluvial,
            _ => FloodType::Mixed,
        }
    }
}

/// A monitored locality and the metadata the scorers need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locality {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above sea level.
    pub altitude: f64,
    /// Administrative region.
    pub region: String,
    /// Agro-ecological zone.
    pub zone: String,
    pub country: String,
    pub flood_type: FloodType,
    /// Free-text, comma-separated list as found in locality catalogs.
    pub aggravating_factors: String,
}

/// Key used to partition localities for group alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupBy {
    Region,
    Zone,
}

impl GroupBy {
    pub fn label(&self) -> &'static str {
        match self {
            GroupBy::Region => "Région",
            GroupBy::Zone => "Zone agro-écologique",
        }
    }

    pub fn key<'a>(&self, locality: &'a Locality) -> &'a str {
        match self {
            GroupBy::Region => &locality.region,
            GroupBy::Zone => &locality.zone,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised at the engine's construction and collaborator boundaries.
///
/// Scoring operations never return these; they degrade to default values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("climate series is empty")]
    EmptySeries,
    #[error("channel {field} has {found} values, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("timestamps not strictly increasing at index {index}")]
    NonMonotonicTimestamps { index: usize },
    #[error("non-finite {field} at index {index}")]
    NonFiniteValue { field: &'static str, index: usize },
    /// The external weather source could not provide a series.
    #[error("climate source unavailable: {0}")]
    SourceUnavailable(String),
    /// The external generative text source failed.
    #[error("alert text source unavailable: {0}")]
    TextSourceUnavailable(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record(day: i64, precipitation: f64) -> ClimateRecord {
        ClimateRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::days(day),
            precipitation,
            temperature_max: 33.0,
            temperature_min: 21.0,
            et0: 4.0,
            soil_moisture: 40.0,
            relative_humidity: 60.0,
        }
    }

    #[test]
    fn test_series_rejects_out_of_order_timestamps() {
        let result = ClimateSeries::new(vec![record(1, 0.0), record(0, 0.0)]);
        assert_eq!(result, Err(EngineError::NonMonotonicTimestamps { index: 1 }));
    }

    #[test]
    fn test_series_rejects_duplicate_timestamps() {
        let result = ClimateSeries::new(vec![record(0, 0.0), record(0, 1.0)]);
        assert!(result.is_err(), "equal timestamps are not strictly increasing");
    }

    #[test]
    fn test_series_rejects_nan_channel() {
        let mut bad = record(0, 0.0);
        bad.soil_moisture = f64::NAN;
        let result = ClimateSeries::new(vec![bad]);
        assert_eq!(
            result,
            Err(EngineError::NonFiniteValue { field: "soil_moisture", index: 0 })
        );
    }

    #[test]
    fn test_from_columns_detects_short_channel() {
        let ts = [record(0, 0.0).timestamp, record(1, 0.0).timestamp];
        let two = [1.0, 2.0];
        let one = [1.0];
        let result = ClimateSeries::from_columns(SeriesColumns {
            timestamps: &ts,
            precipitation: &two,
            temperature_max: &two,
            temperature_min: &two,
            et0: &one,
            soil_moisture: &two,
            relative_humidity: &two,
        });
        assert_eq!(
            result,
            Err(EngineError::LengthMismatch { field: "et0", expected: 2, found: 1 })
        );
    }

    #[test]
    fn test_head_is_bounded_by_length() {
        let series = ClimateSeries::new(vec![record(0, 1.0), record(1, 2.0)]).unwrap();
        assert_eq!(series.head(24).len(), 2);
        assert_eq!(series.head(1).len(), 1);
    }

    #[test]
    fn test_risk_level_ordering_matches_severity() {
        assert!(RiskLevel::Undetermined < RiskLevel::VeryLow);
        assert!(RiskLevel::VeryLow < RiskLevel::Low);
        assert!(RiskLevel::Low < RiskLevel::Moderate);
        assert!(RiskLevel::Moderate < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::VeryHigh);
    }

    #[test]
    fn test_risk_level_serializes_as_french_label() {
        let json = serde_json::to_string(&RiskLevel::VeryHigh).unwrap();
        assert_eq!(json, "\"Très Élevé\"");
    }

    #[test]
    fn test_flood_type_unknown_label_is_mixed() {
        assert_eq!(FloodType::from_label("Côtière"), FloodType::Coastal);
        assert_eq!(FloodType::from_label("lacustre"), FloodType::Mixed);
    }
}
