//! Flood risk scoring from hourly observations and locality metadata.
//!
//! Composite of four sub-indices:
//!   - FFG, flash-flood guidance from peak and accumulated rainfall
//!   - IFS, surface runoff from imperviousness, rainfall and humidity
//!   - soil saturation, damped at altitude
//!   - a normalized flood-type factor
//!
//! The composite is then scaled by peak hourly intensity and bucketed by
//! [`check_flood_level`].

use crate::alert::thresholds::{check_flood_level, AlertDetails, FloodAlertLevel};
use crate::config::FloodConfig;
use crate::logging::Component;
use crate::model::{ClimateSeries, FloodType, Locality};
use serde::Serialize;
use tracing::{debug, warn};

const DEFAULT_HUMIDITY: f64 = 60.0;
const DEFAULT_SOIL_MOISTURE: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloodDetails {
    pub ffg_score: f64,
    pub ifs_score: f64,
    pub soil_saturation: f64,
    pub type_factor: f64,
    pub precipitation_24h: f64,
    pub max_hourly_precip: f64,
    pub flood_type: FloodType,
    pub alert_details: AlertDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloodAssessment {
    pub alert_level: FloodAlertLevel,
    /// Weighted composite, before intensity adjustment.
    pub risk_score: f64,
    pub adjusted_score: f64,
    pub details: FloodDetails,
}

impl FloodAssessment {
    pub fn unknown(flood_type: FloodType) -> Self {
        Self {
            alert_level: FloodAlertLevel::Unknown,
            risk_score: 0.0,
            adjusted_score: 0.0,
            details: FloodDetails {
                ffg_score: 0.0,
                ifs_score: 0.0,
                soil_saturation: 0.0,
                type_factor: 0.0,
                precipitation_24h: 0.0,
                max_hourly_precip: 0.0,
                flood_type,
                alert_details: FloodAlertLevel::Unknown.details(),
            },
        }
    }
}

/// FFG threshold multiplier; lower is more sensitive.
pub fn ffg_type_factor(flood_type: FloodType) -> f64 {
    match flood_type {
        FloodType::Coastal => 0.8,
        FloodType::Pluvial => 1.0,
        FloodType::Fluvial | FloodType::Mixed => 1.2,
    }
}

/// Imperviousness from zone and aggravating-factor keywords.
pub fn imperviousness_factor(zone: &str, aggravating_factors: &str) -> f64 {
    let zone = zone.to_lowercase();
    let factors = aggravating_factors.to_lowercase();
    if factors.contains("urbanisation") {
        1.5
    } else if zone.contains("urbain") || zone.contains("côtière") {
        1.3
    } else {
        1.0
    }
}

/// Flood-type weight, raised by drainage or clearing problems, normalized
/// to [0, 1].
pub fn normalized_type_factor(flood_type: FloodType, aggravating_factors: &str) -> f64 {
    let mut base: f64 = match flood_type {
        FloodType::Coastal => 1.2,
        FloodType::Pluvial => 1.1,
        FloodType::Fluvial => 1.0,
        FloodType::Mixed => 1.15,
    };
    let factors = aggravating_factors.to_lowercase();
    if factors.contains("drainage insuffisant") || factors.contains("défrichement") {
        base *= 1.2;
    }
    base.min(1.5) / 1.5
}

#[derive(Debug, Clone, Default)]
pub struct FloodRiskScorer {
    config: FloodConfig,
}

impl FloodRiskScorer {
    pub fn new(config: FloodConfig) -> Self {
        Self { config }
    }

    fn ffg(&self, max_hourly: f64, total: f64, flood_type: FloodType) -> f64 {
        let factor = ffg_type_factor(flood_type);
        let hourly_term = max_hourly / (self.config.intensity_hourly_mm * factor) * 0.6;
        let daily_term = total / (self.config.cumul_daily_mm * factor) * 0.4;
        (hourly_term + daily_term).min(1.0)
    }

    fn ifs(&self, mean_precip: f64, mean_humidity: f64, locality: &Locality) -> f64 {
        let imperv = imperviousness_factor(&locality.zone, &locality.aggravating_factors);
        let intensity = (mean_precip / 20.0).min(1.0);
        (imperv * (intensity * 0.7 + mean_humidity / 100.0 * 0.3)).min(1.0)
    }

    fn soil_saturation(&self, soil_moisture: f64, altitude: f64) -> f64 {
        let altitude_factor = (1.0 - altitude / 1000.0).max(0.5);
        (soil_moisture / self.config.soil_saturation_pct).min(1.0) * altitude_factor
    }

    /// Scores the first `window_hours` records of an hourly series.
    pub fn assess(&self, hourly: &ClimateSeries, locality: &Locality) -> FloodAssessment {
        if !locality.altitude.is_finite() {
            warn!(
                component = %Component::Flood,
                locality = %locality.name,
                "non-finite altitude, flood risk unknown"
            );
            return FloodAssessment::unknown(locality.flood_type);
        }

        let window = hourly.head(self.config.window_hours);
        let precipitation: Vec<f64> = window.iter().map(|r| r.precipitation).collect();

        let total: f64 = precipitation.iter().sum();
        let max_hourly = precipitation.iter().copied().fold(0.0, f64::max);
        let (mean_precip, mean_humidity, soil_moisture) = match window.first() {
            Some(first) => (
                total / window.len() as f64,
                window.iter().map(|r| r.relative_humidity).sum::<f64>() / window.len() as f64,
                first.soil_moisture,
            ),
            None => (0.0, DEFAULT_HUMIDITY, DEFAULT_SOIL_MOISTURE),
        };

        let ffg_score = self.ffg(max_hourly, total, locality.flood_type);
        let ifs_score = self.ifs(mean_precip, mean_humidity, locality);
        let soil_saturation = self.soil_saturation(soil_moisture, locality.altitude);
        let type_factor = normalized_type_factor(locality.flood_type, &locality.aggravating_factors);

        let risk_score = ffg_score * 0.4 + ifs_score * 0.3 + soil_saturation * 0.2 + type_factor * 0.1;
        let intensity_factor = (max_hourly / self.config.intensity_hourly_mm).min(2.0);
        let adjusted_score = (risk_score * intensity_factor).min(1.0);

        if !risk_score.is_finite() || !adjusted_score.is_finite() {
            warn!(
                component = %Component::Flood,
                locality = %locality.name,
                "non-finite flood score, flood risk unknown"
            );
            return FloodAssessment::unknown(locality.flood_type);
        }

        let alert_level = check_flood_level(adjusted_score);
        debug!(
            component = %Component::Flood,
            locality = %locality.name,
            risk_score,
            adjusted_score,
            level = %alert_level,
            "flood risk assessed"
        );

        FloodAssessment {
            alert_level,
            risk_score,
            adjusted_score,
            details: FloodDetails {
                ffg_score,
                ifs_score,
                soil_saturation,
                type_factor,
                precipitation_24h: total,
                max_hourly_precip: max_hourly,
                flood_type: locality.flood_type,
                alert_details: alert_level.details(),
            },
        }
    }
}
