//! Flood alert levels.
//!
//! The flood scorer's adjusted score (0 to 1) is bucketed here, and each
//! level carries the fixed color, lead time and action communicated to the
//! population.

use serde::Serialize;

/// Flood alert levels, in ascending order of severity.
///
/// `Unknown` is only produced when the inputs could not be scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FloodAlertLevel {
    #[serde(rename = "Inconnu")]
    Unknown,
    Vigilance,
    #[serde(rename = "Pré-alerte")]
    PreAlert,
    #[serde(rename = "Alerte")]
    Alert,
    #[serde(rename = "Alerte Maximale")]
    MaximumAlert,
}

/// What an alert level means operationally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertDetails {
    pub color: &'static str,
    /// Lead time before the expected impact.
    pub delay_window: &'static str,
    pub recommended_action: &'static str,
}

impl FloodAlertLevel {
    pub fn label(&self) -> &'static str {
        match self {
            FloodAlertLevel::Unknown => "Inconnu",
            FloodAlertLevel::Vigilance => "Vigilance",
            FloodAlertLevel::PreAlert => "Pré-alerte",
            FloodAlertLevel::Alert => "Alerte",
            FloodAlertLevel::MaximumAlert => "Alerte Maximale",
        }
    }

    pub fn details(&self) -> AlertDetails {
        let (color, delay_window, recommended_action) = match self {
            FloodAlertLevel::Unknown => ("gray", "-", "Vérifier les données d'entrée"),
            FloodAlertLevel::Vigilance => ("green", "72-48h", "Surveillance renforcée"),
            FloodAlertLevel::PreAlert => ("yellow", "48-24h", "Préparation communautaire"),
            FloodAlertLevel::Alert => ("orange", "24-6h", "Mise en sécurité biens/matériels"),
            FloodAlertLevel::MaximumAlert => ("red", "<6h", "Évacuation populations"),
        };
        AlertDetails {
            color,
            delay_window,
            recommended_action,
        }
    }
}

impl std::fmt::Display for FloodAlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Buckets an intensity-adjusted flood score into an alert level.
///
/// Non-finite scores map to `Unknown`.
pub fn check_flood_level(adjusted_score: f64) -> FloodAlertLevel {
    if !adjusted_score.is_finite() {
        FloodAlertLevel::Unknown
    } else if adjusted_score >= 0.8 {
        FloodAlertLevel::MaximumAlert
    } else if adjusted_score >= 0.6 {
        FloodAlertLevel::Alert
    } else if adjusted_score >= 0.4 {
        FloodAlertLevel::PreAlert
    } else {
        FloodAlertLevel::Vigilance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_level_cutoffs() {
        assert_eq!(check_flood_level(0.0), FloodAlertLevel::Vigilance);
        assert_eq!(check_flood_level(0.39), FloodAlertLevel::Vigilance);
        assert_eq!(check_flood_level(0.4), FloodAlertLevel::PreAlert);
        assert_eq!(check_flood_level(0.6), FloodAlertLevel::Alert);
        assert_eq!(check_flood_level(0.8), FloodAlertLevel::MaximumAlert);
        assert_eq!(check_flood_level(1.0), FloodAlertLevel::MaximumAlert);
        assert_eq!(check_flood_level(f64::NAN), FloodAlertLevel::Unknown);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(FloodAlertLevel::Vigilance < FloodAlertLevel::PreAlert);
        assert!(FloodAlertLevel::PreAlert < FloodAlertLevel::Alert);
        assert!(FloodAlertLevel::Alert < FloodAlertLevel::MaximumAlert);
    }

    #[test]
    fn test_maximum_alert_means_evacuation() {
        let details = FloodAlertLevel::MaximumAlert.details();
        assert_eq!(details.color, "red");
        assert_eq!(details.delay_window, "<6h");
        assert_eq!(details.recommended_action, "Évacuation populations");
    }
}
