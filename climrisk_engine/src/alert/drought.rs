//! Drought risk scoring.
//!
//! Additive points per indicator band, classified into five levels. The
//! total is deliberately left uncapped: with every factor triggered it
//! reaches 115, and the level cutoffs apply to whatever total results.

use crate::analysis::indicators::IndicatorSet;
use crate::config::DroughtScoringConfig;
use crate::logging::Component;
use crate::model::RiskLevel;
use serde::Serialize;
use tracing::{debug, warn};

/// Points contributed by each indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DroughtSubScores {
    pub spi: f64,
    pub deficit: f64,
    pub dry_days: f64,
    pub heat: f64,
    pub soil: f64,
}

impl DroughtSubScores {
    pub fn total(&self) -> f64 {
        self.spi + self.deficit + self.dry_days + self.heat + self.soil
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    /// 0 and up; not capped at 100.
    pub risk_score: f64,
    pub risk_color: &'static str,
    /// Triggered factors, in scoring order.
    pub contributing_factors: Vec<String>,
    pub sub_scores: DroughtSubScores,
    pub spi_value: f64,
    pub precipitation_deficit: f64,
    pub avg_temperature: f64,
    pub recommendations: Vec<String>,
}

impl RiskAssessment {
    /// Returned whenever the indicators cannot be scored.
    pub fn undetermined() -> Self {
        Self {
            risk_level: RiskLevel::Undetermined,
            risk_score: 0.0,
            risk_color: RiskLevel::Undetermined.color(),
            contributing_factors: vec!["Données insuffisantes pour l'analyse".to_string()],
            sub_scores: DroughtSubScores::default(),
            spi_value: 0.0,
            precipitation_deficit: 0.0,
            avg_temperature: 25.0,
            recommendations: vec!["Collecter plus de données pour une analyse fiable".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DroughtRiskScorer {
    config: DroughtScoringConfig,
}

impl DroughtRiskScorer {
    pub fn new(config: DroughtScoringConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, score: f64) -> RiskLevel {
        let levels = &self.config.levels;
        if score >= levels.very_high {
            RiskLevel::VeryHigh
        } else if score >= levels.high {
            RiskLevel::High
        } else if score >= levels.moderate {
            RiskLevel::Moderate
        } else if score >= levels.low {
            RiskLevel::Low
        } else {
            RiskLevel::VeryLow
        }
    }

    pub fn assess(&self, indicators: &IndicatorSet) -> RiskAssessment {
        if let Some(field) = indicators.first_non_finite() {
            warn!(component = %Component::Drought, field, "non-finite indicator, risk undetermined");
            return RiskAssessment::undetermined();
        }

        let c = &self.config;
        let mut sub = DroughtSubScores::default();
        let mut factors = Vec::new();
        let mut add = |slot: &mut f64, points: f64, reason: &str| {
            *slot = points;
            factors.push(reason.to_string());
        };

        let spi = indicators.spi_mean;
        if spi <= c.spi_extreme {
            add(&mut sub.spi, 40.0, "SPI très bas (sécheresse extrême)");
        } else if spi <= c.spi_severe {
            add(&mut sub.spi, 30.0, "SPI bas (sécheresse sévère)");
        } else if spi <= c.spi_moderate {
            add(&mut sub.spi, 20.0, "SPI modérément bas");
        } else if spi <= c.spi_mild {
            add(&mut sub.spi, 10.0, "SPI légèrement bas");
        }

        let deficit = indicators.precipitation_deficit;
        if deficit > c.deficit_extreme_pct {
            add(&mut sub.deficit, 30.0, "Déficit pluviométrique extrême");
        } else if deficit > c.deficit_severe_pct {
            add(&mut sub.deficit, 20.0, "Déficit pluviométrique sévère");
        } else if deficit > c.deficit_moderate_pct {
            add(&mut sub.deficit, 10.0, "Déficit pluviométrique modéré");
        }

        let dry_days = indicators.consecutive_dry_days;
        if dry_days > c.dry_days_long {
            add(&mut sub.dry_days, 20.0, "Longue période sans pluie");
        } else if dry_days > c.dry_days_prolonged {
            add(&mut sub.dry_days, 10.0, "Période sèche prolongée");
        }

        if indicators.heat_stress > c.heat_stress_high_pct {
            add(&mut sub.heat, 10.0, "Fort stress thermique");
        }

        let soil = indicators.soil_moisture_mean;
        if soil < c.soil_critical_pct {
            add(&mut sub.soil, 15.0, "Humidité du sol très critique");
        } else if soil < c.soil_low_pct {
            add(&mut sub.soil, 10.0, "Humidité du sol faible");
        }

        let risk_score = sub.total();
        let risk_level = self.classify(risk_score);

        debug!(
            component = %Component::Drought,
            score = risk_score,
            level = %risk_level,
            factors = factors.len(),
            "drought risk assessed"
        );

        RiskAssessment {
            risk_level,
            risk_score,
            risk_color: risk_level.color(),
            contributing_factors: factors,
            sub_scores: sub,
            spi_value: spi,
            precipitation_deficit: deficit,
            avg_temperature: indicators.avg_temperature,
            recommendations: generate_recommendations(risk_level, indicators),
        }
    }
}

/// Level-specific actions plus extras triggered by individual indicators.
pub fn generate_recommendations(level: RiskLevel, indicators: &IndicatorSet) -> Vec<String> {
    let base: &[&str] = match level {
        RiskLevel::High | RiskLevel::VeryHigh => &[
            "Activation des plans d'urgence sécheresse",
            "Restrictions d'eau obligatoires",
            "Mise en place de systèmes d'irrigation d'urgence",
            "Surveillance renforcée des ressources en eau",
            "Préparation à la distribution d'aide humanitaire",
        ],
        RiskLevel::Moderate => &[
            "Sensibilisation des agriculteurs aux économies d'eau",
            "Promotion des pratiques agricoles résilientes",
            "Surveillance accrue des indicateurs climatiques",
            "Planification des mesures de restriction volontaire",
        ],
        _ => &[
            "Surveillance de routine des paramètres climatiques",
            "Maintien des bonnes pratiques de gestion de l'eau",
            "Planification à long terme de l'adaptation climatique",
        ],
    };

    let mut recommendations: Vec<String> = base.iter().map(|s| s.to_string()).collect();
    if indicators.soil_moisture_mean < 30.0 {
        recommendations.push("Irrigation de sauvegarde recommandée pour les cultures sensibles".to_string());
    }
    if indicators.consecutive_dry_days > 15 {
        recommendations.push("Évaluation des besoins en fourrage pour le bétail".to_string());
    }
    if indicators.heat_stress > 40.0 {
        recommendations.push("Mise en place de zones d'ombre et d'abreuvement pour le bétail".to_string());
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worst_case() -> IndicatorSet {
        IndicatorSet {
            spi_mean: -2.1,
            precipitation_deficit: 65.0,
            consecutive_dry_days: 25,
            heat_stress: 55.0,
            soil_moisture_mean: 15.0,
            ..IndicatorSet::default()
        }
    }

    #[test]
    fn test_worst_case_score_is_uncapped() {
        let assessment = DroughtRiskScorer::default().assess(&worst_case());

        assert_eq!(assessment.risk_score, 115.0, "additive score is not capped at 100");
        assert_eq!(assessment.risk_level, RiskLevel::VeryHigh);
        assert_eq!(assessment.risk_color, "red");
        assert_eq!(
            assessment.sub_scores,
            DroughtSubScores { spi: 40.0, deficit: 30.0, dry_days: 20.0, heat: 10.0, soil: 15.0 }
        );
        assert_eq!(
            assessment.contributing_factors,
            vec![
                "SPI très bas (sécheresse extrême)",
                "Déficit pluviométrique extrême",
                "Longue période sans pluie",
                "Fort stress thermique",
                "Humidité du sol très critique",
            ]
        );
    }

    #[test]
    fn test_neutral_indicators_score_zero() {
        let assessment = DroughtRiskScorer::default().assess(&IndicatorSet::default());
        assert_eq!(assessment.risk_score, 0.0);
        assert_eq!(assessment.risk_level, RiskLevel::VeryLow);
        assert!(assessment.contributing_factors.is_empty());
        assert_eq!(assessment.recommendations.len(), 3);
    }

    #[test]
    fn test_band_boundaries() {
        let scorer = DroughtRiskScorer::default();
        let at = |spi, deficit, dry, soil| {
            scorer.assess(&IndicatorSet {
                spi_mean: spi,
                precipitation_deficit: deficit,
                consecutive_dry_days: dry,
                soil_moisture_mean: soil,
                ..IndicatorSet::default()
            })
        };

        // SPI bands are inclusive, deficit/dry-day bands exclusive
        assert_eq!(at(-1.5, 0.0, 0, 50.0).sub_scores.spi, 30.0);
        assert_eq!(at(-0.5, 0.0, 0, 50.0).sub_scores.spi, 10.0);
        assert_eq!(at(-0.49, 0.0, 0, 50.0).sub_scores.spi, 0.0);
        assert_eq!(at(0.0, 60.0, 0, 50.0).sub_scores.deficit, 20.0);
        assert_eq!(at(0.0, 20.0, 0, 50.0).sub_scores.deficit, 0.0);
        assert_eq!(at(0.0, 0.0, 20, 50.0).sub_scores.dry_days, 10.0);
        assert_eq!(at(0.0, 0.0, 10, 50.0).sub_scores.dry_days, 0.0);
        assert_eq!(at(0.0, 0.0, 0, 20.0).sub_scores.soil, 10.0);
        assert_eq!(at(0.0, 0.0, 0, 19.9).sub_scores.soil, 15.0);
    }

    #[test]
    fn test_classification_cutoffs() {
        let scorer = DroughtRiskScorer::default();
        assert_eq!(scorer.classify(70.0), RiskLevel::VeryHigh);
        assert_eq!(scorer.classify(69.9), RiskLevel::High);
        assert_eq!(scorer.classify(50.0), RiskLevel::High);
        assert_eq!(scorer.classify(30.0), RiskLevel::Moderate);
        assert_eq!(scorer.classify(15.0), RiskLevel::Low);
        assert_eq!(scorer.classify(14.9), RiskLevel::VeryLow);
        assert_eq!(scorer.classify(140.0), RiskLevel::VeryHigh);
    }

    #[test]
    fn test_non_finite_indicator_is_undetermined() {
        let indicators = IndicatorSet {
            spi_mean: f64::NAN,
            ..worst_case()
        };
        let assessment = DroughtRiskScorer::default().assess(&indicators);
        assert_eq!(assessment, RiskAssessment::undetermined());
        assert_eq!(assessment.risk_color, "gray");
    }

    #[test]
    fn test_recommendations_follow_level_and_indicators() {
        let recs = generate_recommendations(RiskLevel::VeryHigh, &worst_case());
        assert_eq!(recs.len(), 5 + 3, "emergency list plus soil, fodder and shade extras");
        assert_eq!(recs[0], "Activation des plans d'urgence sécheresse");

        let moderate = generate_recommendations(RiskLevel::Moderate, &IndicatorSet::default());
        assert_eq!(moderate.len(), 4);
    }

    #[test]
    fn test_custom_cutoffs_apply() {
        let mut config = DroughtScoringConfig::default();
        config.levels.very_high = 120.0;
        let assessment = DroughtRiskScorer::new(config).assess(&worst_case());
        assert_eq!(assessment.risk_level, RiskLevel::High);
    }
}
