//! Group-level drought alerts.
//!
//! Localities are partitioned by region or agro-ecological zone. Each group
//! is represented by a small deterministic sample whose drought assessments
//! are averaged into one group risk level and one alert text.

use crate::alert::drought::DroughtRiskScorer;
use crate::alert::text::{AlertTextFields, encode_alert_text, fallback_alert, parse_alert_text};
use crate::analysis::indicators::IndicatorCalculator;
use crate::analysis::spi::SpiCategory;
use crate::config::{EngineConfig, GroupConfig};
use crate::ingest::{AlertTextSource, AnalysisPeriod, ClimateSource};
use crate::localities::{group_localities, zone_profile};
use crate::logging::{Component, log_group_summary, log_sample_failure};
use crate::model::{EngineError, GroupBy, Locality, RiskLevel};
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

/// Drought summary of one sampled locality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleIndicators {
    pub locality: String,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub spi: f64,
    pub deficit: f64,
    pub dry_days: usize,
}

/// Standing instructions attached to a group alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupRecommendations {
    pub coordination: &'static str,
    pub communication: &'static str,
    pub resources: &'static str,
    pub surveillance: &'static str,
}

impl GroupRecommendations {
    pub fn for_level(level: RiskLevel) -> Self {
        match level {
            RiskLevel::VeryHigh => Self {
                coordination: "Activation cellule de crise régionale",
                communication: "Alerte unifiée à toute la population",
                resources: "Mobilisation ressources d'urgence",
                surveillance: "Monitoring horaire des indicateurs",
            },
            RiskLevel::High => Self {
                coordination: "Réunion hebdomadaire des acteurs",
                communication: "Information ciblée aux agriculteurs",
                resources: "Prépositionnement des ressources",
                surveillance: "Surveillance quotidienne renforcée",
            },
            RiskLevel::Low | RiskLevel::VeryLow => Self {
                coordination: "Réunion mensuelle",
                communication: "Information standard",
                resources: "Maintenance routine",
                surveillance: "Contrôle périodique",
            },
            RiskLevel::Moderate | RiskLevel::Undetermined => Self {
                coordination: "Point bi-hebdomadaire",
                communication: "Bulletin d'information régulier",
                resources: "Évaluation des stocks",
                surveillance: "Monitoring standard",
            },
        }
    }
}

/// Where the alert text of a [`GroupAlert`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextOrigin {
    Generated,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAlert {
    pub group_name: String,
    /// Human label of the grouping, "Région" or "Zone agro-écologique".
    pub group_type: &'static str,
    /// Localities whose assessment succeeded, in sample order.
    pub sample_localities: Vec<String>,
    pub total_localities: usize,
    pub analysis_period: String,
    pub generated_at: DateTime<Utc>,
    pub risk_level: RiskLevel,
    pub avg_risk_score: f64,
    pub high_risk_ratio: f64,
    pub sample_indicators: Vec<SampleIndicators>,
    pub alert: AlertTextFields,
    /// Text exactly as produced by the generator or the template encoder.
    pub raw_alert_text: String,
    pub text_origin: TextOrigin,
    pub recommendations: GroupRecommendations,
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

pub struct GroupAlertAggregator<'a> {
    source: &'a dyn ClimateSource,
    text_source: Option<&'a dyn AlertTextSource>,
    calculator: IndicatorCalculator,
    scorer: DroughtRiskScorer,
    config: GroupConfig,
}

impl<'a> GroupAlertAggregator<'a> {
    pub fn new(config: &EngineConfig, source: &'a dyn ClimateSource) -> Self {
        Self {
            source,
            text_source: None,
            calculator: IndicatorCalculator::new(config.indicators.clone()),
            scorer: DroughtRiskScorer::new(config.drought.clone()),
            config: config.group.clone(),
        }
    }

    /// Use a generative source for alert text; templates remain the fallback.
    pub fn with_text_source(mut self, text_source: &'a dyn AlertTextSource) -> Self {
        self.text_source = Some(text_source);
        self
    }

    /// Deterministic sample of at most `sample_size` localities.
    ///
    /// Every call reseeds its generator, so a group's sample does not depend
    /// on which groups were drawn before it.
    pub fn draw_sample(&self, localities: &[Locality]) -> Vec<Locality> {
        let n = self.config.sample_size.min(localities.len());
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.sample_seed);
        localities.choose_multiple(&mut rng, n).cloned().collect()
    }

    /// Fetch, compute indicators and score one locality.
    pub fn assess_sample(
        &self,
        locality: &Locality,
        period: AnalysisPeriod,
    ) -> Result<SampleIndicators, EngineError> {
        let series = self.source.fetch(locality.latitude, locality.longitude, period)?;
        if series.is_empty() {
            return Err(EngineError::EmptySeries);
        }

        let indicators = self.calculator.compute(&series);
        if let Some(field) = indicators.first_non_finite() {
            return Err(EngineError::NonFiniteValue { field, index: 0 });
        }
        let assessment = self.scorer.assess(&indicators);

        Ok(SampleIndicators {
            locality: locality.name.clone(),
            risk_level: assessment.risk_level,
            risk_score: assessment.risk_score,
            spi: indicators.spi_mean,
            deficit: indicators.precipitation_deficit,
            dry_days: indicators.consecutive_dry_days,
        })
    }

    /// Assess every sampled locality, one worker per sample.
    fn assess_all(
        &self,
        sample: &[Locality],
        period: AnalysisPeriod,
    ) -> Vec<Result<SampleIndicators, EngineError>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(sample.len().max(1))
            .build();

        match pool {
            Ok(pool) => pool.install(|| {
                sample
                    .par_iter()
                    .map(|locality| self.assess_sample(locality, period))
                    .collect()
            }),
            Err(e) => {
                debug!(component = %Component::Group, "thread pool unavailable ({e}), assessing sequentially");
                sample
                    .iter()
                    .map(|locality| self.assess_sample(locality, period))
                    .collect()
            }
        }
    }

    /// Group level from the mean score and the share of high-risk samples.
    pub fn classify_group(&self, avg_score: f64, high_risk_ratio: f64) -> RiskLevel {
        let c = &self.config;
        if high_risk_ratio >= c.very_high_ratio || avg_score >= c.very_high_score {
            RiskLevel::VeryHigh
        } else if high_risk_ratio >= c.high_ratio || avg_score >= c.high_score {
            RiskLevel::High
        } else if high_risk_ratio >= c.moderate_ratio || avg_score >= c.moderate_score {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    /// Alert for one group, or `None` when no sampled locality could be assessed.
    pub fn generate_group_alert(
        &self,
        group_name: &str,
        localities: &[Locality],
        group_by: GroupBy,
        period: AnalysisPeriod,
        now: DateTime<Utc>,
    ) -> Option<GroupAlert> {
        let sample = self.draw_sample(localities);

        let mut indicators = Vec::with_capacity(sample.len());
        for (locality, result) in sample.iter().zip(self.assess_all(&sample, period)) {
            match result {
                Ok(ind) => indicators.push(ind),
                Err(e) => log_sample_failure(group_name, &locality.name, "drought assessment", &e),
            }
        }

        let failed = sample.len() - indicators.len();
        log_group_summary(group_name, sample.len(), indicators.len(), failed);
        if indicators.is_empty() {
            return None;
        }

        let count = indicators.len() as f64;
        let avg_risk_score = indicators.iter().map(|i| i.risk_score).sum::<f64>() / count;
        let high_risk_ratio = indicators.iter().filter(|i| i.risk_level.is_high()).count() as f64 / count;
        let risk_level = self.classify_group(avg_risk_score, high_risk_ratio);

        let (alert, raw_alert_text, text_origin) = self.alert_text(
            group_name,
            group_by,
            &indicators,
            risk_level,
            avg_risk_score,
            localities.len(),
        );

        Some(GroupAlert {
            group_name: group_name.to_string(),
            group_type: group_by.label(),
            sample_localities: indicators.iter().map(|i| i.locality.clone()).collect(),
            total_localities: localities.len(),
            analysis_period: period.label(),
            generated_at: now,
            risk_level,
            avg_risk_score,
            high_risk_ratio,
            sample_indicators: indicators,
            alert,
            raw_alert_text,
            text_origin,
            recommendations: GroupRecommendations::for_level(risk_level),
        })
    }

    fn alert_text(
        &self,
        group_name: &str,
        group_by: GroupBy,
        indicators: &[SampleIndicators],
        level: RiskLevel,
        avg_score: f64,
        total_localities: usize,
    ) -> (AlertTextFields, String, TextOrigin) {
        if let Some(text_source) = self.text_source {
            let prompt = build_group_prompt(group_name, group_by, indicators, level, avg_score, total_localities);
            match text_source.generate(&prompt) {
                Ok(text) => {
                    let fields = parse_alert_text(&text);
                    if fields != AlertTextFields::default() {
                        return (fields, text, TextOrigin::Generated);
                    }
                    warn!(
                        component = %Component::Group,
                        group = group_name,
                        "generated alert has no tagged fields, using template"
                    );
                }
                Err(e) => warn!(
                    component = %Component::Group,
                    group = group_name,
                    "alert text generation failed ({e}), using template"
                ),
            }
        }

        let fields = fallback_alert(level, group_by.label(), group_name, avg_score, indicators.len());
        let text = encode_alert_text(&fields);
        (fields, text, TextOrigin::Fallback)
    }

    /// Alerts for every group, in group-key order. Groups without any
    /// successful sample are left out.
    pub fn generate_alerts(
        &self,
        localities: &[Locality],
        group_by: GroupBy,
        period: AnalysisPeriod,
        now: DateTime<Utc>,
    ) -> Vec<GroupAlert> {
        let groups = group_localities(localities, group_by);
        let total_groups = groups.len();

        let alerts: Vec<GroupAlert> = groups
            .iter()
            .filter_map(|(name, members)| self.generate_group_alert(name, members, group_by, period, now))
            .collect();

        info!(
            component = %Component::Group,
            group_by = group_by.label(),
            groups = total_groups,
            alerts = alerts.len(),
            "group alerts generated"
        );
        alerts
    }
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// Levels in first-seen order with their counts.
fn risk_distribution(indicators: &[SampleIndicators]) -> Vec<(RiskLevel, usize)> {
    let mut distribution: Vec<(RiskLevel, usize)> = Vec::new();
    for ind in indicators {
        match distribution.iter_mut().find(|(level, _)| *level == ind.risk_level) {
            Some((_, count)) => *count += 1,
            None => distribution.push((ind.risk_level, 1)),
        }
    }
    distribution
}

/// Request sent to the generative source for one group.
pub fn build_group_prompt(
    group_name: &str,
    group_by: GroupBy,
    indicators: &[SampleIndicators],
    level: RiskLevel,
    avg_score: f64,
    total_localities: usize,
) -> String {
    let n = indicators.len().max(1) as f64;
    let avg_spi = indicators.iter().map(|i| i.spi).sum::<f64>() / n;
    let avg_deficit = indicators.iter().map(|i| i.deficit).sum::<f64>() / n;
    let high_count = indicators.iter().filter(|i| i.risk_level.is_high()).count();
    let names: Vec<&str> = indicators.iter().map(|i| i.locality.as_str()).collect();

    let mut lines = vec![
        "En tant qu'expert en gestion des risques de sécheresse, génère une alerte stratégique pour un groupe de localités :".to_string(),
        String::new(),
        format!("GROUPE : {group_name}"),
        format!("TYPE : {}", group_by.label()),
        format!("NOMBRE DE LOCALITÉS : {total_localities}"),
        format!("LOCALITÉS ÉCHANTILLONS ANALYSÉES : {}", names.join(", ")),
    ];
    let profile = match group_by {
        GroupBy::Zone => zone_profile(group_name),
        GroupBy::Region => None,
    };
    if let Some(profile) = profile {
        lines.push(format!(
            "PROFIL CLIMATIQUE : {:.0} mm/an, {:.0}°C en moyenne, saison sèche {}, risque habituel {}",
            profile.precip_avg_mm, profile.temp_avg_c, profile.dry_season, profile.typical_risk
        ));
    }
    lines.extend([
        String::new(),
        "INDICATEURS MOYENS DU GROUPE :".to_string(),
        format!("- Niveau de risque : {level} (Score moyen: {avg_score:.1}/100)"),
        format!(
            "- Indice SPI moyen : {avg_spi:.2} ({})",
            SpiCategory::from_value(avg_spi).label()
        ),
        format!("- Déficit pluviométrique moyen : {avg_deficit:.1}%"),
        format!(
            "- Localités à haut risque : {high_count}/{} ({:.1}%)",
            indicators.len(),
            high_count as f64 / n * 100.0
        ),
        String::new(),
        "RÉPARTITION DES RISQUES DANS L'ÉCHANTILLON :".to_string(),
    ]);
    lines.extend(
        risk_distribution(indicators)
            .into_iter()
            .map(|(risk, count)| format!("- {risk}: {count} localités ({:.1}%)", count as f64 / n * 100.0)),
    );
    lines.extend([String::new(), "Format de réponse :".to_string()]);
    lines.extend(
        [
            "TITRE_GROUPE: [titre]",
            "ÉVALUATION: [description stratégique]",
            "ZONES_PRIORITAIRES: [liste des priorités séparées par ;]",
            "ACTIONS_COORDONNÉES: [liste des actions séparées par ;]",
            "PÉRIODE: [période d'intervention]",
            "URGENCE: [niveau d'urgence]",
        ]
        .map(String::from),
    );

    let mut prompt = lines.join("\n");
    prompt.push('\n');
    prompt
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
