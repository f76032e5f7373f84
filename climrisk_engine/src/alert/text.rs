//! Tagged alert text format.
//!
//! Group alerts travel as six `TAG: value` lines:
//!
//! ```text
//! TITRE_GROUPE: CRISE - Région Extrême-Nord
//! ÉVALUATION: Situation de crise ...
//! ZONES_PRIORITAIRES: Toute la zone affectée; Secteurs agricoles prioritaires
//! ACTIONS_COORDONNÉES: Plan d'urgence régional activé; Ressources mutualisées
//! PÉRIODE: Immédiate - 30 jours
//! URGENCE: CRITIQUE
//! ```
//!
//! Both the deterministic templates and any generative source produce this
//! format, and [`parse_alert_text`] reads either back.

use crate::model::RiskLevel;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTag {
    Title,
    Evaluation,
    PriorityZones,
    CoordinatedActions,
    Period,
    Urgency,
}

impl AlertTag {
    /// Wire order.
    pub const ALL: [AlertTag; 6] = [
        AlertTag::Title,
        AlertTag::Evaluation,
        AlertTag::PriorityZones,
        AlertTag::CoordinatedActions,
        AlertTag::Period,
        AlertTag::Urgency,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            AlertTag::Title => "TITRE_GROUPE",
            AlertTag::Evaluation => "ÉVALUATION",
            AlertTag::PriorityZones => "ZONES_PRIORITAIRES",
            AlertTag::CoordinatedActions => "ACTIONS_COORDONNÉES",
            AlertTag::Period => "PÉRIODE",
            AlertTag::Urgency => "URGENCE",
        }
    }
}

/// Structured content of a group alert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertTextFields {
    pub title: String,
    pub evaluation: String,
    pub priority_zones: Vec<String>,
    pub coordinated_actions: Vec<String>,
    pub period: String,
    pub urgency: String,
}

impl AlertTextFields {
    /// True when every one of the six fields has content.
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty()
            && !self.evaluation.is_empty()
            && !self.priority_zones.is_empty()
            && !self.coordinated_actions.is_empty()
            && !self.period.is_empty()
            && !self.urgency.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn one_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn join_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| one_line(&item.replace(';', ",")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Writes the six tagged lines in wire order.
///
/// Line breaks inside values collapse to spaces and `;` inside list items
/// becomes `,` so the output always parses back to the same fields.
pub fn encode_alert_text(fields: &AlertTextFields) -> String {
    AlertTag::ALL
        .iter()
        .map(|tag| {
            let value = match tag {
                AlertTag::Title => one_line(&fields.title),
                AlertTag::Evaluation => one_line(&fields.evaluation),
                AlertTag::PriorityZones => join_list(&fields.priority_zones),
                AlertTag::CoordinatedActions => join_list(&fields.coordinated_actions),
                AlertTag::Period => one_line(&fields.period),
                AlertTag::Urgency => one_line(&fields.urgency),
            };
            format!("{}: {}", tag.tag(), value)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Reads tagged lines in any order.
///
/// Leading indentation is ignored, unknown lines are skipped, a repeated
/// tag keeps its last value and missing tags leave their field empty.
pub fn parse_alert_text(text: &str) -> AlertTextFields {
    let mut fields = AlertTextFields::default();

    for line in text.lines() {
        let line = line.trim_start();
        for tag in AlertTag::ALL {
            let Some(rest) = line.strip_prefix(tag.tag()) else {
                continue;
            };
            let Some(value) = rest.strip_prefix(':') else {
                continue;
            };
            let value = value.trim();
            match tag {
                AlertTag::Title => fields.title = value.to_string(),
                AlertTag::Evaluation => fields.evaluation = value.to_string(),
                AlertTag::PriorityZones => fields.priority_zones = split_list(value),
                AlertTag::CoordinatedActions => fields.coordinated_actions = split_list(value),
                AlertTag::Period => fields.period = value.to_string(),
                AlertTag::Urgency => fields.urgency = value.to_string(),
            }
            break;
        }
    }
    fields
}

// ---------------------------------------------------------------------------
// Fallback templates
// ---------------------------------------------------------------------------

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Deterministic alert used when no generative source is available.
///
/// `group_type` is the human label of the grouping ("Région", ...).
pub fn fallback_alert(
    level: RiskLevel,
    group_type: &str,
    group_name: &str,
    avg_score: f64,
    sample_count: usize,
) -> AlertTextFields {
    let based_on = format!(" Basé sur l'analyse de {sample_count} localités échantillons.");

    let mut fields = match level {
        RiskLevel::VeryHigh => AlertTextFields {
            title: format!("CRISE - {group_type} {group_name}"),
            evaluation: format!(
                "Situation de crise avec un risque moyen de {avg_score:.1}%. Intervention coordonnée requise."
            ),
            priority_zones: strings(&[
                "Toute la zone affectée",
                "Secteurs agricoles prioritaires",
                "Zones de concentration population",
            ]),
            coordinated_actions: strings(&[
                "Plan d'urgence régional activé",
                "Coordination inter-services renforcée",
                "Ressources mutualisées",
                "Communication unifiée",
            ]),
            period: "Immédiate - 30 jours".to_string(),
            urgency: "CRITIQUE".to_string(),
        },
        RiskLevel::High => AlertTextFields {
            title: format!("ALERTE - {group_type} {group_name}"),
            evaluation: format!("Risque élevé ({avg_score:.1}%) nécessitant une action coordonnée."),
            priority_zones: strings(&["Sous-régions les plus affectées", "Bassins versants critiques"]),
            coordinated_actions: strings(&[
                "Surveillance renforcée",
                "Planification des restrictions",
                "Coordination locale",
            ]),
            period: "15-45 jours".to_string(),
            urgency: "ÉLEVÉE".to_string(),
        },
        RiskLevel::Low | RiskLevel::VeryLow => AlertTextFields {
            title: format!("SURVEILLANCE - {group_type} {group_name}"),
            evaluation: format!("Situation normale ({avg_score:.1}%). Surveillance de routine maintenue."),
            priority_zones: strings(&["Zones habituellement sensibles"]),
            coordinated_actions: strings(&["Contrôle périodique", "Mise à jour des plans de contingence"]),
            period: "1-3 mois".to_string(),
            urgency: "FAIBLE".to_string(),
        },
        RiskLevel::Moderate | RiskLevel::Undetermined => AlertTextFields {
            title: format!("VIGILANCE - {group_type} {group_name}"),
            evaluation: format!("Situation sous surveillance ({avg_score:.1}%)."),
            priority_zones: strings(&["Points chauds identifiés"]),
            coordinated_actions: strings(&["Monitoring continu", "Préparation des plans"]),
            period: "1-2 mois".to_string(),
            urgency: "MODÉRÉE".to_string(),
        },
    };
    fields.title = fields.title.trim().to_string();
    fields.evaluation.push_str(&based_on);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_roundtrip_for_every_level() {
        for level in RiskLevel::ALL {
            let fields = fallback_alert(level, "Région", "Nord", 42.0, 3);
            let parsed = parse_alert_text(&encode_alert_text(&fields));
            assert_eq!(parsed, fields, "round-trip changed fields for {level}");
            assert!(parsed.is_complete(), "empty field for {level}");
        }
    }

    #[test]
    fn test_parser_tolerates_indentation_order_and_noise() {
        let text = "
            Voici l'alerte demandée :
            URGENCE: CRITIQUE
            ZONES_PRIORITAIRES: Logone ;  ; Mayo-Danay;
            TITRE_GROUPE: CRISE - Région Extrême-Nord
        ";
        let parsed = parse_alert_text(text);
        assert_eq!(parsed.title, "CRISE - Région Extrême-Nord");
        assert_eq!(parsed.urgency, "CRITIQUE");
        assert_eq!(parsed.priority_zones, vec!["Logone", "Mayo-Danay"]);
        assert!(parsed.evaluation.is_empty(), "missing tags stay empty");
        assert!(parsed.coordinated_actions.is_empty());
        assert!(!parsed.is_complete());
    }

    #[test]
    fn test_repeated_tag_keeps_last() {
        let parsed = parse_alert_text("PÉRIODE: 1 mois\nPÉRIODE: 2 mois");
        assert_eq!(parsed.period, "2 mois");
    }

    #[test]
    fn test_tag_must_be_followed_by_colon() {
        let parsed = parse_alert_text("URGENCES: haute\nURGENCE:haute");
        assert_eq!(parsed.urgency, "haute");
    }

    #[test]
    fn test_encoder_keeps_grammar_intact() {
        let fields = AlertTextFields {
            title: "Titre\nsur deux lignes".to_string(),
            evaluation: "Éval".to_string(),
            priority_zones: vec!["A; B".to_string()],
            coordinated_actions: vec!["Agir".to_string()],
            period: "1 mois".to_string(),
            urgency: "FAIBLE".to_string(),
        };
        let text = encode_alert_text(&fields);
        assert_eq!(text.lines().count(), 6);
        assert!(text.starts_with("TITRE_GROUPE: Titre sur deux lignes\n"));

        let parsed = parse_alert_text(&text);
        assert_eq!(parsed.priority_zones, vec!["A, B"]);
    }

    #[test]
    fn test_fallback_templates_per_level() {
        let crisis = fallback_alert(RiskLevel::VeryHigh, "Zone agro-écologique", "Soudano-sahélienne", 81.25, 3);
        assert_eq!(crisis.title, "CRISE - Zone agro-écologique Soudano-sahélienne");
        assert_eq!(crisis.urgency, "CRITIQUE");
        assert!(crisis.evaluation.contains("81.2%") || crisis.evaluation.contains("81.3%"));
        assert!(crisis.evaluation.ends_with("Basé sur l'analyse de 3 localités échantillons."));

        let undetermined = fallback_alert(RiskLevel::Undetermined, "Région", "Est", 0.0, 1);
        assert_eq!(undetermined.urgency, "MODÉRÉE");
        assert_eq!(fallback_alert(RiskLevel::VeryLow, "Région", "Est", 5.0, 2).urgency, "FAIBLE");
        assert_eq!(fallback_alert(RiskLevel::High, "Région", "Est", 55.0, 2).period, "15-45 jours");
    }
}
