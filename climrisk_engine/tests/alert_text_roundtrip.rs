/// Integration tests for the tagged alert text format
///
/// These tests verify:
/// 1. Every template parses back to the fields it was built from
/// 2. Indented, reordered generator output is accepted by group alerts
/// 3. Group alerts keep the raw text they were built from
///
/// Run with: cargo test --test alert_text_roundtrip

use chrono::{TimeZone, Utc};
use climrisk_engine::alert::group::{GroupAlertAggregator, TextOrigin};
use climrisk_engine::alert::text::{AlertTag, encode_alert_text, fallback_alert, parse_alert_text};
use climrisk_engine::ingest::{AlertTextSource, AnalysisPeriod};
use climrisk_engine::localities::all_localities;
use climrisk_engine::simulate::SimulatedClimateSource;
use climrisk_engine::{EngineConfig, EngineError, GroupBy, RiskLevel};

struct IndentedGenerator;

impl AlertTextSource for IndentedGenerator {
    fn generate(&self, prompt: &str) -> Result<String, EngineError> {
        let group = prompt
            .lines()
            .find_map(|l| l.strip_prefix("GROUPE : "))
            .unwrap_or("inconnu");
        Ok(format!(
            "Voici l'alerte :\n\
             \x20   URGENCE: MODÉRÉE\n\
             \x20   TITRE_GROUPE: Vigilance {group}\n\
             \x20   ÉVALUATION: Situation à suivre.\n\
             \x20   ACTIONS_COORDONNÉES: Suivi hebdomadaire; Sensibilisation\n\
             \x20   ZONES_PRIORITAIRES: Bassins agricoles\n\
             \x20   PÉRIODE: 2 semaines\n"
        ))
    }
}

#[test]
fn test_every_template_roundtrips_through_text() {
    for group_by in [GroupBy::Region, GroupBy::Zone] {
        for level in RiskLevel::ALL {
            let fields = fallback_alert(level, group_by.label(), "Adamaoua", 47.5, 2);
            let text = encode_alert_text(&fields);

            assert_eq!(text.lines().count(), AlertTag::ALL.len());
            for (line, tag) in text.lines().zip(AlertTag::ALL) {
                assert!(line.starts_with(&format!("{}: ", tag.tag())), "line '{line}' out of order");
            }

            let parsed = parse_alert_text(&text);
            assert_eq!(parsed, fields, "{level} changed on round-trip");
            assert!(parsed.is_complete(), "{level} has an empty field");
        }
    }
}

#[test]
fn test_indented_generator_output_is_accepted() {
    let config = EngineConfig::default();
    let source = SimulatedClimateSource::new(Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap());
    let generator = IndentedGenerator;
    let aggregator = GroupAlertAggregator::new(&config, &source).with_text_source(&generator);

    let alerts = aggregator.generate_alerts(
        &all_localities(),
        GroupBy::Zone,
        AnalysisPeriod::Days30,
        Utc.with_ymd_and_hms(2024, 9, 1, 6, 0, 0).unwrap(),
    );
    assert_eq!(alerts.len(), 3);

    for alert in &alerts {
        assert_eq!(alert.text_origin, TextOrigin::Generated);
        assert_eq!(alert.alert.title, format!("Vigilance {}", alert.group_name));
        assert_eq!(alert.alert.coordinated_actions, vec!["Suivi hebdomadaire", "Sensibilisation"]);
        assert_eq!(alert.alert.priority_zones, vec!["Bassins agricoles"]);
        assert!(alert.alert.is_complete());
        assert!(alert.raw_alert_text.starts_with("Voici l'alerte"));
        assert_eq!(parse_alert_text(&alert.raw_alert_text), alert.alert);
    }
}

#[test]
fn test_fallback_raw_text_is_encoded_fields() {
    let config = EngineConfig::default();
    let source = SimulatedClimateSource::new(Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap());
    let aggregator = GroupAlertAggregator::new(&config, &source);

    let alerts = aggregator.generate_alerts(
        &all_localities(),
        GroupBy::Region,
        AnalysisPeriod::Days15,
        Utc.with_ymd_and_hms(2024, 9, 1, 6, 0, 0).unwrap(),
    );
    assert!(!alerts.is_empty());
    for alert in &alerts {
        assert_eq!(alert.text_origin, TextOrigin::Fallback);
        assert_eq!(alert.raw_alert_text, encode_alert_text(&alert.alert));
        assert!(alert.alert.title.ends_with(&alert.group_name));
    }
}
