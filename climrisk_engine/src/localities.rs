//! Reference locality registry.
//!
//! Defines the monitored Cameroonian localities with their coordinates,
//! altitude, administrative region and agro-ecological zone. Flood type
//! and aggravating factors are not stored; they are inferred from region
//! and zone when a [`Locality`] is built, the same way catalogs missing
//! those columns are completed.

use crate::model::{FloodType, GroupBy, Locality, RiskLevel};
use serde::Serialize;
use std::collections::BTreeMap;

pub const COUNTRY: &str = "Cameroun";

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Static metadata for one registry locality.
pub struct LocalityEntry {
    pub name: &'static str,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Meters above sea level.
    pub altitude: f64,
    pub region: &'static str,
    pub zone: &'static str,
}

impl LocalityEntry {
    pub fn to_locality(&self) -> Locality {
        Locality {
            name: self.name.to_string(),
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
            region: self.region.to_string(),
            zone: self.zone.to_string(),
            country: COUNTRY.to_string(),
            flood_type: infer_flood_type(self.region),
            aggravating_factors: infer_aggravating_factors(self.zone, self.region),
        }
    }
}

/// Monitored localities, north to south.
pub static LOCALITY_REGISTRY: &[LocalityEntry] = &[
    LocalityEntry {
        name: "Maroua",
        latitude: 10.5957,
        longitude: 14.3247,
        altitude: 420.0,
        region: "Extrême-Nord",
        zone: "Soudano-Sahélienne",
    },
    LocalityEntry {
        name: "Garoua",
        latitude: 9.3014,
        longitude: 13.3925,
        altitude: 230.0,
        region: "Nord",
        zone: "Soudano-Sahélienne",
    },
    LocalityEntry {
        name: "Ngaoundéré",
        latitude: 7.3167,
        longitude: 13.5833,
        altitude: 1100.0,
        region: "Adamaoua",
        zone: "Soudano-Sahélienne",
    },
    LocalityEntry {
        name: "Bafoussam",
        latitude: 5.4667,
        longitude: 10.4167,
        altitude: 1520.0,
        region: "Ouest",
        zone: "Hautes Terres",
    },
    LocalityEntry {
        name: "Buea",
        latitude: 4.1667,
        longitude: 9.2333,
        altitude: 870.0,
        region: "Sud-Ouest",
        zone: "Côtière",
    },
    LocalityEntry {
        name: "Limbé",
        latitude: 4.0186,
        longitude: 9.1964,
        altitude: 12.0,
        region: "Sud-Ouest",
        zone: "Côtière",
    },
    LocalityEntry {
        name: "Douala",
        latitude: 4.0511,
        longitude: 9.7679,
        altitude: 13.0,
        region: "Littoral",
        zone: "Côtière",
    },
    LocalityEntry {
        name: "Yaoundé",
        latitude: 3.8667,
        longitude: 11.5167,
        altitude: 726.0,
        region: "Centre",
        zone: "Hautes Terres",
    },
    LocalityEntry {
        name: "Ebolowa",
        latitude: 2.9167,
        longitude: 11.15,
        altitude: 580.0,
        region: "Sud",
        zone: "Hautes Terres",
    },
    LocalityEntry {
        name: "Kribi",
        latitude: 2.9394,
        longitude: 9.91,
        altitude: 10.0,
        region: "Sud",
        zone: "Côtière",
    },
];

/// Every registry locality, fully populated.
pub fn all_localities() -> Vec<Locality> {
    LOCALITY_REGISTRY.iter().map(LocalityEntry::to_locality).collect()
}

/// Case-insensitive lookup by name. Returns `None` if not found.
pub fn find_locality(name: &str) -> Option<Locality> {
    let wanted = name.trim().to_lowercase();
    LOCALITY_REGISTRY
        .iter()
        .find(|e| e.name.to_lowercase() == wanted)
        .map(LocalityEntry::to_locality)
}

/// Partitions localities by region or zone, keys in sorted order.
pub fn group_localities(localities: &[Locality], group_by: GroupBy) -> BTreeMap<String, Vec<Locality>> {
    let mut groups: BTreeMap<String, Vec<Locality>> = BTreeMap::new();
    for locality in localities {
        groups
            .entry(group_by.key(locality).to_string())
            .or_default()
            .push(locality.clone());
    }
    groups
}

// ---------------------------------------------------------------------------
// Inference
// ---------------------------------------------------------------------------

/// Predominant flood mechanism for an administrative region.
pub fn infer_flood_type(region: &str) -> FloodType {
    let region = region.to_lowercase();
    let any = |keys: &[&str]| keys.iter().any(|k| region.contains(k));

    if any(&["douala", "limbé", "kribi", "littoral"]) {
        FloodType::Coastal
    } else if any(&["extrême-nord", "nord", "adamaoua"]) {
        FloodType::Fluvial
    } else if any(&["ouest", "sud-ouest", "montagne"]) {
        FloodType::Pluvial
    } else {
        FloodType::Mixed
    }
}

/// Comma-separated aggravating factors implied by zone and region.
pub fn infer_aggravating_factors(zone: &str, region: &str) -> String {
    let zone = zone.to_lowercase();
    let region = region.to_lowercase();
    let mut factors = Vec::new();

    if zone.contains("urbain") {
        factors.push("Urbanisation non maîtrisée");
        factors.push("Systèmes de drainage insuffisants");
    }
    if region.contains("extrême-nord") || region.contains("nord") {
        factors.push("Défrichement des bassins versants");
    }
    if region.contains("littoral") {
        factors.push("Gestion inadéquate des déchets solides");
    }

    if factors.is_empty() {
        "Facteurs naturels prédominants".to_string()
    } else {
        factors.join(", ")
    }
}

// ---------------------------------------------------------------------------
// Zone climate profiles
// ---------------------------------------------------------------------------

/// Typical climate of an agro-ecological zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoneProfile {
    /// Mean annual precipitation, mm.
    pub precip_avg_mm: f64,
    pub temp_avg_c: f64,
    pub dry_season: &'static str,
    pub typical_risk: RiskLevel,
}

pub fn zone_profile(zone: &str) -> Option<ZoneProfile> {
    match zone {
        "Soudano-Sahélienne" => Some(ZoneProfile {
            precip_avg_mm: 600.0,
            temp_avg_c: 28.0,
            dry_season: "Octobre-Mai",
            typical_risk: RiskLevel::High,
        }),
        "Hautes Terres" => Some(ZoneProfile {
            precip_avg_mm: 1500.0,
            temp_avg_c: 22.0,
            dry_season: "Novembre-Mars",
            typical_risk: RiskLevel::Moderate,
        }),
        "Côtière" => Some(ZoneProfile {
            precip_avg_mm: 3000.0,
            temp_avg_c: 26.0,
            dry_season: "Décembre-Février",
            typical_risk: RiskLevel::Low,
        }),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_duplicate_names() {
        let mut seen = std::collections::HashSet::new();
        for entry in LOCALITY_REGISTRY {
            assert!(
                seen.insert(entry.name),
                "duplicate locality '{}' found in LOCALITY_REGISTRY",
                entry.name
            );
        }
    }

    #[test]
    fn test_coordinates_lie_within_cameroon() {
        for entry in LOCALITY_REGISTRY {
            assert!(
                (1.5..=13.1).contains(&entry.latitude) && (8.4..=16.2).contains(&entry.longitude),
                "'{}' at ({}, {}) is outside Cameroon",
                entry.name,
                entry.latitude,
                entry.longitude
            );
            assert!(entry.altitude >= 0.0, "'{}' has negative altitude", entry.name);
        }
    }

    #[test]
    fn test_every_zone_has_a_profile() {
        for entry in LOCALITY_REGISTRY {
            assert!(
                zone_profile(entry.zone).is_some(),
                "zone '{}' of '{}' has no climate profile",
                entry.zone,
                entry.name
            );
        }
        assert!(zone_profile("Toundra").is_none());
    }

    #[test]
    fn test_find_locality_is_case_insensitive() {
        let douala = find_locality("douala").expect("Douala should be in registry");
        assert_eq!(douala.name, "Douala");
        assert_eq!(douala.flood_type, FloodType::Coastal);
        assert_eq!(douala.country, COUNTRY);
        assert!(find_locality("Atlantis").is_none());
    }

    #[test]
    fn test_flood_type_inference() {
        assert_eq!(infer_flood_type("Littoral"), FloodType::Coastal);
        assert_eq!(infer_flood_type("Extrême-Nord"), FloodType::Fluvial);
        assert_eq!(infer_flood_type("Adamaoua"), FloodType::Fluvial);
        assert_eq!(infer_flood_type("Sud-Ouest"), FloodType::Pluvial);
        assert_eq!(infer_flood_type("Ouest"), FloodType::Pluvial);
        assert_eq!(infer_flood_type("Centre"), FloodType::Mixed);
    }

    #[test]
    fn test_aggravating_factor_inference() {
        assert_eq!(
            infer_aggravating_factors("Urbaine Côtière", "Littoral"),
            "Urbanisation non maîtrisée, Systèmes de drainage insuffisants, Gestion inadéquate des déchets solides"
        );
        assert_eq!(
            infer_aggravating_factors("Soudano-Sahélienne", "Nord"),
            "Défrichement des bassins versants"
        );
        assert_eq!(infer_aggravating_factors("Hautes Terres", "Centre"), "Facteurs naturels prédominants");
    }

    #[test]
    fn test_group_by_region_and_zone() {
        let localities = all_localities();

        let by_zone = group_localities(&localities, GroupBy::Zone);
        assert_eq!(
            by_zone.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["Côtière", "Hautes Terres", "Soudano-Sahélienne"]
        );
        assert_eq!(by_zone["Côtière"].len(), 4);

        let by_region = group_localities(&localities, GroupBy::Region);
        assert_eq!(by_region["Sud"].len(), 2);
        assert_eq!(by_region.values().map(Vec::len).sum::<usize>(), LOCALITY_REGISTRY.len());
    }
}
