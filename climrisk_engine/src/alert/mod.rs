/// Risk scoring and alert production.
///
/// Submodules:
/// - `drought`: additive drought risk score and recommendations.
/// - `flood`: flash-flood guidance and flood indicator composite.
/// - `thresholds`: flood alert levels and their operational details.
/// - `group`: sampled group alerts by region or zone.
/// - `text`: the tagged alert text format and its templates.

pub mod drought;
pub mod flood;
pub mod group;
pub mod text;
pub mod thresholds;
