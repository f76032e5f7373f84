//! Engine configuration.
//!
//! Every threshold, band and seed the engine uses lives in [`EngineConfig`].
//! The config is built once (defaults, or a TOML file) and handed to each
//! component at construction; nothing reads module-level state. A partial
//! TOML file only overrides the keys it names:
//!
//! ```toml
//! [drought.levels]
//! very_high = 75.0
//!
//! [group]
//! sample_size = 5
//! ```

use serde::{Deserialize, Deserializer};
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "CLIMRISK_CONFIG";

/// Environment variable overriding `logging.level`.
pub const LOG_LEVEL_ENV: &str = "CLIMRISK_LOG";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Score cutoffs for a five-level classification, highest first.
///
/// A score maps to the first level whose cutoff it reaches; anything below
/// `low` is `Très Faible`. In TOML, keys left out of a `levels` table keep
/// the defaults of the section they belong to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelCutoffs {
    pub very_high: f64,
    pub high: f64,
    pub moderate: f64,
    pub low: f64,
}

impl LevelCutoffs {
    pub const DROUGHT: LevelCutoffs = LevelCutoffs {
        very_high: 70.0,
        high: 50.0,
        moderate: 30.0,
        low: 15.0,
    };

    pub const FORECAST: LevelCutoffs = LevelCutoffs {
        very_high: 80.0,
        high: 60.0,
        moderate: 40.0,
        low: 20.0,
    };

    fn is_descending(&self) -> bool {
        self.very_high > self.high && self.high > self.moderate && self.moderate > self.low
    }
}

/// A `levels` table as written, before the section defaults fill the gaps.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CutoffOverrides {
    very_high: Option<f64>,
    high: Option<f64>,
    moderate: Option<f64>,
    low: Option<f64>,
}

impl CutoffOverrides {
    fn over(self, base: LevelCutoffs) -> LevelCutoffs {
        LevelCutoffs {
            very_high: self.very_high.unwrap_or(base.very_high),
            high: self.high.unwrap_or(base.high),
            moderate: self.moderate.unwrap_or(base.moderate),
            low: self.low.unwrap_or(base.low),
        }
    }
}

fn drought_levels<'de, D: Deserializer<'de>>(deserializer: D) -> Result<LevelCutoffs, D::Error> {
    CutoffOverrides::deserialize(deserializer).map(|o| o.over(LevelCutoffs::DROUGHT))
}

fn forecast_levels<'de, D: Deserializer<'de>>(deserializer: D) -> Result<LevelCutoffs, D::Error> {
    CutoffOverrides::deserialize(deserializer).map(|o| o.over(LevelCutoffs::FORECAST))
}

/// IndicatorCalculator parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Days below this precipitation (mm) are dry.
    pub dry_day_threshold_mm: f64,
    /// Days with `temperature_max` above this (°C) count toward heat stress.
    pub heat_threshold_c: f64,
    /// Reference daily rainfall used for the precipitation deficit.
    pub normal_daily_precipitation_mm: f64,
    /// Trailing SPI window length.
    pub spi_window: usize,
    /// Windows shorter than this produce no SPI value.
    pub spi_min_window: usize,
    /// Series shorter than this use the per-point z-score.
    pub spi_short_series_len: usize,
    /// Floor applied to window values before the gamma fit.
    pub spi_value_floor_mm: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            dry_day_threshold_mm: 0.1,
            heat_threshold_c: 35.0,
            normal_daily_precipitation_mm: 3.0,
            spi_window: 30,
            spi_min_window: 7,
            spi_short_series_len: 7,
            spi_value_floor_mm: 0.1,
        }
    }
}

/// PeriodSegmenter parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PeriodConfig {
    pub dry_threshold_mm: f64,
    /// Shorter dry runs are not reported as drought periods.
    pub min_dry_days: usize,
    /// Intensity score (duration × deficit) bands, exclusive lower bounds.
    pub extreme_above: f64,
    pub severe_above: f64,
    pub moderate_above: f64,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            dry_threshold_mm: 0.1,
            min_dry_days: 3,
            extreme_above: 10.0,
            severe_above: 5.0,
            moderate_above: 2.0,
        }
    }
}

/// Drought RiskScorer thresholds. Point values per band are fixed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DroughtScoringConfig {
    pub spi_extreme: f64,
    pub spi_severe: f64,
    pub spi_moderate: f64,
    pub spi_mild: f64,
    pub deficit_extreme_pct: f64,
    pub deficit_severe_pct: f64,
    pub deficit_moderate_pct: f64,
    pub dry_days_long: usize,
    pub dry_days_prolonged: usize,
    pub heat_stress_high_pct: f64,
    pub soil_critical_pct: f64,
    pub soil_low_pct: f64,
    #[serde(deserialize_with = "drought_levels")]
    pub levels: LevelCutoffs,
}

impl Default for DroughtScoringConfig {
    fn default() -> Self {
        Self {
            spi_extreme: -2.0,
            spi_severe: -1.5,
            spi_moderate: -1.0,
            spi_mild: -0.5,
            deficit_extreme_pct: 60.0,
            deficit_severe_pct: 40.0,
            deficit_moderate_pct: 20.0,
            dry_days_long: 20,
            dry_days_prolonged: 10,
            heat_stress_high_pct: 50.0,
            soil_critical_pct: 20.0,
            soil_low_pct: 30.0,
            levels: LevelCutoffs::DROUGHT,
        }
    }
}

/// FloodRiskScorer thresholds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FloodConfig {
    /// Hourly intensity threshold (mm/h).
    pub intensity_hourly_mm: f64,
    /// Daily accumulation threshold (mm/day).
    pub cumul_daily_mm: f64,
    /// Soil moisture considered saturated (%).
    pub soil_saturation_pct: f64,
    /// Number of leading hourly records scored.
    pub window_hours: usize,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            intensity_hourly_mm: 50.0,
            cumul_daily_mm: 200.0,
            soil_saturation_pct: 85.0,
            window_hours: 24,
        }
    }
}

/// ForecastProjector parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub confidence_10_days: f64,
    pub confidence_30_days: f64,
    pub confidence_90_days: f64,
    pub confidence_multi_year: f64,
    /// Forecast days below this precipitation (mm) are dry.
    pub dry_day_threshold_mm: f64,
    /// Daily ET0 assumed when a dataset carries no ET0 channel.
    pub reference_et0_mm: f64,
    pub trajectory_step_days: i64,
    #[serde(deserialize_with = "forecast_levels")]
    pub levels: LevelCutoffs,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            confidence_10_days: 0.8,
            confidence_30_days: 0.7,
            confidence_90_days: 0.6,
            confidence_multi_year: 0.5,
            dry_day_threshold_mm: 1.0,
            reference_et0_mm: 3.0,
            trajectory_step_days: 7,
            levels: LevelCutoffs::FORECAST,
        }
    }
}

/// GroupAlertAggregator parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    pub sample_size: usize,
    pub sample_seed: u64,
    /// Length of the climate series requested per sampled locality.
    pub analysis_period_days: u32,
    pub very_high_ratio: f64,
    pub high_ratio: f64,
    pub moderate_ratio: f64,
    pub very_high_score: f64,
    pub high_score: f64,
    pub moderate_score: f64,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            sample_size: 3,
            sample_seed: 42,
            analysis_period_days: 30,
            very_high_ratio: 0.7,
            high_ratio: 0.4,
            moderate_ratio: 0.2,
            very_high_score: 70.0,
            high_score: 50.0,
            moderate_score: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. "info" or "climrisk_engine=debug".
    pub level: String,
    pub format: LogFormat,
    /// Optional file that receives a copy of every log line.
    pub log_file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            log_file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub indicators: IndicatorConfig,
    pub periods: PeriodConfig,
    pub drought: DroughtScoringConfig,
    pub flood: FloodConfig,
    pub forecast: ForecastConfig,
    pub group: GroupConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Loads `.env`, then the file named by `CLIMRISK_CONFIG` if set
    /// (defaults otherwise), then applies `CLIMRISK_LOG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match env::var(CONFIG_PATH_ENV) {
            Ok(path) => load_config(path)?,
            Err(_) => EngineConfig::default(),
        };
        if let Ok(level) = env::var(LOG_LEVEL_ENV) {
            config.logging.level = level;
        }
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that would classify inconsistently.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if !self.drought.levels.is_descending() {
            return invalid("drought.levels must be strictly descending");
        }
        if !self.forecast.levels.is_descending() {
            return invalid("forecast.levels must be strictly descending");
        }
        let p = &self.periods;
        if !(p.extreme_above > p.severe_above && p.severe_above > p.moderate_above) {
            return invalid("periods intensity bands must be strictly descending");
        }
        let d = &self.drought;
        if !(d.spi_extreme < d.spi_severe && d.spi_severe < d.spi_moderate && d.spi_moderate < d.spi_mild) {
            return invalid("drought SPI bands must be strictly ascending");
        }
        if self.indicators.dry_day_threshold_mm <= 0.0 || self.periods.dry_threshold_mm <= 0.0 {
            return invalid("dry-day thresholds must be positive");
        }
        if self.indicators.normal_daily_precipitation_mm <= 0.0 {
            return invalid("indicators.normal_daily_precipitation_mm must be positive");
        }
        if self.indicators.spi_window < self.indicators.spi_min_window {
            return invalid("indicators.spi_window must be at least spi_min_window");
        }
        let f = &self.flood;
        if f.intensity_hourly_mm <= 0.0 || f.cumul_daily_mm <= 0.0 || f.soil_saturation_pct <= 0.0 {
            return invalid("flood thresholds must be positive");
        }
        if f.window_hours == 0 {
            return invalid("flood.window_hours must be at least 1");
        }
        let fc = &self.forecast;
        let confidences = [
            fc.confidence_10_days,
            fc.confidence_30_days,
            fc.confidence_90_days,
            fc.confidence_multi_year,
        ];
        if confidences.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return invalid("forecast confidences must lie in [0, 1]");
        }
        if fc.trajectory_step_days <= 0 {
            return invalid("forecast.trajectory_step_days must be positive");
        }
        let g = &self.group;
        if g.sample_size == 0 {
            return invalid("group.sample_size must be at least 1");
        }
        if !(g.very_high_ratio > g.high_ratio && g.high_ratio > g.moderate_ratio) {
            return invalid("group ratio cutoffs must be strictly descending");
        }
        if !(g.very_high_score > g.high_score && g.high_score > g.moderate_score) {
            return invalid("group score cutoffs must be strictly descending");
        }
        Ok(())
    }
}

/// Load an engine configuration from a TOML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: EngineConfig = toml::from_str(&content)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        EngineConfig::default()
            .validate()
            .expect("default configuration must validate");
    }

    #[test]
    fn test_partial_toml_overrides_only_named_keys() {
        let config: EngineConfig = toml::from_str(
            r#"
            [drought.levels]
            very_high = 75.0

            [group]
            sample_size = 5
            "#,
        )
        .expect("valid TOML");

        assert_eq!(config.drought.levels.very_high, 75.0);
        assert_eq!(config.drought.levels.high, 50.0);
        assert_eq!(config.drought.levels.moderate, 30.0);
        assert_eq!(config.drought.levels.low, 15.0);
        config.validate().expect("one-key override stays descending");
        assert_eq!(config.group.sample_size, 5);
        assert_eq!(config.group.sample_seed, 42, "untouched keys keep defaults");
        assert_eq!(config.flood, FloodConfig::default());
    }

    #[test]
    fn test_partial_levels_fill_from_their_own_section() {
        let config: EngineConfig = toml::from_str(
            r#"
            [drought.levels]
            low = 10.0

            [forecast.levels]
            high = 65.0
            "#,
        )
        .expect("valid TOML");

        assert_eq!(
            config.drought.levels,
            LevelCutoffs { low: 10.0, ..LevelCutoffs::DROUGHT }
        );
        assert_eq!(
            config.forecast.levels,
            LevelCutoffs { high: 65.0, ..LevelCutoffs::FORECAST }
        );
    }

    #[test]
    fn test_empty_levels_table_keeps_defaults() {
        let config: EngineConfig = toml::from_str("[forecast.levels]\n").expect("valid TOML");
        assert_eq!(config.forecast.levels, LevelCutoffs::FORECAST);
    }

    #[test]
    fn test_unknown_cutoff_key_is_parse_error() {
        let result = toml::from_str::<EngineConfig>("[drought.levels]\nextreme = 90.0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_forecast_levels_default_differs_from_drought() {
        let config = EngineConfig::default();
        assert_eq!(config.forecast.levels.very_high, 80.0);
        assert_eq!(config.drought.levels.very_high, 70.0);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"debug\"\nformat = \"json\"").unwrap();

        let config = load_config(file.path()).expect("config file should load");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_load_config_missing_file_is_io_error() {
        let result = load_config("/nonexistent/climrisk.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[group\nsample_size = ").unwrap();
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate_rejects_unordered_cutoffs() {
        let mut config = EngineConfig::default();
        config.drought.levels.high = 80.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_sample_size() {
        let mut config = EngineConfig::default();
        config.group.sample_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_confidence_out_of_range() {
        let mut config = EngineConfig::default();
        config.forecast.confidence_30_days = 1.2;
        assert!(config.validate().is_err());
    }
}
