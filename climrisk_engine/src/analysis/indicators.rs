//! Drought indicators for one locality's daily climate series.

use crate::analysis::spi::{compute_spi, fallback_count, spi_mean, SpiSeries};
use crate::config::IndicatorConfig;
use crate::logging::Component;
use crate::model::ClimateSeries;
use serde::Serialize;
use tracing::debug;

/// Every indicator the drought scorer reads.
///
/// Always fully populated: values that cannot be computed keep the
/// climate-neutral defaults of [`IndicatorSet::default`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSet {
    pub spi: SpiSeries,
    pub spi_mean: f64,
    /// Percent, 0 to 100.
    pub precipitation_deficit: f64,
    pub consecutive_dry_days: usize,
    pub avg_temperature: f64,
    pub max_temperature: f64,
    /// Percent of days above the heat threshold.
    pub heat_stress: f64,
    pub soil_moisture_mean: f64,
    pub soil_moisture_min: f64,
    pub et0_mean: f64,
    /// Σ precipitation − Σ ET0, in mm.
    pub water_balance: f64,
    pub humidity_mean: f64,
}

impl Default for IndicatorSet {
    fn default() -> Self {
        Self {
            spi: SpiSeries::new(),
            spi_mean: 0.0,
            precipitation_deficit: 0.0,
            consecutive_dry_days: 0,
            avg_temperature: 25.0,
            max_temperature: 30.0,
            heat_stress: 0.0,
            soil_moisture_mean: 50.0,
            soil_moisture_min: 30.0,
            et0_mean: 4.0,
            water_balance: 0.0,
            humidity_mean: 65.0,
        }
    }
}

impl IndicatorSet {
    /// Name of the first scalar indicator that is NaN or infinite.
    pub fn first_non_finite(&self) -> Option<&'static str> {
        [
            ("spi_mean", self.spi_mean),
            ("precipitation_deficit", self.precipitation_deficit),
            ("avg_temperature", self.avg_temperature),
            ("max_temperature", self.max_temperature),
            ("heat_stress", self.heat_stress),
            ("soil_moisture_mean", self.soil_moisture_mean),
            ("soil_moisture_min", self.soil_moisture_min),
            ("et0_mean", self.et0_mean),
            ("water_balance", self.water_balance),
            ("humidity_mean", self.humidity_mean),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }
}

/// Longest run of consecutive days with precipitation below `threshold`.
pub fn longest_dry_run(precipitation: &[f64], threshold: f64) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for &p in precipitation {
        if p < threshold {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorCalculator {
    config: IndicatorConfig,
}

impl IndicatorCalculator {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    pub fn compute(&self, series: &ClimateSeries) -> IndicatorSet {
        if series.is_empty() {
            debug!(component = %Component::Indicators, "empty series, neutral indicators");
            return IndicatorSet::default();
        }

        let n = series.len() as f64;
        let precipitation = series.precipitation();
        let temperature_max = series.temperature_max();
        let soil = series.soil_moisture();
        let et0 = series.et0();

        let spi = compute_spi(&series.timestamps(), &precipitation, &self.config);

        let avg_precipitation = mean(&precipitation);
        let normal_precipitation = self.config.normal_daily_precipitation_mm * n;
        let precipitation_deficit =
            (1.0 - avg_precipitation / normal_precipitation).max(0.0) * 100.0;

        let hot_days = temperature_max
            .iter()
            .filter(|&&t| t > self.config.heat_threshold_c)
            .count();

        let indicators = IndicatorSet {
            spi_mean: spi_mean(&spi),
            spi,
            precipitation_deficit,
            consecutive_dry_days: longest_dry_run(&precipitation, self.config.dry_day_threshold_mm),
            avg_temperature: series.records().iter().map(|r| r.temperature_mean()).sum::<f64>() / n,
            max_temperature: temperature_max.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            heat_stress: hot_days as f64 / n * 100.0,
            soil_moisture_mean: mean(&soil),
            soil_moisture_min: soil.iter().copied().fold(f64::INFINITY, f64::min),
            et0_mean: mean(&et0),
            water_balance: precipitation.iter().sum::<f64>() - et0.iter().sum::<f64>(),
            humidity_mean: mean(&series.relative_humidity()),
        };

        debug!(
            component = %Component::Indicators,
            days = series.len(),
            spi_mean = indicators.spi_mean,
            spi_fallbacks = fallback_count(&indicators.spi),
            deficit = indicators.precipitation_deficit,
            dry_days = indicators.consecutive_dry_days,
            "indicators computed"
        );
        indicators
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClimateRecord;
    use chrono::{Duration, TimeZone, Utc};

    fn series(precip: &[f64], tmax: &[f64]) -> ClimateSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let records = precip
            .iter()
            .zip(tmax)
            .enumerate()
            .map(|(i, (&p, &t))| ClimateRecord {
                timestamp: start + Duration::days(i as i64),
                precipitation: p,
                temperature_max: t,
                temperature_min: t - 10.0,
                et0: 4.0,
                soil_moisture: 20.0 + i as f64,
                relative_humidity: 50.0,
            })
            .collect();
        ClimateSeries::new(records).unwrap()
    }

    #[test]
    fn test_empty_series_gives_neutral_defaults() {
        let set = IndicatorCalculator::default().compute(&ClimateSeries::empty());
        assert_eq!(set, IndicatorSet::default());
        assert_eq!(set.soil_moisture_mean, 50.0);
        assert_eq!(set.humidity_mean, 65.0);
        assert_eq!(set.et0_mean, 4.0);
        assert_eq!(set.water_balance, 0.0);
    }

    #[test]
    fn test_scalar_indicators() {
        let set = IndicatorCalculator::default().compute(&series(
            &[0.0, 0.0, 0.0, 6.0, 0.0],
            &[36.0, 34.0, 40.0, 30.0, 35.0],
        ));

        // avg 1.2 mm against 3 mm × 5 days
        assert!((set.precipitation_deficit - 92.0).abs() < 1e-9);
        assert_eq!(set.consecutive_dry_days, 3);
        assert!((set.heat_stress - 40.0).abs() < 1e-9, "35 °C is not above 35");
        assert_eq!(set.max_temperature, 40.0);
        assert!((set.avg_temperature - 30.0).abs() < 1e-9);
        assert_eq!(set.soil_moisture_min, 20.0);
        assert_eq!(set.soil_moisture_mean, 22.0);
        assert_eq!(set.water_balance, 6.0 - 20.0);
        assert_eq!(set.spi.len(), 5);
        assert!(set.first_non_finite().is_none());
    }

    #[test]
    fn test_deficit_never_negative() {
        let set = IndicatorCalculator::default().compute(&series(&[50.0, 50.0], &[30.0, 30.0]));
        assert_eq!(set.precipitation_deficit, 0.0);
    }

    #[test]
    fn test_longest_dry_run() {
        assert_eq!(longest_dry_run(&[], 0.1), 0);
        assert_eq!(longest_dry_run(&[0.0, 0.05, 1.0, 0.0, 0.0, 0.0, 0.1], 0.1), 3);
        assert_eq!(longest_dry_run(&[0.0; 12], 0.1), 12);
    }

    #[test]
    fn test_first_non_finite_names_the_field() {
        let set = IndicatorSet {
            heat_stress: f64::NAN,
            ..IndicatorSet::default()
        };
        assert_eq!(set.first_non_finite(), Some("heat_stress"));
    }
}
