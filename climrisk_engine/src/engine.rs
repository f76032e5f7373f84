//! Per-locality drought, flood and forecast analysis wired from one config.

use crate::alert::drought::{DroughtRiskScorer, RiskAssessment};
use crate::alert::flood::{FloodAssessment, FloodRiskScorer};
use crate::alert::group::GroupAlertAggregator;
use crate::analysis::forecast::{
    ForecastAssessment, ForecastDataset, ForecastHorizon, ForecastProjector, RiskTrajectoryPoint,
};
use crate::analysis::indicators::{IndicatorCalculator, IndicatorSet};
use crate::analysis::periods::{DroughtPeriod, DroughtStatistics, PeriodSegmenter};
use crate::config::EngineConfig;
use crate::ingest::{AnalysisPeriod, ClimateSource, ForecastSource};
use crate::logging::Component;
use crate::model::{ClimateSeries, EngineError, Locality};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Full drought picture of one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalityReport {
    pub indicators: IndicatorSet,
    pub assessment: RiskAssessment,
    pub periods: Vec<DroughtPeriod>,
    pub statistics: DroughtStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    pub dataset: ForecastDataset,
    pub assessment: ForecastAssessment,
    pub trajectory: Vec<RiskTrajectoryPoint>,
}

#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    config: EngineConfig,
    calculator: IndicatorCalculator,
    segmenter: PeriodSegmenter,
    drought: DroughtRiskScorer,
    flood: FloodRiskScorer,
    forecast: ForecastProjector,
}

impl RiskEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.clone(),
            calculator: IndicatorCalculator::new(config.indicators.clone()),
            segmenter: PeriodSegmenter::new(config.periods.clone()),
            drought: DroughtRiskScorer::new(config.drought.clone()),
            flood: FloodRiskScorer::new(config.flood.clone()),
            forecast: ForecastProjector::new(config.forecast.clone()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Indicators, assessment and drought periods of one daily series.
    ///
    /// Never fails: an empty series yields neutral indicators, a default
    /// assessment and no periods.
    pub fn assess_series(&self, series: &ClimateSeries) -> LocalityReport {
        let indicators = self.calculator.compute(series);
        let assessment = self.drought.assess(&indicators);
        let periods = self.segmenter.detect(series);
        let statistics = DroughtStatistics::summarize(
            &series.precipitation(),
            &periods,
            self.config.periods.dry_threshold_mm,
        );

        LocalityReport {
            indicators,
            assessment,
            periods,
            statistics,
        }
    }

    /// Fetch the locality's series from `source` and assess it.
    pub fn assess_locality(
        &self,
        locality: &Locality,
        source: &dyn ClimateSource,
        period: AnalysisPeriod,
    ) -> Result<LocalityReport, EngineError> {
        let series = source.fetch(locality.latitude, locality.longitude, period)?;
        let report = self.assess_series(&series);

        info!(
            component = %Component::System,
            locality = %locality.name,
            period = %period.label(),
            level = %report.assessment.risk_level,
            score = report.assessment.risk_score,
            periods = report.periods.len(),
            "locality assessed"
        );
        Ok(report)
    }

    pub fn assess_flood(&self, hourly: &ClimateSeries, locality: &Locality) -> FloodAssessment {
        self.flood.assess(hourly, locality)
    }

    /// Projected dataset, its assessment and the weekly risk trajectory.
    pub fn forecast(
        &self,
        locality: &Locality,
        horizon: ForecastHorizon,
        start: DateTime<Utc>,
        observed: Option<&dyn ForecastSource>,
    ) -> Result<ForecastReport, EngineError> {
        let dataset = self
            .forecast
            .project(locality.latitude, locality.longitude, horizon, start, observed)?;
        let assessment = self.forecast.assess(&dataset);
        let trajectory = self.forecast.risk_trajectory(&dataset, &assessment);

        Ok(ForecastReport {
            dataset,
            assessment,
            trajectory,
        })
    }

    /// Group aggregator sharing this engine's configuration.
    pub fn group_aggregator<'a>(&self, source: &'a dyn ClimateSource) -> GroupAlertAggregator<'a> {
        GroupAlertAggregator::new(&self.config, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localities::find_locality;
    use crate::model::{ClimateRecord, RiskLevel};
    use crate::simulate::SimulatedClimateSource;
    use chrono::{Duration, TimeZone};

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap()
    }

    fn series(precip: &[f64]) -> ClimateSeries {
        let records = precip
            .iter()
            .enumerate()
            .map(|(i, &p)| ClimateRecord {
                timestamp: anchor() + Duration::days(i as i64),
                precipitation: p,
                temperature_max: 33.0,
                temperature_min: 23.0,
                et0: 4.0,
                soil_moisture: 40.0,
                relative_humidity: 60.0,
            })
            .collect();
        ClimateSeries::new(records).unwrap()
    }

    #[test]
    fn test_series_report_combines_periods_and_statistics() {
        let engine = RiskEngine::default();
        let report = engine.assess_series(&series(&[0.0, 0.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 0.0]));

        assert_eq!(report.periods.len(), 2);
        assert_eq!(report.periods[0].dry_day_count, 5);
        assert_eq!(report.periods[1].dry_day_count, 4);
        assert_eq!(report.statistics.period_count, 2);
        assert_eq!(report.statistics.dry_days, 9);
        assert_eq!(report.indicators.consecutive_dry_days, 5);
    }

    #[test]
    fn test_empty_series_report_is_neutral() {
        let report = RiskEngine::default().assess_series(&ClimateSeries::empty());
        assert_eq!(report.indicators, IndicatorSet::default());
        assert!(report.periods.is_empty());
        assert_ne!(report.assessment.risk_level, RiskLevel::Undetermined);
    }

    #[test]
    fn test_locality_through_simulated_source() {
        let engine = RiskEngine::new(&EngineConfig::default());
        let maroua = find_locality("Maroua").unwrap();
        let source = SimulatedClimateSource::new(anchor());

        let report = engine.assess_locality(&maroua, &source, AnalysisPeriod::Days90).unwrap();
        assert_eq!(report.indicators.spi.len(), 90 - 6, "windows shorter than 7 days are skipped");
        assert!(report.periods.iter().all(|p| p.dry_day_count >= 3));
        assert_eq!(report.statistics.total_days, 90);
    }

    #[test]
    fn test_forecast_report_is_reproducible() {
        let engine = RiskEngine::default();
        let douala = find_locality("Douala").unwrap();
        let a = engine.forecast(&douala, ForecastHorizon::ThirtyDays, anchor(), None).unwrap();
        let b = engine.forecast(&douala, ForecastHorizon::ThirtyDays, anchor(), None).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.trajectory.len(), 5, "days 0, 7, 14, 21 and 28");
        assert!(a.assessment.risk_score <= 100.0);
    }
}
