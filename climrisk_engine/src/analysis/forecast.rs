//! Multi-horizon drought risk projection.
//!
//! Every horizon is generated from a generator seeded by the coordinates,
//! so a projection is reproducible for a given `(latitude, longitude,
//! horizon, start)`. Only the 10-day horizon can use observed data, and
//! only when a [`ForecastSource`] is supplied and answers.
//!
//! Horizons:
//!   - 10 days, daily
//!   - 30 days, daily with a declining chance of rain
//!   - 90 days, daily with a seasonal cycle
//!   - 1 and 5 years, monthly with warming and drying trends, no ET0

use crate::config::ForecastConfig;
use crate::ingest::ForecastSource;
use crate::logging::Component;
use crate::model::{ClimateSeries, EngineError, RiskLevel, SeriesColumns};
use crate::simulate::{
    bernoulli, exponential, location_rng, normal, simulate_relative_humidity,
    simulate_soil_moisture,
};
use chrono::{DateTime, Duration, Months, Utc};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::f64::consts::PI;
use tracing::{debug, warn};

/// Neutral channels for monthly projections.
const MONTHLY_SOIL_MOISTURE: f64 = 50.0;
const MONTHLY_HUMIDITY: f64 = 65.0;
/// Diurnal range assumed when only maxima are projected.
const MONTHLY_DIURNAL_RANGE: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ForecastHorizon {
    TenDays,
    ThirtyDays,
    NinetyDays,
    OneYear,
    FiveYears,
}

impl ForecastHorizon {
    pub const ALL: [ForecastHorizon; 5] = [
        ForecastHorizon::TenDays,
        ForecastHorizon::ThirtyDays,
        ForecastHorizon::NinetyDays,
        ForecastHorizon::OneYear,
        ForecastHorizon::FiveYears,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ForecastHorizon::TenDays => "10 jours",
            ForecastHorizon::ThirtyDays => "30 jours",
            ForecastHorizon::NinetyDays => "90 jours",
            ForecastHorizon::OneYear => "1 an(s)",
            ForecastHorizon::FiveYears => "5 an(s)",
        }
    }

    /// Number of points the synthetic projection produces.
    pub fn point_count(&self) -> usize {
        match self {
            ForecastHorizon::TenDays => 10,
            ForecastHorizon::ThirtyDays => 31,
            ForecastHorizon::NinetyDays => 91,
            ForecastHorizon::OneYear => 12,
            ForecastHorizon::FiveYears => 60,
        }
    }

    pub fn is_monthly(&self) -> bool {
        matches!(self, ForecastHorizon::OneYear | ForecastHorizon::FiveYears)
    }

    fn years(&self) -> f64 {
        match self {
            ForecastHorizon::FiveYears => 5.0,
            _ => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ForecastOrigin {
    Observed,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastDataset {
    pub horizon: ForecastHorizon,
    pub origin: ForecastOrigin,
    pub confidence: f64,
    /// Monthly projections carry no ET0 channel; `et0` is zero there.
    pub et0_available: bool,
    pub series: ClimateSeries,
    /// Added temperature per point (monthly horizons only).
    pub warming_trend: Vec<f64>,
    /// Precipitation trend term per point, before the ×20 scaling
    /// (monthly horizons only).
    pub precipitation_trend: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastAssessment {
    pub risk_level: RiskLevel,
    /// 0 to 100.
    pub risk_score: f64,
    pub risk_color: &'static str,
    pub total_precipitation: f64,
    pub average_precipitation: f64,
    pub dry_days: usize,
    pub water_balance: f64,
    pub horizon: ForecastHorizon,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskTrajectoryPoint {
    pub date: DateTime<Utc>,
    pub risk_score: f64,
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

// ---------------------------------------------------------------------------
// Synthetic channels
// ---------------------------------------------------------------------------

struct Channels {
    timestamps: Vec<DateTime<Utc>>,
    precipitation: Vec<f64>,
    temperature_max: Vec<f64>,
    temperature_min: Vec<f64>,
    et0: Vec<f64>,
    soil_moisture: Vec<f64>,
    relative_humidity: Vec<f64>,
}

impl Channels {
    fn into_series(self) -> Result<ClimateSeries, EngineError> {
        ClimateSeries::from_columns(SeriesColumns {
            timestamps: &self.timestamps,
            precipitation: &self.precipitation,
            temperature_max: &self.temperature_max,
            temperature_min: &self.temperature_min,
            et0: &self.et0,
            soil_moisture: &self.soil_moisture,
            relative_humidity: &self.relative_humidity,
        })
    }
}

fn daily_from(start: DateTime<Utc>, n: usize) -> Vec<DateTime<Utc>> {
    (0..n).map(|i| start + Duration::days(i as i64)).collect()
}

fn monthly_from(start: DateTime<Utc>, n: usize) -> Vec<DateTime<Utc>> {
    (1..=n)
        .map(|i| {
            start
                .checked_add_months(Months::new(i as u32))
                .unwrap_or(start + Duration::days(30 * i as i64))
        })
        .collect()
}

fn samples(rng: &mut ChaCha8Rng, n: usize, mut f: impl FnMut(&mut ChaCha8Rng) -> f64) -> Vec<f64> {
    (0..n).map(|_| f(rng)).collect()
}

/// Daily horizons: temperatures, rain, ET0, then simulated soil and humidity.
fn daily_channels(
    rng: &mut ChaCha8Rng,
    horizon: ForecastHorizon,
    latitude: f64,
    start: DateTime<Utc>,
) -> Channels {
    let n = horizon.point_count();
    let base = 25.0 + (latitude - 5.0) * 0.5;

    let (temperature_max, temperature_min, precipitation, et0) = match horizon {
        ForecastHorizon::NinetyDays => {
            let phase = linspace(0.0, 2.0 * PI, n);
            let seasonal: Vec<f64> = phase.iter().map(|p| p.sin() * 3.0).collect();
            let tmax = samples(rng, n, |r| normal(r, 0.0, 1.5));
            let tmin = samples(rng, n, |r| normal(r, -2.0, 1.5));
            let amounts = samples(rng, n, |r| exponential(r, 8.0));
            let et0 = samples(rng, n, |r| normal(r, 4.5, 0.8).max(0.0));
            (
                tmax.iter().zip(&seasonal).map(|(t, s)| base + s + t).collect::<Vec<f64>>(),
                tmin.iter().zip(&seasonal).map(|(t, s)| base + s + t).collect::<Vec<f64>>(),
                amounts
                    .iter()
                    .zip(&phase)
                    .map(|(a, p)| if (p + PI / 2.0).sin() > 0.0 { *a } else { 0.0 })
                    .collect::<Vec<f64>>(),
                et0,
            )
        }
        _ => {
            let rain_probability = match horizon {
                ForecastHorizon::ThirtyDays => linspace(0.3, 0.1, n),
                _ => vec![0.3; n],
            };
            let tmax = samples(rng, n, |r| base + normal(r, 3.0, 2.0));
            let tmin = samples(rng, n, |r| base + normal(r, -3.0, 2.0));
            let amounts = samples(rng, n, |r| exponential(r, 5.0));
            let precipitation: Vec<f64> = amounts
                .iter()
                .zip(&rain_probability)
                .map(|(a, p)| if bernoulli(rng, *p) { *a } else { 0.0 })
                .collect();
            let et0 = samples(rng, n, |r| normal(r, 4.0, 1.0).max(0.0));
            (tmax, tmin, precipitation, et0)
        }
    };

    let soil_moisture = simulate_soil_moisture(&precipitation, &et0, 50.0);
    let relative_humidity = simulate_relative_humidity(rng, latitude, n);

    Channels {
        timestamps: daily_from(start, n),
        precipitation,
        temperature_max,
        temperature_min,
        et0,
        soil_moisture,
        relative_humidity,
    }
}

/// Monthly horizons: base + warming trend + noise, drying rainfall, no ET0.
fn monthly_channels(
    rng: &mut ChaCha8Rng,
    horizon: ForecastHorizon,
    latitude: f64,
    start: DateTime<Utc>,
) -> (Channels, Vec<f64>, Vec<f64>) {
    let n = horizon.point_count();
    let years = horizon.years();
    let base = 25.0 + (latitude - 5.0) * 0.5;

    let warming = linspace(0.0, 0.8 * years, n);
    let drying = linspace(0.0, -0.1 * years, n);

    let noise = samples(rng, n, |r| normal(r, 0.0, 2.0));
    let temperature_max: Vec<f64> = noise.iter().zip(&warming).map(|(e, w)| base + w + e).collect();
    let amounts = samples(rng, n, |r| exponential(r, 80.0));
    let precipitation = amounts
        .iter()
        .zip(&drying)
        .map(|(a, t)| (a + t * 20.0).max(0.0))
        .collect();

    let channels = Channels {
        timestamps: monthly_from(start, n),
        precipitation,
        temperature_min: temperature_max.iter().map(|t| t - MONTHLY_DIURNAL_RANGE).collect(),
        temperature_max,
        et0: vec![0.0; n],
        soil_moisture: vec![MONTHLY_SOIL_MOISTURE; n],
        relative_humidity: vec![MONTHLY_HUMIDITY; n],
    };
    (channels, warming, drying)
}

// ---------------------------------------------------------------------------
// Projector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ForecastProjector {
    config: ForecastConfig,
}

impl ForecastProjector {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn confidence(&self, horizon: ForecastHorizon) -> f64 {
        match horizon {
            ForecastHorizon::TenDays => self.config.confidence_10_days,
            ForecastHorizon::ThirtyDays => self.config.confidence_30_days,
            ForecastHorizon::NinetyDays => self.config.confidence_90_days,
            ForecastHorizon::OneYear | ForecastHorizon::FiveYears => self.config.confidence_multi_year,
        }
    }

    /// Builds the dataset for one horizon starting at `start`.
    ///
    /// `observed` is consulted for the 10-day horizon only; a failing or
    /// empty answer is logged and replaced by the synthetic projection.
    pub fn project(
        &self,
        latitude: f64,
        longitude: f64,
        horizon: ForecastHorizon,
        start: DateTime<Utc>,
        observed: Option<&dyn ForecastSource>,
    ) -> Result<ForecastDataset, EngineError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(EngineError::SourceUnavailable(format!(
                "non-finite coordinates ({latitude}, {longitude})"
            )));
        }

        let confidence = self.confidence(horizon);

        if let (ForecastHorizon::TenDays, Some(source)) = (horizon, observed) {
            match source.forecast(latitude, longitude, start, horizon.point_count()) {
                Ok(series) if !series.is_empty() => {
                    debug!(component = %Component::Forecast, days = series.len(), "observed forecast used");
                    return Ok(ForecastDataset {
                        horizon,
                        origin: ForecastOrigin::Observed,
                        confidence,
                        et0_available: true,
                        series,
                        warming_trend: Vec::new(),
                        precipitation_trend: Vec::new(),
                    });
                }
                Ok(_) => warn!(
                    component = %Component::Forecast,
                    latitude,
                    longitude,
                    "observed forecast empty, using synthetic projection"
                ),
                Err(e) => warn!(
                    component = %Component::Forecast,
                    latitude,
                    longitude,
                    "observed forecast failed ({e}), using synthetic projection"
                ),
            }
        }

        let mut rng = location_rng(latitude, longitude);
        let dataset = if horizon.is_monthly() {
            let (channels, warming_trend, precipitation_trend) =
                monthly_channels(&mut rng, horizon, latitude, start);
            ForecastDataset {
                horizon,
                origin: ForecastOrigin::Synthetic,
                confidence,
                et0_available: false,
                series: channels.into_series()?,
                warming_trend,
                precipitation_trend,
            }
        } else {
            ForecastDataset {
                horizon,
                origin: ForecastOrigin::Synthetic,
                confidence,
                et0_available: true,
                series: daily_channels(&mut rng, horizon, latitude, start).into_series()?,
                warming_trend: Vec::new(),
                precipitation_trend: Vec::new(),
            }
        };

        debug!(
            component = %Component::Forecast,
            horizon = horizon.label(),
            points = dataset.series.len(),
            "synthetic forecast projected"
        );
        Ok(dataset)
    }

    fn classify(&self, score: f64) -> RiskLevel {
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

    /// Weighted precipitation, dry-day and water-balance score, capped at 100.
    pub fn assess(&self, dataset: &ForecastDataset) -> ForecastAssessment {
        let precipitation = dataset.series.precipitation();
        if precipitation.is_empty() {
            return ForecastAssessment {
                risk_level: RiskLevel::Undetermined,
                risk_score: 0.0,
                risk_color: RiskLevel::Undetermined.color(),
                total_precipitation: 0.0,
                average_precipitation: 0.0,
                dry_days: 0,
                water_balance: 0.0,
                horizon: dataset.horizon,
                confidence: dataset.confidence,
            };
        }

        let n = precipitation.len() as f64;
        let total: f64 = precipitation.iter().sum();
        let average = total / n;
        let dry_days = precipitation
            .iter()
            .filter(|&&p| p < self.config.dry_day_threshold_mm)
            .count();
        let water_balance = if dataset.et0_available {
            total - dataset.series.et0().iter().sum::<f64>()
        } else {
            total - n * self.config.reference_et0_mm
        };

        let mut score = 0.0;
        if average < 1.0 {
            score += 50.0;
        } else if average < 2.0 {
            score += 30.0;
        } else if average < 3.0 {
            score += 15.0;
        }
        score += dry_days as f64 / n * 30.0;
        if water_balance < -50.0 {
            score += 20.0;
        } else if water_balance < -20.0 {
            score += 10.0;
        }
        let risk_score = score.min(100.0);
        let risk_level = self.classify(risk_score);

        ForecastAssessment {
            risk_level,
            risk_score,
            risk_color: risk_level.color(),
            total_precipitation: total,
            average_precipitation: average,
            dry_days,
            water_balance,
            horizon: dataset.horizon,
            confidence: dataset.confidence,
        }
    }

    /// Weekly points across the dataset, ramping from 0.8× to 1.2× the score.
    pub fn risk_trajectory(
        &self,
        dataset: &ForecastDataset,
        assessment: &ForecastAssessment,
    ) -> Vec<RiskTrajectoryPoint> {
        let records = dataset.series.records();
        let (Some(first), Some(last)) = (records.first(), records.last()) else {
            return Vec::new();
        };
        if self.config.trajectory_step_days <= 0 {
            return Vec::new();
        }

        let step = Duration::days(self.config.trajectory_step_days);
        let mut dates = Vec::new();
        let mut date = first.timestamp;
        while date <= last.timestamp {
            dates.push(date);
            date += step;
        }

        let score = assessment.risk_score;
        linspace(score * 0.8, score * 1.2, dates.len())
            .into_iter()
            .zip(dates)
            .map(|(risk_score, date)| RiskTrajectoryPoint { date, risk_score })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
