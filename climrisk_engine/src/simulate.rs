//! Deterministic simulated climate data.
//!
//! When no live weather source is wired in, use this module to generate
//! plausible daily series for a coordinate pair. The generator is seeded
//! from the coordinates, so the same locality always yields the same
//! series for a given anchor date.

use crate::ingest::{AnalysisPeriod, ClimateSource};
use crate::logging::Component;
use crate::model::{ClimateSeries, EngineError, SeriesColumns};
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;
use tracing::debug;

// ---------------------------------------------------------------------------
// Sampling helpers
// ---------------------------------------------------------------------------

/// Seed derived from a coordinate pair: `trunc(latitude × 100 + longitude)`.
pub fn location_seed(latitude: f64, longitude: f64) -> u64 {
    (latitude * 100.0 + longitude).trunc() as i64 as u64
}

pub fn location_rng(latitude: f64, longitude: f64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(location_seed(latitude, longitude))
}

/// Gaussian sample (Box–Muller).
pub fn normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.r#gen();
    mean + std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Exponential sample with the given mean.
pub fn exponential<R: Rng + ?Sized>(rng: &mut R, scale: f64) -> f64 {
    let u: f64 = rng.r#gen();
    -scale * (1.0 - u).ln()
}

pub fn bernoulli<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.r#gen::<f64>() < p
}

/// `n` daily timestamps ending the day before `end`.
pub fn daily_timestamps(end: DateTime<Utc>, n: usize) -> Vec<DateTime<Utc>> {
    (0..n).map(|i| end - Duration::days((n - i) as i64)).collect()
}

// ---------------------------------------------------------------------------
// Derived channels
// ---------------------------------------------------------------------------

/// Bucket model: rain wets the soil, ET0 and drainage above 60% dry it.
/// Values stay within 5 to 95%.
pub fn simulate_soil_moisture(precipitation: &[f64], et0: &[f64], initial: f64) -> Vec<f64> {
    let n = precipitation.len().min(et0.len());
    let mut soil = Vec::with_capacity(n);
    if n == 0 {
        return soil;
    }
    soil.push(initial);
    for i in 1..n {
        let previous = soil[i - 1];
        let drainage = (previous - 60.0).max(0.0) * 0.1;
        let next = previous + precipitation[i] * 2.0 - et0[i] * 0.8 - drainage;
        soil.push(next.clamp(5.0, 95.0));
    }
    soil
}

/// Humidity peaks near 4°N and falls off with distance from it.
pub fn simulate_relative_humidity<R: Rng + ?Sized>(rng: &mut R, latitude: f64, n: usize) -> Vec<f64> {
    let base = (70.0 - (latitude - 4.0).abs() * 2.0).clamp(40.0, 90.0);
    (0..n)
        .map(|_| (base + normal(rng, 0.0, 10.0)).clamp(30.0, 95.0))
        .collect()
}

// ---------------------------------------------------------------------------
// Series generation
// ---------------------------------------------------------------------------

/// Simulated daily series of `n_days` ending the day before `end`.
///
/// Coastal localities (east of 9°E, south of 5°N) get narrower temperature
/// spreads; the north (above 8°N) gets lighter, rarer rain.
pub fn simulated_series(
    latitude: f64,
    longitude: f64,
    n_days: usize,
    end: DateTime<Utc>,
) -> Result<ClimateSeries, EngineError> {
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(EngineError::SourceUnavailable(format!(
            "non-finite coordinates ({latitude}, {longitude})"
        )));
    }

    let mut rng = location_rng(latitude, longitude);
    let base_temp = 25.0 + (latitude - 5.0) * 0.5;
    let coastal = longitude > 9.0 && latitude < 5.0;
    let (spread_mean, spread_std) = if coastal { (3.0, 1.0) } else { (5.0, 2.0) };

    let temperature_max: Vec<f64> = (0..n_days)
        .map(|_| (base_temp + normal(&mut rng, spread_mean, spread_std)).clamp(20.0, 45.0))
        .collect();
    let temperature_min: Vec<f64> = (0..n_days)
        .map(|_| (base_temp + normal(&mut rng, -spread_mean, spread_std)).clamp(15.0, 30.0))
        .collect();

    let (rain_scale, rain_probability) = if latitude > 8.0 { (2.0, 0.7) } else { (5.0, 0.8) };
    let amounts: Vec<f64> = (0..n_days).map(|_| exponential(&mut rng, rain_scale)).collect();
    let precipitation: Vec<f64> = amounts
        .iter()
        .map(|a| {
            if bernoulli(&mut rng, rain_probability) {
                a.clamp(0.0, 50.0)
            } else {
                0.0
            }
        })
        .collect();

    let et0: Vec<f64> = (0..n_days).map(|_| normal(&mut rng, 4.0, 1.0).max(0.0)).collect();
    let soil_moisture = simulate_soil_moisture(&precipitation, &et0, 50.0);
    let relative_humidity = simulate_relative_humidity(&mut rng, latitude, n_days);
    let timestamps = daily_timestamps(end, n_days);

    debug!(
        component = %Component::Source,
        latitude,
        longitude,
        days = n_days,
        "simulated climate series generated"
    );

    ClimateSeries::from_columns(SeriesColumns {
        timestamps: &timestamps,
        precipitation: &precipitation,
        temperature_max: &temperature_max,
        temperature_min: &temperature_min,
        et0: &et0,
        soil_moisture: &soil_moisture,
        relative_humidity: &relative_humidity,
    })
}

/// [`ClimateSource`] backed by [`simulated_series`].
#[derive(Debug, Clone, Copy)]
pub struct SimulatedClimateSource {
    end: DateTime<Utc>,
}

impl SimulatedClimateSource {
    /// Series end the day before `end`.
    pub fn new(end: DateTime<Utc>) -> Self {
        Self { end }
    }
}

impl ClimateSource for SimulatedClimateSource {
    fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        period: AnalysisPeriod,
    ) -> Result<ClimateSeries, EngineError> {
        simulated_series(latitude, longitude, period.days() as usize, self.end)
    }
}
