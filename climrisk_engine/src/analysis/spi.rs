//! Standardized Precipitation Index.
//!
//! Long series use a trailing window: the window values are fitted with a
//! two-parameter gamma distribution (Thom's maximum-likelihood
//! approximation), the window total is mapped through the fitted CDF and
//! then through the standard normal quantile. Whenever that chain fails the
//! window z-score is used instead and the point is tagged as a fallback.
//!
//! Short series skip the window entirely and use a per-point z-score.

use crate::config::IndicatorConfig;
use crate::logging::Component;
use crate::model::{FallbackReason, Outcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::f64::consts::{PI, SQRT_2};
use thiserror::Error;
use tracing::{debug, warn};

const MAX_ITERATIONS: usize = 1000;
const EPSILON: f64 = 1e-14;
const FPMIN: f64 = 1e-300;

/// Below this, Thom's statistic is treated as zero (constant sample).
const MIN_THOM_STATISTIC: f64 = 1e-12;

pub type SpiSeries = BTreeMap<DateTime<Utc>, Outcome<f64>>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpiError {
    #[error("degenerate sample: {0}")]
    DegenerateSample(&'static str),
    #[error("incomplete gamma did not converge for a={shape}, x={x}")]
    NonConvergence { shape: f64, x: f64 },
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

// ---------------------------------------------------------------------------
// Gamma fit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaParams {
    pub shape: f64,
    pub scale: f64,
}

/// Maximum-likelihood gamma fit using Thom's approximation.
///
/// Values must be strictly positive; callers floor them first.
pub fn fit_gamma(values: &[f64]) -> Result<GammaParams, SpiError> {
    if values.is_empty() {
        return Err(SpiError::InvalidArgument("empty sample"));
    }
    if values.iter().any(|v| !v.is_finite() || *v <= 0.0) {
        return Err(SpiError::InvalidArgument("sample values must be positive"));
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let mean_ln = values.iter().map(|v| v.ln()).sum::<f64>() / n;
    let a = mean.ln() - mean_ln;

    if !a.is_finite() || a <= MIN_THOM_STATISTIC {
        return Err(SpiError::DegenerateSample("constant sample"));
    }

    let shape = (1.0 + (1.0 + 4.0 * a / 3.0).sqrt()) / (4.0 * a);
    let scale = mean / shape;
    if !shape.is_finite() || !scale.is_finite() || scale <= 0.0 {
        return Err(SpiError::DegenerateSample("non-finite parameters"));
    }
    Ok(GammaParams { shape, scale })
}

/// Gamma CDF at `x` for the given parameters.
pub fn gamma_cdf(x: f64, params: GammaParams) -> Result<f64, SpiError> {
    if x <= 0.0 {
        return Ok(0.0);
    }
    regularized_lower_gamma(params.shape, x / params.scale)
}

/// Regularized lower incomplete gamma P(a, x).
///
/// Series expansion for `x < a + 1`, Lentz continued fraction otherwise.
pub fn regularized_lower_gamma(a: f64, x: f64) -> Result<f64, SpiError> {
    if a <= 0.0 || !a.is_finite() {
        return Err(SpiError::InvalidArgument("shape must be positive"));
    }
    if x < 0.0 || x.is_nan() {
        return Err(SpiError::InvalidArgument("x must be non-negative"));
    }
    if x == 0.0 {
        return Ok(0.0);
    }

    let log_prefix = -x + a * x.ln() - libm::lgamma(a);

    if x < a + 1.0 {
        let mut ap = a;
        let mut del = 1.0 / a;
        let mut sum = del;
        for _ in 0..MAX_ITERATIONS {
            ap += 1.0;
            del *= x / ap;
            sum += del;
            if del.abs() < sum.abs() * EPSILON {
                return Ok((sum * log_prefix.exp()).clamp(0.0, 1.0));
            }
        }
        Err(SpiError::NonConvergence { shape: a, x })
    } else {
        let mut b = x + 1.0 - a;
        let mut c = 1.0 / FPMIN;
        let mut d = 1.0 / b;
        let mut h = d;
        for i in 1..MAX_ITERATIONS {
            let i = i as f64;
            let an = -i * (i - a);
            b += 2.0;
            d = an * d + b;
            if d.abs() < FPMIN {
                d = FPMIN;
            }
            c = b + an / c;
            if c.abs() < FPMIN {
                c = FPMIN;
            }
            d = 1.0 / d;
            let del = d * c;
            h *= del;
            if (del - 1.0).abs() < EPSILON {
                let q = log_prefix.exp() * h;
                return Ok((1.0 - q).clamp(0.0, 1.0));
            }
        }
        Err(SpiError::NonConvergence { shape: a, x })
    }
}

// ---------------------------------------------------------------------------
// Normal quantile
// ---------------------------------------------------------------------------

const ACKLAM_A: [f64; 6] = [
    -3.969683028665376e+01,
    2.209460984245205e+02,
    -2.759285104469687e+02,
    1.383577518672690e+02,
    -3.066479806614716e+01,
    2.506628277459239e+00,
];
const ACKLAM_B: [f64; 5] = [
    -5.447609879822406e+01,
    1.615858368580409e+02,
    -1.556989798598866e+02,
    6.680131188771972e+01,
    -1.328068155288572e+01,
];
const ACKLAM_C: [f64; 6] = [
    -7.784894002430293e-03,
    -3.223964580411365e-01,
    -2.400758277161838e+00,
    -2.549732539343734e+00,
    4.374664141464968e+00,
    2.938163982698783e+00,
];
const ACKLAM_D: [f64; 4] = [
    7.784695709041462e-03,
    3.224671290700398e-01,
    2.445134137142996e+00,
    3.754408661907416e+00,
];
const P_LOW: f64 = 0.02425;

fn acklam_tail(q: f64) -> f64 {
    let c = ACKLAM_C;
    let d = ACKLAM_D;
    (((((c[0] * q + c[1]) * q + c[2]) * q + c[3]) * q + c[4]) * q + c[5])
        / ((((d[0] * q + d[1]) * q + d[2]) * q + d[3]) * q + 1.0)
}

/// Standard normal quantile. Returns ±∞ at p = 0 or 1 and NaN outside [0, 1].
pub fn normal_quantile(p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    let x = if p < P_LOW {
        acklam_tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let (a, b) = (ACKLAM_A, ACKLAM_B);
        let q = p - 0.5;
        let r = q * q;
        (((((a[0] * r + a[1]) * r + a[2]) * r + a[3]) * r + a[4]) * r + a[5]) * q
            / (((((b[0] * r + b[1]) * r + b[2]) * r + b[3]) * r + b[4]) * r + 1.0)
    } else {
        -acklam_tail((-2.0 * (1.0 - p).ln()).sqrt())
    };

    // One Halley step against the exact CDF.
    let e = 0.5 * libm::erfc(-x / SQRT_2) - p;
    let u = e * (2.0 * PI).sqrt() * (x * x / 2.0).exp();
    x - u / (1.0 + x * u / 2.0)
}

// ---------------------------------------------------------------------------
// SPI
// ---------------------------------------------------------------------------

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn spi_from_fit(total: f64, window: &[f64], floor: f64) -> Result<f64, SpiError> {
    let floored: Vec<f64> = window.iter().map(|v| v.max(floor)).collect();
    let params = fit_gamma(&floored)?;
    let p = gamma_cdf(total, params)?;
    Ok(normal_quantile(p))
}

/// SPI per timestamp.
///
/// `timestamps` and `precipitation` must have equal length; extra entries
/// in either are ignored.
pub fn compute_spi(
    timestamps: &[DateTime<Utc>],
    precipitation: &[f64],
    config: &IndicatorConfig,
) -> SpiSeries {
    let n = timestamps.len().min(precipitation.len());
    let mut spi = SpiSeries::new();
    if n == 0 {
        return spi;
    }

    if n < config.spi_short_series_len {
        let (mean, std) = mean_and_std(&precipitation[..n]);
        let std = if std > 0.0 { std } else { 1.0 };
        for i in 0..n {
            spi.insert(
                timestamps[i],
                Outcome::Fallback {
                    value: (precipitation[i] - mean) / std,
                    reason: FallbackReason::ShortSeries,
                },
            );
        }
        return spi;
    }

    let mut fit_failures = 0usize;
    let mut non_finite = 0usize;

    for i in 0..n {
        let start = (i + 1).saturating_sub(config.spi_window);
        let window = &precipitation[start..=i];
        if window.len() < config.spi_min_window {
            continue;
        }

        let total: f64 = window.iter().sum();
        let z_score = || {
            let (mean, std) = mean_and_std(window);
            if std > 0.0 { (total - mean) / std } else { 0.0 }
        };

        let outcome = match spi_from_fit(total, window, config.spi_value_floor_mm) {
            Ok(value) if value.is_finite() => Outcome::Fitted(value),
            Ok(_) => {
                non_finite += 1;
                Outcome::Fallback {
                    value: z_score(),
                    reason: FallbackReason::NonFinite,
                }
            }
            Err(e) => {
                fit_failures += 1;
                Outcome::Fallback {
                    value: z_score(),
                    reason: FallbackReason::FitFailed(e.to_string()),
                }
            }
        };
        spi.insert(timestamps[i], outcome);
    }

    if fit_failures > 0 {
        warn!(
            component = %Component::Indicators,
            fit_failures,
            non_finite,
            points = spi.len(),
            "gamma fit failed, window z-score used"
        );
    } else if non_finite > 0 {
        debug!(
            component = %Component::Indicators,
            non_finite,
            points = spi.len(),
            "non-finite SPI replaced by window z-score"
        );
    }

    spi
}

/// Number of SPI points that did not come from the gamma fit.
pub fn fallback_count(spi: &SpiSeries) -> usize {
    spi.values().filter(|o| o.is_fallback()).count()
}

/// Mean of all SPI values, 0 when there are none.
pub fn spi_mean(spi: &SpiSeries) -> f64 {
    if spi.is_empty() {
        return 0.0;
    }
    spi.values().map(Outcome::value).sum::<f64>() / spi.len() as f64
}

// ---------------------------------------------------------------------------
// Interpretation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpiCategory {
    ExtremelyWet,
    VeryWet,
    ModeratelyWet,
    NearNormal,
    ModerateDrought,
    SevereDrought,
    ExtremeDrought,
}

impl SpiCategory {
    pub fn from_value(spi: f64) -> Self {
        if spi >= 2.0 {
            SpiCategory::ExtremelyWet
        } else if spi >= 1.5 {
            SpiCategory::VeryWet
        } else if spi >= 1.0 {
            SpiCategory::ModeratelyWet
        } else if spi >= -1.0 {
            SpiCategory::NearNormal
        } else if spi >= -1.5 {
            SpiCategory::ModerateDrought
        } else if spi >= -2.0 {
            SpiCategory::SevereDrought
        } else {
            SpiCategory::ExtremeDrought
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SpiCategory::ExtremelyWet => "Extrêmement humide",
            SpiCategory::VeryWet => "Très humide",
            SpiCategory::ModeratelyWet => "Modérément humide",
            SpiCategory::NearNormal => "Proche de la normale",
            SpiCategory::ModerateDrought => "Sécheresse modérée",
            SpiCategory::SevereDrought => "Sécheresse sévère",
            SpiCategory::ExtremeDrought => "Sécheresse extrême",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn days(n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| start + Duration::days(i as i64)).collect()
    }

    #[test]
    fn test_short_series_sign_follows_mean() {
        let precip = [0.0, 4.0, 10.0, 1.0, 6.0];
        let ts = days(precip.len());
        let spi = compute_spi(&ts, &precip, &IndicatorConfig::default());
        let mean = precip.iter().sum::<f64>() / precip.len() as f64;

        assert_eq!(spi.len(), precip.len());
        for (t, p) in ts.iter().zip(precip) {
            let value = spi[t].value();
            if p > mean {
                assert!(value > 0.0, "{p} above mean {mean} gave SPI {value}");
            } else if p < mean {
                assert!(value < 0.0, "{p} below mean {mean} gave SPI {value}");
            }
            assert_eq!(
                spi[t],
                Outcome::Fallback { value, reason: FallbackReason::ShortSeries }
            );
        }
    }

    #[test]
    fn test_short_constant_series_is_zero() {
        let ts = days(3);
        let spi = compute_spi(&ts, &[2.0, 2.0, 2.0], &IndicatorConfig::default());
        assert!(spi.values().all(|o| o.value() == 0.0));

        let single = compute_spi(&ts[..1], &[7.0], &IndicatorConfig::default());
        assert_eq!(single[&ts[0]].value(), 0.0);
    }

    #[test]
    fn test_long_series_skips_short_windows() {
        let precip: Vec<f64> = (0..40).map(|i| (i % 5) as f64 * 2.0).collect();
        let ts = days(precip.len());
        let spi = compute_spi(&ts, &precip, &IndicatorConfig::default());

        assert_eq!(spi.len(), 40 - 6);
        assert!(!spi.contains_key(&ts[5]));
        assert!(spi.contains_key(&ts[6]));
        assert!(spi.values().all(|o| o.value().is_finite()));
    }

    #[test]
    fn test_all_dry_long_series_falls_back_to_zero() {
        let ts = days(10);
        let spi = compute_spi(&ts, &[0.0; 10], &IndicatorConfig::default());
        assert_eq!(spi.len(), 4);
        for outcome in spi.values() {
            assert!(
                matches!(outcome, Outcome::Fallback { reason: FallbackReason::FitFailed(_), .. }),
                "constant window must fail the fit, got {outcome:?}"
            );
            assert_eq!(outcome.value(), 0.0);
        }
        assert_eq!(fallback_count(&spi), 4);
    }

    #[test]
    fn test_empty_series_has_no_spi() {
        let spi = compute_spi(&[], &[], &IndicatorConfig::default());
        assert!(spi.is_empty());
        assert_eq!(spi_mean(&spi), 0.0);
    }

    #[test]
    fn test_fit_gamma_preserves_mean() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let params = fit_gamma(&values).unwrap();
        assert!(params.shape > 0.0 && params.scale > 0.0);
        assert!((params.shape * params.scale - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_gamma_rejects_constant_and_empty() {
        assert!(matches!(fit_gamma(&[0.1; 30]), Err(SpiError::DegenerateSample(_))));
        assert!(matches!(fit_gamma(&[]), Err(SpiError::InvalidArgument(_))));
        assert!(matches!(fit_gamma(&[1.0, 0.0]), Err(SpiError::InvalidArgument(_))));
    }

    #[test]
    fn test_incomplete_gamma_matches_exponential_cdf() {
        // P(1, x) = 1 - e^-x; x = 0.5 uses the series, x = 5 the fraction.
        for x in [0.5, 2.0, 5.0] {
            let p = regularized_lower_gamma(1.0, x).unwrap();
            assert!((p - (1.0 - f64::exp(-x))).abs() < 1e-10, "x = {x}");
        }
    }

    #[test]
    fn test_normal_quantile_known_values() {
        assert!(normal_quantile(0.5).abs() < 1e-12);
        assert!((normal_quantile(0.975) - 1.959963984540054).abs() < 1e-9);
        assert!((normal_quantile(0.025) + 1.959963984540054).abs() < 1e-9);
        assert!((normal_quantile(0.001) + 3.090232306167814).abs() < 1e-8);
        assert_eq!(normal_quantile(1.0), f64::INFINITY);
        assert!(normal_quantile(1.5).is_nan());
    }

    #[test]
    fn test_spi_category_bands() {
        assert_eq!(SpiCategory::from_value(2.0), SpiCategory::ExtremelyWet);
        assert_eq!(SpiCategory::from_value(1.2), SpiCategory::ModeratelyWet);
        assert_eq!(SpiCategory::from_value(-1.0), SpiCategory::NearNormal);
        assert_eq!(SpiCategory::from_value(-1.2), SpiCategory::ModerateDrought);
        assert_eq!(SpiCategory::from_value(-2.0), SpiCategory::SevereDrought);
        assert_eq!(SpiCategory::from_value(-2.1), SpiCategory::ExtremeDrought);
        assert_eq!(SpiCategory::ExtremeDrought.label(), "Sécheresse extrême");
    }
}
