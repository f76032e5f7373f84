//! Drought period segmentation.
//!
//! A drought period is a run of consecutive dry days (precipitation below
//! the threshold) at least `min_dry_days` long. A run still open at the end
//! of the series is closed there and judged by the same rule.

use crate::config::PeriodConfig;
use crate::logging::Component;
use crate::model::ClimateSeries;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DroughtIntensity {
    #[serde(rename = "faible")]
    Mild,
    #[serde(rename = "modérée")]
    Moderate,
    #[serde(rename = "sévère")]
    Severe,
    #[serde(rename = "extrême")]
    Extreme,
}

impl DroughtIntensity {
    pub fn label(&self) -> &'static str {
        match self {
            DroughtIntensity::Mild => "faible",
            DroughtIntensity::Moderate => "modérée",
            DroughtIntensity::Severe => "sévère",
            DroughtIntensity::Extreme => "extrême",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroughtPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Inclusive indices into the source series.
    pub start_index: usize,
    pub end_index: usize,
    pub dry_day_count: usize,
    /// Threshold minus mean precipitation over the period, in mm.
    pub average_deficit: f64,
    pub intensity: DroughtIntensity,
}

#[derive(Debug, Clone, Default)]
pub struct PeriodSegmenter {
    config: PeriodConfig,
}

impl PeriodSegmenter {
    pub fn new(config: PeriodConfig) -> Self {
        Self { config }
    }

    /// Buckets `duration × deficit` into an intensity band.
    pub fn assess_drought_intensity(&self, duration: usize, deficit: f64) -> DroughtIntensity {
        let score = duration as f64 * deficit;
        if score > self.config.extreme_above {
            DroughtIntensity::Extreme
        } else if score > self.config.severe_above {
            DroughtIntensity::Severe
        } else if score > self.config.moderate_above {
            DroughtIntensity::Moderate
        } else {
            DroughtIntensity::Mild
        }
    }

    pub fn detect(&self, series: &ClimateSeries) -> Vec<DroughtPeriod> {
        self.detect_in(&series.timestamps(), &series.precipitation())
    }

    /// Scans parallel timestamp/precipitation slices; extra entries in the
    /// longer slice are ignored.
    pub fn detect_in(&self, timestamps: &[DateTime<Utc>], precipitation: &[f64]) -> Vec<DroughtPeriod> {
        let n = timestamps.len().min(precipitation.len());
        let mut periods = Vec::new();
        let mut run_start: Option<usize> = None;

        for i in 0..n {
            if precipitation[i] < self.config.dry_threshold_mm {
                run_start.get_or_insert(i);
            } else if let Some(start) = run_start.take() {
                self.close_run(timestamps, precipitation, start, i - 1, &mut periods);
            }
        }
        if let Some(start) = run_start {
            self.close_run(timestamps, precipitation, start, n - 1, &mut periods);
        }

        debug!(
            component = %Component::Periods,
            days = n,
            periods = periods.len(),
            "drought periods detected"
        );
        periods
    }

    fn close_run(
        &self,
        timestamps: &[DateTime<Utc>],
        precipitation: &[f64],
        start: usize,
        end: usize,
        periods: &mut Vec<DroughtPeriod>,
    ) {
        let dry_day_count = end - start + 1;
        if dry_day_count < self.config.min_dry_days {
            return;
        }

        let run = &precipitation[start..=end];
        let average = run.iter().sum::<f64>() / dry_day_count as f64;
        let average_deficit = self.config.dry_threshold_mm - average;

        periods.push(DroughtPeriod {
            start: timestamps[start],
            end: timestamps[end],
            start_index: start,
            end_index: end,
            dry_day_count,
            average_deficit,
            intensity: self.assess_drought_intensity(dry_day_count, average_deficit),
        });
    }
}

/// Summary of a series and the periods found in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroughtStatistics {
    pub total_days: usize,
    /// All days below the dry threshold, inside a period or not.
    pub dry_days: usize,
    /// Days covered by emitted periods.
    pub drought_days: usize,
    pub period_count: usize,
    pub longest_period: usize,
    /// Periods rated severe or extreme.
    pub severe_periods: usize,
}

impl DroughtStatistics {
    pub fn summarize(precipitation: &[f64], periods: &[DroughtPeriod], dry_threshold_mm: f64) -> Self {
        Self {
            total_days: precipitation.len(),
            dry_days: precipitation.iter().filter(|&&p| p < dry_threshold_mm).count(),
            drought_days: periods.iter().map(|p| p.dry_day_count).sum(),
            period_count: periods.len(),
            longest_period: periods.iter().map(|p| p.dry_day_count).max().unwrap_or(0),
            severe_periods: periods
                .iter()
                .filter(|p| p.intensity >= DroughtIntensity::Severe)
                .count(),
        }
    }

    /// Fraction of days that were dry, 0 for an empty series.
    pub fn dry_day_ratio(&self) -> f64 {
        if self.total_days == 0 {
            0.0
        } else {
            self.dry_days as f64 / self.total_days as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn days(n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| start + Duration::days(i as i64)).collect()
    }

    #[test]
    fn test_two_periods_split_by_rain_day() {
        let precip = [0.0, 0.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 0.0];
        let ts = days(precip.len());
        let periods = PeriodSegmenter::default().detect_in(&ts, &precip);

        assert_eq!(periods.len(), 2);
        assert_eq!((periods[0].start_index, periods[0].end_index), (0, 4));
        assert_eq!(periods[0].dry_day_count, 5);
        assert_eq!(periods[0].start, ts[0]);
        assert_eq!(periods[0].end, ts[4]);
        assert_eq!((periods[1].start_index, periods[1].end_index), (6, 9));
        assert_eq!(periods[1].dry_day_count, 4, "open period at the end is emitted");
        assert!((periods[0].average_deficit - 0.1).abs() < 1e-12);
        assert_eq!(periods[0].intensity, DroughtIntensity::Mild);
    }

    #[test]
    fn test_short_runs_are_dropped() {
        let precip = [0.0, 0.0, 1.0, 0.0, 2.0, 0.0, 0.0];
        let periods = PeriodSegmenter::default().detect_in(&days(precip.len()), &precip);
        assert!(periods.is_empty());
    }

    #[test]
    fn test_all_dry_series_is_one_period() {
        let precip = [0.0; 8];
        let periods = PeriodSegmenter::default().detect_in(&days(8), &precip);
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].dry_day_count, 8);
    }

    #[test]
    fn test_detection_is_idempotent() {
        let precip = [0.0, 0.0, 0.0, 3.0, 0.0, 0.0, 0.0, 0.0];
        let ts = days(precip.len());
        let segmenter = PeriodSegmenter::default();
        assert_eq!(segmenter.detect_in(&ts, &precip), segmenter.detect_in(&ts, &precip));
    }

    #[test]
    fn test_intensity_bands() {
        let segmenter = PeriodSegmenter::default();
        assert_eq!(segmenter.assess_drought_intensity(3, 0.5), DroughtIntensity::Mild);
        assert_eq!(segmenter.assess_drought_intensity(5, 0.5), DroughtIntensity::Moderate);
        assert_eq!(segmenter.assess_drought_intensity(10, 0.6), DroughtIntensity::Severe);
        assert_eq!(segmenter.assess_drought_intensity(20, 0.6), DroughtIntensity::Extreme);
        assert_eq!(
            segmenter.assess_drought_intensity(10, 1.0),
            DroughtIntensity::Severe,
            "bands are exclusive: 10 is not above 10"
        );
    }

    #[test]
    fn test_wider_threshold_rates_intensity() {
        let segmenter = PeriodSegmenter::new(PeriodConfig {
            dry_threshold_mm: 2.0,
            ..PeriodConfig::default()
        });
        let precip = [0.0; 6];
        let periods = segmenter.detect_in(&days(6), &precip);
        // 6 days × 2 mm deficit = 12
        assert_eq!(periods[0].intensity, DroughtIntensity::Extreme);
    }

    #[test]
    fn test_statistics_summary() {
        let precip = [0.0, 0.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let periods = PeriodSegmenter::default().detect_in(&days(precip.len()), &precip);
        let stats = DroughtStatistics::summarize(&precip, &periods, 0.1);

        assert_eq!(stats.total_days, 12);
        assert_eq!(stats.dry_days, 10);
        assert_eq!(stats.drought_days, 9);
        assert_eq!(stats.period_count, 2);
        assert_eq!(stats.longest_period, 5);
        assert_eq!(stats.severe_periods, 0);
        assert!((stats.dry_day_ratio() - 10.0 / 12.0).abs() < 1e-12);
    }
}
