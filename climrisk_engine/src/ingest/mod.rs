//! Collaborator seams.
//!
//! The engine never fetches data or calls a language model itself. Climate
//! series, observed forecasts and generated alert text arrive through these
//! traits. The crate ships a deterministic [`ClimateSource`] in
//! [`crate::simulate`], projects synthetic forecasts when no
//! [`ForecastSource`] is given, and falls back to templates when no
//! [`AlertTextSource`] answers.

use crate::model::{ClimateSeries, EngineError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Length of the historical window analyzed for a locality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisPeriod {
    Days7,
    Days15,
    Days30,
    Days90,
    Days365,
}

impl AnalysisPeriod {
    pub const ALL: [AnalysisPeriod; 5] = [
        AnalysisPeriod::Days7,
        AnalysisPeriod::Days15,
        AnalysisPeriod::Days30,
        AnalysisPeriod::Days90,
        AnalysisPeriod::Days365,
    ];

    pub fn days(&self) -> u32 {
        match self {
            AnalysisPeriod::Days7 => 7,
            AnalysisPeriod::Days15 => 15,
            AnalysisPeriod::Days30 => 30,
            AnalysisPeriod::Days90 => 90,
            AnalysisPeriod::Days365 => 365,
        }
    }

    /// Exact match only; `None` for any other day count.
    pub fn from_days(days: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.days() == days)
    }

    pub fn label(&self) -> String {
        format!("{} jours", self.days())
    }
}

/// Source of daily climate series for a coordinate pair.
///
/// Implementations are shared across the group sample workers, hence the
/// `Send + Sync` bound.
pub trait ClimateSource: Send + Sync {
    fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        period: AnalysisPeriod,
    ) -> Result<ClimateSeries, EngineError>;
}

/// Source of observed short-range forecasts (daily records from `start`).
pub trait ForecastSource: Send + Sync {
    fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
        start: DateTime<Utc>,
        days: usize,
    ) -> Result<ClimateSeries, EngineError>;
}

/// Generative text source for group alerts.
///
/// The returned text is expected to follow the tagged line format decoded
/// by [`crate::alert::text::parse_alert_text`].
pub trait AlertTextSource: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, EngineError>;
}
