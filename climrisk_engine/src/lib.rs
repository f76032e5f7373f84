//! Climate risk indicators and alerts for monitored localities.
//!
//! Daily climate series go in; drought indicators, drought periods, risk
//! assessments, flood alert levels, multi-horizon forecasts and grouped
//! alert texts come out. Data access and text generation sit behind the
//! traits in [`ingest`], so the engine itself performs no I/O beyond
//! reading its configuration file.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod localities;
pub mod logging;
pub mod model;
pub mod simulate;

pub use config::{EngineConfig, load_config};
pub use engine::{ForecastReport, LocalityReport, RiskEngine};
pub use model::{ClimateRecord, ClimateSeries, EngineError, GroupBy, Locality, RiskLevel};
