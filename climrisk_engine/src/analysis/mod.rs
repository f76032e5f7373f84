/// Climate analysis for drought monitoring.
///
/// Everything here is a pure function of a `ClimateSeries` and an immutable
/// configuration section; nothing fetches data or keeps state between calls.
///
/// Submodules:
/// - `spi`: Standardized Precipitation Index with explicit fallback outcomes.
/// - `indicators`: the fixed indicator set derived from one series.
/// - `periods`: segmentation of a series into drought periods.
/// - `forecast`: seeded multi-horizon projections and their scoring.

pub mod forecast;
pub mod indicators;
pub mod periods;
pub mod spi;
