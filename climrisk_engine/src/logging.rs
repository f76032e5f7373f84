//! Structured logging for the climate risk engine.
//!
//! Built on `tracing`. Every engine event carries a `component` field so the
//! output can be filtered per stage, and sample failures are classified
//! before logging so that expected gaps (empty series) stay quiet while
//! service degradation surfaces as errors.

use crate::config::{LogFormat, LoggingConfig};
use crate::model::EngineError;
use std::fmt;
use std::fs::OpenOptions;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Engine stage an event originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Indicators,
    Periods,
    Drought,
    Flood,
    Forecast,
    Group,
    Source,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Indicators => write!(f, "IND"),
            Component::Periods => write!(f, "PER"),
            Component::Drought => write!(f, "DRT"),
            Component::Flood => write!(f, "FLD"),
            Component::Forecast => write!(f, "FCS"),
            Component::Group => write!(f, "GRP"),
            Component::Source => write!(f, "SRC"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// No data for the period; the locality is simply skipped
    Expected,
    /// Malformed data or a failing upstream service
    Unexpected,
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify why a sampled locality could not be assessed.
pub fn classify_sample_failure(err: &EngineError) -> FailureType {
    match err {
        EngineError::EmptySeries => FailureType::Expected,
        EngineError::LengthMismatch { .. }
        | EngineError::NonMonotonicTimestamps { .. }
        | EngineError::NonFiniteValue { .. } => FailureType::Unexpected,
        EngineError::SourceUnavailable(msg) | EngineError::TextSourceUnavailable(msg) => {
            let msg = msg.to_lowercase();
            if msg.contains("http") || msg.contains("timeout") {
                FailureType::Unexpected
            } else if msg.contains("no data") {
                FailureType::Expected
            } else {
                FailureType::Unknown
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Initialization
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),
    #[error("failed to open log file: {0}")]
    File(#[from] std::io::Error),
    #[error("global subscriber already set: {0}")]
    Init(#[from] TryInitError),
}

/// Build the event filter, letting `RUST_LOG` win over the configured level.
pub fn build_filter(level: &str) -> Result<EnvFilter, ParseError> {
    match std::env::var("RUST_LOG") {
        Ok(directive) => EnvFilter::try_new(directive),
        Err(_) => EnvFilter::try_new(level),
    }
}

/// Install the global subscriber. Call once, from a binary.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_filter(&config.level)?;

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tfmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    match config.format {
        LogFormat::Json => registry
            .with(tfmt::layer().json().with_target(true))
            .try_init()?,
        LogFormat::Pretty => registry
            .with(tfmt::layer().pretty().with_target(true))
            .try_init()?,
        LogFormat::Compact => registry
            .with(tfmt::layer().compact().with_target(false))
            .try_init()?,
    }

    info!(
        component = %Component::System,
        log.level = %config.level,
        log.format = ?config.format,
        log.file = config.log_file.as_deref().unwrap_or("-"),
        "logging initialized"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a failed locality assessment with automatic classification.
pub fn log_sample_failure(group: &str, locality: &str, operation: &str, err: &EngineError) {
    let failure_type = classify_sample_failure(err);
    match failure_type {
        FailureType::Expected => debug!(
            component = %Component::Group, group, locality, %failure_type,
            "{operation} failed: {err}"
        ),
        FailureType::Unexpected => error!(
            component = %Component::Group, group, locality, %failure_type,
            "{operation} failed: {err}"
        ),
        FailureType::Unknown => warn!(
            component = %Component::Group, group, locality, %failure_type,
            "{operation} failed: {err}"
        ),
    }
}

/// Log the outcome of a group run.
pub fn log_group_summary(group: &str, total: usize, successful: usize, failed: usize) {
    let message = format!("{successful}/{total} samples assessed, {failed} failed");

    if failed == 0 {
        info!(component = %Component::Group, group, "{message}");
    } else if successful == 0 {
        error!(component = %Component::Group, group, "{message}");
    } else {
        warn!(component = %Component::Group, group, "{message}");
    }
}
