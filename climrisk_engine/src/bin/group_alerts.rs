//! Group drought alerts for the built-in locality registry.
//!
//! Climate series come from the seeded simulator anchored at the current
//! date, so two runs on the same day print the same alerts.
//!
//! Usage:
//! ```bash
//! # Alerts per region over the configured period
//! cargo run --bin group_alerts
//!
//! # Per agro-ecological zone over 90 days, as JSON
//! cargo run --bin group_alerts -- --group-by zone --period 90 --json
//!
//! # Explicit configuration file (otherwise CLIMRISK_CONFIG or defaults)
//! cargo run --bin group_alerts -- --config climrisk.toml
//! ```

use chrono::Utc;
use clap::{Parser, ValueEnum};
use climrisk_engine::config::{ConfigError, EngineConfig, load_config};
use climrisk_engine::ingest::AnalysisPeriod;
use climrisk_engine::localities::all_localities;
use climrisk_engine::logging::{LoggingError, init_logging};
use climrisk_engine::model::{GroupBy, RiskLevel};
use climrisk_engine::simulate::SimulatedClimateSource;
use climrisk_engine::RiskEngine;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("logging setup failed: {0}")]
    Logging(#[from] LoggingError),

    #[error("unsupported analysis period: {0} days (use 7, 15, 30, 90 or 365)")]
    Period(u32),

    #[error("output encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupingArg {
    Region,
    Zone,
}

impl From<GroupingArg> for GroupBy {
    fn from(arg: GroupingArg) -> Self {
        match arg {
            GroupingArg::Region => GroupBy::Region,
            GroupingArg::Zone => GroupBy::Zone,
        }
    }
}

#[derive(Parser)]
#[command(name = "group_alerts", about = "Drought alerts grouped by region or agro-ecological zone")]
struct Args {
    /// Grouping key
    #[arg(long, value_enum, default_value = "region")]
    group_by: GroupingArg,

    /// Analysis period in days (defaults to group.analysis_period_days)
    #[arg(long)]
    period: Option<u32>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print alerts as JSON
    #[arg(long)]
    json: bool,
}

fn level_icon(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::VeryHigh => "🔴",
        RiskLevel::High => "🟠",
        RiskLevel::Moderate => "🟡",
        RiskLevel::Low => "🔵",
        RiskLevel::VeryLow => "🟢",
        RiskLevel::Undetermined => "⚪",
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => {
            let config = load_config(path)?;
            config.validate()?;
            config
        }
        None => EngineConfig::from_env()?,
    };
    init_logging(&config.logging)?;

    let days = args.period.unwrap_or(config.group.analysis_period_days);
    let period = AnalysisPeriod::from_days(days).ok_or(CliError::Period(days))?;
    let group_by = GroupBy::from(args.group_by);

    let engine = RiskEngine::new(&config);
    let now = Utc::now();
    let source = SimulatedClimateSource::new(now);
    let localities = all_localities();

    info!(
        localities = localities.len(),
        group_by = group_by.label(),
        period = %period.label(),
        "generating group alerts"
    );
    let alerts = engine
        .group_aggregator(&source)
        .generate_alerts(&localities, group_by, period, now);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&alerts)?);
        return Ok(());
    }

    println!("\n📊 Alertes sécheresse par {} ({})", group_by.label(), period.label());
    println!("{}", "=".repeat(60));
    for alert in &alerts {
        println!(
            "\n{} {} - {} (score moyen {:.1}, {:.0}% à haut risque)",
            level_icon(alert.risk_level),
            alert.group_name,
            alert.risk_level,
            alert.avg_risk_score,
            alert.high_risk_ratio * 100.0
        );
        println!(
            "   Échantillon : {} / {} localités",
            alert.sample_localities.join(", "),
            alert.total_localities
        );
        println!("   {}", alert.alert.title);
        println!("   {}", alert.alert.evaluation);
        println!("   Actions : {}", alert.alert.coordinated_actions.join("; "));
        println!("   Période : {} | Urgence : {}", alert.alert.period, alert.alert.urgency);
        println!("   Coordination : {}", alert.recommendations.coordination);
    }
    println!("\n✅ {} alertes générées", alerts.len());
    Ok(())
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}
