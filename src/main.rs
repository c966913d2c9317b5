//! Batch job CLI. An external scheduler invokes one subcommand per run:
//!
//! ```text
//! accountpulse snapshot    # classify + snapshot every account
//! accountpulse milestones  # onboarding milestone detection
//! accountpulse expansion   # expansion opportunity scoring
//! accountpulse churn       # print the ranked churn-risk report
//! accountpulse dashboard   # print the portfolio summary
//! ```

use std::sync::Arc;

use accountpulse::config::EngineConfig;
use accountpulse::dashboard::DashboardService;
use accountpulse::db::EngineDb;
use accountpulse::jobs::JobRunner;
use accountpulse::providers::NotConfigured;
use accountpulse::signals::SignalAggregator;
use accountpulse::EngineError;

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        log::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), EngineError> {
    let command = std::env::args().nth(1).unwrap_or_default();
    let config = EngineConfig::load()?;
    let db = EngineDb::open()?;

    match command.as_str() {
        "snapshot" | "milestones" | "expansion" => {
            let runner = build_runner(db, &config);
            let summary = match command.as_str() {
                "snapshot" => runner.run_snapshot_job().await?,
                "milestones" => runner.run_milestone_job().await?,
                _ => runner.run_expansion_job().await?,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&summary)
                    .map_err(|e| EngineError::Validation(e.to_string()))?
            );
            Ok(())
        }
        "churn" => {
            let runner = build_runner(db, &config);
            let report = runner.run_churn_report().await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report)
                    .map_err(|e| EngineError::Validation(e.to_string()))?
            );
            Ok(())
        }
        "dashboard" => {
            let service = DashboardService::new().with_trend_window(config.trend_window_days);
            let summary = service.summary(&db)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&summary)
                    .map_err(|e| EngineError::Validation(e.to_string()))?
            );
            Ok(())
        }
        other => Err(EngineError::Validation(format!(
            "unknown command {:?}; expected snapshot, milestones, expansion, churn, or dashboard",
            other
        ))),
    }
}

/// Wire providers from config. Concrete API clients plug in here; without
/// credentials every provider is a `NotConfigured` placeholder and the
/// affected accounts report themselves as failed rather than crashing the
/// run.
fn build_runner(db: EngineDb, config: &EngineConfig) -> JobRunner {
    if !config.crm_configured() {
        log::warn!("no CRM credentials configured; accounts cannot be aggregated");
    }
    let aggregator = SignalAggregator::new(
        Arc::new(NotConfigured("crm")),
        Arc::new(NotConfigured("billing")),
        Arc::new(NotConfigured("usage")),
    );
    JobRunner::new(db, Arc::new(aggregator), config.batch_concurrency)
}
