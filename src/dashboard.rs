//! Portfolio dashboard summary, cached behind a 60s TTL.

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::cache::{Clock, SystemClock, TtlCache, DASHBOARD_TTL_SECONDS};
use crate::db::EngineDb;
use crate::error::EngineError;
use crate::health::{portfolio_trend, transitions_in_sequence, windowed_trend, TrendLabel};
use crate::types::HealthCategory;

/// Default lookback for the portfolio and per-account trends.
const TREND_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_accounts: usize,
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
    pub unknown: usize,
    pub total_mrr: f64,
    /// MRR held by red accounts.
    pub mrr_at_risk: f64,
    pub expansion_opportunities: usize,
    /// Upgrade/downgrade balance across all accounts over the last week.
    pub trend: TrendLabel,
}

pub struct DashboardService {
    cache: TtlCache<PortfolioSummary>,
    clock: Arc<dyn Clock>,
    trend_window_days: i64,
}

impl DashboardService {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        DashboardService {
            cache: TtlCache::new(Duration::seconds(DASHBOARD_TTL_SECONDS)),
            clock,
            trend_window_days: TREND_WINDOW_DAYS,
        }
    }

    pub fn with_trend_window(mut self, days: i64) -> Self {
        self.trend_window_days = days.max(1);
        self
    }

    /// The portfolio summary, recomputed at most once per TTL.
    pub fn summary(&self, db: &EngineDb) -> Result<PortfolioSummary, EngineError> {
        if let Some(cached) = self.cache.get(self.clock.as_ref()) {
            return Ok(cached);
        }
        let summary = self.compute(db)?;
        self.cache.put(summary.clone(), self.clock.as_ref());
        Ok(summary)
    }

    /// Drop the cached slot so the next read recomputes. Call after
    /// rewriting health projections.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    fn compute(&self, db: &EngineDb) -> Result<PortfolioSummary, EngineError> {
        let accounts = db.get_all_accounts()?;
        let mut summary = PortfolioSummary {
            total_accounts: accounts.len(),
            ..Default::default()
        };

        let mut transitions = Vec::new();
        for account in &accounts {
            summary.total_mrr += account.mrr;
            match HealthCategory::parse(&account.health) {
                HealthCategory::Green => summary.green += 1,
                HealthCategory::Yellow => summary.yellow += 1,
                HealthCategory::Red => {
                    summary.red += 1;
                    summary.mrr_at_risk += account.mrr;
                }
                HealthCategory::Unknown => summary.unknown += 1,
            }
            let snapshots = db.get_snapshots_in_window(&account.id, self.trend_window_days)?;
            transitions.extend(transitions_in_sequence(&snapshots));
        }

        summary.trend = portfolio_trend(&transitions);
        summary.expansion_opportunities = db.get_expansion_opportunities()?.len();
        Ok(summary)
    }

    /// One account's windowed health trend.
    pub fn account_trend(
        &self,
        db: &EngineDb,
        account_id: &str,
        window_days: i64,
    ) -> Result<TrendLabel, EngineError> {
        let snapshots = db.get_snapshots_in_window(account_id, window_days)?;
        Ok(windowed_trend(&snapshots))
    }
}

impl Default for DashboardService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::accounts::sample_account;
    use crate::db::test_utils::test_db;

    #[test]
    fn test_summary_counts_and_mrr() {
        let db = test_db();
        let mut green = sample_account("green-co", "Green Co");
        green.health = "green".to_string();
        green.mrr = 1_000.0;
        let mut red = sample_account("red-co", "Red Co");
        red.health = "red".to_string();
        red.mrr = 400.0;
        db.upsert_account(&green).expect("upsert");
        db.upsert_account(&red).expect("upsert");

        let service = DashboardService::new();
        let summary = service.summary(&db).expect("summary");
        assert_eq!(summary.total_accounts, 2);
        assert_eq!(summary.green, 1);
        assert_eq!(summary.red, 1);
        assert_eq!(summary.total_mrr, 1_400.0);
        assert_eq!(summary.mrr_at_risk, 400.0);
    }

    #[test]
    fn test_account_trend_from_snapshot_window() {
        let db = test_db();
        let now = chrono::Utc::now();
        for (i, cat) in ["red", "yellow", "green"].iter().enumerate() {
            let ts = (now - chrono::Duration::days(2 - i as i64)).to_rfc3339();
            db.insert_snapshot(&crate::db::snapshots::sample_snapshot("acme", cat, &ts))
                .expect("insert");
        }

        let service = DashboardService::new();
        let trend = service.account_trend(&db, "acme", 7).expect("trend");
        assert_eq!(trend, TrendLabel::Improving);
        assert_eq!(
            service.account_trend(&db, "empty", 7).expect("trend"),
            TrendLabel::Unknown
        );
    }

    #[test]
    fn test_summary_served_from_cache_until_invalidated() {
        let db = test_db();
        let service = DashboardService::new();

        let before = service.summary(&db).expect("summary");
        assert_eq!(before.total_accounts, 0);

        db.upsert_account(&sample_account("late-co", "Late Co"))
            .expect("upsert");

        // Still the cached snapshot.
        let cached = service.summary(&db).expect("summary");
        assert_eq!(cached.total_accounts, 0);

        service.invalidate();
        let fresh = service.summary(&db).expect("summary");
        assert_eq!(fresh.total_accounts, 1);
    }
}
