//! Health snapshot persistence.
//!
//! Snapshots are append-only: one row per account per run, never mutated or
//! deleted. The only read pattern is "ordered by creation time, optionally
//! windowed" — everything the trend detector needs.

use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::*;

fn snapshot_from_row(row: &Row) -> rusqlite::Result<DbSnapshot> {
    Ok(DbSnapshot {
        id: row.get(0)?,
        account_id: row.get(1)?,
        category: row.get(2)?,
        score: row.get(3)?,
        mrr: row.get(4)?,
        usage_30d: row.get(5)?,
        days_since_login: row.get(6)?,
        risk_signals: row.get(7)?,
        positive_signals: row.get(8)?,
        created_at: row.get(9)?,
    })
}

const SNAPSHOT_COLUMNS: &str = "id, account_id, category, score, mrr, usage_30d, \
     days_since_login, risk_signals, positive_signals, created_at";

impl EngineDb {
    /// Append one snapshot row. The id is generated here; callers supply
    /// the timestamp so a whole batch run shares one run time.
    pub fn insert_snapshot(&self, snapshot: &NewSnapshot) -> Result<String, DbError> {
        let id = format!("snap-{}", Uuid::new_v4());
        self.conn_ref().execute(
            "INSERT INTO health_snapshots
                (id, account_id, category, score, mrr, usage_30d,
                 days_since_login, risk_signals, positive_signals, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                snapshot.account_id,
                snapshot.category,
                snapshot.score,
                snapshot.mrr,
                snapshot.usage_30d,
                snapshot.days_since_login,
                snapshot.risk_signals,
                snapshot.positive_signals,
                snapshot.created_at,
            ],
        )?;
        Ok(id)
    }

    /// The most recent snapshot strictly before `before_iso`, if any.
    pub fn get_latest_snapshot_before(
        &self,
        account_id: &str,
        before_iso: &str,
    ) -> Result<Option<DbSnapshot>, DbError> {
        let result = self
            .conn_ref()
            .query_row(
                &format!(
                    "SELECT {} FROM health_snapshots
                     WHERE account_id = ?1 AND created_at < ?2
                     ORDER BY created_at DESC LIMIT 1",
                    SNAPSHOT_COLUMNS
                ),
                params![account_id, before_iso],
                snapshot_from_row,
            )
            .optional()?;
        Ok(result)
    }

    /// Snapshots for one account within the last `window_days` days,
    /// ordered oldest → newest. The cutoff is bound as an RFC3339 string
    /// so the comparison stays in the same format `created_at` is stored
    /// in; SQLite's `datetime()` renders with a space separator and would
    /// compare at date granularity only.
    pub fn get_snapshots_in_window(
        &self,
        account_id: &str,
        window_days: i64,
    ) -> Result<Vec<DbSnapshot>, DbError> {
        let cutoff = (chrono::Utc::now() - chrono::Duration::days(window_days)).to_rfc3339();
        let mut stmt = self.conn_ref().prepare(&format!(
            "SELECT {} FROM health_snapshots
             WHERE account_id = ?1 AND created_at >= ?2
             ORDER BY created_at ASC",
            SNAPSHOT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![account_id, cutoff], snapshot_from_row)?;
        let mut snapshots = Vec::new();
        for row in rows {
            snapshots.push(row?);
        }
        Ok(snapshots)
    }

    pub fn count_snapshots(&self, account_id: &str) -> Result<i64, DbError> {
        let count = self.conn_ref().query_row(
            "SELECT COUNT(*) FROM health_snapshots WHERE account_id = ?1",
            params![account_id],
            |r| r.get(0),
        )?;
        Ok(count)
    }
}

/// Input for one snapshot append. Ids are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewSnapshot {
    pub account_id: String,
    pub category: String,
    pub score: i32,
    pub mrr: f64,
    pub usage_30d: i32,
    pub days_since_login: Option<i32>,
    pub risk_signals: Option<String>,
    pub positive_signals: Option<String>,
    pub created_at: String,
}

#[cfg(test)]
pub(crate) fn sample_snapshot(account_id: &str, category: &str, created_at: &str) -> NewSnapshot {
    NewSnapshot {
        account_id: account_id.to_string(),
        category: category.to_string(),
        score: match category {
            "green" => 80,
            "yellow" => 50,
            "red" => 20,
            _ => 50,
        },
        mrr: 500.0,
        usage_30d: 40,
        days_since_login: Some(2),
        risk_signals: None,
        positive_signals: None,
        created_at: created_at.to_string(),
    }
}
