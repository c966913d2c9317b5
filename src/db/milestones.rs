//! Onboarding milestone persistence.
//!
//! Rows are keyed by (account, milestone). The target-day count is fixed at
//! first insert for a given segment and never re-targeted; only completion
//! and overdue state change afterward.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::*;

fn milestone_from_row(row: &Row) -> rusqlite::Result<DbMilestone> {
    Ok(DbMilestone {
        account_id: row.get(0)?,
        milestone_id: row.get(1)?,
        segment: row.get(2)?,
        target_days: row.get(3)?,
        completed_at: row.get(4)?,
        is_overdue: row.get(5)?,
        completion: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

const MILESTONE_COLUMNS: &str = "account_id, milestone_id, segment, target_days, completed_at, \
     is_overdue, completion, created_at, updated_at";

impl EngineDb {
    /// Insert the milestone row if absent. `INSERT OR IGNORE` keeps the
    /// original target_days when the row already exists.
    pub fn ensure_milestone(
        &self,
        account_id: &str,
        milestone_id: &str,
        segment: &str,
        target_days: i64,
    ) -> Result<(), DbError> {
        let now = Utc::now().to_rfc3339();
        self.conn_ref().execute(
            "INSERT OR IGNORE INTO onboarding_milestones
                (account_id, milestone_id, segment, target_days, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![account_id, milestone_id, segment, target_days, now],
        )?;
        Ok(())
    }

    pub fn get_milestone(
        &self,
        account_id: &str,
        milestone_id: &str,
    ) -> Result<Option<DbMilestone>, DbError> {
        let result = self
            .conn_ref()
            .query_row(
                &format!(
                    "SELECT {} FROM onboarding_milestones
                     WHERE account_id = ?1 AND milestone_id = ?2",
                    MILESTONE_COLUMNS
                ),
                params![account_id, milestone_id],
                milestone_from_row,
            )
            .optional()?;
        Ok(result)
    }

    /// All milestone rows for an account, in checklist insertion order.
    pub fn get_milestones_for_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<DbMilestone>, DbError> {
        let mut stmt = self.conn_ref().prepare(&format!(
            "SELECT {} FROM onboarding_milestones
             WHERE account_id = ?1 ORDER BY created_at, milestone_id",
            MILESTONE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![account_id], milestone_from_row)?;
        let mut milestones = Vec::new();
        for row in rows {
            milestones.push(row?);
        }
        Ok(milestones)
    }

    /// Mark a milestone complete with its provenance. Completing an
    /// already-complete milestone is a no-op (returns false).
    pub fn complete_milestone(
        &self,
        account_id: &str,
        milestone_id: &str,
        completion_json: &str,
    ) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn_ref().execute(
            "UPDATE onboarding_milestones
             SET completed_at = ?3, completion = ?4, is_overdue = 0, updated_at = ?3
             WHERE account_id = ?1 AND milestone_id = ?2 AND completed_at IS NULL",
            params![account_id, milestone_id, now, completion_json],
        )?;
        Ok(changed > 0)
    }

    /// Recompute the overdue flag from its defining condition. The flag is
    /// never set independently of the condition.
    pub fn set_milestone_overdue(
        &self,
        account_id: &str,
        milestone_id: &str,
        is_overdue: bool,
    ) -> Result<(), DbError> {
        self.conn_ref().execute(
            "UPDATE onboarding_milestones
             SET is_overdue = ?3, updated_at = ?4
             WHERE account_id = ?1 AND milestone_id = ?2",
            params![
                account_id,
                milestone_id,
                is_overdue,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }
}
