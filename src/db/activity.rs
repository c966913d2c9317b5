//! Activity/audit log. One row per notable engine event: trigger
//! evaluations, milestone completions, snapshot transitions.

use chrono::Utc;
use rusqlite::{params, Row};
use uuid::Uuid;

use super::*;

fn activity_from_row(row: &Row) -> rusqlite::Result<DbActivity> {
    Ok(DbActivity {
        id: row.get(0)?,
        account_id: row.get(1)?,
        kind: row.get(2)?,
        detail: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl EngineDb {
    pub fn log_activity(
        &self,
        account_id: &str,
        kind: &str,
        detail: Option<&str>,
    ) -> Result<String, DbError> {
        let id = format!("act-{}", Uuid::new_v4());
        self.conn_ref().execute(
            "INSERT INTO activity_log (id, account_id, kind, detail, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, account_id, kind, detail, Utc::now().to_rfc3339()],
        )?;
        Ok(id)
    }

    pub fn get_activity_for_account(
        &self,
        account_id: &str,
        limit: i64,
    ) -> Result<Vec<DbActivity>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT id, account_id, kind, detail, created_at
             FROM activity_log
             WHERE account_id = ?1
             ORDER BY created_at DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![account_id, limit], activity_from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}
