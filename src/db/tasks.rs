//! Task persistence and lifecycle.
//!
//! The open-task dedup invariant (at most one non-terminal task per
//! (account, playbook)) is enforced by a partial unique index, so the
//! create path is a conditional insert — a lost race surfaces as a
//! constraint violation and is reported as "skipped", never as a duplicate.

use chrono::Utc;
use rusqlite::{params, ErrorCode, OptionalExtension, Row};
use uuid::Uuid;

use crate::types::TaskStatus;

use super::*;

fn task_from_row(row: &Row) -> rusqlite::Result<DbTask> {
    Ok(DbTask {
        id: row.get(0)?,
        account_id: row.get(1)?,
        playbook_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        priority: row.get(5)?,
        status: row.get(6)?,
        due_date: row.get(7)?,
        provenance: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        completed_at: row.get(11)?,
    })
}

const TASK_COLUMNS: &str = "id, account_id, playbook_id, title, description, priority, status, \
     due_date, provenance, created_at, updated_at, completed_at";

/// Input for task creation. Status always starts at `pending`.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub account_id: String,
    pub playbook_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub due_date: Option<String>,
    pub provenance: String,
}

impl EngineDb {
    /// Conditionally create a pending task. Returns `Ok(None)` when an open
    /// task already exists for the same (account, playbook) — the partial
    /// unique index rejects the insert and we treat that as dedup, not
    /// as an error.
    pub fn create_task_if_no_open(&self, task: &NewTask) -> Result<Option<String>, DbError> {
        let id = format!("task-{}", Uuid::new_v4());
        let now = Utc::now().to_rfc3339();
        let result = self.conn_ref().execute(
            "INSERT INTO tasks
                (id, account_id, playbook_id, title, description, priority,
                 status, due_date, provenance, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?8, ?9, ?9)",
            params![
                id,
                task.account_id,
                task.playbook_id,
                task.title,
                task.description,
                task.priority,
                task.due_date,
                task.provenance,
                now,
            ],
        );
        match result {
            Ok(_) => Ok(Some(id)),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The open (non-terminal) task for a (account, playbook) pair, if any.
    pub fn get_open_task_for_playbook(
        &self,
        account_id: &str,
        playbook_id: &str,
    ) -> Result<Option<DbTask>, DbError> {
        let result = self
            .conn_ref()
            .query_row(
                &format!(
                    "SELECT {} FROM tasks
                     WHERE account_id = ?1 AND playbook_id = ?2
                       AND status IN ('pending', 'in_progress')
                     LIMIT 1",
                    TASK_COLUMNS
                ),
                params![account_id, playbook_id],
                task_from_row,
            )
            .optional()?;
        Ok(result)
    }

    pub fn get_task(&self, id: &str) -> Result<Option<DbTask>, DbError> {
        let result = self
            .conn_ref()
            .query_row(
                &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
                params![id],
                task_from_row,
            )
            .optional()?;
        Ok(result)
    }

    pub fn get_tasks_for_account(&self, account_id: &str) -> Result<Vec<DbTask>, DbError> {
        let mut stmt = self.conn_ref().prepare(&format!(
            "SELECT {} FROM tasks WHERE account_id = ?1 ORDER BY created_at",
            TASK_COLUMNS
        ))?;
        let rows = stmt.query_map(params![account_id], task_from_row)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Advance a task through its lifecycle. Rejects transitions out of
    /// terminal states and unknown statuses.
    pub fn transition_task(&self, id: &str, next: TaskStatus) -> Result<DbTask, DbError> {
        let task = self
            .get_task(id)?
            .ok_or_else(|| DbError::InvalidRow(format!("task {} not found", id)))?;
        let current = TaskStatus::parse(&task.status)
            .ok_or_else(|| DbError::InvalidRow(format!("unknown status {}", task.status)))?;

        if !current.can_transition_to(next) {
            return Err(DbError::IllegalTransition(format!(
                "{} -> {}",
                current.as_str(),
                next.as_str()
            )));
        }

        let now = Utc::now().to_rfc3339();
        let completed_at = if next == TaskStatus::Completed {
            Some(now.clone())
        } else {
            None
        };
        self.conn_ref().execute(
            "UPDATE tasks
             SET status = ?2, updated_at = ?3,
                 completed_at = COALESCE(?4, completed_at)
             WHERE id = ?1",
            params![id, next.as_str(), now, completed_at],
        )?;

        self.get_task(id)?
            .ok_or_else(|| DbError::InvalidRow(format!("task {} vanished", id)))
    }
}

#[cfg(test)]
pub(crate) fn sample_task(account_id: &str, playbook_id: Option<&str>) -> NewTask {
    NewTask {
        account_id: account_id.to_string(),
        playbook_id: playbook_id.map(|s| s.to_string()),
        title: "Check in with Acme".to_string(),
        description: None,
        priority: "high".to_string(),
        due_date: None,
        provenance: r#"{"kind":"manual","note":null}"#.to_string(),
    }
}
