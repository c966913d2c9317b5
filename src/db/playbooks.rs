//! Playbook definitions: trigger key, active flag, ordered action list.

use rusqlite::{params, Row};

use super::*;

fn playbook_from_row(row: &Row) -> rusqlite::Result<DbPlaybook> {
    Ok(DbPlaybook {
        id: row.get(0)?,
        name: row.get(1)?,
        trigger_key: row.get(2)?,
        active: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn action_from_row(row: &Row) -> rusqlite::Result<DbPlaybookAction> {
    Ok(DbPlaybookAction {
        id: row.get(0)?,
        playbook_id: row.get(1)?,
        position: row.get(2)?,
        action_type: row.get(3)?,
        title_template: row.get(4)?,
        description_template: row.get(5)?,
        priority: row.get(6)?,
        due_in_days: row.get(7)?,
    })
}

impl EngineDb {
    pub fn upsert_playbook(&self, playbook: &DbPlaybook) -> Result<(), DbError> {
        self.conn_ref().execute(
            "INSERT INTO playbooks (id, name, trigger_key, active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                trigger_key = excluded.trigger_key,
                active = excluded.active",
            params![
                playbook.id,
                playbook.name,
                playbook.trigger_key,
                playbook.active,
                playbook.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn upsert_playbook_action(&self, action: &DbPlaybookAction) -> Result<(), DbError> {
        self.conn_ref().execute(
            "INSERT INTO playbook_actions
                (id, playbook_id, position, action_type, title_template,
                 description_template, priority, due_in_days)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                position = excluded.position,
                action_type = excluded.action_type,
                title_template = excluded.title_template,
                description_template = excluded.description_template,
                priority = excluded.priority,
                due_in_days = excluded.due_in_days",
            params![
                action.id,
                action.playbook_id,
                action.position,
                action.action_type,
                action.title_template,
                action.description_template,
                action.priority,
                action.due_in_days,
            ],
        )?;
        Ok(())
    }

    /// All active playbooks whose trigger key matches, oldest first.
    pub fn get_active_playbooks_for_trigger(
        &self,
        trigger_key: &str,
    ) -> Result<Vec<DbPlaybook>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT id, name, trigger_key, active, created_at
             FROM playbooks
             WHERE trigger_key = ?1 AND active = 1
             ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![trigger_key], playbook_from_row)?;
        let mut playbooks = Vec::new();
        for row in rows {
            playbooks.push(row?);
        }
        Ok(playbooks)
    }

    /// A playbook's actions in definition order.
    pub fn get_playbook_actions(
        &self,
        playbook_id: &str,
    ) -> Result<Vec<DbPlaybookAction>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT id, playbook_id, position, action_type, title_template,
                    description_template, priority, due_in_days
             FROM playbook_actions
             WHERE playbook_id = ?1
             ORDER BY position",
        )?;
        let rows = stmt.query_map(params![playbook_id], action_from_row)?;
        let mut actions = Vec::new();
        for row in rows {
            actions.push(row?);
        }
        Ok(actions)
    }
}

#[cfg(test)]
pub(crate) fn sample_playbook(id: &str, trigger_key: &str, active: bool) -> DbPlaybook {
    DbPlaybook {
        id: id.to_string(),
        name: format!("Playbook {}", id),
        trigger_key: trigger_key.to_string(),
        active,
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
pub(crate) fn sample_action(id: &str, playbook_id: &str, position: i32) -> DbPlaybookAction {
    DbPlaybookAction {
        id: id.to_string(),
        playbook_id: playbook_id.to_string(),
        position,
        action_type: "create_task".to_string(),
        title_template: "Check in with {companyName}".to_string(),
        description_template: Some("Health dropped, score {riskScore}".to_string()),
        priority: "high".to_string(),
        due_in_days: Some(1),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;

    #[test]
    fn test_active_playbooks_filtered_by_trigger() {
        let db = test_db();
        db.upsert_playbook(&sample_playbook("pb-1", "health_drops_to_red", true))
            .expect("upsert");
        db.upsert_playbook(&sample_playbook("pb-2", "health_drops_to_red", false))
            .expect("upsert");
        db.upsert_playbook(&sample_playbook("pb-3", "inactive_30_days", true))
            .expect("upsert");

        let matched = db
            .get_active_playbooks_for_trigger("health_drops_to_red")
            .expect("query");
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "pb-1");
    }

    #[test]
    fn test_actions_returned_in_definition_order() {
        let db = test_db();
        db.upsert_playbook(&sample_playbook("pb-1", "health_drops_to_red", true))
            .expect("upsert");
        db.upsert_playbook_action(&sample_action("act-b", "pb-1", 2))
            .expect("upsert");
        db.upsert_playbook_action(&sample_action("act-a", "pb-1", 1))
            .expect("upsert");

        let actions = db.get_playbook_actions("pb-1").expect("query");
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].id, "act-a");
        assert_eq!(actions[1].id, "act-b");
    }
}
