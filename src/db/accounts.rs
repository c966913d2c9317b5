//! Account queries: upsert, lookup, and health projection updates.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::*;

fn account_from_row(row: &Row) -> rusqlite::Result<DbAccount> {
    Ok(DbAccount {
        id: row.get(0)?,
        external_crm_id: row.get(1)?,
        name: row.get(2)?,
        segment: row.get(3)?,
        mrr: row.get(4)?,
        plan: row.get(5)?,
        owner: row.get(6)?,
        health: row.get(7)?,
        health_score: row.get(8)?,
        risk_signals: row.get(9)?,
        positive_signals: row.get(10)?,
        payment_health: row.get(11)?,
        signup_at: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
        archived: row.get(15)?,
    })
}

const ACCOUNT_COLUMNS: &str = "id, external_crm_id, name, segment, mrr, plan, owner, health, \
     health_score, risk_signals, positive_signals, payment_health, signup_at, \
     created_at, updated_at, archived";

impl EngineDb {
    pub fn upsert_account(&self, account: &DbAccount) -> Result<(), DbError> {
        self.conn_ref().execute(
            "INSERT INTO accounts
                (id, external_crm_id, name, segment, mrr, plan, owner, health,
                 health_score, risk_signals, positive_signals, payment_health,
                 signup_at, created_at, updated_at, archived)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
             ON CONFLICT(id) DO UPDATE SET
                external_crm_id = excluded.external_crm_id,
                name = excluded.name,
                segment = excluded.segment,
                mrr = excluded.mrr,
                plan = excluded.plan,
                owner = excluded.owner,
                health = excluded.health,
                health_score = excluded.health_score,
                risk_signals = excluded.risk_signals,
                positive_signals = excluded.positive_signals,
                payment_health = excluded.payment_health,
                signup_at = excluded.signup_at,
                updated_at = excluded.updated_at,
                archived = excluded.archived",
            params![
                account.id,
                account.external_crm_id,
                account.name,
                account.segment,
                account.mrr,
                account.plan,
                account.owner,
                account.health,
                account.health_score,
                account.risk_signals,
                account.positive_signals,
                account.payment_health,
                account.signup_at,
                account.created_at,
                account.updated_at,
                account.archived,
            ],
        )?;
        Ok(())
    }

    pub fn get_account(&self, id: &str) -> Result<Option<DbAccount>, DbError> {
        let result = self
            .conn_ref()
            .query_row(
                &format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS),
                params![id],
                account_from_row,
            )
            .optional()?;
        Ok(result)
    }

    /// All non-archived accounts, ordered by name.
    pub fn get_all_accounts(&self) -> Result<Vec<DbAccount>, DbError> {
        let mut stmt = self.conn_ref().prepare(&format!(
            "SELECT {} FROM accounts WHERE archived = 0 ORDER BY name",
            ACCOUNT_COLUMNS
        ))?;
        let rows = stmt.query_map([], account_from_row)?;
        let mut accounts = Vec::new();
        for row in rows {
            accounts.push(row?);
        }
        Ok(accounts)
    }

    /// Write the classifier's output onto the account's current health
    /// projection. Accounts are never deleted, only updated.
    pub fn update_account_health(
        &self,
        id: &str,
        health: &str,
        score: i32,
        risk_signals: &[String],
        positive_signals: &[String],
        payment_health: &str,
    ) -> Result<bool, DbError> {
        let risk_json = serde_json::to_string(risk_signals)
            .map_err(|e| DbError::InvalidRow(e.to_string()))?;
        let positive_json = serde_json::to_string(positive_signals)
            .map_err(|e| DbError::InvalidRow(e.to_string()))?;
        let changed = self.conn_ref().execute(
            "UPDATE accounts
             SET health = ?2, health_score = ?3, risk_signals = ?4,
                 positive_signals = ?5, payment_health = ?6, updated_at = ?7
             WHERE id = ?1",
            params![
                id,
                health,
                score,
                risk_json,
                positive_json,
                payment_health,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
pub(crate) fn sample_account(id: &str, name: &str) -> DbAccount {
    let now = Utc::now().to_rfc3339();
    DbAccount {
        id: id.to_string(),
        external_crm_id: None,
        name: name.to_string(),
        segment: "smb".to_string(),
        mrr: 250.0,
        plan: Some("starter".to_string()),
        owner: None,
        health: "unknown".to_string(),
        health_score: 50,
        risk_signals: None,
        positive_signals: None,
        payment_health: "unknown".to_string(),
        signup_at: Some(now.clone()),
        created_at: now.clone(),
        updated_at: now,
        archived: false,
    }
}
