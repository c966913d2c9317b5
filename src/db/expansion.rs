//! Persisted expansion opportunities (one per account + opportunity type).

use chrono::Utc;
use rusqlite::{params, Row};
use uuid::Uuid;

use super::*;

fn opportunity_from_row(row: &Row) -> rusqlite::Result<DbExpansionOpportunity> {
    Ok(DbExpansionOpportunity {
        id: row.get(0)?,
        account_id: row.get(1)?,
        opportunity_type: row.get(2)?,
        score: row.get(3)?,
        signal_types: row.get(4)?,
        potential_value: row.get(5)?,
        detected_at: row.get(6)?,
    })
}

impl EngineDb {
    /// Upsert an opportunity. Re-detection refreshes score, value, and
    /// timestamp rather than duplicating the row.
    pub fn upsert_expansion_opportunity(
        &self,
        account_id: &str,
        opportunity_type: &str,
        score: i32,
        signal_types_json: &str,
        potential_value: f64,
    ) -> Result<(), DbError> {
        self.conn_ref().execute(
            "INSERT INTO expansion_opportunities
                (id, account_id, opportunity_type, score, signal_types,
                 potential_value, detected_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(account_id, opportunity_type) DO UPDATE SET
                score = excluded.score,
                signal_types = excluded.signal_types,
                potential_value = excluded.potential_value,
                detected_at = excluded.detected_at",
            params![
                format!("exp-{}", Uuid::new_v4()),
                account_id,
                opportunity_type,
                score,
                signal_types_json,
                potential_value,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All opportunities, highest score first.
    pub fn get_expansion_opportunities(&self) -> Result<Vec<DbExpansionOpportunity>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT id, account_id, opportunity_type, score, signal_types,
                    potential_value, detected_at
             FROM expansion_opportunities
             ORDER BY score DESC, potential_value DESC",
        )?;
        let rows = stmt.query_map([], opportunity_from_row)?;
        let mut opportunities = Vec::new();
        for row in rows {
            opportunities.push(row?);
        }
        Ok(opportunities)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;

    #[test]
    fn test_upsert_refreshes_instead_of_duplicating() {
        let db = test_db();
        db.upsert_expansion_opportunity("acme", "upsell", 55, r#"["usage_growth"]"#, 1500.0)
            .expect("insert");
        db.upsert_expansion_opportunity("acme", "upsell", 70, r#"["usage_growth","high_engagement"]"#, 2000.0)
            .expect("refresh");

        let all = db.get_expansion_opportunities().expect("query");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].score, 70);
        assert_eq!(all[0].potential_value, 2000.0);
    }

    #[test]
    fn test_ordered_by_score() {
        let db = test_db();
        db.upsert_expansion_opportunity("a", "upsell", 55, "[]", 100.0)
            .expect("insert");
        db.upsert_expansion_opportunity("b", "upgrade", 90, "[]", 300.0)
            .expect("insert");

        let all = db.get_expansion_opportunities().expect("query");
        assert_eq!(all[0].account_id, "b");
    }
}
