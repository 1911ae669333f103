//! Append-only audit trail.

use chrono::Utc;
use rusqlite::params;

use helpdesk_shared::AuditAction;

use crate::codec::{conversion, parse_ts, ts};
use crate::database::Database;
use crate::error::{not_found, Result, StoreError};
use crate::models::AuditEntry;

impl Database {
    /// Record one action. `actor_id` is `None` for background jobs.
    pub fn append_audit(
        &self,
        action: AuditAction,
        actor_id: Option<i64>,
        detail: &str,
    ) -> Result<AuditEntry> {
        self.conn().execute(
            "INSERT INTO audit (created_at, action, actor_id, detail) VALUES (?1, ?2, ?3, ?4)",
            params![ts(&Utc::now()), action.as_str(), actor_id, detail],
        )?;
        let id = self.conn().last_insert_rowid();
        self.conn()
            .query_row(
                "SELECT id, created_at, action, actor_id, detail FROM audit WHERE id = ?1",
                params![id],
                row_to_audit,
            )
            .map_err(not_found)
    }

    /// Most recent entries first.
    pub fn list_audit(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, created_at, action, actor_id, detail FROM audit
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], row_to_audit)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn row_to_audit(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEntry> {
    let created_str: String = row.get(1)?;
    let action_str: String = row.get(2)?;

    Ok(AuditEntry {
        id: row.get(0)?,
        created_at: parse_ts(1, &created_str)?,
        action: action_str.parse::<AuditAction>().map_err(|e| conversion(2, e))?,
        actor_id: row.get(3)?,
        detail: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use helpdesk_shared::AuditAction;

    use crate::Database;

    #[test]
    fn entries_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("t.db")).unwrap();

        db.append_audit(AuditAction::Create, Some(7), "ticket 1 created").unwrap();
        let job = db.append_audit(AuditAction::Update, None, "ticket 1 escalated").unwrap();
        assert_eq!(job.actor_id, None);

        let entries = db.list_audit(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].detail, "ticket 1 escalated");
        assert_eq!(entries[1].action, AuditAction::Create);
        assert_eq!(db.list_audit(1).unwrap().len(), 1);
    }
}
