//! CRUD operations for [`Conversation`] records.
//!
//! The partial unique index `idx_conversations_one_open` rejects a second
//! open conversation for the same ticket, whatever the caller does.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::codec::{parse_opt_ts, parse_ts, ts};
use crate::database::Database;
use crate::error::{not_found, Result, StoreError};
use crate::models::Conversation;

const CONVERSATION_COLUMNS: &str = "id, ticket_id, closed, started_at, ended_at";

impl Database {
    /// Insert an open conversation for `ticket_id`.
    pub fn insert_conversation(&self, ticket_id: i64, at: DateTime<Utc>) -> Result<Conversation> {
        self.conn().execute(
            "INSERT INTO conversations (ticket_id, closed, started_at, ended_at)
             VALUES (?1, 0, ?2, NULL)",
            params![ticket_id, ts(&at)],
        )?;
        self.get_conversation(self.conn().last_insert_rowid())
    }

    pub fn get_conversation(&self, id: i64) -> Result<Conversation> {
        self.conn()
            .query_row(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
                params![id],
                row_to_conversation,
            )
            .map_err(not_found)
    }

    /// Most recently started conversation of a ticket, open or closed.
    pub fn latest_conversation_for_ticket(&self, ticket_id: i64) -> Result<Option<Conversation>> {
        Ok(self
            .conn()
            .query_row(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations
                     WHERE ticket_id = ?1
                     ORDER BY closed ASC, started_at DESC, id DESC
                     LIMIT 1"
                ),
                params![ticket_id],
                row_to_conversation,
            )
            .optional()?)
    }

    pub fn list_conversations_for_ticket(&self, ticket_id: i64) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE ticket_id = ?1
             ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![ticket_id], row_to_conversation)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Flip a closed conversation back to open. Returns `true` if it changed.
    pub fn reopen_conversation(&self, id: i64) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE conversations SET closed = 0, ended_at = NULL
             WHERE id = ?1 AND closed = 1",
            params![id],
        )?;
        Ok(affected > 0)
    }

    /// Close an open conversation. Returns `true` if it changed.
    pub fn close_conversation(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE conversations SET closed = 1, ended_at = ?1
             WHERE id = ?2 AND closed = 0",
            params![ts(&at), id],
        )?;
        Ok(affected > 0)
    }

    /// Close every open conversation of a ticket. Returns how many closed.
    pub fn close_conversations_for_ticket(&self, ticket_id: i64, at: DateTime<Utc>) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE conversations SET closed = 1, ended_at = ?1
             WHERE ticket_id = ?2 AND closed = 0",
            params![ts(&at), ticket_id],
        )?;
        Ok(affected)
    }
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let closed: i32 = row.get(2)?;
    let started_str: String = row.get(3)?;
    let ended_str: Option<String> = row.get(4)?;

    Ok(Conversation {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        closed: closed != 0,
        started_at: parse_ts(3, &started_str)?,
        ended_at: parse_opt_ts(4, ended_str)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::models::NewTicket;
    use crate::Database;

    fn setup() -> (Database, tempfile::TempDir, i64) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("t.db")).unwrap();
        let user = db.create_user("c@example.com", None).unwrap();
        let ticket = db
            .insert_ticket(&NewTicket {
                requester_id: user.id,
                category_id: 1,
                priority_id: None,
                subject: "s".into(),
                description: "d".into(),
                created_at: Utc::now(),
            })
            .unwrap();
        (db, dir, ticket.id)
    }

    #[test]
    fn second_open_conversation_is_rejected_by_the_store() {
        let (db, _dir, ticket_id) = setup();

        db.insert_conversation(ticket_id, Utc::now()).unwrap();
        let err = db.insert_conversation(ticket_id, Utc::now()).unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn close_then_reopen_keeps_the_row() {
        let (db, _dir, ticket_id) = setup();

        let conv = db.insert_conversation(ticket_id, Utc::now()).unwrap();
        assert!(conv.accepts_messages());

        assert!(db.close_conversation(conv.id, Utc::now()).unwrap());
        assert!(!db.close_conversation(conv.id, Utc::now()).unwrap());
        let closed = db.get_conversation(conv.id).unwrap();
        assert!(closed.closed);
        assert!(!closed.accepts_messages());

        assert!(db.reopen_conversation(conv.id).unwrap());
        let reopened = db.latest_conversation_for_ticket(ticket_id).unwrap().unwrap();
        assert_eq!(reopened.id, conv.id);
        assert!(!reopened.closed);
        assert_eq!(reopened.ended_at, None);
        assert_eq!(db.list_conversations_for_ticket(ticket_id).unwrap().len(), 1);
    }

    #[test]
    fn closing_by_ticket_closes_open_rows_only() {
        let (db, _dir, ticket_id) = setup();

        let first = db.insert_conversation(ticket_id, Utc::now()).unwrap();
        db.close_conversation(first.id, Utc::now()).unwrap();
        db.insert_conversation(ticket_id, Utc::now()).unwrap();

        assert_eq!(db.close_conversations_for_ticket(ticket_id, Utc::now()).unwrap(), 1);
        assert!(db
            .list_conversations_for_ticket(ticket_id)
            .unwrap()
            .iter()
            .all(|c| c.closed && c.ended_at.is_some()));
    }
}
