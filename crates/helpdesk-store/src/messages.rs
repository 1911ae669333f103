use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::codec::{parse_ts, ts};
use crate::database::Database;
use crate::error::{not_found, Result, StoreError};
use crate::models::Message;

/// `sender_is_staff` is derived from the staff table at read time.
const MESSAGE_SELECT: &str = "SELECT m.id, m.conversation_id, m.sender_id,
        EXISTS(SELECT 1 FROM staff s WHERE s.user_id = m.sender_id),
        m.content, m.sent_at
     FROM messages m";

impl Database {
    pub fn insert_message(
        &self,
        conversation_id: i64,
        sender_id: i64,
        content: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<Message> {
        self.conn().execute(
            "INSERT INTO messages (conversation_id, sender_id, content, sent_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![conversation_id, sender_id, content, ts(&sent_at)],
        )?;
        self.get_message(self.conn().last_insert_rowid())
    }

    pub fn get_message(&self, id: i64) -> Result<Message> {
        self.conn()
            .query_row(
                &format!("{MESSAGE_SELECT} WHERE m.id = ?1"),
                params![id],
                row_to_message,
            )
            .map_err(not_found)
    }

    /// Messages of one conversation, oldest first.
    pub fn list_messages(&self, conversation_id: i64) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "{MESSAGE_SELECT} WHERE m.conversation_id = ?1 ORDER BY m.sent_at ASC, m.id ASC"
        ))?;
        let rows = stmt.query_map(params![conversation_id], row_to_message)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let is_staff: i32 = row.get(3)?;
    let sent_str: String = row.get(5)?;

    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_id: row.get(2)?,
        sender_is_staff: is_staff != 0,
        content: row.get(4)?,
        sent_at: parse_ts(5, &sent_str)?,
    })
}
