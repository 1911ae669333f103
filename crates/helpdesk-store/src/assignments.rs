//! Persisted round-robin cursor, one row per category.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::codec::{parse_ts, ts};
use crate::database::Database;
use crate::error::Result;
use crate::models::AssignmentCursor;

impl Database {
    pub fn get_assignment_cursor(&self, category_id: i64) -> Result<Option<AssignmentCursor>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT category_id, last_staff_id, updated_at
                 FROM assignments WHERE category_id = ?1",
                params![category_id],
                |row| {
                    let updated_str: String = row.get(2)?;
                    Ok(AssignmentCursor {
                        category_id: row.get(0)?,
                        last_staff_id: row.get(1)?,
                        updated_at: parse_ts(2, &updated_str)?,
                    })
                },
            )
            .optional()?)
    }

    /// Create the cursor on first use, move it afterwards.
    pub fn upsert_assignment_cursor(
        &self,
        category_id: i64,
        staff_id: i64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO assignments (category_id, last_staff_id, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(category_id) DO UPDATE
                SET last_staff_id = excluded.last_staff_id,
                    updated_at    = excluded.updated_at",
            params![category_id, staff_id, ts(&at)],
        )?;
        Ok(())
    }
}
