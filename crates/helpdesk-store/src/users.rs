use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::codec::{parse_ts, ts};
use crate::database::Database;
use crate::error::{not_found, Result};
use crate::models::User;

impl Database {
    /// Insert a user and return the stored row.
    pub fn create_user(&self, email: &str, display_name: Option<&str>) -> Result<User> {
        let now = Utc::now();
        self.conn().execute(
            "INSERT INTO users (email, display_name, created_at) VALUES (?1, ?2, ?3)",
            params![email, display_name, ts(&now)],
        )?;
        self.get_user(self.conn().last_insert_rowid())
    }

    pub fn get_user(&self, id: i64) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, email, display_name, created_at FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .map_err(not_found)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id, email, display_name, created_at FROM users WHERE email = ?1",
                params![email],
                row_to_user,
            )
            .optional()?)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let created_str: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        created_at: parse_ts(3, &created_str)?,
    })
}
