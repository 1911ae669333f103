//! Staff directory keyed by field.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use helpdesk_shared::{StaffRole, TicketStatus};

use crate::codec::{conversion, parse_ts, ts};
use crate::database::Database;
use crate::error::{not_found, Result, StoreError};
use crate::models::Staff;

const STAFF_COLUMNS: &str = "id, user_id, email, field_id, role, is_active, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    pub fn create_staff(&self, user_id: i64, email: &str, field_id: i64, role: StaffRole) -> Result<Staff> {
        self.conn().execute(
            "INSERT INTO staff (user_id, email, field_id, role, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5)",
            params![user_id, email, field_id, role.as_str(), ts(&Utc::now())],
        )?;
        self.get_staff(self.conn().last_insert_rowid())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_staff(&self, id: i64) -> Result<Staff> {
        self.conn()
            .query_row(
                &format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = ?1"),
                params![id],
                row_to_staff,
            )
            .map_err(not_found)
    }

    pub fn find_staff_by_user(&self, user_id: i64) -> Result<Option<Staff>> {
        Ok(self
            .conn()
            .query_row(
                &format!("SELECT {STAFF_COLUMNS} FROM staff WHERE user_id = ?1"),
                params![user_id],
                row_to_staff,
            )
            .optional()?)
    }

    pub fn list_staff(&self) -> Result<Vec<Staff>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {STAFF_COLUMNS} FROM staff ORDER BY id ASC"))?;
        let rows = stmt.query_map([], row_to_staff)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Active staff of one field in rotation order (ascending id).
    pub fn list_active_staff_in_field(&self, field_id: i64) -> Result<Vec<Staff>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff
             WHERE field_id = ?1 AND is_active = 1
             ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![field_id], row_to_staff)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Number of tickets assigned to `staff_id` that are neither resolved nor
    /// cancelled.
    pub fn count_in_flight(&self, staff_id: i64) -> Result<u32> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM tickets
             WHERE staff_id = ?1 AND status_id NOT IN (?2, ?3)",
            params![
                staff_id,
                TicketStatus::Resolved.id(),
                TicketStatus::Cancelled.id()
            ],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Activate or deactivate a staff member. Returns `true` if a row changed.
    pub fn set_staff_active(&self, id: i64, active: bool) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE staff SET is_active = ?1 WHERE id = ?2 AND is_active <> ?1",
            params![active as i32, id],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_staff(row: &rusqlite::Row<'_>) -> rusqlite::Result<Staff> {
    let role_str: String = row.get(4)?;
    let is_active: i32 = row.get(5)?;
    let created_str: String = row.get(6)?;

    let role = role_str.parse::<StaffRole>().map_err(|e| conversion(4, e))?;

    Ok(Staff {
        id: row.get(0)?,
        user_id: row.get(1)?,
        email: row.get(2)?,
        field_id: row.get(3)?,
        role,
        is_active: is_active != 0,
        created_at: parse_ts(6, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use helpdesk_shared::StaffRole;

    use crate::Database;

    #[test]
    fn field_listing_is_ordered_and_skips_inactive() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("t.db")).unwrap();

        let mut ids = Vec::new();
        for n in 0..3 {
            let email = format!("s{n}@example.com");
            let user = db.create_user(&email, None).unwrap();
            ids.push(db.create_staff(user.id, &email, 2, StaffRole::Staff).unwrap().id);
        }
        let other = db.create_user("o@example.com", None).unwrap();
        db.create_staff(other.id, "o@example.com", 3, StaffRole::Staff).unwrap();

        assert!(db.set_staff_active(ids[1], false).unwrap());
        assert!(!db.set_staff_active(ids[1], false).unwrap());

        let listed: Vec<i64> = db
            .list_active_staff_in_field(2)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(listed, vec![ids[0], ids[2]]);
    }

    #[test]
    fn lookup_by_user() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("t.db")).unwrap();

        let user = db.create_user("admin@example.com", None).unwrap();
        let staff = db
            .create_staff(user.id, "admin@example.com", 1, StaffRole::Admin)
            .unwrap();
        assert_eq!(db.find_staff_by_user(user.id).unwrap(), Some(staff.clone()));
        assert_eq!(staff.role, StaffRole::Admin);
        assert!(staff.is_active);
        assert_eq!(db.count_in_flight(staff.id).unwrap(), 0);
    }
}
