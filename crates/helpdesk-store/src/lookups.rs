//! Read access to the small enumerated tables, plus category management.

use rusqlite::params;

use crate::database::Database;
use crate::error::{not_found, Result, StoreError};
use crate::models::Lookup;

impl Database {
    pub fn list_categories(&self) -> Result<Vec<Lookup>> {
        self.list_lookup("SELECT id, name, description FROM categories ORDER BY id ASC")
    }

    pub fn list_priorities(&self) -> Result<Vec<Lookup>> {
        self.list_lookup("SELECT id, name, description FROM priorities ORDER BY id ASC")
    }

    pub fn list_statuses(&self) -> Result<Vec<Lookup>> {
        self.list_lookup("SELECT id, name, description FROM statuses ORDER BY id ASC")
    }

    pub fn get_category(&self, id: i64) -> Result<Lookup> {
        self.conn()
            .query_row(
                "SELECT id, name, description FROM categories WHERE id = ?1",
                params![id],
                row_to_lookup,
            )
            .map_err(not_found)
    }

    pub fn get_priority(&self, id: i64) -> Result<Lookup> {
        self.conn()
            .query_row(
                "SELECT id, name, description FROM priorities WHERE id = ?1",
                params![id],
                row_to_lookup,
            )
            .map_err(not_found)
    }

    /// Priority ids ordered from most to least severe.
    pub fn priority_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self.conn().prepare("SELECT id FROM priorities ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn create_category(&self, name: &str, description: Option<&str>) -> Result<Lookup> {
        self.conn().execute(
            "INSERT INTO categories (name, description) VALUES (?1, ?2)",
            params![name, description],
        )?;
        self.get_category(self.conn().last_insert_rowid())
    }

    fn list_lookup(&self, sql: &str) -> Result<Vec<Lookup>> {
        let mut stmt = self.conn().prepare(sql)?;
        let rows = stmt.query_map([], row_to_lookup)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn row_to_lookup(row: &rusqlite::Row<'_>) -> rusqlite::Result<Lookup> {
    Ok(Lookup {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;

    #[test]
    fn seeded_lookups_are_present() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("t.db")).unwrap();

        let statuses: Vec<String> = db.list_statuses().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(statuses, vec!["Pending", "In-Progress", "Resolved", "Cancelled"]);

        assert_eq!(db.priority_ids().unwrap(), vec![1, 2, 3]);
        assert_eq!(db.get_priority(1).unwrap().name, "High");
        assert_eq!(db.list_categories().unwrap().len(), 4);
    }

    #[test]
    fn create_category_appends() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("t.db")).unwrap();

        let cat = db.create_category("Shipping", Some("Parcels")).unwrap();
        assert_eq!(db.get_category(cat.id).unwrap().name, "Shipping");
        assert!(db.create_category("Shipping", None).unwrap_err().is_constraint_violation());
    }
}
