//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation.
//!
//! Multi-statement invariants (workload caps, the one-open-conversation rule,
//! the round-robin cursor) run inside [`Database::immediate`], which takes
//! SQLite's write lock up front. Every connection to the same file, in this
//! process or another, is serialized behind that lock for the duration of the
//! unit of work.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::{Result, StoreError};
use crate::migrations;

/// How long a writer waits for another connection's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/helpdesk/helpdesk.db`
    /// - macOS:   `~/Library/Application Support/org.helpdesk.helpdesk/helpdesk.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\helpdesk\helpdesk\data\helpdesk.db`
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("org", "helpdesk", "helpdesk").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("helpdesk.db");

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path.
    ///
    /// This is useful for tests and for deployments that mount the database
    /// on a dedicated volume.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    ///
    /// Callers should prefer the typed CRUD helpers, but direct access is
    /// occasionally needed for ad-hoc queries.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back when it
    /// returns `Err`, so a precondition failure never leaves a partial write.
    /// All typed helpers called on the `&Database` passed to `f` take part in
    /// the transaction. Units of work must not nest.
    pub fn immediate<T, E>(&self, f: impl FnOnce(&Database) -> std::result::Result<T, E>) -> std::result::Result<T, E>
    where
        E: From<StoreError>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;

        // Dropping `tx` without commit rolls back.
        let value = f(self)?;

        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = Database::open_at(&path).expect("should open");
        assert!(db.path().is_some());
    }

    #[test]
    fn reopen_keeps_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        drop(Database::open_at(&path).unwrap());
        let db = Database::open_at(&path).unwrap();
        let version: u32 = db
            .conn()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, migrations::CURRENT_VERSION);
    }

    #[test]
    fn immediate_rolls_back_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let result: std::result::Result<(), StoreError> = db.immediate(|db| {
            db.conn().execute(
                "INSERT INTO categories (name, description) VALUES ('Scratch', NULL)",
                [],
            )?;
            Err(StoreError::NotFound)
        });
        assert!(matches!(result, Err(StoreError::NotFound)));

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM categories WHERE name = 'Scratch'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn immediate_commits_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        db.immediate(|db| -> Result<()> {
            db.conn().execute(
                "INSERT INTO categories (name, description) VALUES ('Scratch', NULL)",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM categories WHERE name = 'Scratch'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
