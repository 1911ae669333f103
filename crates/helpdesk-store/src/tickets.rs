//! CRUD operations for [`Ticket`] records.
//!
//! Tickets are never deleted; they end in a terminal status instead.

use chrono::{DateTime, Utc};
use rusqlite::params;
use rusqlite::types::Value;

use helpdesk_shared::TicketStatus;

use crate::codec::{conversion, opt_ts, parse_opt_ts, parse_ts, ts};
use crate::database::Database;
use crate::error::{not_found, Result, StoreError};
use crate::models::{NewTicket, Ticket, TicketPatch};

const TICKET_COLUMNS: &str = "id, requester_id, staff_id, category_id, priority_id, status_id, \
     subject, description, note, created_at, resolved_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a ticket in the Pending state with no staff.
    pub fn insert_ticket(&self, new: &NewTicket) -> Result<Ticket> {
        self.conn().execute(
            "INSERT INTO tickets
                (requester_id, staff_id, category_id, priority_id, status_id,
                 subject, description, note, created_at, resolved_at)
             VALUES (?1, NULL, ?2, ?3, ?4, ?5, ?6, NULL, ?7, NULL)",
            params![
                new.requester_id,
                new.category_id,
                new.priority_id,
                TicketStatus::Pending.id(),
                new.subject,
                new.description,
                ts(&new.created_at),
            ],
        )?;
        self.get_ticket(self.conn().last_insert_rowid())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_ticket(&self, id: i64) -> Result<Ticket> {
        self.conn()
            .query_row(
                &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1"),
                params![id],
                row_to_ticket,
            )
            .map_err(not_found)
    }

    /// Tickets submitted by one user, newest first.
    pub fn list_tickets_for_requester(&self, requester_id: i64) -> Result<Vec<Ticket>> {
        self.query_tickets(
            &format!(
                "SELECT {TICKET_COLUMNS} FROM tickets
                 WHERE requester_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ),
            vec![Value::Integer(requester_id)],
        )
    }

    /// Tickets assigned to one staff member, newest first.
    pub fn list_tickets_for_staff(&self, staff_id: i64) -> Result<Vec<Ticket>> {
        self.query_tickets(
            &format!(
                "SELECT {TICKET_COLUMNS} FROM tickets
                 WHERE staff_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ),
            vec![Value::Integer(staff_id)],
        )
    }

    /// All tickets, optionally restricted to one status, newest first.
    pub fn list_tickets(&self, status: Option<TicketStatus>) -> Result<Vec<Ticket>> {
        match status {
            Some(status) => self.query_tickets(
                &format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets
                     WHERE status_id = ?1
                     ORDER BY created_at DESC, id DESC"
                ),
                vec![Value::Integer(status.id())],
            ),
            None => self.query_tickets(
                &format!("SELECT {TICKET_COLUMNS} FROM tickets ORDER BY created_at DESC, id DESC"),
                Vec::new(),
            ),
        }
    }

    /// Unassigned Pending tickets, oldest first, optionally for one category.
    pub fn list_pool(&self, category_id: Option<i64>) -> Result<Vec<Ticket>> {
        let mut sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets
             WHERE status_id = ?1 AND staff_id IS NULL"
        );
        let mut values = vec![Value::Integer(TicketStatus::Pending.id())];
        if let Some(category_id) = category_id {
            sql.push_str(" AND category_id = ?2");
            values.push(Value::Integer(category_id));
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");
        self.query_tickets(&sql, values)
    }

    /// In-flight tickets created at or before `cutoff` whose priority is not
    /// `top_priority`, oldest first.
    pub fn list_escalation_candidates(
        &self,
        cutoff: DateTime<Utc>,
        top_priority: i64,
        limit: u32,
    ) -> Result<Vec<i64>> {
        let mut stmt = self.conn().prepare(
            "SELECT id FROM tickets
             WHERE status_id NOT IN (?1, ?2)
               AND created_at <= ?3
               AND (priority_id IS NULL OR priority_id <> ?4)
             ORDER BY created_at ASC, id ASC
             LIMIT ?5",
        )?;
        let rows = stmt.query_map(
            params![
                TicketStatus::Resolved.id(),
                TicketStatus::Cancelled.id(),
                ts(&cutoff),
                top_priority,
                limit,
            ],
            |row| row.get(0),
        )?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Write the fields present in `patch`. Returns `true` if the row exists.
    pub fn update_ticket(&self, id: i64, patch: &TicketPatch) -> Result<bool> {
        if patch.is_empty() {
            return Ok(false);
        }

        let mut sets: Vec<&'static str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(status) = patch.status {
            sets.push("status_id = ?");
            values.push(Value::Integer(status.id()));
        }
        if let Some(staff_id) = patch.staff_id {
            sets.push("staff_id = ?");
            values.push(staff_id.map(Value::Integer).unwrap_or(Value::Null));
        }
        if let Some(priority_id) = patch.priority_id {
            sets.push("priority_id = ?");
            values.push(priority_id.map(Value::Integer).unwrap_or(Value::Null));
        }
        if let Some(note) = &patch.note {
            sets.push("note = ?");
            values.push(note.clone().map(Value::Text).unwrap_or(Value::Null));
        }
        if let Some(resolved_at) = &patch.resolved_at {
            sets.push("resolved_at = ?");
            values.push(opt_ts(resolved_at).map(Value::Text).unwrap_or(Value::Null));
        }

        values.push(Value::Integer(id));
        let sql = format!("UPDATE tickets SET {} WHERE id = ?", sets.join(", "));
        let affected = self
            .conn()
            .execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(affected > 0)
    }

    /// Set the priority only if it differs from the stored value.
    ///
    /// Returns `false` when no row was updated, either because the ticket is
    /// missing or because the priority is already `priority_id`.
    pub fn set_priority_if_changed(&self, id: i64, priority_id: i64) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE tickets SET priority_id = ?1
             WHERE id = ?2 AND priority_id IS NOT ?1",
            params![priority_id, id],
        )?;
        Ok(affected > 0)
    }

    fn query_tickets(&self, sql: &str, values: Vec<Value>) -> Result<Vec<Ticket>> {
        let mut stmt = self.conn().prepare(sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values), row_to_ticket)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_ticket(row: &rusqlite::Row<'_>) -> rusqlite::Result<Ticket> {
    let status_id: i64 = row.get(5)?;
    let created_str: String = row.get(9)?;
    let resolved_str: Option<String> = row.get(10)?;

    let status = TicketStatus::from_id(status_id).map_err(|e| conversion(5, e))?;

    Ok(Ticket {
        id: row.get(0)?,
        requester_id: row.get(1)?,
        staff_id: row.get(2)?,
        category_id: row.get(3)?,
        priority_id: row.get(4)?,
        status,
        subject: row.get(6)?,
        description: row.get(7)?,
        note: row.get(8)?,
        created_at: parse_ts(9, &created_str)?,
        resolved_at: parse_opt_ts(10, resolved_str)?,
    })
}
