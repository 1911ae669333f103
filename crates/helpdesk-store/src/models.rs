//! Domain model structs persisted in the helpdesk database.
//!
//! Every struct derives `Serialize` so it can be handed directly to the HTTP
//! layer as a response body.

use chrono::{DateTime, Utc};
use serde::Serialize;

use helpdesk_shared::{AuditAction, StaffRole, TicketStatus};

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// A row of `categories`, `priorities` or `statuses`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Lookup {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// A customer or staff identity.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A staff member working tickets in one field.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Staff {
    pub id: i64,
    /// The user identity behind this staff record.
    pub user_id: i64,
    pub email: String,
    /// Category the staff member specialises in.
    pub field_id: i64,
    pub role: StaffRole,
    /// Deactivated staff are never assigned.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

/// One support request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Ticket {
    pub id: i64,
    pub requester_id: i64,
    pub staff_id: Option<i64>,
    pub category_id: i64,
    /// `None` until triaged.
    pub priority_id: Option<i64>,
    pub status: TicketStatus,
    pub subject: String,
    pub description: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Values for a freshly submitted ticket.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub requester_id: i64,
    pub category_id: i64,
    pub priority_id: Option<i64>,
    pub subject: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Explicit partial update of a ticket row.
///
/// Only fields set to `Some` are written. Nullable columns use a nested
/// `Option`, so `Some(None)` clears the column while `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketPatch {
    pub status: Option<TicketStatus>,
    pub staff_id: Option<Option<i64>>,
    pub priority_id: Option<Option<i64>>,
    pub note: Option<Option<String>>,
    pub resolved_at: Option<Option<DateTime<Utc>>>,
}

impl TicketPatch {
    pub fn is_empty(&self) -> bool {
        self == &TicketPatch::default()
    }
}

/// Round-robin cursor for one category.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AssignmentCursor {
    pub category_id: i64,
    pub last_staff_id: i64,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

/// A staff/requester thread attached to a ticket.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: i64,
    pub ticket_id: i64,
    pub closed: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Messages may only be posted while no end timestamp is set.
    pub fn accepts_messages(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// A single chat line.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    /// Whether the sender has a staff record, resolved at read time.
    pub sender_is_staff: bool,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuditEntry {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub action: AuditAction,
    /// `None` for background jobs.
    pub actor_id: Option<i64>,
    pub detail: String,
}
