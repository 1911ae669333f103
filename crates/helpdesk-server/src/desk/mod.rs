//! The helpdesk core: assignment, ticket lifecycle, conversations,
//! escalation and the admin directory.
//!
//! Every operation takes the caller's [`Actor`], checks its preconditions,
//! and performs the state change inside one [`Database::immediate`] unit.
//! Audit entries and notifications are emitted only after that unit commits;
//! their failures are logged and never undo the change.

mod assignment;
mod conversations;
mod directory;
pub mod escalation;
mod lifecycle;
mod tickets;

use std::sync::Arc;

use tracing::warn;

use helpdesk_shared::{Actor, AuditAction, DeskPolicy, Role};
use helpdesk_store::{Database, Ticket};

use crate::error::DeskError;
use crate::notify::Notifier;

pub use conversations::{ConversationView, MessageView, Opened};
pub use directory::NewStaff;
pub use tickets::{Intake, NewTicketRequest};

pub struct Desk {
    db: Database,
    policy: DeskPolicy,
    notifier: Arc<dyn Notifier>,
}

impl Desk {
    pub fn new(db: Database, policy: DeskPolicy, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db,
            policy,
            notifier,
        }
    }

    fn audit(&self, action: AuditAction, actor_id: Option<i64>, detail: &str) {
        if let Err(e) = self.db.append_audit(action, actor_id, detail) {
            warn!(error = %e, detail, "Failed to append audit entry");
        }
    }

    fn notify(&self, to: &str, subject: &str, body: &str) {
        if let Err(e) = self.notifier.notify(to, subject, body) {
            warn!(error = %e, to, subject, "Failed to send notification");
        }
    }

    /// Email of a ticket's requester, or an empty string if the lookup fails.
    fn requester_email(&self, ticket: &Ticket) -> String {
        match self.db.get_user(ticket.requester_id) {
            Ok(user) => user.email,
            Err(e) => {
                warn!(error = %e, ticket_id = ticket.id, "Failed to load requester");
                String::new()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Role guards
// ---------------------------------------------------------------------------

fn require_member(actor: &Actor) -> Result<(), DeskError> {
    if actor.role == Role::Guest {
        return Err(DeskError::forbidden("sign in to use the helpdesk"));
    }
    Ok(())
}

fn require_staff(actor: &Actor) -> Result<i64, DeskError> {
    actor
        .working_staff_id()
        .ok_or_else(|| DeskError::forbidden("staff only"))
}

fn require_admin(actor: &Actor) -> Result<(), DeskError> {
    if !actor.is_admin() {
        return Err(DeskError::forbidden("admin only"));
    }
    Ok(())
}

/// Whether `actor` is the staff member currently assigned to `ticket`.
fn is_assignee(actor: &Actor, ticket: &Ticket) -> bool {
    matches!((actor.working_staff_id(), ticket.staff_id), (Some(a), Some(b)) if a == b)
}

fn load_ticket(db: &Database, id: i64) -> Result<Ticket, DeskError> {
    db.get_ticket(id).map_err(DeskError::missing("ticket"))
}

/// Fail with `Validation` when `category_id` names no category. Other store
/// failures keep their own mapping.
fn require_category(db: &Database, category_id: i64) -> Result<(), DeskError> {
    db.get_category(category_id)
        .map(|_| ())
        .map_err(unknown_category(category_id))
}

fn unknown_category(category_id: i64) -> impl FnOnce(helpdesk_store::StoreError) -> DeskError {
    move |e| match DeskError::missing("category")(e) {
        DeskError::NotFound(_) => DeskError::validation(format!("unknown category {category_id}")),
        other => other,
    }
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), DeskError> {
    if value.trim().is_empty() {
        return Err(DeskError::validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max {
        return Err(DeskError::validation(format!(
            "{field} exceeds {max} characters"
        )));
    }
    Ok(())
}
