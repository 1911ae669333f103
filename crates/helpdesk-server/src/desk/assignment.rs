//! Round-robin auto-assignment with a per-staff workload cap.

use chrono::Utc;
use tracing::{debug, info};

use helpdesk_shared::rotation;
use helpdesk_shared::{AuditAction, TicketStatus};
use helpdesk_store::{Database, Staff, TicketPatch};

use super::Desk;
use crate::error::DeskError;

impl Desk {
    /// Try to hand a pooled ticket to the next eligible staff member of
    /// `category_id`. Returns `false` when it stays in the pool.
    ///
    /// Selection, the ticket update and the cursor move commit together.
    pub fn attempt_assign(
        &self,
        ticket_id: i64,
        category_id: i64,
        requester_email: &str,
        actor_id: Option<i64>,
    ) -> Result<bool, DeskError> {
        let cap = self.policy.auto_assign_cap;
        let placed = self
            .db
            .immediate(|db| place(db, ticket_id, category_id, cap))?;

        let Some(staff) = placed else {
            debug!(ticket_id, category_id, "No eligible staff, ticket pooled");
            return Ok(false);
        };

        info!(ticket_id, staff_id = staff.id, "Ticket auto-assigned");
        self.notify(
            requester_email,
            &format!("Ticket #{ticket_id} assigned"),
            &format!(
                "Your ticket #{ticket_id} has been assigned to {}. They will be in touch shortly.",
                staff.email
            ),
        );
        self.audit(
            AuditAction::Update,
            actor_id,
            &format!("ticket {ticket_id} auto-assigned to staff {}", staff.id),
        );
        Ok(true)
    }
}

/// One pass over the category's rotation. Must run inside a write unit.
fn place(db: &Database, ticket_id: i64, category_id: i64, cap: u32) -> Result<Option<Staff>, DeskError> {
    let ticket = db.get_ticket(ticket_id).map_err(DeskError::missing("ticket"))?;
    if ticket.status != TicketStatus::Pending || ticket.staff_id.is_some() {
        return Ok(None);
    }

    let staff = db.list_active_staff_in_field(category_id)?;
    if staff.is_empty() {
        return Ok(None);
    }

    let order: Vec<i64> = staff.iter().map(|s| s.id).collect();
    let cursor = db
        .get_assignment_cursor(category_id)?
        .map(|c| c.last_staff_id);

    for candidate in rotation::candidates(&order, cursor) {
        let Some(member) = staff.iter().find(|s| s.id == candidate) else {
            continue;
        };
        // A staff member never works their own ticket.
        if member.user_id == ticket.requester_id {
            continue;
        }
        if db.count_in_flight(candidate)? >= cap {
            continue;
        }

        db.update_ticket(
            ticket_id,
            &TicketPatch {
                status: Some(TicketStatus::InProgress),
                staff_id: Some(Some(candidate)),
                ..TicketPatch::default()
            },
        )?;
        db.upsert_assignment_cursor(category_id, candidate, Utc::now())?;
        return Ok(Some(member.clone()));
    }

    Ok(None)
}
