//! Ticket intake, scoped reads, notes and priority.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use helpdesk_shared::constants::{MAX_DESCRIPTION_LEN, MAX_NOTE_LEN, MAX_SUBJECT_LEN};
use helpdesk_shared::{Actor, AuditAction, Role, TicketStatus};
use helpdesk_store::{NewTicket, Ticket, TicketPatch};

use super::{
    check_len, is_assignee, load_ticket, require_admin, require_category, require_member, require_staff, Desk,
};
use crate::error::{Conflict, DeskError};

#[derive(Debug, Clone, Deserialize)]
pub struct NewTicketRequest {
    pub category_id: i64,
    pub subject: String,
    pub description: String,
}

/// A ticket together with whether auto-assignment placed it.
#[derive(Debug, Clone, Serialize)]
pub struct Intake {
    pub ticket: Ticket,
    pub assigned: bool,
}

impl Desk {
    /// Accept a new ticket and try to place it with a staff member.
    pub fn submit_ticket(&self, actor: &Actor, req: NewTicketRequest) -> Result<Intake, DeskError> {
        require_member(actor)?;
        check_len("subject", &req.subject, MAX_SUBJECT_LEN)?;
        check_len("description", &req.description, MAX_DESCRIPTION_LEN)?;

        require_category(&self.db, req.category_id)?;

        let ticket = self.db.insert_ticket(&NewTicket {
            requester_id: actor.user_id,
            category_id: req.category_id,
            priority_id: None,
            subject: req.subject.trim().to_string(),
            description: req.description.trim().to_string(),
            created_at: Utc::now(),
        })?;
        info!(ticket_id = ticket.id, category_id = ticket.category_id, "Ticket submitted");
        self.audit(
            AuditAction::Create,
            Some(actor.user_id),
            &format!("ticket {} created in category {}", ticket.id, ticket.category_id),
        );

        let assigned = match self.attempt_assign(
            ticket.id,
            ticket.category_id,
            &actor.email,
            Some(actor.user_id),
        ) {
            Ok(assigned) => assigned,
            Err(e) => {
                warn!(error = %e, ticket_id = ticket.id, "Auto-assignment failed, ticket pooled");
                false
            }
        };

        let ticket = load_ticket(&self.db, ticket.id)?;
        Ok(Intake { ticket, assigned })
    }

    /// Admin: run auto-assignment again for a pooled ticket.
    pub fn requeue(&self, actor: &Actor, ticket_id: i64) -> Result<Intake, DeskError> {
        require_admin(actor)?;
        let ticket = load_ticket(&self.db, ticket_id)?;
        if ticket.status != TicketStatus::Pending {
            return Err(Conflict::InvalidStatus(ticket.status).into());
        }

        let email = self.requester_email(&ticket);
        let assigned =
            self.attempt_assign(ticket.id, ticket.category_id, &email, Some(actor.user_id))?;
        let ticket = load_ticket(&self.db, ticket_id)?;
        Ok(Intake { ticket, assigned })
    }

    /// Tickets visible to the caller: own for customers, assigned for
    /// staff, everything for admins.
    pub fn list_tickets(
        &self,
        actor: &Actor,
        status: Option<TicketStatus>,
    ) -> Result<Vec<Ticket>, DeskError> {
        let tickets = match actor.role {
            Role::Guest => return Err(DeskError::forbidden("sign in to use the helpdesk")),
            Role::Admin => return Ok(self.db.list_tickets(status)?),
            Role::User => self.db.list_tickets_for_requester(actor.user_id)?,
            Role::Staff => self.db.list_tickets_for_staff(require_staff(actor)?)?,
        };
        Ok(tickets
            .into_iter()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .collect())
    }

    pub fn get_ticket(&self, actor: &Actor, ticket_id: i64) -> Result<Ticket, DeskError> {
        require_member(actor)?;
        let ticket = load_ticket(&self.db, ticket_id)?;
        if actor.is_admin()
            || ticket.requester_id == actor.user_id
            || is_assignee(actor, &ticket)
            || self.works_field(actor, ticket.category_id)?
        {
            return Ok(ticket);
        }
        Err(DeskError::forbidden("not your ticket"))
    }

    /// Pending, unassigned tickets. Staff see their own field; admins see
    /// every field or the one they ask for.
    pub fn pool(&self, actor: &Actor, category_id: Option<i64>) -> Result<Vec<Ticket>, DeskError> {
        let staff_id = require_staff(actor)?;
        if actor.is_admin() {
            return Ok(self.db.list_pool(category_id)?);
        }
        let staff = self.db.get_staff(staff_id).map_err(DeskError::missing("staff"))?;
        Ok(self.db.list_pool(Some(staff.field_id))?)
    }

    /// Overwrite the staff note. `None` clears it.
    pub fn update_note(
        &self,
        actor: &Actor,
        ticket_id: i64,
        note: Option<String>,
    ) -> Result<Ticket, DeskError> {
        require_staff(actor)?;
        let note = match note {
            Some(text) if text.trim().is_empty() => None,
            Some(text) => {
                check_len("note", &text, MAX_NOTE_LEN)?;
                Some(text)
            }
            None => None,
        };

        let ticket = self.db.immediate(|db| {
            let ticket = load_ticket(db, ticket_id)?;
            if !(actor.is_admin() || is_assignee(actor, &ticket)) {
                return Err(DeskError::forbidden("only the assigned staff member may edit the note"));
            }
            db.update_ticket(
                ticket_id,
                &TicketPatch {
                    note: Some(note),
                    ..TicketPatch::default()
                },
            )?;
            load_ticket(db, ticket_id)
        })?;

        self.audit(
            AuditAction::Update,
            Some(actor.user_id),
            &format!("ticket {ticket_id} note updated"),
        );
        Ok(ticket)
    }

    /// Set the priority of a non-terminal ticket. Setting the current value
    /// again is a conflict.
    pub fn update_priority(
        &self,
        actor: &Actor,
        ticket_id: i64,
        priority_id: i64,
    ) -> Result<Ticket, DeskError> {
        require_staff(actor)?;
        if let Err(e) = self.db.get_priority(priority_id) {
            return Err(match DeskError::missing("priority")(e) {
                DeskError::NotFound(_) => {
                    DeskError::validation(format!("unknown priority {priority_id}"))
                }
                other => other,
            });
        }

        let (old, ticket) = self.db.immediate(|db| {
            let ticket = load_ticket(db, ticket_id)?;
            if !(actor.is_admin()
                || is_assignee(actor, &ticket)
                || self.works_field(actor, ticket.category_id)?)
            {
                return Err(DeskError::forbidden("ticket is outside your field"));
            }
            if ticket.status.is_terminal() {
                return Err(Conflict::InvalidStatus(ticket.status).into());
            }
            if !db.set_priority_if_changed(ticket_id, priority_id)? {
                return Err(Conflict::NoChange.into());
            }
            Ok((ticket.priority_id, load_ticket(db, ticket_id)?))
        })?;

        self.audit(
            AuditAction::Update,
            Some(actor.user_id),
            &format!(
                "ticket {ticket_id} priority {} -> {priority_id}",
                old.map_or_else(|| "none".to_string(), |p| p.to_string())
            ),
        );
        Ok(ticket)
    }

    /// Whether the caller is active staff in `category_id`.
    fn works_field(&self, actor: &Actor, category_id: i64) -> Result<bool, DeskError> {
        let Some(staff_id) = actor.working_staff_id() else {
            return Ok(false);
        };
        match self.db.get_staff(staff_id) {
            Ok(staff) => Ok(staff.is_active && staff.field_id == category_id),
            Err(helpdesk_store::StoreError::NotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
