//! Status transitions: claim, resolve, cancel and admin reassignment.
//!
//! ```text
//! Pending ──claim/auto-assign──▶ In-Progress ──resolve──▶ Resolved
//!    │                               │
//!    └──────────cancel───────────────┴──────cancel──────▶ Cancelled
//! ```

use chrono::Utc;
use tracing::info;

use helpdesk_shared::{Actor, AuditAction, TicketStatus};
use helpdesk_store::{Database, Ticket, TicketPatch};

use super::{is_assignee, load_ticket, require_admin, require_staff, Desk};
use crate::error::{Conflict, DeskError};

impl Desk {
    /// Take a pooled ticket. Fails with `LimitReached` once the claimant
    /// holds `claim_cap` in-flight tickets, and with `OwnTicket` when the
    /// claimant filed it.
    pub fn claim(&self, actor: &Actor, ticket_id: i64) -> Result<Ticket, DeskError> {
        let staff_id = require_staff(actor)?;
        let cap = self.policy.claim_cap;

        let ticket = self.db.immediate(|db| {
            let ticket = load_ticket(db, ticket_id)?;
            if ticket.status != TicketStatus::Pending {
                return Err(Conflict::InvalidStatus(ticket.status).into());
            }
            if ticket.requester_id == actor.user_id {
                return Err(Conflict::OwnTicket.into());
            }

            let staff = db.get_staff(staff_id).map_err(DeskError::missing("staff"))?;
            if !staff.is_active {
                return Err(DeskError::forbidden("staff member is deactivated"));
            }
            if !actor.is_admin() && staff.field_id != ticket.category_id {
                return Err(DeskError::forbidden("ticket is outside your field"));
            }
            if db.count_in_flight(staff_id)? >= cap {
                return Err(Conflict::LimitReached.into());
            }

            db.update_ticket(
                ticket_id,
                &TicketPatch {
                    status: Some(TicketStatus::InProgress),
                    staff_id: Some(Some(staff_id)),
                    ..TicketPatch::default()
                },
            )?;
            load_ticket(db, ticket_id)
        })?;

        info!(ticket_id, staff_id, "Ticket claimed");
        self.audit(
            AuditAction::Update,
            Some(actor.user_id),
            &format!("ticket {ticket_id} claimed by staff {staff_id}"),
        );
        Ok(ticket)
    }

    /// Close a ticket as solved, end its conversations and tell the
    /// requester.
    pub fn resolve(&self, actor: &Actor, ticket_id: i64) -> Result<Ticket, DeskError> {
        let staff_id = require_staff(actor)?;

        let ticket = self.db.immediate(|db| {
            let ticket = load_ticket(db, ticket_id)?;
            if ticket.status.is_terminal() {
                return Err(Conflict::InvalidStatus(ticket.status).into());
            }
            if !may_close(db, actor, &ticket)? {
                return Err(DeskError::forbidden("not allowed to close this ticket"));
            }
            finish(db, &ticket, TicketStatus::Resolved, Some(staff_id))
        })?;

        info!(ticket_id, staff_id, "Ticket resolved");
        let email = self.requester_email(&ticket);
        self.notify(
            &email,
            &format!("Ticket #{ticket_id} resolved"),
            &format!(
                "Your ticket #{ticket_id} \"{}\" has been resolved. Reply by opening a new ticket if the problem returns.",
                ticket.subject
            ),
        );
        self.audit(
            AuditAction::Update,
            Some(actor.user_id),
            &format!("ticket {ticket_id} resolved by staff {staff_id}"),
        );
        Ok(ticket)
    }

    /// Withdraw a ticket. Staff follow the same rules as for resolving;
    /// the requester may cancel their own ticket while it is still Pending.
    pub fn cancel(&self, actor: &Actor, ticket_id: i64) -> Result<Ticket, DeskError> {
        let ticket = self.db.immediate(|db| {
            let ticket = load_ticket(db, ticket_id)?;
            if ticket.status.is_terminal() {
                return Err(Conflict::InvalidStatus(ticket.status).into());
            }

            if may_close(db, actor, &ticket)? {
                return finish(db, &ticket, TicketStatus::Cancelled, actor.working_staff_id());
            }
            if ticket.requester_id != actor.user_id {
                return Err(DeskError::forbidden("not your ticket"));
            }
            if ticket.status != TicketStatus::Pending {
                return Err(Conflict::InvalidStatus(ticket.status).into());
            }
            finish(db, &ticket, TicketStatus::Cancelled, None)
        })?;

        info!(ticket_id, "Ticket cancelled");
        self.audit(
            AuditAction::Update,
            Some(actor.user_id),
            &format!("ticket {ticket_id} cancelled"),
        );
        Ok(ticket)
    }

    /// Admin: move a ticket to `staff_id`, bypassing rotation and caps.
    pub fn reassign(&self, actor: &Actor, ticket_id: i64, staff_id: i64) -> Result<Ticket, DeskError> {
        require_admin(actor)?;

        let (old, ticket) = self.db.immediate(|db| {
            let ticket = load_ticket(db, ticket_id)?;
            if ticket.status.is_terminal() {
                return Err(Conflict::InvalidStatus(ticket.status).into());
            }
            let target = db.get_staff(staff_id).map_err(DeskError::missing("staff"))?;
            if !target.is_active {
                return Err(DeskError::validation(format!("staff {staff_id} is deactivated")));
            }
            if target.field_id != ticket.category_id {
                return Err(DeskError::validation(format!(
                    "staff {staff_id} does not work category {}",
                    ticket.category_id
                )));
            }
            if target.user_id == ticket.requester_id {
                return Err(Conflict::OwnTicket.into());
            }
            if ticket.staff_id == Some(staff_id) {
                return Err(Conflict::NoChange.into());
            }

            db.update_ticket(
                ticket_id,
                &TicketPatch {
                    status: Some(TicketStatus::InProgress),
                    staff_id: Some(Some(staff_id)),
                    ..TicketPatch::default()
                },
            )?;
            Ok((ticket.staff_id, load_ticket(db, ticket_id)?))
        })?;

        info!(ticket_id, ?old, new = staff_id, "Ticket reassigned");
        self.audit(
            AuditAction::Update,
            Some(actor.user_id),
            &format!(
                "ticket {ticket_id} reassigned from {} to staff {staff_id}",
                old.map_or_else(|| "pool".to_string(), |s| format!("staff {s}"))
            ),
        );
        Ok(ticket)
    }
}

/// Admins, the assignee, and active staff of the ticket's field while it
/// is unassigned.
fn may_close(db: &Database, actor: &Actor, ticket: &Ticket) -> Result<bool, DeskError> {
    let Some(staff_id) = actor.working_staff_id() else {
        return Ok(false);
    };
    if is_assignee(actor, ticket) {
        return Ok(true);
    }
    if ticket.staff_id.is_some() {
        return Ok(actor.is_admin());
    }
    let staff = db.get_staff(staff_id).map_err(DeskError::missing("staff"))?;
    Ok(staff.is_active && (actor.is_admin() || staff.field_id == ticket.category_id))
}

/// Write a terminal status and end every conversation of the ticket.
fn finish(
    db: &Database,
    ticket: &Ticket,
    status: TicketStatus,
    staff_id: Option<i64>,
) -> Result<Ticket, DeskError> {
    let now = Utc::now();
    let mut patch = TicketPatch {
        status: Some(status),
        resolved_at: Some(Some(now)),
        ..TicketPatch::default()
    };
    if staff_id.is_some() {
        patch.staff_id = Some(staff_id);
    }
    db.update_ticket(ticket.id, &patch)?;
    db.close_conversations_for_ticket(ticket.id, now)?;
    load_ticket(db, ticket.id)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use helpdesk_shared::TicketStatus;

    use crate::desk::testkit::{fixture, FailingNotifier};
    use crate::desk::Desk;
    use crate::error::{Conflict, DeskError};

    #[test]
    fn claim_moves_ticket_in_progress() {
        let fx = fixture();
        let customer = fx.customer("c@example.com");
        let staff = fx.staff("s@example.com", 2);
        let ticket = fx.pending_ticket(&customer, 2);

        let claimed = fx.desk.claim(&staff, ticket.id).unwrap();
        assert_eq!(claimed.status, TicketStatus::InProgress);
        assert_eq!(claimed.staff_id, staff.staff_id);

        assert!(matches!(
            fx.desk.claim(&staff, ticket.id),
            Err(DeskError::Conflict(Conflict::InvalidStatus(TicketStatus::InProgress)))
        ));
    }

    #[test]
    fn sixth_claim_hits_the_limit_and_changes_nothing() {
        let fx = fixture();
        let customer = fx.customer("c@example.com");
        let staff = fx.staff("s@example.com", 2);
        for _ in 0..5 {
            fx.ticket_for(&customer, &staff, 2);
        }

        let ticket = fx.pending_ticket(&customer, 2);
        assert!(matches!(
            fx.desk.claim(&staff, ticket.id),
            Err(DeskError::Conflict(Conflict::LimitReached))
        ));
        let stored = fx.db().get_ticket(ticket.id).unwrap();
        assert_eq!(stored, ticket);
    }

    #[test]
    fn resolved_tickets_free_a_claim_slot() {
        let fx = fixture();
        let customer = fx.customer("c@example.com");
        let staff = fx.staff("s@example.com", 2);
        let first = fx.ticket_for(&customer, &staff, 2);
        for _ in 0..4 {
            fx.ticket_for(&customer, &staff, 2);
        }
        fx.desk.resolve(&staff, first.id).unwrap();

        let ticket = fx.pending_ticket(&customer, 2);
        assert!(fx.desk.claim(&staff, ticket.id).is_ok());
    }

    #[test]
    fn own_ticket_cannot_be_claimed() {
        let fx = fixture();
        let staff = fx.staff("s@example.com", 2);
        let ticket = fx.pending_ticket(&staff, 2);

        assert!(matches!(
            fx.desk.claim(&staff, ticket.id),
            Err(DeskError::Conflict(Conflict::OwnTicket))
        ));
    }

    #[test]
    fn claim_requires_matching_active_staff() {
        let fx = fixture();
        let customer = fx.customer("c@example.com");
        let wrong_field = fx.staff("w@example.com", 3);
        let inactive = fx.staff("i@example.com", 2);
        fx.db().set_staff_active(inactive.staff_id.unwrap(), false).unwrap();
        let ticket = fx.pending_ticket(&customer, 2);

        assert!(matches!(fx.desk.claim(&wrong_field, ticket.id), Err(DeskError::Forbidden(_))));
        assert!(matches!(fx.desk.claim(&inactive, ticket.id), Err(DeskError::Forbidden(_))));
        assert!(matches!(fx.desk.claim(&customer, ticket.id), Err(DeskError::Forbidden(_))));
        assert!(matches!(fx.desk.claim(&wrong_field, 404), Err(DeskError::NotFound("ticket"))));
    }

    #[test]
    fn concurrent_claims_respect_the_cap() {
        let fx = fixture();
        let customer = fx.customer("c@example.com");
        let staff = fx.staff("s@example.com", 2);
        for _ in 0..4 {
            fx.ticket_for(&customer, &staff, 2);
        }
        let a = fx.pending_ticket(&customer, 2);
        let b = fx.pending_ticket(&customer, 2);

        let handles: Vec<_> = [(fx.second_desk(), a.id), (fx.second_desk(), b.id)]
            .into_iter()
            .map(|(desk, id)| {
                let staff = staff.clone();
                thread::spawn(move || desk.claim(&staff, id))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(DeskError::Conflict(Conflict::LimitReached)))));
        assert_eq!(fx.db().count_in_flight(staff.staff_id.unwrap()).unwrap(), 5);
    }

    #[test]
    fn resolve_closes_conversations_and_notifies() {
        let fx = fixture();
        let customer = fx.customer("c@example.com");
        let staff = fx.staff("s@example.com", 2);
        let ticket = fx.ticket_for(&customer, &staff, 2);
        fx.desk.open_conversation(&staff, ticket.id).unwrap();

        let resolved = fx.desk.resolve(&staff, ticket.id).unwrap();
        assert_eq!(resolved.status, TicketStatus::Resolved);
        assert!(resolved.resolved_at.is_some());
        assert_eq!(resolved.staff_id, staff.staff_id);
        assert!(fx
            .db()
            .list_conversations_for_ticket(ticket.id)
            .unwrap()
            .iter()
            .all(|c| c.closed && c.ended_at.is_some()));
        assert_eq!(fx.notes.sent_to("c@example.com"), 1);
    }

    #[test]
    fn resolving_twice_is_rejected() {
        let fx = fixture();
        let customer = fx.customer("c@example.com");
        let staff = fx.staff("s@example.com", 2);
        let ticket = fx.ticket_for(&customer, &staff, 2);

        let first = fx.desk.resolve(&staff, ticket.id).unwrap();
        assert!(matches!(
            fx.desk.resolve(&staff, ticket.id),
            Err(DeskError::Conflict(Conflict::InvalidStatus(TicketStatus::Resolved)))
        ));
        assert!(matches!(
            fx.desk.cancel(&staff, ticket.id),
            Err(DeskError::Conflict(Conflict::InvalidStatus(TicketStatus::Resolved)))
        ));
        assert_eq!(fx.db().get_ticket(ticket.id).unwrap(), first);
        assert_eq!(fx.notes.total(), 1);
    }

    #[test]
    fn only_assignee_or_admin_resolves_assigned_ticket() {
        let fx = fixture();
        let customer = fx.customer("c@example.com");
        let staff = fx.staff("s@example.com", 2);
        let other = fx.staff("o@example.com", 2);
        let admin = fx.admin("admin@example.com");
        let ticket = fx.ticket_for(&customer, &staff, 2);

        assert!(matches!(fx.desk.resolve(&other, ticket.id), Err(DeskError::Forbidden(_))));
        let resolved = fx.desk.resolve(&admin, ticket.id).unwrap();
        assert_eq!(resolved.staff_id, admin.staff_id);
    }

    #[test]
    fn pooled_ticket_closes_only_for_active_staff_of_its_field() {
        let fx = fixture();
        let customer = fx.customer("c@example.com");
        let elsewhere = fx.staff("e@example.com", 3);
        let inactive = fx.staff("i@example.com", 2);
        fx.db().set_staff_active(inactive.staff_id.unwrap(), false).unwrap();
        let local = fx.staff("l@example.com", 2);
        let ticket = fx.pending_ticket(&customer, 2);

        for outsider in [&elsewhere, &inactive] {
            assert!(matches!(fx.desk.resolve(outsider, ticket.id), Err(DeskError::Forbidden(_))));
            assert!(matches!(fx.desk.cancel(outsider, ticket.id), Err(DeskError::Forbidden(_))));
        }
        let stored = fx.db().get_ticket(ticket.id).unwrap();
        assert_eq!(stored.status, TicketStatus::Pending);
        assert_eq!(stored.staff_id, None);

        let resolved = fx.desk.resolve(&local, ticket.id).unwrap();
        assert_eq!(resolved.status, TicketStatus::Resolved);
        assert_eq!(resolved.staff_id, local.staff_id);
    }

    #[test]
    fn cancel_closes_conversations_without_notifying() {
        let fx = fixture();
        let customer = fx.customer("c@example.com");
        let staff = fx.staff("s@example.com", 2);
        let ticket = fx.ticket_for(&customer, &staff, 2);
        fx.desk.open_conversation(&staff, ticket.id).unwrap();

        let cancelled = fx.desk.cancel(&staff, ticket.id).unwrap();
        assert_eq!(cancelled.status, TicketStatus::Cancelled);
        assert!(fx
            .db()
            .list_conversations_for_ticket(ticket.id)
            .unwrap()
            .iter()
            .all(|c| c.closed));
        assert_eq!(fx.notes.total(), 0);
    }

    #[test]
    fn requester_cancels_only_while_pending() {
        let fx = fixture();
        let customer = fx.customer("c@example.com");
        let stranger = fx.customer("x@example.com");
        let staff = fx.staff("s@example.com", 2);

        let pending = fx.pending_ticket(&customer, 2);
        assert!(matches!(fx.desk.cancel(&stranger, pending.id), Err(DeskError::Forbidden(_))));
        let cancelled = fx.desk.cancel(&customer, pending.id).unwrap();
        assert_eq!(cancelled.status, TicketStatus::Cancelled);
        assert_eq!(cancelled.staff_id, None);

        let working = fx.ticket_for(&customer, &staff, 2);
        assert!(matches!(
            fx.desk.cancel(&customer, working.id),
            Err(DeskError::Conflict(Conflict::InvalidStatus(TicketStatus::InProgress)))
        ));
    }

    #[test]
    fn notification_failure_does_not_roll_back() {
        let fx = fixture();
        let customer = fx.customer("c@example.com");
        let staff = fx.staff("s@example.com", 2);
        let ticket = fx.ticket_for(&customer, &staff, 2);

        let db = helpdesk_store::Database::open_at(&fx.dir.path().join("desk.db")).unwrap();
        let desk = Desk::new(db, Default::default(), Arc::new(FailingNotifier));

        let resolved = desk.resolve(&staff, ticket.id).unwrap();
        assert_eq!(resolved.status, TicketStatus::Resolved);
        assert_eq!(
            fx.db().get_ticket(ticket.id).unwrap().status,
            TicketStatus::Resolved
        );
    }

    #[test]
    fn admin_reassign_bypasses_cap_but_checks_field() {
        let fx = fixture();
        let customer = fx.customer("c@example.com");
        let admin = fx.admin("admin@example.com");
        let s1 = fx.staff("s1@example.com", 2);
        let s2 = fx.staff("s2@example.com", 2);
        let elsewhere = fx.staff("e@example.com", 3);
        for _ in 0..5 {
            fx.ticket_for(&customer, &s2, 2);
        }
        let ticket = fx.ticket_for(&customer, &s1, 2);

        let moved = fx.desk.reassign(&admin, ticket.id, s2.staff_id.unwrap()).unwrap();
        assert_eq!(moved.staff_id, s2.staff_id);
        assert_eq!(moved.status, TicketStatus::InProgress);

        assert!(matches!(
            fx.desk.reassign(&admin, ticket.id, s2.staff_id.unwrap()),
            Err(DeskError::Conflict(Conflict::NoChange))
        ));
        assert!(matches!(
            fx.desk.reassign(&admin, ticket.id, elsewhere.staff_id.unwrap()),
            Err(DeskError::Validation(_))
        ));
        assert!(matches!(
            fx.desk.reassign(&s1, ticket.id, s1.staff_id.unwrap()),
            Err(DeskError::Forbidden(_))
        ));

        let audit = fx.db().list_audit(1).unwrap();
        assert!(audit[0].detail.contains("reassigned"));
    }

    #[test]
    fn reassign_of_pooled_ticket_starts_work() {
        let fx = fixture();
        let customer = fx.customer("c@example.com");
        let admin = fx.admin("admin@example.com");
        let staff = fx.staff("s@example.com", 2);
        let ticket = fx.pending_ticket(&customer, 2);

        let moved = fx.desk.reassign(&admin, ticket.id, staff.staff_id.unwrap()).unwrap();
        assert_eq!(moved.status, TicketStatus::InProgress);
        assert_eq!(moved.staff_id, staff.staff_id);

        fx.desk.cancel(&admin, ticket.id).unwrap();
        assert!(matches!(
            fx.desk.reassign(&admin, ticket.id, staff.staff_id.unwrap()),
            Err(DeskError::Conflict(Conflict::InvalidStatus(TicketStatus::Cancelled)))
        ));
    }
}
