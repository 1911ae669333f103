//! Periodic priority escalation for stale tickets.
//!
//! Each sweep moves every in-flight ticket older than the policy threshold
//! one step up the priority ladder. Tickets are handled one at a time, each
//! in its own write unit, and the sweep stops when its time budget runs out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use helpdesk_shared::constants::ESCALATION_BATCH;
use helpdesk_shared::escalation::PriorityLadder;
use helpdesk_shared::AuditAction;

use super::{load_ticket, Desk};
use crate::error::DeskError;

/// Outcome of one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub escalated: usize,
    pub failed: usize,
    /// The budget ran out before every candidate was examined.
    pub truncated: bool,
}

impl Desk {
    /// The priority ladder and the tickets due for escalation at `now`.
    pub fn escalation_candidates(&self, now: DateTime<Utc>) -> Result<(PriorityLadder, Vec<i64>), DeskError> {
        let ladder = PriorityLadder::new(self.db.priority_ids()?);
        let Some(top) = ladder.top() else {
            return Ok((ladder, Vec::new()));
        };
        let cutoff = self.escalation_cutoff(now)?;
        let ids = self
            .db
            .list_escalation_candidates(cutoff, top, ESCALATION_BATCH)?;
        Ok((ladder, ids))
    }

    fn escalation_cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, DeskError> {
        now.checked_sub_signed(self.policy.escalate_after)
            .ok_or_else(|| DeskError::Internal("escalation threshold out of range".into()))
    }

    /// Raise one ticket's priority a single step if it is still due.
    /// Returns the new priority, or `None` when nothing changed.
    pub fn escalate_ticket(
        &self,
        ticket_id: i64,
        ladder: &PriorityLadder,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, DeskError> {
        let cutoff = self.escalation_cutoff(now)?;

        let change = self.db.immediate(|db| -> Result<Option<(Option<i64>, i64)>, DeskError> {
            let ticket = load_ticket(db, ticket_id)?;
            if ticket.status.is_terminal() || ticket.created_at > cutoff {
                return Ok(None);
            }
            let Some(next) = ladder.escalate(ticket.priority_id) else {
                return Ok(None);
            };
            if !db.set_priority_if_changed(ticket_id, next)? {
                return Ok(None);
            }
            Ok(Some((ticket.priority_id, next)))
        })?;

        let Some((old, next)) = change else {
            return Ok(None);
        };
        debug!(ticket_id, ?old, new = next, "Ticket escalated");
        self.audit(
            AuditAction::Update,
            None,
            &format!(
                "ticket {ticket_id} escalated from priority {} to {next}",
                old.map_or_else(|| "none".to_string(), |p| p.to_string())
            ),
        );
        Ok(Some(next))
    }
}

/// Run one sweep. The desk lock is taken per ticket so request handlers
/// interleave with the sweep.
pub async fn run_sweep(desk: &Mutex<Desk>, budget: Duration) -> SweepReport {
    let started = Instant::now();
    let now = Utc::now();
    let mut report = SweepReport::default();

    let candidates = desk.lock().await.escalation_candidates(now);
    let (ladder, ids) = match candidates {
        Ok(found) => found,
        Err(e) => {
            warn!(error = %e, "Escalation sweep could not load candidates");
            report.failed += 1;
            return report;
        }
    };

    for ticket_id in ids {
        if started.elapsed() >= budget {
            report.truncated = true;
            break;
        }
        report.examined += 1;
        match desk.lock().await.escalate_ticket(ticket_id, &ladder, now) {
            Ok(Some(_)) => report.escalated += 1,
            Ok(None) => {}
            Err(e) => {
                warn!(ticket_id, error = %e, "Failed to escalate ticket");
                report.failed += 1;
            }
        }
        tokio::task::yield_now().await;
    }

    report
}

/// Spawn the periodic sweep. The first sweep runs immediately.
pub fn spawn_escalation(desk: Arc<Mutex<Desk>>, every: Duration, budget: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let report = run_sweep(&desk, budget).await;
            info!(
                examined = report.examined,
                escalated = report.escalated,
                failed = report.failed,
                truncated = report.truncated,
                "Escalation sweep finished"
            );
        }
    })
}
