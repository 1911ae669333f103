use chrono::Duration;

use crate::constants::{AUTO_ASSIGN_CAP, CLAIM_CAP, ESCALATION_AFTER_HOURS};

/// Workload caps and the escalation threshold.
///
/// These are business settings rather than domain invariants, so the server
/// builds this from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeskPolicy {
    /// Auto-assignment only picks staff with fewer in-flight tickets.
    pub auto_assign_cap: u32,
    /// Claims are refused at this many in-flight tickets.
    pub claim_cap: u32,
    /// Minimum ticket age before escalation applies.
    pub escalate_after: Duration,
}

impl Default for DeskPolicy {
    fn default() -> Self {
        Self {
            auto_assign_cap: AUTO_ASSIGN_CAP,
            claim_cap: CLAIM_CAP,
            escalate_after: Duration::hours(ESCALATION_AFTER_HOURS),
        }
    }
}
