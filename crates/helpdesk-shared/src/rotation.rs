//! Round-robin rotation over a category's staff list.
//!
//! The rotation is a circular queue whose index lives outside the process:
//! the caller supplies the staff ids in a stable order (ascending id) and the
//! persisted cursor, i.e. the id of the last staff member that received a
//! ticket. The walk starts just after the cursor and visits every member
//! exactly once.

/// Index at which the next walk starts.
///
/// Returns 0 when the cursor is absent or no longer present in `order`
/// (for example because that staff member was deactivated).
pub fn start_offset(order: &[i64], cursor: Option<i64>) -> usize {
    if order.is_empty() {
        return 0;
    }
    cursor
        .and_then(|last| order.iter().position(|&id| id == last))
        .map(|pos| (pos + 1) % order.len())
        .unwrap_or(0)
}

/// Candidate staff ids for one full rotation, in visiting order.
pub fn candidates(order: &[i64], cursor: Option<i64>) -> impl Iterator<Item = i64> + '_ {
    let start = start_offset(order, cursor);
    let len = order.len();
    (0..len).map(move |step| order[(start + step) % len])
}
