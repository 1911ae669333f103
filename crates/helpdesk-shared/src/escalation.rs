//! Priority escalation rule.
//!
//! Priorities are ranked by numeric id: the lowest id is the most severe
//! (seed data: 1 = High, 2 = Medium, 3 = Low). Escalating moves a ticket one
//! step toward the most severe tier.

/// Priority ids ordered from most to least severe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityLadder {
    ids: Vec<i64>,
}

impl PriorityLadder {
    /// Build a ladder from any set of priority ids.
    pub fn new(mut ids: Vec<i64>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self { ids }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The most severe priority id.
    pub fn top(&self) -> Option<i64> {
        self.ids.first().copied()
    }

    /// The least severe priority id.
    pub fn bottom(&self) -> Option<i64> {
        self.ids.last().copied()
    }

    /// Priority after one escalation step, or `None` if nothing changes.
    ///
    /// An untriaged ticket (`None`) enters the ladder at the least severe
    /// tier. A ticket already at the top stays there. Unknown ids are left
    /// alone.
    pub fn escalate(&self, current: Option<i64>) -> Option<i64> {
        match current {
            None => self.bottom(),
            Some(id) => {
                let pos = self.ids.iter().position(|&p| p == id)?;
                if pos == 0 {
                    None
                } else {
                    Some(self.ids[pos - 1])
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> PriorityLadder {
        PriorityLadder::new(vec![3, 1, 2])
    }

    #[test]
    fn low_moves_to_medium_then_high() {
        let ladder = seed();
        assert_eq!(ladder.escalate(Some(3)), Some(2));
        assert_eq!(ladder.escalate(Some(2)), Some(1));
    }

    #[test]
    fn top_is_fixed_point() {
        let ladder = seed();
        assert_eq!(ladder.top(), Some(1));
        assert_eq!(ladder.escalate(Some(1)), None);
    }

    #[test]
    fn untriaged_enters_at_bottom() {
        assert_eq!(seed().escalate(None), Some(3));
    }

    #[test]
    fn unknown_priority_is_untouched() {
        assert_eq!(seed().escalate(Some(42)), None);
    }

    #[test]
    fn empty_ladder_never_escalates() {
        let ladder = PriorityLadder::new(Vec::new());
        assert!(ladder.is_empty());
        assert_eq!(ladder.escalate(None), None);
        assert_eq!(ladder.escalate(Some(1)), None);
    }

    #[test]
    fn repeated_escalation_is_monotonic() {
        let ladder = seed();
        let mut current = Some(3);
        let mut seen = vec![3];
        while let Some(next) = ladder.escalate(current) {
            assert!(next < current.unwrap());
            seen.push(next);
            current = Some(next);
        }
        assert_eq!(seen, vec![3, 2, 1]);
    }
}
