//! Group Completion Aggregation
//!
//! Counts outcomes for tasks submitted under a shared group id and reports
//! exactly one outcome when the whole group has resolved.

use crate::domain::task::model::GroupId;
use std::collections::HashMap;

/// Final tally for a fully resolved group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupOutcome {
    /// Tasks that reached `Success`
    pub success_count: usize,
    /// Tasks that reached `Failure`
    pub failure_count: usize,
}

#[derive(Debug, Default)]
struct GroupCounter {
    remaining: usize,
    success: usize,
    failure: usize,
}

/// Per-group membership and outcome counters
///
/// Callers serialize access (the scheduler invokes this under its state
/// lock), which is what makes the zero crossing in [`resolve_one`]
/// observable exactly once even when two members finish back to back.
///
/// [`resolve_one`]: GroupAggregator::resolve_one
#[derive(Debug, Default)]
pub struct GroupAggregator {
    groups: HashMap<GroupId, GroupCounter>,
}

impl GroupAggregator {
    /// Create an empty aggregator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more member for a group; called at submission time
    pub fn register(&mut self, group_id: &GroupId) {
        self.groups.entry(group_id.clone()).or_default().remaining += 1;
    }

    /// Number of unresolved members, `None` for unknown/retired groups
    #[must_use]
    pub fn remaining(&self, group_id: &GroupId) -> Option<usize> {
        self.groups.get(group_id).map(|c| c.remaining)
    }

    /// Resolve one member with the given outcome
    ///
    /// Returns the final tally when this resolution empties the group; the
    /// group id is retired at that point, so a stray late resolve against
    /// it returns `None` instead of recounting.
    pub fn resolve_one(&mut self, group_id: &GroupId, success: bool) -> Option<GroupOutcome> {
        let counter = self.groups.get_mut(group_id)?;
        if success {
            counter.success += 1;
        } else {
            counter.failure += 1;
        }
        counter.remaining -= 1;
        if counter.remaining > 0 {
            return None;
        }

        let counter = self.groups.remove(group_id)?;
        Some(GroupOutcome {
            success_count: counter.success,
            failure_count: counter.failure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str) -> GroupId {
        name.to_string()
    }

    #[test]
    fn test_register_counts_members() {
        let mut agg = GroupAggregator::new();
        let g = group("g1");

        agg.register(&g);
        agg.register(&g);
        agg.register(&g);

        assert_eq!(agg.remaining(&g), Some(3));
    }

    #[test]
    fn test_outcome_only_on_last_member() {
        let mut agg = GroupAggregator::new();
        let g = group("g1");
        agg.register(&g);
        agg.register(&g);
        agg.register(&g);

        assert_eq!(agg.resolve_one(&g, true), None);
        assert_eq!(agg.resolve_one(&g, false), None);
        assert_eq!(
            agg.resolve_one(&g, true),
            Some(GroupOutcome {
                success_count: 2,
                failure_count: 1,
            })
        );
    }

    #[test]
    fn test_group_retired_after_outcome() {
        let mut agg = GroupAggregator::new();
        let g = group("g1");
        agg.register(&g);

        assert!(agg.resolve_one(&g, true).is_some());
        assert_eq!(agg.remaining(&g), None);
        // A stray late resolve must not recount a retired group.
        assert_eq!(agg.resolve_one(&g, true), None);
    }

    #[test]
    fn test_unknown_group_resolve_is_none() {
        let mut agg = GroupAggregator::new();
        assert_eq!(agg.resolve_one(&group("nope"), true), None);
    }

    #[test]
    fn test_independent_groups() {
        let mut agg = GroupAggregator::new();
        let g1 = group("g1");
        let g2 = group("g2");
        agg.register(&g1);
        agg.register(&g2);
        agg.register(&g2);

        assert_eq!(
            agg.resolve_one(&g1, false),
            Some(GroupOutcome {
                success_count: 0,
                failure_count: 1,
            })
        );
        assert_eq!(agg.remaining(&g2), Some(2));
    }

    #[test]
    fn test_tally_covers_all_members() {
        let mut agg = GroupAggregator::new();
        let g = group("g1");
        let n = 10;
        for _ in 0..n {
            agg.register(&g);
        }

        let mut outcome = None;
        for i in 0..n {
            let result = agg.resolve_one(&g, i % 3 == 0);
            if i < n - 1 {
                assert_eq!(result, None);
            } else {
                outcome = result;
            }
        }
        let outcome = outcome.expect("last resolve yields the outcome");
        assert_eq!(outcome.success_count + outcome.failure_count, n);
    }
}
