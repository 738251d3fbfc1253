//! Per-node execution strategy (spec §4.6): how many items a transform or
//! aggregate may have in flight at once.

use serde::{Deserialize, Serialize};

/// The parallelism threshold above which `preserve_ordering` is flagged as
/// likely harmful (spec §4.6, §9 Open Questions: "The threshold is
/// heuristic; the spec declines to prescribe a hard rule"). Crossing it
/// only produces a `tracing::warn!`, never a validation error.
pub const HIGH_PARALLELISM_REORDER_WARN_THRESHOLD: usize = 4;

/// Per-node concurrency attribute (spec §4.6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// One item at a time; preserves input order.
    Sequential,
    /// Up to `parallelism` items in flight via a worker pool. When
    /// `preserve_ordering` is set, out-of-order completions are buffered
    /// so items still emit in input order.
    BoundedParallel {
        /// Maximum number of items in flight.
        parallelism: usize,
        /// Whether completions are reordered back into input order before
        /// emission.
        preserve_ordering: bool,
    },
}

impl Default for ExecutionStrategy {
    fn default() -> Self {
        ExecutionStrategy::Sequential
    }
}

impl ExecutionStrategy {
    /// Maximum number of items this strategy allows in flight at once.
    #[must_use]
    pub fn max_in_flight(self) -> usize {
        match self {
            ExecutionStrategy::Sequential => 1,
            ExecutionStrategy::BoundedParallel { parallelism, .. } => parallelism.max(1),
        }
    }

    /// Whether the runner must buffer out-of-order completions to restore
    /// input order before emitting.
    #[must_use]
    pub fn preserves_ordering(self) -> bool {
        match self {
            ExecutionStrategy::Sequential => true,
            ExecutionStrategy::BoundedParallel {
                preserve_ordering, ..
            } => preserve_ordering,
        }
    }

    /// Logs the heuristic warning from spec §4.6/§9 when this strategy
    /// combines `preserve_ordering` with parallelism above
    /// [`HIGH_PARALLELISM_REORDER_WARN_THRESHOLD`].
    pub fn warn_if_reorder_buffer_likely_harmful(self, node_id: &str) {
        if let ExecutionStrategy::BoundedParallel {
            parallelism,
            preserve_ordering: true,
        } = self
        {
            if parallelism > HIGH_PARALLELISM_REORDER_WARN_THRESHOLD {
                tracing::warn!(
                    node_id,
                    parallelism,
                    threshold = HIGH_PARALLELISM_REORDER_WARN_THRESHOLD,
                    "preserve_ordering with high parallelism may make the reorder buffer dominate"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_allows_exactly_one_in_flight() {
        assert_eq!(ExecutionStrategy::Sequential.max_in_flight(), 1);
        assert!(ExecutionStrategy::Sequential.preserves_ordering());
    }

    #[test]
    fn bounded_parallel_reports_configured_parallelism() {
        let s = ExecutionStrategy::BoundedParallel {
            parallelism: 8,
            preserve_ordering: false,
        };
        assert_eq!(s.max_in_flight(), 8);
        assert!(!s.preserves_ordering());
    }
}
