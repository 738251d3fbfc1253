//! Per-node error policy (spec §7 "Propagation"): what the runner does
//! when a node's lifecycle call fails.

use serde::{Deserialize, Serialize};

/// Selects how the runner reacts to a node-level error (spec §7).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Propagate to the runner and cancel the run. The default: a node
    /// that declares no explicit policy fails the whole run rather than
    /// silently dropping data.
    #[default]
    Fail,
    /// Drop the offending item; count it in node metrics.
    Skip,
    /// Route to the node's declared dead-letter edge, if one is
    /// configured; otherwise behave as `Skip`.
    DeadLetter,
}
