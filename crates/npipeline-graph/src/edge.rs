//! Directed, typed edges between nodes (spec §3 "Edge").

use crate::node_id::NodeId;

/// Well-known edge role tags (spec §3: "a role tag when the downstream has
/// multiple kinds of inputs"). Callers may use any string; these constants
/// name the two roles spec.md calls out explicitly.
pub mod roles {
    /// Routes items an error-policy `DeadLetter` node rejected.
    pub const DEAD_LETTER: &str = "dead_letter";
    /// Routes aggregate items that arrived behind the watermark.
    pub const LATE_DATA: &str = "late_data";
}

/// A directed edge from `from`'s output to `to`'s input (spec §3 "Edge").
#[derive(Debug, Clone)]
pub struct Edge {
    /// Upstream node id.
    pub from: NodeId,
    /// Downstream node id.
    pub to: NodeId,
    /// Optional per-edge buffer capacity (spec §3: "Carries an optional
    /// per-edge buffer capacity"). `None` defers to the node's declared
    /// multicast/channel default.
    pub buffer_capacity: Option<usize>,
    /// Optional role tag distinguishing this edge among a downstream's (or
    /// upstream's) several edges, e.g. [`roles::DEAD_LETTER`].
    pub role: Option<String>,
}

impl Edge {
    /// Declares a plain, unlabelled edge with the default buffer capacity.
    #[must_use]
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self {
            from,
            to,
            buffer_capacity: None,
            role: None,
        }
    }

    /// Sets this edge's buffer capacity.
    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = Some(capacity);
        self
    }

    /// Tags this edge with a role (spec §3).
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}
