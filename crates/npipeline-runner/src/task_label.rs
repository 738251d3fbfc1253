//! Diagnostic label attached to every node task's tracing span
//! (`SPEC_FULL.md` §6 "Task/label bookkeeping"). Pure ambient diagnostics,
//! not a scheduling input.

use npipeline_graph::NodeId;
use npipeline_node::NodeKind;
use std::fmt;
use std::sync::Arc;

/// Identifies one spawned node task: which pipeline, which node, which
/// kind. Carried as `tracing::Span` fields rather than as control data.
#[derive(Debug, Clone)]
pub struct TaskLabel {
    /// The owning pipeline's diagnostic name.
    pub pipeline: Arc<str>,
    /// The node this task drives.
    pub node: NodeId,
    /// The node's kind.
    pub kind: NodeKind,
}

impl TaskLabel {
    /// Builds a label for `node`/`kind` under `pipeline`.
    #[must_use]
    pub fn new(pipeline: Arc<str>, node: NodeId, kind: NodeKind) -> Self {
        Self { pipeline, node, kind }
    }
}

impl fmt::Display for TaskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}[{}]", self.pipeline, self.node, self.kind)
    }
}
