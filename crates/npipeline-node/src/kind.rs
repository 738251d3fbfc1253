//! Node kind tag (spec §2, §9 "tagged variants of node kind plus a small
//! interface per kind" — replacing the source repository's reference-type
//! class hierarchy).

use std::fmt;

/// The four node kinds spec.md §2 distinguishes. Polymorphism is needed
/// only over these four; the graph and runner dispatch on this tag rather
/// than a deep class hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// No input; produces an output pipe (spec §4.2).
    Source,
    /// One input item in, zero or one output item out (spec §4.2).
    Transform,
    /// Many inputs folded per key over windows into output items (spec
    /// §4.2).
    Aggregate,
    /// No output; drains its input pipe to completion (spec §4.2).
    Sink,
}

impl NodeKind {
    /// True for node kinds that must have at least one inbound edge (every
    /// kind except `Source`, spec §4.3 builder validation rule 2).
    #[must_use]
    pub fn requires_inbound_edge(self) -> bool {
        !matches!(self, NodeKind::Source)
    }

    /// True for node kinds that must have at least one outbound edge
    /// (every kind except `Sink`).
    #[must_use]
    pub fn requires_outbound_edge(self) -> bool {
        !matches!(self, NodeKind::Sink)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Source => "source",
            NodeKind::Transform => "transform",
            NodeKind::Aggregate => "aggregate",
            NodeKind::Sink => "sink",
        };
        f.write_str(s)
    }
}
