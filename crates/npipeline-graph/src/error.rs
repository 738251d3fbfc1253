//! Builder-time `Configuration` errors (spec §7): cycle detection, type
//! mismatch, duplicate id, missing edges, invalid parallelism/buffer
//! values.

use crate::node_id::NodeId;
use npipeline_pipe::ElementType;

/// Errors raised while composing or finalising a [`crate::GraphBuilder`]
/// (spec §4.3 "On finalisation the builder: ...").
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// Two nodes were added with the same id (spec §3 invariant 3).
    #[error("duplicate node id '{0}'")]
    DuplicateNodeId(NodeId),

    /// `connect` referenced a node id that was never added.
    #[error("unknown node id '{0}'")]
    UnknownNode(NodeId),

    /// An edge's upstream output type and downstream input type disagree
    /// (spec §3 invariant 2).
    #[error("edge {from} -> {to}: output type {upstream} is not assignment-compatible with input type {downstream}")]
    TypeMismatch {
        /// Upstream node id.
        from: NodeId,
        /// Downstream node id.
        to: NodeId,
        /// Upstream's declared output type.
        upstream: ElementType,
        /// Downstream's declared input type.
        downstream: ElementType,
    },

    /// The graph contains a cycle (spec §3 invariant 1). Names one node on
    /// the cycle.
    #[error("cycle detected in graph, reachable from node '{0}'")]
    CycleDetected(NodeId),

    /// A non-source node has no inbound edge (spec §4.3 rule 2).
    #[error("node '{0}' is not a source but has no inbound edge")]
    MissingInboundEdge(NodeId),

    /// A non-sink node has no outbound edge (spec §4.3 rule 2).
    #[error("node '{0}' is not a sink but has no outbound edge")]
    MissingOutboundEdge(NodeId),

    /// The graph has no source nodes, or no sink nodes, or the sources and
    /// sinks are not weakly connected through the node set (spec §3
    /// invariant 1: "weakly connected from the union of sources to the
    /// union of sinks").
    #[error("{0}")]
    NotWeaklyConnected(String),

    /// A builder option failed validation (buffer capacity, parallelism,
    /// fan-out factor).
    #[error("invalid option for node '{node}': {reason}")]
    InvalidOption {
        /// The node the option was set on.
        node: NodeId,
        /// Human-readable reason.
        reason: String,
    },
}
