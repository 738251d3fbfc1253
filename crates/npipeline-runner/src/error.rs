//! The runner's error type (spec §7 "Runtime-fatal"/"Flow control"
//! taxonomy): wraps the lower crates' errors transparently where
//! propagation needs no translation, and adds the variants specific to
//! driving a finalised graph to completion.

use npipeline_graph::NodeId;

/// Errors a [`crate::Runner::run`] call can fail with.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The graph failed to finalise. Only reachable if a caller hands the
    /// runner a [`npipeline_graph::GraphBuilder`] directly instead of an
    /// already-built [`npipeline_graph::Graph`].
    #[error(transparent)]
    Graph(#[from] npipeline_graph::Error),

    /// A source's `Initialize` call failed. Always fatal regardless of the
    /// node's declared error policy (spec §7: "source initialisation
    /// failure under the node's policy" is runtime-fatal; there is no item
    /// yet for `Skip`/`DeadLetter` to act on).
    #[error("source '{node}' failed to initialize: {source}")]
    SourceInitialization {
        /// The failing source's id.
        node: NodeId,
        /// Underlying cause.
        #[source]
        source: npipeline_node::NodeError,
    },

    /// A node's output pipe surfaced a fatal failure (an `Upstream` error
    /// under `Fail` policy, a `RetryExhausted` escalation, or a structural
    /// pipe error such as `TooManySubscribers`/`MaterializationOverflow`).
    #[error("node '{node}' failed: {source}")]
    Node {
        /// The failing node's id.
        node: NodeId,
        /// Underlying cause.
        #[source]
        source: npipeline_pipe::Error,
    },

    /// A sink's `Execute` call returned an error directly (as opposed to
    /// its input pipe surfacing one).
    #[error("sink '{node}' failed: {source}")]
    Sink {
        /// The failing sink's id.
        node: NodeId,
        /// Underlying cause.
        #[source]
        source: npipeline_node::NodeError,
    },

    /// A node task panicked.
    #[error("node '{0}' task panicked")]
    TaskPanicked(NodeId),

    /// A node task was aborted by the runtime before completing.
    #[error("node '{0}' task was aborted")]
    TaskAborted(NodeId),

    /// A node declared fewer multicast subscribers than it has outbound
    /// edges (spec §4.4 step 2/3: the fan-out factor `f` must cover every
    /// downstream edge, since pipes are single-consumer by default — spec
    /// §4.1). Caught at plan time rather than surfacing as a confusing
    /// `TooManySubscribers` only the second consumer hits.
    #[error("node '{node}' has {outbound_edges} outbound edge(s) but declares fan_out = {fan_out}")]
    FanOutMismatch {
        /// The misconfigured node's id.
        node: NodeId,
        /// Declared multicast subscriber count.
        fan_out: usize,
        /// Actual outbound edge count.
        outbound_edges: usize,
    },

    /// The run was cancelled before every sink completed (spec §5:
    /// cooperative cancellation, never a deadlock).
    #[error("run cancelled")]
    Cancelled,
}
