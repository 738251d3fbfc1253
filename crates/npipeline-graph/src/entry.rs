//! A single node's registry entry: its kind-specific erased payload plus
//! the builder-time attributes spec §4.3 lists ("id, error policy,
//! retry-delay policy, execution strategy, merge strategy, per-edge
//! buffer size").

use crate::erased::{ErasedAggregate, ErasedSink, ErasedSource, ErasedTransform};
use crate::node_id::NodeId;
use npipeline_node::{ErrorPolicy, ExecutionStrategy, RetryPolicy};
use npipeline_pipe::{ElementType, MergeStrategy};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Per-node options a builder `Add*` call can override via the
/// `with_*` handle methods (spec §6 builder surface).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NodeOptions {
    /// Declared number of multicast subscribers for this node's output
    /// (spec §4.4 step 2/3 "fan-out factor f"). `1` means no multicast
    /// wrapper is needed.
    #[validate(range(min = 1, message = "fan_out must be >= 1"))]
    pub fan_out: usize,
    /// Per-subscriber multicast queue capacity, applied to every branch
    /// when `fan_out > 1`. `None` means effectively unbounded.
    pub fan_out_capacity: Option<usize>,
    /// What the runner does when this node's lifecycle call fails.
    pub error_policy: ErrorPolicy,
    /// How the runner composes this node's inbound edges, if it has more
    /// than one.
    pub merge_strategy: MergeStrategy,
    /// Per-node concurrency.
    pub execution_strategy: ExecutionStrategy,
    /// Resilient-execution wrapper configuration, if this node should be
    /// retried on a transient failure.
    pub retry_policy: Option<RetryPolicy>,
    /// The id of a declared dead-letter edge target, used when
    /// `error_policy` is [`ErrorPolicy::DeadLetter`].
    pub dead_letter_target: Option<NodeId>,
    /// The id of a declared late-data edge target, used by aggregate
    /// nodes whose [`npipeline_node::LateDataPolicy`] is `Route`.
    pub late_data_target: Option<NodeId>,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            fan_out: 1,
            fan_out_capacity: None,
            error_policy: ErrorPolicy::default(),
            merge_strategy: MergeStrategy::default(),
            execution_strategy: ExecutionStrategy::default(),
            retry_policy: None,
            dead_letter_target: None,
            late_data_target: None,
        }
    }
}

impl NodeOptions {
    /// Sets this node's multicast fan-out factor and, when `>1`, the
    /// per-subscriber queue capacity (spec §4.4 step 2/3).
    #[must_use]
    pub fn with_fan_out(mut self, fan_out: usize, capacity: Option<usize>) -> Self {
        self.fan_out = fan_out;
        self.fan_out_capacity = capacity;
        self
    }

    /// Sets this node's execution strategy (spec §6 `with_parallelism`).
    #[must_use]
    pub fn with_execution_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.execution_strategy = strategy;
        self
    }

    /// Sets this node's retry-delay policy (spec §6 `with_retry_delay`).
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Sets this node's error policy (spec §6 `with_error_policy`).
    #[must_use]
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Sets this node's fan-in merge strategy (spec §6
    /// `with_merge_strategy`).
    #[must_use]
    pub fn with_merge_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.merge_strategy = strategy;
        self
    }

    /// Declares the dead-letter edge target used when `error_policy` is
    /// [`ErrorPolicy::DeadLetter`].
    #[must_use]
    pub fn with_dead_letter_target(mut self, target: impl Into<NodeId>) -> Self {
        self.dead_letter_target = Some(target.into());
        self
    }

    /// Declares the late-data edge target used by an aggregate whose
    /// [`npipeline_node::LateDataPolicy`] is `Route`.
    #[must_use]
    pub fn with_late_data_target(mut self, target: impl Into<NodeId>) -> Self {
        self.late_data_target = Some(target.into());
        self
    }
}

/// The kind-specific payload a [`NodeEntry`] carries.
pub enum NodePayload {
    /// A source: no input type.
    Source(Box<dyn ErasedSource>),
    /// A transform.
    Transform(Box<dyn ErasedTransform>),
    /// An aggregate.
    Aggregate(Box<dyn ErasedAggregate>),
    /// A sink: no output type.
    Sink(Box<dyn ErasedSink>),
}

impl NodePayload {
    /// The [`npipeline_node::NodeKind`] this payload implements.
    #[must_use]
    pub fn kind(&self) -> npipeline_node::NodeKind {
        match self {
            NodePayload::Source(_) => npipeline_node::NodeKind::Source,
            NodePayload::Transform(_) => npipeline_node::NodeKind::Transform,
            NodePayload::Aggregate(_) => npipeline_node::NodeKind::Aggregate,
            NodePayload::Sink(_) => npipeline_node::NodeKind::Sink,
        }
    }
}

/// A fully registered node: its id, its type-erased implementation, its
/// declared input/output [`ElementType`]s (`None` where the kind has no
/// input or no output), and its builder options.
pub struct NodeEntry {
    /// Stable identity.
    pub id: NodeId,
    /// Kind-specific erased payload.
    pub payload: NodePayload,
    /// Declared input element type, `None` for a source.
    pub input_type: Option<ElementType>,
    /// Declared output element type, `None` for a sink.
    pub output_type: Option<ElementType>,
    /// Builder-time options.
    pub options: NodeOptions,
}
