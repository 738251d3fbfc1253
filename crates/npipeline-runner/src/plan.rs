//! The materialisation/execution engine (spec §4.4): turns a finalised
//! [`npipeline_graph::Graph`] plus a [`PipelineContext`] into running node
//! tasks, wiring each node's inbound edges into its input pipe (applying
//! its merge strategy), wrapping fan-out outputs in a multicast pipe, and
//! collecting every sink's completion.
//!
//! Generalises the teacher's executor loop (which drives a fixed
//! receiver → processor chain → exporter pipeline) to an arbitrary
//! validated DAG of the four node kinds spec.md defines.

use crate::aggregate_pipe::AggregateExecPipe;
use crate::channel_pipe::ChannelPipe;
use crate::error::Error;
use crate::shared_pipe::SharedPipe;
use crate::task_label::TaskLabel;
use crate::transform_pipe::TransformExecPipe;
use futures::future;
use npipeline_channel::{channel, Receiver, Sender};
use npipeline_context::PipelineContext;
use npipeline_graph::{roles, AnyItem, Edge, Graph, NodeEntry, NodeId, NodeOptions, NodePayload};
use npipeline_node::NodeKind;
use npipeline_pipe::{merge, CountingPipe, ElementType, MulticastPipe, Pipe};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// Everything a finished run reports back to the caller (spec §6
/// `pipeline.run(context)`).
#[derive(Debug, Default)]
pub struct RunReport {
    /// Every node that completed (a source/transform/aggregate whose output
    /// pipe was fully drained, or a sink whose `Execute` returned).
    pub completed_nodes: Vec<NodeId>,
}

const DEAD_LETTER_CHANNEL_CAPACITY: usize = 1024;
const LATE_DATA_CHANNEL_CAPACITY: usize = 1024;

/// Runs `graph` to completion under `context`. `pipeline_name` is carried
/// into every node task's [`TaskLabel`] for diagnostics only.
pub async fn execute(graph: Graph, context: PipelineContext, pipeline_name: Arc<str>) -> Result<RunReport, Error> {
    let cancel = context.cancellation_token();
    let (mut nodes, edges, topo_order) = graph.into_parts();

    validate_fan_out(&nodes, &edges)?;
    let mut side_channels = SideChannels::build(&edges);

    let mut outputs: HashMap<NodeId, Rc<dyn Pipe<AnyItem>>> = HashMap::new();
    let mut sink_futures = Vec::new();
    let mut completed = Vec::new();

    for id in &topo_order {
        let entry = nodes
            .remove(id)
            .expect("topological order only names registered nodes");
        let NodeEntry {
            payload,
            input_type,
            output_type,
            options,
            ..
        } = entry;

        let dead_letter_tx = options
            .dead_letter_target
            .as_ref()
            .and_then(|target| side_channels.dead_letter_sender(target));
        let late_data_tx = options
            .late_data_target
            .as_ref()
            .and_then(|target| side_channels.late_data_sender(target));

        match payload {
            NodePayload::Source(source) => {
                let label = TaskLabel::new(pipeline_name.clone(), id.clone(), NodeKind::Source);
                let span = tracing::info_span!("node", task = %label);
                let pipe = {
                    let _enter = span.enter();
                    source
                        .initialize(&context, cancel.clone())
                        .await
                        .map_err(|source| Error::SourceInitialization { node: id.clone(), source })?
                };
                let counted = Box::new(CountingPipe::new(pipe, context.clone()));
                let output_type = output_type.expect("a source always declares an output type");
                outputs.insert(id.clone(), materialise_output(id, &options, counted, output_type));
                completed.push(id.clone());
            }
            NodePayload::Transform(transform) => {
                let input_type = input_type.expect("a transform always declares an input type");
                let input = build_input_pipe(id, &options, input_type, &edges, &outputs, &mut side_channels)?;
                let output_type = output_type.expect("a transform always declares an output type");
                let (max_attempts, delay_fn) = resolve_retry(&options);

                let exec: Box<dyn Pipe<AnyItem>> = Box::new(TransformExecPipe::new(
                    id.to_string(),
                    input,
                    transform,
                    output_type,
                    context.clone(),
                    options.error_policy,
                    max_attempts,
                    delay_fn,
                    options.execution_strategy,
                    dead_letter_tx,
                ));
                let counted = Box::new(CountingPipe::new(exec, context.clone()));
                outputs.insert(id.clone(), materialise_output(id, &options, counted, output_type));
                completed.push(id.clone());
            }
            NodePayload::Aggregate(aggregate) => {
                let input_type = input_type.expect("an aggregate always declares an input type");
                let input = build_input_pipe(id, &options, input_type, &edges, &outputs, &mut side_channels)?;
                let output_type = output_type.expect("an aggregate always declares an output type");
                let (max_attempts, delay_fn) = resolve_retry(&options);

                let exec: Box<dyn Pipe<AnyItem>> = Box::new(AggregateExecPipe::new(
                    id.to_string(),
                    input,
                    aggregate,
                    output_type,
                    context.clone(),
                    options.error_policy,
                    max_attempts,
                    delay_fn,
                    dead_letter_tx,
                    late_data_tx,
                ));
                let counted = Box::new(CountingPipe::new(exec, context.clone()));
                outputs.insert(id.clone(), materialise_output(id, &options, counted, output_type));
                completed.push(id.clone());
            }
            NodePayload::Sink(sink) => {
                let input_type = input_type.expect("a sink always declares an input type");
                let input = build_input_pipe(id, &options, input_type, &edges, &outputs, &mut side_channels)?;
                let label = TaskLabel::new(pipeline_name.clone(), id.clone(), NodeKind::Sink);
                let sink_context = context.clone();
                let sink_cancel = cancel.clone();
                let node_id = id.clone();

                sink_futures.push(async move {
                    let span = tracing::info_span!("node", task = %label);
                    let _enter = span.enter();
                    let result = sink.execute(input, &sink_context, sink_cancel).await;
                    (node_id, result)
                });
            }
        }
    }

    let sink_results = future::join_all(sink_futures).await;

    // Dispose every materialised pipe in reverse topological order (spec
    // §4.4 step 6), regardless of outcome, so every node's teardown path
    // runs even on a fatal error or cancellation.
    for id in topo_order.iter().rev() {
        if let Some(pipe) = outputs.remove(id) {
            pipe.dispose().await;
        }
    }

    for (node, result) in sink_results {
        result.map_err(|source| Error::Sink { node: node.clone(), source })?;
        completed.push(node);
    }

    if context.is_cancelled() {
        return Err(Error::Cancelled);
    }

    Ok(RunReport {
        completed_nodes: completed,
    })
}

/// Per-run side channels backing dead-letter and late-data edges (spec §3
/// `roles::DEAD_LETTER`/`roles::LATE_DATA`): one bounded channel per
/// distinct target node, shared by every producer that routes to it.
struct SideChannels {
    dead_letter_senders: HashMap<NodeId, Sender<AnyItem>>,
    dead_letter_receivers: HashMap<NodeId, Receiver<AnyItem>>,
    late_data_senders: HashMap<NodeId, Sender<AnyItem>>,
    late_data_receivers: HashMap<NodeId, Receiver<AnyItem>>,
}

impl SideChannels {
    fn build(edges: &[Edge]) -> Self {
        let mut dead_letter_senders = HashMap::new();
        let mut dead_letter_receivers = HashMap::new();
        let mut late_data_senders = HashMap::new();
        let mut late_data_receivers = HashMap::new();

        for edge in edges {
            match edge.role.as_deref() {
                Some(role) if role == roles::DEAD_LETTER => {
                    dead_letter_senders.entry(edge.to.clone()).or_insert_with(|| {
                        let (tx, rx) = channel(DEAD_LETTER_CHANNEL_CAPACITY);
                        dead_letter_receivers.insert(edge.to.clone(), rx);
                        tx
                    });
                }
                Some(role) if role == roles::LATE_DATA => {
                    late_data_senders.entry(edge.to.clone()).or_insert_with(|| {
                        let (tx, rx) = channel(LATE_DATA_CHANNEL_CAPACITY);
                        late_data_receivers.insert(edge.to.clone(), rx);
                        tx
                    });
                }
                _ => {}
            }
        }

        Self {
            dead_letter_senders,
            dead_letter_receivers,
            late_data_senders,
            late_data_receivers,
        }
    }

    fn dead_letter_sender(&self, target: &NodeId) -> Option<Sender<AnyItem>> {
        self.dead_letter_senders.get(target).cloned()
    }

    fn late_data_sender(&self, target: &NodeId) -> Option<Sender<AnyItem>> {
        self.late_data_senders.get(target).cloned()
    }

    /// Takes the single receiver declared for `id`'s dead-letter inbound
    /// edge, if any. Returns `None` on every call after the first: the
    /// receiver is consumed exactly once, by the one node that declared it
    /// as an inbound edge.
    fn take_dead_letter_receiver(&mut self, id: &NodeId) -> Option<Receiver<AnyItem>> {
        self.dead_letter_receivers.remove(id)
    }

    fn take_late_data_receiver(&mut self, id: &NodeId) -> Option<Receiver<AnyItem>> {
        self.late_data_receivers.remove(id)
    }
}

/// Wraps `pipe` in a [`MulticastPipe`] when `options`'s declared fan-out
/// factor is greater than one (spec §4.4 step 2/3), then shares it behind
/// an `Rc` so every downstream edge gets its own [`SharedPipe`] view.
fn materialise_output(
    id: &NodeId,
    options: &NodeOptions,
    pipe: Box<dyn Pipe<AnyItem>>,
    _output_type: ElementType,
) -> Rc<dyn Pipe<AnyItem>> {
    let fan_out = options.fan_out;
    if fan_out > 1 {
        let capacities = vec![options.fan_out_capacity; fan_out];
        Rc::new(MulticastPipe::new(id.to_string(), pipe, capacities))
    } else {
        Rc::from(pipe)
    }
}

/// Builds the single input pipe a non-source node reads from: one
/// [`SharedPipe`] view per declared plain inbound edge plus, when `id` is
/// the declared target of a dead-letter or late-data edge, a
/// [`ChannelPipe`] over that side channel — all composed via the node's
/// declared [`npipeline_pipe::MergeStrategy`] when there is more than one
/// (spec §4.1, §4.4 step 3).
fn build_input_pipe(
    id: &NodeId,
    options: &NodeOptions,
    input_type: ElementType,
    edges: &[Edge],
    outputs: &HashMap<NodeId, Rc<dyn Pipe<AnyItem>>>,
    side_channels: &mut SideChannels,
) -> Result<Box<dyn Pipe<AnyItem>>, Error> {
    let mut upstreams: Vec<Box<dyn Pipe<AnyItem>>> = Vec::new();
    let mut took_dead_letter = false;
    let mut took_late_data = false;

    for edge in edges.iter().filter(|e| &e.to == id) {
        match edge.role.as_deref() {
            None => {
                let upstream = outputs.get(&edge.from).unwrap_or_else(|| {
                    panic!("node '{id}' materialised before its inbound edge from '{}'", edge.from)
                });
                upstreams.push(Box::new(SharedPipe::new(upstream.clone())));
            }
            Some(role) if role == roles::DEAD_LETTER && !took_dead_letter => {
                took_dead_letter = true;
                if let Some(receiver) = side_channels.take_dead_letter_receiver(id) {
                    upstreams.push(Box::new(ChannelPipe::new(format!("{id}:dead_letter"), input_type, receiver)));
                }
            }
            Some(role) if role == roles::LATE_DATA && !took_late_data => {
                took_late_data = true;
                if let Some(receiver) = side_channels.take_late_data_receiver(id) {
                    upstreams.push(Box::new(ChannelPipe::new(format!("{id}:late_data"), input_type, receiver)));
                }
            }
            Some(_) => {}
        }
    }

    if upstreams.len() == 1 {
        return Ok(upstreams.into_iter().next().expect("length checked above"));
    }

    Ok(Box::new(merge(id.to_string(), options.merge_strategy, upstreams)))
}

fn validate_fan_out(nodes: &HashMap<NodeId, NodeEntry>, edges: &[Edge]) -> Result<(), Error> {
    for (id, entry) in nodes {
        let outbound_edges = edges.iter().filter(|e| &e.from == id && e.role.is_none()).count();
        let fan_out = entry.options.fan_out;
        if outbound_edges > fan_out {
            return Err(Error::FanOutMismatch {
                node: id.clone(),
                fan_out,
                outbound_edges,
            });
        }
    }
    Ok(())
}

fn resolve_retry(options: &NodeOptions) -> (u32, Option<npipeline_retry::DelayFn>) {
    match &options.retry_policy {
        Some(policy) => (policy.max_attempts(), Some(policy.delay().clone().build())),
        None => (1, None),
    }
}
