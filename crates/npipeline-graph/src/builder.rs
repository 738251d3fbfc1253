//! The fluent, typed graph builder (spec §4.3): registers nodes, records
//! edges, and validates topology at `build()`.

use crate::edge::Edge;
use crate::entry::{NodeEntry, NodeOptions, NodePayload};
use crate::erased::{erase_aggregate, erase_sink, erase_source, erase_transform};
use crate::error::Error;
use crate::graph::Graph;
use crate::handle::{AggregateHandle, HasInput, HasOutput, SinkHandle, SourceHandle, TransformHandle};
use crate::node_id::NodeId;
use npipeline_node::{Aggregate, Sink, Source, Transform};
use npipeline_pipe::ElementType;
use std::collections::HashMap;
use std::hash::Hash;
use validator::Validate;

/// Builds a [`Graph`] by registering nodes and edges, then validating and
/// freezing the topology (spec §4.3).
#[derive(Default)]
pub struct GraphBuilder {
    nodes: HashMap<NodeId, NodeEntry>,
    edges: Vec<Edge>,
}

impl GraphBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, id: NodeId, entry: NodeEntry) -> Result<(), Error> {
        if let Err(report) = entry.options.validate() {
            return Err(Error::InvalidOption {
                node: id,
                reason: report.to_string(),
            });
        }
        if self.nodes.insert(id.clone(), entry).is_some() {
            return Err(Error::DuplicateNodeId(id));
        }
        Ok(())
    }

    /// Registers a source node (spec §6 `add_source`).
    pub fn add_source<S, T>(
        &mut self,
        id: impl Into<NodeId>,
        source: S,
        options: NodeOptions,
    ) -> Result<SourceHandle<T>, Error>
    where
        S: Source<T> + 'static,
        T: Clone + 'static,
    {
        let id = id.into();
        let entry = NodeEntry {
            id: id.clone(),
            payload: NodePayload::Source(erase_source(source)),
            input_type: None,
            output_type: Some(ElementType::of::<T>()),
            options,
        };
        self.register(id.clone(), entry)?;
        Ok(SourceHandle::new(id))
    }

    /// Registers a transform node (spec §6 `add_transform`).
    pub fn add_transform<X, TIn, TOut>(
        &mut self,
        id: impl Into<NodeId>,
        transform: X,
        options: NodeOptions,
    ) -> Result<TransformHandle<TIn, TOut>, Error>
    where
        X: Transform<TIn, TOut> + 'static,
        TIn: Clone + 'static,
        TOut: Clone + 'static,
    {
        let id = id.into();
        let entry = NodeEntry {
            id: id.clone(),
            payload: NodePayload::Transform(erase_transform(transform)),
            input_type: Some(ElementType::of::<TIn>()),
            output_type: Some(ElementType::of::<TOut>()),
            options,
        };
        self.register(id.clone(), entry)?;
        Ok(TransformHandle::new(id))
    }

    /// Registers an aggregate node (spec §6 `add_aggregate`).
    /// `allowed_lateness_millis` parameterises the watermark tracker
    /// consulted at runtime (spec §4.2, `SPEC_FULL.md` §5).
    pub fn add_aggregate<A, TIn, K, TAcc, TOut>(
        &mut self,
        id: impl Into<NodeId>,
        aggregate: A,
        allowed_lateness_millis: i64,
        options: NodeOptions,
    ) -> Result<AggregateHandle<TIn, TOut>, Error>
    where
        A: Aggregate<TIn, K, TAcc, TOut> + 'static,
        TIn: Clone + 'static,
        K: Eq + Hash + Clone + 'static,
        TAcc: Clone + 'static,
        TOut: Clone + 'static,
    {
        let id = id.into();
        let entry = NodeEntry {
            id: id.clone(),
            payload: NodePayload::Aggregate(erase_aggregate(aggregate, allowed_lateness_millis)),
            input_type: Some(ElementType::of::<TIn>()),
            output_type: Some(ElementType::of::<TOut>()),
            options,
        };
        self.register(id.clone(), entry)?;
        Ok(AggregateHandle::new(id))
    }

    /// Registers a sink node (spec §6 `add_sink`).
    pub fn add_sink<K, T>(
        &mut self,
        id: impl Into<NodeId>,
        sink: K,
        options: NodeOptions,
    ) -> Result<SinkHandle<T>, Error>
    where
        K: Sink<T> + 'static,
        T: Clone + 'static,
    {
        let id = id.into();
        let entry = NodeEntry {
            id: id.clone(),
            payload: NodePayload::Sink(erase_sink(sink)),
            input_type: Some(ElementType::of::<T>()),
            output_type: None,
            options,
        };
        self.register(id.clone(), entry)?;
        Ok(SinkHandle::new(id))
    }

    /// Records a directed edge from `upstream` to `downstream` (spec §6
    /// `connect`). `T` is pinned by the `HasOutput`/`HasInput` bounds, so
    /// a type mismatch between two handles fails to compile; the element
    /// types are still re-checked against the registry at [`Self::build`]
    /// since the registry itself is type-erased.
    pub fn connect<T: 'static>(
        &mut self,
        upstream: &impl HasOutput<T>,
        downstream: &impl HasInput<T>,
    ) -> &mut Self {
        self.edges.push(Edge::new(
            upstream.node_id().clone(),
            downstream.node_id().clone(),
        ));
        self
    }

    /// Records a directed edge with explicit [`Edge`] options (buffer
    /// capacity, role tag).
    pub fn connect_with<T: 'static>(
        &mut self,
        upstream: &impl HasOutput<T>,
        downstream: &impl HasInput<T>,
        configure: impl FnOnce(Edge) -> Edge,
    ) -> &mut Self {
        let edge = configure(Edge::new(
            upstream.node_id().clone(),
            downstream.node_id().clone(),
        ));
        self.edges.push(edge);
        self
    }

    /// Validates and freezes the graph (spec §4.3 "On finalisation the
    /// builder: ...").
    pub fn build(self) -> Result<Graph, Error> {
        Graph::finalize(self.nodes, self.edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use npipeline_node::testing::{MapTransform, VecSink, VecSource};

    #[test]
    fn linear_pipeline_builds_successfully() {
        let mut builder = GraphBuilder::new();
        let source = builder
            .add_source("src", VecSource::new("src", vec![1, 2, 3]), NodeOptions::default())
            .unwrap();
        let transform = builder
            .add_transform(
                "sq",
                MapTransform::new(|x: i32| Some(x * x)),
                NodeOptions::default(),
            )
            .unwrap();
        let sink = builder
            .add_sink::<_, i32>("sink", VecSink::new(), NodeOptions::default())
            .unwrap();

        builder.connect(&source, &transform);
        builder.connect(&transform, &sink);

        let graph = builder.build().unwrap();
        assert_eq!(graph.nodes().count(), 3);
    }

    #[test]
    fn duplicate_node_id_is_rejected() {
        let mut builder = GraphBuilder::new();
        builder
            .add_source("src", VecSource::new("src", vec![1]), NodeOptions::default())
            .unwrap();
        let err = builder
            .add_source("src", VecSource::new("src2", vec![1]), NodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateNodeId(_)));
    }

    #[test]
    fn invalid_fan_out_is_rejected() {
        let mut builder = GraphBuilder::new();
        let err = builder
            .add_source(
                "src",
                VecSource::new("src", vec![1]),
                NodeOptions::default().with_fan_out(0, None),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { .. }));
    }
}
