#![deny(missing_docs, unsafe_code)]
#![warn(unreachable_pub)]

//! NPipeline: a high-throughput, in-process dataflow framework (spec §1)
//! that executes user-defined pipelines composed of typed nodes —
//! sources, transforms, aggregates and sinks — connected into a directed
//! acyclic graph. Records flow as lazy, possibly-infinite asynchronous
//! sequences, with fan-out, fan-in, backpressure, retries and
//! cancellation built in.
//!
//! This crate is a thin facade over the workspace's layered sub-crates:
//! build a graph with [`npipeline_graph::GraphBuilder`], wrap the
//! finalised result in [`Pipeline`], and call [`Pipeline::run`] under a
//! [`npipeline_context::PipelineContext`] (spec §6 builder surface:
//! `builder.build() -> Pipeline`, `pipeline.run(context)`).
//!
//! The [`prelude`] module re-exports the types most pipelines need to
//! name: node traits, policy enums, the graph builder, and the runner.
//!
//! See `demos/` for runnable end-to-end examples (a linear pipeline, and
//! a fan-in/fan-out pipeline), and each sub-crate's own docs for the
//! layer it owns.

pub use npipeline_runner::{Error, RunReport, Runner};

use npipeline_context::PipelineContext;
use npipeline_graph::Graph;
use std::sync::Arc;

/// The product of [`npipeline_graph::GraphBuilder::build`]: a finalised,
/// named, runnable graph (spec §6 `Pipeline`).
///
/// Carries only a diagnostic name beyond the graph itself — all per-run
/// state (cancellation, parameters, identity) lives in the
/// [`PipelineContext`] passed to [`Pipeline::run`], so the same `Pipeline`
/// can be run more than once, each run getting a fresh context.
pub struct Pipeline {
    name: Arc<str>,
    graph: Graph,
}

impl Pipeline {
    /// Wraps `graph` under the default diagnostic name `"pipeline"`.
    #[must_use]
    pub fn new(graph: Graph) -> Self {
        Self::named("pipeline", graph)
    }

    /// Wraps `graph` under `name`, used to label every node task's
    /// tracing span (spec §6 "minor features": `TaskLabel` bookkeeping).
    #[must_use]
    pub fn named(name: impl Into<Arc<str>>, graph: Graph) -> Self {
        Self {
            name: name.into(),
            graph,
        }
    }

    /// Runs this pipeline to completion under `context` (spec §6
    /// `pipeline.run(context)`).
    pub async fn run(self, context: PipelineContext) -> Result<RunReport, Error> {
        Runner::new(self.name).run(self.graph, context).await
    }
}

/// Re-exports of the types a pipeline author names most often, so
/// `use npipeline::prelude::*;` covers the common case without pulling in
/// every sub-crate's full public surface.
pub mod prelude {
    pub use npipeline_context::{keys, PipelineContext};
    pub use npipeline_graph::{roles, Edge, Graph, GraphBuilder, NodeId, NodeOptions, SideChannelSource};
    pub use npipeline_node::{
        Aggregate, ErrorPolicy, ExecutionStrategy, LateDataPolicy, NodeError, NodeKind, RetryPolicy, Sink, Source,
        Transform, WindowSpec,
    };
    pub use npipeline_pipe::{ElementType, MergeStrategy, Pipe};
    pub use npipeline_retry::RetryDelayConfig;
    pub use npipeline_storage::{StorageCapabilities, StorageProvider, StorageUri};

    pub use crate::{Pipeline, RunReport, Runner};
}

#[cfg(test)]
mod tests {
    use super::*;
    use npipeline_graph::{GraphBuilder, NodeOptions};
    use npipeline_node::testing::{VecSink, VecSource};

    #[test]
    fn named_pipeline_keeps_its_name() {
        let mut builder = GraphBuilder::new();
        let source = builder
            .add_source("src", VecSource::new("src", vec![1]), NodeOptions::default())
            .unwrap();
        let sink = builder
            .add_sink::<_, i32>("sink", VecSink::new(), NodeOptions::default())
            .unwrap();
        builder.connect(&source, &sink);
        let graph = builder.build().expect("a single source-to-sink edge is a valid graph");

        let pipeline = Pipeline::named("demo", graph);
        assert_eq!(&*pipeline.name, "demo");
    }
}
