#![deny(missing_docs, unsafe_code)]
#![warn(unreachable_pub)]

//! The Runner/Scheduler layer (spec §4.4): drives a finalised
//! [`npipeline_graph::Graph`] to completion under a
//! [`npipeline_context::PipelineContext`] — topological materialisation,
//! fan-out/fan-in wiring, retry and error-policy enforcement, and ordered
//! teardown.
//!
//! Generalises the teacher's fixed receiver → processor chain → exporter
//! executor loop into a driver for an arbitrary validated DAG of the four
//! node kinds spec.md defines, while keeping its task-labelling and
//! span-per-node-execution diagnostics.

mod aggregate_pipe;
mod channel_pipe;
mod error;
mod plan;
mod retry_exec;
mod shared_pipe;
mod task_label;
mod transform_pipe;

pub use error::Error;
pub use plan::RunReport;
pub use task_label::TaskLabel;

use npipeline_context::PipelineContext;
use npipeline_graph::Graph;
use std::sync::Arc;
use std::time::Duration;

/// Drives one or more runs of finalised graphs, tagging every node task
/// with this runner's pipeline name (spec §6 "minor features" —
/// `TaskLabel` bookkeeping).
///
/// A `Runner` carries no per-run state of its own: [`PipelineContext`]
/// already owns the run id and cancellation token, so the same `Runner`
/// can drive any number of runs, sequentially or from independent local
/// tasks.
pub struct Runner {
    pipeline_name: Arc<str>,
}

impl Runner {
    /// Names this runner's pipeline for diagnostics (`TaskLabel`, the
    /// per-run `tracing` span). Does not otherwise affect execution.
    #[must_use]
    pub fn new(pipeline_name: impl Into<Arc<str>>) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
        }
    }

    /// Runs `graph` to completion under `context` (spec §4.4, `pipeline.run(context)`
    /// in spec §6's builder surface). Opens a `tracing::info_span!("run", ...)`
    /// for the duration of the call (spec.md §1 ambient logging).
    ///
    /// Returns once every sink has completed, every node's output pipe has
    /// been disposed in reverse topological order, and — if the run was
    /// cancelled along the way — [`Error::Cancelled`].
    pub async fn run(&self, graph: Graph, context: PipelineContext) -> Result<RunReport, Error> {
        let run_id = context.run_id();
        let span = tracing::info_span!("run", run_id = %run_id, pipeline = %self.pipeline_name);
        let _enter = span.enter();

        // Pipes are built on `Rc`-based, non-`Send` channels (spec §5's
        // single-process cooperative scheduler), and a `Multicast` pipe's
        // pump task is spawned with `spawn_local`. Driving the whole run
        // inside its own `LocalSet` means callers never have to remember to
        // set one up themselves just to run a pipeline with fan-out.
        let local = tokio::task::LocalSet::new();
        local
            .run_until(plan::execute(graph, context, self.pipeline_name.clone()))
            .await
    }

    /// Signals cancellation on `context` and gives in-flight node tasks
    /// until `deadline` to observe it and unwind cleanly (spec.md §6
    /// "minor features": the teacher's `ControlMsg::Shutdown { deadline,
    /// reason }` contract applied to the abstract "cooperative
    /// cancellation" spec.md §5 describes).
    ///
    /// Does not itself await the run's completion — callers that need to
    /// know when `run` actually returns should await its future directly;
    /// `shutdown` only bounds how long that unwind is given before the
    /// caller should stop waiting.
    pub async fn shutdown(&self, context: &PipelineContext, deadline: Duration) {
        context.cancel();
        tracing::info!(pipeline = %self.pipeline_name, ?deadline, "shutdown requested, awaiting cooperative cancellation");
        tokio::time::sleep(deadline).await;
    }
}
