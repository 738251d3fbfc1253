//! The `Source` node contract (spec §4.2): no input, produces the node's
//! output pipe once.

use crate::error::NodeError;
use npipeline_context::PipelineContext;
use npipeline_pipe::Pipe;
use tokio_util::sync::CancellationToken;

/// A node with no input that produces a [`Pipe`] of `T_out` (spec §4.2
/// "Source"). `initialize` is called at most once per run; the node's
/// lifetime ends when the returned pipe is disposed. Failures from
/// `initialize` itself are `SourceInitError` (the runner's concern, spec
/// §7); failures surfacing from the pipe after at least one item has been
/// produced are pipe failures, not source-init failures.
#[async_trait::async_trait(?Send)]
pub trait Source<T> {
    /// Produces this source's output pipe.
    async fn initialize(
        &self,
        context: &PipelineContext,
        cancel: CancellationToken,
    ) -> Result<Box<dyn Pipe<T>>, NodeError>;

    /// Pushes a new configuration snapshot into a running node (`SPEC_FULL.md`
    /// §3: "the ability to push a new retry policy into a running node",
    /// generalised to any node kind). A no-op unless overridden; most
    /// sources are static once built.
    fn configure(&self, _config: serde_json::Value) {}
}
