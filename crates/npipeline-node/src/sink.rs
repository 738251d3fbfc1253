//! The `Sink` node contract (spec §4.2): no output, drains its input pipe.

use crate::error::NodeError;
use npipeline_context::PipelineContext;
use npipeline_pipe::Pipe;
use tokio_util::sync::CancellationToken;

/// A terminal node that drains its input pipe to completion (spec §4.2
/// "Sink"). A run completes once every sink's pipe is drained or fails
/// (spec §2).
#[async_trait::async_trait(?Send)]
pub trait Sink<T> {
    /// Drains `input` to completion.
    async fn execute(
        &self,
        input: &dyn Pipe<T>,
        context: &PipelineContext,
        cancel: CancellationToken,
    ) -> Result<(), NodeError>;

    /// Pushes a new configuration snapshot into a running node (see
    /// [`crate::Source::configure`]). A no-op unless overridden.
    fn configure(&self, _config: serde_json::Value) {}
}
