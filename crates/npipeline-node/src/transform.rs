//! The `Transform` node contract (spec §4.2): one input item in, zero or
//! one output items out.

use crate::error::NodeError;
use npipeline_context::PipelineContext;
use tokio_util::sync::CancellationToken;

/// A node that maps each input item to zero or one output items (spec
/// §4.2 "Transform"). Returning `Ok(None)` drops the item. Stateless by
/// default (spec §4.2 invariant): any state a concrete transform needs
/// must be declared explicitly on the implementing type and is owned
/// per-node-per-run, since a fresh instance is expected per build.
#[async_trait::async_trait(?Send)]
pub trait Transform<TIn, TOut> {
    /// Maps one input item, optionally producing one output item.
    async fn execute(
        &self,
        item: TIn,
        context: &PipelineContext,
        cancel: CancellationToken,
    ) -> Result<Option<TOut>, NodeError>;

    /// Pushes a new configuration snapshot into a running node (see
    /// [`crate::Source::configure`]). A no-op unless overridden.
    fn configure(&self, _config: serde_json::Value) {}
}
