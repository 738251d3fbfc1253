//! The `Aggregate` node contract (spec §4.2): parameterised over
//! `(T_in, K, T_acc, T_out)`. A key extractor partitions the input; each
//! key's accumulator is seeded, folded per item, optionally merged across
//! parallel workers, and finalised on window close.
//!
//! Only the interface shape is fixed (spec §4.2, §9 Open Questions); the
//! math — what an accumulator actually computes, and whether merges are
//! commutative — is the implementer's concern (spec §1: "the math is
//! not" in scope).

use crate::error::NodeError;
use crate::window::{LateDataPolicy, WindowSpec};
use npipeline_context::PipelineContext;

/// A node that partitions input items by key, folds each key's items into
/// an accumulator per window, and finalises closed windows into zero or
/// more output items (spec §4.2 "Aggregate").
///
/// Guarantee (spec §4.2): within a single key, items are folded in receive
/// order; across keys, parallelism is permitted — callers may fold
/// different keys concurrently as long as a single key's fold calls are
/// serialised.
#[async_trait::async_trait(?Send)]
pub trait Aggregate<TIn, K, TAcc, TOut> {
    /// Extracts the partitioning key for `item`.
    fn extract_key(&self, item: &TIn) -> K;

    /// Extracts the event-time (epoch milliseconds) used for watermark
    /// tracking and window assignment.
    fn event_time_millis(&self, item: &TIn) -> i64;

    /// The window declaration this aggregate closes on.
    fn window(&self) -> WindowSpec;

    /// What happens to an item that arrives behind the current watermark.
    fn late_data_policy(&self) -> LateDataPolicy {
        LateDataPolicy::Drop
    }

    /// Produces the zero-value accumulator for a freshly seen key.
    fn seed(&self, key: &K) -> TAcc;

    /// Folds one item into an existing accumulator, in receive order.
    async fn fold(
        &self,
        accumulator: TAcc,
        item: TIn,
        context: &PipelineContext,
    ) -> Result<TAcc, NodeError>;

    /// Merges two accumulators for the same key, used when folding
    /// happened on independent parallel workers (spec §4.2: "optionally
    /// merged across parallel workers"). The default rejects merging,
    /// appropriate for aggregates that only ever fold sequentially.
    fn merge(&self, _a: TAcc, _b: TAcc) -> Result<TAcc, NodeError> {
        Err(crate::error::Message::boxed(
            "this aggregate does not support merging accumulators",
        ))
    }

    /// Finalises a key's accumulator when its window closes, producing
    /// zero or more output items.
    fn finalize(&self, key: K, accumulator: TAcc) -> Vec<TOut>;

    /// Pushes a new configuration snapshot into a running node (see
    /// [`crate::Source::configure`]). A no-op unless overridden.
    fn configure(&self, _config: serde_json::Value) {}
}
