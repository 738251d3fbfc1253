#![deny(missing_docs, unsafe_code)]
#![warn(unreachable_pub)]

//! The per-run context threaded through every node lifecycle call (spec
//! §3): a cancellation signal, a cooperative parameter bag, optional
//! injected services, and an opaque run id.
//!
//! Modelled after the teacher's `context` crate (a plain key-value bag
//! handed to receivers/processors/exporters at initialisation) extended
//! with the run-scoped cancellation and identity spec.md's
//! `PipelineContext` additionally requires.

mod error;
mod run_id;
mod value;

pub use error::ValueConversionError;
pub use run_id::RunId;
pub use value::Value;

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Well-known parameter-bag keys spec.md §6 names explicitly.
pub mod keys {
    /// Set by a `Counting` pipe when it observes retry exhaustion upstream.
    pub const LAST_RETRY_EXHAUSTED_EXCEPTION: &str = "lastRetryExhaustedException";
    /// Optional item-level lineage collector service.
    pub const LINEAGE_COLLECTOR: &str = "lineageCollector";

    /// Opaque scratch space shared between collaborating nodes, keyed by a
    /// caller-chosen id (spec.md: `batchAnalytics.<id>`).
    #[must_use]
    pub fn batch_analytics(id: &str) -> String {
        format!("batchAnalytics.{id}")
    }
}

/// A per-run, shared bag of cancellation, identity, parameters and services
/// (spec §3 `PipelineContext`). Created once by the runner at the start of
/// a run and handed by reference (or, since it is cheap to clone, by value)
/// to every node's `Initialize`/`Execute`/`Dispose` call; dropped when the
/// run ends.
///
/// Cloning a `PipelineContext` is cheap: the parameter bag and cancellation
/// token are both reference-counted, so every clone observes the same
/// cancellation and the same parameters as every other clone from the same
/// run.
#[derive(Clone)]
pub struct PipelineContext {
    run_id: RunId,
    cancellation: CancellationToken,
    parameters: Arc<RwLock<HashMap<String, Value>>>,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineContext {
    /// Creates a fresh context with a new run id and an un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: RunId::generate(),
            cancellation: CancellationToken::new(),
            parameters: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The opaque id of this run.
    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// The cancellation token observed at every suspension point (spec §5).
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// True once cancellation has been signalled, by a node error under
    /// `Fail` policy or by an external caller.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Signals cancellation for every clone of this context's run.
    pub fn cancel(&self) {
        tracing::debug!(run_id = %self.run_id, "cancellation signalled");
        self.cancellation.cancel();
    }

    /// Stores a parameter under `key`, overwriting any previous value.
    ///
    /// Spec §9 notes writers "must use compare-and-swap idioms to avoid
    /// clobbering collaborators"; callers sharing a key (e.g. the
    /// `batchAnalytics.<id>` scratch space) are expected to partition by id
    /// rather than relying on this method to merge concurrent writes.
    pub fn set_parameter(&self, key: impl Into<String>, value: Value) {
        let _ = self.parameters.write().insert(key.into(), value);
    }

    /// Reads a parameter, if present. Readers must tolerate absence (spec
    /// §5): a missing key is not an error.
    #[must_use]
    pub fn get_parameter(&self, key: &str) -> Option<Value> {
        self.parameters.read().get(key).cloned()
    }

    /// Reads and converts a parameter, falling back to `default` when the
    /// key is absent or the stored value does not convert to `V`.
    pub fn get_parameter_value<V: TryFrom<Value>>(&self, key: &str, default: V) -> V {
        match self.get_parameter(key) {
            Some(value) => V::try_from(value).unwrap_or(default),
            None => default,
        }
    }

    /// Removes a parameter, returning its previous value if any.
    pub fn remove_parameter(&self, key: &str) -> Option<Value> {
        self.parameters.write().remove(key)
    }

    /// Stashes the retry-exhausted error under the well-known
    /// `lastRetryExhaustedException` key (spec §6, §8 scenario 7).
    pub fn set_last_retry_exhausted(&self, error: Arc<dyn StdError + Send + Sync>) {
        self.set_parameter(keys::LAST_RETRY_EXHAUSTED_EXCEPTION, Value::Error(error));
    }

    /// Reads the retry-exhausted error stashed by a `Counting` pipe, if any.
    #[must_use]
    pub fn last_retry_exhausted(&self) -> Option<Arc<dyn StdError + Send + Sync>> {
        match self.get_parameter(keys::LAST_RETRY_EXHAUSTED_EXCEPTION)? {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Registers an injected service (clock, logger, lineage collector)
    /// under `key` (spec §3: "optional services").
    pub fn set_service<T: Any + Send + Sync>(&self, key: impl Into<String>, service: Arc<T>) {
        self.set_parameter(key, Value::Service(service));
    }

    /// Looks up a previously registered service and downcasts it to `T`.
    /// Returns `None` if absent or if the stored service is a different
    /// concrete type.
    #[must_use]
    pub fn get_service<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        match self.get_parameter(key)? {
            Value::Service(service) => service.downcast::<T>().ok(),
            _ => None,
        }
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("run_id", &self.run_id)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_cancellation_and_parameters() {
        let ctx = PipelineContext::new();
        let clone = ctx.clone();

        ctx.set_parameter("k", Value::U64(7));
        assert_eq!(clone.get_parameter_value::<u64>("k", 0), 7);

        clone.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn missing_parameter_falls_back_to_default() {
        let ctx = PipelineContext::new();
        assert_eq!(ctx.get_parameter_value::<u64>("missing", 42), 42);
    }

    #[test]
    fn retry_exhausted_error_round_trips() {
        #[derive(Debug)]
        struct Boom;
        impl std::fmt::Display for Boom {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("boom")
            }
        }
        impl std::error::Error for Boom {}

        let ctx = PipelineContext::new();
        assert!(ctx.last_retry_exhausted().is_none());

        ctx.set_last_retry_exhausted(Arc::new(Boom));
        assert!(ctx.last_retry_exhausted().is_some());
    }

    #[test]
    fn service_lookup_is_type_checked() {
        struct Clock;

        let ctx = PipelineContext::new();
        ctx.set_service("clock", Arc::new(Clock));

        assert!(ctx.get_service::<Clock>("clock").is_some());
        assert!(ctx.get_service::<u32>("clock").is_none());
    }

    #[test]
    fn each_context_gets_a_distinct_run_id() {
        let a = PipelineContext::new();
        let b = PipelineContext::new();
        assert_ne!(a.run_id(), b.run_id());
    }
}
