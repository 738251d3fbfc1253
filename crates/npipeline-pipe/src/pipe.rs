//! The [`Pipe`] contract (spec §4.1): a lazy, typed, asynchronously
//! enumerable sequence with explicit disposal.

use crate::element_type::ElementType;
use crate::error::Error;
use futures::stream::Stream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// An item pulled from a pipe's enumeration: either a delivered value or a
/// failure of the sequence itself (the sequence ends after the first `Err`).
pub type Item<T> = Result<T, Error>;

/// A boxed, possibly-infinite asynchronous sequence of `Item<T>`, borrowed
/// from the pipe that produced it. Every `.next()` on this stream is a
/// suspension point that observes the enumeration's cancellation token
/// (spec §5: "every suspension point observes the run's cancellation
/// token").
pub type PipeStream<'a, T> = Pin<Box<dyn Stream<Item = Item<T>> + 'a>>;

/// A lazy, typed, single-consumer-by-default sequence of items (spec §3,
/// §4.1). All five variants in this crate implement this trait; so does the
/// merged pipe produced by a fan-in [`crate::merge::MergeStrategy`].
///
/// Not `Send`: pipes are built on `npipeline-channel`'s single-threaded
/// `Rc`-based queues, matching the cooperative, single-process scheduling
/// model of spec §5. A pipeline confined to one OS thread (the runner's
/// execution model, §4.4) never needs `Send` pipes.
#[async_trait::async_trait(?Send)]
pub trait Pipe<T> {
    /// Diagnostic label (spec §4.1 `Name()`).
    fn name(&self) -> &str;

    /// Runtime descriptor for `T` (spec §4.1 `ElementType()`).
    fn element_type(&self) -> ElementType;

    /// Produces items until exhaustion, cancellation, or failure (spec
    /// §4.1 `Enumerate(cancel)`). Construction-time failures — a
    /// non-restartable `Streaming` pipe enumerated twice, a `Multicast`
    /// pipe with no free subscriber slot — are returned synchronously
    /// rather than as the stream's first item; mid-stream failures are the
    /// stream's terminal item.
    fn enumerate(&self, cancel: CancellationToken) -> Result<PipeStream<'_, T>, Error>;

    /// Idempotent; releases upstream resources. Safe to call while an
    /// enumeration is in progress — it cancels it (spec §4.1 `Dispose()`).
    /// Awaits any background task the pipe owns (e.g. a multicast pump)
    /// before returning.
    async fn dispose(&self);
}

/// Lets a boxed trait object be wrapped transparently anywhere a concrete
/// `Pipe<T>` is expected (e.g. `CountingPipe<T, P>`'s `P: Pipe<T>` bound),
/// so callers holding a `Box<dyn Pipe<T>>` never need a throwaway newtype
/// just to satisfy a generic parameter.
#[async_trait::async_trait(?Send)]
impl<T> Pipe<T> for Box<dyn Pipe<T>> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn element_type(&self) -> ElementType {
        (**self).element_type()
    }

    fn enumerate(&self, cancel: CancellationToken) -> Result<PipeStream<'_, T>, Error> {
        (**self).enumerate(cancel)
    }

    async fn dispose(&self) {
        (**self).dispose().await;
    }
}
