//! The `Multicast` pipe variant (spec §4.1): a single producer pumping
//! items to N bounded subscriber queues. Subscribers share the upstream
//! enumeration — one pull, many deliveries (spec §3 Ownership).

use crate::element_type::ElementType;
use crate::error::Error;
use crate::pipe::{Item, Pipe, PipeStream};
use futures::stream::{self, StreamExt};
use npipeline_channel::{fanout, Receiver};
use std::cell::{Cell, RefCell};
use tokio_util::sync::CancellationToken;

/// Per-subscriber capacity and live-count snapshot (spec §4.1 "branch
/// metrics: subscriber count, per-subscriber capacity").
#[derive(Debug, Clone)]
pub struct BranchMetrics {
    /// Declared number of subscriber views.
    pub subscriber_count: usize,
    /// Per-subscriber queue capacity, in declaration order (`None` =
    /// effectively unbounded).
    pub capacities: Vec<Option<usize>>,
    /// Number of subscriber views constructed so far via `enumerate`.
    pub views_taken: usize,
}

/// Wraps a source into a pipe that pumps items to `subscriber_count`
/// independent, bounded queues. `enumerate` hands out the next unclaimed
/// subscriber view; requesting more views than `subscriber_count` fails
/// with `Error::TooManySubscribers` (spec §8 scenario 4).
pub struct MulticastPipe<T> {
    name: String,
    capacities: Vec<Option<usize>>,
    taken: Cell<usize>,
    receivers: RefCell<Vec<Option<Receiver<Item<T>>>>>,
    pump_cancel: CancellationToken,
    pump_handle: RefCell<Option<tokio::task::JoinHandle<()>>>,
    disposed: Cell<bool>,
}

impl<T: Clone + 'static> MulticastPipe<T> {
    /// Spawns the pump task immediately and returns the multicast wrapper.
    ///
    /// Must be called from within a `tokio::task::LocalSet` — the pump is
    /// spawned with `spawn_local` since pipes are built on `Rc`-based,
    /// non-`Send` channels (spec §5's single-process cooperative scheduler
    /// never requires cross-thread handoff).
    pub fn new<P>(name: impl Into<String>, inner: P, capacities: Vec<Option<usize>>) -> Self
    where
        P: Pipe<T> + 'static,
    {
        let name = name.into();
        let (sender, receivers) = fanout::fanout::<Item<T>>(&capacities);
        let pump_cancel = CancellationToken::new();

        let pump_name = name.clone();
        let cancel_for_pump = pump_cancel.clone();
        let handle = tokio::task::spawn_local(async move {
            match inner.enumerate(cancel_for_pump) {
                Ok(mut stream) => {
                    while let Some(item) = stream.next().await {
                        let failed = item.is_err();
                        sender.broadcast(item).await;
                        if failed {
                            break;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(pipe = %pump_name, error = %e, "multicast source failed before producing any item");
                    sender.broadcast(Err(e)).await;
                }
            }
            inner.dispose().await;
        });

        Self {
            name,
            capacities,
            taken: Cell::new(0),
            receivers: RefCell::new(receivers.into_iter().map(Some).collect()),
            pump_cancel,
            pump_handle: RefCell::new(Some(handle)),
            disposed: Cell::new(false),
        }
    }

    /// Current branch metrics snapshot.
    #[must_use]
    pub fn branch_metrics(&self) -> BranchMetrics {
        BranchMetrics {
            subscriber_count: self.capacities.len(),
            capacities: self.capacities.clone(),
            views_taken: self.taken.get(),
        }
    }
}

#[async_trait::async_trait(?Send)]
impl<T: Clone + 'static> Pipe<T> for MulticastPipe<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn element_type(&self) -> ElementType {
        ElementType::of::<T>()
    }

    fn enumerate(&self, cancel: CancellationToken) -> Result<PipeStream<'_, T>, Error> {
        if self.disposed.get() {
            return Err(Error::Disposed(self.name.clone()));
        }

        let idx = self.taken.get();
        if idx >= self.capacities.len() {
            return Err(Error::TooManySubscribers(self.name.clone()));
        }
        self.taken.set(idx + 1);

        let receiver = self.receivers.borrow_mut()[idx]
            .take()
            .expect("subscriber slot reserved by `taken` counter must hold a receiver");
        let name = self.name.clone();

        let stream = stream::unfold(
            (receiver, cancel, name, false),
            |(receiver, cancel, name, done)| async move {
                if done {
                    return None;
                }
                if cancel.is_cancelled() {
                    return Some((Err(Error::Cancelled(name.clone())), (receiver, cancel, name, true)));
                }
                match receiver.recv().await {
                    Ok(item) => {
                        let is_err = item.is_err();
                        Some((item, (receiver, cancel, name, is_err)))
                    }
                    Err(_closed) => None,
                }
            },
        );
        Ok(Box::pin(stream))
    }

    async fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.pump_cancel.cancel();
        if let Some(handle) = self.pump_handle.borrow_mut().take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryPipe;

    async fn drain<T: Clone + 'static>(pipe: &MulticastPipe<T>) -> Vec<T> {
        let mut stream = pipe.enumerate(CancellationToken::new()).unwrap();
        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn every_subscriber_sees_the_full_sequence() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let pipe = MulticastPipe::new(
                    "mc",
                    InMemoryPipe::new("src", vec![1, 2, 3]),
                    vec![Some(8), Some(8)],
                );

                assert_eq!(drain(&pipe).await, vec![1, 2, 3]);
                assert_eq!(drain(&pipe).await, vec![1, 2, 3]);

                assert!(matches!(
                    pipe.enumerate(CancellationToken::new()),
                    Err(Error::TooManySubscribers(_))
                ));

                pipe.dispose().await;
            })
            .await;
    }

    #[tokio::test]
    async fn branch_metrics_report_declared_capacities_and_views_taken() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let pipe = MulticastPipe::new(
                    "mc",
                    InMemoryPipe::new("src", vec![1]),
                    vec![Some(4), None],
                );
                let metrics = pipe.branch_metrics();
                assert_eq!(metrics.subscriber_count, 2);
                assert_eq!(metrics.views_taken, 0);

                let _ = pipe.enumerate(CancellationToken::new()).unwrap();
                assert_eq!(pipe.branch_metrics().views_taken, 1);

                pipe.dispose().await;
            })
            .await;
    }
}
