//! A set of independent bounded queues fed by a single producer, the
//! primitive underneath the `Multicast` pipe variant (spec §4.1). Each
//! subscriber has its own queue and its own cancellation; a slow subscriber
//! only blocks the producer once *its own* queue fills, but since the
//! producer is single-threaded it still throttles every other branch behind
//! it — this is the "a slow subscriber throttles the whole branch" behaviour
//! spec §5 describes.

use crate::bounded::{self, Receiver, Sender};
use crate::error::SendError;

/// The producing side of a fan-out: one handle that broadcasts every item to
/// every live subscriber queue.
pub struct FanOutSender<T: Clone> {
    senders: Vec<Sender<T>>,
}

impl<T: Clone> FanOutSender<T> {
    /// Broadcasts `value` to every subscriber, awaiting backpressure on each
    /// in turn. Subscribers that have closed (dropped or cancelled) are
    /// silently skipped rather than failing the broadcast — spec §4.1:
    /// "Cancellation of any subscriber does not cancel the others".
    pub async fn broadcast(&self, value: T) {
        let Some((last, rest)) = self.senders.split_last() else {
            return;
        };
        for sender in rest {
            // Closed subscribers are expected and not an error for the pump.
            let _ = sender.send(value.clone()).await;
        }
        let _ = last.send(value).await;
    }

    /// Number of subscriber queues still open.
    #[must_use]
    pub fn live_subscribers(&self) -> usize {
        self.senders.iter().filter(|s| s.sender_count() > 0).count()
    }
}

/// Builds a fan-out with one queue per entry in `capacities`. `None` means
/// an effectively unbounded queue for that subscriber.
#[must_use]
pub fn fanout<T: Clone>(capacities: &[Option<usize>]) -> (FanOutSender<T>, Vec<Receiver<T>>) {
    let mut senders = Vec::with_capacity(capacities.len());
    let mut receivers = Vec::with_capacity(capacities.len());

    for capacity in capacities {
        let (tx, rx) = bounded::channel(capacity.unwrap_or(usize::MAX));
        senders.push(tx);
        receivers.push(rx);
    }

    (FanOutSender { senders }, receivers)
}
