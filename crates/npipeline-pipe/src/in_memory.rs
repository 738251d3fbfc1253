//! The `InMemory` pipe variant (spec §4.1): backed by a finite ordered
//! collection, restartable, each enumeration starts at index 0.

use crate::element_type::ElementType;
use crate::error::Error;
use crate::pipe::{Pipe, PipeStream};
use futures::stream;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// A pipe over a pre-materialised, in-memory collection. Every enumeration
/// replays the same items from the start; disposal only marks the pipe as
/// unusable for new enumerations, it does not affect in-flight ones beyond
/// the cancellation they themselves observe.
pub struct InMemoryPipe<T> {
    name: String,
    items: Vec<T>,
    disposed: AtomicBool,
}

impl<T> InMemoryPipe<T> {
    /// Wraps `items` as a restartable, in-memory pipe named `name`.
    pub fn new(name: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            name: name.into(),
            items,
            disposed: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait(?Send)]
impl<T: Clone + 'static> Pipe<T> for InMemoryPipe<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn element_type(&self) -> ElementType {
        ElementType::of::<T>()
    }

    fn enumerate(&self, cancel: CancellationToken) -> Result<PipeStream<'_, T>, Error> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(Error::Disposed(self.name.clone()));
        }

        let name = self.name.clone();
        let items = self.items.clone();
        let stream = stream::unfold((0usize, items, cancel), move |(idx, items, cancel)| {
            let name = name.clone();
            async move {
                if cancel.is_cancelled() {
                    return Some((Err(Error::Cancelled(name)), (idx, items, cancel)));
                }
                let item = items.get(idx)?.clone();
                Some((Ok(item), (idx + 1, items, cancel)))
            }
        });
        Ok(Box::pin(stream))
    }

    async fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn replays_the_same_sequence_every_enumeration() {
        let pipe = InMemoryPipe::new("numbers", vec![1, 2, 3]);

        for _ in 0..2 {
            let mut stream = pipe.enumerate(CancellationToken::new()).unwrap();
            let mut collected = Vec::new();
            while let Some(item) = stream.next().await {
                collected.push(item.unwrap());
            }
            assert_eq!(collected, vec![1, 2, 3]);
        }
    }

    #[tokio::test]
    async fn disposal_rejects_new_enumerations() {
        let pipe = InMemoryPipe::new("numbers", vec![1]);
        pipe.dispose().await;
        assert!(matches!(
            pipe.enumerate(CancellationToken::new()),
            Err(Error::Disposed(_))
        ));
    }

    #[tokio::test]
    async fn cancellation_stops_delivery() {
        let pipe = InMemoryPipe::new("numbers", vec![1, 2, 3]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut stream = pipe.enumerate(cancel).unwrap();
        let first = stream.next().await.unwrap();
        assert!(matches!(first, Err(Error::Cancelled(_))));
    }
}
