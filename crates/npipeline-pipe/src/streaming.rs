//! The `Streaming` pipe variant (spec §4.1): wraps a user-supplied producer
//! function, single-shot by contract unless the caller declares it
//! restartable (spec.md Open Questions, resolved in `SPEC_FULL.md` §5).

use crate::element_type::ElementType;
use crate::error::Error;
use crate::pipe::{Item, Pipe, PipeStream};
use futures::{stream, Stream, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// A factory invoked once per permitted enumeration, producing a fresh
/// boxed stream of items each time.
pub type Producer<T> = Box<dyn Fn() -> Pin<Box<dyn Stream<Item = Item<T>>>>>;

enum State<T> {
    Running(Pin<Box<dyn Stream<Item = Item<T>>>>),
    Done,
}

/// Wraps a user-supplied producer as a pipe. Disposal cancels the
/// underlying iterator; re-enumerating a non-restartable streaming pipe
/// that has already been enumerated once fails with `Error::Disposed`,
/// per the resolution in `SPEC_FULL.md` §5 ("Streaming pipe
/// restartability").
pub struct StreamingPipe<T> {
    name: String,
    restartable: bool,
    enumerated: AtomicBool,
    disposed: AtomicBool,
    producer: Producer<T>,
}

impl<T> StreamingPipe<T> {
    /// Wraps `producer` as a pipe named `name`. `restartable` controls
    /// whether a second `enumerate` call is permitted.
    pub fn new(name: impl Into<String>, restartable: bool, producer: Producer<T>) -> Self {
        Self {
            name: name.into(),
            restartable,
            enumerated: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            producer,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl<T: 'static> Pipe<T> for StreamingPipe<T> {
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
        let already_enumerated = self.enumerated.swap(true, Ordering::AcqRel);
        if already_enumerated && !self.restartable {
            return Err(Error::Disposed(self.name.clone()));
        }

        let inner = (self.producer)();
        let name = self.name.clone();
        let disposed = &self.disposed;

        let stream = stream::unfold(
            (State::Running(inner), cancel, name, disposed),
            |(state, cancel, name, disposed)| async move {
                match state {
                    State::Done => None,
                    State::Running(mut inner) => {
                        if cancel.is_cancelled() || disposed.load(Ordering::Acquire) {
                            return Some((
                                Err(Error::Cancelled(name.clone())),
                                (State::Done, cancel, name, disposed),
                            ));
                        }
                        match inner.next().await {
                            Some(item) => {
                                Some((item, (State::Running(inner), cancel, name, disposed)))
                            }
                            None => None,
                        }
                    }
                }
            },
        );
        Ok(Box::pin(stream))
    }

    async fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt as _;

    fn producer_of(items: Vec<i32>) -> Producer<i32> {
        Box::new(move || {
            let items = items.clone();
            Box::pin(stream::iter(items.into_iter().map(Ok)))
        })
    }

    #[tokio::test]
    async fn single_shot_by_default() {
        let pipe = StreamingPipe::new("stream", false, producer_of(vec![1, 2, 3]));

        let mut first = pipe.enumerate(CancellationToken::new()).unwrap();
        let mut collected = Vec::new();
        while let Some(item) = first.next().await {
            collected.push(item.unwrap());
        }
        assert_eq!(collected, vec![1, 2, 3]);
        drop(first);

        assert!(matches!(
            pipe.enumerate(CancellationToken::new()),
            Err(Error::Disposed(_))
        ));
    }

    #[tokio::test]
    async fn restartable_allows_a_second_enumeration() {
        let pipe = StreamingPipe::new("stream", true, producer_of(vec![1, 2]));

        {
            let mut s = pipe.enumerate(CancellationToken::new()).unwrap();
            while s.next().await.is_some() {}
        }

        let mut second = pipe.enumerate(CancellationToken::new()).unwrap();
        assert_eq!(second.next().await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn dispose_cancels_in_flight_enumeration() {
        let pipe = StreamingPipe::new("stream", true, producer_of(vec![1, 2, 3]));
        let mut stream = pipe.enumerate(CancellationToken::new()).unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), 1);

        pipe.dispose().await;
        let next = stream.next().await.unwrap();
        assert!(matches!(next, Err(Error::Cancelled(_))));
        assert!(stream.next().await.is_none());
    }
}
