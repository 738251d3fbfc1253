//! The `CappedReplayable` pipe variant (spec §4.1): materialises items into
//! a bounded buffer on the first enumeration; later enumerations replay
//! from that buffer. Exceeding the cap fails with `MaterializationOverflow`
//! (spec §8 scenario 6).

use crate::element_type::ElementType;
use crate::error::Error;
use crate::pipe::{Pipe, PipeStream};
use futures::stream::{self, StreamExt};
use std::cell::{Cell, RefCell};
use tokio_util::sync::CancellationToken;

/// Wraps `inner`, materialising at most `cap` items into a replay buffer.
/// A negative `cap` means "any materialisation is overflow" (spec §4.1).
pub struct CappedReplayablePipe<T, P: Pipe<T>> {
    name: String,
    inner: P,
    cap: i64,
    buffer: RefCell<Option<Vec<T>>>,
    overflowed: Cell<bool>,
    disposed: Cell<bool>,
}

impl<T, P: Pipe<T>> CappedReplayablePipe<T, P> {
    /// Wraps `inner` as a capped-replayable pipe named `name`.
    pub fn new(name: impl Into<String>, inner: P, cap: i64) -> Self {
        Self {
            name: name.into(),
            inner,
            cap,
            buffer: RefCell::new(None),
            overflowed: Cell::new(false),
            disposed: Cell::new(false),
        }
    }

    /// Number of items currently cached in the replay buffer, if
    /// materialisation has completed successfully.
    #[must_use]
    pub fn materialized_count(&self) -> Option<usize> {
        self.buffer.borrow().as_ref().map(Vec::len)
    }
}

#[async_trait::async_trait(?Send)]
impl<T: Clone + 'static, P: Pipe<T>> Pipe<T> for CappedReplayablePipe<T, P> {
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
        if self.overflowed.get() {
            return Err(Error::MaterializationOverflow(self.name.clone(), self.cap));
        }

        if let Some(items) = self.buffer.borrow().clone() {
            let cancel_for_stream = cancel;
            let name = self.name.clone();
            let replay = stream::iter(items.into_iter().map(Ok)).then(move |item| {
                let cancel = cancel_for_stream.clone();
                let name = name.clone();
                async move {
                    if cancel.is_cancelled() {
                        Err(Error::Cancelled(name))
                    } else {
                        item
                    }
                }
            });
            return Ok(Box::pin(replay));
        }

        let inner_stream = self.inner.enumerate(cancel)?;
        let name = self.name.clone();
        let cap = self.cap;
        let buffer = &self.buffer;
        let overflowed = &self.overflowed;

        let stream = stream::unfold(
            (inner_stream, Vec::<T>::new(), false),
            move |(mut inner, mut accumulated, done)| {
                let name = name.clone();
                async move {
                    if done {
                        return None;
                    }
                    match inner.next().await {
                        Some(Ok(item)) => {
                            accumulated.push(item.clone());
                            if accumulated.len() as i64 > cap {
                                overflowed.set(true);
                                return Some((
                                    Err(Error::MaterializationOverflow(name, cap)),
                                    (inner, accumulated, true),
                                ));
                            }
                            Some((Ok(item), (inner, accumulated, false)))
                        }
                        Some(Err(e)) => Some((Err(e), (inner, accumulated, true))),
                        None => {
                            *buffer.borrow_mut() = Some(accumulated);
                            None
                        }
                    }
                }
            },
        );
        Ok(Box::pin(stream))
    }

    async fn dispose(&self) {
        self.disposed.set(true);
        self.inner.dispose().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryPipe;

    #[tokio::test]
    async fn second_enumeration_replays_identically_when_within_cap() {
        let pipe = CappedReplayablePipe::new("cap", InMemoryPipe::new("src", vec![1, 2, 3]), 5);

        let collect = |p: &CappedReplayablePipe<i32, InMemoryPipe<i32>>| async {
            let mut s = p.enumerate(CancellationToken::new()).unwrap();
            let mut out = Vec::new();
            while let Some(item) = s.next().await {
                out.push(item.unwrap());
            }
            out
        };

        assert_eq!(collect(&pipe).await, vec![1, 2, 3]);
        assert_eq!(collect(&pipe).await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn exceeding_the_cap_overflows_and_stays_overflowed() {
        let pipe = CappedReplayablePipe::new("cap", InMemoryPipe::new("src", vec![1, 2, 3, 4, 5]), 2);

        let mut stream = pipe.enumerate(CancellationToken::new()).unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), 1);
        assert_eq!(stream.next().await.unwrap().unwrap(), 2);
        assert!(matches!(
            stream.next().await.unwrap(),
            Err(Error::MaterializationOverflow(_, 2))
        ));
        drop(stream);

        assert!(matches!(
            pipe.enumerate(CancellationToken::new()),
            Err(Error::MaterializationOverflow(_, 2))
        ));
    }

    #[tokio::test]
    async fn negative_cap_overflows_on_the_first_item() {
        let pipe = CappedReplayablePipe::new("cap", InMemoryPipe::new("src", vec![1]), -1);
        let mut stream = pipe.enumerate(CancellationToken::new()).unwrap();
        assert!(matches!(
            stream.next().await.unwrap(),
            Err(Error::MaterializationOverflow(_, -1))
        ));
    }

    #[tokio::test]
    async fn negative_cap_on_empty_source_does_not_overflow() {
        let pipe = CappedReplayablePipe::new("cap", InMemoryPipe::new("src", Vec::<i32>::new()), -1);
        let mut stream = pipe.enumerate(CancellationToken::new()).unwrap();
        assert!(stream.next().await.is_none());
    }
}
