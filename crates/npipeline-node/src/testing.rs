//! Reusable node doubles for tests and demos (spec.md's `SPEC_FULL.md` §4
//! "Test tooling"), mirroring the teacher's `engine::testing` module of
//! reusable receiver/processor/exporter doubles.

use crate::error::NodeError;
use crate::sink::Sink;
use crate::source::Source;
use crate::transform::Transform;
use npipeline_context::PipelineContext;
use npipeline_pipe::{InMemoryPipe, Pipe};
use std::cell::RefCell;
use std::rc::Rc;
use tokio_util::sync::CancellationToken;

/// A [`Source`] that replays a fixed, pre-built vector of items (spec §8
/// scenario 1: `Source [1,2,3]`).
pub struct VecSource<T> {
    name: String,
    items: Vec<T>,
}

impl<T> VecSource<T> {
    /// Wraps `items` as a source named `name`.
    pub fn new(name: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl<T: Clone + 'static> Source<T> for VecSource<T> {
    async fn initialize(
        &self,
        _context: &PipelineContext,
        _cancel: CancellationToken,
    ) -> Result<Box<dyn Pipe<T>>, NodeError> {
        Ok(Box::new(InMemoryPipe::new(self.name.clone(), self.items.clone())))
    }
}

/// A [`Transform`] that applies a plain function to every item, mirroring
/// `x -> x * x` from spec §8 scenario 1. Stateless, as transforms are by
/// default (spec §4.2).
pub struct MapTransform<F> {
    map: F,
}

impl<F> MapTransform<F> {
    /// Wraps `map` as a transform.
    pub fn new(map: F) -> Self {
        Self { map }
    }
}

#[async_trait::async_trait(?Send)]
impl<TIn, TOut, F> Transform<TIn, TOut> for MapTransform<F>
where
    F: Fn(TIn) -> Option<TOut>,
{
    async fn execute(
        &self,
        item: TIn,
        _context: &PipelineContext,
        _cancel: CancellationToken,
    ) -> Result<Option<TOut>, NodeError> {
        Ok((self.map)(item))
    }
}

/// A [`Sink`] that drains its input pipe into a shared, inspectable
/// buffer. `Rc`-backed since pipes and nodes run single-threaded (spec
/// §5); use [`VecSink::received`] after a run to assert on delivery order.
pub struct VecSink<T> {
    received: Rc<RefCell<Vec<T>>>,
}

impl<T> Default for VecSink<T> {
    fn default() -> Self {
        Self {
            received: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<T: Clone> VecSink<T> {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle to this sink's buffer, clonable and readable independently
    /// of the sink itself (the runner takes ownership of the node).
    #[must_use]
    pub fn handle(&self) -> VecSinkHandle<T> {
        VecSinkHandle {
            received: self.received.clone(),
        }
    }

    /// Snapshot of every item received so far, in delivery order.
    #[must_use]
    pub fn received(&self) -> Vec<T> {
        self.received.borrow().clone()
    }
}

/// A cloneable read handle onto a [`VecSink`]'s buffer.
#[derive(Clone)]
pub struct VecSinkHandle<T> {
    received: Rc<RefCell<Vec<T>>>,
}

impl<T: Clone> VecSinkHandle<T> {
    /// Snapshot of every item received so far, in delivery order.
    #[must_use]
    pub fn received(&self) -> Vec<T> {
        self.received.borrow().clone()
    }
}

#[async_trait::async_trait(?Send)]
impl<T: 'static> Sink<T> for VecSink<T> {
    async fn execute(
        &self,
        input: &dyn Pipe<T>,
        _context: &PipelineContext,
        cancel: CancellationToken,
    ) -> Result<(), NodeError> {
        use futures::StreamExt;

        let mut stream = input
            .enumerate(cancel)
            .map_err(|e| crate::error::Message::boxed(e.to_string()))?;
        while let Some(item) = stream.next().await {
            let item = item.map_err(|e| crate::error::Message::boxed(e.to_string()))?;
            self.received.borrow_mut().push(item);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use npipeline_context::PipelineContext;

    #[tokio::test]
    async fn vec_source_replays_its_items_through_a_sink() {
        let ctx = PipelineContext::new();
        let source = VecSource::new("src", vec![1, 2, 3]);
        let pipe = source
            .initialize(&ctx, ctx.cancellation_token())
            .await
            .unwrap();

        let sink = VecSink::new();
        sink.execute(pipe.as_ref(), &ctx, ctx.cancellation_token())
            .await
            .unwrap();

        assert_eq!(sink.received(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn map_transform_applies_the_function_and_can_drop_items() {
        let ctx = PipelineContext::new();
        let transform = MapTransform::new(|x: i32| if x % 2 == 0 { None } else { Some(x * x) });

        let kept = transform
            .execute(3, &ctx, ctx.cancellation_token())
            .await
            .unwrap();
        assert_eq!(kept, Some(9));

        let dropped = transform
            .execute(4, &ctx, ctx.cancellation_token())
            .await
            .unwrap();
        assert_eq!(dropped, None);
    }
}
