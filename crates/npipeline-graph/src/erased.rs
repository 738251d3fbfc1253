//! Type erasure for the node registry (spec §4.3: a single builder stores
//! nodes of arbitrary `T_in`/`T_out` behind one registry). Each node kind
//! gets an object-safe "erased" trait operating over [`AnyItem`]; a
//! generic adapter struct implements it for any concrete
//! `Source`/`Transform`/`Aggregate`/`Sink`, downcasting back to the
//! concrete type at the point it calls into user code.
//!
//! This plays the role the teacher's `ReceiverWrapper`/`ProcessorWrapper`/
//! `ExporterWrapper` play around a single fixed `PData` envelope (spec
//! §9: "replace the reference-type class hierarchy with tagged variants
//! of node kind plus a small interface per kind"); here the envelope is
//! `Box<dyn Any>` rather than a fixed `PData`, since spec.md makes the
//! element type a pipeline-builder choice, not a framework constant.

use npipeline_context::PipelineContext;
use npipeline_node::{Aggregate, LateDataPolicy, NodeError, Sink, Source, Transform, WatermarkTracker, WindowSpec};
use npipeline_pipe::{ElementType, Error as PipeError, Item, Pipe, PipeStream};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use tokio_util::sync::CancellationToken;

/// Object-safe counterpart of `Any + Clone`. A node's declared element type
/// must be `Clone` so that a multicast fan-out can hand each subscriber its
/// own copy of an item (spec §4.1: `Multicast` wraps an arbitrary `T`, and
/// `npipeline_pipe::MulticastPipe<T>` itself requires `T: Clone`); since the
/// registry only ever stores the type-erased envelope, the erasure itself
/// must carry that bound.
pub trait AnyClone: Any {
    /// Clones the boxed value behind a fresh [`AnyItem`].
    fn clone_any(&self) -> AnyItem;
    /// Recovers the plain `dyn Any` trait object for downcasting.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any + Clone> AnyClone for T {
    fn clone_any(&self) -> AnyItem {
        Box::new(self.clone())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// The runtime envelope every erased pipe carries: one item of whatever
/// concrete, `Clone` type the node author declared.
pub type AnyItem = Box<dyn AnyClone>;

impl Clone for AnyItem {
    fn clone(&self) -> Self {
        self.clone_any()
    }
}

/// Downcasts an [`AnyItem`] back to `T`, an internal invariant violation if
/// it fails (the graph builder only ever pairs edges whose declared
/// [`ElementType`]s already matched).
fn downcast<T: 'static>(item: AnyItem) -> T {
    *item
        .into_any()
        .downcast::<T>()
        .unwrap_or_else(|_| panic!("type-erased item did not match the edge's validated element type"))
}

/// Adapts a concrete `Box<dyn Pipe<T>>` into a `Box<dyn Pipe<AnyItem>>` by
/// boxing every delivered item.
pub struct BoxingPipe<T> {
    inner: Box<dyn Pipe<T>>,
}

impl<T: Clone + 'static> BoxingPipe<T> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Box<dyn Pipe<T>>) -> Self {
        Self { inner }
    }
}

#[async_trait::async_trait(?Send)]
impl<T: Clone + 'static> Pipe<AnyItem> for BoxingPipe<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn element_type(&self) -> ElementType {
        self.inner.element_type()
    }

    fn enumerate(&self, cancel: CancellationToken) -> Result<PipeStream<'_, AnyItem>, PipeError> {
        use futures::StreamExt;
        let stream = self.inner.enumerate(cancel)?;
        Ok(Box::pin(
            stream.map(|item: Item<T>| item.map(|v| Box::new(v) as AnyItem)),
        ))
    }

    async fn dispose(&self) {
        self.inner.dispose().await;
    }
}

/// Adapts a `Box<dyn Pipe<AnyItem>>` back into a `Pipe<T>` by downcasting
/// every delivered item, the inverse of [`BoxingPipe`]. Used to hand a
/// sink or transform its input pipe in its own declared type.
pub struct UnboxingPipe<T> {
    inner: Box<dyn Pipe<AnyItem>>,
    element_type: ElementType,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Clone + 'static> UnboxingPipe<T> {
    /// Wraps `inner`, which must carry items boxed from `T` (the graph
    /// builder's edge-type check is what guarantees this).
    #[must_use]
    pub fn new(inner: Box<dyn Pipe<AnyItem>>) -> Self {
        let element_type = ElementType::of::<T>();
        Self {
            inner,
            element_type,
            _marker: std::marker::PhantomData,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl<T: Clone + 'static> Pipe<T> for UnboxingPipe<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn element_type(&self) -> ElementType {
        self.element_type
    }

    fn enumerate(&self, cancel: CancellationToken) -> Result<PipeStream<'_, T>, PipeError> {
        use futures::StreamExt;
        let stream = self.inner.enumerate(cancel)?;
        Ok(Box::pin(stream.map(|item: Item<AnyItem>| item.map(downcast::<T>))))
    }

    async fn dispose(&self) {
        self.inner.dispose().await;
    }
}

/// Object-safe, type-erased counterpart of [`Source`].
#[async_trait::async_trait(?Send)]
pub trait ErasedSource {
    /// See [`Source::initialize`].
    async fn initialize(
        &self,
        context: &PipelineContext,
        cancel: CancellationToken,
    ) -> Result<Box<dyn Pipe<AnyItem>>, NodeError>;

    /// See [`Source::configure`].
    fn configure(&self, config: serde_json::Value);
}

struct SourceAdapter<S, T> {
    inner: S,
    _marker: std::marker::PhantomData<T>,
}

#[async_trait::async_trait(?Send)]
impl<S, T> ErasedSource for SourceAdapter<S, T>
where
    S: Source<T>,
    T: Clone + 'static,
{
    async fn initialize(
        &self,
        context: &PipelineContext,
        cancel: CancellationToken,
    ) -> Result<Box<dyn Pipe<AnyItem>>, NodeError> {
        let pipe = self.inner.initialize(context, cancel).await?;
        Ok(Box::new(BoxingPipe::new(pipe)))
    }

    fn configure(&self, config: serde_json::Value) {
        self.inner.configure(config);
    }
}

/// Erases `source` into an [`ErasedSource`] trait object.
pub fn erase_source<S, T>(source: S) -> Box<dyn ErasedSource>
where
    S: Source<T> + 'static,
    T: Clone + 'static,
{
    Box::new(SourceAdapter {
        inner: source,
        _marker: std::marker::PhantomData,
    })
}

/// Object-safe, type-erased counterpart of [`Transform`].
#[async_trait::async_trait(?Send)]
pub trait ErasedTransform {
    /// See [`Transform::execute`].
    async fn execute(
        &self,
        item: AnyItem,
        context: &PipelineContext,
        cancel: CancellationToken,
    ) -> Result<Option<AnyItem>, NodeError>;

    /// See [`Transform::configure`].
    fn configure(&self, config: serde_json::Value);
}

struct TransformAdapter<X, TIn, TOut> {
    inner: X,
    _marker: std::marker::PhantomData<(TIn, TOut)>,
}

#[async_trait::async_trait(?Send)]
impl<X, TIn, TOut> ErasedTransform for TransformAdapter<X, TIn, TOut>
where
    X: Transform<TIn, TOut>,
    TIn: Clone + 'static,
    TOut: Clone + 'static,
{
    async fn execute(
        &self,
        item: AnyItem,
        context: &PipelineContext,
        cancel: CancellationToken,
    ) -> Result<Option<AnyItem>, NodeError> {
        let item = downcast::<TIn>(item);
        let out = self.inner.execute(item, context, cancel).await?;
        Ok(out.map(|v| Box::new(v) as AnyItem))
    }

    fn configure(&self, config: serde_json::Value) {
        self.inner.configure(config);
    }
}

/// Erases `transform` into an [`ErasedTransform`] trait object.
pub fn erase_transform<X, TIn, TOut>(transform: X) -> Box<dyn ErasedTransform>
where
    X: Transform<TIn, TOut> + 'static,
    TIn: Clone + 'static,
    TOut: Clone + 'static,
{
    Box::new(TransformAdapter {
        inner: transform,
        _marker: std::marker::PhantomData,
    })
}

/// Object-safe, type-erased counterpart of [`Sink`].
#[async_trait::async_trait(?Send)]
pub trait ErasedSink {
    /// See [`Sink::execute`].
    async fn execute(
        &self,
        input: Box<dyn Pipe<AnyItem>>,
        context: &PipelineContext,
        cancel: CancellationToken,
    ) -> Result<(), NodeError>;

    /// See [`Sink::configure`].
    fn configure(&self, config: serde_json::Value);
}

struct SinkAdapter<K, T> {
    inner: K,
    _marker: std::marker::PhantomData<T>,
}

#[async_trait::async_trait(?Send)]
impl<K, T> ErasedSink for SinkAdapter<K, T>
where
    K: Sink<T>,
    T: Clone + 'static,
{
    async fn execute(
        &self,
        input: Box<dyn Pipe<AnyItem>>,
        context: &PipelineContext,
        cancel: CancellationToken,
    ) -> Result<(), NodeError> {
        let input: UnboxingPipe<T> = UnboxingPipe::new(input);
        self.inner.execute(&input, context, cancel).await
    }

    fn configure(&self, config: serde_json::Value) {
        self.inner.configure(config);
    }
}

/// Erases `sink` into an [`ErasedSink`] trait object.
pub fn erase_sink<K, T>(sink: K) -> Box<dyn ErasedSink>
where
    K: Sink<T> + 'static,
    T: Clone + 'static,
{
    Box::new(SinkAdapter {
        inner: sink,
        _marker: std::marker::PhantomData,
    })
}

/// Result of folding one item into an aggregate (spec §4.2): any items
/// produced by windows this item's arrival closed, plus the item itself
/// when it arrived behind the watermark and the aggregate's
/// [`LateDataPolicy`] is `Route` — the caller (the runner's aggregate
/// execution pipe) is responsible for forwarding `late_item` to the
/// node's declared late-data edge, the same way a transform's
/// `DeadLetter` policy forwards a rejected item (spec §7 "Dead-letter
/// edge").
pub struct AggregateStep {
    /// Output items produced by windows this item's arrival closed.
    pub emitted: Vec<AnyItem>,
    /// The item itself, present only when it arrived late and the policy
    /// is `Route`.
    pub late_item: Option<AnyItem>,
}

/// Object-safe, type-erased counterpart of [`Aggregate`]. The key type `K`
/// and accumulator type `T_acc` never cross this boundary: the generic
/// adapter owns a `RefCell<HashMap<K, T_acc>>` internally and only ever
/// hands `AnyItem` to callers, which is what lets the graph's node
/// registry store aggregates with unrelated `K`/`T_acc` side by side.
#[async_trait::async_trait(?Send)]
pub trait ErasedAggregate {
    /// See [`Aggregate::window`].
    fn window(&self) -> WindowSpec;

    /// See [`Aggregate::late_data_policy`].
    fn late_data_policy(&self) -> LateDataPolicy;

    /// Folds one item into this key's accumulator, returning any output
    /// items produced by windows this item's arrival closed (or routing
    /// the item as late data, per [`Self::late_data_policy`]).
    async fn process(
        &self,
        item: AnyItem,
        context: &PipelineContext,
    ) -> Result<AggregateStep, NodeError>;

    /// Finalises every key's still-open window, e.g. at end-of-input.
    fn flush(&self) -> Vec<AnyItem>;

    /// See [`Source::configure`]/[`Transform::configure`].
    fn configure(&self, config: serde_json::Value);
}

struct KeyedWindow<TAcc> {
    window_index: i64,
    /// The event time of the last item folded into this window. Only
    /// consulted for `Session` windows, where it is what decides whether
    /// the next item extends this session or starts a new one.
    last_event_time_millis: i64,
    accumulator: TAcc,
}

struct AggregateAdapter<A, TIn, K, TAcc, TOut> {
    inner: A,
    windows: RefCell<HashMap<K, KeyedWindow<TAcc>>>,
    watermark: RefCell<WatermarkTracker>,
    _marker: std::marker::PhantomData<(TIn, TOut)>,
}

impl<A, TIn, K, TAcc, TOut> AggregateAdapter<A, TIn, K, TAcc, TOut>
where
    A: Aggregate<TIn, K, TAcc, TOut>,
    K: Eq + Hash + Clone,
{
    fn observe(&self, event_time_millis: i64) -> bool {
        self.watermark.borrow_mut().observe(event_time_millis)
    }
}

#[async_trait::async_trait(?Send)]
impl<A, TIn, K, TAcc, TOut> ErasedAggregate for AggregateAdapter<A, TIn, K, TAcc, TOut>
where
    A: Aggregate<TIn, K, TAcc, TOut>,
    TIn: Clone + 'static,
    K: Eq + Hash + Clone + 'static,
    TAcc: Clone + 'static,
    TOut: Clone + 'static,
{
    fn window(&self) -> WindowSpec {
        self.inner.window()
    }

    fn late_data_policy(&self) -> LateDataPolicy {
        self.inner.late_data_policy()
    }

    async fn process(
        &self,
        item: AnyItem,
        context: &PipelineContext,
    ) -> Result<AggregateStep, NodeError> {
        let item = downcast::<TIn>(item);
        let key = self.inner.extract_key(&item);
        let event_time = self.inner.event_time_millis(&item);

        if self.observe(event_time) {
            return Ok(match self.late_data_policy() {
                LateDataPolicy::Drop => AggregateStep {
                    emitted: Vec::new(),
                    late_item: None,
                },
                LateDataPolicy::Route => AggregateStep {
                    emitted: Vec::new(),
                    late_item: Some(Box::new(item) as AnyItem),
                },
            });
        }

        let existing = self.windows.borrow_mut().remove(&key);

        // `Tumbling`/`Sliding` bucket purely on event time; `Session` has
        // no fixed-width bucket and instead extends the key's current
        // window only while this item arrives within the declared gap of
        // the last one, otherwise starting a fresh window (spec §4.2:
        // "Windows are declared ... with watermark-driven closure").
        let window_index = match self.window().size_based_index(event_time) {
            Some(index) => index,
            None => {
                let gap = self.window().session_gap_millis().unwrap_or(0);
                match &existing {
                    Some(prev) if event_time - prev.last_event_time_millis <= gap => prev.window_index,
                    Some(prev) => prev.window_index + 1,
                    None => 0,
                }
            }
        };
        let mut finished = Vec::new();

        let base_acc = match existing {
            Some(existing) if existing.window_index == window_index => existing.accumulator,
            Some(existing) => {
                for out in self.inner.finalize(key.clone(), existing.accumulator) {
                    finished.push(Box::new(out) as AnyItem);
                }
                self.inner.seed(&key)
            }
            None => self.inner.seed(&key),
        };

        // Snapshotted so a failed fold leaves the key's window exactly as it
        // was rather than silently discarding prior items' contributions
        // (the caller's error policy decides whether this item is retried,
        // skipped, or dead-lettered; either way the next item for this key
        // must still see an intact accumulator).
        let snapshot = base_acc.clone();
        match self.inner.fold(base_acc, item, context).await {
            Ok(folded) => {
                self.windows.borrow_mut().insert(
                    key,
                    KeyedWindow {
                        window_index,
                        last_event_time_millis: event_time,
                        accumulator: folded,
                    },
                );
                Ok(AggregateStep {
                    emitted: finished,
                    late_item: None,
                })
            }
            Err(e) => {
                self.windows.borrow_mut().insert(
                    key,
                    KeyedWindow {
                        window_index,
                        last_event_time_millis: event_time,
                        accumulator: snapshot,
                    },
                );
                Err(e)
            }
        }
    }

    fn flush(&self) -> Vec<AnyItem> {
        let mut out = Vec::new();
        for (key, window) in self.windows.borrow_mut().drain() {
            for item in self.inner.finalize(key, window.accumulator) {
                out.push(Box::new(item) as AnyItem);
            }
        }
        out
    }

    fn configure(&self, config: serde_json::Value) {
        self.inner.configure(config);
    }
}

/// Erases `aggregate` into an [`ErasedAggregate`] trait object.
pub fn erase_aggregate<A, TIn, K, TAcc, TOut>(
    aggregate: A,
    allowed_lateness_millis: i64,
) -> Box<dyn ErasedAggregate>
where
    A: Aggregate<TIn, K, TAcc, TOut> + 'static,
    TIn: Clone + 'static,
    K: Eq + Hash + Clone + 'static,
    TAcc: Clone + 'static,
    TOut: Clone + 'static,
{
    Box::new(AggregateAdapter {
        inner: aggregate,
        windows: RefCell::new(HashMap::new()),
        watermark: RefCell::new(WatermarkTracker::new(allowed_lateness_millis)),
        _marker: std::marker::PhantomData,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use npipeline_node::Aggregate;

    /// Sums `value` per `key`, closing a window's running total into a
    /// single `(key, total)` output.
    struct SumByKey {
        window: WindowSpec,
    }

    #[async_trait::async_trait(?Send)]
    impl Aggregate<(String, i64, i64), String, i64, (String, i64)> for SumByKey {
        fn extract_key(&self, item: &(String, i64, i64)) -> String {
            item.0.clone()
        }

        fn event_time_millis(&self, item: &(String, i64, i64)) -> i64 {
            item.1
        }

        fn window(&self) -> WindowSpec {
            self.window
        }

        fn seed(&self, _key: &String) -> i64 {
            0
        }

        async fn fold(
            &self,
            accumulator: i64,
            item: (String, i64, i64),
            _context: &PipelineContext,
        ) -> Result<i64, NodeError> {
            Ok(accumulator + item.2)
        }

        fn finalize(&self, key: String, accumulator: i64) -> Vec<(String, i64)> {
            vec![(key, accumulator)]
        }
    }

    async fn process_one(adapter: &dyn ErasedAggregate, context: &PipelineContext, item: (String, i64, i64)) -> AggregateStep {
        adapter
            .process(Box::new(item) as AnyItem, context)
            .await
            .expect("fold never fails in this fixture")
    }

    fn downcast_out(item: AnyItem) -> (String, i64) {
        downcast::<(String, i64)>(item)
    }

    #[tokio::test]
    async fn tumbling_window_closes_when_event_time_crosses_a_boundary() {
        let adapter = erase_aggregate(
            SumByKey {
                window: WindowSpec::Tumbling { size_millis: 1000 },
            },
            0,
        );
        let context = PipelineContext::new();

        // Same window: no output yet.
        let step = process_one(adapter.as_ref(), &context, ("a".into(), 0, 1)).await;
        assert!(step.emitted.is_empty());
        let step = process_one(adapter.as_ref(), &context, ("a".into(), 500, 2)).await;
        assert!(step.emitted.is_empty());

        // Crossing into the next 1000ms bucket closes window 0.
        let step = process_one(adapter.as_ref(), &context, ("a".into(), 1000, 100)).await;
        assert_eq!(step.emitted.len(), 1);
        assert_eq!(downcast_out(step.emitted.into_iter().next().unwrap()), ("a".to_string(), 3));

        // End-of-stream flush finalises the still-open second window.
        let flushed = adapter.flush();
        assert_eq!(flushed.len(), 1);
        assert_eq!(downcast_out(flushed.into_iter().next().unwrap()), ("a".to_string(), 100));
    }

    #[tokio::test]
    async fn sliding_window_advances_every_slide_period_mid_stream() {
        let adapter = erase_aggregate(
            SumByKey {
                window: WindowSpec::Sliding {
                    size_millis: 1000,
                    slide_millis: 250,
                },
            },
            0,
        );
        let context = PipelineContext::new();

        let step = process_one(adapter.as_ref(), &context, ("a".into(), 0, 1)).await;
        assert!(step.emitted.is_empty());

        // 250ms later lands in the next slide bucket and closes the first.
        let step = process_one(adapter.as_ref(), &context, ("a".into(), 250, 2)).await;
        assert_eq!(step.emitted.len(), 1, "sliding window must close mid-stream, not only at flush");
        assert_eq!(downcast_out(step.emitted.into_iter().next().unwrap()), ("a".to_string(), 1));
    }

    #[tokio::test]
    async fn session_window_closes_on_gap_and_extends_within_it() {
        let adapter = erase_aggregate(
            SumByKey {
                window: WindowSpec::Session { gap_millis: 100 },
            },
            0,
        );
        let context = PipelineContext::new();

        let step = process_one(adapter.as_ref(), &context, ("a".into(), 0, 1)).await;
        assert!(step.emitted.is_empty());

        // Within the gap: same session, still open.
        let step = process_one(adapter.as_ref(), &context, ("a".into(), 90, 2)).await;
        assert!(step.emitted.is_empty());

        // Past the gap: a new session starts, closing the first.
        let step = process_one(adapter.as_ref(), &context, ("a".into(), 300, 4)).await;
        assert_eq!(step.emitted.len(), 1, "session window must close mid-stream once the gap is exceeded");
        assert_eq!(downcast_out(step.emitted.into_iter().next().unwrap()), ("a".to_string(), 3));

        let flushed = adapter.flush();
        assert_eq!(flushed.len(), 1);
        assert_eq!(downcast_out(flushed.into_iter().next().unwrap()), ("a".to_string(), 4));
    }

    #[tokio::test]
    async fn distinct_keys_maintain_independent_windows() {
        let adapter = erase_aggregate(
            SumByKey {
                window: WindowSpec::Tumbling { size_millis: 1000 },
            },
            0,
        );
        let context = PipelineContext::new();

        process_one(adapter.as_ref(), &context, ("a".into(), 0, 1)).await;
        process_one(adapter.as_ref(), &context, ("b".into(), 0, 10)).await;

        let mut flushed: Vec<(String, i64)> = adapter.flush().into_iter().map(downcast_out).collect();
        flushed.sort();
        assert_eq!(flushed, vec![("a".to_string(), 1), ("b".to_string(), 10)]);
    }
}
