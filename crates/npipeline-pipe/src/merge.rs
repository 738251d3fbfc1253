//! Fan-in merge strategies (spec §4.1 "Merge strategies at fan-in"): the
//! declarative annotation a node with k ≥ 2 inbound edges carries, and the
//! pipe each strategy produces when the runner composes the node's inbound
//! pipes into its single input pipe.

use crate::element_type::ElementType;
use crate::error::Error;
use crate::pipe::{Item, Pipe, PipeStream};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// The declarative fan-in policy a downstream node with multiple inbound
/// edges carries (spec §4.1). The runner reads this off the node and
/// builds the node's single input pipe accordingly; the strategy itself
/// does not know about edges, only about an ordered list of upstream
/// pipes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Concurrent draining of all upstreams; items are delivered in the
    /// order they become ready. No inter-stream ordering guarantee;
    /// intra-stream order is preserved. The default.
    #[default]
    Interleave,
    /// Fully drain upstream 1 (in its declared edge order), then upstream
    /// 2, and so on.
    Concatenate,
    /// Pair items positionally; the merged sequence ends when any upstream
    /// ends.
    Zip,
}

/// Builds the single merged pipe a node with multiple inbound edges reads
/// from, per its declared [`MergeStrategy`]. `upstreams` must be given in
/// declared edge order — `Concatenate` and `Zip` are order-sensitive.
pub fn merge<T>(
    name: impl Into<String>,
    strategy: MergeStrategy,
    upstreams: Vec<Box<dyn Pipe<T>>>,
) -> MergedPipe<T> {
    MergedPipe {
        name: name.into(),
        strategy,
        upstreams,
    }
}

/// The pipe produced by [`merge`]. Implements [`Pipe`] so it composes
/// transparently with the rest of the pipe variants (e.g. it can itself be
/// wrapped in a `Multicast` when the merged node also fans out).
pub struct MergedPipe<T> {
    name: String,
    strategy: MergeStrategy,
    upstreams: Vec<Box<dyn Pipe<T>>>,
}

#[async_trait::async_trait(?Send)]
impl<T: 'static> Pipe<T> for MergedPipe<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn element_type(&self) -> ElementType {
        ElementType::of::<T>()
    }

    fn enumerate(&self, cancel: CancellationToken) -> Result<PipeStream<'_, T>, Error> {
        match self.strategy {
            MergeStrategy::Interleave => interleave(&self.upstreams, cancel),
            MergeStrategy::Concatenate => concatenate(&self.upstreams, cancel),
            MergeStrategy::Zip => zip(&self.upstreams, cancel),
        }
    }

    async fn dispose(&self) {
        for upstream in &self.upstreams {
            upstream.dispose().await;
        }
    }
}

fn concatenate<T: 'static>(
    upstreams: &[Box<dyn Pipe<T>>],
    cancel: CancellationToken,
) -> Result<PipeStream<'_, T>, Error> {
    let mut streams = Vec::with_capacity(upstreams.len());
    for upstream in upstreams {
        streams.push(upstream.enumerate(cancel.clone())?);
    }
    Ok(Box::pin(stream::iter(streams).flatten()))
}

fn zip<T: 'static>(
    upstreams: &[Box<dyn Pipe<T>>],
    cancel: CancellationToken,
) -> Result<PipeStream<'_, T>, Error> {
    if upstreams.is_empty() {
        return Ok(Box::pin(stream::empty()));
    }

    let mut streams: Vec<PipeStream<'_, T>> = Vec::with_capacity(upstreams.len());
    for upstream in upstreams {
        streams.push(upstream.enumerate(cancel.clone())?);
    }

    // Same element type flows through every edge (spec §3 invariant 2), so
    // there is no tuple to pair into; "pair positionally" is realised as
    // emitting position i's item from every upstream, in declared edge
    // order, before moving to position i+1 — ending the instant any
    // upstream is exhausted.
    let zipped = stream::unfold((streams, Vec::<Item<T>>::new()), |(mut streams, mut row)| async move {
        loop {
            if let Some(item) = row.pop() {
                return Some((item, (streams, row)));
            }
            let mut next_row = Vec::with_capacity(streams.len());
            for s in &mut streams {
                match s.next().await {
                    Some(item) => next_row.push(item),
                    None => return None,
                }
            }
            next_row.reverse();
            row = next_row;
        }
    });

    Ok(Box::pin(zipped))
}

fn interleave<T: 'static>(
    upstreams: &[Box<dyn Pipe<T>>],
    cancel: CancellationToken,
) -> Result<PipeStream<'_, T>, Error> {
    let mut streams = Vec::with_capacity(upstreams.len());
    for upstream in upstreams {
        streams.push(upstream.enumerate(cancel.clone())?);
    }
    // `select_all` polls every upstream concurrently and yields whichever
    // produces an item first, dropping a stream once it is exhausted —
    // exactly spec §4.1's "concurrent draining ... delivered in the order
    // they become ready", with intra-stream order preserved because each
    // constituent stream is polled in sequence, not reordered.
    Ok(Box::pin(stream::select_all(streams)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryPipe;

    async fn collect<T: 'static>(pipe: &MergedPipe<T>) -> Vec<T> {
        let mut stream = pipe.enumerate(CancellationToken::new()).unwrap();
        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn concatenate_preserves_declared_edge_order() {
        let pipe = merge(
            "merged",
            MergeStrategy::Concatenate,
            vec![
                Box::new(InMemoryPipe::new("a", vec!["A1", "A2"])),
                Box::new(InMemoryPipe::new("b", vec!["B1", "B2"])),
            ],
        );
        assert_eq!(collect(&pipe).await, vec!["A1", "A2", "B1", "B2"]);
    }

    #[tokio::test]
    async fn interleave_preserves_intra_stream_order() {
        let pipe = merge(
            "merged",
            MergeStrategy::Interleave,
            vec![
                Box::new(InMemoryPipe::new("a", vec![1, 2])),
                Box::new(InMemoryPipe::new("b", vec![3, 4])),
            ],
        );
        let items = collect(&pipe).await;

        let mut multiset = items.clone();
        multiset.sort_unstable();
        assert_eq!(multiset, vec![1, 2, 3, 4]);

        let pos_1 = items.iter().position(|&x| x == 1).unwrap();
        let pos_2 = items.iter().position(|&x| x == 2).unwrap();
        assert!(pos_1 < pos_2);

        let pos_3 = items.iter().position(|&x| x == 3).unwrap();
        let pos_4 = items.iter().position(|&x| x == 4).unwrap();
        assert!(pos_3 < pos_4);
    }

    #[tokio::test]
    async fn zip_ends_when_shortest_upstream_ends() {
        let pipe = merge(
            "merged",
            MergeStrategy::Zip,
            vec![
                Box::new(InMemoryPipe::new("a", vec![1, 2, 3])),
                Box::new(InMemoryPipe::new("b", vec![10, 20])),
            ],
        );
        // Position 0 and 1 each yield both upstreams' items; position 2
        // is never emitted because `b` has no third item.
        assert_eq!(collect(&pipe).await, vec![1, 10, 2, 20]);
    }

    #[tokio::test]
    async fn dispose_propagates_to_every_upstream() {
        let pipe = merge(
            "merged",
            MergeStrategy::Interleave,
            vec![
                Box::new(InMemoryPipe::new("a", vec![1])),
                Box::new(InMemoryPipe::new("b", vec![2])),
            ],
        );
        pipe.dispose().await;
    }
}
