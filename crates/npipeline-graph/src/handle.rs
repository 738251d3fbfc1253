//! Typed handles returned by a builder's `add_*` calls (spec §4.3: "Every
//! `Add*` returns a handle carrying phantom types for T_in/T_out so that
//! `Connect(a, b)` is a compile-time or construction-time type check").
//!
//! Each handle is just a [`NodeId`] plus phantom markers for the types
//! [`crate::GraphBuilder::connect`] checks at construction time (the
//! builder re-validates against each node's stored [`npipeline_pipe::ElementType`]
//! regardless, since the registry itself is type-erased — see
//! `erased.rs`).

use crate::node_id::NodeId;
use std::marker::PhantomData;

/// Handle to a registered source node, typed by its output.
#[derive(Debug, Clone)]
pub struct SourceHandle<T> {
    id: NodeId,
    _marker: PhantomData<fn() -> T>,
}

/// Handle to a registered transform node, typed by its input and output.
#[derive(Debug, Clone)]
pub struct TransformHandle<TIn, TOut> {
    id: NodeId,
    _marker: PhantomData<fn(TIn) -> TOut>,
}

/// Handle to a registered aggregate node, typed by its input and output
/// (the key and accumulator types are erased at registration time, spec
/// §9: polymorphism is needed only over the four node kinds).
#[derive(Debug, Clone)]
pub struct AggregateHandle<TIn, TOut> {
    id: NodeId,
    _marker: PhantomData<fn(TIn) -> TOut>,
}

/// Handle to a registered sink node, typed by its input.
#[derive(Debug, Clone)]
pub struct SinkHandle<T> {
    id: NodeId,
    _marker: PhantomData<fn(T)>,
}

/// A view of a transform/aggregate handle's *input* type, used only to wire
/// its dead-letter or late-data edge (spec §7, §4.2): the item carried over
/// those side edges is the item the node was folding/transforming when it
/// failed or arrived late, i.e. the node's `T_in`, not its `T_out`. Obtained
/// via [`TransformHandle::dead_letter_source`] or
/// [`AggregateHandle::dead_letter_source`]/[`AggregateHandle::late_data_source`].
#[derive(Debug, Clone)]
pub struct SideChannelSource<T> {
    id: NodeId,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> HasOutput<T> for SideChannelSource<T> {
    fn node_id(&self) -> &NodeId {
        &self.id
    }
}

macro_rules! impl_handle {
    ($name:ident, $($param:ident),+) => {
        impl<$($param: 'static),+> $name<$($param),+> {
            pub(crate) fn new(id: NodeId) -> Self {
                Self { id, _marker: PhantomData }
            }

            /// This node's registered id.
            #[must_use]
            pub fn id(&self) -> &NodeId {
                &self.id
            }
        }
    };
}

impl_handle!(SourceHandle, T);
impl_handle!(TransformHandle, TIn, TOut);
impl_handle!(AggregateHandle, TIn, TOut);
impl_handle!(SinkHandle, T);

/// Implemented by any handle whose node produces items of type `T`,
/// letting [`crate::GraphBuilder::connect`] type-check an edge's upstream
/// side at construction time.
pub trait HasOutput<T> {
    /// This node's id.
    fn node_id(&self) -> &NodeId;
}

/// Implemented by any handle whose node consumes items of type `T`,
/// letting [`crate::GraphBuilder::connect`] type-check an edge's
/// downstream side at construction time.
pub trait HasInput<T> {
    /// This node's id.
    fn node_id(&self) -> &NodeId;
}

impl<T: 'static> HasOutput<T> for SourceHandle<T> {
    fn node_id(&self) -> &NodeId {
        &self.id
    }
}

impl<TIn: 'static, TOut: 'static> HasOutput<TOut> for TransformHandle<TIn, TOut> {
    fn node_id(&self) -> &NodeId {
        &self.id
    }
}

impl<TIn: 'static, TOut: 'static> HasInput<TIn> for TransformHandle<TIn, TOut> {
    fn node_id(&self) -> &NodeId {
        &self.id
    }
}

impl<TIn: 'static, TOut: 'static> TransformHandle<TIn, TOut> {
    /// A handle to use as the upstream side of this node's dead-letter edge
    /// (spec §7 `ErrorPolicy::DeadLetter`): wired by `TIn`, the type of the
    /// item that failed, not `TOut`.
    #[must_use]
    pub fn dead_letter_source(&self) -> SideChannelSource<TIn> {
        SideChannelSource {
            id: self.id.clone(),
            _marker: PhantomData,
        }
    }
}

impl<TIn: 'static, TOut: 'static> HasOutput<TOut> for AggregateHandle<TIn, TOut> {
    fn node_id(&self) -> &NodeId {
        &self.id
    }
}

impl<TIn: 'static, TOut: 'static> HasInput<TIn> for AggregateHandle<TIn, TOut> {
    fn node_id(&self) -> &NodeId {
        &self.id
    }
}

impl<TIn: 'static, TOut: 'static> AggregateHandle<TIn, TOut> {
    /// A handle to use as the upstream side of this node's dead-letter edge
    /// (spec §7 `ErrorPolicy::DeadLetter`), wired by `TIn`.
    #[must_use]
    pub fn dead_letter_source(&self) -> SideChannelSource<TIn> {
        SideChannelSource {
            id: self.id.clone(),
            _marker: PhantomData,
        }
    }

    /// A handle to use as the upstream side of this node's late-data edge
    /// (spec §4.2 `LateDataPolicy::Route`), wired by `TIn`: a late item is
    /// the same input item that missed its window.
    #[must_use]
    pub fn late_data_source(&self) -> SideChannelSource<TIn> {
        SideChannelSource {
            id: self.id.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> HasInput<T> for SinkHandle<T> {
    fn node_id(&self) -> &NodeId {
        &self.id
    }
}
