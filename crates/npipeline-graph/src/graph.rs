//! The immutable, validated graph produced by [`crate::GraphBuilder::build`]
//! (spec §4.3 "On finalisation the builder: ... and fixes a topological
//! order").

use crate::edge::{roles, Edge};
use crate::entry::NodeEntry;
use crate::error::Error;
use crate::node_id::NodeId;
use npipeline_node::NodeKind;
use std::collections::{HashMap, HashSet, VecDeque};

/// A validated, acyclic node/edge topology with a fixed topological order.
/// Produced once by [`crate::GraphBuilder::build`] and then handed to the
/// runner; nothing about it can change afterwards (spec §3 invariant 1).
pub struct Graph {
    nodes: HashMap<NodeId, NodeEntry>,
    edges: Vec<Edge>,
    topo_order: Vec<NodeId>,
}

impl Graph {
    pub(crate) fn finalize(
        nodes: HashMap<NodeId, NodeEntry>,
        edges: Vec<Edge>,
    ) -> Result<Self, Error> {
        for edge in &edges {
            if !nodes.contains_key(&edge.from) {
                return Err(Error::UnknownNode(edge.from.clone()));
            }
            if !nodes.contains_key(&edge.to) {
                return Err(Error::UnknownNode(edge.to.clone()));
            }
        }

        check_edge_types(&nodes, &edges)?;
        check_edge_cardinality(&nodes, &edges)?;
        let topo_order = topological_order(&nodes, &edges)?;
        check_weakly_connected(&nodes, &edges)?;

        Ok(Self {
            nodes,
            edges,
            topo_order,
        })
    }

    /// Iterates over every registered node, in no particular order. Use
    /// [`Self::topological_order`] for an execution-ready order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeEntry> {
        self.nodes.values()
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&NodeEntry> {
        self.nodes.get(id)
    }

    /// The fixed topological order computed at [`crate::GraphBuilder::build`]
    /// time (spec §4.4 step 1: "Topologically sorts the graph").
    #[must_use]
    pub fn topological_order(&self) -> &[NodeId] {
        &self.topo_order
    }

    /// Every edge whose `to` is `id`, in the order they were declared (the
    /// order the runner feeds to a node's configured
    /// [`npipeline_pipe::MergeStrategy`], spec §4.1).
    pub fn inbound_edges<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.to == id)
    }

    /// Every edge whose `from` is `id`.
    pub fn outbound_edges<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.from == id)
    }

    /// Consumes the graph, handing the runner ownership of every node's
    /// erased payload (only the runner needs to call into node code).
    pub fn into_parts(self) -> (HashMap<NodeId, NodeEntry>, Vec<Edge>, Vec<NodeId>) {
        (self.nodes, self.edges, self.topo_order)
    }
}

fn check_edge_types(nodes: &HashMap<NodeId, NodeEntry>, edges: &[Edge]) -> Result<(), Error> {
    for edge in edges {
        let upstream = &nodes[&edge.from];
        let downstream = &nodes[&edge.to];

        // A dead-letter/late-data edge carries the item that was being
        // folded/transformed when it failed or arrived late — the
        // producing node's *input* type, not its output type (spec §7
        // "route to a declared dead-letter edge"; §4.2 late-data edge).
        let upstream_type = match edge.role.as_deref() {
            Some(role) if role == roles::DEAD_LETTER || role == roles::LATE_DATA => upstream.input_type,
            _ => upstream.output_type,
        };

        if let (Some(out), Some(inp)) = (upstream_type, downstream.input_type) {
            if out != inp {
                return Err(Error::TypeMismatch {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    upstream: out,
                    downstream: inp,
                });
            }
        }
    }
    Ok(())
}

fn check_edge_cardinality(nodes: &HashMap<NodeId, NodeEntry>, edges: &[Edge]) -> Result<(), Error> {
    for (id, entry) in nodes {
        let kind = entry.payload.kind();
        if kind.requires_inbound_edge() && !edges.iter().any(|e| &e.to == id) {
            return Err(Error::MissingInboundEdge(id.clone()));
        }
        if kind.requires_outbound_edge() && !edges.iter().any(|e| &e.from == id) {
            return Err(Error::MissingOutboundEdge(id.clone()));
        }
    }
    Ok(())
}

/// Kahn's algorithm, matching the cycle-detection/topo-sort shape the
/// teacher's pipeline config validator uses for its node DAG.
fn topological_order(
    nodes: &HashMap<NodeId, NodeEntry>,
    edges: &[Edge],
) -> Result<Vec<NodeId>, Error> {
    let mut in_degree: HashMap<NodeId, usize> = nodes.keys().map(|id| (id.clone(), 0)).collect();
    let mut adjacency: HashMap<NodeId, Vec<NodeId>> =
        nodes.keys().map(|id| (id.clone(), Vec::new())).collect();

    for edge in edges {
        adjacency.get_mut(&edge.from).unwrap().push(edge.to.clone());
        *in_degree.get_mut(&edge.to).unwrap() += 1;
    }

    // Deterministic order regardless of HashMap iteration order.
    let mut ready: Vec<NodeId> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| id.clone())
        .collect();
    ready.sort();
    let mut ready: VecDeque<NodeId> = ready.into();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(id) = ready.pop_front() {
        order.push(id.clone());
        let mut newly_ready = Vec::new();
        for next in &adjacency[&id] {
            let degree = in_degree.get_mut(next).unwrap();
            *degree -= 1;
            if *degree == 0 {
                newly_ready.push(next.clone());
            }
        }
        newly_ready.sort();
        for next in newly_ready {
            ready.push_back(next);
        }
    }

    if order.len() != nodes.len() {
        let stuck = nodes
            .keys()
            .find(|id| !order.contains(id))
            .expect("order is a strict subset of nodes when a cycle remains")
            .clone();
        return Err(Error::CycleDetected(stuck));
    }

    Ok(order)
}

/// Checks that the graph has at least one source and one sink, and that
/// every node sits on some undirected path between the union of sources and
/// the union of sinks (spec §3 invariant 1).
fn check_weakly_connected(nodes: &HashMap<NodeId, NodeEntry>, edges: &[Edge]) -> Result<(), Error> {
    let sources: Vec<&NodeId> = nodes
        .iter()
        .filter(|(_, entry)| entry.payload.kind() == NodeKind::Source)
        .map(|(id, _)| id)
        .collect();
    let sinks: Vec<&NodeId> = nodes
        .iter()
        .filter(|(_, entry)| entry.payload.kind() == NodeKind::Sink)
        .map(|(id, _)| id)
        .collect();

    if sources.is_empty() {
        return Err(Error::NotWeaklyConnected(
            "graph has no source node".to_string(),
        ));
    }
    if sinks.is_empty() {
        return Err(Error::NotWeaklyConnected(
            "graph has no sink node".to_string(),
        ));
    }

    let mut undirected: HashMap<&NodeId, Vec<&NodeId>> = nodes.keys().map(|id| (id, Vec::new())).collect();
    for edge in edges {
        undirected.get_mut(&edge.from).unwrap().push(&edge.to);
        undirected.get_mut(&edge.to).unwrap().push(&edge.from);
    }

    let mut visited: HashSet<&NodeId> = HashSet::new();
    let mut queue: VecDeque<&NodeId> = VecDeque::new();
    queue.push_back(sources[0]);
    visited.insert(sources[0]);
    while let Some(id) = queue.pop_front() {
        for neighbour in &undirected[id] {
            if visited.insert(neighbour) {
                queue.push_back(neighbour);
            }
        }
    }

    if let Some(unreached) = nodes.keys().find(|id| !visited.contains(id)) {
        return Err(Error::NotWeaklyConnected(format!(
            "node '{unreached}' is not reachable from the source/sink component"
        )));
    }

    Ok(())
}
