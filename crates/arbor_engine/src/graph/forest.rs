//! Generic directed-forest structure
//!
//! [`Graph`] owns its payloads outright: it is the arena the scene hierarchy
//! lives in. Vertices are addressed by opaque [`VertexId`] handles, adjacency
//! is kept as insertion-ordered child lists, and every vertex caches its
//! parent handle so parent lookup and the pre-insertion cycle check are both
//! cheap (`O(1)` and `O(depth)` respectively).
//!
//! The structure is a forest by construction: a vertex gains at most one
//! parent, and an edge that would make a vertex its own descendant is
//! rejected before any state changes. Failed structural operations leave the
//! graph exactly as it was.

use std::collections::{HashMap, VecDeque};

use log::debug;
use thiserror::Error;

use crate::core::object::InstanceId;

use super::vertex::{Vertex, VertexId, VertexNode};

/// Errors raised by structural graph operations
#[derive(Debug, Error)]
pub enum GraphError {
    /// The descriptor names no live vertex
    #[error("no vertex with descriptor {0}")]
    VertexNotFound(VertexId),

    /// Inserting the edge would make a vertex its own descendant
    #[error("edge {parent} -> {child} would create a cycle")]
    WouldCycle {
        /// Prospective parent end of the rejected edge
        parent: VertexId,
        /// Prospective child end of the rejected edge
        child: VertexId,
    },

    /// The child already hangs under a different parent
    #[error("vertex {child} is already parented under {parent}")]
    AlreadyParented {
        /// The vertex that was offered a second parent
        child: VertexId,
        /// Its current parent
        parent: VertexId,
    },

    /// Roots and detached vertices cannot be re-parented
    #[error("vertex {0} has no parent to move from")]
    Orphaned(VertexId),

    /// A vertex for this payload identifier already exists
    #[error("object {0} already has a vertex")]
    DuplicateNode(InstanceId),

    /// The payload carries no identifier yet
    #[error("payload has no assigned identifier")]
    UnregisteredNode,

    /// Every descriptor value is in use
    #[error("descriptor space exhausted")]
    DescriptorSpaceExhausted,
}

/// Directed forest with owned payloads and opaque vertex handles
#[derive(Debug, Default)]
pub struct Graph<P: VertexNode> {
    vertices: HashMap<VertexId, Vertex<P>>,
    by_node: HashMap<InstanceId, VertexId>,
    next: u32,
}

impl<P: VertexNode> Graph<P> {
    /// Create an empty graph
    #[must_use]
    pub fn new() -> Self {
        Self {
            vertices: HashMap::new(),
            by_node: HashMap::new(),
            next: 0,
        }
    }

    /// Insert a payload as a fresh, detached vertex
    ///
    /// # Errors
    ///
    /// Fails [`GraphError::UnregisteredNode`] when the payload has no
    /// identifier, [`GraphError::DuplicateNode`] when the identifier already
    /// owns a vertex, and [`GraphError::DescriptorSpaceExhausted`] once every
    /// handle value is live.
    pub fn add_vertex(&mut self, payload: P) -> Result<VertexId, GraphError> {
        let id = payload.node_id().ok_or(GraphError::UnregisteredNode)?;
        if self.by_node.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        if self.vertices.len() >= u32::MAX as usize {
            return Err(GraphError::DescriptorSpaceExhausted);
        }

        let descriptor = self.next_free();
        self.by_node.insert(id, descriptor);
        self.vertices
            .insert(descriptor, Vertex::new(descriptor, payload));
        Ok(descriptor)
    }

    /// Append `child` to `parent`'s child list
    ///
    /// Returns `Ok(true)` when the edge was inserted and `Ok(false)` when it
    /// already existed (re-insertion is an idempotent no-op; the child list
    /// never gains a duplicate).
    ///
    /// # Errors
    ///
    /// Fails [`GraphError::WouldCycle`] when `child` is `parent` itself or
    /// one of its ancestors, and [`GraphError::AlreadyParented`] when `child`
    /// already hangs under a different vertex. The graph is unchanged on
    /// failure.
    pub fn add_edge(&mut self, parent: VertexId, child: VertexId) -> Result<bool, GraphError> {
        if !self.vertices.contains_key(&parent) {
            return Err(GraphError::VertexNotFound(parent));
        }
        let current = self
            .vertices
            .get(&child)
            .ok_or(GraphError::VertexNotFound(child))?
            .parent();

        if current == Some(parent) {
            return Ok(false);
        }
        if child == parent || self.chain_contains(parent, child) {
            return Err(GraphError::WouldCycle { parent, child });
        }
        if let Some(existing) = current {
            return Err(GraphError::AlreadyParented {
                child,
                parent: existing,
            });
        }

        if let Some(vertex) = self.vertices.get_mut(&parent) {
            vertex.push_edge(child);
        }
        if let Some(vertex) = self.vertices.get_mut(&child) {
            vertex.set_parent(Some(parent));
        }
        Ok(true)
    }

    /// Delete `origin` and its whole subtree, returning the payloads
    ///
    /// The origin's former parent no longer lists it as a child. Payloads
    /// come back in depth-first order (origin first), so callers can run
    /// teardown parent-before-descendants.
    ///
    /// # Errors
    ///
    /// Fails [`GraphError::VertexNotFound`] for unknown descriptors.
    pub fn remove_vertex(&mut self, origin: VertexId) -> Result<Vec<P>, GraphError> {
        if !self.vertices.contains_key(&origin) {
            return Err(GraphError::VertexNotFound(origin));
        }

        let doomed = self.depth_first_search(origin, true);
        if let Some(parent) = self.vertices.get(&origin).and_then(Vertex::parent) {
            if let Some(vertex) = self.vertices.get_mut(&parent) {
                vertex.remove_edge(origin);
            }
        }

        let mut payloads = Vec::with_capacity(doomed.len());
        for descriptor in doomed {
            if let Some(vertex) = self.vertices.remove(&descriptor) {
                let payload = vertex.into_payload();
                if let Some(id) = payload.node_id() {
                    self.by_node.remove(&id);
                }
                payloads.push(payload);
            }
        }
        debug!("graph: removed {} vertices under {origin}", payloads.len());
        Ok(payloads)
    }

    /// Re-parent `vert` under `new_parent`
    ///
    /// The old edge is removed and the new one appended at the end of
    /// `new_parent`'s child list; moving to the same parent re-appends the
    /// vertex as the last child.
    ///
    /// # Errors
    ///
    /// Fails [`GraphError::WouldCycle`] when `new_parent` lies inside
    /// `vert`'s subtree (itself included) and [`GraphError::Orphaned`] when
    /// `vert` currently has no parent. The graph is unchanged on failure.
    pub fn move_vertex(&mut self, vert: VertexId, new_parent: VertexId) -> Result<(), GraphError> {
        if !self.vertices.contains_key(&new_parent) {
            return Err(GraphError::VertexNotFound(new_parent));
        }
        let current = self
            .vertices
            .get(&vert)
            .ok_or(GraphError::VertexNotFound(vert))?
            .parent();
        let Some(old_parent) = current else {
            return Err(GraphError::Orphaned(vert));
        };
        if new_parent == vert || self.chain_contains(new_parent, vert) {
            return Err(GraphError::WouldCycle {
                parent: new_parent,
                child: vert,
            });
        }

        if let Some(vertex) = self.vertices.get_mut(&old_parent) {
            vertex.remove_edge(vert);
        }
        if let Some(vertex) = self.vertices.get_mut(&new_parent) {
            vertex.push_edge(vert);
        }
        if let Some(vertex) = self.vertices.get_mut(&vert) {
            vertex.set_parent(Some(new_parent));
        }
        Ok(())
    }

    /// The cached parent handle; `None` for roots, detached, and unknown
    /// vertices
    #[must_use]
    pub fn parent(&self, vert: VertexId) -> Option<VertexId> {
        self.vertices.get(&vert).and_then(Vertex::parent)
    }

    /// Direct children in edge-insertion order; empty for leaves and unknown
    /// handles
    #[must_use]
    pub fn children_of(&self, vert: VertexId) -> &[VertexId] {
        self.vertices.get(&vert).map_or(&[], Vertex::edges)
    }

    /// True iff `descendant` lies in `ancestor`'s subtree (self-inclusive)
    #[must_use]
    pub fn descendant_of(&self, descendant: VertexId, ancestor: VertexId) -> bool {
        if descendant == ancestor {
            return self.vertices.contains_key(&descendant);
        }
        self.chain_contains(descendant, ancestor)
    }

    /// Depth-first traversal from `origin`, origin included
    ///
    /// Children are visited in edge-insertion order. With
    /// `include_disabled = false`, an inactive payload excludes its whole
    /// branch; an inactive origin yields an empty order. Unknown origins
    /// yield an empty order.
    #[must_use]
    pub fn depth_first_search(&self, origin: VertexId, include_disabled: bool) -> Vec<VertexId> {
        let mut order = Vec::new();
        let mut stack = vec![origin];
        while let Some(descriptor) = stack.pop() {
            let Some(vertex) = self.vertices.get(&descriptor) else {
                continue;
            };
            if !include_disabled && !vertex.payload().node_active() {
                continue;
            }
            order.push(descriptor);
            stack.extend(vertex.edges().iter().rev().copied());
        }
        order
    }

    /// Level-order traversal from `origin`, origin excluded
    ///
    /// Nearer levels come first, siblings in edge-insertion order. The same
    /// filtering rules as depth-first apply: an inactive origin yields an
    /// empty order and an inactive vertex prunes its branch.
    #[must_use]
    pub fn breadth_first_search(&self, origin: VertexId, include_disabled: bool) -> Vec<VertexId> {
        let mut order = Vec::new();
        let Some(root) = self.vertices.get(&origin) else {
            return order;
        };
        if !include_disabled && !root.payload().node_active() {
            return order;
        }

        let mut queue: VecDeque<VertexId> = root.edges().iter().copied().collect();
        while let Some(descriptor) = queue.pop_front() {
            let Some(vertex) = self.vertices.get(&descriptor) else {
                continue;
            };
            if !include_disabled && !vertex.payload().node_active() {
                continue;
            }
            order.push(descriptor);
            queue.extend(vertex.edges().iter().copied());
        }
        order
    }

    /// Payload behind a descriptor
    #[must_use]
    pub fn node(&self, vert: VertexId) -> Option<&P> {
        self.vertices.get(&vert).map(Vertex::payload)
    }

    /// Payload behind a descriptor, mutably
    pub fn node_mut(&mut self, vert: VertexId) -> Option<&mut P> {
        self.vertices.get_mut(&vert).map(Vertex::payload_mut)
    }

    /// Descriptor of the vertex owning the identified payload
    #[must_use]
    pub fn vertex_by_node(&self, id: InstanceId) -> Option<VertexId> {
        self.by_node.get(&id).copied()
    }

    /// Payload looked up by identifier
    #[must_use]
    pub fn node_by_id(&self, id: InstanceId) -> Option<&P> {
        self.vertex_by_node(id).and_then(|vert| self.node(vert))
    }

    /// Payload looked up by identifier, mutably
    pub fn node_by_id_mut(&mut self, id: InstanceId) -> Option<&mut P> {
        self.vertex_by_node(id)
            .and_then(|vert| self.vertices.get_mut(&vert))
            .map(Vertex::payload_mut)
    }

    /// Number of live vertices
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// True when the graph holds no vertices
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Every live descriptor, in no particular order
    pub fn descriptors(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.keys().copied()
    }

    /// Walk `from`'s ancestor chain looking for `target`
    fn chain_contains(&self, from: VertexId, target: VertexId) -> bool {
        let mut cursor = from;
        while let Some(parent) = self.vertices.get(&cursor).and_then(Vertex::parent) {
            if parent == target {
                return true;
            }
            cursor = parent;
        }
        false
    }

    fn next_free(&mut self) -> VertexId {
        loop {
            self.next = self.next.wrapping_add(1);
            let Some(descriptor) = VertexId::new(self.next) else {
                continue; // counter wrapped through zero
            };
            if !self.vertices.contains_key(&descriptor) {
                return descriptor;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Node {
        id: InstanceId,
        active: bool,
    }

    impl VertexNode for Node {
        fn node_id(&self) -> Option<InstanceId> {
            Some(self.id)
        }

        fn node_active(&self) -> bool {
            self.active
        }
    }

    fn node(raw: u32) -> Node {
        Node {
            id: InstanceId::new(raw).unwrap(),
            active: true,
        }
    }

    /// root -> A -> {B, C}, B -> D; insertion order A,C under root is not
    /// used here -- children B,C hang under A and D under B.
    fn sample_tree() -> (Graph<Node>, [VertexId; 5]) {
        let mut graph = Graph::new();
        let root = graph.add_vertex(node(1)).unwrap();
        let a = graph.add_vertex(node(2)).unwrap();
        let b = graph.add_vertex(node(3)).unwrap();
        let c = graph.add_vertex(node(4)).unwrap();
        let d = graph.add_vertex(node(5)).unwrap();
        assert!(graph.add_edge(root, a).unwrap());
        assert!(graph.add_edge(a, b).unwrap());
        assert!(graph.add_edge(a, c).unwrap());
        assert!(graph.add_edge(b, d).unwrap());
        (graph, [root, a, b, c, d])
    }

    #[test]
    fn test_add_vertex_requires_identifier() {
        struct Anon;
        impl VertexNode for Anon {
            fn node_id(&self) -> Option<InstanceId> {
                None
            }
            fn node_active(&self) -> bool {
                true
            }
        }
        let mut graph: Graph<Anon> = Graph::new();
        assert!(matches!(
            graph.add_vertex(Anon),
            Err(GraphError::UnregisteredNode)
        ));
    }

    #[test]
    fn test_add_vertex_rejects_duplicate_identifier() {
        let mut graph = Graph::new();
        graph.add_vertex(node(7)).unwrap();
        assert!(matches!(
            graph.add_vertex(node(7)),
            Err(GraphError::DuplicateNode(_))
        ));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let (graph, [_, a, b, c, _]) = sample_tree();
        assert_eq!(graph.children_of(a), &[b, c]);
    }

    #[test]
    fn test_repeat_edge_is_noop() {
        let (mut graph, [root, a, ..]) = sample_tree();
        assert!(!graph.add_edge(root, a).unwrap());
        assert_eq!(graph.children_of(root), &[a]);
    }

    #[test]
    fn test_add_edge_rejects_self_loop() {
        let (mut graph, [root, ..]) = sample_tree();
        assert!(matches!(
            graph.add_edge(root, root),
            Err(GraphError::WouldCycle { .. })
        ));
    }

    #[test]
    fn test_add_edge_rejects_ancestor_as_child() {
        let (mut graph, [root, _, b, _, d]) = sample_tree();
        // root is an ancestor of d; hanging it under d would close a loop
        assert!(matches!(
            graph.add_edge(d, root),
            Err(GraphError::WouldCycle { .. })
        ));
        // and the failure must not have touched adjacency
        assert!(graph.children_of(d).is_empty());
        assert_eq!(graph.parent(root), None);
        let _ = b;
    }

    #[test]
    fn test_add_edge_rejects_second_parent() {
        let (mut graph, [root, a, b, ..]) = sample_tree();
        match graph.add_edge(root, b) {
            Err(GraphError::AlreadyParented { child, parent }) => {
                assert_eq!(child, b);
                assert_eq!(parent, a);
            }
            other => panic!("expected AlreadyParented, got {other:?}"),
        }
        assert_eq!(graph.children_of(root), &[a]);
    }

    #[test]
    fn test_dfs_visits_parent_before_descendants() {
        let (graph, [root, a, b, c, d]) = sample_tree();
        assert_eq!(graph.depth_first_search(root, true), vec![root, a, b, d, c]);
    }

    #[test]
    fn test_dfs_prunes_inactive_branch() {
        let (mut graph, [root, a, b, c, _]) = sample_tree();
        graph.node_mut(b).unwrap().active = false;
        assert_eq!(graph.depth_first_search(root, false), vec![root, a, c]);
        // unfiltered traversal still sees the full tree
        assert_eq!(graph.depth_first_search(root, true).len(), 5);
    }

    #[test]
    fn test_dfs_inactive_origin_is_empty() {
        let (mut graph, [root, ..]) = sample_tree();
        graph.node_mut(root).unwrap().active = false;
        assert!(graph.depth_first_search(root, false).is_empty());
    }

    #[test]
    fn test_dfs_unknown_origin_is_empty() {
        let (graph, _) = sample_tree();
        let bogus = VertexId::new(0x00F0_0000).unwrap();
        assert!(graph.depth_first_search(bogus, true).is_empty());
    }

    #[test]
    fn test_bfs_level_order_without_origin() {
        let mut graph = Graph::new();
        let root = graph.add_vertex(node(1)).unwrap();
        let a = graph.add_vertex(node(2)).unwrap();
        let x = graph.add_vertex(node(3)).unwrap();
        let b = graph.add_vertex(node(4)).unwrap();
        let c = graph.add_vertex(node(5)).unwrap();
        let d = graph.add_vertex(node(6)).unwrap();
        graph.add_edge(root, a).unwrap();
        graph.add_edge(root, x).unwrap();
        graph.add_edge(a, b).unwrap();
        graph.add_edge(a, c).unwrap();
        graph.add_edge(b, d).unwrap();

        // whole levels before deeper ones, siblings in insertion order
        assert_eq!(
            graph.breadth_first_search(root, true),
            vec![a, x, b, c, d]
        );
    }

    #[test]
    fn test_bfs_filters_like_dfs() {
        let (mut graph, [root, a, b, c, _]) = sample_tree();
        graph.node_mut(b).unwrap().active = false;
        assert_eq!(graph.breadth_first_search(root, false), vec![a, c]);
        graph.node_mut(root).unwrap().active = false;
        assert!(graph.breadth_first_search(root, false).is_empty());
    }

    #[test]
    fn test_remove_vertex_drops_subtree() {
        let (mut graph, [root, a, b, c, d]) = sample_tree();
        let removed = graph.remove_vertex(b).unwrap();

        assert_eq!(removed.len(), 2); // b and d, origin first
        assert_eq!(removed[0].id.get(), 3);
        assert_eq!(removed[1].id.get(), 5);
        assert_eq!(graph.children_of(a), &[c]);
        assert_eq!(graph.depth_first_search(root, true), vec![root, a, c]);
        assert!(graph.node(d).is_none());
        assert!(graph.node_by_id(InstanceId::new(5).unwrap()).is_none());
    }

    #[test]
    fn test_move_vertex_reparents_at_end() {
        let (mut graph, [root, a, b, c, _]) = sample_tree();
        graph.move_vertex(b, root).unwrap();

        assert_eq!(graph.children_of(root), &[a, b]);
        assert_eq!(graph.children_of(a), &[c]);
        assert_eq!(graph.parent(b), Some(root));
    }

    #[test]
    fn test_move_vertex_rejects_own_subtree() {
        let (mut graph, [_, a, b, _, d]) = sample_tree();
        assert!(matches!(
            graph.move_vertex(b, d),
            Err(GraphError::WouldCycle { .. })
        ));
        assert!(matches!(
            graph.move_vertex(b, b),
            Err(GraphError::WouldCycle { .. })
        ));
        assert_eq!(graph.parent(b), Some(a));
    }

    #[test]
    fn test_move_vertex_rejects_detached() {
        let (mut graph, [root, ..]) = sample_tree();
        let loose = graph.add_vertex(node(9)).unwrap();
        assert!(matches!(
            graph.move_vertex(loose, root),
            Err(GraphError::Orphaned(_))
        ));
        // the root itself has no parent either
        let (mut graph2, [root2, a2, ..]) = sample_tree();
        assert!(matches!(
            graph2.move_vertex(root2, a2),
            Err(GraphError::Orphaned(_))
        ));
    }

    #[test]
    fn test_descendant_of_is_self_inclusive() {
        let (graph, [root, a, b, c, d]) = sample_tree();
        assert!(graph.descendant_of(d, root));
        assert!(graph.descendant_of(d, b));
        assert!(graph.descendant_of(a, a));
        assert!(!graph.descendant_of(c, b));
        assert!(!graph.descendant_of(root, d));
    }

    #[test]
    fn test_lookup_by_identifier() {
        let (graph, [_, a, ..]) = sample_tree();
        let id = InstanceId::new(2).unwrap();
        assert_eq!(graph.vertex_by_node(id), Some(a));
        assert_eq!(graph.node_by_id(id).unwrap().id, id);
        assert!(graph.node_by_id(InstanceId::new(99).unwrap()).is_none());
    }
}
