//! Vertex records and the payload contract
//!
//! A [`Vertex`] is the graph's internal node record: an opaque descriptor,
//! the cached parent descriptor, the insertion-ordered child list, and the
//! owned payload. Payloads opt in through [`VertexNode`], which exposes the
//! two facts traversal needs: identity and the active flag.

use std::fmt;
use std::num::NonZeroU32;

use crate::core::object::InstanceId;

/// Opaque handle naming one vertex inside a [`Graph`](super::Graph)
///
/// Descriptors are a separate indirection layer from [`InstanceId`]s: the
/// graph may be rebuilt or payloads re-inserted without disturbing object
/// identity. Zero is never a valid descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(NonZeroU32);

impl VertexId {
    /// Wrap a raw descriptor value, rejecting zero
    #[must_use]
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// The raw descriptor value
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0.get())
    }
}

/// Contract a payload type satisfies to live inside a [`Graph`](super::Graph)
pub trait VertexNode {
    /// The payload's registered identifier, if one has been assigned
    fn node_id(&self) -> Option<InstanceId>;

    /// Whether traversals with filtering enabled may enter this payload's
    /// branch
    fn node_active(&self) -> bool;
}

/// One node record owned by the graph
#[derive(Debug)]
pub struct Vertex<P> {
    descriptor: VertexId,
    parent: Option<VertexId>,
    edges: Vec<VertexId>,
    payload: P,
}

impl<P> Vertex<P> {
    pub(crate) fn new(descriptor: VertexId, payload: P) -> Self {
        Self {
            descriptor,
            parent: None,
            edges: Vec::new(),
            payload,
        }
    }

    /// This vertex's handle
    #[must_use]
    pub fn descriptor(&self) -> VertexId {
        self.descriptor
    }

    /// The cached parent handle; `None` for roots and detached vertices
    #[must_use]
    pub fn parent(&self) -> Option<VertexId> {
        self.parent
    }

    /// Child handles in edge-insertion order
    #[must_use]
    pub fn edges(&self) -> &[VertexId] {
        &self.edges
    }

    /// The owned payload
    #[must_use]
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// The owned payload, mutably
    pub fn payload_mut(&mut self) -> &mut P {
        &mut self.payload
    }

    pub(crate) fn set_parent(&mut self, parent: Option<VertexId>) {
        self.parent = parent;
    }

    pub(crate) fn push_edge(&mut self, child: VertexId) {
        self.edges.push(child);
    }

    pub(crate) fn remove_edge(&mut self, child: VertexId) {
        self.edges.retain(|&e| e != child);
    }

    pub(crate) fn into_payload(self) -> P {
        self.payload
    }
}
