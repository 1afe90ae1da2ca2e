//! # Graph Module
//!
//! The generic directed-forest substrate the scene hierarchy is built on.
//! [`Graph`] owns vertex payloads and hands out opaque [`VertexId`] handles;
//! payload types implement [`VertexNode`] so traversals can filter on the
//! active flag without knowing the concrete type.

mod forest;
mod vertex;

pub use forest::{Graph, GraphError};
pub use vertex::{Vertex, VertexId, VertexNode};
