//! # Scene Module
//!
//! The entity hierarchy and everything layered on top of the graph
//! substrate: entities with their component lists, the built-in
//! [`Transform`] and [`Camera`] components, lifecycle [`Message`] fan-out,
//! the dirty-tracked [`SceneGraph`], and the [`Scene`] that binds them
//! together.
//!
//! ## Organization
//!
//! - **Entity / Component**: hierarchy nodes and the capability units they
//!   carry
//! - **Message**: per-frame lifecycle message kinds
//! - **Scene Graph**: derived caches, rebuild protocol, listener fan-out
//! - **Scene**: scene-level caches and lifecycle hooks

pub mod camera;
pub mod component;
pub mod entity;
pub mod message;
pub mod scene;
pub mod scene_graph;
pub mod transform;

// Re-export commonly used types
pub use camera::{Camera, Projection};
pub use component::{Capabilities, Component, ComponentMeta, ComponentSlot, Script, ScriptContext};
pub use entity::Entity;
pub use message::Message;
pub use scene::{CameraCache, Scene, SceneId};
pub use scene_graph::{ComponentKey, SceneError, SceneGraph, SceneGraphListener, ROOT_NAME};
pub use transform::Transform;
