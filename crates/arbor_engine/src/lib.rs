//! # Arbor Engine
//!
//! A hierarchical scene-graph engine for real-time interactive applications.
//!
//! ## Features
//!
//! - **Directed Forest**: Generic graph substrate with cycle-safe edge
//!   insertion and ordered traversals
//! - **Entities & Components**: Named hierarchy nodes carrying capability
//!   units, with a spatial transform always in slot 0
//! - **Dirty-Tracked Rebuilds**: Derived caches recomputed from a single
//!   depth-first traversal whenever the tree changes
//! - **Lifecycle Messaging**: Ordered broadcast of per-frame messages over
//!   the active-object cache
//! - **Scene Stack**: Named scenes with load and transition hooks, driven
//!   by an explicit engine context
//!
//! ## Quick Start
//!
//! ```rust
//! use arbor_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = Engine::new(EngineConfig::new("demo"))?;
//!
//!     let scene = Scene::new("main", engine.registry())?
//!         .with_load(|graph, registry, clock| {
//!             let player = Entity::new("player", registry)?;
//!             graph.add_game_object(player, None, clock)?;
//!             Ok(())
//!         });
//!     engine.register_scene(scene)?;
//!     engine.push_scene("main")?;
//!
//!     engine.frame_with_delta(0.016);
//!     engine.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;

pub mod foundation;
pub mod graph;
pub mod scene;

mod engine;

pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::{
            config::{Config, ConfigError, EngineConfig},
            object::{InstanceId, Object, ObjectMeta},
            registry::{Registry, RegistryError},
        },
        foundation::{
            math::{Mat4, Quat, Vec3},
            time::FrameClock,
        },
        graph::{Graph, GraphError, VertexId, VertexNode},
        scene::{
            Camera, Capabilities, Component, ComponentKey, ComponentMeta, Entity, Message,
            Projection, Scene, SceneError, SceneGraph, SceneGraphListener, SceneId, Script,
            ScriptContext, Transform,
        },
        Engine, EngineError,
    };
}
