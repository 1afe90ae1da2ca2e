//! Scene graph: hierarchy binding, dirty tracking and message fan-out
//!
//! The [`SceneGraph`] binds a scene's root entity to a [`Graph`] and keeps
//! two derived caches consistent with it: the active-object order (the
//! filtered depth-first traversal from the last rebuild) and the flattened
//! component cache (every visible entity's components in that order). Both
//! are pure derived state: any structural or activation change marks the
//! graph dirty, and the next [`SceneGraph::update`] recomputes them from
//! scratch, then notifies listeners.
//!
//! Insertion is the one mutation that rebuilds synchronously: after
//! [`SceneGraph::add_game_object`] returns, the caches already reflect the
//! new subtree.

use std::any::Any;
use std::collections::HashSet;

use log::debug;
use thiserror::Error;

use crate::core::object::{InstanceId, Object};
use crate::core::registry::{Registry, RegistryError};
use crate::foundation::math::Mat4;
use crate::foundation::time::FrameClock;
use crate::graph::{Graph, GraphError, VertexId};

use super::component::ComponentSlot;
use super::entity::Entity;
use super::message::Message;
use super::scene::SceneId;

/// Name given to the implicit root entity of every scene graph
pub const ROOT_NAME: &str = "__rootNode__";

/// Errors raised by scene-graph mutations
#[derive(Debug, Error)]
pub enum SceneError {
    /// A structural graph operation failed
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Identifier issuance or release failed
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The identifier names no entity in this scene graph
    #[error("no entity with id {0}")]
    EntityNotFound(InstanceId),

    /// The implicit root entity cannot be destroyed
    #[error("the root entity cannot be destroyed")]
    CannotDestroyRoot,
}

/// Address of one attached component within the flattened cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentKey {
    /// Identifier of the owning entity
    pub entity: InstanceId,
    /// Attachment index on the owning entity
    pub index: usize,
}

/// External observer notified after every cache rebuild
///
/// Renderer- and UI-side caches re-derive their lists inside this callback
/// by reading the rebuilt graph's component cache.
pub trait SceneGraphListener: Any {
    /// The graph finished rebuilding its caches
    fn on_scene_graph_update(&mut self, graph: &SceneGraph);

    /// Concrete-type escape hatch for consumers
    fn as_any(&self) -> &dyn Any;

    /// Concrete-type escape hatch, mutably
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Binding between a scene's entity tree, the graph arena, and the derived
/// caches
pub struct SceneGraph {
    graph: Graph<Entity>,
    root: VertexId,
    root_id: InstanceId,
    scene: SceneId,
    active: Vec<InstanceId>,
    components: Vec<ComponentKey>,
    listeners: Vec<Box<dyn SceneGraphListener>>,
    dirty: bool,
}

impl SceneGraph {
    /// Create a scene graph holding only the implicit root entity
    ///
    /// The graph starts dirty so the first `update` performs the initial
    /// build.
    ///
    /// # Errors
    ///
    /// Propagates registry failures from creating the root entity.
    pub fn new(scene: SceneId, registry: &Registry) -> Result<Self, SceneError> {
        let mut root = Entity::new(ROOT_NAME, registry)?;
        root.assign_scene(scene);
        let root_id = root.instance_id().expect("root entity was just registered");

        let mut graph = Graph::new();
        let root_vert = graph.add_vertex(root)?;

        Ok(Self {
            graph,
            root: root_vert,
            root_id,
            scene,
            active: Vec::new(),
            components: Vec::new(),
            listeners: Vec::new(),
            dirty: true,
        })
    }

    /// Whether the caches lag behind the tree
    #[must_use]
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// Force a rebuild at the next `update`
    pub fn set_dirty(&mut self) {
        self.dirty = true;
    }

    /// Rebuild the derived caches and notify listeners
    ///
    /// Runs the filtered depth-first traversal, overwrites the active-object
    /// and component caches, clears the dirty flag, then notifies registered
    /// [`SceneGraphListener`]s and finally fans the rebuild notification out
    /// to scene-listener components over the fresh active order.
    pub fn update(&mut self) {
        let order = self.graph.depth_first_search(self.root, false);
        self.active.clear();
        self.components.clear();
        for descriptor in order {
            let Some(entity) = self.graph.node(descriptor) else {
                continue;
            };
            let Some(id) = entity.instance_id() else {
                continue;
            };
            self.active.push(id);
            for index in 0..entity.components().len() {
                self.components.push(ComponentKey { entity: id, index });
            }
        }
        self.dirty = false;
        debug!(
            "scene graph {}: rebuilt, {} active entities, {} components",
            self.scene,
            self.active.len(),
            self.components.len()
        );

        // external listeners observe the freshly rebuilt graph
        let mut listeners = std::mem::take(&mut self.listeners);
        for listener in &mut listeners {
            listener.on_scene_graph_update(self);
        }
        self.listeners = listeners;

        // then the component-level fan-out in active order
        let order = self.active.clone();
        for id in order {
            if let Some(entity) = self.graph.node_by_id_mut(id) {
                entity.notify_scene_graph_update();
            }
        }
    }

    /// Insert a detached entity (and its staged subtree) under `parent`
    ///
    /// With no parent given the subtree lands under the root. Every inserted
    /// entity is bound to this scene, parent/child references are rebuilt
    /// from the graph adjacency, `Activate` is delivered children before
    /// parents, and the caches are rebuilt before returning.
    ///
    /// # Errors
    ///
    /// Fails [`SceneError::EntityNotFound`] for an unknown parent and
    /// propagates graph rejections; validation happens before any vertex is
    /// inserted, so a failed call leaves the scene graph unchanged.
    pub fn add_game_object(
        &mut self,
        object: Entity,
        parent: Option<InstanceId>,
        clock: &FrameClock,
    ) -> Result<InstanceId, SceneError> {
        let parent_vert = match parent {
            Some(id) => self
                .graph
                .vertex_by_node(id)
                .ok_or(SceneError::EntityNotFound(id))?,
            None => self.root,
        };

        let mut seen = HashSet::new();
        self.validate_subtree(&object, &mut seen)?;

        let mut activation = Vec::new();
        let inserted = self.insert_subtree(object, parent_vert, &mut activation)?;
        let inserted_id = self
            .graph
            .node(inserted)
            .and_then(|e| e.instance_id())
            .expect("validated subtree carries identifiers");

        self.rebuild_references(inserted);
        if let Some(parent_entity) = self.graph.node_mut(parent_vert) {
            parent_entity.link_child(inserted_id);
        }

        for id in activation {
            if let Some(entity) = self.graph.node_by_id_mut(id) {
                entity.send_message(Message::Activate, clock);
            }
        }

        debug!("scene graph {}: inserted {inserted_id}", self.scene);
        self.update();
        Ok(inserted_id)
    }

    /// Idempotently re-insert the edge `parent -> id`
    ///
    /// Repeating the attachment of an already-parented entity is a no-op:
    /// the child list never gains a duplicate.
    ///
    /// # Errors
    ///
    /// Fails [`SceneError::EntityNotFound`] for unknown ids and propagates
    /// graph rejections (cycle, second parent).
    pub fn attach(&mut self, id: InstanceId, parent: InstanceId) -> Result<(), SceneError> {
        let child = self
            .graph
            .vertex_by_node(id)
            .ok_or(SceneError::EntityNotFound(id))?;
        let parent_vert = self
            .graph
            .vertex_by_node(parent)
            .ok_or(SceneError::EntityNotFound(parent))?;

        if self.graph.add_edge(parent_vert, child)? {
            if let Some(entity) = self.graph.node_mut(parent_vert) {
                entity.link_child(id);
            }
            if let Some(entity) = self.graph.node_mut(child) {
                entity.set_parent(Some(parent));
            }
            self.dirty = true;
        }
        Ok(())
    }

    /// Deliver one message to every entry of the current active-object cache
    ///
    /// The cache is iterated as-is: if the tree changed since the last
    /// rebuild, delivery follows the stale order until `update` runs again.
    /// Entities destroyed meanwhile are skipped.
    pub fn send_message(&mut self, message: Message, clock: &FrameClock) {
        let order = self.active.clone();
        for id in order {
            if let Some(entity) = self.graph.node_by_id_mut(id) {
                entity.send_message(message, clock);
            }
        }
    }

    /// Flip an entity's active flag, marking the graph dirty on change
    ///
    /// # Errors
    ///
    /// Fails [`SceneError::EntityNotFound`] for unknown ids.
    pub fn set_active(&mut self, id: InstanceId, active: bool) -> Result<(), SceneError> {
        let entity = self
            .graph
            .node_by_id_mut(id)
            .ok_or(SceneError::EntityNotFound(id))?;
        if entity.is_active() != active {
            entity.set_active_flag(active);
            self.dirty = true;
            debug!("scene graph {}: {id} active -> {active}", self.scene);
        }
        Ok(())
    }

    /// Remove an entity and its whole subtree, retiring every identifier
    ///
    /// Runs each removed entity's and component's release hook against the
    /// registry and marks the graph dirty. The root entity is refused.
    ///
    /// # Errors
    ///
    /// Fails [`SceneError::CannotDestroyRoot`] for the root and
    /// [`SceneError::EntityNotFound`] for unknown ids.
    pub fn destroy(&mut self, id: InstanceId, registry: &Registry) -> Result<(), SceneError> {
        if id == self.root_id {
            return Err(SceneError::CannotDestroyRoot);
        }
        let vert = self
            .graph
            .vertex_by_node(id)
            .ok_or(SceneError::EntityNotFound(id))?;

        let parent_id = self
            .graph
            .parent(vert)
            .and_then(|p| self.graph.node(p))
            .and_then(|e| e.instance_id());
        if let Some(parent_id) = parent_id {
            if let Some(parent) = self.graph.node_by_id_mut(parent_id) {
                parent.unlink_child(id);
            }
        }

        let mut removed = self.graph.remove_vertex(vert)?;
        for entity in &mut removed {
            entity.release(registry);
        }
        debug!(
            "scene graph {}: destroyed {} entities under {id}",
            self.scene,
            removed.len()
        );
        self.dirty = true;
        Ok(())
    }

    /// Re-parent a live entity, or move it back under the root
    ///
    /// Refreshes both parents' child mirrors and marks the graph dirty.
    ///
    /// # Errors
    ///
    /// Fails [`SceneError::EntityNotFound`] for unknown ids and propagates
    /// graph rejections (cycle into own subtree, moving the root).
    pub fn move_entity(
        &mut self,
        id: InstanceId,
        new_parent: Option<InstanceId>,
    ) -> Result<(), SceneError> {
        let vert = self
            .graph
            .vertex_by_node(id)
            .ok_or(SceneError::EntityNotFound(id))?;
        let target = match new_parent {
            Some(p) => self
                .graph
                .vertex_by_node(p)
                .ok_or(SceneError::EntityNotFound(p))?,
            None => self.root,
        };

        let old_parent_id = self
            .graph
            .parent(vert)
            .and_then(|p| self.graph.node(p))
            .and_then(|e| e.instance_id());

        self.graph.move_vertex(vert, target)?;

        if let Some(old) = old_parent_id {
            if let Some(entity) = self.graph.node_by_id_mut(old) {
                entity.unlink_child(id);
            }
        }
        let target_id = self.graph.node(target).and_then(|e| e.instance_id());
        if let Some(entity) = self.graph.node_mut(target) {
            entity.link_child(id);
        }
        if let Some(entity) = self.graph.node_mut(vert) {
            entity.set_parent(target_id);
        }
        self.dirty = true;
        Ok(())
    }

    /// Identifier of the parent entity; `None` for the root and unknown ids
    #[must_use]
    pub fn parent_of(&self, id: InstanceId) -> Option<InstanceId> {
        let vert = self.graph.vertex_by_node(id)?;
        let parent = self.graph.parent(vert)?;
        self.graph.node(parent).and_then(|e| e.instance_id())
    }

    /// Direct children in edge order; empty for leaves and unknown ids
    #[must_use]
    pub fn children_of(&self, id: InstanceId) -> Vec<InstanceId> {
        let Some(vert) = self.graph.vertex_by_node(id) else {
            return Vec::new();
        };
        self.graph
            .children_of(vert)
            .iter()
            .filter_map(|&c| self.graph.node(c).and_then(|e| e.instance_id()))
            .collect()
    }

    /// Every entity below `id` in depth-first order, `id` itself excluded
    #[must_use]
    pub fn descendants_of(&self, id: InstanceId) -> Vec<InstanceId> {
        let Some(vert) = self.graph.vertex_by_node(id) else {
            return Vec::new();
        };
        self.graph
            .depth_first_search(vert, true)
            .into_iter()
            .filter(|&v| v != vert)
            .filter_map(|v| self.graph.node(v).and_then(|e| e.instance_id()))
            .collect()
    }

    /// Ancestor chain from the nearest parent up to the root
    #[must_use]
    pub fn ancestors(&self, id: InstanceId) -> Vec<InstanceId> {
        let mut chain = Vec::new();
        let Some(mut vert) = self.graph.vertex_by_node(id) else {
            return chain;
        };
        while let Some(parent) = self.graph.parent(vert) {
            if let Some(found) = self.graph.node(parent).and_then(|e| e.instance_id()) {
                chain.push(found);
            }
            vert = parent;
        }
        chain
    }

    /// Component keys of every descendant, the entity's own excluded
    #[must_use]
    pub fn components_in_children(&self, id: InstanceId) -> Vec<ComponentKey> {
        self.keys_of(self.descendants_of(id))
    }

    /// Component keys of every ancestor, the entity's own excluded
    #[must_use]
    pub fn components_in_parent(&self, id: InstanceId) -> Vec<ComponentKey> {
        self.keys_of(self.ancestors(id))
    }

    /// World matrix of a live entity: ancestor locals composed root to leaf
    #[must_use]
    pub fn world_matrix(&self, id: InstanceId) -> Option<Mat4> {
        let mut chain = Vec::new();
        let mut vert = self.graph.vertex_by_node(id)?;
        loop {
            let local = self.graph.node(vert)?.transform()?.local_matrix();
            chain.push(local);
            match self.graph.parent(vert) {
                Some(parent) => vert = parent,
                None => break,
            }
        }
        Some(
            chain
                .iter()
                .rev()
                .fold(Mat4::identity(), |acc, local| acc * local),
        )
    }

    /// The flattened component cache from the last rebuild
    #[must_use]
    pub fn components(&self) -> &[ComponentKey] {
        &self.components
    }

    /// The active-object order from the last rebuild
    #[must_use]
    pub fn active(&self) -> &[InstanceId] {
        &self.active
    }

    /// Resolve a cache key to its attachment slot
    #[must_use]
    pub fn component(&self, key: ComponentKey) -> Option<&ComponentSlot> {
        self.entity(key.entity)?.component(key.index)
    }

    /// Entity lookup by identifier
    #[must_use]
    pub fn entity(&self, id: InstanceId) -> Option<&Entity> {
        self.graph.node_by_id(id)
    }

    /// Entity lookup by identifier, mutably
    pub fn entity_mut(&mut self, id: InstanceId) -> Option<&mut Entity> {
        self.graph.node_by_id_mut(id)
    }

    /// Identifier of the implicit root entity
    #[must_use]
    pub fn root_id(&self) -> InstanceId {
        self.root_id
    }

    /// Identifier of the owning scene
    #[must_use]
    pub fn scene_id(&self) -> SceneId {
        self.scene
    }

    /// Read-only view of the underlying graph
    #[must_use]
    pub fn graph(&self) -> &Graph<Entity> {
        &self.graph
    }

    /// Register an external rebuild observer
    pub fn add_listener(&mut self, listener: impl SceneGraphListener) {
        self.listeners.push(Box::new(listener));
    }

    /// First registered listener of concrete type `T`
    #[must_use]
    pub fn listener<T: SceneGraphListener>(&self) -> Option<&T> {
        self.listeners
            .iter()
            .find_map(|l| l.as_any().downcast_ref::<T>())
    }

    /// First registered listener of concrete type `T`, mutably
    pub fn listener_mut<T: SceneGraphListener>(&mut self) -> Option<&mut T> {
        self.listeners
            .iter_mut()
            .find_map(|l| l.as_any_mut().downcast_mut::<T>())
    }

    /// Every staged entity must be registered and new to this graph.
    fn validate_subtree(
        &self,
        entity: &Entity,
        seen: &mut HashSet<InstanceId>,
    ) -> Result<(), SceneError> {
        let id = entity
            .instance_id()
            .ok_or(SceneError::Graph(GraphError::UnregisteredNode))?;
        if self.graph.vertex_by_node(id).is_some() || !seen.insert(id) {
            return Err(SceneError::Graph(GraphError::DuplicateNode(id)));
        }
        for child in entity.staged_children() {
            self.validate_subtree(child, seen)?;
        }
        Ok(())
    }

    /// Insert `entity` and its staged children as graph vertices, recording
    /// the activation order (children before their parent).
    fn insert_subtree(
        &mut self,
        mut entity: Entity,
        parent_vert: VertexId,
        activation: &mut Vec<InstanceId>,
    ) -> Result<VertexId, SceneError> {
        let staged = entity.take_staged();
        entity.assign_scene(self.scene);
        let id = entity.instance_id().expect("validated subtree carries identifiers");

        let vert = self.graph.add_vertex(entity)?;
        self.graph.add_edge(parent_vert, vert)?;
        for child in staged {
            self.insert_subtree(child, vert, activation)?;
        }
        activation.push(id);
        Ok(vert)
    }

    /// Rewrite parent/child identifier mirrors for a subtree from the graph
    /// adjacency.
    fn rebuild_references(&mut self, from: VertexId) {
        for vert in self.graph.depth_first_search(from, true) {
            let parent_id = self
                .graph
                .parent(vert)
                .and_then(|p| self.graph.node(p))
                .and_then(|e| e.instance_id());
            let children: Vec<InstanceId> = self
                .graph
                .children_of(vert)
                .iter()
                .filter_map(|&c| self.graph.node(c).and_then(|e| e.instance_id()))
                .collect();
            if let Some(entity) = self.graph.node_mut(vert) {
                entity.set_parent(parent_id);
                for child in children {
                    entity.link_child(child);
                }
            }
        }
    }

    fn keys_of(&self, ids: Vec<InstanceId>) -> Vec<ComponentKey> {
        let mut keys = Vec::new();
        for id in ids {
            if let Some(entity) = self.entity(id) {
                for index in 0..entity.components().len() {
                    keys.push(ComponentKey { entity: id, index });
                }
            }
        }
        keys
    }
}
