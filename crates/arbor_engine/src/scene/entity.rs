//! Entities: named, identified hierarchy nodes
//!
//! An entity owns an ordered component list (slot 0 is always the
//! [`Transform`]) and starts life detached, staging any children by value.
//! Insertion into a scene graph drains the staged list into real graph
//! vertices; from then on the child list is an identifier mirror of the
//! graph adjacency and all structural queries go through the scene graph.

use std::fmt;

use log::debug;

use crate::core::object::{InstanceId, Object, ObjectMeta};
use crate::core::registry::{Registry, RegistryError};
use crate::foundation::time::FrameClock;
use crate::graph::VertexNode;

use super::component::{Capabilities, Component, ComponentSlot, ScriptContext};
use super::message::Message;
use super::scene::SceneId;
use super::transform::Transform;

/// Named hierarchy node owning components and, while detached, staged
/// children
#[derive(Debug)]
pub struct Entity {
    meta: ObjectMeta,
    components: Vec<ComponentSlot>,
    staged: Vec<Entity>,
    children: Vec<InstanceId>,
    parent: Option<InstanceId>,
    scene: Option<SceneId>,
    active: bool,
}

impl Entity {
    /// Create a detached entity carrying a fresh [`Transform`] in slot 0
    ///
    /// # Errors
    ///
    /// Propagates [`RegistryError`] when identifiers cannot be issued for
    /// the entity or its transform.
    pub fn new(name: &str, registry: &Registry) -> Result<Self, RegistryError> {
        let mut entity = Self {
            meta: ObjectMeta::new(name),
            components: Vec::new(),
            staged: Vec::new(),
            children: Vec::new(),
            parent: None,
            scene: None,
            active: true,
        };
        registry.assign(&mut entity)?;
        entity.add_component(Transform::new(registry)?);
        Ok(entity)
    }

    /// Append a component, binding its owner reference and caching its
    /// capability tags
    pub fn add_component(&mut self, component: impl Component) {
        let mut slot = ComponentSlot::new(Box::new(component));
        if let Some(id) = self.meta.id() {
            slot.component_mut().component_meta_mut().set_entity(id);
        }
        self.components.push(slot);
    }

    /// Stage a child entity on this detached node
    ///
    /// A child whose identifier is already staged is silently ignored. The
    /// staged list is drained when the subtree is inserted into a scene
    /// graph.
    pub fn add_child(&mut self, child: Entity) {
        let duplicate = child
            .instance_id()
            .is_some_and(|id| self.staged.iter().any(|c| c.instance_id() == Some(id)));
        if duplicate {
            debug!("{self}: ignoring duplicate staged child {child}");
            return;
        }
        self.staged.push(child);
    }

    /// Ordered attachment slots
    #[must_use]
    pub fn components(&self) -> &[ComponentSlot] {
        &self.components
    }

    /// Attachment slot by index
    #[must_use]
    pub fn component(&self, index: usize) -> Option<&ComponentSlot> {
        self.components.get(index)
    }

    /// First attached component of concrete type `T`
    #[must_use]
    pub fn component_of<T: Component>(&self) -> Option<&T> {
        self.components
            .iter()
            .find_map(|slot| slot.component().as_any().downcast_ref::<T>())
    }

    /// First attached component of concrete type `T`, mutably
    pub fn component_of_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components
            .iter_mut()
            .find_map(|slot| slot.component_mut().as_any_mut().downcast_mut::<T>())
    }

    /// The slot-0 spatial transform
    #[must_use]
    pub fn transform(&self) -> Option<&Transform> {
        self.components.first().and_then(|s| s.component().as_transform())
    }

    /// The slot-0 spatial transform, mutably
    pub fn transform_mut(&mut self) -> Option<&mut Transform> {
        self.components
            .first_mut()
            .and_then(|s| s.component_mut().as_transform_mut())
    }

    /// Whether this entity participates in filtered traversals
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Identifier of the parent entity, once live
    #[must_use]
    pub fn parent(&self) -> Option<InstanceId> {
        self.parent
    }

    /// Identifiers of live children, mirroring the graph adjacency
    #[must_use]
    pub fn children(&self) -> &[InstanceId] {
        &self.children
    }

    /// Children staged on this detached entity
    #[must_use]
    pub fn staged_children(&self) -> &[Entity] {
        &self.staged
    }

    /// Identifier of the owning scene, once live
    #[must_use]
    pub fn scene(&self) -> Option<SceneId> {
        self.scene
    }

    /// Deliver one lifecycle message to this entity's components
    ///
    /// Inactive entities drop every message. `Activate` re-binds each
    /// component's owner reference and recurses into `Awake`;
    /// `SceneGraphUpdate` reaches only components with the scene-listener
    /// capability; the remaining kinds invoke the matching script callback
    /// on every script-capable slot in attachment order.
    pub fn send_message(&mut self, message: Message, clock: &FrameClock) {
        if !self.active {
            return;
        }
        match message {
            Message::Activate => {
                let Some(id) = self.meta.id() else { return };
                for slot in &mut self.components {
                    slot.component_mut().component_meta_mut().set_entity(id);
                }
                self.send_message(Message::Awake, clock);
            }
            Message::SceneGraphUpdate => self.notify_scene_graph_update(),
            _ => self.dispatch_script(message, clock),
        }
    }

    /// Components of every staged descendant, this entity's own excluded
    #[must_use]
    pub fn components_in_children(&self) -> Vec<&ComponentSlot> {
        let mut found = Vec::new();
        for child in &self.staged {
            child.collect_components(&mut found);
        }
        found
    }

    fn collect_components<'a>(&'a self, found: &mut Vec<&'a ComponentSlot>) {
        found.extend(self.components.iter());
        for child in &self.staged {
            child.collect_components(found);
        }
    }

    pub(crate) fn notify_scene_graph_update(&mut self) {
        for slot in &mut self.components {
            if slot.caps().contains(Capabilities::SCENE_LISTENER) {
                slot.component_mut().on_scene_graph_update();
            }
        }
    }

    fn dispatch_script(&mut self, message: Message, clock: &FrameClock) {
        let Some(entity) = self.meta.id() else { return };
        let entity_name = self.meta.name();
        let Some((first, rest)) = self.components.split_first_mut() else {
            return;
        };
        let Some(transform) = first.component_mut().as_transform_mut() else {
            return;
        };

        let mut ctx = ScriptContext {
            entity,
            entity_name,
            transform,
            clock,
        };
        for slot in rest {
            if !slot.caps().contains(Capabilities::SCRIPT) {
                continue;
            }
            let Some(script) = slot.component_mut().as_script_mut() else {
                continue;
            };
            match message {
                Message::Start => script.start(&mut ctx),
                Message::Awake => script.awake(&mut ctx),
                Message::Update => script.update(&mut ctx),
                Message::LateUpdate => script.late_update(&mut ctx),
                Message::FixedUpdate => script.fixed_update(&mut ctx),
                Message::GuiRender => script.gui_render(&mut ctx),
                Message::Activate | Message::SceneGraphUpdate => {}
            }
        }
    }

    pub(crate) fn take_staged(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.staged)
    }

    pub(crate) fn link_child(&mut self, child: InstanceId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub(crate) fn unlink_child(&mut self, child: InstanceId) {
        self.children.retain(|&c| c != child);
    }

    pub(crate) fn set_parent(&mut self, parent: Option<InstanceId>) {
        self.parent = parent;
    }

    pub(crate) fn set_active_flag(&mut self, active: bool) {
        self.active = active;
    }

    /// Scene binding is set once at insertion and retained thereafter.
    pub(crate) fn assign_scene(&mut self, scene: SceneId) {
        if self.scene.is_none() {
            self.scene = Some(scene);
        } else if self.scene != Some(scene) {
            debug!("{self}: already bound to a scene, keeping it");
        }
    }

    /// Release every component's identifier, then this entity's own.
    pub(crate) fn release(&mut self, registry: &Registry) {
        for slot in &mut self.components {
            registry.release_object(slot.component_mut());
        }
        registry.release_object(self);
    }
}

impl Object for Entity {
    fn object_meta(&self) -> &ObjectMeta {
        &self.meta
    }

    fn object_meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.meta
    }
}

impl VertexNode for Entity {
    fn node_id(&self) -> Option<InstanceId> {
        self.meta.id()
    }

    fn node_active(&self) -> bool {
        self.active
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.meta.describe("Entity"))
    }
}
