//! Component model
//!
//! Components are capability units owned by exactly one entity. Each type
//! reports its capability tags once; the tags are cached on the attachment
//! slot so per-message dispatch consults a bitset instead of probing with
//! downcasts.

use std::any::Any;
use std::fmt;

use bitflags::bitflags;

use crate::core::object::{InstanceId, Object, ObjectMeta};
use crate::foundation::time::FrameClock;

use super::transform::Transform;

bitflags! {
    /// Capability tags a component reports when it is attached
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// Receives script lifecycle callbacks
        const SCRIPT = 1 << 0;
        /// Receives the post-rebuild notification
        const SCENE_LISTENER = 1 << 1;
        /// Provides spatial placement
        const TRANSFORM = 1 << 2;
        /// Provides a projection for rendering
        const CAMERA = 1 << 3;
    }
}

/// Embeddable state backing every component
#[derive(Debug, Clone)]
pub struct ComponentMeta {
    object: ObjectMeta,
    entity: Option<InstanceId>,
    active: bool,
}

impl ComponentMeta {
    /// Fresh metadata for a detached, active component
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            object: ObjectMeta::new(name),
            entity: None,
            active: true,
        }
    }

    /// Object identity backing this component
    #[must_use]
    pub fn object(&self) -> &ObjectMeta {
        &self.object
    }

    /// Object identity backing this component, mutably
    pub fn object_mut(&mut self) -> &mut ObjectMeta {
        &mut self.object
    }

    /// Identifier of the owning entity, once attached
    #[must_use]
    pub fn entity(&self) -> Option<InstanceId> {
        self.entity
    }

    /// Whether the component's own active flag is set
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_entity(&mut self, entity: InstanceId) {
        self.entity = Some(entity);
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

/// Capability unit attached to exactly one entity
///
/// Implementors embed a [`ComponentMeta`] and report their capabilities;
/// everything else has workable defaults.
pub trait Component: Object + Any {
    /// Component bookkeeping shared by every implementation
    fn component_meta(&self) -> &ComponentMeta;

    /// Component bookkeeping, mutably
    fn component_meta_mut(&mut self) -> &mut ComponentMeta;

    /// Capability tags; resolved once at attach time, never re-queried
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    /// Script view, for components reporting [`Capabilities::SCRIPT`]
    fn as_script_mut(&mut self) -> Option<&mut dyn Script> {
        None
    }

    /// Transform view, for components reporting [`Capabilities::TRANSFORM`]
    fn as_transform(&self) -> Option<&Transform> {
        None
    }

    /// Transform view, mutably
    fn as_transform_mut(&mut self) -> Option<&mut Transform> {
        None
    }

    /// The owning scene graph finished a rebuild
    ///
    /// Delivered only to components reporting
    /// [`Capabilities::SCENE_LISTENER`].
    fn on_scene_graph_update(&mut self) {}

    /// Concrete-type escape hatch for consumers
    fn as_any(&self) -> &dyn Any;

    /// Concrete-type escape hatch, mutably
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Borrowed view of the owning entity handed to script callbacks
pub struct ScriptContext<'a> {
    /// Identifier of the entity the script is attached to
    pub entity: InstanceId,
    /// Name of the owning entity
    pub entity_name: &'a str,
    /// The owning entity's spatial transform (component slot 0)
    pub transform: &'a mut Transform,
    /// Frame timing for the current pass
    pub clock: &'a FrameClock,
}

/// Lifecycle callbacks for behavior components
///
/// Every callback has an empty default so scripts implement only what they
/// react to. `on_activate`/`on_deactivate` fire on the component's own
/// active-flag edges, not per delivered message.
#[allow(unused_variables)]
pub trait Script: Component {
    /// The component's active flag just flipped on
    fn on_activate(&mut self) {}

    /// The component's active flag just flipped off
    fn on_deactivate(&mut self) {}

    /// First message after the owning entity joins a live hierarchy
    fn awake(&mut self, ctx: &mut ScriptContext<'_>) {}

    /// Explicit start-of-life notification
    fn start(&mut self, ctx: &mut ScriptContext<'_>) {}

    /// Once per frame
    fn update(&mut self, ctx: &mut ScriptContext<'_>) {}

    /// After the frame's update pass
    fn late_update(&mut self, ctx: &mut ScriptContext<'_>) {}

    /// Once per due fixed time step
    fn fixed_update(&mut self, ctx: &mut ScriptContext<'_>) {}

    /// Immediate-mode UI pass
    fn gui_render(&mut self, ctx: &mut ScriptContext<'_>) {}

    /// Whether the component's own active flag is set
    fn is_active(&self) -> bool {
        self.component_meta().is_active()
    }

    /// Flip the active flag, firing the matching edge hook on change
    fn set_active(&mut self, active: bool) {
        if self.component_meta().is_active() == active {
            return;
        }
        self.component_meta_mut().set_active(active);
        if active {
            self.on_activate();
        } else {
            self.on_deactivate();
        }
    }
}

/// Attachment record pairing a boxed component with its cached capabilities
pub struct ComponentSlot {
    caps: Capabilities,
    component: Box<dyn Component>,
}

impl ComponentSlot {
    pub(crate) fn new(component: Box<dyn Component>) -> Self {
        let caps = component.capabilities();
        Self { caps, component }
    }

    /// Capability tags cached when the component was attached
    #[must_use]
    pub fn caps(&self) -> Capabilities {
        self.caps
    }

    /// The attached component
    #[must_use]
    pub fn component(&self) -> &dyn Component {
        self.component.as_ref()
    }

    /// The attached component, mutably
    pub fn component_mut(&mut self) -> &mut dyn Component {
        self.component.as_mut()
    }
}

impl fmt::Debug for ComponentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSlot")
            .field("caps", &self.caps)
            .field("component", &self.component.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blinker {
        meta: ComponentMeta,
        ons: u32,
        offs: u32,
    }

    impl Blinker {
        fn new() -> Self {
            Self {
                meta: ComponentMeta::new("Blinker"),
                ons: 0,
                offs: 0,
            }
        }
    }

    impl Object for Blinker {
        fn object_meta(&self) -> &ObjectMeta {
            self.meta.object()
        }

        fn object_meta_mut(&mut self) -> &mut ObjectMeta {
            self.meta.object_mut()
        }
    }

    impl Component for Blinker {
        fn component_meta(&self) -> &ComponentMeta {
            &self.meta
        }

        fn component_meta_mut(&mut self) -> &mut ComponentMeta {
            &mut self.meta
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::SCRIPT
        }

        fn as_script_mut(&mut self) -> Option<&mut dyn Script> {
            Some(self)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    impl Script for Blinker {
        fn on_activate(&mut self) {
            self.ons += 1;
        }

        fn on_deactivate(&mut self) {
            self.offs += 1;
        }
    }

    #[test]
    fn test_slot_caches_capabilities() {
        let slot = ComponentSlot::new(Box::new(Blinker::new()));
        assert_eq!(slot.caps(), Capabilities::SCRIPT);
        assert!(!slot.caps().contains(Capabilities::CAMERA));
    }

    #[test]
    fn test_set_active_fires_edge_hooks() {
        let mut blinker = Blinker::new();
        assert!(blinker.is_active());

        blinker.set_active(false);
        blinker.set_active(false); // no edge, no hook
        blinker.set_active(true);

        assert_eq!(blinker.offs, 1);
        assert_eq!(blinker.ons, 1);
    }

    #[test]
    fn test_components_start_detached() {
        let blinker = Blinker::new();
        assert_eq!(blinker.component_meta().entity(), None);
    }
}
