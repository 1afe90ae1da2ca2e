//! Scenes and scene-level derived caches
//!
//! A [`Scene`] owns one [`SceneGraph`] plus the caches derived from it, the
//! list of active cameras foremost. The camera cache is an ordinary
//! [`SceneGraphListener`]: after every rebuild it re-reads the component
//! cache, so it is always consistent with the last traversal and never
//! patched incrementally.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use log::{debug, info};

use crate::core::registry::Registry;
use crate::foundation::time::FrameClock;

use super::component::Capabilities;
use super::scene_graph::{ComponentKey, SceneError, SceneGraph, SceneGraphListener};

static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique scene identifier
///
/// Scene ids live in their own space, separate from instance identifiers
/// and vertex descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneId(u32);

impl SceneId {
    /// Claim the next unused scene identifier
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw identifier value
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

/// Hook populating a scene's graph on first load
pub type LoadFn = Box<dyn FnMut(&mut SceneGraph, &Registry, &FrameClock) -> Result<(), SceneError>>;

/// Hook run on scene activation or deactivation
pub type TransitionFn = Box<dyn FnMut()>;

/// Scene-level camera cache, rebuilt after every scene-graph update
///
/// Holds the component keys of every camera on an active entity, in
/// active-object order.
#[derive(Debug, Default)]
pub struct CameraCache {
    cameras: Vec<ComponentKey>,
}

impl CameraCache {
    /// Keys of the cameras found at the last rebuild
    #[must_use]
    pub fn cameras(&self) -> &[ComponentKey] {
        &self.cameras
    }
}

impl SceneGraphListener for CameraCache {
    fn on_scene_graph_update(&mut self, graph: &SceneGraph) {
        self.cameras.clear();
        for &key in graph.components() {
            let Some(slot) = graph.component(key) else {
                continue;
            };
            if slot.caps().contains(Capabilities::CAMERA) {
                self.cameras.push(key);
            }
        }
        debug!(
            "scene graph {}: camera cache holds {} entries",
            graph.scene_id(),
            self.cameras.len()
        );
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// A named entity tree with its derived caches and lifecycle hooks
///
/// Scenes are registered with the [`Engine`](crate::Engine) by name, loaded
/// on first push, and notified when they enter or leave the active stack.
pub struct Scene {
    id: SceneId,
    name: String,
    graph: SceneGraph,
    loaded: bool,
    load_fn: Option<LoadFn>,
    on_activate: Option<TransitionFn>,
    on_deactivate: Option<TransitionFn>,
}

impl Scene {
    /// Create an unloaded scene with an empty graph
    ///
    /// The camera cache is registered as a graph listener immediately, so
    /// it tracks every rebuild from the first one on.
    ///
    /// # Errors
    ///
    /// Propagates registry failures from creating the graph's root entity.
    pub fn new(name: &str, registry: &Registry) -> Result<Self, SceneError> {
        let id = SceneId::next();
        let mut graph = SceneGraph::new(id, registry)?;
        graph.add_listener(CameraCache::default());
        Ok(Self {
            id,
            name: name.to_owned(),
            graph,
            loaded: false,
            load_fn: None,
            on_activate: None,
            on_deactivate: None,
        })
    }

    /// Install the hook that populates the graph on first load
    #[must_use]
    pub fn with_load(
        mut self,
        load: impl FnMut(&mut SceneGraph, &Registry, &FrameClock) -> Result<(), SceneError> + 'static,
    ) -> Self {
        self.load_fn = Some(Box::new(load));
        self
    }

    /// Install the hook run each time the scene becomes active
    #[must_use]
    pub fn with_on_activate(mut self, hook: impl FnMut() + 'static) -> Self {
        self.on_activate = Some(Box::new(hook));
        self
    }

    /// Install the hook run each time the scene leaves the active stack
    #[must_use]
    pub fn with_on_deactivate(mut self, hook: impl FnMut() + 'static) -> Self {
        self.on_deactivate = Some(Box::new(hook));
        self
    }

    /// Run the load hook, once
    ///
    /// The first call populates the graph; every later call is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates failures from the load hook; the scene stays unloaded so
    /// a later attempt can retry.
    pub fn load(&mut self, registry: &Registry, clock: &FrameClock) -> Result<(), SceneError> {
        if self.loaded {
            return Ok(());
        }
        if let Some(load) = self.load_fn.as_mut() {
            load(&mut self.graph, registry, clock)?;
        }
        self.loaded = true;
        info!("scene '{}' loaded", self.name);
        Ok(())
    }

    /// Whether the load hook has run
    #[must_use]
    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub(crate) fn activate(&mut self) {
        if let Some(hook) = self.on_activate.as_mut() {
            hook();
        }
    }

    pub(crate) fn deactivate(&mut self) {
        if let Some(hook) = self.on_deactivate.as_mut() {
            hook();
        }
    }

    /// Keys of the cameras on active entities, from the last rebuild
    #[must_use]
    pub fn cameras(&self) -> &[ComponentKey] {
        self.graph
            .listener::<CameraCache>()
            .map_or(&[], CameraCache::cameras)
    }

    /// The scene's graph
    #[must_use]
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// The scene's graph, mutably
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// The scene's name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scene's identifier
    #[must_use]
    pub fn id(&self) -> SceneId {
        self.id
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("loaded", &self.loaded)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::scene::camera::Camera;
    use crate::scene::entity::Entity;

    fn clock() -> FrameClock {
        FrameClock::new()
    }

    #[test]
    fn test_scene_ids_are_distinct() {
        let registry = Registry::new();
        let a = Scene::new("a", &registry).unwrap();
        let b = Scene::new("b", &registry).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.graph().scene_id(), a.id());
    }

    #[test]
    fn test_load_runs_once() {
        let registry = Registry::new();
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let mut scene = Scene::new("counted", &registry).unwrap().with_load(
            move |_graph, _registry, _clock| {
                *counter.borrow_mut() += 1;
                Ok(())
            },
        );

        assert!(!scene.loaded());
        scene.load(&registry, &clock()).unwrap();
        scene.load(&registry, &clock()).unwrap();

        assert!(scene.loaded());
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_load_hook_populates_graph() {
        let registry = Registry::new();
        let mut scene = Scene::new("populated", &registry).unwrap().with_load(
            |graph, registry, clock| {
                let probe = Entity::new("probe", registry)?;
                graph.add_game_object(probe, None, clock)?;
                Ok(())
            },
        );

        scene.load(&registry, &clock()).unwrap();

        assert_eq!(scene.graph().active().len(), 2); // root + probe
    }

    #[test]
    fn test_camera_cache_tracks_rebuilds() {
        let registry = Registry::new();
        let mut scene = Scene::new("shots", &registry).unwrap();

        let mut rig = Entity::new("rig", &registry).unwrap();
        rig.add_component(Camera::new(&registry).unwrap());
        let rig_id = scene
            .graph_mut()
            .add_game_object(rig, None, &clock())
            .unwrap();

        // insertion rebuilt synchronously; the camera is the rig's slot 1
        assert_eq!(scene.cameras().len(), 1);
        assert_eq!(scene.cameras()[0], ComponentKey { entity: rig_id, index: 1 });

        scene.graph_mut().set_active(rig_id, false).unwrap();
        scene.graph_mut().update();
        assert!(scene.cameras().is_empty());

        scene.graph_mut().set_active(rig_id, true).unwrap();
        scene.graph_mut().update();
        assert_eq!(scene.cameras().len(), 1);
    }

    #[test]
    fn test_transition_hooks_fire() {
        let registry = Registry::new();
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::default();
        let on = Rc::clone(&log);
        let off = Rc::clone(&log);
        let mut scene = Scene::new("doors", &registry)
            .unwrap()
            .with_on_activate(move || on.borrow_mut().push("activate"))
            .with_on_deactivate(move || off.borrow_mut().push("deactivate"));

        scene.activate();
        scene.deactivate();

        assert_eq!(log.borrow().as_slice(), ["activate", "deactivate"]);
    }
}
