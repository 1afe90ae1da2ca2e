//! Engine context and frame loop
//!
//! The [`Engine`] is the explicit context object the rest of the crate is
//! threaded through: it owns the instance database, the frame clock, the
//! scene table and the active-scene stack, and it drives the per-frame
//! passes against whichever scene sits on top of the stack. There is no
//! global "current application"; single-instance semantics fall out of
//! ordinary ownership.

use std::collections::HashMap;

use log::{debug, info};
use thiserror::Error;

use crate::core::config::EngineConfig;
use crate::core::object::InstanceId;
use crate::core::registry::Registry;
use crate::foundation::time::FrameClock;
use crate::scene::{Message, Scene, SceneError};

/// Errors raised by engine setup and scene management
#[derive(Debug, Error)]
pub enum EngineError {
    /// The configuration failed validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A scene with this name is already in the table
    #[error("scene '{0}' already registered")]
    SceneAlreadyRegistered(String),

    /// No scene with this name is in the table
    #[error("scene '{0}' not registered")]
    SceneNotRegistered(String),

    /// A scene-graph mutation failed
    #[error("scene error: {0}")]
    Scene(#[from] SceneError),
}

/// Owner of the registry, the clock and the scene stack; drives frames
///
/// Each frame runs the passes of the original loop headlessly: rebuild if
/// dirty, broadcast `Update` and `LateUpdate`, replay due fixed steps up to
/// the configured cap, then broadcast `GuiRender`. Every pass re-checks the
/// dirty flag first, so structural changes made by scripts are visible to
/// the very next pass.
pub struct Engine {
    registry: Registry,
    clock: FrameClock,
    config: EngineConfig,
    scenes: HashMap<String, Scene>,
    stack: Vec<String>,
    running: bool,
}

impl Engine {
    /// Create an engine from a validated configuration
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] when the configuration fails
    /// validation.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::InvalidConfig)?;
        info!("engine '{}' initializing", config.app_name);
        let clock = FrameClock::with_fixed_step(config.fixed_time_step);
        Ok(Self {
            registry: Registry::new(),
            clock,
            config,
            scenes: HashMap::new(),
            stack: Vec::new(),
            running: true,
        })
    }

    /// Add a scene to the table
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SceneAlreadyRegistered`] when the name is
    /// taken; the table is unchanged.
    pub fn register_scene(&mut self, scene: Scene) -> Result<(), EngineError> {
        let name = scene.name().to_owned();
        if self.scenes.contains_key(&name) {
            return Err(EngineError::SceneAlreadyRegistered(name));
        }
        debug!("registered scene '{name}'");
        self.scenes.insert(name, scene);
        Ok(())
    }

    /// Push a registered scene onto the active stack
    ///
    /// The scene is loaded first if it never was, then its activate hook
    /// runs.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SceneNotRegistered`] for unknown names and
    /// propagates load-hook failures.
    pub fn push_scene(&mut self, name: &str) -> Result<(), EngineError> {
        let scene = self
            .scenes
            .get_mut(name)
            .ok_or_else(|| EngineError::SceneNotRegistered(name.to_owned()))?;
        scene.load(&self.registry, &self.clock)?;
        self.stack.push(name.to_owned());
        scene.activate();
        info!("scene '{name}' pushed, stack depth {}", self.stack.len());
        Ok(())
    }

    /// Pop the top of the active stack, running its deactivate hook
    ///
    /// Returns the popped scene's name, or `None` for an empty stack.
    pub fn pop_scene(&mut self) -> Option<String> {
        let name = self.stack.pop()?;
        if let Some(scene) = self.scenes.get_mut(&name) {
            scene.deactivate();
        }
        info!("scene '{name}' popped");
        Some(name)
    }

    /// Swap the top of the stack for another registered scene
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SceneNotRegistered`] for unknown names; the
    /// stack is unchanged on failure.
    pub fn replace_scene(&mut self, name: &str) -> Result<(), EngineError> {
        if !self.scenes.contains_key(name) {
            return Err(EngineError::SceneNotRegistered(name.to_owned()));
        }
        self.pop_scene();
        self.push_scene(name)
    }

    /// Clear the whole stack, then push one registered scene
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SceneNotRegistered`] for unknown names; the
    /// stack is unchanged on failure.
    pub fn purge_push_scene(&mut self, name: &str) -> Result<(), EngineError> {
        if !self.scenes.contains_key(name) {
            return Err(EngineError::SceneNotRegistered(name.to_owned()));
        }
        while self.pop_scene().is_some() {}
        self.push_scene(name)
    }

    /// The scene on top of the active stack
    #[must_use]
    pub fn active_scene(&self) -> Option<&Scene> {
        self.stack.last().and_then(|name| self.scenes.get(name))
    }

    /// The scene on top of the active stack, mutably
    pub fn active_scene_mut(&mut self) -> Option<&mut Scene> {
        let name = self.stack.last()?;
        self.scenes.get_mut(name)
    }

    /// A registered scene by name
    #[must_use]
    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.get(name)
    }

    /// A registered scene by name, mutably
    pub fn scene_mut(&mut self, name: &str) -> Option<&mut Scene> {
        self.scenes.get_mut(name)
    }

    /// Whether a scene with this name is in the table
    #[must_use]
    pub fn scene_registered(&self, name: &str) -> bool {
        self.scenes.contains_key(name)
    }

    /// Number of registered scenes
    #[must_use]
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Depth of the active-scene stack
    #[must_use]
    pub fn active_scene_count(&self) -> usize {
        self.stack.len()
    }

    /// Run one frame against the wall clock
    pub fn frame(&mut self) {
        let dt = self.clock.measure();
        self.frame_with_delta(dt);
    }

    /// Run one frame with an explicit delta in seconds
    ///
    /// Deterministic variant for headless and test runs.
    pub fn frame_with_delta(&mut self, dt: f32) {
        self.clock.advance(dt);

        self.pass(Message::Update);
        self.pass(Message::LateUpdate);

        let mut replayed = 0;
        while self.clock.fixed_due() && replayed < self.config.max_frame_skip {
            self.clock.fixed_tick();
            self.pass(Message::FixedUpdate);
            replayed += 1;
        }

        self.pass(Message::GuiRender);
        self.clock.frame_end();
    }

    /// Step up to `frames` wall-clock frames, stopping early on quit
    pub fn run(&mut self, frames: u64) {
        for _ in 0..frames {
            if !self.running {
                break;
            }
            self.frame();
        }
    }

    /// Request shutdown; the current frame still completes
    pub fn quit(&mut self) {
        info!("engine shutdown requested");
        self.running = false;
    }

    /// Whether the engine is still accepting frames
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Pop every active scene, drop the table, and drain the registry
    pub fn shutdown(&mut self) {
        while self.pop_scene().is_some() {}
        self.scenes.clear();
        self.registry.release_all();
        self.running = false;
        info!("engine '{}' shut down", self.config.app_name);
    }

    /// Destroy an entity subtree in the active scene
    ///
    /// Convenience over [`SceneGraph::destroy`](crate::scene::SceneGraph::destroy)
    /// that supplies the engine's registry for identifier retirement.
    ///
    /// # Errors
    ///
    /// Fails when no scene is active or when the scene graph rejects the
    /// destruction (unknown id, root entity).
    pub fn destroy_entity(&mut self, id: InstanceId) -> Result<(), EngineError> {
        let Some(name) = self.stack.last() else {
            return Err(EngineError::Scene(SceneError::EntityNotFound(id)));
        };
        let scene = self
            .scenes
            .get_mut(name)
            .ok_or_else(|| EngineError::SceneNotRegistered(name.clone()))?;
        scene.graph_mut().destroy(id, &self.registry)?;
        Ok(())
    }

    /// The instance database
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The frame clock
    #[must_use]
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// The engine configuration
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// One broadcast pass over the active scene, rebuilding first if dirty.
    fn pass(&mut self, message: Message) {
        let Some(name) = self.stack.last() else {
            return;
        };
        let Some(scene) = self.scenes.get_mut(name) else {
            return;
        };
        let graph = scene.graph_mut();
        if graph.dirty() {
            graph.update();
        }
        graph.send_message(message, &self.clock);
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::core::object::{Object, ObjectMeta};
    use crate::scene::component::{
        Capabilities, Component, ComponentMeta, Script, ScriptContext,
    };
    use crate::scene::Entity;

    type SharedLog = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        meta: ComponentMeta,
        log: SharedLog,
    }

    impl Recorder {
        fn new(log: &SharedLog) -> Self {
            Self {
                meta: ComponentMeta::new("Recorder"),
                log: Rc::clone(log),
            }
        }
    }

    impl Object for Recorder {
        fn object_meta(&self) -> &ObjectMeta {
            self.meta.object()
        }

        fn object_meta_mut(&mut self) -> &mut ObjectMeta {
            self.meta.object_mut()
        }
    }

    impl Component for Recorder {
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

    impl Script for Recorder {
        fn update(&mut self, _ctx: &mut ScriptContext<'_>) {
            self.log.borrow_mut().push("update".to_owned());
        }

        fn late_update(&mut self, _ctx: &mut ScriptContext<'_>) {
            self.log.borrow_mut().push("late".to_owned());
        }

        fn fixed_update(&mut self, _ctx: &mut ScriptContext<'_>) {
            self.log.borrow_mut().push("fixed".to_owned());
        }

        fn gui_render(&mut self, _ctx: &mut ScriptContext<'_>) {
            self.log.borrow_mut().push("gui".to_owned());
        }
    }

    fn engine() -> Engine {
        Engine::new(EngineConfig::new("test")).unwrap()
    }

    fn engine_with_recorder(log: &SharedLog) -> Engine {
        let mut engine = engine();
        let log = Rc::clone(log);
        let scene = Scene::new("main", engine.registry())
            .unwrap()
            .with_load(move |graph, registry, clock| {
                let mut probe = Entity::new("probe", registry)?;
                probe.add_component(Recorder::new(&log));
                graph.add_game_object(probe, None, clock)?;
                Ok(())
            });
        engine.register_scene(scene).unwrap();
        engine.push_scene("main").unwrap();
        engine
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            Engine::new(EngineConfig::new("")),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_duplicate_registration_keeps_table() {
        let mut engine = engine();
        let first = Scene::new("dup", engine.registry()).unwrap();
        let second = Scene::new("dup", engine.registry()).unwrap();

        engine.register_scene(first).unwrap();
        assert!(matches!(
            engine.register_scene(second),
            Err(EngineError::SceneAlreadyRegistered(_))
        ));
        assert_eq!(engine.scene_count(), 1);
        assert!(engine.push_scene("dup").is_ok());
    }

    #[test]
    fn test_push_unregistered_fails() {
        let mut engine = engine();
        assert!(matches!(
            engine.push_scene("ghost"),
            Err(EngineError::SceneNotRegistered(_))
        ));
        assert_eq!(engine.active_scene_count(), 0);
    }

    #[test]
    fn test_push_loads_once_and_activates() {
        let mut engine = engine();
        let events: SharedLog = Rc::default();
        let loads = Rc::clone(&events);
        let ons = Rc::clone(&events);
        let scene = Scene::new("main", engine.registry())
            .unwrap()
            .with_load(move |_g, _r, _c| {
                loads.borrow_mut().push("load".to_owned());
                Ok(())
            })
            .with_on_activate(move || ons.borrow_mut().push("on".to_owned()));
        engine.register_scene(scene).unwrap();

        engine.push_scene("main").unwrap();
        engine.pop_scene();
        engine.push_scene("main").unwrap();

        // the load hook ran once, the activate hook per push
        assert_eq!(events.borrow().as_slice(), ["load", "on", "on"]);
    }

    #[test]
    fn test_stack_ops() {
        let mut engine = engine();
        for name in ["a", "b", "c"] {
            let scene = Scene::new(name, engine.registry()).unwrap();
            engine.register_scene(scene).unwrap();
        }

        engine.push_scene("a").unwrap();
        engine.push_scene("b").unwrap();
        assert_eq!(engine.active_scene().unwrap().name(), "b");

        engine.replace_scene("c").unwrap();
        assert_eq!(engine.active_scene().unwrap().name(), "c");
        assert_eq!(engine.active_scene_count(), 2);

        engine.purge_push_scene("b").unwrap();
        assert_eq!(engine.active_scene_count(), 1);
        assert_eq!(engine.active_scene().unwrap().name(), "b");

        assert_eq!(engine.pop_scene(), Some("b".to_owned()));
        assert_eq!(engine.pop_scene(), None);
        assert!(engine.active_scene().is_none());
    }

    #[test]
    fn test_frame_pass_order() {
        let log: SharedLog = Rc::default();
        let mut engine = engine_with_recorder(&log);
        log.borrow_mut().clear();

        // half a fixed step: no fixed pass this frame
        engine.frame_with_delta(0.025);

        assert_eq!(log.borrow().as_slice(), ["update", "late", "gui"]);
        assert_eq!(engine.clock().frame(), 1);
    }

    #[test]
    fn test_fixed_steps_replayed_and_capped() {
        let log: SharedLog = Rc::default();
        let mut engine = engine_with_recorder(&log);
        log.borrow_mut().clear();

        // 2.5 fixed periods owe two fixed passes
        engine.frame_with_delta(0.125);
        let fixed = log.borrow().iter().filter(|e| *e == "fixed").count();
        assert_eq!(fixed, 2);

        // far behind wall time: the cap bounds the replay
        log.borrow_mut().clear();
        engine.frame_with_delta(10.0);
        let fixed = log.borrow().iter().filter(|e| *e == "fixed").count();
        assert_eq!(fixed, 5);
    }

    #[test]
    fn test_frame_without_active_scene_is_harmless() {
        let mut engine = engine();
        engine.frame_with_delta(0.016);
        assert_eq!(engine.clock().frame(), 1);
    }

    #[test]
    fn test_run_stops_on_quit() {
        let mut engine = engine();
        engine.quit();
        engine.run(10);
        assert_eq!(engine.clock().frame(), 0);
        assert!(!engine.is_running());
    }

    #[test]
    fn test_shutdown_drains_everything() {
        let log: SharedLog = Rc::default();
        let mut engine = engine_with_recorder(&log);
        assert!(!engine.registry().is_empty());

        engine.shutdown();

        assert_eq!(engine.scene_count(), 0);
        assert_eq!(engine.active_scene_count(), 0);
        assert!(engine.registry().is_empty());
        assert!(!engine.is_running());
    }

    #[test]
    fn test_dirty_graph_rebuilt_before_pass() {
        let log: SharedLog = Rc::default();
        let mut engine = engine_with_recorder(&log);

        // a second entity added without an explicit update(): the next
        // frame's first pass must see it
        let registry_len = engine.registry().len();
        let probe = {
            let mut probe = Entity::new("late-joiner", engine.registry()).unwrap();
            probe.add_component(Recorder::new(&log));
            probe
        };
        let scene = engine.active_scene_mut().unwrap();
        scene.graph_mut().set_dirty();
        let clock = FrameClock::new();
        scene.graph_mut().add_game_object(probe, None, &clock).unwrap();
        assert!(engine.registry().len() > registry_len);
        log.borrow_mut().clear();

        engine.frame_with_delta(0.01);
        let updates = log.borrow().iter().filter(|e| *e == "update").count();
        assert_eq!(updates, 2);
    }
}
