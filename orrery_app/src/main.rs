//! Orrery demo application
//!
//! Exercises the engine headlessly: a sun -> planet -> moon hierarchy with
//! spin scripts and a camera, stepped for a fixed number of frames, then a
//! subtree destroyed before shutdown.

use std::any::Any;

use arbor_engine::prelude::*;

/// Script spinning its entity around the Y axis at a fixed rate.
struct Spin {
    meta: ComponentMeta,
    rate: f32,
}

impl Spin {
    fn new(rate: f32) -> Self {
        Self {
            meta: ComponentMeta::new("Spin"),
            rate,
        }
    }
}

impl Object for Spin {
    fn object_meta(&self) -> &ObjectMeta {
        self.meta.object()
    }

    fn object_meta_mut(&mut self) -> &mut ObjectMeta {
        self.meta.object_mut()
    }
}

impl Component for Spin {
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

impl Script for Spin {
    fn awake(&mut self, ctx: &mut ScriptContext<'_>) {
        log::info!("{} woke up", ctx.entity_name);
    }

    fn update(&mut self, ctx: &mut ScriptContext<'_>) {
        let angle = self.rate * ctx.clock.delta_time();
        ctx.transform.rotation = Quat::from_axis_angle(&Vec3::y_axis(), angle) * ctx.transform.rotation;
    }
}

fn build_orrery(
    graph: &mut SceneGraph,
    registry: &Registry,
    clock: &FrameClock,
) -> Result<(), SceneError> {
    let mut moon = Entity::new("moon", registry)?;
    moon.transform_mut().unwrap().position = Vec3::new(2.0, 0.0, 0.0);
    moon.add_component(Spin::new(2.0));

    let mut planet = Entity::new("planet", registry)?;
    planet.transform_mut().unwrap().position = Vec3::new(10.0, 0.0, 0.0);
    planet.add_component(Spin::new(0.5));
    planet.add_child(moon);

    let mut sun = Entity::new("sun", registry)?;
    sun.add_component(Spin::new(0.1));
    sun.add_child(planet);
    graph.add_game_object(sun, None, clock)?;

    let mut rig = Entity::new("camera-rig", registry)?;
    rig.transform_mut().unwrap().position = Vec3::new(0.0, 5.0, 40.0);
    rig.add_component(Camera::new(registry)?);
    graph.add_game_object(rig, None, clock)?;

    Ok(())
}

fn log_traversal(scene: &Scene) {
    let graph = scene.graph();
    for &id in graph.active() {
        if let Some(entity) = graph.entity(id) {
            let depth = graph.ancestors(id).len();
            log::info!("{}{} ({id})", "  ".repeat(depth), entity.name());
        }
    }
    log::info!("{} active cameras", scene.cameras().len());
}

fn run() -> Result<(), EngineError> {
    let config = EngineConfig::new("orrery").with_fixed_time_step(0.05);
    let mut engine = Engine::new(config)?;

    let scene = Scene::new("orrery", engine.registry())?.with_load(build_orrery);
    engine.register_scene(scene)?;
    engine.push_scene("orrery")?;

    for _ in 0..120 {
        engine.frame_with_delta(1.0 / 60.0);
    }

    let scene = engine.active_scene().expect("a scene was just pushed");
    log_traversal(scene);

    // tear the planet (and its moon) out of the sky
    let planet = scene
        .graph()
        .active()
        .iter()
        .copied()
        .find(|&id| scene.graph().entity(id).is_some_and(|e| e.name() == "planet"))
        .expect("the load hook inserted a planet");
    engine.destroy_entity(planet)?;
    engine.frame_with_delta(1.0 / 60.0);

    let scene = engine.active_scene().expect("scene still active");
    log_traversal(scene);

    engine.shutdown();
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        log::error!("orrery failed: {err}");
        std::process::exit(1);
    }
}
