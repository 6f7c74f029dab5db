use kinetic_engine::{
    Color, Engine, EngineConfig, EntityId, FixedContainer, ManualClock, ManualScheduler,
    RecordingSurface, SceneRuntime, SurfaceCall, TouchId, Vec2,
};

use super::*;

type DemoEngine = Engine<RecordingSurface, ManualScheduler>;

fn demo_engine(config: DemoConfig) -> DemoEngine {
    let clock = ManualClock::new();
    let mut engine = Engine::new(
        EngineConfig::default(),
        Box::new(FixedContainer::new(800.0, 600.0)),
        RecordingSurface::new(),
        ManualScheduler::new(),
    )
    .with_clock(Box::new(clock));
    for (name, scene) in build_scenes(&config) {
        engine.add_scene(name, scene);
    }
    engine.initialize().expect("initialize");
    engine.load_scene(DEMO_SCENE_NAME).expect("load demo");
    engine.start();
    engine
}

fn step(engine: &mut DemoEngine) {
    let request = engine
        .scheduler_mut()
        .take_pending()
        .expect("frame should be pending");
    engine.on_frame(request);
}

fn the_box(engine: &DemoEngine) -> EntityId {
    engine
        .current_scene()
        .expect("current scene")
        .find_object_by_name(engine.world(), BOX_NAME)
        .expect("box")
}

fn box_position(engine: &DemoEngine) -> Vec2 {
    let id = the_box(engine);
    engine.world().get(id).expect("box object").position()
}

fn last_fill(engine: &DemoEngine) -> Option<Color> {
    engine
        .surface()
        .calls()
        .iter()
        .rev()
        .find_map(|call| match call {
            SurfaceCall::SetFillStyle(color) => Some(*color),
            _ => None,
        })
}

#[test]
fn demo_scene_spawns_one_box_with_both_components() {
    let engine = demo_engine(DemoConfig::default());
    let id = the_box(&engine);
    let object = engine.world().get(id).expect("box object");

    assert_eq!(engine.current_scene().expect("scene").object_count(), 1);
    assert_eq!(object.position(), Vec2::new(400.0, 300.0));
    assert_eq!(object.size().width, 100.0);
    assert!(object.has_component::<BoxRenderer>());
    assert!(object.has_component::<Draggable>());
}

#[test]
fn pressing_inside_the_box_drags_it_with_the_grab_offset() {
    let mut engine = demo_engine(DemoConfig::default());
    let touches = engine.input_mut().touch_handler_mut();
    touches.press(TouchId::PRIMARY, 410.0, 310.0);
    step(&mut engine);
    assert!(engine
        .world()
        .get_component::<Draggable>(the_box(&engine))
        .expect("draggable")
        .is_dragging());

    engine
        .input_mut()
        .touch_handler_mut()
        .move_to(TouchId::PRIMARY, 450.0, 350.0);
    step(&mut engine);
    assert_eq!(box_position(&engine), Vec2::new(440.0, 340.0));

    engine.input_mut().touch_handler_mut().release(TouchId::PRIMARY);
    step(&mut engine);
    assert_eq!(box_position(&engine), Vec2::new(440.0, 340.0));
    assert!(!engine
        .world()
        .get_component::<Draggable>(the_box(&engine))
        .expect("draggable")
        .is_dragging());
}

#[test]
fn pressing_outside_the_box_leaves_it_in_place() {
    let mut engine = demo_engine(DemoConfig::default());
    engine
        .input_mut()
        .touch_handler_mut()
        .press(TouchId::PRIMARY, 10.0, 10.0);
    step(&mut engine);
    engine
        .input_mut()
        .touch_handler_mut()
        .move_to(TouchId::PRIMARY, 200.0, 200.0);
    step(&mut engine);

    assert_eq!(box_position(&engine), Vec2::new(400.0, 300.0));
}

#[test]
fn hover_switches_fill_colour() {
    let mut engine = demo_engine(DemoConfig::default());
    assert_eq!(last_fill(&engine), Some(NORMAL_COLOR));

    engine
        .input_mut()
        .touch_handler_mut()
        .press(TouchId::PRIMARY, 420.0, 280.0);
    step(&mut engine);

    assert_eq!(last_fill(&engine), Some(HOVER_COLOR));
}

#[test]
fn box_is_drawn_centred_on_its_position() {
    let engine = demo_engine(DemoConfig::default());
    assert!(engine.surface().calls().contains(&SurfaceCall::FillRect {
        x: -50.0,
        y: -50.0,
        width: 100.0,
        height: 100.0,
    }));
}

#[test]
fn invalid_colours_fall_back_to_defaults() {
    let engine = demo_engine(DemoConfig {
        color: "not-a-colour".to_string(),
        ..DemoConfig::default()
    });
    assert_eq!(last_fill(&engine), Some(NORMAL_COLOR));
}

#[test]
fn unloading_despawns_the_box() {
    let mut world = World::new();
    let mut runtime = SceneRuntime::new(
        DEMO_SCENE_NAME,
        Box::new(DragBoxScene::new(DemoConfig::default())),
    );
    runtime.load(&mut world).expect("load");
    assert_eq!(world.len(), 1);

    runtime.unload(&mut world);

    assert!(world.is_empty());
}
