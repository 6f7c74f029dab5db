use std::error::Error as StdError;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::input::InputManager;
use super::rendering::Surface;
use super::signal::Signal;
use super::world::{EntityId, GameObject, GameObjectConfig, World};

static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneId(u64);

impl SceneId {
    fn next() -> Self {
        Self(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

pub type LoadError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene '{scene}' failed to load: {source}")]
    LoadFailed {
        scene: String,
        #[source]
        source: LoadError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    Unloaded,
    Loading,
    Loaded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneEvent {
    Loaded,
    Error(String),
    Unload,
    Unloaded,
    ObjectAdded(EntityId),
    ObjectRemoved(EntityId),
    Enter,
    Exit,
    Paused,
    Resumed,
}

/// Per-scene behaviour. Only the load step is required.
pub trait Scene {
    fn on_load(&mut self, ctx: &mut SceneContext<'_>) -> Result<(), LoadError>;

    /// Runs after the registry was cleared; `released` lists the former roots.
    fn on_unload(&mut self, _world: &mut World, _released: &[EntityId]) {}

    fn on_enter(&mut self, _world: &mut World) {}

    fn on_exit(&mut self, _world: &mut World) {}
}

/// Handed to `Scene::on_load`.
pub struct SceneContext<'a> {
    scene: SceneId,
    state: SceneState,
    world: &'a mut World,
    objects: &'a mut Vec<EntityId>,
    events: &'a mut Signal<SceneEvent>,
    spawned: Vec<EntityId>,
}

impl<'a> SceneContext<'a> {
    pub fn scene_id(&self) -> SceneId {
        self.scene
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    pub fn world(&self) -> &World {
        &*self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut *self.world
    }

    /// Spawns an entity without registering it. If the load step fails, the
    /// entity and its descendants are despawned.
    pub fn spawn(&mut self, config: GameObjectConfig) -> EntityId {
        let id = self.world.spawn(config);
        self.spawned.push(id);
        id
    }

    /// Spawns an entity and registers it as a root of this scene.
    pub fn spawn_object(&mut self, config: GameObjectConfig) -> EntityId {
        let id = self.spawn(config);
        self.add_object(id);
        id
    }

    pub fn add_object(&mut self, id: EntityId) -> bool {
        register(self.scene, self.world, self.objects, self.events, id)
    }

    pub fn remove_object(&mut self, id: EntityId) -> bool {
        unregister(self.scene, self.world, self.objects, self.events, id)
    }
}

fn register(
    scene: SceneId,
    world: &mut World,
    objects: &mut Vec<EntityId>,
    events: &mut Signal<SceneEvent>,
    id: EntityId,
) -> bool {
    if objects.contains(&id) {
        return false;
    }
    let previous = match world.get(id) {
        Some(object) => object.scene(),
        None => {
            warn!(entity = ?id, "scene_add_missing_entity");
            return false;
        }
    };
    if let Some(previous) = previous.filter(|previous| *previous != scene) {
        warn!(entity = ?id, previous = previous.raw(), "entity_already_in_other_scene");
    }
    world.set_scene(id, Some(scene));
    objects.push(id);
    debug!(entity = ?id, scene = scene.raw(), "scene_object_added");
    events.emit(&SceneEvent::ObjectAdded(id));
    true
}

fn unregister(
    scene: SceneId,
    world: &mut World,
    objects: &mut Vec<EntityId>,
    events: &mut Signal<SceneEvent>,
    id: EntityId,
) -> bool {
    let Some(index) = objects.iter().position(|entry| *entry == id) else {
        return false;
    };
    objects.remove(index);
    if world.get(id).and_then(GameObject::scene) == Some(scene) {
        world.set_scene(id, None);
    }
    debug!(entity = ?id, scene = scene.raw(), "scene_object_removed");
    events.emit(&SceneEvent::ObjectRemoved(id));
    true
}

/// A scene behaviour plus its lifecycle state and root registry.
pub struct SceneRuntime {
    id: SceneId,
    name: String,
    scene: Box<dyn Scene>,
    state: SceneState,
    objects: Vec<EntityId>,
    pub events: Signal<SceneEvent>,
}

impl std::fmt::Debug for SceneRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneRuntime")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("objects", &self.objects.len())
            .finish()
    }
}

impl SceneRuntime {
    pub fn new(name: impl Into<String>, scene: Box<dyn Scene>) -> Self {
        Self {
            id: SceneId::next(),
            name: name.into(),
            scene,
            state: SceneState::Unloaded,
            objects: Vec::new(),
            events: Signal::default(),
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == SceneState::Loaded
    }

    /// Registered roots in insertion order. Roots despawned straight through
    /// the world stay listed until the next `update` or `prune_despawned`.
    pub fn objects(&self) -> &[EntityId] {
        &self.objects
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Drops registered roots that no longer exist in the world. Returns how
    /// many were dropped.
    pub fn prune_despawned(&mut self, world: &World) -> usize {
        let Self {
            id,
            objects,
            events,
            ..
        } = self;
        let before = objects.len();
        objects.retain(|entity| {
            if world.contains(*entity) {
                return true;
            }
            debug!(entity = ?entity, scene = id.raw(), "scene_object_despawned");
            events.emit(&SceneEvent::ObjectRemoved(*entity));
            false
        });
        before - objects.len()
    }

    /// Runs the load step once. Calling it on a loaded scene does nothing.
    pub fn load(&mut self, world: &mut World) -> Result<(), SceneError> {
        if self.state != SceneState::Unloaded {
            debug!(scene = self.name.as_str(), state = ?self.state, "scene_load_skipped");
            return Ok(());
        }

        self.state = SceneState::Loading;
        let (result, spawned) = {
            let Self {
                id,
                scene,
                state,
                objects,
                events,
                ..
            } = self;
            let mut ctx = SceneContext {
                scene: *id,
                state: *state,
                world: &mut *world,
                objects,
                events,
                spawned: Vec::new(),
            };
            let result = scene.on_load(&mut ctx);
            (result, ctx.spawned)
        };

        match result {
            Ok(()) => {
                self.state = SceneState::Loaded;
                info!(
                    scene = self.name.as_str(),
                    objects = self.objects.len(),
                    "scene_loaded"
                );
                self.events.emit(&SceneEvent::Loaded);
                Ok(())
            }
            Err(source) => {
                self.state = SceneState::Unloaded;
                self.release_objects(world);
                let despawned: usize = spawned
                    .into_iter()
                    .map(|id| world.despawn_recursive(id))
                    .sum();
                warn!(
                    scene = self.name.as_str(),
                    despawned,
                    error = %source,
                    "scene_load_failed"
                );
                self.events.emit(&SceneEvent::Error(source.to_string()));
                Err(SceneError::LoadFailed {
                    scene: self.name.clone(),
                    source,
                })
            }
        }
    }

    /// Clears the registry and returns to `Unloaded`. Entities stay in the
    /// world; `Scene::on_unload` decides whether to despawn them.
    pub fn unload(&mut self, world: &mut World) {
        if self.state != SceneState::Loaded {
            return;
        }
        self.events.emit(&SceneEvent::Unload);
        let released = self.release_objects(world);
        self.state = SceneState::Unloaded;
        self.scene.on_unload(world, &released);
        info!(
            scene = self.name.as_str(),
            released = released.len(),
            "scene_unloaded"
        );
        self.events.emit(&SceneEvent::Unloaded);
    }

    fn release_objects(&mut self, world: &mut World) -> Vec<EntityId> {
        let released = std::mem::take(&mut self.objects);
        for id in &released {
            if world.get(*id).and_then(GameObject::scene) == Some(self.id) {
                world.set_scene(*id, None);
            }
        }
        released
    }

    pub fn add_object(&mut self, world: &mut World, id: EntityId) -> bool {
        register(self.id, world, &mut self.objects, &mut self.events, id)
    }

    pub fn remove_object(&mut self, world: &mut World, id: EntityId) -> bool {
        unregister(self.id, world, &mut self.objects, &mut self.events, id)
    }

    /// Unregisters the entity and despawns it. Its children are orphaned.
    pub fn destroy_object(&mut self, world: &mut World, id: EntityId) -> bool {
        let removed = self.remove_object(world, id);
        world.despawn(id) || removed
    }

    /// Updates each registered root; children are reached through their parent.
    /// Roots despawned before or during the pass are dropped from the registry.
    pub fn update(&mut self, world: &mut World, delta_seconds: f32, input: &InputManager) {
        self.prune_despawned(world);
        let roots = self.objects.clone();
        for id in roots {
            world.update_object(id, delta_seconds, input);
        }
        self.prune_despawned(world);
    }

    pub fn render(&self, world: &World, input: &InputManager, surface: &mut dyn Surface) {
        for id in &self.objects {
            world.render_object(*id, input, surface);
        }
    }

    pub fn find_object_by_name(&self, world: &World, name: &str) -> Option<EntityId> {
        self.objects
            .iter()
            .copied()
            .find(|id| world.get(*id).is_some_and(|object| object.name() == name))
    }

    pub fn find_objects_by_tag(&self, world: &World, tag: &str) -> Vec<EntityId> {
        self.objects
            .iter()
            .copied()
            .filter(|id| world.get(*id).is_some_and(|object| object.has_tag(tag)))
            .collect()
    }

    pub fn for_each(&self, world: &World, mut visit: impl FnMut(EntityId, &GameObject)) {
        for id in &self.objects {
            if let Some(object) = world.get(*id) {
                visit(*id, object);
            }
        }
    }

    pub fn enter(&mut self, world: &mut World) {
        self.scene.on_enter(world);
        info!(scene = self.name.as_str(), "scene_entered");
        self.events.emit(&SceneEvent::Enter);
    }

    pub fn exit(&mut self, world: &mut World) {
        self.scene.on_exit(world);
        info!(scene = self.name.as_str(), "scene_exited");
        self.events.emit(&SceneEvent::Exit);
    }

    pub fn pause(&mut self) {
        self.events.emit(&SceneEvent::Paused);
    }

    pub fn resume(&mut self) {
        self.events.emit(&SceneEvent::Resumed);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::super::component::{Component, ComponentContext};
    use super::super::rendering::RecordingSurface;
    use super::*;

    struct CountingScene {
        loads: Rc<Cell<u32>>,
        seen_state: Rc<Cell<Option<SceneState>>>,
        fail: bool,
    }

    impl CountingScene {
        fn new(loads: &Rc<Cell<u32>>) -> Self {
            Self {
                loads: Rc::clone(loads),
                seen_state: Rc::new(Cell::new(None)),
                fail: false,
            }
        }
    }

    impl Scene for CountingScene {
        fn on_load(&mut self, ctx: &mut SceneContext<'_>) -> Result<(), LoadError> {
            self.loads.set(self.loads.get() + 1);
            self.seen_state.set(Some(ctx.state()));
            let player = ctx.spawn_object(GameObjectConfig::named("player").at(4.0, 0.0));
            ctx.world_mut()
                .get_mut(player)
                .expect("player")
                .add_tag("hero");
            ctx.spawn_object(GameObjectConfig::named("crate"));
            if self.fail {
                return Err("missing level data".into());
            }
            Ok(())
        }
    }

    struct DespawningScene;

    impl Scene for DespawningScene {
        fn on_load(&mut self, ctx: &mut SceneContext<'_>) -> Result<(), LoadError> {
            ctx.spawn_object(GameObjectConfig::default());
            Ok(())
        }

        fn on_unload(&mut self, world: &mut World, released: &[EntityId]) {
            for id in released {
                world.despawn_recursive(*id);
            }
        }
    }

    struct Counter {
        updates: Rc<Cell<u32>>,
    }

    struct SelfDestruct;

    impl Component for SelfDestruct {
        fn update(&mut self, _delta_seconds: f32, ctx: &mut ComponentContext<'_>) {
            let owner = ctx.owner();
            ctx.world_mut().despawn(owner);
        }
    }

    impl Component for Counter {
        fn update(&mut self, _delta_seconds: f32, _ctx: &mut ComponentContext<'_>) {
            self.updates.set(self.updates.get() + 1);
        }
    }

    fn capture(runtime: &mut SceneRuntime) -> Rc<RefCell<Vec<SceneEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        runtime
            .events
            .connect(move |event| sink.borrow_mut().push(event.clone()));
        events
    }

    #[test]
    fn load_runs_step_once() {
        let loads = Rc::new(Cell::new(0));
        let mut world = World::new();
        let mut runtime = SceneRuntime::new("level", Box::new(CountingScene::new(&loads)));

        runtime.load(&mut world).expect("first load");
        runtime.load(&mut world).expect("second load");

        assert_eq!(loads.get(), 1);
        assert!(runtime.is_loaded());
        assert_eq!(runtime.object_count(), 2);
    }

    #[test]
    fn loading_state_is_visible_inside_load_step() {
        let loads = Rc::new(Cell::new(0));
        let scene = CountingScene::new(&loads);
        let seen = Rc::clone(&scene.seen_state);
        let mut world = World::new();
        let mut runtime = SceneRuntime::new("level", Box::new(scene));

        runtime.load(&mut world).expect("load");

        assert_eq!(seen.get(), Some(SceneState::Loading));
        assert_eq!(runtime.state(), SceneState::Loaded);
    }

    #[test]
    fn failed_load_notifies_then_returns_error_and_stays_unloaded() {
        let loads = Rc::new(Cell::new(0));
        let mut scene = CountingScene::new(&loads);
        scene.fail = true;
        let mut world = World::new();
        let mut runtime = SceneRuntime::new("broken", Box::new(scene));
        let events = capture(&mut runtime);

        let error = runtime.load(&mut world).expect_err("load should fail");

        assert_eq!(
            error.to_string(),
            "scene 'broken' failed to load: missing level data"
        );
        assert_eq!(runtime.state(), SceneState::Unloaded);
        assert_eq!(runtime.object_count(), 0);
        assert!(world.is_empty());
        assert_eq!(
            events.borrow().last(),
            Some(&SceneEvent::Error("missing level data".to_string()))
        );
    }

    #[test]
    fn retried_failed_loads_keep_existing_entities_and_leak_nothing() {
        let loads = Rc::new(Cell::new(0));
        let mut scene = CountingScene::new(&loads);
        scene.fail = true;
        let mut world = World::new();
        let mut runtime = SceneRuntime::new("broken", Box::new(scene));
        let existing = world.spawn(GameObjectConfig::named("existing"));
        runtime.add_object(&mut world, existing);

        for _ in 0..3 {
            runtime.load(&mut world).expect_err("load should fail");
        }

        assert_eq!(loads.get(), 3);
        assert_eq!(world.len(), 1);
        assert!(world.contains(existing));
        assert_eq!(world.get(existing).expect("existing").scene(), None);
    }

    #[test]
    fn unload_clears_registry_and_back_references() {
        let loads = Rc::new(Cell::new(0));
        let mut world = World::new();
        let mut runtime = SceneRuntime::new("level", Box::new(CountingScene::new(&loads)));
        runtime.load(&mut world).expect("load");
        let events = capture(&mut runtime);
        let player = runtime
            .find_object_by_name(&world, "player")
            .expect("player");

        runtime.unload(&mut world);

        assert_eq!(runtime.state(), SceneState::Unloaded);
        assert_eq!(runtime.object_count(), 0);
        assert_eq!(world.get(player).expect("player").scene(), None);
        assert_eq!(
            *events.borrow(),
            vec![SceneEvent::Unload, SceneEvent::Unloaded]
        );

        runtime.load(&mut world).expect("reload");
        assert_eq!(loads.get(), 2);
    }

    #[test]
    fn unload_hook_receives_released_roots() {
        let mut world = World::new();
        let mut runtime = SceneRuntime::new("temp", Box::new(DespawningScene));
        runtime.load(&mut world).expect("load");
        assert_eq!(world.len(), 1);

        runtime.unload(&mut world);

        assert!(world.is_empty());
    }

    #[test]
    fn add_object_has_set_semantics_and_sets_back_reference() {
        let mut world = World::new();
        let mut runtime = SceneRuntime::new("level", Box::new(DespawningScene));
        let events = capture(&mut runtime);
        let entity = world.spawn(GameObjectConfig::default());

        assert!(runtime.add_object(&mut world, entity));
        assert!(!runtime.add_object(&mut world, entity));

        assert_eq!(runtime.objects(), &[entity]);
        assert_eq!(world.get(entity).expect("entity").scene(), Some(runtime.id()));
        assert_eq!(*events.borrow(), vec![SceneEvent::ObjectAdded(entity)]);

        assert!(runtime.remove_object(&mut world, entity));
        assert!(!runtime.remove_object(&mut world, entity));
        assert_eq!(world.get(entity).expect("entity").scene(), None);
    }

    #[test]
    fn descendants_resolve_owning_scene_through_their_root() {
        let mut world = World::new();
        let mut runtime = SceneRuntime::new("level", Box::new(DespawningScene));
        let root = world.spawn(GameObjectConfig::default());
        let child = world.spawn(GameObjectConfig::default());
        world.add_child(root, child).expect("child");
        runtime.add_object(&mut world, root);

        assert_eq!(world.owning_scene(child), Some(runtime.id()));
        assert_eq!(world.get(child).expect("child").scene(), None);
    }

    #[test]
    fn find_by_name_and_tag_scan_registered_roots() {
        let loads = Rc::new(Cell::new(0));
        let mut world = World::new();
        let mut runtime = SceneRuntime::new("level", Box::new(CountingScene::new(&loads)));
        runtime.load(&mut world).expect("load");
        let stray = world.spawn(GameObjectConfig::named("player"));

        let player = runtime
            .find_object_by_name(&world, "player")
            .expect("player");

        assert_ne!(player, stray);
        assert_eq!(runtime.find_objects_by_tag(&world, "hero"), vec![player]);
        assert!(runtime.find_object_by_name(&world, "ghost").is_none());

        let mut names = Vec::new();
        runtime.for_each(&world, |_, object| names.push(object.name().to_string()));
        assert_eq!(names, vec!["player", "crate"]);
    }

    #[test]
    fn update_reaches_children_only_through_their_parent() {
        let updates = Rc::new(Cell::new(0));
        let mut world = World::new();
        let mut runtime = SceneRuntime::new("level", Box::new(DespawningScene));
        let root = world.spawn(GameObjectConfig::default());
        let child = world.spawn(GameObjectConfig::default());
        world.add_child(root, child).expect("child");
        world
            .add_component(
                child,
                Counter {
                    updates: Rc::clone(&updates),
                },
            )
            .expect("counter");
        runtime.add_object(&mut world, root);

        runtime.update(&mut world, 0.016, &InputManager::new());

        assert_eq!(updates.get(), 1);
    }

    #[test]
    fn render_skips_despawned_roots() {
        let mut world = World::new();
        let mut runtime = SceneRuntime::new("level", Box::new(DespawningScene));
        let kept = world.spawn(GameObjectConfig::default());
        let gone = world.spawn(GameObjectConfig::default());
        runtime.add_object(&mut world, gone);
        runtime.add_object(&mut world, kept);
        world.despawn(gone);

        let mut surface = RecordingSurface::new();
        runtime.render(&world, &InputManager::new(), &mut surface);

        assert_eq!(surface.calls().len(), 5);
    }

    #[test]
    fn root_that_despawns_itself_leaves_the_registry() {
        let mut world = World::new();
        let mut runtime = SceneRuntime::new("level", Box::new(DespawningScene));
        let events = capture(&mut runtime);
        let doomed = world.spawn(GameObjectConfig::default());
        let kept = world.spawn(GameObjectConfig::default());
        world.add_component(doomed, SelfDestruct).expect("component");
        runtime.add_object(&mut world, doomed);
        runtime.add_object(&mut world, kept);

        runtime.update(&mut world, 0.016, &InputManager::new());

        assert!(!world.contains(doomed));
        assert_eq!(runtime.objects(), &[kept]);
        assert_eq!(runtime.object_count(), 1);
        assert_eq!(
            events.borrow().last(),
            Some(&SceneEvent::ObjectRemoved(doomed))
        );
    }

    #[test]
    fn prune_drops_roots_despawned_outside_update() {
        let mut world = World::new();
        let mut runtime = SceneRuntime::new("level", Box::new(DespawningScene));
        let gone = world.spawn(GameObjectConfig::default());
        runtime.add_object(&mut world, gone);
        world.despawn(gone);
        assert_eq!(runtime.object_count(), 1);

        assert_eq!(runtime.prune_despawned(&world), 1);

        assert_eq!(runtime.object_count(), 0);
        assert_eq!(runtime.prune_despawned(&world), 0);
    }

    #[test]
    fn destroy_object_unregisters_and_despawns() {
        let mut world = World::new();
        let mut runtime = SceneRuntime::new("level", Box::new(DespawningScene));
        let entity = world.spawn(GameObjectConfig::default());
        runtime.add_object(&mut world, entity);

        assert!(runtime.destroy_object(&mut world, entity));

        assert_eq!(runtime.object_count(), 0);
        assert!(!world.contains(entity));
    }

    #[test]
    fn lifecycle_notifications_fire_in_call_order() {
        let mut world = World::new();
        let mut runtime = SceneRuntime::new("level", Box::new(DespawningScene));
        let events = capture(&mut runtime);

        runtime.enter(&mut world);
        runtime.pause();
        runtime.resume();
        runtime.exit(&mut world);

        assert_eq!(
            *events.borrow(),
            vec![
                SceneEvent::Enter,
                SceneEvent::Paused,
                SceneEvent::Resumed,
                SceneEvent::Exit
            ]
        );
    }
}
