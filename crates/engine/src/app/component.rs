use std::any::{type_name, Any, TypeId};
use std::fmt;

use super::input::InputManager;
use super::rendering::Surface;
use super::world::{EntityId, GameObject, World};

/// Attachable behaviour unit.
///
/// The owning world tracks the owner and the enabled flag itself; the hooks
/// below are notifications only, so overriding them cannot break either.
/// `update` and `render` run every frame whether or not the component is
/// enabled.
pub trait Component: Any + AsAny {
    fn update(&mut self, delta_seconds: f32, ctx: &mut ComponentContext<'_>);

    fn render(&self, _ctx: &RenderContext<'_>, _surface: &mut dyn Surface) {}

    fn on_attach(&mut self, _owner: EntityId) {}

    fn on_detach(&mut self) {}

    fn on_enable(&mut self) {}

    fn on_disable(&mut self) {}
}

pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

pub(crate) fn downcast_ref<T: Component>(component: &dyn Component) -> Option<&T> {
    component.as_any().downcast_ref::<T>()
}

pub(crate) fn downcast_mut<T: Component>(component: &mut dyn Component) -> Option<&mut T> {
    component.as_any_mut().downcast_mut::<T>()
}

pub(crate) fn downcast_box<T: Component>(component: Box<dyn Component>) -> Option<T> {
    component.into_any().downcast::<T>().ok().map(|boxed| *boxed)
}

/// Uniqueness key of a component within one entity: its concrete type.
#[derive(Clone, Copy)]
pub struct ComponentKind {
    id: TypeId,
    name: &'static str,
}

impl ComponentKind {
    pub fn of<T: Component>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Type name without its module path.
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for ComponentKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentKind {}

impl std::hash::Hash for ComponentKind {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// What a component sees during `update`.
pub struct ComponentContext<'a> {
    owner: EntityId,
    world: &'a mut World,
    input: &'a InputManager,
}

impl<'a> ComponentContext<'a> {
    pub(crate) fn new(owner: EntityId, world: &'a mut World, input: &'a InputManager) -> Self {
        Self {
            owner,
            world,
            input,
        }
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn object(&self) -> Option<&GameObject> {
        self.world.get(self.owner)
    }

    pub fn object_mut(&mut self) -> Option<&mut GameObject> {
        self.world.get_mut(self.owner)
    }

    pub fn world(&self) -> &World {
        &*self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut *self.world
    }

    pub fn input(&self) -> &InputManager {
        self.input
    }

    pub fn set_position(&mut self, x: f32, y: f32) -> bool {
        self.world.set_position(self.owner, x, y)
    }
}

/// What a component sees during `render`.
pub struct RenderContext<'a> {
    owner_id: EntityId,
    owner: &'a GameObject,
    world: &'a World,
    input: &'a InputManager,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(
        owner_id: EntityId,
        owner: &'a GameObject,
        world: &'a World,
        input: &'a InputManager,
    ) -> Self {
        Self {
            owner_id,
            owner,
            world,
            input,
        }
    }

    pub fn owner(&self) -> EntityId {
        self.owner_id
    }

    pub fn object(&self) -> &GameObject {
        self.owner
    }

    pub fn world(&self) -> &World {
        self.world
    }

    pub fn input(&self) -> &InputManager {
        self.input
    }
}
