use std::collections::HashSet;
use std::fmt;

use slotmap::{new_key_type, SlotMap};
use thiserror::Error;
use tracing::{debug, trace};

use super::component::{
    downcast_box, downcast_mut, downcast_ref, Component, ComponentContext, ComponentKind,
    RenderContext,
};
use super::input::InputManager;
use super::rendering::Surface;
use super::scene::SceneId;
use super::signal::Signal;
use super::{Bounds, Size, Vec2};

new_key_type! {
    pub struct EntityId;
}

pub const DEFAULT_OBJECT_NAME: &str = "GameObject";

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("component {kind} already exists on {entity}")]
    DuplicateComponent { kind: ComponentKind, entity: String },
    #[error("entity {0:?} does not exist")]
    EntityNotFound(EntityId),
    #[error("adding {child:?} under {parent:?} would make the hierarchy cyclic")]
    HierarchyCycle { parent: EntityId, child: EntityId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentEvent {
    Added {
        entity: EntityId,
        kind: ComponentKind,
    },
    Removed {
        entity: EntityId,
        kind: ComponentKind,
    },
    EnabledChanged {
        entity: EntityId,
        kind: ComponentKind,
        enabled: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyEvent {
    ChildAdded { parent: EntityId, child: EntityId },
    ChildRemoved { parent: EntityId, child: EntityId },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformEvent {
    PositionChanged { entity: EntityId, position: Vec2 },
    ScaleChanged { entity: EntityId, scale: Vec2 },
    RotationChanged { entity: EntityId, radians: f32 },
}

#[derive(Debug, Default)]
pub struct WorldEvents {
    pub components: Signal<ComponentEvent>,
    pub hierarchy: Signal<HierarchyEvent>,
    pub transform: Signal<TransformEvent>,
}

#[derive(Debug, Clone)]
pub struct GameObjectConfig {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub visible: bool,
}

impl Default for GameObjectConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_OBJECT_NAME.to_string(),
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            visible: true,
        }
    }
}

impl GameObjectConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn sized(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

struct ComponentSlot {
    kind: ComponentKind,
    enabled: bool,
    // `None` while the component is running its own update.
    component: Option<Box<dyn Component>>,
}

impl fmt::Debug for ComponentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSlot")
            .field("kind", &self.kind)
            .field("enabled", &self.enabled)
            .field("in_flight", &self.component.is_none())
            .finish()
    }
}

/// Scene-graph node. Lives in a `World`; relations are ids into that world.
#[derive(Debug)]
pub struct GameObject {
    name: String,
    position: Vec2,
    size: Size,
    visible: bool,
    scale: Vec2,
    rotation: f32,
    tags: HashSet<String>,
    components: Vec<ComponentSlot>,
    children: Vec<EntityId>,
    parent: Option<EntityId>,
    scene: Option<SceneId>,
}

impl GameObject {
    fn from_config(config: GameObjectConfig) -> Self {
        Self {
            name: config.name,
            position: Vec2::new(config.x, config.y),
            size: Size::new(config.width, config.height),
            visible: config.visible,
            scale: Vec2::ONE,
            rotation: 0.0,
            tags: HashSet::new(),
            components: Vec::new(),
            children: Vec::new(),
            parent: None,
            scene: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    /// Scene this entity is registered in as a root, if any.
    pub fn scene(&self) -> Option<SceneId> {
        self.scene
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Kinds in registration order.
    pub fn component_kinds(&self) -> Vec<ComponentKind> {
        self.components.iter().map(|slot| slot.kind).collect()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn has_component<T: Component>(&self) -> bool {
        self.slot_index(ComponentKind::of::<T>()).is_some()
    }

    pub fn get_component<T: Component>(&self) -> Option<&T> {
        let index = self.slot_index(ComponentKind::of::<T>())?;
        let component = self.components[index].component.as_deref()?;
        downcast_ref::<T>(component)
    }

    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        let index = self.slot_index(ComponentKind::of::<T>())?;
        let component = self.components[index].component.as_deref_mut()?;
        downcast_mut::<T>(component)
    }

    pub fn is_component_enabled<T: Component>(&self) -> Option<bool> {
        let index = self.slot_index(ComponentKind::of::<T>())?;
        Some(self.components[index].enabled)
    }

    fn slot_index(&self, kind: ComponentKind) -> Option<usize> {
        self.components.iter().position(|slot| slot.kind == kind)
    }
}

/// Arena owning every entity and its components.
#[derive(Debug, Default)]
pub struct World {
    objects: SlotMap<EntityId, GameObject>,
    pub events: WorldEvents,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached entity: no parent, no scene.
    pub fn spawn(&mut self, config: GameObjectConfig) -> EntityId {
        let id = self.objects.insert(GameObject::from_config(config));
        trace!(entity = ?id, "entity_spawned");
        id
    }

    /// Removes one entity. Its children are orphaned, not destroyed, and its
    /// components are detached.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        let Some(parent) = self.objects.get(id).map(|object| object.parent) else {
            return false;
        };
        if let Some(parent) = parent {
            self.remove_child(parent, id);
        }

        let Some(mut object) = self.objects.remove(id) else {
            return false;
        };
        for child in object.children.drain(..) {
            if let Some(child_object) = self.objects.get_mut(child) {
                child_object.parent = None;
            }
            self.events
                .hierarchy
                .emit(&HierarchyEvent::ChildRemoved { parent: id, child });
        }
        for slot in object.components.drain(..) {
            if let Some(mut component) = slot.component {
                component.on_detach();
            }
            self.events.components.emit(&ComponentEvent::Removed {
                entity: id,
                kind: slot.kind,
            });
        }
        debug!(entity = ?id, name = object.name.as_str(), "entity_despawned");
        true
    }

    /// Removes an entity together with all of its descendants. Returns how
    /// many entities were removed.
    pub fn despawn_recursive(&mut self, id: EntityId) -> usize {
        let Some(children) = self.objects.get(id).map(|object| object.children.clone()) else {
            return 0;
        };
        let mut removed = 0;
        for child in children {
            removed += self.despawn_recursive(child);
        }
        if self.despawn(id) {
            removed += 1;
        }
        removed
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&GameObject> {
        self.objects.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut GameObject> {
        self.objects.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &GameObject)> {
        self.objects.iter()
    }

    pub fn add_component<T: Component>(
        &mut self,
        id: EntityId,
        component: T,
    ) -> Result<&mut T, WorldError> {
        let kind = ComponentKind::of::<T>();
        let object = self
            .objects
            .get_mut(id)
            .ok_or(WorldError::EntityNotFound(id))?;
        if object.slot_index(kind).is_some() {
            return Err(WorldError::DuplicateComponent {
                kind,
                entity: object.name.clone(),
            });
        }

        let mut boxed: Box<dyn Component> = Box::new(component);
        boxed.on_attach(id);
        object.components.push(ComponentSlot {
            kind,
            enabled: true,
            component: Some(boxed),
        });
        trace!(entity = ?id, kind = kind.short_name(), "component_added");
        self.events
            .components
            .emit(&ComponentEvent::Added { entity: id, kind });

        self.objects
            .get_mut(id)
            .and_then(|object| object.get_component_mut::<T>())
            .ok_or(WorldError::EntityNotFound(id))
    }

    pub fn get_component<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.objects.get(id)?.get_component::<T>()
    }

    pub fn get_component_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        self.objects.get_mut(id)?.get_component_mut::<T>()
    }

    pub fn has_component<T: Component>(&self, id: EntityId) -> bool {
        self.objects
            .get(id)
            .is_some_and(|object| object.has_component::<T>())
    }

    /// Detaches and returns the component of kind `T`. A component removed
    /// while it is running its own update is detached when that update returns,
    /// so nothing is handed back in that case.
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> Option<T> {
        let kind = ComponentKind::of::<T>();
        let object = self.objects.get_mut(id)?;
        let index = object.slot_index(kind)?;
        let slot = object.components.remove(index);
        let detached = slot.component.map(|mut component| {
            component.on_detach();
            component
        });
        trace!(entity = ?id, kind = kind.short_name(), "component_removed");
        self.events
            .components
            .emit(&ComponentEvent::Removed { entity: id, kind });
        detached.and_then(downcast_box::<T>)
    }

    /// Returns `true` only when the enabled state actually changed.
    pub fn set_component_enabled<T: Component>(&mut self, id: EntityId, enabled: bool) -> bool {
        let kind = ComponentKind::of::<T>();
        let Some(object) = self.objects.get_mut(id) else {
            return false;
        };
        let Some(index) = object.slot_index(kind) else {
            return false;
        };
        let slot = &mut object.components[index];
        if slot.enabled == enabled {
            return false;
        }
        slot.enabled = enabled;
        // An in-flight component gets its hook when its update returns.
        if let Some(component) = slot.component.as_mut() {
            if enabled {
                component.on_enable();
            } else {
                component.on_disable();
            }
        }
        self.events.components.emit(&ComponentEvent::EnabledChanged {
            entity: id,
            kind,
            enabled,
        });
        true
    }

    pub fn is_component_enabled<T: Component>(&self, id: EntityId) -> Option<bool> {
        self.objects.get(id)?.is_component_enabled::<T>()
    }

    /// Makes `child` a child of `parent`, detaching it from any previous parent.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> Result<(), WorldError> {
        if !self.objects.contains_key(parent) {
            return Err(WorldError::EntityNotFound(parent));
        }
        if !self.objects.contains_key(child) {
            return Err(WorldError::EntityNotFound(child));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(WorldError::HierarchyCycle { parent, child });
        }

        if let Some(previous) = self.objects[child].parent {
            self.remove_child(previous, child);
        }
        self.objects[parent].children.push(child);
        self.objects[child].parent = Some(parent);
        self.events
            .hierarchy
            .emit(&HierarchyEvent::ChildAdded { parent, child });
        Ok(())
    }

    pub fn remove_child(&mut self, parent: EntityId, child: EntityId) -> bool {
        let Some(parent_object) = self.objects.get_mut(parent) else {
            return false;
        };
        let Some(index) = parent_object.children.iter().position(|id| *id == child) else {
            return false;
        };
        parent_object.children.remove(index);
        if let Some(child_object) = self.objects.get_mut(child) {
            child_object.parent = None;
        }
        self.events
            .hierarchy
            .emit(&HierarchyEvent::ChildRemoved { parent, child });
        true
    }

    fn is_ancestor_or_self(&self, candidate: EntityId, of: EntityId) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.objects.get(id).and_then(|object| object.parent);
        }
        false
    }

    pub fn set_position(&mut self, id: EntityId, x: f32, y: f32) -> bool {
        let Some(object) = self.objects.get_mut(id) else {
            return false;
        };
        object.position = Vec2::new(x, y);
        self.events.transform.emit(&TransformEvent::PositionChanged {
            entity: id,
            position: Vec2::new(x, y),
        });
        true
    }

    pub fn set_scale(&mut self, id: EntityId, x: f32, y: f32) -> bool {
        let Some(object) = self.objects.get_mut(id) else {
            return false;
        };
        object.scale = Vec2::new(x, y);
        self.events.transform.emit(&TransformEvent::ScaleChanged {
            entity: id,
            scale: Vec2::new(x, y),
        });
        true
    }

    pub fn set_rotation(&mut self, id: EntityId, radians: f32) -> bool {
        let Some(object) = self.objects.get_mut(id) else {
            return false;
        };
        object.rotation = radians;
        self.events
            .transform
            .emit(&TransformEvent::RotationChanged { entity: id, radians });
        true
    }

    /// Sum of positions up the parent chain. Ancestor rotation and scale are
    /// ignored, unlike rendering, which composes the full transform.
    pub fn world_position(&self, id: EntityId) -> Option<Vec2> {
        let object = self.objects.get(id)?;
        let mut position = object.position;
        let mut current = object.parent;
        while let Some(parent) = current {
            let Some(parent_object) = self.objects.get(parent) else {
                break;
            };
            position += parent_object.position;
            current = parent_object.parent;
        }
        Some(position)
    }

    /// World position plus size scaled by the entity's own scale only.
    pub fn bounds(&self, id: EntityId) -> Option<Bounds> {
        let object = self.objects.get(id)?;
        let position = self.world_position(id)?;
        Some(Bounds {
            x: position.x,
            y: position.y,
            width: object.size.width * object.scale.x,
            height: object.size.height * object.scale.y,
        })
    }

    /// Scene the entity belongs to, directly or through an ancestor.
    pub fn owning_scene(&self, id: EntityId) -> Option<SceneId> {
        let mut current = Some(id);
        while let Some(entity) = current {
            let object = self.objects.get(entity)?;
            if object.scene.is_some() {
                return object.scene;
            }
            current = object.parent;
        }
        None
    }

    pub(crate) fn set_scene(&mut self, id: EntityId, scene: Option<SceneId>) -> bool {
        match self.objects.get_mut(id) {
            Some(object) => {
                object.scene = scene;
                true
            }
            None => false,
        }
    }

    /// Updates the entity's components in registration order, then its
    /// children in insertion order. Invisible entities skip the whole subtree.
    pub fn update_object(&mut self, id: EntityId, delta_seconds: f32, input: &InputManager) {
        let Some(object) = self.objects.get(id) else {
            return;
        };
        if !object.visible {
            return;
        }
        let kinds = object.component_kinds();
        let children = object.children.clone();

        for kind in kinds {
            let Some((mut component, enabled_before)) = self.take_component(id, kind) else {
                continue;
            };
            {
                let mut ctx = ComponentContext::new(id, self, input);
                component.update(delta_seconds, &mut ctx);
            }
            self.restore_component(id, kind, component, enabled_before);
        }

        for child in children {
            self.update_object(child, delta_seconds, input);
        }
    }

    /// Renders inside `save`/`restore`: translate, rotate, scale, components,
    /// then children under the same transform.
    pub fn render_object(&self, id: EntityId, input: &InputManager, surface: &mut dyn Surface) {
        let Some(object) = self.objects.get(id) else {
            return;
        };
        if !object.visible {
            return;
        }

        surface.save();
        surface.translate(object.position.x, object.position.y);
        surface.rotate(object.rotation);
        surface.scale(object.scale.x, object.scale.y);

        let ctx = RenderContext::new(id, object, self, input);
        for slot in &object.components {
            if let Some(component) = slot.component.as_deref() {
                component.render(&ctx, surface);
            }
        }
        for child in &object.children {
            self.render_object(*child, input, surface);
        }

        surface.restore();
    }

    fn take_component(
        &mut self,
        id: EntityId,
        kind: ComponentKind,
    ) -> Option<(Box<dyn Component>, bool)> {
        let object = self.objects.get_mut(id)?;
        let index = object.slot_index(kind)?;
        let slot = &mut object.components[index];
        let component = slot.component.take()?;
        Some((component, slot.enabled))
    }

    fn restore_component(
        &mut self,
        id: EntityId,
        kind: ComponentKind,
        mut component: Box<dyn Component>,
        enabled_before: bool,
    ) {
        let slot = self.objects.get_mut(id).and_then(|object| {
            let index = object.slot_index(kind)?;
            let slot = &mut object.components[index];
            slot.component.is_none().then_some(slot)
        });
        match slot {
            Some(slot) => {
                if slot.enabled != enabled_before {
                    if slot.enabled {
                        component.on_enable();
                    } else {
                        component.on_disable();
                    }
                }
                slot.component = Some(component);
            }
            None => {
                // Removed (or its owner despawned) during its own update.
                component.on_detach();
                trace!(entity = ?id, kind = kind.short_name(), "in_flight_component_detached");
            }
        }
    }
}
