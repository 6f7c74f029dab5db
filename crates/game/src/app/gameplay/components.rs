use kinetic_engine::{
    Color, Component, ComponentContext, GameObject, RenderContext, Surface, Vec2,
};
use tracing::debug;

/// Hit test against a box centred on the entity's local position.
fn contains_centered(object: &GameObject, point: Vec2) -> bool {
    let position = object.position();
    let size = object.size();
    point.x >= position.x - size.width / 2.0
        && point.x <= position.x + size.width / 2.0
        && point.y >= position.y - size.height / 2.0
        && point.y <= position.y + size.height / 2.0
}

/// Follows the pointer while it is held down after grabbing the owner.
#[derive(Debug, Default)]
pub(crate) struct Draggable {
    grab_offset: Option<Vec2>,
}

impl Draggable {
    pub(crate) fn is_dragging(&self) -> bool {
        self.grab_offset.is_some()
    }
}

impl Component for Draggable {
    fn update(&mut self, _delta_seconds: f32, ctx: &mut ComponentContext<'_>) {
        let Some(object) = ctx.object() else {
            return;
        };
        let position = object.position();
        let pointer = ctx.input().position();
        let pointer_down = ctx.input().is_pointer_down();

        if pointer_down && self.grab_offset.is_none() && contains_centered(object, pointer) {
            self.grab_offset = Some(position - pointer);
            debug!(entity = ?ctx.owner(), "drag_started");
        }

        let Some(offset) = self.grab_offset else {
            return;
        };
        if pointer_down {
            let target = pointer + offset;
            ctx.set_position(target.x, target.y);
        } else {
            self.grab_offset = None;
            debug!(entity = ?ctx.owner(), "drag_ended");
        }
    }
}

/// Fills the owner's box, darker while the pointer hovers it.
#[derive(Debug)]
pub(crate) struct BoxRenderer {
    normal: Color,
    hover: Color,
}

impl BoxRenderer {
    pub(crate) fn new(normal: Color, hover: Color) -> Self {
        Self { normal, hover }
    }
}

impl Component for BoxRenderer {
    fn update(&mut self, _delta_seconds: f32, _ctx: &mut ComponentContext<'_>) {}

    fn render(&self, ctx: &RenderContext<'_>, surface: &mut dyn Surface) {
        let object = ctx.object();
        let size = object.size();
        let hovered = contains_centered(object, ctx.input().position());

        surface.set_fill_style(if hovered { self.hover } else { self.normal });
        surface.fill_rect(
            -size.width / 2.0,
            -size.height / 2.0,
            size.width,
            size.height,
        );
    }
}
