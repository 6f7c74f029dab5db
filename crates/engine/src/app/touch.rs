use std::collections::HashMap;

use super::Vec2;

/// Identifier of a contact. `TouchId::PRIMARY` is the mouse-equivalent pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TouchId(pub u64);

impl TouchId {
    pub const PRIMARY: TouchId = TouchId(0);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub id: TouchId,
    pub position: Vec2,
    pub origin: Vec2,
}

impl TouchPoint {
    pub fn drag_delta(&self) -> Vec2 {
        self.position - self.origin
    }
}

/// Tracks every active contact in surface-local coordinates.
///
/// Raw coordinates are client coordinates; the surface origin (its on-screen
/// offset) is subtracted before anything is stored.
#[derive(Debug, Clone, Default)]
pub struct TouchHandler {
    touches: HashMap<TouchId, TouchPoint>,
    surface_origin: Vec2,
}

impl TouchHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_surface_origin(&mut self, origin: Vec2) {
        self.surface_origin = origin;
    }

    pub fn surface_origin(&self) -> Vec2 {
        self.surface_origin
    }

    pub fn press(&mut self, id: TouchId, client_x: f32, client_y: f32) {
        let position = self.to_surface(client_x, client_y);
        self.touches.insert(
            id,
            TouchPoint {
                id,
                position,
                origin: position,
            },
        );
    }

    /// Moves an already tracked contact. Untracked identifiers are ignored.
    pub fn move_to(&mut self, id: TouchId, client_x: f32, client_y: f32) {
        let position = self.to_surface(client_x, client_y);
        if let Some(touch) = self.touches.get_mut(&id) {
            touch.position = position;
        }
    }

    pub fn release(&mut self, id: TouchId) {
        self.touches.remove(&id);
    }

    pub fn touches(&self) -> Vec<TouchPoint> {
        self.touches.values().copied().collect()
    }

    pub fn touch(&self, id: TouchId) -> Option<TouchPoint> {
        self.touches.get(&id).copied()
    }

    pub fn primary_touch(&self) -> Option<TouchPoint> {
        self.touch(TouchId::PRIMARY)
    }

    pub fn touch_count(&self) -> usize {
        self.touches.len()
    }

    fn to_surface(&self, client_x: f32, client_y: f32) -> Vec2 {
        Vec2 {
            x: client_x - self.surface_origin.x,
            y: client_y - self.surface_origin.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_records_position_and_origin_relative_to_surface() {
        let mut handler = TouchHandler::new();
        handler.set_surface_origin(Vec2 { x: 10.0, y: 20.0 });

        handler.press(TouchId::PRIMARY, 110.0, 70.0);

        let touch = handler.primary_touch().expect("primary touch");
        assert_eq!(touch.position, Vec2 { x: 100.0, y: 50.0 });
        assert_eq!(touch.origin, touch.position);
    }

    #[test]
    fn move_updates_only_current_position() {
        let mut handler = TouchHandler::new();
        handler.press(TouchId::PRIMARY, 5.0, 5.0);

        handler.move_to(TouchId::PRIMARY, 25.0, 45.0);

        let touch = handler.primary_touch().expect("primary touch");
        assert_eq!(touch.position, Vec2 { x: 25.0, y: 45.0 });
        assert_eq!(touch.origin, Vec2 { x: 5.0, y: 5.0 });
        assert_eq!(touch.drag_delta(), Vec2 { x: 20.0, y: 40.0 });
    }

    #[test]
    fn move_of_untracked_identifier_is_ignored() {
        let mut handler = TouchHandler::new();

        handler.move_to(TouchId(3), 1.0, 1.0);

        assert_eq!(handler.touch_count(), 0);
        assert!(handler.touch(TouchId(3)).is_none());
    }

    #[test]
    fn release_removes_only_that_identifier() {
        let mut handler = TouchHandler::new();
        handler.press(TouchId::PRIMARY, 0.0, 0.0);
        handler.press(TouchId(7), 1.0, 1.0);

        handler.release(TouchId::PRIMARY);

        assert!(handler.primary_touch().is_none());
        let remaining = handler.touches();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, TouchId(7));
    }

    #[test]
    fn simultaneous_identifiers_are_independent() {
        let mut handler = TouchHandler::new();
        handler.press(TouchId(1), 0.0, 0.0);
        handler.press(TouchId(2), 50.0, 50.0);

        handler.move_to(TouchId(2), 60.0, 55.0);

        assert_eq!(
            handler.touch(TouchId(1)).expect("touch 1").position,
            Vec2 { x: 0.0, y: 0.0 }
        );
        assert_eq!(
            handler.touch(TouchId(2)).expect("touch 2").position,
            Vec2 { x: 60.0, y: 55.0 }
        );
        assert!(handler.primary_touch().is_none());
    }
}
