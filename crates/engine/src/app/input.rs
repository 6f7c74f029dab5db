use tracing::trace;

use super::signal::Signal;
use super::touch::{TouchHandler, TouchPoint};
use super::Vec2;

/// Frame-to-frame displacement of the primary pointer that counts as dragging.
pub const DRAG_THRESHOLD: f32 = 5.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    pub position: Vec2,
    pub down: bool,
    pub dragging: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(TouchPoint),
    Move(TouchPoint),
    /// Carries the last position seen before the release.
    Up(Vec2),
}

/// Reconciles the raw contact map into one stable state per frame.
///
/// Only the primary contact drives `InputState`; other contacts are passed
/// through by `touches`. Dragging is judged on the distance moved since the
/// previous frame, so a slow drag that never covers more than
/// `DRAG_THRESHOLD` between two frames is never reported as dragging.
#[derive(Debug, Default)]
pub struct InputManager {
    touch_handler: TouchHandler,
    current: InputState,
    previous: InputState,
    frame_events: Vec<PointerEvent>,
    pub events: Signal<PointerEvent>,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self) {
        self.previous = self.current;
        self.frame_events.clear();

        match self.touch_handler.primary_touch() {
            Some(touch) => {
                self.current.position = touch.position;
                self.current.down = true;

                if self.previous.down {
                    let distance = touch.position.distance(self.previous.position);
                    self.current.dragging = distance > DRAG_THRESHOLD;
                }

                if !self.previous.down {
                    self.dispatch(PointerEvent::Down(touch));
                } else if self.current.dragging {
                    self.dispatch(PointerEvent::Move(touch));
                }
            }
            None => {
                if self.previous.down {
                    self.dispatch(PointerEvent::Up(self.previous.position));
                }
                self.current.down = false;
                self.current.dragging = false;
            }
        }
    }

    fn dispatch(&mut self, event: PointerEvent) {
        trace!(event = ?event, "pointer_event");
        self.frame_events.push(event);
        self.events.emit(&event);
    }

    pub fn position(&self) -> Vec2 {
        self.current.position
    }

    pub fn is_pointer_down(&self) -> bool {
        self.current.down
    }

    pub fn is_dragging(&self) -> bool {
        self.current.dragging
    }

    pub fn state(&self) -> InputState {
        self.current
    }

    pub fn previous_state(&self) -> InputState {
        self.previous
    }

    /// Current position of the primary contact minus where it was pressed.
    pub fn drag_delta(&self) -> Vec2 {
        self.touch_handler
            .primary_touch()
            .map(|touch| touch.drag_delta())
            .unwrap_or(Vec2::ZERO)
    }

    pub fn touches(&self) -> Vec<TouchPoint> {
        self.touch_handler.touches()
    }

    /// Pointer events synthesized by the most recent `update`.
    pub fn frame_events(&self) -> &[PointerEvent] {
        &self.frame_events
    }

    pub fn touch_handler(&self) -> &TouchHandler {
        &self.touch_handler
    }

    pub fn touch_handler_mut(&mut self) -> &mut TouchHandler {
        &mut self.touch_handler
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::super::touch::TouchId;
    use super::*;

    fn recorded(input: &mut InputManager) -> Rc<RefCell<Vec<PointerEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        input
            .events
            .connect(move |event| sink.borrow_mut().push(*event));
        events
    }

    fn count_downs(events: &[PointerEvent]) -> usize {
        events
            .iter()
            .filter(|event| matches!(event, PointerEvent::Down(_)))
            .count()
    }

    #[test]
    fn pointer_down_fires_once_per_press() {
        let mut input = InputManager::new();
        let events = recorded(&mut input);

        input.update();
        assert_eq!(count_downs(&events.borrow()), 0);

        input.touch_handler_mut().press(TouchId::PRIMARY, 10.0, 10.0);
        input.update();
        assert_eq!(count_downs(&events.borrow()), 1);
        assert!(matches!(input.frame_events(), [PointerEvent::Down(_)]));

        input.update();
        input.update();
        assert_eq!(count_downs(&events.borrow()), 1);
        assert!(input.frame_events().is_empty());
        assert!(input.is_pointer_down());
    }

    #[test]
    fn pointer_up_fires_once_with_last_position() {
        let mut input = InputManager::new();
        let events = recorded(&mut input);
        input.touch_handler_mut().press(TouchId::PRIMARY, 10.0, 10.0);
        input.update();
        input.touch_handler_mut().move_to(TouchId::PRIMARY, 12.0, 11.0);
        input.update();
        input.touch_handler_mut().release(TouchId::PRIMARY);

        input.update();
        input.update();

        let ups: Vec<Vec2> = events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                PointerEvent::Up(position) => Some(*position),
                _ => None,
            })
            .collect();
        assert_eq!(ups, vec![Vec2::new(12.0, 11.0)]);
        assert!(!input.is_pointer_down());
        assert!(!input.is_dragging());
    }

    #[test]
    fn dragging_requires_strictly_more_than_threshold() {
        let mut input = InputManager::new();
        input.touch_handler_mut().press(TouchId::PRIMARY, 0.0, 0.0);
        input.update();

        input.touch_handler_mut().move_to(TouchId::PRIMARY, 3.0, 4.0);
        input.update();
        assert!(!input.is_dragging());

        input.touch_handler_mut().move_to(TouchId::PRIMARY, 3.0, 4.0 + 5.0001);
        input.update();
        assert!(input.is_dragging());
    }

    #[test]
    fn pointer_move_fires_only_while_dragging() {
        let mut input = InputManager::new();
        let events = recorded(&mut input);
        input.touch_handler_mut().press(TouchId::PRIMARY, 0.0, 0.0);
        input.update();

        input.touch_handler_mut().move_to(TouchId::PRIMARY, 1.0, 0.0);
        input.update();
        input.touch_handler_mut().move_to(TouchId::PRIMARY, 20.0, 0.0);
        input.update();

        let moves = events
            .borrow()
            .iter()
            .filter(|event| matches!(event, PointerEvent::Move(_)))
            .count();
        assert_eq!(moves, 1);
    }

    #[test]
    fn slow_sustained_drag_never_sets_dragging() {
        let mut input = InputManager::new();
        input.touch_handler_mut().press(TouchId::PRIMARY, 0.0, 0.0);
        input.update();

        for step in 1..=20 {
            input
                .touch_handler_mut()
                .move_to(TouchId::PRIMARY, step as f32 * 4.0, 0.0);
            input.update();
            assert!(!input.is_dragging());
        }

        assert_eq!(input.drag_delta(), Vec2::new(80.0, 0.0));
    }

    #[test]
    fn drag_delta_is_zero_without_primary_touch() {
        let mut input = InputManager::new();
        input.touch_handler_mut().press(TouchId(4), 0.0, 0.0);
        input.touch_handler_mut().move_to(TouchId(4), 30.0, 30.0);
        input.update();

        assert_eq!(input.drag_delta(), Vec2::ZERO);
        assert!(!input.is_pointer_down());
        assert_eq!(input.touches().len(), 1);
    }

    #[test]
    fn previous_state_tracks_last_frame() {
        let mut input = InputManager::new();
        input.touch_handler_mut().press(TouchId::PRIMARY, 2.0, 3.0);
        input.update();
        input.touch_handler_mut().move_to(TouchId::PRIMARY, 4.0, 3.0);
        input.update();

        assert_eq!(input.previous_state().position, Vec2::new(2.0, 3.0));
        assert_eq!(input.position(), Vec2::new(4.0, 3.0));
    }
}
