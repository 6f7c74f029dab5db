use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered set of observers for one notification category.
///
/// Handlers run synchronously inside `emit`, in the order they were connected.
pub struct Signal<T> {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Box<dyn FnMut(&T)>)>,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            handlers: Vec::new(),
        }
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl<T> Signal<T> {
    pub fn connect(&mut self, handler: impl FnMut(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.handlers.push((id, Box::new(handler)));
        id
    }

    pub fn disconnect(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    pub fn emit(&mut self, payload: &T) {
        for (_, handler) in &mut self.handlers {
            handler(payload);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn handlers_run_in_connection_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut signal = Signal::<u32>::default();
        let first = Rc::clone(&seen);
        signal.connect(move |value| first.borrow_mut().push(("first", *value)));
        let second = Rc::clone(&seen);
        signal.connect(move |value| second.borrow_mut().push(("second", *value)));

        signal.emit(&7);

        assert_eq!(*seen.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn disconnected_handler_stops_receiving() {
        let count = Rc::new(RefCell::new(0));
        let mut signal = Signal::<()>::default();
        let counter = Rc::clone(&count);
        let id = signal.connect(move |_| *counter.borrow_mut() += 1);

        signal.emit(&());
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(&());

        assert_eq!(*count.borrow(), 1);
        assert_eq!(signal.handler_count(), 0);
    }
}
