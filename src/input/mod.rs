use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::events::{Event, EventKind, EventListener, EventSystem, Key, ListenerError};

/// Edge and level state of the keyboard.
///
/// `pressed`/`released` hold transitions seen since the last
/// [`reset`](Self::reset); `held` holds every key that went down and has not
/// come back up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyState {
    pressed: HashSet<Key>,
    released: HashSet<Key>,
    held: HashSet<Key>,
}

impl KeyState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the sets from a key event. Other events are ignored.
    ///
    /// Auto-repeat downs only touch `held`, so a key kept down across frames
    /// is reported as pressed once.
    pub fn apply(&mut self, event: &Event) {
        match *event {
            Event::KeyDown { key, repeat } => {
                self.held.insert(key);
                if !repeat {
                    self.pressed.insert(key);
                }
            }
            Event::KeyUp { key } => {
                self.held.remove(&key);
                self.released.insert(key);
            }
            _ => {}
        }
    }

    /// Clears the edge sets. `held` is kept.
    pub fn reset(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }

    #[must_use]
    pub fn pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    #[must_use]
    pub fn released(&self, key: Key) -> bool {
        self.released.contains(&key)
    }

    #[must_use]
    pub fn hold(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn held_keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.held.iter().copied()
    }

    pub fn pressed_keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.pressed.iter().copied()
    }

    pub fn released_keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.released.iter().copied()
    }
}

struct KeyboardListener {
    state: Rc<RefCell<KeyState>>,
}

impl EventListener for KeyboardListener {
    fn listen(&mut self, event: &Event) -> Result<(), ListenerError> {
        self.state.borrow_mut().apply(event);
        Ok(())
    }
}

/// Keyboard state fed by an [`EventSystem`].
///
/// Call [`reset`](Self::reset) once per frame before processing events so
/// that `pressed`/`released` describe only the current frame. Without it the
/// edge sets keep growing.
pub struct Keyboard {
    state: Rc<RefCell<KeyState>>,
}

impl Keyboard {
    /// Creates a keyboard listening for key-down and key-up on `events`.
    pub fn new(events: &mut EventSystem) -> Self {
        let state = Rc::new(RefCell::new(KeyState::new()));
        let listener = Rc::new(RefCell::new(KeyboardListener {
            state: state.clone(),
        }));
        events.add_listener(listener.clone(), EventKind::KeyDown);
        events.add_listener(listener, EventKind::KeyUp);
        Self { state }
    }

    pub fn reset(&self) {
        self.state.borrow_mut().reset();
    }

    /// Went down since the last reset.
    #[must_use]
    pub fn pressed(&self, key: Key) -> bool {
        self.state.borrow().pressed(key)
    }

    /// Came up since the last reset.
    #[must_use]
    pub fn released(&self, key: Key) -> bool {
        self.state.borrow().released(key)
    }

    /// Currently down.
    #[must_use]
    pub fn hold(&self, key: Key) -> bool {
        self.state.borrow().hold(key)
    }

    /// A copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> KeyState {
        self.state.borrow().clone()
    }
}
