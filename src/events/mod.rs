//! Type-keyed event dispatch
//!
//! Platform occurrences arrive as [`Event`]s pulled from an [`EventSource`].
//! [`EventSystem::process_events`] drains the source and hands each event to
//! every listener registered for its [`EventKind`], in registration order.
//!
//! ```
//! use std::collections::VecDeque;
//! use square_engine::events::{Event, EventKind, EventSystem, Key};
//!
//! let mut events = EventSystem::new();
//! events.add_fn(EventKind::Quit, |_: &Event| {
//!     println!("quit requested");
//!     Ok(())
//! });
//!
//! let mut queue = VecDeque::from([Event::Quit, Event::KeyDown { key: Key::KeyQ, repeat: false }]);
//! assert_eq!(events.process_events(&mut queue).ok(), Some(2));
//! ```

pub mod platform;

pub use platform::Platform;

use log::{debug, trace};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use thiserror::Error;

/// Physical key identifier carried by keyboard events.
pub type Key = winit::keyboard::KeyCode;

/// A platform occurrence, produced by an [`EventSource`] and consumed within
/// one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A key went down. `repeat` is set for auto-repeat events while held.
    KeyDown { key: Key, repeat: bool },
    KeyUp { key: Key },
    /// The user or the OS asked the application to close.
    Quit,
    /// The drawable area changed size, in physical pixels.
    Resized { width: u32, height: u32 },
}

impl Event {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::KeyDown { .. } => EventKind::KeyDown,
            Self::KeyUp { .. } => EventKind::KeyUp,
            Self::Quit => EventKind::Quit,
            Self::Resized { .. } => EventKind::Resized,
        }
    }

    /// The key for keyboard events.
    #[must_use]
    pub fn key(&self) -> Option<Key> {
        match self {
            Self::KeyDown { key, .. } | Self::KeyUp { key } => Some(*key),
            _ => None,
        }
    }
}

/// Tag used to route events to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    KeyDown,
    KeyUp,
    Quit,
    Resized,
}

/// Error raised by a listener. Aborts the current poll cycle.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Something that reacts to events.
///
/// Implemented for any `FnMut(&Event) -> Result<(), ListenerError>`.
pub trait EventListener {
    fn listen(&mut self, event: &Event) -> Result<(), ListenerError>;
}

impl<F> EventListener for F
where
    F: FnMut(&Event) -> Result<(), ListenerError>,
{
    fn listen(&mut self, event: &Event) -> Result<(), ListenerError> {
        self(event)
    }
}

/// Listener handle shared between the registry and its owner.
pub type SharedListener = Rc<RefCell<dyn EventListener>>;

/// A pull-based queue of pending platform events.
pub trait EventSource {
    /// Returns the next pending event, or `None` once nothing is queued.
    fn poll_event(&mut self) -> Option<Event>;
}

impl EventSource for VecDeque<Event> {
    fn poll_event(&mut self) -> Option<Event> {
        self.pop_front()
    }
}

/// Identifies one registration in an [`EventSystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

impl ListenerId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Listener for {kind:?} events failed: {source}")]
    Listener {
        kind: EventKind,
        #[source]
        source: ListenerError,
    },

    #[error("Listener {id:?} for {kind:?} events is already borrowed")]
    ListenerBusy { kind: EventKind, id: ListenerId },
}

struct ListenerSlot {
    listener: SharedListener,
    active: bool,
}

/// Registry mapping event kinds to ordered listener lists.
///
/// Registrations live in an arena of slots so that removing one is a flag
/// flip that leaves every other [`ListenerId`] valid.
#[derive(Default)]
pub struct EventSystem {
    slots: Vec<ListenerSlot>,
    routes: HashMap<EventKind, Vec<ListenerId>>,
}

impl EventSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for future events of `kind`.
    ///
    /// Registering the same listener twice delivers each event to it twice.
    pub fn add_listener(&mut self, listener: SharedListener, kind: EventKind) -> ListenerId {
        let id = ListenerId(self.slots.len());
        self.slots.push(ListenerSlot {
            listener,
            active: true,
        });
        self.routes.entry(kind).or_default().push(id);
        debug!(target: "events", "Registered listener {} for {:?}", id.0, kind);
        id
    }

    /// Registers a closure as a listener for `kind`.
    pub fn add_fn<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&Event) -> Result<(), ListenerError> + 'static,
    {
        let shared: SharedListener = Rc::new(RefCell::new(listener));
        self.add_listener(shared, kind)
    }

    /// Stops delivering events to the registration `id`.
    ///
    /// Returns `false` if it was unknown or already removed.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        match self.slots.get_mut(id.0) {
            Some(slot) if slot.active => {
                slot.active = false;
                debug!(target: "events", "Removed listener {}", id.0);
                true
            }
            _ => false,
        }
    }

    /// Number of active registrations for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.routes.get(&kind).map_or(0, |ids| {
            ids.iter().filter(|id| self.slots[id.0].active).count()
        })
    }

    /// Drains `source` and dispatches every event it yields.
    ///
    /// Returns the number of events dispatched. The first listener error stops
    /// the cycle: the failing event goes no further and events still queued in
    /// the source are left for the next call.
    pub fn process_events<S>(&self, source: &mut S) -> Result<usize, EventError>
    where
        S: EventSource + ?Sized,
    {
        let mut dispatched = 0;
        while let Some(event) = source.poll_event() {
            self.dispatch(&event)?;
            dispatched += 1;
        }
        if dispatched > 0 {
            trace!(target: "events", "Processed {} events", dispatched);
        }
        Ok(dispatched)
    }

    /// Delivers one event to the active listeners registered for its kind.
    pub fn dispatch(&self, event: &Event) -> Result<(), EventError> {
        let kind = event.kind();
        let Some(ids) = self.routes.get(&kind) else {
            return Ok(());
        };

        for &id in ids {
            let slot = &self.slots[id.0];
            if !slot.active {
                continue;
            }
            let mut listener = slot
                .listener
                .try_borrow_mut()
                .map_err(|_| EventError::ListenerBusy { kind, id })?;
            listener
                .listen(event)
                .map_err(|source| EventError::Listener { kind, source })?;
        }
        Ok(())
    }
}
