//! Typed publish/subscribe bus shared by the scene and its observers.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::element::{ElementId, ElementType};
use crate::loaders::LoadError;

/// Unique identifier for a registered callback.
pub type CallbackId = u32;

type EventCallback = Rc<dyn Fn(&Event)>;

/// Discriminant used to subscribe to a family of events
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum EventKind {
    Error,
    Loaded,
    ElementAdded,
    ElementRemoved,
    BoundUpdated,
    Updated(ElementType),
    PreRender,
    PostRender,
}

/// Scene notifications with their payloads
#[derive(Clone, Debug)]
pub enum Event {
    /// A load failed, or `None` to clear a previously reported error
    Error(Option<Arc<LoadError>>),
    /// A model finished loading, carries its display name
    Loaded(String),
    /// An element joined the scene. Carries its identity rather than the
    /// element itself; look it up with `Scene::get` or `Scene::element`.
    ElementAdded {
        id: ElementId,
        kind: ElementType,
        name: String,
    },
    ElementRemoved {
        id: ElementId,
        kind: ElementType,
    },
    /// The aggregate scene bound was recomputed
    BoundUpdated,
    /// At least one element of this type changed this frame
    Updated(ElementType),
    PreRender,
    PostRender,
}

impl Event {
    /// Returns the [`EventKind`] discriminant for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Error(_) => EventKind::Error,
            Self::Loaded(_) => EventKind::Loaded,
            Self::ElementAdded { .. } => EventKind::ElementAdded,
            Self::ElementRemoved { .. } => EventKind::ElementRemoved,
            Self::BoundUpdated => EventKind::BoundUpdated,
            Self::Updated(kind) => EventKind::Updated(*kind),
            Self::PreRender => EventKind::PreRender,
            Self::PostRender => EventKind::PostRender,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Loaded => f.write_str("loaded"),
            Self::ElementAdded => f.write_str("scene.elementAdded"),
            Self::ElementRemoved => f.write_str("scene.elementRemoved"),
            Self::BoundUpdated => f.write_str("scene.boundUpdated"),
            Self::Updated(kind) => write!(f, "updated:{kind}"),
            Self::PreRender => f.write_str("prerender"),
            Self::PostRender => f.write_str("postrender"),
        }
    }
}

#[derive(Default)]
struct Registry {
    callback_map: HashMap<EventKind, Vec<(CallbackId, EventCallback)>>,
    catch_all: Vec<(CallbackId, EventCallback)>,
    next_id: CallbackId,
}

impl Registry {
    fn next_id(&mut self) -> CallbackId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Cloneable handle to a single-threaded event bus.
///
/// Callbacks for a kind run in registration order, after any catch-all
/// callbacks. Callbacks may subscribe or unsubscribe while an event is being
/// fired; the change applies from the next `fire`.
#[derive(Clone, Default)]
pub struct Events {
    inner: Rc<RefCell<Registry>>,
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for a specific event kind.
    pub fn on<F>(&self, kind: EventKind, callback: F) -> CallbackId
    where
        F: Fn(&Event) + 'static,
    {
        let mut registry = self.inner.borrow_mut();
        let id = registry.next_id();
        registry
            .callback_map
            .entry(kind)
            .or_default()
            .push((id, Rc::new(callback)));
        id
    }

    /// Registers a callback that receives every event.
    pub fn on_any<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&Event) + 'static,
    {
        let mut registry = self.inner.borrow_mut();
        let id = registry.next_id();
        registry.catch_all.push((id, Rc::new(callback)));
        id
    }

    /// Unregisters a callback by its ID.
    ///
    /// Returns `true` if the callback was found and removed, `false` otherwise.
    pub fn off(&self, id: CallbackId) -> bool {
        let mut registry = self.inner.borrow_mut();
        if let Some(pos) = registry.catch_all.iter().position(|(cid, _)| *cid == id) {
            registry.catch_all.remove(pos);
            return true;
        }
        for callbacks in registry.callback_map.values_mut() {
            if let Some(pos) = callbacks.iter().position(|(cid, _)| *cid == id) {
                callbacks.remove(pos);
                return true;
            }
        }
        false
    }

    /// Dispatches an event to every callback registered for its kind.
    pub fn fire(&self, event: Event) {
        log::trace!("event {}", event.kind());

        // snapshot the callbacks so handlers can touch the registry
        let callbacks: Vec<EventCallback> = {
            let registry = self.inner.borrow();
            let specific = registry.callback_map.get(&event.kind()).into_iter().flatten();
            registry
                .catch_all
                .iter()
                .chain(specific)
                .map(|(_, cb)| Rc::clone(cb))
                .collect()
        };

        for callback in callbacks {
            callback(&event);
        }
    }

    /// Number of callbacks that would receive an event of `kind`
    pub fn listener_count(&self, kind: EventKind) -> usize {
        let registry = self.inner.borrow();
        registry.catch_all.len() + registry.callback_map.get(&kind).map_or(0, Vec::len)
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.borrow();
        f.debug_struct("Events")
            .field("kinds", &registry.callback_map.len())
            .field("catch_all", &registry.catch_all.len())
            .finish()
    }
}
