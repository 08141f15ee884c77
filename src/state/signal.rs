//! Path-tracked reactive values.
//!
//! A [`Signal`] holds a JSON document. Reads go through paths (`"items.0.label"`)
//! and are recorded into the current render frame; writes compare against the
//! stored value and broadcast a [`ChangeEvent`] only when something changed.
//!
//! Listeners are plain callbacks held in a thread-local registry. They run
//! synchronously, in registration order, after the write has been stored.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use super::tracking;
use crate::types::{ChangeEvent, PATH_SEPARATOR, SignalId};

// =============================================================================
// Signal
// =============================================================================

struct SignalCell {
    id: SignalId,
    value: RefCell<Json>,
}

/// A reactive JSON value with path-level change tracking.
///
/// Cloning is cheap and yields a handle to the same value.
#[derive(Clone)]
pub struct Signal(Rc<SignalCell>);

impl Signal {
    fn new(initial: Json) -> Self {
        let id = NEXT_SIGNAL_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        Self(Rc::new(SignalCell {
            id,
            value: RefCell::new(initial),
        }))
    }

    pub fn id(&self) -> SignalId {
        self.0.id
    }

    /// Tracked read of the whole value.
    pub fn get(&self) -> Json {
        self.read("")
    }

    /// Tracked read, deserialized. `None` if the value has a different shape.
    pub fn get_as<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.get()).ok()
    }

    /// Untracked read of the whole value.
    pub fn peek(&self) -> Json {
        self.0.value.borrow().clone()
    }

    /// Replace the whole value.
    pub fn set(&self, value: impl Into<Json>) {
        self.write("", value.into());
    }

    /// Replace the value with `f(current)`. The current value is read untracked.
    pub fn update(&self, f: impl FnOnce(&Json) -> Json) {
        let next = f(&self.peek());
        self.set(next);
    }

    /// Accessor for the value at `path` (dot separated, array indices allowed).
    pub fn at(&self, path: &str) -> Accessor {
        Accessor {
            signal: self.clone(),
            path: path.to_string(),
        }
    }

    fn read(&self, path: &str) -> Json {
        let id = self.id();
        let value = self.0.value.borrow();
        let mut current = Some(&*value);
        tracking::record_read(id, "", false);

        let mut prefix = String::with_capacity(path.len());
        for segment in segments(path) {
            if !prefix.is_empty() {
                prefix.push(PATH_SEPARATOR);
            }
            prefix.push_str(segment);
            current = current.and_then(|v| child(v, segment));
            tracking::record_read(id, &prefix, false);
        }

        let result = current.cloned().unwrap_or(Json::Null);
        if result.is_object() || result.is_array() {
            tracking::record_read(id, path, true);
        }
        result
    }

    fn peek_at(&self, path: &str) -> Json {
        let value = self.0.value.borrow();
        segments(path)
            .try_fold(&*value, child)
            .cloned()
            .unwrap_or(Json::Null)
    }

    fn write(&self, path: &str, next: Json) {
        let changed = {
            let mut value = self.0.value.borrow_mut();
            let Some(slot) = segments(path).try_fold(&mut *value, child_mut) else {
                tracing::warn!(
                    signal = self.id(),
                    path,
                    "array index far past the end, write dropped"
                );
                return;
            };
            if *slot == next {
                false
            } else {
                *slot = next;
                true
            }
        };

        if changed {
            tracing::trace!(signal = self.id(), path, "signal changed");
            broadcast(&ChangeEvent::Signal {
                id: self.id(),
                path: path.to_string(),
            });
        }
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id())
            .field("value", &*self.0.value.borrow())
            .finish()
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(PATH_SEPARATOR).filter(|segment| !segment.is_empty())
}

fn child<'a>(value: &'a Json, segment: &str) -> Option<&'a Json> {
    match value {
        Json::Object(map) => map.get(segment),
        Json::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// How many nulls a write may pad an array with.
const MAX_ARRAY_PADDING: usize = 1024;

/// Step into `segment`, creating it if missing.
///
/// Missing object keys are inserted as null and any value in the way that is
/// neither object nor array becomes an empty object. An array index past the
/// end pads with nulls, up to [`MAX_ARRAY_PADDING`]; further out is refused.
fn child_mut<'a>(value: &'a mut Json, segment: &str) -> Option<&'a mut Json> {
    let index = segment.parse::<usize>().ok();
    let indexable = value.is_object() || (value.is_array() && index.is_some());
    if !indexable {
        *value = Json::Object(serde_json::Map::new());
    }
    match value {
        Json::Array(items) => {
            let index = index.unwrap_or_default();
            if index > items.len() + MAX_ARRAY_PADDING {
                return None;
            }
            if items.len() <= index {
                items.resize(index + 1, Json::Null);
            }
            items.get_mut(index)
        }
        Json::Object(map) => Some(map.entry(segment.to_string()).or_insert(Json::Null)),
        other => Some(other),
    }
}

// =============================================================================
// Accessor
// =============================================================================

/// A signal narrowed to one path.
#[derive(Clone, Debug, PartialEq)]
pub struct Accessor {
    signal: Signal,
    path: String,
}

impl Accessor {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    /// Tracked read. Missing paths read as null.
    pub fn get(&self) -> Json {
        self.signal.read(&self.path)
    }

    pub fn get_as<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.get()).ok()
    }

    pub fn set(&self, value: impl Into<Json>) {
        self.signal.write(&self.path, value.into());
    }

    pub fn update(&self, f: impl FnOnce(&Json) -> Json) {
        let next = f(&self.signal.peek_at(&self.path));
        self.set(next);
    }

    /// Accessor for `path` below this one.
    pub fn at(&self, path: &str) -> Accessor {
        let path = if self.path.is_empty() {
            path.to_string()
        } else {
            format!("{}{PATH_SEPARATOR}{path}", self.path)
        };
        Accessor {
            signal: self.signal.clone(),
            path,
        }
    }
}

// =============================================================================
// Creation
// =============================================================================

thread_local! {
    static NEXT_SIGNAL_ID: Cell<SignalId> = const { Cell::new(1) };
}

/// Create a signal that is not owned by any instance.
pub fn create_signal(initial: impl Into<Json>) -> Signal {
    Signal::new(initial.into())
}

/// The calling instance's next local signal.
///
/// Signals are matched to calls by order, so an instance must call
/// `use_signal` the same number of times on every render. `initial` is only
/// used the first time. Outside a render this is [`create_signal`].
pub fn use_signal(initial: impl Into<Json>) -> Signal {
    let mut initial = Some(initial.into());
    let created = tracking::next_instance_signal(|| {
        Signal::new(initial.take().unwrap_or(Json::Null))
    });
    match created {
        Some(signal) => signal,
        None => Signal::new(initial.take().unwrap_or(Json::Null)),
    }
}

// =============================================================================
// Change listeners
// =============================================================================

/// Handle returned by [`on_change`].
pub type ListenerId = usize;

type ChangeListener = Rc<dyn Fn(&ChangeEvent)>;

struct ListenerRegistry {
    listeners: Vec<(ListenerId, ChangeListener)>,
    next_id: ListenerId,
}

thread_local! {
    static LISTENERS: RefCell<ListenerRegistry> = const {
        RefCell::new(ListenerRegistry {
            listeners: Vec::new(),
            next_id: 0,
        })
    };
}

/// Subscribe to every signal change on this thread.
pub fn on_change(listener: impl Fn(&ChangeEvent) + 'static) -> ListenerId {
    LISTENERS.with(|reg| {
        let mut reg = reg.borrow_mut();
        let id = reg.next_id;
        reg.next_id += 1;
        reg.listeners.push((id, Rc::new(listener)));
        id
    })
}

pub fn remove_listener(id: ListenerId) {
    LISTENERS.with(|reg| {
        reg.borrow_mut().listeners.retain(|(listener_id, _)| *listener_id != id);
    });
}

fn broadcast(event: &ChangeEvent) {
    // Snapshot so listeners may subscribe or write while we iterate.
    let listeners: Vec<ChangeListener> = LISTENERS.with(|reg| {
        reg.borrow()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    });
    for listener in listeners {
        listener(event);
    }
}

/// Clear listeners and render frames (for testing).
pub fn reset_signal_state() {
    LISTENERS.with(|reg| {
        let mut reg = reg.borrow_mut();
        reg.listeners.clear();
        reg.next_id = 0;
    });
    tracking::reset_tracking();
}

// =============================================================================
// Tests
// =============================================================================
