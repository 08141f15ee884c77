//! Event bus and handler table.
//!
//! Instances listen for `SignalUpdate` and `PropsChange` notifications; the
//! bus keeps listeners in registration order, which is the order changes are
//! routed in. Handlers bound through attributes live in a separate table,
//! keyed by their address-qualified id and owned by the instance that
//! rendered them.

use std::collections::HashMap;

use crate::template::Handler;
use crate::types::{Address, EventKind, HandlerId};

// =============================================================================
// EVENT BUS
// =============================================================================

pub type ListenerId = usize;

#[derive(Debug, Clone)]
struct Listener {
    id: ListenerId,
    kind: EventKind,
    address: Address,
}

#[derive(Debug, Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
    next_id: ListenerId,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Register the instance at `address` for `kind` notifications.
    pub fn listen(&mut self, kind: EventKind, address: Address) -> ListenerId {
        let id = self.next_id();
        self.listeners.push(Listener { id, kind, address });
        id
    }

    pub fn remove(&mut self, id: ListenerId) {
        self.listeners.retain(|listener| listener.id != id);
    }

    /// Addresses listening for `kind`, in registration order.
    pub fn listeners(&self, kind: EventKind) -> impl Iterator<Item = &Address> {
        self.listeners
            .iter()
            .filter(move |listener| listener.kind == kind)
            .map(|listener| &listener.address)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

// =============================================================================
// HANDLER TABLE
// =============================================================================

struct HandlerEntry {
    owner: Address,
    handler: Handler,
}

#[derive(Default)]
pub struct HandlerTable {
    handlers: HashMap<HandlerId, HandlerEntry>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every handler owned by `owner` with `handlers`.
    pub fn replace_owned(&mut self, owner: &Address, handlers: Vec<(HandlerId, Handler)>) {
        self.remove_owned(owner);
        for (id, handler) in handlers {
            self.handlers.insert(
                id,
                HandlerEntry {
                    owner: owner.clone(),
                    handler,
                },
            );
        }
    }

    pub fn remove_owned(&mut self, owner: &Address) {
        self.handlers.retain(|_, entry| entry.owner != *owner);
    }

    pub fn get(&self, id: &str) -> Option<Handler> {
        self.handlers.get(id).map(|entry| entry.handler.clone())
    }

    pub fn ids(&self) -> impl Iterator<Item = &HandlerId> {
        self.handlers.keys()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
