//! Instance Registry - live component occurrences by address.
//!
//! Manages the lifecycle of instances:
//! - Address -> Instance mapping, in mount order
//! - Release of every instance strictly below an address
//! - Destroy callbacks per address, handed back to the caller to run

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::components::Component;
use crate::state::{Signal, SignalAccess};
use crate::template::TemplateNode;
use crate::types::{Address, EventKind};

use super::events::ListenerId;

// =============================================================================
// Instance
// =============================================================================

/// State for one mounted component occurrence.
pub struct Instance {
    pub address: Address,
    /// Registered name of the component (the root uses its address)
    pub name: String,
    pub component: Rc<dyn Component>,
    /// Local signals, in `use_signal` call order
    pub signals: Vec<Signal>,
    /// Reads recorded by the last successful render
    pub access: SignalAccess,
    /// Filled tree of the last committed render
    pub prev: Option<TemplateNode>,
    pub listeners: HashMap<EventKind, ListenerId>,
    /// Set when a change is routed to the instance, cleared on commit
    pub dirty: bool,
    on_destroy: Vec<Box<dyn FnOnce()>>,
}

impl Instance {
    pub fn new(address: Address, name: impl Into<String>, component: Rc<dyn Component>) -> Self {
        Self {
            address,
            name: name.into(),
            component,
            signals: Vec::new(),
            access: SignalAccess::new(),
            prev: None,
            listeners: HashMap::new(),
            dirty: false,
            on_destroy: Vec::new(),
        }
    }

    /// Run destroy callbacks, consuming the instance.
    pub fn destroy(self) {
        for callback in self.on_destroy {
            callback();
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("address", &self.address)
            .field("name", &self.name)
            .field("signals", &self.signals.len())
            .field("mounted", &self.prev.is_some())
            .field("dirty", &self.dirty)
            .finish()
    }
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Debug, Default)]
pub struct InstanceRegistry {
    instances: IndexMap<Address, Instance>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instance: Instance) {
        self.instances.insert(instance.address.clone(), instance);
    }

    pub fn get(&self, address: &Address) -> Option<&Instance> {
        self.instances.get(address)
    }

    pub fn get_mut(&mut self, address: &Address) -> Option<&mut Instance> {
        self.instances.get_mut(address)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.instances.contains_key(address)
    }

    /// Register a callback to run when the instance at `address` is destroyed.
    ///
    /// Returns false if no instance lives at `address`.
    pub fn on_destroy(&mut self, address: &Address, callback: impl FnOnce() + 'static) -> bool {
        match self.instances.get_mut(address) {
            Some(instance) => {
                instance.on_destroy.push(Box::new(callback));
                true
            }
            None => false,
        }
    }

    /// Remove every instance strictly below `address`, deepest first.
    ///
    /// The removed instances are returned so the caller can unregister their
    /// listeners and run [`Instance::destroy`] once no borrows are held.
    pub fn release_below(&mut self, address: &Address) -> Vec<Instance> {
        let mut stale: Vec<Address> = self
            .instances
            .keys()
            .filter(|key| key.is_descendant_of(address))
            .cloned()
            .collect();
        stale.sort_by_key(|key| std::cmp::Reverse(key.as_str().len()));
        stale
            .iter()
            .filter_map(|key| self.instances.shift_remove(key))
            .collect()
    }

    /// Remove the instance at `address` and everything below it.
    pub fn release(&mut self, address: &Address) -> Vec<Instance> {
        let mut released = self.release_below(address);
        if let Some(instance) = self.instances.shift_remove(address) {
            released.push(instance);
        }
        released
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.instances.keys()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use crate::hlx;
    use crate::template::Props;
    use std::cell::Cell;

    fn component() -> Rc<dyn Component> {
        Rc::new(|_: &Props| -> Result<TemplateNode, CompileError> { hlx!(["<p></p>"]) })
    }

    fn instance(address: &str) -> Instance {
        Instance::new(Address::new(address), "Test", component())
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = InstanceRegistry::new();
        registry.insert(instance("hlx"));
        registry.insert(instance("hlx-0"));
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&Address::new("hlx-0")));
        assert!(registry.get(&Address::new("hlx-1")).is_none());
    }

    #[test]
    fn test_release_below_is_boundary_aware() {
        let mut registry = InstanceRegistry::new();
        for address in ["hlx", "hlx-slot.1", "hlx-slot.1.0", "hlx-slot.1-0", "hlx-slot.10"] {
            registry.insert(instance(address));
        }

        let released = registry.release_below(&Address::new("hlx-slot.1"));
        let mut released: Vec<String> = released
            .iter()
            .map(|i| i.address.to_string())
            .collect();
        released.sort();
        assert_eq!(released, vec!["hlx-slot.1-0", "hlx-slot.1.0"]);
        assert!(registry.contains(&Address::new("hlx-slot.1")));
        assert!(registry.contains(&Address::new("hlx-slot.10")));
    }

    #[test]
    fn test_release_keeps_mount_order() {
        let mut registry = InstanceRegistry::new();
        for address in ["hlx", "hlx-0", "hlx-1", "hlx-2"] {
            registry.insert(instance(address));
        }
        registry.release(&Address::new("hlx-1"));
        let order: Vec<&str> = registry.addresses().map(Address::as_str).collect();
        assert_eq!(order, vec!["hlx", "hlx-0", "hlx-2"]);
    }

    #[test]
    fn test_destroy_callback() {
        let called = Rc::new(Cell::new(false));
        let called_clone = called.clone();

        let mut registry = InstanceRegistry::new();
        registry.insert(instance("hlx"));
        registry.insert(instance("hlx-0"));
        assert!(registry.on_destroy(&Address::new("hlx-0"), move || {
            called_clone.set(true);
        }));
        assert!(!registry.on_destroy(&Address::new("hlx-9"), || {}));

        let released = registry.release_below(&Address::new("hlx"));
        assert!(!called.get());
        released.into_iter().for_each(Instance::destroy);
        assert!(called.get());
    }
}
