//! Render Engine - addressing and per-root bookkeeping.
//!
//! - [`fill`] - assigns addresses to a compiled tree and resolves its markup
//! - [`InstanceRegistry`] - live component occurrences by address
//! - [`ComponentRegistry`] - tag name to component, with define callbacks
//! - [`EventBus`] / [`HandlerTable`] - change routing and attribute handlers
//! - [`PropsRecords`] - last-seen props per component element
//!
//! All of it hangs off one [`RenderContext`] owned by a root, so independent
//! roots never share state.

mod components;
mod events;
mod fill;
mod props;
mod registry;

pub use components::*;
pub use events::*;
pub use fill::*;
pub use props::*;
pub use registry::*;

use crate::config::RuntimeConfig;
use crate::types::Address;

/// Explicit state of one render root.
pub struct RenderContext {
    pub config: RuntimeConfig,
    pub instances: InstanceRegistry,
    pub components: ComponentRegistry,
    pub handlers: HandlerTable,
    pub props: PropsRecords,
    pub bus: EventBus,
}

impl RenderContext {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            instances: InstanceRegistry::new(),
            components: ComponentRegistry::new(),
            handlers: HandlerTable::new(),
            props: PropsRecords::new(),
            bus: EventBus::new(),
        }
    }

    /// Forget everything the instances in `released` owned.
    pub fn forget(&mut self, released: &[Instance]) {
        for instance in released {
            for id in instance.listeners.values() {
                self.bus.remove(*id);
            }
            self.handlers.remove_owned(&instance.address);
            self.props.remove_owned(&instance.address);
        }
    }

    /// Remove every instance strictly below `address` and what they owned.
    pub fn release_below(&mut self, address: &Address) -> Vec<Instance> {
        let released = self.instances.release_below(address);
        self.forget(&released);
        released
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}
