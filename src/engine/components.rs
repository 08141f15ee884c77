//! Components and the tag registry.
//!
//! A component turns props into a compiled template. Lifecycle hooks are
//! explicit trait methods with empty defaults; plain closures are components
//! with no hooks.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::config::RuntimeConfig;
use crate::error::CompileError;
use crate::template::markup::component_tag;
use crate::template::{Props, TemplateNode};
use crate::types::Address;

pub trait Component {
    /// Produce this component's template for `props`.
    fn render(&self, props: &Props) -> Result<TemplateNode, CompileError>;

    /// Called once after the first render is in the document.
    fn mounted(&self, _address: &Address) {}

    /// Called after every committed re-render.
    fn updated(&self, _address: &Address) {}

    /// Called when the instance is destroyed, before its markup is replaced.
    fn unmounted(&self, _address: &Address) {}
}

impl<F> Component for F
where
    F: Fn(&Props) -> Result<TemplateNode, CompileError>,
{
    fn render(&self, props: &Props) -> Result<TemplateNode, CompileError> {
        self(props)
    }
}

/// Called with `(component name, internal tag name)` the first time a tag is used.
pub type DefineCallback = Rc<dyn Fn(&str, &str)>;

/// Maps component tag names to components.
#[derive(Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Rc<dyn Component>>,
    defined: HashSet<String>,
    on_define: Vec<DefineCallback>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, component: Rc<dyn Component>) {
        self.components.insert(name.into(), component);
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn Component>> {
        self.components.get(name).cloned()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn on_define(&mut self, callback: DefineCallback) {
        self.on_define.push(callback);
    }

    /// Mark `name` as encountered.
    ///
    /// The first time, returns the callbacks to notify with the internal tag
    /// name; they are run by the caller outside any borrow.
    pub fn define(
        &mut self,
        name: &str,
        config: &RuntimeConfig,
    ) -> Option<(String, Vec<DefineCallback>)> {
        if !self.defined.insert(name.to_string()) {
            return None;
        }
        let tag = component_tag(&config.tag_prefix, name);
        tracing::debug!(component = name, tag = %tag, "component defined");
        Some((tag, self.on_define.clone()))
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.defined.contains(name)
    }
}
