//! Mount API - render roots and their lifecycle.
//!
//! A [`Root`] owns everything one mounted application needs: the render
//! context, the output sink, the queue of pending changes and a revision
//! counter. Signal writes anywhere in the thread reach every live root
//! through the store's change listeners.
//!
//! # Example
//!
//! ```ignore
//! use spark_hlx::{hlx, Root, RuntimeConfig, use_signal, template::{Props, Value}};
//!
//! let root = Root::headless(RuntimeConfig::default());
//! root.mount(|_: &Props| {
//!     let count = use_signal(0);
//!     let inc = count.clone();
//!     hlx!(["<p>", "</p><button onclick=", ">+</button>"];
//!          count.get(),
//!          Value::handler(move |_| inc.update(|n| (n.as_i64().unwrap_or(0) + 1).into())))
//! })?;
//!
//! root.dispatch("hlx-0:onclick", &Event::new("click"))?;
//! ```

use std::cell::{Cell, Ref, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use spark_signals::signal;

use crate::config::RuntimeConfig;
use crate::engine::{Component, RenderContext};
use crate::error::{RenderError, Result};
use crate::renderer::{DomSink, MarkupDocument};
use crate::state::{self, ListenerId, Signal};
use crate::template::TemplateNode;
use crate::types::{Address, ChangeEvent, Event, HandlerId};

// =============================================================================
// Root state
// =============================================================================

pub(super) struct RootInner<S: DomSink> {
    pub(super) cx: RefCell<RenderContext>,
    pub(super) sink: RefCell<S>,
    pub(super) pending: RefCell<VecDeque<ChangeEvent>>,
    pub(super) busy: Cell<bool>,
    pub(super) errors: RefCell<Vec<RenderError>>,
    pub(super) revision: spark_signals::Signal<u64>,
    listener: Cell<Option<ListenerId>>,
}

/// Clears the busy flag when a flush ends, on every exit path.
pub(super) struct BusyGuard<'a>(&'a Cell<bool>);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<S: DomSink> RootInner<S> {
    pub(super) fn enter(&self) -> Result<BusyGuard<'_>> {
        if self.busy.replace(true) {
            return Err(RenderError::Reentrant);
        }
        Ok(BusyGuard(&self.busy))
    }

    /// Queue a change from the store; flush now unless a flush is running.
    fn notify(&self, event: &ChangeEvent) {
        self.pending.borrow_mut().push_back(event.clone());
        if self.busy.get() {
            return;
        }
        if let Ok(_guard) = self.enter() {
            self.drain_recording();
        }
    }

    /// Drain with the busy flag held, keeping any error for `take_errors`.
    fn drain_recording(&self) {
        if let Err(err) = self.drain() {
            tracing::error!(error = %err, "render triggered by a signal write failed");
            self.errors.borrow_mut().push(err);
        }
    }

    pub(super) fn bump_revision(&self) {
        self.revision.set(self.revision.get() + 1);
    }
}

impl<S: DomSink> Drop for RootInner<S> {
    fn drop(&mut self) {
        if let Some(id) = self.listener.take() {
            state::remove_listener(id);
        }
    }
}

// =============================================================================
// Root
// =============================================================================

/// One mounted application.
///
/// Dropping the root stops it from reacting to signal writes; the sink keeps
/// whatever it last rendered.
pub struct Root<S: DomSink + 'static = MarkupDocument> {
    inner: Rc<RootInner<S>>,
}

impl Root<MarkupDocument> {
    /// A root rendering into an in-memory [`MarkupDocument`].
    pub fn headless(config: RuntimeConfig) -> Self {
        let document = MarkupDocument::new(&config.root());
        Self::new(document, config)
    }
}

impl<S: DomSink + 'static> Root<S> {
    pub fn new(sink: S, config: RuntimeConfig) -> Self {
        let inner = Rc::new(RootInner {
            cx: RefCell::new(RenderContext::new(config)),
            sink: RefCell::new(sink),
            pending: RefCell::new(VecDeque::new()),
            busy: Cell::new(false),
            errors: RefCell::new(Vec::new()),
            revision: signal(0),
            listener: Cell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let id = state::on_change(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.notify(event);
            }
        });
        inner.listener.set(Some(id));

        Self { inner }
    }

    /// Make `component` available as `<name />` in templates.
    pub fn register(&self, name: impl Into<String>, component: impl Component + 'static) {
        self.inner
            .cx
            .borrow_mut()
            .components
            .register(name, Rc::new(component));
    }

    /// Called with `(component name, internal tag name)` the first time each
    /// component tag is encountered.
    pub fn on_define(&self, callback: impl Fn(&str, &str) + 'static) {
        self.inner.cx.borrow_mut().components.on_define(Rc::new(callback));
    }

    /// Render `component` at the root address.
    ///
    /// Mounting again tears down the previous tree and replaces its markup,
    /// but only once the new component has rendered; a failed render leaves
    /// the mounted tree as it was.
    pub fn mount(&self, component: impl Component + 'static) -> Result<()> {
        let _guard = self.inner.enter()?;
        self.inner.cx.borrow().config.validate()?;
        let address = self.address();
        let prepared = self
            .inner
            .prepare(address.clone(), address.to_string(), Rc::new(component))?;

        if self.is_mounted() {
            self.inner.destroy(&address);
        }
        let replace = self.inner.sink.borrow().holds(&address);
        self.inner.install(prepared, replace)?;
        self.inner.drain()
    }

    /// Invoke the handler registered under `id` and flush what it changed.
    pub fn dispatch(&self, id: &str, event: &Event) -> Result<()> {
        let handler = self.inner.cx.borrow().handlers.get(id);
        let Some(handler) = handler else {
            tracing::warn!(id, "event for unknown handler");
            return Err(RenderError::UnknownHandler { id: id.to_string() });
        };
        let _guard = self.inner.enter()?;
        tracing::trace!(id, event = %event.name, "dispatch");
        handler(event);
        self.inner.drain()
    }

    /// Process queued changes now.
    pub fn flush(&self) -> Result<()> {
        let _guard = self.inner.enter()?;
        self.inner.drain()
    }

    /// Destroy every instance. The sink keeps its current markup.
    pub fn unmount(&self) {
        let address = self.address();
        self.inner.destroy(&address);
        self.inner.pending.borrow_mut().clear();
    }

    pub fn is_mounted(&self) -> bool {
        let address = self.address();
        self.inner.cx.borrow().instances.contains(&address)
    }

    pub fn address(&self) -> Address {
        self.inner.cx.borrow().config.root()
    }

    /// Borrow the sink for reading.
    ///
    /// Drop the borrow before writing any signal: a write flushes at once,
    /// and committing into a borrowed sink panics.
    pub fn sink(&self) -> Ref<'_, S> {
        self.inner.sink.borrow()
    }

    /// Mutate the sink directly, e.g. to simulate user input.
    ///
    /// Signal writes made inside `f` are queued and flushed once the sink
    /// is released; their errors go to [`take_errors`](Self::take_errors).
    pub fn with_sink<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let guard = self.inner.enter().ok();
        let result = f(&mut self.inner.sink.borrow_mut());
        if guard.is_some() {
            self.inner.drain_recording();
        }
        result
    }

    /// Counter bumped after every committed batch; readable from effects.
    pub fn revision(&self) -> spark_signals::Signal<u64> {
        self.inner.revision.clone()
    }

    /// Errors raised by renders that signal writes triggered.
    pub fn take_errors(&self) -> Vec<RenderError> {
        std::mem::take(&mut *self.inner.errors.borrow_mut())
    }

    pub fn instance_count(&self) -> usize {
        self.inner.cx.borrow().instances.len()
    }

    pub fn instance_addresses(&self) -> Vec<Address> {
        self.inner.cx.borrow().instances.addresses().cloned().collect()
    }

    /// Local signals of the instance at `address`, in creation order.
    pub fn instance_signals(&self, address: &Address) -> Option<Vec<Signal>> {
        let cx = self.inner.cx.borrow();
        cx.instances.get(address).map(|instance| instance.signals.clone())
    }

    /// Last committed tree of the instance at `address`.
    pub fn rendered(&self, address: &Address) -> Option<TemplateNode> {
        let cx = self.inner.cx.borrow();
        cx.instances.get(address).and_then(|instance| instance.prev.clone())
    }

    pub fn handler_ids(&self) -> Vec<HandlerId> {
        self.inner.cx.borrow().handlers.ids().cloned().collect()
    }
}
