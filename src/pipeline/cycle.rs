//! The render cycle: first mounts, change routing and update commits.
//!
//! No `RefCell` borrow of the context or the sink is held while user code
//! runs (component renders, lifecycle hooks, define callbacks), so any of it
//! may write signals. Those writes land in the pending queue and are picked
//! up by the drain loop that is already running.

use std::rc::Rc;

use crate::engine::{self, Component, FillOutput, Instance};
use crate::error::{CompileError, RenderError, Result, SinkError};
use crate::renderer::{self, DomSink, Mutation};
use crate::state::tracking::{self, RenderFrame};
use crate::state::{Signal, SignalAccess};
use crate::template::{Props, TemplateNode};
use crate::types::{Address, ChangeEvent, EventKind};

use super::mount::RootInner;

/// A first render that has not been committed yet.
pub(super) struct Prepared {
    address: Address,
    name: String,
    component: Rc<dyn Component>,
    node: TemplateNode,
    frame: RenderFrame,
    output: FillOutput,
}

/// Render `component` with tracking on, returning the tree and what it read.
fn render_tracked(
    address: &Address,
    signals: Vec<Signal>,
    component: &dyn Component,
    props: &Props,
) -> (Result<TemplateNode, CompileError>, RenderFrame) {
    tracking::begin_render(address.clone(), signals);
    let result = component.render(props);
    let frame = tracking::end_render().unwrap_or_else(|| RenderFrame {
        address: address.clone(),
        signals: Vec::new(),
        next_signal: 0,
        access: SignalAccess::new(),
    });
    (result, frame)
}

impl<S: DomSink> RootInner<S> {
    // =========================================================================
    // Mount
    // =========================================================================

    /// First render of a component occurrence.
    ///
    /// Nothing is touched until the render, the fill and the component check
    /// have succeeded.
    pub(super) fn prepare(
        &self,
        address: Address,
        name: String,
        component: Rc<dyn Component>,
    ) -> Result<Prepared> {
        let props = self.props_for(&address);
        let (node, frame) = render_tracked(&address, Vec::new(), component.as_ref(), &props);
        let mut node = node?;
        let output = self.fill(&mut node, &address)?;
        self.check_components(&output)?;
        Ok(Prepared {
            address,
            name,
            component,
            node,
            frame,
            output,
        })
    }

    /// Commit a prepared first render and mount the components it references.
    ///
    /// With `replace` the instance's marker pair already holds old content
    /// that is swapped out; otherwise the placeholder element after the
    /// marker is.
    pub(super) fn install(&self, prepared: Prepared, replace: bool) -> Result<()> {
        let Prepared {
            address,
            name,
            component,
            node,
            frame,
            output,
        } = prepared;

        {
            let mut sink = self.sink.borrow_mut();
            if replace {
                sink.replace_markup(&address, &node.html)?;
            } else {
                sink.mount(&address, &node.html)?;
            }
        }

        {
            let mut cx = self.cx.borrow_mut();
            let mut instance = Instance::new(address.clone(), name.as_str(), component.clone());
            instance.signals = frame.signals;
            instance.access = frame.access;
            instance.prev = Some(node);
            for kind in [EventKind::SignalUpdate, EventKind::PropsChange] {
                let id = cx.bus.listen(kind, address.clone());
                instance.listeners.insert(kind, id);
            }
            cx.instances.insert(instance);

            let hook = component.clone();
            let hook_address = address.clone();
            cx.instances
                .on_destroy(&address, move || hook.unmounted(&hook_address));

            cx.handlers.replace_owned(&address, output.handlers);
            cx.props.update(&address, output.props_sites);
        }

        tracing::debug!(address = %address, component = %name, "mounted");
        component.mounted(&address);
        self.bump_revision();
        self.mount_sites(output.component_sites)
    }

    /// Mount every component site that has no instance yet.
    fn mount_sites(&self, sites: Vec<(Address, String)>) -> Result<()> {
        for (site, name) in sites {
            let (component, defined) = {
                let mut guard = self.cx.borrow_mut();
                let cx = &mut *guard;
                if cx.instances.contains(&site) {
                    continue;
                }
                let Some(component) = cx.components.get(&name) else {
                    return Err(RenderError::UnknownComponent {
                        tag: name,
                        address: site,
                    });
                };
                (component, cx.components.define(&name, &cx.config))
            };
            if let Some((tag, callbacks)) = defined {
                for callback in callbacks {
                    callback(&name, &tag);
                }
            }
            let prepared = self.prepare(site, name, component)?;
            self.install(prepared, false)?;
        }
        Ok(())
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Re-render the instance at `address` and commit the difference.
    ///
    /// An instance that no longer exists is skipped.
    pub(super) fn update(&self, address: &Address) -> Result<()> {
        let found = {
            let cx = self.cx.borrow();
            cx.instances
                .get(address)
                .map(|instance| (instance.component.clone(), instance.signals.clone()))
        };
        let Some((component, signals)) = found else {
            return Ok(());
        };

        let props = self.props_for(address);
        let (node, frame) = render_tracked(address, signals, component.as_ref(), &props);
        let mut next = node?;
        let output = self.fill(&mut next, address)?;
        self.check_components(&output)?;

        let mutations = {
            let cx = self.cx.borrow();
            match cx.instances.get(address).and_then(|instance| instance.prev.as_ref()) {
                Some(prev) => renderer::diff(prev, &next),
                None => return Err(RenderError::NotMounted),
            }
        };
        self.commit(&mutations)?;

        let changed = {
            let mut cx = self.cx.borrow_mut();
            if let Some(instance) = cx.instances.get_mut(address) {
                instance.prev = Some(next);
                instance.access = frame.access;
                instance.signals = frame.signals;
                instance.dirty = false;
            }
            cx.handlers.replace_owned(address, output.handlers);
            cx.props.update(address, output.props_sites)
        };
        self.pending
            .borrow_mut()
            .extend(changed.into_iter().map(|address| ChangeEvent::Props { address }));

        tracing::debug!(address = %address, mutations = mutations.len(), "updated");
        self.mount_sites(output.component_sites)?;
        if !mutations.is_empty() {
            self.bump_revision();
        }
        component.updated(address);
        Ok(())
    }

    /// Apply `mutations` in order, tearing down instances ahead of the
    /// markup that held them.
    fn commit(&self, mutations: &[Mutation]) -> Result<()> {
        {
            let sink = self.sink.borrow();
            if let Some(address) = sink.find_stale(mutations) {
                tracing::warn!(address = %address, "mutation targets a stale address");
                return Err(SinkError::StaleAddress {
                    address: address.clone(),
                }
                .into());
            }
        }

        for mutation in mutations {
            tracing::trace!(%mutation, "apply");
            if let Mutation::DestroyDescendants { address } = mutation {
                self.destroy_below(address);
            }
            self.sink.borrow_mut().apply(mutation)?;
        }
        Ok(())
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    fn destroy_below(&self, address: &Address) {
        let released = self.cx.borrow_mut().release_below(address);
        Self::run_destroy(released);
    }

    /// Destroy the instance at `address` and everything below it.
    pub(super) fn destroy(&self, address: &Address) {
        let released = {
            let mut cx = self.cx.borrow_mut();
            let released = cx.instances.release(address);
            cx.forget(&released);
            released
        };
        Self::run_destroy(released);
    }

    fn run_destroy(released: Vec<Instance>) {
        for instance in released {
            tracing::debug!(address = %instance.address, component = %instance.name, "destroyed");
            instance.destroy();
        }
    }

    // =========================================================================
    // Routing
    // =========================================================================

    /// Process queued changes until the queue is empty.
    ///
    /// Must run with the busy flag held. On the first error the queue is
    /// cleared and the error returned; what was already committed stays.
    pub(super) fn drain(&self) -> Result<()> {
        let limit = self.cx.borrow().config.flush_limit;
        let mut processed = 0usize;
        loop {
            let event = self.pending.borrow_mut().pop_front();
            let Some(event) = event else {
                return Ok(());
            };
            processed += 1;
            if processed > limit {
                self.pending.borrow_mut().clear();
                tracing::warn!(limit, "flush did not settle, dropping queued changes");
                return Err(RenderError::FlushLimit { limit });
            }

            for address in self.targets(&event) {
                if let Err(err) = self.update(&address) {
                    self.pending.borrow_mut().clear();
                    tracing::error!(address = %address, error = %err, "update failed");
                    return Err(err);
                }
            }
        }
    }

    /// Instances that must re-render for `event`, marked dirty.
    fn targets(&self, event: &ChangeEvent) -> Vec<Address> {
        let mut guard = self.cx.borrow_mut();
        let cx = &mut *guard;

        let mut targets: Vec<Address> = Vec::new();
        match event {
            ChangeEvent::Signal { id, path } => {
                for address in cx.bus.listeners(EventKind::SignalUpdate) {
                    let interested = cx
                        .instances
                        .get(address)
                        .is_some_and(|instance| instance.access.is_interested(*id, path));
                    if interested && !targets.contains(address) {
                        targets.push(address.clone());
                    }
                }
            }
            ChangeEvent::Props { address: site } => {
                if cx.bus.listeners(EventKind::PropsChange).any(|address| address == site) {
                    targets.push(site.clone());
                }
            }
        }

        for address in &targets {
            if let Some(instance) = cx.instances.get_mut(address) {
                instance.dirty = true;
            }
        }
        if !targets.is_empty() {
            tracing::trace!(?event, targets = targets.len(), "change routed");
        }
        targets
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn props_for(&self, address: &Address) -> Props {
        self.cx
            .borrow()
            .props
            .current(address)
            .cloned()
            .unwrap_or_default()
    }

    fn fill(&self, node: &mut TemplateNode, address: &Address) -> Result<FillOutput> {
        let cx = self.cx.borrow();
        Ok(engine::fill(node, address, &cx.config)?)
    }

    /// Fail before touching the sink if a site names an unregistered component.
    fn check_components(&self, output: &FillOutput) -> Result<()> {
        let cx = self.cx.borrow();
        for (site, name) in &output.component_sites {
            if !cx.components.is_registered(name) {
                return Err(RenderError::UnknownComponent {
                    tag: name.clone(),
                    address: site.clone(),
                });
            }
        }
        Ok(())
    }
}
