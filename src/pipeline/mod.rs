//! Render Pipeline
//!
//! Connects the reactive store to the output sink.
//!
//! ```text
//! signal write → ChangeEvent → pending queue → interested instances
//!              → render → fill → diff → sink → revision
//! ```
//!
//! ## Key Design Principles
//!
//! - **One root, one context**: every root owns its registries; nothing is
//!   shared between roots except the thread's signal listeners
//! - **Queue, then drain**: writes made while a flush runs are queued and
//!   processed by that same flush, in order
//! - **Commit or nothing**: a failed render leaves the instance's previous
//!   tree and dependencies in place

mod cycle;
mod mount;

pub use mount::Root;

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use spark_signals::effect;

    use crate::config::RuntimeConfig;
    use crate::error::{CompileError, RenderError};
    use crate::state::{create_signal, use_signal};
    use crate::template::{Props, TemplateNode, Value};
    use crate::types::{Address, Event};
    use crate::hlx;

    fn root() -> Root {
        Root::headless(RuntimeConfig::default())
    }

    #[test]
    fn test_mount_renders_into_document() {
        let root = root();
        root.mount(|_: &Props| hlx!(["<div>", "</div>"]; 0)).unwrap();
        assert!(root.is_mounted());
        assert_eq!(root.sink().clean_markup(), "<div>0</div>");
        assert_eq!(root.instance_count(), 1);
    }

    #[test]
    fn test_signal_write_rerenders() {
        let root = root();
        let count = create_signal(0);
        let read = count.clone();
        root.mount(move |_: &Props| hlx!(["<div>", "</div>"]; read.get().to_string()))
            .unwrap();

        count.set(5);
        assert_eq!(root.sink().clean_markup(), "<div>5</div>");
        assert!(root.take_errors().is_empty());
    }

    #[test]
    fn test_dispatch_runs_handler_and_flushes() {
        let root = root();
        root.mount(|_: &Props| {
            let count = use_signal(0);
            let inc = count.clone();
            hlx!(["<p>", "</p><button onclick=", ">+</button>"];
                count.get().to_string(),
                Value::handler(move |_| inc.update(|n| (n.as_i64().unwrap_or(0) + 1).into())))
        })
        .unwrap();

        root.dispatch("hlx-0:onclick", &Event::new("click")).unwrap();
        root.dispatch("hlx-0:onclick", &Event::new("click")).unwrap();
        assert_eq!(
            root.sink().clean_markup(),
            "<p>2</p><button onclick=\"hlx.dispatch('hlx-0:onclick', event)\">+</button>"
        );
    }

    #[test]
    fn test_unknown_handler() {
        let root = root();
        root.mount(|_: &Props| hlx!(["<p></p>"])).unwrap();
        assert_eq!(
            root.dispatch("hlx-9:onclick", &Event::new("click")),
            Err(RenderError::UnknownHandler {
                id: "hlx-9:onclick".into()
            })
        );
    }

    #[test]
    fn test_unknown_component_leaves_document_alone() {
        let root = root();
        let before = root.sink().markup().to_string();
        let result = root.mount(|_: &Props| hlx!(["<div><Missing /></div>"]));
        assert!(matches!(
            result,
            Err(RenderError::UnknownComponent { ref tag, .. }) if tag == "Missing"
        ));
        assert_eq!(root.sink().markup(), before);
        assert!(!root.is_mounted());
    }

    #[test]
    fn test_failed_render_keeps_previous_state() {
        let root = root();
        let broken = create_signal(false);
        let read = broken.clone();
        root.mount(move |_: &Props| -> Result<TemplateNode, CompileError> {
            if read.get_as::<bool>().unwrap_or(false) {
                hlx!(["<div"])
            } else {
                hlx!(["<div>ok</div>"])
            }
        })
        .unwrap();

        broken.set(true);
        let errors = root.take_errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], RenderError::Compile(_)));
        assert_eq!(root.sink().clean_markup(), "<div>ok</div>");

        // dependencies from the last good render still route
        broken.set(false);
        assert!(root.take_errors().is_empty());
        assert_eq!(root.sink().clean_markup(), "<div>ok</div>");
    }

    #[test]
    fn test_failed_remount_keeps_mounted_tree() {
        let root = root();
        root.mount(|_: &Props| hlx!(["<p>a</p><i>b</i>"])).unwrap();
        let before = root.sink().markup().to_string();

        let result = root.mount(|_: &Props| hlx!(["<div"]));
        assert!(matches!(result, Err(RenderError::Compile(_))));
        assert!(root.is_mounted());
        assert_eq!(root.instance_count(), 1);
        assert_eq!(root.sink().markup(), before);

        root.mount(|_: &Props| hlx!(["<b>c</b>"])).unwrap();
        assert_eq!(root.sink().clean_markup(), "<b>c</b>");
        assert_eq!(root.instance_count(), 1);
    }

    #[test]
    fn test_remount_after_unmount_replaces_markup() {
        let root = root();
        root.mount(|_: &Props| hlx!(["<p>a</p><i>b</i>"])).unwrap();
        root.unmount();
        assert_eq!(root.sink().clean_markup(), "<p>a</p><i>b</i>");

        root.mount(|_: &Props| hlx!(["<b>c</b>"])).unwrap();
        assert_eq!(root.sink().clean_markup(), "<b>c</b>");
    }

    #[test]
    fn test_invalid_root_address_is_rejected_on_mount() {
        let config = RuntimeConfig {
            root_address: "app-1".into(),
            ..RuntimeConfig::default()
        };
        let root = Root::headless(config);
        let result = root.mount(|_: &Props| hlx!(["<p></p>"]));
        assert!(matches!(
            result,
            Err(RenderError::Address(crate::error::AddressError::InvalidKey { .. }))
        ));
        assert!(!root.is_mounted());
    }

    #[test]
    fn test_write_inside_with_sink_flushes_after_release() {
        let root = root();
        let count = create_signal(0);
        let read = count.clone();
        root.mount(move |_: &Props| hlx!(["<p>", "</p>"]; read.get().to_string()))
            .unwrap();

        let seen = root.with_sink(|doc| {
            count.set(4);
            doc.clean_markup()
        });
        assert_eq!(seen, "<p>0</p>");
        assert_eq!(root.sink().clean_markup(), "<p>4</p>");
        assert!(root.take_errors().is_empty());
    }

    #[test]
    fn test_revision_drives_effects() {
        let root = root();
        let count = create_signal(0);
        let read = count.clone();
        root.mount(move |_: &Props| hlx!(["<b>", "</b>"]; read.get().to_string()))
            .unwrap();

        let revision = root.revision();
        let runs = Rc::new(Cell::new(0));
        let seen = runs.clone();
        let _e = effect(move || {
            let _ = revision.get();
            seen.set(seen.get() + 1);
        });
        assert_eq!(runs.get(), 1);

        count.set(1);
        assert_eq!(runs.get(), 2);

        // same value: no change event, no commit
        count.set(1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_flush_limit() {
        let config = RuntimeConfig {
            flush_limit: 8,
            ..RuntimeConfig::default()
        };
        let root = Root::headless(config);
        let ticker = create_signal(0);
        let read = ticker.clone();
        // writing what it reads keeps the queue from settling
        let result = root.mount(move |_: &Props| {
            let n = read.get().as_i64().unwrap_or(0);
            read.set(n + 1);
            hlx!(["<i>", "</i>"]; n)
        });
        assert_eq!(result, Err(RenderError::FlushLimit { limit: 8 }));
        assert!(ticker.get().as_i64().unwrap_or(0) > 8);
    }

    #[test]
    fn test_reentrant_mount_is_rejected() {
        let root = Rc::new(root());
        let inner = Rc::downgrade(&root);
        let outcome = Rc::new(Cell::new(None));
        let record = outcome.clone();
        root.mount(move |_: &Props| {
            if let Some(root) = inner.upgrade() {
                record.set(Some(root.mount(|_: &Props| hlx!(["<p></p>"])).is_err()));
            }
            hlx!(["<p>outer</p>"])
        })
        .unwrap();
        assert_eq!(outcome.get(), Some(true));
    }

    #[test]
    fn test_unmount_runs_hooks() {
        struct Leaf(Rc<Cell<u32>>);
        impl crate::engine::Component for Leaf {
            fn render(&self, _: &Props) -> Result<TemplateNode, CompileError> {
                hlx!(["<span>leaf</span>"])
            }
            fn unmounted(&self, _: &Address) {
                self.0.set(self.0.get() + 1);
            }
        }

        let root = root();
        let unmounted = Rc::new(Cell::new(0));
        root.register("Leaf", Leaf(unmounted.clone()));
        root.mount(|_: &Props| hlx!(["<div><Leaf /></div>"])).unwrap();
        assert_eq!(root.instance_count(), 2);

        root.unmount();
        assert_eq!(root.instance_count(), 0);
        assert_eq!(unmounted.get(), 1);
    }

    #[test]
    fn test_dropped_root_stops_listening() {
        let count = create_signal(0);
        {
            let root = root();
            let read = count.clone();
            root.mount(move |_: &Props| hlx!(["<p>", "</p>"]; read.get().to_string()))
                .unwrap();
        }
        // no live root: the write must not reach anything
        count.set(3);
        assert_eq!(count.get(), serde_json::json!(3));
    }
}
