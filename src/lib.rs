//! # spark-hlx
//!
//! Reactive markup rendering engine for Rust.
//!
//! Components return tagged-template markup; the engine gives every dynamic
//! position a stable hierarchical address, tracks which signal paths each
//! render read, and on change re-renders only the interested instances and
//! patches the output in place.
//!
//! ## Architecture
//!
//! ```text
//! hlx! → TemplateNode → fill (addresses, markup) → diff → Mutation → DomSink
//!                                    ↑                                  │
//!                         Signal reads/writes ←──── handlers ←──────────┘
//! ```
//!
//! ## Modules
//!
//! - [`template`] - tagged-template compiler and the value model
//! - [`state`] - path-tracked signals and render-time dependency recording
//! - [`engine`] - addressing, instance and component registries, routing
//! - [`renderer`] - reconciler, mutations, sinks
//! - [`pipeline`] - render roots and the update cycle
//! - [`config`] - runtime settings, TOML-loadable
//! - [`error`] - error taxonomy

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod renderer;
pub mod state;
pub mod template;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::RuntimeConfig;

pub use error::{AddressError, CompileError, ConfigError, RenderError, SinkError};

pub use engine::{fill, Component, RenderContext};

pub use pipeline::Root;

pub use renderer::{diff, DomSink, MarkupDocument, Mutation};

pub use state::{create_signal, on_change, remove_listener, use_signal, Accessor, Signal};

pub use template::{build, build_keyed, Handler, Props, TemplateNode, Value};
