//! Error taxonomy.
//!
//! Compile and addressing errors abort the render they occur in and leave the
//! previously committed state untouched. Sink errors abort the batch being
//! applied. [`RenderError`] is what the public entry points return.

use thiserror::Error;

use crate::types::Address;

/// Structural problems found while compiling a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("malformed template `{template}`: {reason}")]
    Malformed { template: String, reason: String },

    #[error("template `{template}`: value #{index} is {found}, expected {expected}")]
    UnexpectedValue {
        template: String,
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("template `{template}`: static markup inside component <{name}>")]
    ComponentChildren { template: String, name: String },
}

/// Problems building addresses for a filled tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("invalid key `{key}`: keys must be non-empty and use only letters, digits and '_'")]
    InvalidKey { key: String },

    #[error("duplicate key `{key}` among siblings at `{parent}`")]
    DuplicateKey { key: String, parent: Address },
}

/// Failures reported by a [`DomSink`](crate::renderer::DomSink).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("stale address `{address}`: no marker found in the document")]
    StaleAddress { address: Address },

    #[error("no element follows the marker for `{address}`")]
    NotAnElement { address: Address },
}

/// Problems loading a [`RuntimeConfig`](crate::config::RuntimeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid root address: {0}")]
    RootAddress(#[from] AddressError),
}

/// Errors surfaced by the render cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("no component registered for <{tag}> at `{address}`")]
    UnknownComponent { tag: String, address: Address },

    #[error("no handler registered under `{id}`")]
    UnknownHandler { id: String },

    #[error("render requested while the root is already flushing")]
    Reentrant,

    #[error("flush did not settle after {limit} change events")]
    FlushLimit { limit: usize },

    #[error("root has not been rendered yet")]
    NotMounted,
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
