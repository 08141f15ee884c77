//! Renderer - reconciliation and output sinks.
//!
//! - [`diff`] - compares two filled trees and returns [`Mutation`]s
//! - [`DomSink`] - the host-side operations a mutation list is applied to
//! - [`MarkupDocument`] - in-memory sink over a markup string

mod diff;
mod document;
mod mutation;
mod sink;

pub use diff::diff;
pub use document::MarkupDocument;
pub use mutation::Mutation;
pub use sink::DomSink;
