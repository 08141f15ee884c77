//! The host side of rendering.
//!
//! A sink owns the live output. Every operation is addressed by the
//! hierarchical key and located through `<!-- address -->` markers: a pair of
//! them brackets each structural node, a single one precedes each element
//! with dynamic attributes and each component placeholder.

use crate::error::SinkError;
use crate::types::Address;

use super::mutation::Mutation;

pub trait DomSink {
    /// Replace the element right after the marker for `address` with `html`
    /// followed by a closing marker.
    fn mount(&mut self, address: &Address, html: &str) -> Result<(), SinkError>;

    /// Set an attribute on the element right after the marker for `address`.
    fn set_attribute(
        &mut self,
        address: &Address,
        name: &str,
        value: &str,
    ) -> Result<(), SinkError>;

    /// Whether the element after the marker holds a live, user-editable value.
    fn accepts_input(&self, address: &Address) -> bool;

    /// Overwrite the live value of an input-accepting element.
    fn sync_input_value(&mut self, address: &Address, value: &str) -> Result<(), SinkError>;

    fn replace_text(&mut self, address: &Address, text: &str) -> Result<(), SinkError>;

    fn replace_markup(&mut self, address: &Address, html: &str) -> Result<(), SinkError>;

    /// Refill the bracketed ranges of `order`, taken in document order, with
    /// those subtrees in the order given.
    fn reorder(&mut self, address: &Address, order: &[Address]) -> Result<(), SinkError>;

    /// Release host resources tied to the subtree below `address`.
    fn destroy_descendants(&mut self, _address: &Address) -> Result<(), SinkError> {
        Ok(())
    }

    /// Whether a marker for `address` is present.
    fn contains(&self, address: &Address) -> bool;

    /// Whether a marker pair for `address` brackets rendered content.
    fn holds(&self, address: &Address) -> bool;

    /// Apply one mutation.
    fn apply(&mut self, mutation: &Mutation) -> Result<(), SinkError> {
        match mutation {
            Mutation::SetAttribute { address, name, value } => {
                self.set_attribute(address, name, value)?;
                if name == "value" && self.accepts_input(address) {
                    self.sync_input_value(address, value)?;
                }
                Ok(())
            }
            Mutation::ReplaceText { address, text } => self.replace_text(address, text),
            Mutation::ReplaceMarkup { address, html } => self.replace_markup(address, html),
            Mutation::DestroyDescendants { address } => self.destroy_descendants(address),
            Mutation::Reorder { address, order } => self.reorder(address, order),
        }
    }

    /// First address in `mutations` this sink cannot locate.
    fn find_stale<'a>(&self, mutations: &'a [Mutation]) -> Option<&'a Address> {
        mutations
            .iter()
            .flat_map(Mutation::targets)
            .find(|address| !self.contains(address))
    }
}
