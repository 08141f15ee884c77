//! Mutations - the operations a reconcile pass asks the sink to perform.

use std::fmt;

use crate::types::Address;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Set attribute `name` on the element following the marker for `address`.
    SetAttribute {
        address: Address,
        name: String,
        value: String,
    },
    /// Replace everything between the markers for `address` with text.
    ReplaceText { address: Address, text: String },
    /// Replace everything between the markers for `address` with markup.
    ReplaceMarkup { address: Address, html: String },
    /// Tear down every instance strictly below `address`.
    DestroyDescendants { address: Address },
    /// Refill the ranges of the `order` subtrees, taken in document order,
    /// with those subtrees in the given order.
    Reorder { address: Address, order: Vec<Address> },
}

impl Mutation {
    /// Address the mutation is aimed at.
    pub fn address(&self) -> &Address {
        match self {
            Self::SetAttribute { address, .. }
            | Self::ReplaceText { address, .. }
            | Self::ReplaceMarkup { address, .. }
            | Self::DestroyDescendants { address }
            | Self::Reorder { address, .. } => address,
        }
    }

    /// Every address the sink must be able to locate to apply this.
    pub fn targets(&self) -> Vec<&Address> {
        match self {
            Self::Reorder { order, .. } => order.iter().collect(),
            other => vec![other.address()],
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetAttribute { address, name, value } => {
                write!(f, "set {address} [{name}={value:?}]")
            }
            Self::ReplaceText { address, text } => write!(f, "text {address} {text:?}"),
            Self::ReplaceMarkup { address, html } => {
                write!(f, "markup {address} ({} bytes)", html.len())
            }
            Self::DestroyDescendants { address } => write!(f, "destroy below {address}"),
            Self::Reorder { address, order } => {
                write!(f, "reorder {address} [")?;
                for (i, child) in order.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str("]")
            }
        }
    }
}
