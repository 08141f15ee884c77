//! Core types for spark-hlx.
//!
//! These types flow through every stage of the engine: the compiler tags
//! placeholders, the filler turns them into addresses, the reconciler emits
//! mutations against addresses, and the sink locates them through markers.

use std::borrow::Borrow;
use std::fmt;

// =============================================================================
// Separators
// =============================================================================

/// Joins an instance address to the local path of a node inside it.
pub const ADDRESS_SEPARATOR: char = '-';

/// Joins the segments of a local path (`slot.0.slot.key-a`).
pub const PATH_SEPARATOR: char = '.';

// =============================================================================
// Address
// =============================================================================

/// Hierarchical address of a node or component instance.
///
/// Addresses are stable across renders for the same logical position and
/// double as anchors in the rendered markup: every structural node is
/// bracketed by a pair of `<!-- address -->` comments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address of a node at `path` inside the instance at `self`.
    pub fn join(&self, path: &str) -> Self {
        Self(format!("{}{}{}", self.0, ADDRESS_SEPARATOR, path))
    }

    /// True when `self` lies strictly below `ancestor`.
    ///
    /// The character right after the ancestor prefix must be a separator, so
    /// `x-slot.1` is not considered an ancestor of `x-slot.10`.
    pub fn is_descendant_of(&self, ancestor: &Address) -> bool {
        match self.0.strip_prefix(ancestor.as_str()) {
            Some(rest) => rest.starts_with(&[ADDRESS_SEPARATOR, PATH_SEPARATOR][..]),
            None => false,
        }
    }

    /// The comment marker that anchors this address in rendered markup.
    pub fn marker(&self) -> String {
        format!("<!-- {} -->", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Address {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// =============================================================================
// Ids
// =============================================================================

/// Process-unique id of a reactive signal.
pub type SignalId = u64;

/// Address-qualified id of an event handler attribute.
///
/// Formed from the element's address and the attribute name so two handlers
/// on the same element never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(String);

impl HandlerId {
    pub fn new(element: &Address, attribute: &str) -> Self {
        Self(format!("{element}:{attribute}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address of the element the handler is bound to.
    pub fn element(&self) -> Address {
        match self.0.rsplit_once(':') {
            Some((element, _)) => Address::new(element),
            None => Address::new(self.0.as_str()),
        }
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for HandlerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Events
// =============================================================================

/// A host event forwarded through the event bridge.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Event {
    /// Native event name (e.g. "click", "input")
    pub name: String,
    /// Current value of the event target, for input-like elements
    pub value: Option<String>,
}

impl Event {
    /// Create an event with no target value
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Create an `input` event carrying the target's new value
    pub fn input(value: impl Into<String>) -> Self {
        Self {
            name: "input".to_string(),
            value: Some(value.into()),
        }
    }
}

/// Kinds of internal notifications an instance listens for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    SignalUpdate,
    PropsChange,
}

/// A change routed from the reactive store or a parent render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A tracked value changed at `path` (dotted, root is "").
    Signal { id: SignalId, path: String },
    /// The props record for the component at `address` changed.
    Props { address: Address },
}

// =============================================================================
// Tag flags (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Properties of an opening tag discovered by the lexer/builder.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TagFlags: u8 {
        const NONE = 0;
        /// Name starts with an uppercase letter
        const COMPONENT = 1 << 0;
        /// Written as `<tag ... />`
        const SELF_CLOSING = 1 << 1;
        /// HTML void element (`br`, `input`, ...)
        const VOID = 1 << 2;
        /// Has a dynamic attribute or spread, so it needs an identity marker
        const DYNAMIC = 1 << 3;
    }
}

impl TagFlags {
    /// Whether the element needs a node identity marker before it.
    pub fn needs_identity(self) -> bool {
        self.intersects(Self::COMPONENT | Self::DYNAMIC)
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// HTML elements that never take a closing tag.
pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

// =============================================================================
// Tests
// =============================================================================
