//! Compiled template tree.
//!
//! A [`TemplateNode`] is the result of one template invocation. Its
//! [`RawTemplate`] is the static markup with typed placeholders; the ordered
//! `children`, `attributes` and `props` lists line up one-to-one with the
//! `Slot`, `Attr` and `Props` placeholders. Keys and `html` stay empty until
//! the tree is filled for a concrete instance.

use std::fmt;
use std::rc::Rc;

use super::value::{Handler, Props};
use crate::types::Address;

// =============================================================================
// Raw template
// =============================================================================

/// One piece of a raw template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Static markup, emitted verbatim
    Static(String),
    /// Identity marker for the element that follows
    NodeKey,
    /// Component tag reference, `<Name` when opening, `</Name>` when closing
    Component { name: String, closing: bool },
    /// Quoted attribute value placeholder
    Attr,
    /// Props spread placeholder (emits nothing)
    Props,
    /// Child slot placeholder
    Slot,
}

/// Static markup with embedded placeholder segments.
///
/// Two nodes have the same markup *shape* exactly when their raw templates
/// are equal; values inside the placeholders do not take part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTemplate {
    segments: Vec<Segment>,
}

impl RawTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Append static markup, merging with a preceding static segment.
    pub fn push_static(&mut self, markup: &str) {
        if markup.is_empty() {
            return;
        }
        if let Some(Segment::Static(last)) = self.segments.last_mut() {
            last.push_str(markup);
        } else {
            self.segments.push(Segment::Static(markup.to_string()));
        }
    }

    /// Insert a node identity marker.
    ///
    /// Idempotent: a marker directly after another marker is dropped, so a
    /// tag start that coincides with another injection point gets one
    /// identity only.
    pub fn push_node_key(&mut self) {
        if self.segments.last() != Some(&Segment::NodeKey) {
            self.segments.push(Segment::NodeKey);
        }
    }

    pub fn push(&mut self, segment: Segment) {
        match segment {
            Segment::Static(markup) => self.push_static(&markup),
            Segment::NodeKey => self.push_node_key(),
            other => self.segments.push(other),
        }
    }

    fn count(&self, wanted: &Segment) -> usize {
        self.segments.iter().filter(|s| *s == wanted).count()
    }

    pub fn slot_count(&self) -> usize {
        self.count(&Segment::Slot)
    }

    pub fn attr_count(&self) -> usize {
        self.count(&Segment::Attr)
    }

    pub fn props_count(&self) -> usize {
        self.count(&Segment::Props)
    }
}

impl fmt::Display for RawTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Static(markup) => f.write_str(markup)?,
                Segment::NodeKey => f.write_str("<!-- HLX_NODE_KEY -->")?,
                Segment::Component { name, closing: false } => write!(f, "<{name}")?,
                Segment::Component { name, closing: true } => write!(f, "</{name}>")?,
                Segment::Attr => f.write_str("\"HLX_ATTR\"")?,
                Segment::Props => f.write_str("...HLX_PROPS")?,
                Segment::Slot => f.write_str("HLX_SLOT")?,
            }
        }
        Ok(())
    }
}

// =============================================================================
// Nodes
// =============================================================================

/// A leaf rendered as text.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveNode {
    pub key: Option<Address>,
    /// Unescaped text
    pub text: String,
    /// Escaped markup for `text`
    pub html: String,
}

impl PrimitiveNode {
    pub fn new(text: String) -> Self {
        let html = super::markup::escape_text(&text);
        Self {
            key: None,
            text,
            html,
        }
    }
}

/// A dynamic attribute value or event binding.
#[derive(Clone)]
pub struct AttributeNode {
    /// Address of the element carrying the attribute
    pub key: Option<Address>,
    pub name: String,
    /// Resolved attribute text (dispatch stub for handlers)
    pub html: String,
    pub handler: Option<Handler>,
}

impl AttributeNode {
    pub fn is_handler(&self) -> bool {
        self.handler.is_some()
    }
}

impl PartialEq for AttributeNode {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.name == other.name
            && self.html == other.html
            && match (&self.handler, &other.handler) {
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl fmt::Debug for AttributeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeNode")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("html", &self.html)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// Props forwarded wholesale to the component element that carries them.
#[derive(Debug, Clone, PartialEq)]
pub struct PropsSpreadNode {
    pub key: Option<Address>,
    pub values: Props,
}

/// A child position: nested template or text leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Node(TemplateNode),
    Primitive(PrimitiveNode),
}

impl Child {
    pub fn key(&self) -> Option<&Address> {
        match self {
            Self::Node(node) => node.key.as_ref(),
            Self::Primitive(primitive) => primitive.key.as_ref(),
        }
    }

    pub fn html(&self) -> &str {
        match self {
            Self::Node(node) => &node.html,
            Self::Primitive(primitive) => &primitive.html,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }
}

/// The compiled representation of one template invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateNode {
    /// Hierarchical address, set when filled
    pub key: Option<Address>,
    /// Explicit identity given at build time (`hlx_keyed!`)
    pub explicit_key: Option<String>,
    pub raw: RawTemplate,
    pub children: Vec<Child>,
    pub attributes: Vec<AttributeNode>,
    pub props: Vec<PropsSpreadNode>,
    /// Component names referenced by this template, first occurrence order
    pub components: Vec<String>,
    /// Resolved markup, set when filled
    pub html: String,
}

impl TemplateNode {
    /// Whether the placeholder counts line up with the entry lists.
    pub fn is_consistent(&self) -> bool {
        self.raw.slot_count() == self.children.len()
            && self.raw.attr_count() == self.attributes.len()
            && self.raw.props_count() == self.props.len()
    }
}
