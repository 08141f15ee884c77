//! Dynamic values interleaved with template fragments.
//!
//! Every `${...}` position in a template receives a [`Value`]. The builder
//! classifies it against the syntactic context of its placeholder: primitives
//! become text, handlers become event bindings, templates and template lists
//! become nested nodes, and props objects are forwarded to child components.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::node::TemplateNode;
use crate::state::Signal;
use crate::types::Event;

/// Event handler bound through an attribute (`onclick=${...}`).
pub type Handler = Rc<dyn Fn(&Event)>;

/// A dynamic value passed to the template builder.
#[derive(Clone)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    Handler(Handler),
    Node(TemplateNode),
    List(Vec<TemplateNode>),
    Props(Props),
    /// Only meaningful as a prop value
    Signal(Signal),
    /// Structured JSON data; only meaningful as a prop value
    Data(serde_json::Value),
}

impl Value {
    /// Wrap a closure as an event handler value.
    pub fn handler(f: impl Fn(&Event) + 'static) -> Self {
        Self::Handler(Rc::new(f))
    }

    /// Short description used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Number(_) => "a number",
            Self::Bool(_) => "a boolean",
            Self::Handler(_) => "a handler",
            Self::Node(_) => "a template",
            Self::List(_) => "a template list",
            Self::Props(_) => "a props object",
            Self::Signal(_) => "a signal",
            Self::Data(_) => "structured data",
        }
    }

    /// Text rendering of a primitive value; `None` for everything else.
    ///
    /// Nullish values render as empty text.
    pub fn primitive_text(&self) -> Option<String> {
        match self {
            Self::Null => Some(String::new()),
            Self::Text(text) => Some(text.clone()),
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn as_signal(&self) -> Option<&Signal> {
        match self {
            Self::Signal(signal) => Some(signal),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&TemplateNode> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Handler(a), Self::Handler(b)) => Rc::ptr_eq(a, b),
            (Self::Node(a), Self::Node(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Props(a), Self::Props(b)) => a == b,
            (Self::Signal(a), Self::Signal(b)) => a == b,
            (Self::Data(a), Self::Data(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Handler(_) => f.write_str("Handler(..)"),
            Self::Node(node) => f.debug_tuple("Node").field(node).finish(),
            Self::List(nodes) => f.debug_tuple("List").field(nodes).finish(),
            Self::Props(props) => f.debug_tuple("Props").field(props).finish(),
            Self::Signal(signal) => f.debug_tuple("Signal").field(&signal.id()).finish(),
            Self::Data(data) => f.debug_tuple("Data").field(data).finish(),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! impl_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Self::Number(value as f64)
                }
            }
        )*
    };
}

impl_from_number!(i32, i64, u32, u64, usize, f32, f64);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<TemplateNode> for Value {
    fn from(value: TemplateNode) -> Self {
        Self::Node(value)
    }
}

impl From<Vec<TemplateNode>> for Value {
    fn from(value: Vec<TemplateNode>) -> Self {
        Self::List(value)
    }
}

impl From<Props> for Value {
    fn from(value: Props) -> Self {
        Self::Props(value)
    }
}

impl From<Signal> for Value {
    fn from(value: Signal) -> Self {
        Self::Signal(value)
    }
}

impl From<&Signal> for Value {
    fn from(value: &Signal) -> Self {
        Self::Signal(value.clone())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Text(n.to_string()),
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Data(other),
        }
    }
}

// =============================================================================
// Props
// =============================================================================

/// Ordered record of values forwarded to a child component.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props(IndexMap<String, Value>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Text of a primitive prop, empty when missing or not primitive.
    pub fn text(&self, name: &str) -> String {
        self.get(name)
            .and_then(Value::primitive_text)
            .unwrap_or_default()
    }

    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.get(name).and_then(Value::as_signal)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether these props differ from `previous` in any field.
    ///
    /// A field that is new, removed, or unequal counts as a change.
    pub fn changed_from(&self, previous: &Props) -> bool {
        self.len() != previous.len()
            || self
                .iter()
                .any(|(name, value)| previous.get(name) != Some(value))
    }
}

/// Build a [`Props`] record: `props! { count: 1, label: "x" }`.
#[macro_export]
macro_rules! props {
    ($($name:ident : $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut props = $crate::template::Props::new();
        $( props.insert(stringify!($name), $value); )*
        props
    }};
}
