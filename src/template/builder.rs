//! Tree builder - phase two of compilation.
//!
//! Walks the token stream, checks tag nesting, classifies every dynamic value
//! against its hole, and writes the raw template with placeholder segments.
//! Component tags (uppercase initial) become `Component` segments, so the
//! internal tag name is chosen when the tree is filled. Values placed between
//! a component's open and close tags are forwarded to it as the `children`
//! prop instead of becoming slots.

use super::lexer::{Hole, Token};
use super::node::{
    AttributeNode, Child, PrimitiveNode, PropsSpreadNode, RawTemplate, Segment, TemplateNode,
};
use super::value::{Props, Value};
use crate::error::CompileError;
use crate::types::{is_void_element, TagFlags};

/// Name of the prop that carries a component's body values.
pub const CHILDREN_PROP: &str = "children";

struct OpenElement {
    name: String,
    component: bool,
    /// Index into `Builder::props` of this component's spread
    spread: Option<usize>,
    /// Body values of a component, with their placeholder index
    children: Vec<(usize, Value)>,
}

enum TagPart {
    Source(String),
    Hole { index: usize, hole: Hole },
}

struct Builder<'a> {
    template: &'a str,
    values: Vec<Option<Value>>,
    raw: RawTemplate,
    children: Vec<Child>,
    attributes: Vec<AttributeNode>,
    props: Vec<PropsSpreadNode>,
    components: Vec<String>,
    stack: Vec<OpenElement>,
}

/// Build a [`TemplateNode`] from a token stream and its values.
pub(crate) fn build_tree(
    template: &str,
    tokens: Vec<Token>,
    values: Vec<Value>,
) -> Result<TemplateNode, CompileError> {
    let mut builder = Builder {
        template,
        values: values.into_iter().map(Some).collect(),
        raw: RawTemplate::new(),
        children: Vec::new(),
        attributes: Vec::new(),
        props: Vec::new(),
        components: Vec::new(),
        stack: Vec::new(),
    };

    let mut tokens = tokens.into_iter();
    while let Some(token) = tokens.next() {
        match token {
            Token::Text(text) => builder.text(&text)?,
            Token::Comment(body) => {
                if !builder.inside_component() {
                    builder.raw.push_static(&format!("<!--{body}-->"));
                }
            }
            Token::OpenTag { name } => {
                let mut parts = Vec::new();
                let mut self_closing = false;
                for token in tokens.by_ref() {
                    match token {
                        Token::TagSource(source) => parts.push(TagPart::Source(source)),
                        Token::Hole { index, hole } => parts.push(TagPart::Hole { index, hole }),
                        Token::TagEnd { self_closing: closing } => {
                            self_closing = closing;
                            break;
                        }
                        other => {
                            return Err(builder.malformed(format!(
                                "unexpected {other:?} inside <{name}>"
                            )));
                        }
                    }
                }
                builder.element(name, parts, self_closing)?;
            }
            Token::CloseTag { name } => builder.close(&name)?,
            Token::Hole { index, hole: Hole::Slot } => builder.slot(index)?,
            Token::Hole { .. } | Token::TagSource(_) | Token::TagEnd { .. } => {
                return Err(builder.malformed("tag content outside of a tag"));
            }
        }
    }

    builder.finish()
}

impl Builder<'_> {
    fn malformed(&self, reason: impl Into<String>) -> CompileError {
        CompileError::Malformed {
            template: self.template.to_string(),
            reason: reason.into(),
        }
    }

    fn unexpected(&self, index: usize, expected: &'static str, found: &Value) -> CompileError {
        CompileError::UnexpectedValue {
            template: self.template.to_string(),
            index,
            expected,
            found: found.kind(),
        }
    }

    fn take_value(&mut self, index: usize) -> Result<Value, CompileError> {
        self.values
            .get_mut(index)
            .and_then(Option::take)
            .ok_or_else(|| self.malformed(format!("no value for placeholder #{index}")))
    }

    fn inside_component(&self) -> bool {
        self.stack.last().is_some_and(|open| open.component)
    }

    fn reject_component_children(&self) -> Result<(), CompileError> {
        match self.stack.last() {
            Some(open) if open.component => Err(CompileError::ComponentChildren {
                template: self.template.to_string(),
                name: open.name.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn text(&mut self, text: &str) -> Result<(), CompileError> {
        if self.inside_component() {
            if text.trim().is_empty() {
                return Ok(());
            }
            self.reject_component_children()?;
        }
        self.raw.push_static(text);
        Ok(())
    }

    fn slot(&mut self, index: usize) -> Result<(), CompileError> {
        let value = self.take_value(index)?;
        if let Some(open) = self.stack.last_mut().filter(|open| open.component) {
            open.children.push((index, value));
            return Ok(());
        }
        match value {
            Value::Node(node) => {
                self.children.push(Child::Node(node));
                self.raw.push(Segment::Slot);
            }
            Value::List(nodes) => {
                for node in nodes {
                    self.children.push(Child::Node(node));
                    self.raw.push(Segment::Slot);
                }
            }
            other => match other.primitive_text() {
                Some(text) => {
                    self.children.push(Child::Primitive(PrimitiveNode::new(text)));
                    self.raw.push(Segment::Slot);
                }
                None => {
                    let expected = "text, a template or a template list";
                    return Err(self.unexpected(index, expected, &other));
                }
            },
        }
        Ok(())
    }

    fn element(
        &mut self,
        name: String,
        parts: Vec<TagPart>,
        self_closing: bool,
    ) -> Result<(), CompileError> {
        self.reject_component_children()?;

        let mut flags = TagFlags::NONE;
        if name.starts_with(|c: char| c.is_ascii_uppercase()) {
            flags |= TagFlags::COMPONENT;
        }
        if is_void_element(&name) {
            flags |= TagFlags::VOID;
        }
        if self_closing {
            flags |= TagFlags::SELF_CLOSING;
        }
        if parts.iter().any(|part| matches!(part, TagPart::Hole { .. })) {
            flags |= TagFlags::DYNAMIC;
        }
        let component = flags.contains(TagFlags::COMPONENT);

        if flags.needs_identity() {
            self.raw.push_node_key();
        }
        if component {
            if !self.components.contains(&name) {
                self.components.push(name.clone());
            }
            self.raw.push(Segment::Component {
                name: name.clone(),
                closing: false,
            });
        } else {
            self.raw.push_static(&format!("<{name}"));
        }

        let spreads_before = self.props.len();

        // whitespace before a spread or the tag end has nothing to separate
        let trim: Vec<bool> = (0..parts.len())
            .map(|i| {
                matches!(
                    parts.get(i + 1),
                    None | Some(TagPart::Hole { hole: Hole::Spread, .. })
                )
            })
            .collect();
        for (part, trim) in parts.into_iter().zip(trim) {
            match part {
                TagPart::Source(source) if trim => self.raw.push_static(source.trim_end()),
                TagPart::Source(source) => self.raw.push_static(&source),
                TagPart::Hole { index, hole: Hole::Attr { name: attr } } => {
                    if component {
                        return Err(self.malformed(format!(
                            "dynamic attribute `{attr}` on <{name}>; \
                             pass values to components with a props spread"
                        )));
                    }
                    self.attribute(index, attr)?;
                }
                TagPart::Hole { index, hole: Hole::Spread } => {
                    if !component {
                        return Err(self.malformed(format!(
                            "props spread on <{name}>; only component tags take props"
                        )));
                    }
                    self.spread(index)?;
                }
                TagPart::Hole { .. } => return Err(self.malformed("slot inside a tag")),
            }
        }

        if flags.contains(TagFlags::SELF_CLOSING) {
            if component {
                self.raw.push_static(">");
                self.raw.push(Segment::Component { name, closing: true });
            } else if flags.contains(TagFlags::VOID) {
                self.raw.push_static("/>");
            } else {
                self.raw.push_static(&format!("></{name}>"));
            }
        } else {
            self.raw.push_static(">");
            if !flags.contains(TagFlags::VOID) {
                let spread = (self.props.len() > spreads_before).then(|| self.props.len() - 1);
                self.stack.push(OpenElement {
                    name,
                    component,
                    spread,
                    children: Vec::new(),
                });
            }
        }
        Ok(())
    }

    fn attribute(&mut self, index: usize, name: String) -> Result<(), CompileError> {
        let value = self.take_value(index)?;
        let node = match value {
            Value::Handler(handler) => AttributeNode {
                key: None,
                name,
                html: String::new(),
                handler: Some(handler),
            },
            other => match other.primitive_text() {
                Some(text) => AttributeNode {
                    key: None,
                    name,
                    html: text,
                    handler: None,
                },
                None => return Err(self.unexpected(index, "text or a handler", &other)),
            },
        };
        self.attributes.push(node);
        self.raw.push(Segment::Attr);
        Ok(())
    }

    fn spread(&mut self, index: usize) -> Result<(), CompileError> {
        match self.take_value(index)? {
            Value::Props(values) => {
                self.props.push(PropsSpreadNode { key: None, values });
                self.raw.push(Segment::Props);
                Ok(())
            }
            other => Err(self.unexpected(index, "a props object", &other)),
        }
    }

    fn close(&mut self, name: &str) -> Result<(), CompileError> {
        let Some(open) = self.stack.pop() else {
            return Err(self.malformed(format!("unexpected closing tag </{name}>")));
        };
        let matches = if open.component {
            open.name == name
        } else {
            open.name.eq_ignore_ascii_case(name)
        };
        if !matches {
            return Err(self.malformed(format!(
                "expected </{}> but found </{name}>",
                open.name
            )));
        }
        if open.component {
            if !open.children.is_empty() {
                let children = self.children_value(open.children)?;
                match open.spread.and_then(|i| self.props.get_mut(i)) {
                    Some(spread) => spread.values.insert(CHILDREN_PROP, children),
                    None => {
                        let values = Props::new().with(CHILDREN_PROP, children);
                        self.props.push(PropsSpreadNode { key: None, values });
                        self.raw.push(Segment::Props);
                    }
                }
            }
            self.raw.push(Segment::Component {
                name: open.name,
                closing: true,
            });
        } else {
            self.raw.push_static(&format!("</{name}>"));
        }
        Ok(())
    }

    /// A single body value is passed as is; several are joined into one
    /// template list, so each of them must be a template or a list.
    fn children_value(&self, mut values: Vec<(usize, Value)>) -> Result<Value, CompileError> {
        if values.len() == 1 {
            if let Some((_, value)) = values.pop() {
                return Ok(value);
            }
        }
        let mut nodes = Vec::new();
        for (index, value) in values {
            match value {
                Value::Node(node) => nodes.push(node),
                Value::List(list) => nodes.extend(list),
                other => {
                    return Err(self.unexpected(index, "a template or a template list", &other));
                }
            }
        }
        Ok(Value::List(nodes))
    }

    fn finish(self) -> Result<TemplateNode, CompileError> {
        if let Some(open) = self.stack.last() {
            return Err(self.malformed(format!("unclosed <{}>", open.name)));
        }
        if self.values.iter().any(Option::is_some) {
            return Err(self.malformed("more values than placeholders"));
        }
        let node = TemplateNode {
            key: None,
            explicit_key: None,
            raw: self.raw,
            children: self.children,
            attributes: self.attributes,
            props: self.props,
            components: self.components,
            html: String::new(),
        };
        debug_assert!(node.is_consistent());
        Ok(node)
    }
}
