//! In-memory sink over a markup string.
//!
//! `MarkupDocument` applies mutations to a plain markup buffer, locating
//! subtrees through their `<!-- address -->` markers the same way a browser
//! host locates comment nodes. Live input values are tracked beside the
//! markup, since user edits diverge from the `value` attribute.

use std::collections::HashMap;
use std::ops::Range;

use crate::error::SinkError;
use crate::template::markup::{escape_attr, escape_text};
use crate::types::{Address, is_void_element};

use super::sink::DomSink;

const INPUT_ELEMENTS: &[&str] = &["input", "textarea", "select"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkupDocument {
    markup: String,
    input_values: HashMap<Address, String>,
}

impl MarkupDocument {
    /// A document holding a single placeholder element for the root.
    pub fn new(root: &Address) -> Self {
        Self::from_markup(format!("{}<div></div>", root.marker()))
    }

    pub fn from_markup(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            input_values: HashMap::new(),
        }
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// The markup with every comment removed.
    pub fn clean_markup(&self) -> String {
        let mut out = String::with_capacity(self.markup.len());
        let mut rest = self.markup.as_str();
        while let Some(start) = rest.find("<!--") {
            out.push_str(&rest[..start]);
            match rest[start..].find("-->") {
                Some(end) => rest = &rest[start + end + 3..],
                None => {
                    rest = "";
                    break;
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Markup between the marker pair for `address`.
    pub fn content(&self, address: &Address) -> Option<&str> {
        let (open, close) = self.pair(address).ok()?;
        Some(&self.markup[open.end..close.start])
    }

    /// Live value of the input element after the marker for `address`.
    pub fn input_value(&self, address: &Address) -> Option<&str> {
        self.input_values.get(address).map(String::as_str)
    }

    /// Simulate a user edit of an input element.
    pub fn type_into(&mut self, address: &Address, value: impl Into<String>) {
        self.input_values.insert(address.clone(), value.into());
    }

    // -------------------------------------------------------------------------
    // Location
    // -------------------------------------------------------------------------

    fn marker(&self, address: &Address) -> Result<Range<usize>, SinkError> {
        let marker = address.marker();
        self.markup
            .find(&marker)
            .map(|start| start..start + marker.len())
            .ok_or_else(|| stale(address))
    }

    fn pair(&self, address: &Address) -> Result<(Range<usize>, Range<usize>), SinkError> {
        let open = self.marker(address)?;
        let marker = address.marker();
        let close = self.markup[open.end..]
            .find(&marker)
            .map(|offset| open.end + offset..open.end + offset + marker.len())
            .ok_or_else(|| stale(address))?;
        Ok((open, close))
    }

    fn element_after(&self, address: &Address) -> Result<Element, SinkError> {
        let marker = self.marker(address)?;
        element_at(&self.markup, marker.end).ok_or_else(|| SinkError::NotAnElement {
            address: address.clone(),
        })
    }
}

fn stale(address: &Address) -> SinkError {
    SinkError::StaleAddress {
        address: address.clone(),
    }
}

// =============================================================================
// Markup scanning
// =============================================================================

/// An element located in the markup.
struct Element {
    name: String,
    /// From `<` to the end of the closing tag
    span: Range<usize>,
    /// From `<` to the `>` of the opening tag, inclusive
    open_tag: Range<usize>,
}

fn is_name_char(c: char) -> bool {
    !(c.is_whitespace() || c == '/' || c == '>')
}

/// Index of the `>` ending the tag that starts at `from`, skipping quotes.
fn tag_end(markup: &str, from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in markup[from..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(from + i),
            _ => {}
        }
    }
    None
}

fn tag_name(markup: &str, from: usize) -> &str {
    let rest = &markup[from..];
    let end = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
    &rest[..end]
}

/// Locate the element starting at `from` (leading whitespace allowed).
fn element_at(markup: &str, from: usize) -> Option<Element> {
    let start = from + (markup[from..].len() - markup[from..].trim_start().len());
    let rest = &markup[start..];
    if !rest.starts_with('<') || !rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let name = tag_name(markup, start + 1).to_string();
    let gt = tag_end(markup, start + 1)?;
    let open_tag = start..gt + 1;

    if markup[..gt].ends_with('/') || is_void_element(&name) {
        return Some(Element {
            name,
            span: open_tag.clone(),
            open_tag,
        });
    }

    let mut depth = 1usize;
    let mut pos = gt + 1;
    while let Some(offset) = markup[pos..].find('<') {
        let at = pos + offset;
        let rest = &markup[at..];
        if rest.starts_with("<!--") {
            pos = at + rest.find("-->")? + 3;
        } else if let Some(closing) = rest.strip_prefix("</") {
            let end = tag_end(markup, at)?;
            if tag_name(closing, 0).eq_ignore_ascii_case(&name) {
                depth -= 1;
                if depth == 0 {
                    return Some(Element {
                        name,
                        span: start..end + 1,
                        open_tag,
                    });
                }
            }
            pos = end + 1;
        } else {
            let end = tag_end(markup, at + 1)?;
            let nested = tag_name(markup, at + 1);
            if nested.eq_ignore_ascii_case(&name) && !markup[..end].ends_with('/') {
                depth += 1;
            }
            pos = end + 1;
        }
    }
    None
}

/// `(name, range)` of each attribute in an opening tag, offsets relative to it.
fn attribute_spans(tag: &str) -> Vec<(String, Range<usize>)> {
    let bytes = tag.as_bytes();
    let mut spans = Vec::new();
    let mut i = 1 + tag_name(tag, 1).len();

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] == b'>' || bytes[i] == b'/' {
            break;
        }
        let start = i;
        while i < bytes.len()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
            && !bytes[i].is_ascii_whitespace()
        {
            i += 1;
        }
        let name = tag[start..i].to_string();
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            match bytes.get(i) {
                Some(&quote @ (b'"' | b'\'')) => {
                    i += 1;
                    while i < bytes.len() && bytes[i] != quote {
                        i += 1;
                    }
                    i = (i + 1).min(bytes.len());
                }
                _ => {
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                }
            }
        }
        spans.push((name, start..i));
    }
    spans
}

// =============================================================================
// DomSink
// =============================================================================

impl DomSink for MarkupDocument {
    fn mount(&mut self, address: &Address, html: &str) -> Result<(), SinkError> {
        let element = self.element_after(address)?;
        let replacement = format!("{html}{}", address.marker());
        self.markup.replace_range(element.span, &replacement);
        Ok(())
    }

    fn set_attribute(
        &mut self,
        address: &Address,
        name: &str,
        value: &str,
    ) -> Result<(), SinkError> {
        let element = self.element_after(address)?;
        let tag = &self.markup[element.open_tag.clone()];
        let rendered = format!("{name}=\"{}\"", escape_attr(value));

        let existing = attribute_spans(tag)
            .into_iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name));
        match existing {
            Some((_, range)) => {
                let base = element.open_tag.start;
                self.markup
                    .replace_range(base + range.start..base + range.end, &rendered);
            }
            None => {
                let mut at = element.open_tag.end - 1;
                if self.markup[..at].ends_with('/') {
                    at -= 1;
                }
                self.markup.insert_str(at, &format!(" {rendered}"));
            }
        }
        Ok(())
    }

    fn accepts_input(&self, address: &Address) -> bool {
        self.element_after(address).is_ok_and(|element| {
            INPUT_ELEMENTS
                .iter()
                .any(|n| n.eq_ignore_ascii_case(&element.name))
        })
    }

    fn sync_input_value(&mut self, address: &Address, value: &str) -> Result<(), SinkError> {
        self.element_after(address)?;
        self.input_values.insert(address.clone(), value.to_string());
        Ok(())
    }

    fn replace_text(&mut self, address: &Address, text: &str) -> Result<(), SinkError> {
        let (open, close) = self.pair(address)?;
        self.markup.replace_range(open.end..close.start, &escape_text(text));
        Ok(())
    }

    fn replace_markup(&mut self, address: &Address, html: &str) -> Result<(), SinkError> {
        let (open, close) = self.pair(address)?;
        self.markup.replace_range(open.end..close.start, html);
        Ok(())
    }

    fn reorder(&mut self, address: &Address, order: &[Address]) -> Result<(), SinkError> {
        let mut ranges = Vec::with_capacity(order.len());
        for child in order {
            let (open, close) = self.pair(child)?;
            ranges.push(open.start..close.end);
        }
        let contents: Vec<String> = ranges
            .iter()
            .map(|r| self.markup[r.clone()].to_string())
            .collect();

        let mut slots = ranges;
        slots.sort_by_key(|range| range.start);
        if slots.windows(2).any(|pair| pair[0].end > pair[1].start) {
            return Err(stale(address));
        }

        let mut out = String::with_capacity(self.markup.len());
        let mut cursor = 0;
        for (slot, content) in slots.iter().zip(&contents) {
            out.push_str(&self.markup[cursor..slot.start]);
            out.push_str(content);
            cursor = slot.end;
        }
        out.push_str(&self.markup[cursor..]);
        self.markup = out;
        Ok(())
    }

    fn destroy_descendants(&mut self, address: &Address) -> Result<(), SinkError> {
        self.input_values
            .retain(|input, _| !input.is_descendant_of(address));
        Ok(())
    }

    fn contains(&self, address: &Address) -> bool {
        self.markup.contains(&address.marker())
    }

    fn holds(&self, address: &Address) -> bool {
        self.pair(address).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::Mutation;

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    #[test]
    fn test_mount_replaces_placeholder() {
        let mut doc = MarkupDocument::new(&addr("hlx"));
        doc.mount(&addr("hlx"), "<p><!-- hlx-0 --><hlx-counter></hlx-counter></p>")
            .unwrap();
        assert_eq!(
            doc.markup(),
            "<!-- hlx --><p><!-- hlx-0 --><hlx-counter></hlx-counter></p><!-- hlx -->"
        );
        doc.mount(&addr("hlx-0"), "<b>1</b>").unwrap();
        assert_eq!(
            doc.markup(),
            "<!-- hlx --><p><!-- hlx-0 --><b>1</b><!-- hlx-0 --></p><!-- hlx -->"
        );
        assert_eq!(doc.content(&addr("hlx-0")), Some("<b>1</b>"));
        assert_eq!(doc.clean_markup(), "<p><b>1</b></p>");
    }

    #[test]
    fn test_replace_text_escapes() {
        let mut doc = MarkupDocument::from_markup("<div><!-- a -->0<!-- a --></div>");
        doc.replace_text(&addr("a"), "<5>").unwrap();
        assert_eq!(doc.markup(), "<div><!-- a -->&lt;5&gt;<!-- a --></div>");
    }

    #[test]
    fn test_markers_do_not_match_prefixes() {
        let mut doc = MarkupDocument::from_markup(
            "<!-- a-slot.10 -->x<!-- a-slot.10 --><!-- a-slot.1 -->y<!-- a-slot.1 -->",
        );
        doc.replace_text(&addr("a-slot.1"), "z").unwrap();
        assert_eq!(doc.content(&addr("a-slot.10")), Some("x"));
        assert_eq!(doc.content(&addr("a-slot.1")), Some("z"));
    }

    #[test]
    fn test_set_attribute_existing_and_new() {
        let mut doc = MarkupDocument::from_markup(r#"<!-- e --><input class="c" value="a"/>"#);
        doc.set_attribute(&addr("e"), "value", "b \"q\"").unwrap();
        assert_eq!(doc.markup(), r#"<!-- e --><input class="c" value="b &quot;q&quot;"/>"#);
        doc.set_attribute(&addr("e"), "title", "t").unwrap();
        assert_eq!(
            doc.markup(),
            r#"<!-- e --><input class="c" value="b &quot;q&quot;" title="t"/>"#
        );
    }

    #[test]
    fn test_value_attribute_syncs_live_input() {
        let mut doc = MarkupDocument::from_markup(
            r#"<!-- e --><input value="a"/><!-- p --><p class="x"></p>"#,
        );
        doc.type_into(&addr("e"), "typed");
        assert!(doc.accepts_input(&addr("e")));
        assert!(!doc.accepts_input(&addr("p")));

        doc.apply(&Mutation::SetAttribute {
            address: addr("e"),
            name: "value".into(),
            value: "b".into(),
        })
        .unwrap();
        assert_eq!(doc.input_value(&addr("e")), Some("b"));

        doc.apply(&Mutation::SetAttribute {
            address: addr("p"),
            name: "value".into(),
            value: "v".into(),
        })
        .unwrap();
        assert_eq!(doc.input_value(&addr("p")), None);
    }

    #[test]
    fn test_nested_same_name_elements() {
        let mut doc = MarkupDocument::from_markup("<!-- r --><div><div>in</div></div><p>after</p>");
        doc.mount(&addr("r"), "x").unwrap();
        assert_eq!(doc.markup(), "<!-- r -->x<!-- r --><p>after</p>");
    }

    #[test]
    fn test_reorder_refills_ranges() {
        let mut doc = MarkupDocument::from_markup(
            "<ul><!-- a -->A<!-- a --><!-- u -->U<!-- u --><!-- b -->B<!-- b --></ul>",
        );
        doc.reorder(&addr("r"), &[addr("b"), addr("a")]).unwrap();
        assert_eq!(
            doc.markup(),
            "<ul><!-- b -->B<!-- b --><!-- u -->U<!-- u --><!-- a -->A<!-- a --></ul>"
        );
    }

    #[test]
    fn test_stale_addresses() {
        let mut doc = MarkupDocument::from_markup("<!-- a -->text");
        assert_eq!(
            doc.replace_text(&addr("missing"), "x"),
            Err(SinkError::StaleAddress { address: addr("missing") })
        );
        assert_eq!(
            doc.set_attribute(&addr("a"), "x", "y"),
            Err(SinkError::NotAnElement { address: addr("a") })
        );
        assert!(doc.contains(&addr("a")));
        assert!(!doc.contains(&addr("missing")));
        assert!(!doc.holds(&addr("a")));
    }

    #[test]
    fn test_holds_needs_a_marker_pair() {
        let mut doc = MarkupDocument::new(&addr("hlx"));
        assert!(!doc.holds(&addr("hlx")));
        doc.mount(&addr("hlx"), "<p>x</p>").unwrap();
        assert!(doc.holds(&addr("hlx")));
        assert_eq!(doc.content(&addr("hlx")), Some("<p>x</p>"));
    }

    #[test]
    fn test_destroy_descendants_drops_live_values() {
        let mut doc = MarkupDocument::from_markup("<!-- a-0 --><input/>");
        doc.type_into(&addr("a-0"), "x");
        doc.destroy_descendants(&addr("a")).unwrap();
        assert_eq!(doc.input_value(&addr("a-0")), None);
    }
}
