//! Key addressing - resolve a compiled tree into addressed markup.
//!
//! Filling walks the raw segments of every node and replaces placeholders:
//!
//! ```text
//! NodeKey   -> <!-- hlx-0 -->                      element id
//! Attr      -> "resolved value"                    bound to the last element id
//! Props     -> (nothing)                           recorded as a props site
//! Slot      -> <!-- hlx-slot.0 -->child<!-- hlx-slot.0 -->
//! Component -> <hlx-counter ... </hlx-counter>     recorded as a component site
//! ```
//!
//! Element ids count NodeKey markers inside one node, slot paths count slots,
//! and keyed children use `key-{key}` instead of a position. Positions of
//! unkeyed children skip keyed siblings, so moving keyed entries around
//! never shifts the addresses of the unkeyed ones.

use std::collections::HashSet;
use std::fmt;

use crate::config::RuntimeConfig;
use crate::error::AddressError;
use crate::template::markup::{component_tag, escape_attr};
use crate::template::{Child, Handler, Props, Segment, TemplateNode};
use crate::types::{Address, HandlerId, PATH_SEPARATOR};

/// Everything a fill discovered besides the markup itself.
#[derive(Default)]
pub struct FillOutput {
    /// Handlers bound by this tree, by address-qualified id
    pub handlers: Vec<(HandlerId, Handler)>,
    /// Props forwarded to component elements, by element address
    pub props_sites: Vec<(Address, Props)>,
    /// Component references, by element address, in document order
    pub component_sites: Vec<(Address, String)>,
}

impl fmt::Debug for FillOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers: Vec<&HandlerId> = self.handlers.iter().map(|(id, _)| id).collect();
        f.debug_struct("FillOutput")
            .field("handlers", &handlers)
            .field("props_sites", &self.props_sites)
            .field("component_sites", &self.component_sites)
            .finish()
    }
}

/// Assign addresses to `node` (rendered by the instance at `instance`) and
/// resolve its markup into `node.html`.
pub fn fill(
    node: &mut TemplateNode,
    instance: &Address,
    config: &RuntimeConfig,
) -> Result<FillOutput, AddressError> {
    let mut out = FillOutput::default();
    fill_node(node, instance, None, config, &mut out)?;
    Ok(out)
}

/// Reject keys that could collide with generated address segments.
pub fn validate_key(key: &str) -> Result<(), AddressError> {
    let valid = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AddressError::InvalidKey {
            key: key.to_string(),
        })
    }
}

fn fill_node(
    node: &mut TemplateNode,
    instance: &Address,
    local_key: Option<&str>,
    config: &RuntimeConfig,
    out: &mut FillOutput,
) -> Result<(), AddressError> {
    let TemplateNode {
        key,
        raw,
        children,
        attributes,
        props,
        html,
        ..
    } = node;

    let base = match local_key {
        Some(local) => {
            *key = Some(instance.join(local));
            format!("{local}{PATH_SEPARATOR}")
        }
        None => {
            *key = Some(instance.clone());
            String::new()
        }
    };
    let node_address = key.clone().unwrap_or_else(|| instance.clone());

    html.clear();
    let mut element: Option<Address> = None;
    let mut element_index = 0usize;
    let mut slot_index = 0usize;
    let mut keyed_count = 0usize;
    let mut seen_keys: HashSet<String> = HashSet::new();
    let mut attr_index = 0usize;
    let mut props_index = 0usize;

    for segment in raw.segments() {
        match segment {
            Segment::Static(text) => html.push_str(text),

            Segment::NodeKey => {
                let id = instance.join(&format!("{base}{element_index}"));
                element_index += 1;
                html.push_str(&id.marker());
                element = Some(id);
            }

            Segment::Component { name, closing: false } => {
                let site = element.clone().unwrap_or_else(|| node_address.clone());
                html.push('<');
                html.push_str(&component_tag(&config.tag_prefix, name));
                out.component_sites.push((site, name.clone()));
            }

            Segment::Component { name, closing: true } => {
                html.push_str("</");
                html.push_str(&component_tag(&config.tag_prefix, name));
                html.push('>');
            }

            Segment::Attr => {
                let Some(attribute) = attributes.get_mut(attr_index) else {
                    continue;
                };
                attr_index += 1;
                let owner = element.clone().unwrap_or_else(|| node_address.clone());
                if let Some(handler) = &attribute.handler {
                    let id = HandlerId::new(&owner, &attribute.name);
                    attribute.html = format!("{}('{id}', event)", config.dispatch_function);
                    out.handlers.push((id, handler.clone()));
                }
                attribute.key = Some(owner);
                html.push('"');
                html.push_str(&escape_attr(&attribute.html));
                html.push('"');
            }

            Segment::Props => {
                let Some(spread) = props.get_mut(props_index) else {
                    continue;
                };
                props_index += 1;
                let owner = element.clone().unwrap_or_else(|| node_address.clone());
                spread.key = Some(owner.clone());
                out.props_sites.push((owner, spread.values.clone()));
            }

            Segment::Slot => {
                let Some(child) = children.get_mut(slot_index) else {
                    continue;
                };
                let explicit = match child {
                    Child::Node(node) => node.explicit_key.clone(),
                    Child::Primitive(_) => None,
                };
                let position = match explicit {
                    Some(explicit) => {
                        validate_key(&explicit)?;
                        if !seen_keys.insert(explicit.clone()) {
                            return Err(AddressError::DuplicateKey {
                                key: explicit,
                                parent: node_address,
                            });
                        }
                        keyed_count += 1;
                        format!("key-{explicit}")
                    }
                    None => (slot_index - keyed_count).to_string(),
                };
                slot_index += 1;

                let path = format!("{base}slot{PATH_SEPARATOR}{position}");
                let address = instance.join(&path);
                let marker = address.marker();
                html.push_str(&marker);
                match child {
                    Child::Primitive(primitive) => {
                        primitive.key = Some(address);
                        html.push_str(&primitive.html);
                    }
                    Child::Node(child) => {
                        fill_node(child, instance, Some(&path), config, out)?;
                        html.push_str(&child.html);
                    }
                }
                html.push_str(&marker);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Value;
    use crate::{hlx, hlx_keyed, props};

    fn root() -> Address {
        Address::new("hlx")
    }

    #[test]
    fn test_primitive_slot_addressing() {
        let mut node = hlx!(["<div>", "</div>"]; 0).unwrap();
        fill(&mut node, &root(), &RuntimeConfig::default()).unwrap();
        assert_eq!(node.key, Some(root()));
        assert_eq!(node.html, "<div><!-- hlx-slot.0 -->0<!-- hlx-slot.0 --></div>");
        assert_eq!(node.children[0].key(), Some(&Address::new("hlx-slot.0")));
    }

    #[test]
    fn test_attribute_and_handler_addressing() {
        let mut node = hlx!(["<input value=", " oninput=", " />"];
            "a \"quoted\"", Value::handler(|_| {}))
        .unwrap();
        let out = fill(&mut node, &root(), &RuntimeConfig::default()).unwrap();
        assert_eq!(
            node.html,
            "<!-- hlx-0 --><input value=\"a &quot;quoted&quot;\" \
             oninput=\"hlx.dispatch('hlx-0:oninput', event)\"/>"
        );
        assert_eq!(node.attributes[0].key, Some(Address::new("hlx-0")));
        assert_eq!(out.handlers.len(), 1);
        assert_eq!(out.handlers[0].0.as_str(), "hlx-0:oninput");
    }

    #[test]
    fn test_nested_element_ids_use_local_path() {
        let inner = hlx!(["<b class=", "></b>"]; "x").unwrap();
        let mut node = hlx!(["<p>", "</p>"]; inner).unwrap();
        fill(&mut node, &root(), &RuntimeConfig::default()).unwrap();
        assert_eq!(
            node.html,
            "<p><!-- hlx-slot.0 --><!-- hlx-slot.0.0 --><b class=\"x\"></b><!-- hlx-slot.0 --></p>"
        );
    }

    #[test]
    fn test_keyed_children_skip_positions() {
        let items = vec![
            hlx!(["<i>u</i>"]).unwrap(),
            hlx_keyed!("a"; ["<i>a</i>"]).unwrap(),
            hlx!(["<i>v</i>"]).unwrap(),
        ];
        let mut node = hlx!(["<ul>", "</ul>"]; items).unwrap();
        fill(&mut node, &root(), &RuntimeConfig::default()).unwrap();
        let keys: Vec<&str> = node
            .children
            .iter()
            .filter_map(Child::key)
            .map(Address::as_str)
            .collect();
        assert_eq!(keys, vec!["hlx-slot.0", "hlx-slot.key-a", "hlx-slot.1"]);
    }

    #[test]
    fn test_component_and_props_sites() {
        let mut node = hlx!(["<div><Counter ...", " /></div>"]; props! { count: 1 }).unwrap();
        let out = fill(&mut node, &Address::new("hlx-slot.2"), &RuntimeConfig::default()).unwrap();
        assert_eq!(
            node.html,
            "<div><!-- hlx-slot.2-0 --><hlx-counter></hlx-counter></div>"
        );
        assert_eq!(
            out.component_sites,
            vec![(Address::new("hlx-slot.2-0"), "Counter".to_string())]
        );
        assert_eq!(out.props_sites[0].0, Address::new("hlx-slot.2-0"));
        assert_eq!(out.props_sites[0].1.text("count"), "1");
    }

    #[test]
    fn test_invalid_keys_rejected() {
        for key in ["", "a-b", "a.b", "a b", "x--y", "a:b"] {
            let items = vec![hlx_keyed!(key; ["<i></i>"]).unwrap()];
            let mut node = hlx!(["<ul>", "</ul>"]; items).unwrap();
            let result = fill(&mut node, &root(), &RuntimeConfig::default());
            assert_eq!(
                result.err(),
                Some(AddressError::InvalidKey { key: key.to_string() })
            );
        }
        assert!(validate_key("item_42").is_ok());
    }

    #[test]
    fn test_duplicate_sibling_keys_rejected() {
        let items = vec![
            hlx_keyed!("x"; ["<li>one</li>"]).unwrap(),
            hlx_keyed!("x"; ["<li>two</li>"]).unwrap(),
        ];
        let mut node = hlx!(["<ul>", "</ul>"]; items).unwrap();
        let result = fill(&mut node, &root(), &RuntimeConfig::default());
        assert_eq!(
            result.err(),
            Some(AddressError::DuplicateKey {
                key: "x".into(),
                parent: root(),
            })
        );
    }

    #[test]
    fn test_same_key_under_different_parents() {
        let left = hlx!(["<ol>", "</ol>"]; vec![hlx_keyed!("x"; ["<li></li>"]).unwrap()]).unwrap();
        let right = hlx!(["<ol>", "</ol>"]; vec![hlx_keyed!("x"; ["<li></li>"]).unwrap()]).unwrap();
        let mut node = hlx!(["<div>", "", "</div>"]; left, right).unwrap();
        assert!(fill(&mut node, &root(), &RuntimeConfig::default()).is_ok());
    }

    #[test]
    fn test_refill_is_stable() {
        let make = || hlx!(["<p class=", ">", "</p>"]; "c", "t").unwrap();
        let mut a = make();
        let mut b = make();
        fill(&mut a, &root(), &RuntimeConfig::default()).unwrap();
        fill(&mut b, &root(), &RuntimeConfig::default()).unwrap();
        assert_eq!(a, b);
    }
}
