//! Reconciler - diff two filled trees into a mutation list.
//!
//! The trees are walked in parallel, parent before children. At each
//! position the first matching rule wins:
//!
//! 1. attribute whose resolved text changed: `SetAttribute`
//! 2. primitive whose text changed: `ReplaceText` (after `DestroyDescendants`
//!    if a structural node used to live there)
//! 3. node whose raw template changed: `DestroyDescendants` + `ReplaceMarkup`
//! 4. otherwise recurse into children, then attributes
//!
//! Children are paired by address, so unkeyed children pair up by position
//! and keyed children follow their key. When the keyed children are the same
//! set in a new order a single `Reorder` moves them; a changed key set
//! rebuilds the parent.

use crate::template::{AttributeNode, Child, TemplateNode};
use crate::types::Address;

use super::mutation::Mutation;

/// Compute the mutations that turn the output of `prev` into that of `next`.
///
/// Both trees must be filled for the same instance address.
pub fn diff(prev: &TemplateNode, next: &TemplateNode) -> Vec<Mutation> {
    let mut mutations = Vec::new();
    diff_node(prev, next, &mut mutations);
    mutations
}

fn address_of(key: Option<&Address>) -> Address {
    key.cloned().unwrap_or_else(|| Address::new(String::new()))
}

fn replace_node(next: &TemplateNode, out: &mut Vec<Mutation>) {
    let address = address_of(next.key.as_ref());
    out.push(Mutation::DestroyDescendants {
        address: address.clone(),
    });
    out.push(Mutation::ReplaceMarkup {
        address,
        html: next.html.clone(),
    });
}

fn diff_node(prev: &TemplateNode, next: &TemplateNode, out: &mut Vec<Mutation>) {
    if prev.raw != next.raw {
        replace_node(next, out);
        return;
    }

    let prev_order: Vec<Option<&Address>> = prev.children.iter().map(Child::key).collect();
    let next_order: Vec<Option<&Address>> = next.children.iter().map(Child::key).collect();
    if prev_order != next_order {
        let same_set = prev_order.len() == next_order.len()
            && next_order.iter().all(|key| prev_order.contains(key));
        if !same_set {
            replace_node(next, out);
            return;
        }
        out.push(Mutation::Reorder {
            address: address_of(next.key.as_ref()),
            order: next_order.iter().map(|key| address_of(*key)).collect(),
        });
    }

    for child in &next.children {
        let previous = prev.children.iter().find(|p| p.key() == child.key());
        diff_child(previous, child, out);
    }
    for (previous, attribute) in prev.attributes.iter().zip(&next.attributes) {
        diff_attribute(previous, attribute, out);
    }
}

fn diff_child(prev: Option<&Child>, next: &Child, out: &mut Vec<Mutation>) {
    match (prev, next) {
        (Some(Child::Node(prev)), Child::Node(next)) => diff_node(prev, next, out),
        (Some(Child::Primitive(prev)), Child::Primitive(next)) => {
            if prev.html != next.html {
                out.push(Mutation::ReplaceText {
                    address: address_of(next.key.as_ref()),
                    text: next.text.clone(),
                });
            }
        }
        (Some(Child::Node(_)), Child::Primitive(next)) => {
            let address = address_of(next.key.as_ref());
            out.push(Mutation::DestroyDescendants {
                address: address.clone(),
            });
            out.push(Mutation::ReplaceText {
                address,
                text: next.text.clone(),
            });
        }
        (Some(Child::Primitive(_)) | None, Child::Node(next)) => replace_node(next, out),
        (None, Child::Primitive(next)) => out.push(Mutation::ReplaceText {
            address: address_of(next.key.as_ref()),
            text: next.text.clone(),
        }),
    }
}

fn diff_attribute(prev: &AttributeNode, next: &AttributeNode, out: &mut Vec<Mutation>) {
    if prev.html != next.html {
        out.push(Mutation::SetAttribute {
            address: address_of(next.key.as_ref()),
            name: next.name.clone(),
            value: next.html.clone(),
        });
    }
}
