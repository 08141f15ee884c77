//! Template Compiler - tagged-template markup to structural trees.
//!
//! A component returns the result of calling the template builder with the
//! static fragments of its markup and the dynamic values between them:
//!
//! ```ignore
//! use spark_hlx::{hlx, use_signal, template::Value};
//!
//! let count = use_signal(0);
//! let inc = count.clone();
//! hlx!(["<div>", "</div><button onclick=", ">+</button>"];
//!      count.get(),
//!      Value::handler(move |_| inc.update(|n| json!(n.as_i64().unwrap_or(0) + 1))))
//! ```
//!
//! Compilation runs in two phases:
//! - [`lexer`] - scans fragments into a typed token stream, tagging each hole
//!   with its syntactic context (slot, attribute, spread)
//! - [`builder`] - checks nesting, classifies values, writes the raw template
//!
//! The result is a [`TemplateNode`] with no addresses yet; see
//! [`crate::engine::fill`].

mod builder;
mod lexer;
pub mod markup;
mod node;
mod value;

pub use node::*;
pub use value::*;

use crate::error::CompileError;

/// Compile static `strings` interleaved with `values`.
///
/// `strings.len()` must be `values.len() + 1`.
pub fn build(strings: &[&str], values: Vec<Value>) -> Result<TemplateNode, CompileError> {
    let template = strings.join("${…}");
    if strings.len() != values.len() + 1 {
        return Err(CompileError::Malformed {
            template,
            reason: format!(
                "{} fragments need {} values, got {}",
                strings.len(),
                strings.len().saturating_sub(1),
                values.len()
            ),
        });
    }

    let mut fragments: Vec<&str> = strings.to_vec();
    if let Some(first) = fragments.first_mut() {
        *first = first.trim_start();
    }
    if let Some(last) = fragments.last_mut() {
        *last = last.trim_end();
    }

    let tokens = lexer::tokenize(&fragments, &template)?;
    builder::build_tree(&template, tokens, values)
}

/// Like [`build`], with an explicit key that identifies the node among its
/// siblings independent of position.
pub fn build_keyed(
    key: impl Into<String>,
    strings: &[&str],
    values: Vec<Value>,
) -> Result<TemplateNode, CompileError> {
    let mut node = build(strings, values)?;
    node.explicit_key = Some(key.into());
    Ok(node)
}

/// Compile a template: `hlx!(["<b>", "</b>"]; value)`.
#[macro_export]
macro_rules! hlx {
    ([$($s:expr),+ $(,)?] $(; $($v:expr),* $(,)?)?) => {
        $crate::template::build(
            &[$($s),+],
            vec![$($($crate::template::Value::from($v)),*)?],
        )
    };
}

/// Compile a keyed template: `hlx_keyed!(id; ["<li>", "</li>"]; label)`.
#[macro_export]
macro_rules! hlx_keyed {
    ($key:expr; [$($s:expr),+ $(,)?] $(; $($v:expr),* $(,)?)?) => {
        $crate::template::build_keyed(
            $key,
            &[$($s),+],
            vec![$($($crate::template::Value::from($v)),*)?],
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;

    #[test]
    fn test_primitive_child() {
        let node = build(&["<div>", "</div>"], vec![Value::from(0)]).unwrap();
        assert_eq!(node.raw.to_string(), "<div>HLX_SLOT</div>");
        assert_eq!(node.children.len(), 1);
        assert!(node.children[0].is_primitive());
        assert!(node.is_consistent());
    }

    #[test]
    fn test_null_renders_empty() {
        let node = build(&["<p>", "</p>"], vec![Value::Null]).unwrap();
        match &node.children[0] {
            Child::Primitive(p) => assert_eq!(p.html, ""),
            other => panic!("expected primitive, got {other:?}"),
        }
    }

    #[test]
    fn test_attribute_and_handler() {
        let node = build(
            &["<input value=", " oninput=", " />"],
            vec![Value::from("a"), Value::handler(|_| {})],
        )
        .unwrap();
        assert_eq!(
            node.raw.to_string(),
            "<!-- HLX_NODE_KEY --><input value=\"HLX_ATTR\" oninput=\"HLX_ATTR\"/>"
        );
        assert_eq!(node.attributes.len(), 2);
        assert_eq!(node.attributes[0].name, "value");
        assert_eq!(node.attributes[0].html, "a");
        assert!(node.attributes[1].is_handler());
    }

    #[test]
    fn test_component_tag_with_spread() {
        let node = hlx!(["<Count ...", " />"]; props! { count: 1 }).unwrap();
        assert_eq!(
            node.raw.segments(),
            &[
                Segment::NodeKey,
                Segment::Component { name: "Count".into(), closing: false },
                Segment::Props,
                Segment::Static(">".into()),
                Segment::Component { name: "Count".into(), closing: true },
            ]
        );
        assert_eq!(node.components, vec!["Count".to_string()]);
        assert_eq!(node.props[0].values.text("count"), "1");
    }

    #[test]
    fn test_component_body_becomes_children_prop() {
        let rows = vec![hlx!(["<li>a</li>"]).unwrap(), hlx!(["<li>b</li>"]).unwrap()];
        let node = hlx!(["<List>\n  ", "\n</List>"]; rows.clone()).unwrap();
        assert_eq!(node.raw.slot_count(), 0);
        assert_eq!(
            node.raw.segments(),
            &[
                Segment::NodeKey,
                Segment::Component { name: "List".into(), closing: false },
                Segment::Static(">".into()),
                Segment::Props,
                Segment::Component { name: "List".into(), closing: true },
            ]
        );
        assert_eq!(node.props[0].values.get("children"), Some(&Value::List(rows)));
        assert!(node.is_consistent());
    }

    #[test]
    fn test_component_children_join_an_existing_spread() {
        let title = hlx!(["<h2>t</h2>"]).unwrap();
        let body = hlx!(["<p>b</p>"]).unwrap();
        let node = hlx!(["<Card ...", ">", "", "</Card>"];
            props! { tone: "dark" }, title.clone(), body.clone())
        .unwrap();
        assert_eq!(node.props.len(), 1);
        assert_eq!(node.props[0].values.text("tone"), "dark");
        assert_eq!(
            node.props[0].values.get("children"),
            Some(&Value::List(vec![title, body]))
        );

        // a lone primitive is passed through unchanged
        let node = hlx!(["<Badge>", "</Badge>"]; 3).unwrap();
        assert_eq!(node.props[0].values.text("children"), "3");

        let err = hlx!(["<Card>", "", "</Card>"]; "a", "b").unwrap_err();
        assert!(matches!(err, CompileError::UnexpectedValue { index: 0, .. }));
    }

    #[test]
    fn test_plain_component_reference() {
        let node = hlx!(["<div><Counter /><Counter></Counter></div>"]).unwrap();
        assert_eq!(node.components, vec!["Counter".to_string()]);
        assert_eq!(
            node.raw.to_string(),
            "<div><!-- HLX_NODE_KEY --><Counter></Counter>\
             <!-- HLX_NODE_KEY --><Counter></Counter></div>"
        );
    }

    #[test]
    fn test_self_closing_synthesis() {
        let node = hlx!(["<div/><br/><span />"]).unwrap();
        assert_eq!(node.raw.to_string(), "<div></div><br/><span></span>");
    }

    #[test]
    fn test_list_reserves_one_slot_per_entry() {
        let items: Vec<TemplateNode> = (0..3)
            .map(|i| hlx_keyed!(i.to_string(); ["<li>", "</li>"]; i).unwrap())
            .collect();
        let node = hlx!(["<ul>", "</ul>"]; items).unwrap();
        assert_eq!(node.raw.slot_count(), 3);
        assert_eq!(node.children.len(), 3);

        let empty = hlx!(["<ul>", "</ul>"]; Vec::<TemplateNode>::new()).unwrap();
        assert_eq!(empty.raw.slot_count(), 0);
    }

    #[test]
    fn test_fragments_are_trimmed() {
        let node = hlx!(["\n  <b>x</b>\n  "]).unwrap();
        assert_eq!(node.raw.to_string(), "<b>x</b>");
    }

    #[test]
    fn test_unexpected_value_shapes() {
        let err = hlx!(["<div>", "</div>"]; Props::new()).unwrap_err();
        assert!(matches!(err, CompileError::UnexpectedValue { index: 0, .. }));

        let err = hlx!(["<div>", "</div>"]; serde_json::json!({"a": 1})).unwrap_err();
        assert!(matches!(err, CompileError::UnexpectedValue { found: "structured data", .. }));

        let err = hlx!(["<Count ...", " />"]; 3).unwrap_err();
        assert!(matches!(err, CompileError::UnexpectedValue { expected: "a props object", .. }));

        let err =
            build(&["<div onclick=", "></div>"], vec![Value::from(Props::new())]).unwrap_err();
        assert!(matches!(err, CompileError::UnexpectedValue { expected: "text or a handler", .. }));
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(
            hlx!(["<div><span></div>"]).unwrap_err(),
            CompileError::Malformed { .. }
        ));
        assert!(matches!(
            hlx!(["<div>"]).unwrap_err(),
            CompileError::Malformed { .. }
        ));
        assert!(matches!(
            hlx!(["<div ...", "></div>"]; Props::new()).unwrap_err(),
            CompileError::Malformed { .. }
        ));
        assert!(matches!(
            hlx!(["<Card><b>static</b></Card>"]).unwrap_err(),
            CompileError::ComponentChildren { .. }
        ));
        assert!(matches!(
            hlx!(["<Card>text ", "</Card>"]; "x").unwrap_err(),
            CompileError::ComponentChildren { .. }
        ));
        assert!(matches!(
            hlx!(["<Card title=", " />"]; "x").unwrap_err(),
            CompileError::Malformed { .. }
        ));
        assert!(matches!(
            build(&["<div>", "</div>"], vec![]).unwrap_err(),
            CompileError::Malformed { .. }
        ));
    }

    #[test]
    fn test_same_shape_same_raw() {
        let a = hlx!(["<div class=", ">", "</div>"]; "x", 1).unwrap();
        let b = hlx!(["<div class=", ">", "</div>"]; "y", 2).unwrap();
        assert_eq!(a.raw, b.raw);
        assert_ne!(a, b);
    }
}
