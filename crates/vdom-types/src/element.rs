//! Owned construction tree.
//!
//! [`Element`] is what callers build for every render pass. It is flattened
//! into a [`VTree`](crate::VTree) before diffing.

use serde::Deserialize;
use serde_json::Value;

use crate::id::Key;
use crate::kind::{ComponentRef, NodeKind, Props, TEXT_VALUE};

/// A plain description of one UI node and its subtree.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "ElementRepr")]
pub struct Element {
    pub kind: NodeKind,
    pub props: Props,
    pub key: Option<Key>,
    pub children: Vec<Element>,
}

impl Element {
    /// A host element with the given tag and no props or children.
    pub fn new(tag: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::Element(tag.into()))
    }

    /// A text run.
    pub fn text(value: impl Into<String>) -> Self {
        let mut element = Self::with_kind(NodeKind::Text);
        element
            .props
            .insert(TEXT_VALUE.to_string(), Value::String(value.into()));
        element
    }

    /// A component node. Its child is produced by the component's render
    /// function when the tree is built.
    pub fn component(component: ComponentRef, props: Props) -> Self {
        let mut element = Self::with_kind(NodeKind::Component(component));
        element.props = props;
        element
    }

    fn with_kind(kind: NodeKind) -> Self {
        Self {
            kind,
            props: Props::new(),
            key: None,
            children: Vec::new(),
        }
    }

    /// Set a prop. A `"key"` prop becomes the element's key instead.
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        if name == "key" {
            self.key = Some(key_from_value(value));
        } else {
            self.props.insert(name, value);
        }
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Append a child. Strings become text nodes.
    pub fn child(mut self, child: impl Into<Element>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, E>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Element>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Element::count).sum::<usize>()
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

fn key_from_value(value: Value) -> Key {
    match value {
        Value::String(s) => Key::new(s),
        other => Key::new(other.to_string()),
    }
}

/// JSON shape accepted for elements: a bare string is a text node, an object
/// is `{ "tag", "props"?, "key"?, "children"? }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ElementRepr {
    Text(String),
    Node {
        tag: String,
        #[serde(default)]
        props: Props,
        #[serde(default)]
        key: Option<Key>,
        #[serde(default)]
        children: Vec<ElementRepr>,
    },
}

impl From<ElementRepr> for Element {
    fn from(repr: ElementRepr) -> Self {
        match repr {
            ElementRepr::Text(text) => Element::text(text),
            ElementRepr::Node {
                tag,
                mut props,
                key,
                children,
            } => {
                let lifted = props.remove("key").map(key_from_value);
                Element {
                    kind: NodeKind::Element(tag),
                    props,
                    key: key.or(lifted),
                    children: children.into_iter().map(Element::from).collect(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_collects_props_and_children() {
        let el = Element::new("ul")
            .prop("class", "list")
            .child(Element::new("li").key("a").child("X"))
            .child(Element::new("li").key("b").child("Y"));

        assert_eq!(el.props["class"], json!("list"));
        assert_eq!(el.children.len(), 2);
        assert_eq!(el.children[0].key, Some(Key::from("a")));
        assert_eq!(el.children[0].children[0].kind, NodeKind::Text);
        assert_eq!(el.count(), 5);
    }

    #[test]
    fn key_prop_is_lifted() {
        let el = Element::new("li").prop("key", "k1").prop("id", 3);
        assert_eq!(el.key, Some(Key::from("k1")));
        assert!(!el.props.contains_key("key"));

        let el = Element::new("li").prop("key", 42);
        assert_eq!(el.key, Some(Key::from("42")));
    }

    #[test]
    fn deserializes_from_json() {
        let el: Element = serde_json::from_value(json!({
            "tag": "div",
            "props": {"id": "root", "key": "r"},
            "children": ["hello", {"tag": "span", "children": ["x"]}]
        }))
        .unwrap();

        assert_eq!(el.kind, NodeKind::element("div"));
        assert_eq!(el.key, Some(Key::from("r")));
        assert_eq!(el.props.len(), 1);
        assert_eq!(el.children[0], Element::text("hello"));
        assert_eq!(el.children[1].children[0], Element::text("x"));
    }

    #[test]
    fn explicit_key_wins_over_prop() {
        let el: Element = serde_json::from_value(json!({
            "tag": "li", "key": "explicit", "props": {"key": "prop"}
        }))
        .unwrap();
        assert_eq!(el.key, Some(Key::from("explicit")));
    }
}
