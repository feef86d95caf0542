//! Node kinds and props.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::element::Element;

/// Attribute map of a virtual node. Ordered so iteration is deterministic.
pub type Props = BTreeMap<String, Value>;

/// Prop holding the content of a text node.
pub const TEXT_VALUE: &str = "value";

/// Render function of a component: props in, rendered element out.
pub type RenderFn = fn(&Props) -> Element;

/// What a virtual node stands for.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A host element identified by its tag, e.g. `div`.
    Element(String),
    /// A text run; its content lives in the [`TEXT_VALUE`] prop.
    Text,
    /// A component whose single child is its rendered output.
    Component(ComponentRef),
}

impl NodeKind {
    pub fn element(tag: impl Into<String>) -> Self {
        Self::Element(tag.into())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }

    /// Tag name for elements, component name for components.
    pub fn name(&self) -> &str {
        match self {
            Self::Element(tag) => tag,
            Self::Text => "#text",
            Self::Component(component) => component.name(),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference to a component constructor.
///
/// Two references denote the same kind when their names match.
#[derive(Clone)]
pub struct ComponentRef {
    name: Arc<str>,
    render: RenderFn,
}

impl ComponentRef {
    pub fn new(name: impl Into<Arc<str>>, render: RenderFn) -> Self {
        Self {
            name: name.into(),
            render,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the component against its props.
    pub fn render(&self, props: &Props) -> Element {
        (self.render)(props)
    }
}

impl PartialEq for ComponentRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ComponentRef {}

impl Hash for ComponentRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentRef").field(&self.name).finish()
    }
}

impl Serialize for ComponentRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}
