use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;
use vdom_types::{HostId, NodeKind, VNode, TEXT_VALUE};

use crate::error::{HostError, HostResult};
use crate::host::HostTree;

/// What a host node renders as.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostNodeKind {
    /// A tagged element. Components render as an element named after them.
    Element(String),
    Text(String),
}

/// One node of a [`MemoryHost`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HostNode {
    pub kind: HostNodeKind,
    /// Plain attributes, stringified.
    pub attributes: BTreeMap<String, String>,
    /// Composite style entries, from either an object or a `css` string.
    pub style: BTreeMap<String, String>,
    /// Current value of a form control.
    pub value: Option<String>,
    /// Bound listeners, by lowercase event name.
    pub listeners: BTreeMap<String, String>,
    pub children: Vec<HostId>,
    pub parent: Option<HostId>,
}

impl HostNode {
    fn new(kind: HostNodeKind) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
            style: BTreeMap::new(),
            value: None,
            listeners: BTreeMap::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    fn is_control(&self) -> bool {
        matches!(&self.kind, HostNodeKind::Element(tag) if tag == "input" || tag == "textarea")
    }
}

/// In-memory, arena-backed host tree.
///
/// Intended for tests and embedding. Detached nodes stay in the arena so
/// handles never dangle; [`MemoryHost::created`] counts every node ever
/// created, which makes host-node reuse observable.
#[derive(Clone, Debug, Default)]
pub struct MemoryHost {
    nodes: Vec<HostNode>,
}

impl MemoryHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached element to mount trees into.
    pub fn create_container(&mut self, tag: &str) -> HostId {
        self.alloc(HostNode::new(HostNodeKind::Element(tag.to_string())))
    }

    /// Total number of host nodes created so far.
    pub fn created(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: HostId) -> Option<&HostNode> {
        self.nodes.get(Self::slot(id))
    }

    /// Concatenated text of `id`'s subtree.
    pub fn text_content(&self, id: HostId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            match &node.kind {
                HostNodeKind::Text(text) => out.push_str(text),
                HostNodeKind::Element(_) => stack.extend(node.children.iter().rev()),
            }
        }
        out
    }

    /// Serialize `id`'s subtree as markup.
    ///
    /// Attributes come out sorted, followed by `style` and a control's
    /// `value`. Listeners are not rendered.
    pub fn render(&self, id: HostId) -> String {
        let mut out = String::new();
        self.render_into(id, &mut out);
        out
    }

    /// Markup of every child of `id`, without `id`'s own tag.
    pub fn render_children(&self, id: HostId) -> String {
        let mut out = String::new();
        if let Some(node) = self.node(id) {
            for child in &node.children {
                self.render_into(*child, &mut out);
            }
        }
        out
    }

    fn render_into(&self, id: HostId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        let tag = match &node.kind {
            HostNodeKind::Text(text) => {
                out.push_str(&escape(text));
                return;
            }
            HostNodeKind::Element(tag) => tag,
        };

        out.push('<');
        out.push_str(tag);
        for (name, value) in &node.attributes {
            let _ = write!(out, " {name}=\"{}\"", escape(value));
        }
        if !node.style.is_empty() {
            let _ = write!(out, " style=\"{}\"", escape(&css_text(&node.style)));
        }
        if let Some(value) = &node.value {
            let _ = write!(out, " value=\"{}\"", escape(value));
        }
        out.push('>');
        for child in &node.children {
            self.render_into(*child, out);
        }
        let _ = write!(out, "</{tag}>");
    }

    fn alloc(&mut self, node: HostNode) -> HostId {
        let id = HostId::new(self.nodes.len() as u64);
        self.nodes.push(node);
        id
    }

    fn slot(id: HostId) -> usize {
        id.raw() as usize
    }

    fn node_mut(&mut self, id: HostId) -> HostResult<&mut HostNode> {
        self.nodes
            .get_mut(Self::slot(id))
            .ok_or(HostError::NodeNotFound(id))
    }

    fn container(&self, id: HostId) -> HostResult<&HostNode> {
        let node = self.node(id).ok_or(HostError::NodeNotFound(id))?;
        match node.kind {
            HostNodeKind::Element(_) => Ok(node),
            HostNodeKind::Text(_) => Err(HostError::NotAContainer(id)),
        }
    }

    /// Detach `node` from its current parent, if any.
    fn detach(&mut self, node: HostId) -> HostResult<()> {
        let Some(parent) = self.node_mut(node)?.parent.take() else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|c| *c != node);
        Ok(())
    }

    /// Check the preconditions shared by `insert_before` and `append_child`.
    fn check_insert(&self, parent: HostId, node: HostId) -> HostResult<()> {
        self.container(parent)?;
        self.node(node).ok_or(HostError::NodeNotFound(node))?;
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == node {
                return Err(HostError::Cycle { parent, node });
            }
            cursor = self.parent(current);
        }
        Ok(())
    }
}

impl HostTree for MemoryHost {
    fn create_node(&mut self, node: &VNode) -> HostResult<HostId> {
        let kind = match &node.kind {
            NodeKind::Text => HostNodeKind::Text(node.text().unwrap_or_default().to_string()),
            other => HostNodeKind::Element(other.name().to_string()),
        };
        Ok(self.alloc(HostNode::new(kind)))
    }

    fn set_attribute(&mut self, id: HostId, name: &str, value: &Value) -> HostResult<()> {
        let node = self.node_mut(id)?;
        if let HostNodeKind::Text(text) = &mut node.kind {
            if name == TEXT_VALUE {
                *text = stringify(value);
            }
            return Ok(());
        }

        if name == "style" {
            node.style = parse_style(value);
        } else if name == "value" && node.is_control() {
            node.value = Some(stringify(value));
        } else if let Some(event) = listener_name(name) {
            node.listeners.insert(event, stringify(value));
        } else {
            node.attributes.insert(name.to_string(), stringify(value));
        }
        Ok(())
    }

    fn remove_attribute(&mut self, id: HostId, name: &str) -> HostResult<()> {
        let node = self.node_mut(id)?;
        if let HostNodeKind::Text(text) = &mut node.kind {
            if name == TEXT_VALUE {
                text.clear();
            }
            return Ok(());
        }

        if name == "style" {
            node.style.clear();
        } else if name == "value" && node.is_control() {
            node.value = None;
        } else if let Some(event) = listener_name(name) {
            node.listeners.remove(&event);
        } else {
            node.attributes.remove(name);
        }
        Ok(())
    }

    fn insert_before(&mut self, parent: HostId, node: HostId, reference: HostId) -> HostResult<()> {
        self.check_insert(parent, node)?;
        if node == reference {
            return Ok(());
        }
        if !self.container(parent)?.children.contains(&reference) {
            return Err(HostError::NotAChild {
                parent,
                child: reference,
            });
        }
        self.detach(node)?;
        let siblings = &mut self.node_mut(parent)?.children;
        let at = siblings
            .iter()
            .position(|c| *c == reference)
            .unwrap_or(siblings.len());
        siblings.insert(at, node);
        self.node_mut(node)?.parent = Some(parent);
        Ok(())
    }

    fn append_child(&mut self, parent: HostId, node: HostId) -> HostResult<()> {
        self.check_insert(parent, node)?;
        self.detach(node)?;
        self.node_mut(parent)?.children.push(node);
        self.node_mut(node)?.parent = Some(parent);
        Ok(())
    }

    fn remove_child(&mut self, parent: HostId, node: HostId) -> HostResult<()> {
        if self.parent(node) != Some(parent) {
            return Err(HostError::NotAChild {
                parent,
                child: node,
            });
        }
        self.detach(node)
    }

    fn parent(&self, node: HostId) -> Option<HostId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn children(&self, node: HostId) -> HostResult<Vec<HostId>> {
        let node = self.node(node).ok_or(HostError::NodeNotFound(node))?;
        Ok(node.children.clone())
    }
}

// ---------------------------------------------------------------------------
// Attribute helpers
// ---------------------------------------------------------------------------

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `onClick` binds the `click` listener.
fn listener_name(name: &str) -> Option<String> {
    let event = name.strip_prefix("on")?;
    if event.is_empty() {
        return None;
    }
    Some(event.to_ascii_lowercase())
}

/// Style objects set one entry per field; strings are parsed as css text.
fn parse_style(value: &Value) -> BTreeMap<String, String> {
    match value {
        Value::Object(fields) => fields
            .iter()
            .map(|(name, v)| (name.clone(), stringify(v)))
            .collect(),
        Value::String(css) => css
            .split(';')
            .filter_map(|decl| {
                let (name, v) = decl.split_once(':')?;
                let name = name.trim();
                (!name.is_empty()).then(|| (name.to_string(), v.trim().to_string()))
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}

fn css_text(style: &BTreeMap<String, String>) -> String {
    style
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}
