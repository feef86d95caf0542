use serde_json::Value;
use vdom_types::{HostId, VNode};

use crate::error::HostResult;

/// The render surface patches are applied to.
///
/// The reconciler never inspects host nodes; it creates them, sets their
/// attributes, and moves them around through this trait. Implementations
/// must follow DOM-like semantics:
///
/// - Inserting or appending a node that already has a parent moves it.
/// - Removing a child detaches the whole subtree, which stays alive until
///   the host drops it.
/// - `children` reflects the current order, including earlier mutations.
pub trait HostTree {
    /// Create a detached host node for `node`'s kind. Text nodes are created
    /// with their content; other props are set separately.
    fn create_node(&mut self, node: &VNode) -> HostResult<HostId>;

    /// Set one attribute.
    ///
    /// Hosts special-case composite `style` values, form-control `value`
    /// fields, and `on*` names, which are bound as listeners.
    fn set_attribute(&mut self, node: HostId, name: &str, value: &Value) -> HostResult<()>;

    /// Remove one attribute, listener or special field.
    fn remove_attribute(&mut self, node: HostId, name: &str) -> HostResult<()>;

    /// Insert `node` under `parent` immediately before `reference`.
    fn insert_before(&mut self, parent: HostId, node: HostId, reference: HostId) -> HostResult<()>;

    fn append_child(&mut self, parent: HostId, node: HostId) -> HostResult<()>;

    fn remove_child(&mut self, parent: HostId, node: HostId) -> HostResult<()>;

    fn parent(&self, node: HostId) -> Option<HostId>;

    fn children(&self, node: HostId) -> HostResult<Vec<HostId>>;
}
