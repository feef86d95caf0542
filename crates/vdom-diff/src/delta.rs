//! Shallow prop comparison.

use std::collections::BTreeMap;

use serde_json::Value;
use vdom_types::Props;

/// Changed props: the new value, or `None` when the prop must be erased.
pub type PropDelta = BTreeMap<String, Option<Value>>;

/// Compute the delta between two prop maps.
///
/// Keys whose value differs (including disappearing keys) carry the new
/// value, keys present only in `new` are added. Values are compared with
/// `==`; nested objects are not diffed further.
pub fn diff_props(old: &Props, new: &Props) -> PropDelta {
    let mut delta = PropDelta::new();

    for (key, old_val) in old {
        match new.get(key) {
            Some(new_val) if new_val == old_val => {}
            other => {
                delta.insert(key.clone(), other.cloned());
            }
        }
    }

    for (key, new_val) in new {
        if !old.contains_key(key) {
            delta.insert(key.clone(), Some(new_val.clone()));
        }
    }

    delta
}
