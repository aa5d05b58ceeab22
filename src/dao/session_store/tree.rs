//! Helpers manipulating a JSON state tree addressed by [`KeyPath`]s.
//!
//! The tree follows the hosted store conventions: `null` is never stored, writing `null`
//! deletes the node, and objects left empty by a deletion disappear with it.

use serde_json::{Map, Value};

use super::path::KeyPath;

/// Borrow the node stored at `path`, if any.
pub fn get<'a>(root: &'a Value, path: &KeyPath) -> Option<&'a Value> {
    get_segments(root, path.segments())
}

/// Borrow the node stored under the given relative segments.
pub fn get_segments<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
        .filter(|node| !is_empty(node))
}

/// Replace the node at `segments` with `value`; a `null` value removes the node.
pub fn write(root: &mut Value, segments: &[String], mut value: Value) {
    strip_nulls(&mut value);
    if is_empty(&value) {
        remove(root, segments);
        return;
    }

    let mut node = root;
    for segment in segments {
        node = ensure_object(node)
            .entry(segment.clone())
            .or_insert(Value::Null);
    }
    *node = value;
}

fn remove(node: &mut Value, segments: &[String]) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        *node = Value::Object(Map::new());
        return true;
    };

    let Value::Object(map) = node else {
        return false;
    };

    let emptied = if rest.is_empty() {
        true
    } else {
        map.get_mut(head)
            .is_some_and(|child| remove(child, rest))
    };
    if emptied {
        map.shift_remove(head);
    }

    map.is_empty()
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced by an object"),
    }
}

fn strip_nulls(value: &mut Value) {
    if let Value::Object(map) = value {
        map.retain(|_, child| {
            strip_nulls(child);
            !is_empty(child)
        });
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn path(raw: &str) -> KeyPath {
        KeyPath::parse(raw).unwrap()
    }

    #[test]
    fn write_creates_intermediate_objects() {
        let mut root = json!({});
        write(&mut root, path("sessions/s1/ownerName").segments(), json!("Alice"));
        assert_eq!(root, json!({ "sessions": { "s1": { "ownerName": "Alice" } } }));
        assert_eq!(get(&root, &path("sessions/s1/ownerName")), Some(&json!("Alice")));
    }

    #[test]
    fn writing_null_removes_and_prunes_empty_parents() {
        let mut root = json!({ "sessions": { "s1": { "participants": { "p1": { "vote": "5" } } } } });
        write(&mut root, path("sessions/s1/participants/p1/vote").segments(), Value::Null);
        assert_eq!(root, json!({}));
        assert_eq!(get(&root, &path("sessions/s1")), None);
    }

    #[test]
    fn nested_nulls_are_not_stored() {
        let mut root = json!({});
        write(
            &mut root,
            path("sessions/s1/participants/p1").segments(),
            json!({ "name": "Bob", "vote": null }),
        );
        assert_eq!(
            get(&root, &path("sessions/s1/participants/p1")),
            Some(&json!({ "name": "Bob" }))
        );
    }

    #[test]
    fn overwriting_keeps_sibling_order() {
        let mut root = json!({});
        for id in ["zeta", "alpha", "mid"] {
            write(&mut root, path(&format!("p/{id}/name")).segments(), json!(id));
        }
        write(&mut root, path("p/alpha/name").segments(), json!("renamed"));

        let keys = get(&root, &path("p"))
            .and_then(Value::as_object)
            .map(|map| map.keys().cloned().collect::<Vec<_>>())
            .unwrap();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }
}
