//! In-memory JSON tree operations with realtime database semantics.
//!
//! The whole database is one JSON object addressed by `/`-separated paths.
//! Writing `null` deletes, and an object left with no children disappears
//! from its parent, so an empty collection reads back as `None`.

use serde_json::{Map, Value};

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// The value at `path`, if any.
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments(path) {
        node = node.as_object()?.get(segment)?;
    }
    match node {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        other => Some(other),
    }
}

/// Overwrite the value at `path`, creating parents as needed.
pub fn set(root: &mut Value, path: &str, value: Value) {
    let parts: Vec<&str> = segments(path).collect();
    if value.is_null() {
        remove_parts(root, &parts);
        return;
    }

    let Some((last, parents)) = parts.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for segment in parents {
        node = object_mut(node)
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    object_mut(node).insert(last.to_string(), value);
}

/// Replace the given children of the object at `path`.
pub fn update(root: &mut Value, path: &str, fields: &Map<String, Value>) {
    let base = segments(path).collect::<Vec<_>>().join("/");
    for (key, value) in fields {
        let child = if base.is_empty() {
            key.clone()
        } else {
            format!("{}/{}", base, key)
        };
        set(root, &child, value.clone());
    }
}

/// Delete the value at `path`, pruning parents left empty.
pub fn remove(root: &mut Value, path: &str) {
    let parts: Vec<&str> = segments(path).collect();
    remove_parts(root, &parts);
}

fn remove_parts(node: &mut Value, parts: &[&str]) {
    let Some((first, rest)) = parts.split_first() else {
        *node = Value::Object(Map::new());
        return;
    };
    let Some(map) = node.as_object_mut() else {
        return;
    };

    if rest.is_empty() {
        map.remove(*first);
        return;
    }

    if let Some(child) = map.get_mut(*first) {
        remove_parts(child, rest);
        if child.as_object().is_some_and(Map::is_empty) {
            map.remove(*first);
        }
    }
}

/// Coerce `node` into an object, discarding a scalar stored there.
fn object_mut(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just made an object"),
    }
}
