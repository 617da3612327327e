//! Depth-first traversal of nested field trees.
//!
//! Order is preorder, left to right: a node, then its `fields`, then its
//! `child`. The same order is used for typed schemas, wire trees and the
//! element keys the renderer hands out.

use serde_json::{Map, Value};

use crate::schema::FieldNode;
use crate::Result;

/// Every node reachable from `roots`.
pub fn deep_flat(roots: &[FieldNode]) -> Vec<&FieldNode> {
    let mut out = Vec::new();
    for node in roots {
        push_node(node, &mut out);
    }
    out
}

fn push_node<'a>(node: &'a FieldNode, out: &mut Vec<&'a FieldNode>) {
    out.push(node);
    for nested in &node.fields {
        push_node(nested, out);
    }
    if let Some(child) = &node.child {
        push_node(child, out);
    }
}

/// Every object node reachable from a wire tree. Non-object entries are skipped.
pub fn deep_flat_wire(roots: &[Value]) -> Vec<&Map<String, Value>> {
    let mut out = Vec::new();
    for node in roots {
        push_wire(node, &mut out);
    }
    out
}

fn push_wire<'a>(node: &'a Value, out: &mut Vec<&'a Map<String, Value>>) {
    let Some(map) = node.as_object() else {
        return;
    };
    out.push(map);
    if let Some(Value::Array(nested)) = map.get("fields") {
        for n in nested {
            push_wire(n, out);
        }
    }
    if let Some(child) = map.get("child") {
        push_wire(child, out);
    }
}

/// Apply `f` to every object node of a wire tree in traversal order.
///
/// `f` runs on a node before its children are visited, so it must only touch
/// node-local keys; rewriting `fields` or `child` changes what gets visited.
pub fn visit_wire_mut<F>(roots: &mut [Value], f: &mut F) -> Result<()>
where
    F: FnMut(&mut Map<String, Value>) -> Result<()>,
{
    for node in roots.iter_mut() {
        visit_node(node, f)?;
    }
    Ok(())
}

fn visit_node<F>(node: &mut Value, f: &mut F) -> Result<()>
where
    F: FnMut(&mut Map<String, Value>) -> Result<()>,
{
    let Some(map) = node.as_object_mut() else {
        return Ok(());
    };
    f(map)?;
    if let Some(Value::Array(nested)) = map.get_mut("fields") {
        visit_wire_mut(nested, f)?;
    }
    if let Some(child) = map.get_mut("child") {
        visit_node(child, f)?;
    }
    Ok(())
}

/// True for the keys that hold nested nodes rather than properties.
pub fn is_nesting_key(key: &str) -> bool {
    key == "fields" || key == "child"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use serde_json::json;

    fn tree() -> Vec<FieldNode> {
        vec![
            FieldNode::new(FieldType::Group).name("g").with_fields(vec![
                FieldNode::new(FieldType::Text).name("a"),
                FieldNode::new(FieldType::Paper)
                    .name("p")
                    .with_child(FieldNode::new(FieldType::Text).name("b")),
            ]),
            FieldNode::new(FieldType::Checkbox).name("c"),
        ]
    }

    #[test]
    fn preorder_fields_before_child() {
        let t = tree();
        let names: Vec<_> = deep_flat(&t)
            .iter()
            .map(|n| n.name.as_deref().unwrap_or(""))
            .collect();
        assert_eq!(names, ["g", "a", "p", "b", "c"]);
    }

    #[test]
    fn flattening_is_deterministic() {
        let t = tree();
        let first: Vec<FieldNode> = deep_flat(&t).into_iter().cloned().collect();
        let second: Vec<FieldNode> = deep_flat(&t).into_iter().cloned().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn wire_traversal_matches_typed_order() {
        let t = tree();
        let wire = serde_json::to_value(&t).unwrap();
        let nodes = deep_flat_wire(wire.as_array().unwrap());
        let names: Vec<_> = nodes.iter().map(|m| m["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["g", "a", "p", "b", "c"]);
    }

    #[test]
    fn visitor_touches_each_node_once() {
        let mut wire = vec![json!({"type": "group-layout", "fields": [{"type": "text-field"}, 7]})];
        let mut seen = 0;
        visit_wire_mut(&mut wire, &mut |m| {
            seen += 1;
            m.insert("seen".into(), json!(true));
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, 2);
        assert_eq!(wire[0]["fields"][0]["seen"], json!(true));
    }
}
