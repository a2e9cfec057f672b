//! Deciding whether a change forces replacement.
//!
//! A change at a path forces replacement when the path itself or any
//! ancestor is `force_new`: a `force_new` collection is replaced by any
//! element-level change beneath it. When a whole subtree appears or
//! disappears, it also forces replacement if it carries a non-null value at
//! a `force_new` position, since that change touches the flagged leaf.

use tfbridge_types::{EngineResult, SchemaNode, Value, ValuePath};
use tfbridge_walk::{lookup_chain, walk_at};

/// Whether `path` or one of its ancestors is `force_new`.
pub fn path_triggers_replacement(root: &SchemaNode, path: &ValuePath) -> EngineResult<bool> {
    Ok(lookup_chain(root, path)?
        .iter()
        .any(|(_, node)| node.force_new))
}

/// Whether the known subtree `value` located at `path` holds a non-null
/// value at any `force_new` position.
pub fn value_triggers_replacement(
    root: &SchemaNode,
    path: &ValuePath,
    value: &Value,
) -> EngineResult<bool> {
    if !value.is_known() {
        return Ok(false);
    }
    let node = match lookup_chain(root, path)?.last() {
        Some((_, node)) => *node,
        None => root,
    };
    for item in walk_at(path.clone(), node, [value]) {
        let item = item?;
        if item.schema.force_new && !item.values[0].is_null() {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfbridge_types::Schema;

    fn schema() -> Schema {
        Schema::new([
            (
                "x",
                SchemaNode::list(SchemaNode::object([
                    ("y", SchemaNode::string().optional().force_new()),
                    ("z", SchemaNode::string().optional()),
                ]))
                .optional(),
            ),
            ("zones", SchemaNode::set(SchemaNode::string()).optional().force_new()),
        ])
    }

    #[test]
    fn flagged_leaf_and_its_siblings() {
        let s = schema();
        let y = ValuePath::root().attr("x").index(0).attr("y");
        let z = ValuePath::root().attr("x").index(0).attr("z");
        assert!(path_triggers_replacement(s.root(), &y).unwrap());
        assert!(!path_triggers_replacement(s.root(), &z).unwrap());
    }

    #[test]
    fn flagged_container_covers_elements() {
        let s = schema();
        let elem = ValuePath::root().attr("zones").index(3);
        assert!(path_triggers_replacement(s.root(), &elem).unwrap());
    }

    #[test]
    fn whole_element_touches_flagged_leaf_only_when_set() {
        let s = schema();
        let path = ValuePath::root().attr("x").index(0);
        let with_y = Value::object([("y", Value::string("a")), ("z", Value::Null)]);
        let without_y = Value::object([("y", Value::Null), ("z", Value::string("b"))]);
        assert!(value_triggers_replacement(s.root(), &path, &with_y).unwrap());
        assert!(!value_triggers_replacement(s.root(), &path, &without_y).unwrap());
        assert!(!value_triggers_replacement(s.root(), &path, &Value::Unknown).unwrap());
    }
}
