//! N-ary, schema-directed traversal of value trees.
//!
//! [`Walk`] visits every schema position reachable from the roots in
//! pre-order, yielding the path, the schema node, and the corresponding child
//! value of each root. Children are aligned structurally: object fields by
//! name, list and set elements by position, map elements by key. Absent
//! children are `Null`, and children of an `Unknown` container are `Unknown`.
//!
//! Shape mismatches between a value and its schema node are reported as
//! [`EngineError::SchemaMismatch`] when the node's children are expanded.

use std::collections::BTreeSet;

use tfbridge_types::{
    EngineError, EngineResult, Scalar, ScalarType, SchemaKind, SchemaNode, Value, ValuePath, NULL,
    UNKNOWN,
};

/// One visited schema position.
#[derive(Clone, Debug)]
pub struct WalkItem<'a, const N: usize> {
    pub path: ValuePath,
    pub schema: &'a SchemaNode,
    pub values: [&'a Value; N],
}

/// What a [`visit`] callback wants to happen next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visit {
    Continue,
    SkipChildren,
}

/// Pre-order iterator over a schema and `N` aligned value trees.
pub struct Walk<'a, const N: usize> {
    stack: Vec<WalkItem<'a, N>>,
    /// The last yielded item, whose children are expanded lazily so that
    /// [`Walk::skip_children`] can drop them.
    pending: Option<WalkItem<'a, N>>,
}

/// Walk `roots` from the resource root.
pub fn walk<'a, const N: usize>(schema: &'a SchemaNode, roots: [&'a Value; N]) -> Walk<'a, N> {
    walk_at(ValuePath::root(), schema, roots)
}

/// Walk `roots` as the subtree located at `path`.
pub fn walk_at<'a, const N: usize>(
    path: ValuePath,
    schema: &'a SchemaNode,
    roots: [&'a Value; N],
) -> Walk<'a, N> {
    Walk {
        stack: vec![WalkItem {
            path,
            schema,
            values: roots,
        }],
        pending: None,
    }
}

/// Drive a walk with a callback that may prune subtrees.
pub fn visit<'a, const N: usize, F>(
    schema: &'a SchemaNode,
    roots: [&'a Value; N],
    mut visitor: F,
) -> EngineResult<()>
where
    F: FnMut(&WalkItem<'a, N>) -> EngineResult<Visit>,
{
    let mut walk = walk(schema, roots);
    while let Some(item) = walk.next() {
        if visitor(&item?)? == Visit::SkipChildren {
            walk.skip_children();
        }
    }
    Ok(())
}

impl<'a, const N: usize> Walk<'a, N> {
    /// Do not descend into the item most recently returned by `next`.
    pub fn skip_children(&mut self) {
        self.pending = None;
    }

    fn expand(&mut self, item: &WalkItem<'a, N>) -> EngineResult<()> {
        let mut children = children(item)?;
        children.reverse();
        self.stack.extend(children);
        Ok(())
    }
}

impl<'a, const N: usize> Iterator for Walk<'a, N> {
    type Item = EngineResult<WalkItem<'a, N>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.pending.take() {
            if let Err(err) = self.expand(&item) {
                self.stack.clear();
                return Some(Err(err));
            }
        }
        let item = self.stack.pop()?;
        self.pending = Some(item.clone());
        Some(Ok(item))
    }
}

/// Child of `value` standing in for an absent element.
fn absent(value: &Value) -> &'static Value {
    if value.is_unknown() {
        &UNKNOWN
    } else {
        &NULL
    }
}

fn scalar_matches(ty: ScalarType, scalar: &Scalar) -> bool {
    matches!(
        (ty, scalar),
        (ScalarType::Bool, Scalar::Bool(_))
            | (ScalarType::Number, Scalar::Number(_))
            | (ScalarType::String, Scalar::String(_))
    )
}

/// Verify a single node's value against its schema shape.
pub(crate) fn check_shape(path: &ValuePath, schema: &SchemaNode, value: &Value) -> EngineResult<()> {
    let ok = match (&schema.kind, value) {
        (_, Value::Null | Value::Unknown) => true,
        (SchemaKind::Scalar { ty }, Value::Scalar(s)) => scalar_matches(*ty, s),
        (SchemaKind::Object { fields }, Value::Object(m)) => {
            if let Some(extra) = m.keys().find(|k| !fields.contains_key(*k)) {
                return Err(EngineError::mismatch(
                    &path.attr(extra.as_str()),
                    "no attribute",
                    value.get(extra).kind_name(),
                ));
            }
            true
        }
        (SchemaKind::List { .. }, Value::List(elems)) | (SchemaKind::Set { .. }, Value::Set(elems)) => {
            if schema.collapses() && elems.len() > 1 {
                return Err(EngineError::mismatch(
                    path,
                    "at most one element",
                    format!("{} elements", elems.len()),
                ));
            }
            true
        }
        (SchemaKind::Map { .. }, Value::Map(_)) => true,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(EngineError::mismatch(path, schema.shape_name(), value.kind_name()))
    }
}

fn object_children<'a, const N: usize>(
    path: &ValuePath,
    fields: &'a std::collections::BTreeMap<String, SchemaNode>,
    values: [&'a Value; N],
) -> Vec<WalkItem<'a, N>> {
    fields
        .iter()
        .map(|(name, field)| WalkItem {
            path: path.attr(name.as_str()),
            schema: field,
            values: std::array::from_fn(|i| values[i].get(name)),
        })
        .collect()
}

fn children<'a, const N: usize>(item: &WalkItem<'a, N>) -> EngineResult<Vec<WalkItem<'a, N>>> {
    for value in item.values {
        check_shape(&item.path, item.schema, value)?;
    }
    let values = item.values;
    match &item.schema.kind {
        SchemaKind::Scalar { .. } => Ok(Vec::new()),
        SchemaKind::Object { fields } => Ok(object_children(&item.path, fields, values)),
        SchemaKind::List { elem } | SchemaKind::Set { elem } if item.schema.collapses() => {
            let singles: [&'a Value; N] = std::array::from_fn(|i| {
                values[i]
                    .elements()
                    .and_then(|elems| elems.first())
                    .unwrap_or_else(|| absent(values[i]))
            });
            // `collapses` guarantees an object element schema.
            let fields = elem.fields().map(|f| object_children(&item.path, f, singles));
            Ok(fields.unwrap_or_default())
        }
        SchemaKind::List { elem } | SchemaKind::Set { elem } => {
            let len = values
                .iter()
                .filter_map(|v| v.elements().map(<[Value]>::len))
                .max()
                .unwrap_or(0);
            Ok((0..len)
                .map(|index| WalkItem {
                    path: item.path.index(index),
                    schema: elem.as_ref(),
                    values: std::array::from_fn(|i| {
                        values[i]
                            .elements()
                            .and_then(|elems| elems.get(index))
                            .unwrap_or_else(|| absent(values[i]))
                    }),
                })
                .collect())
        }
        SchemaKind::Map { elem } => {
            let keys: BTreeSet<&'a String> = values
                .iter()
                .copied()
                .filter_map(Value::as_map)
                .flat_map(|m| m.keys())
                .collect();
            Ok(keys
                .into_iter()
                .map(|key| WalkItem {
                    path: item.path.key(key.as_str()),
                    schema: elem.as_ref(),
                    values: std::array::from_fn(|i| {
                        values[i]
                            .as_map()
                            .and_then(|m| m.get(key))
                            .unwrap_or_else(|| absent(values[i]))
                    }),
                })
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfbridge_types::Schema;

    fn schema() -> Schema {
        Schema::new([
            ("name", SchemaNode::string().required()),
            (
                "rule",
                SchemaNode::list(SchemaNode::object([
                    ("cidr", SchemaNode::string().required()),
                    ("port", SchemaNode::number().optional()),
                ]))
                .optional()
                .max_items_one(),
            ),
            ("ports", SchemaNode::list(SchemaNode::number()).optional()),
            ("tags", SchemaNode::map(SchemaNode::string()).optional()),
        ])
    }

    fn paths<const N: usize>(w: Walk<'_, N>) -> Vec<String> {
        w.map(|item| item.unwrap().path.to_string()).collect()
    }

    #[test]
    fn visits_in_preorder_with_collapsed_blocks() {
        let s = schema();
        let v = Value::object([
            ("name", Value::string("web")),
            (
                "rule",
                Value::list([Value::object([
                    ("cidr", Value::string("10.0.0.0/8")),
                    ("port", Value::int(22)),
                ])]),
            ),
            ("ports", Value::list([Value::int(80), Value::int(443)])),
            ("tags", Value::map([("env", Value::string("prod"))])),
        ]);
        assert_eq!(
            paths(walk(s.root(), [&v])),
            vec![
                "<root>",
                "name",
                "ports",
                "ports[0]",
                "ports[1]",
                "rule",
                "rule.cidr",
                "rule.port",
                "tags",
                "tags.env",
            ]
        );
    }

    #[test]
    fn aligns_children_of_several_roots() {
        let s = schema();
        let a = Value::object([("ports", Value::list([Value::int(1)]))]);
        let b = Value::object([("ports", Value::list([Value::int(1), Value::int(2)]))]);
        let items: Vec<WalkItem<'_, 2>> = walk(s.root(), [&a, &b])
            .map(Result::unwrap)
            .filter(|item| item.path.root_attr() == Some("ports"))
            .collect();
        assert_eq!(items.len(), 3);
        assert!(items[2].values[0].is_null());
        assert_eq!(items[2].values[1], &Value::int(2));
    }

    #[test]
    fn unknown_containers_have_unknown_children() {
        let s = schema();
        let v = Value::object([("rule", Value::Unknown)]);
        let cidr = walk(s.root(), [&v])
            .map(Result::unwrap)
            .find(|item| item.path.to_string() == "rule.cidr")
            .unwrap();
        assert!(cidr.values[0].is_unknown());
    }

    #[test]
    fn skip_children_prunes_subtree() {
        let s = schema();
        let v = Value::object([("tags", Value::map([("a", Value::string("b"))]))]);
        let mut seen = Vec::new();
        visit(s.root(), [&v], |item| {
            seen.push(item.path.to_string());
            Ok(if item.path.root_attr() == Some("tags") {
                Visit::SkipChildren
            } else {
                Visit::Continue
            })
        })
        .unwrap();
        assert!(seen.contains(&"tags".to_string()));
        assert!(!seen.contains(&"tags.a".to_string()));
    }

    #[test]
    fn shape_mismatch_names_the_path() {
        let s = schema();
        let v = Value::object([("ports", Value::list([Value::string("eighty")]))]);
        let err = walk(s.root(), [&v]).find_map(Result::err).unwrap();
        assert_eq!(
            err,
            EngineError::SchemaMismatch {
                path: ValuePath::root().attr("ports").index(0),
                expected: "number".into(),
                found: "string".into(),
            }
        );
    }

    #[test]
    fn unexpected_attribute_is_a_mismatch() {
        let s = schema();
        let v = Value::object([("bogus", Value::int(1))]);
        let err = walk(s.root(), [&v]).find_map(Result::err).unwrap();
        assert_eq!(err.path(), &ValuePath::root().attr("bogus"));
    }

    #[test]
    fn collapsed_collection_rejects_many_elements() {
        let s = schema();
        let rule = Value::object([("cidr", Value::string("a"))]);
        let v = Value::object([("rule", Value::list([rule.clone(), rule]))]);
        let err = walk(s.root(), [&v]).find_map(Result::err).unwrap();
        assert!(matches!(err, EngineError::SchemaMismatch { .. }));
    }
}
